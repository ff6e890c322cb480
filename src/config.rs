/// Tunables for the scraper, overridable from the JS entry shims

use crate::error::ConfigError;
use regex::RegexSet;
use serde::{Deserialize, Serialize};
use url::Url;
use wasm_bindgen::JsValue;

pub const DEFAULT_MAX_RETRIES: u32 = 20;
pub const DEFAULT_RETRY_INTERVAL_MS: u32 = 2000;
pub const DEFAULT_DEBOUNCE_MS: u32 = 1000;
pub const DEFAULT_MAX_NAME_LEN: usize = 100;
pub const DEFAULT_PORTAL_HOME: &str = "https://myapps.microsoft.com";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScrapeConfig {
    pub max_retries: u32,
    pub retry_interval_ms: u32,
    pub debounce_ms: u32,
    pub max_name_len: usize,
    pub portal_home: String,
    pub portal_hosts: Vec<String>,
    /// Regexes matched against request URLs; any match marks an applications API call
    pub api_patterns: Vec<String>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        ScrapeConfig {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_interval_ms: DEFAULT_RETRY_INTERVAL_MS,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            max_name_len: DEFAULT_MAX_NAME_LEN,
            portal_home: DEFAULT_PORTAL_HOME.to_string(),
            portal_hosts: vec![
                "myapps.microsoft.com".to_string(),
                "myapplications.microsoft.com".to_string(),
            ],
            api_patterns: vec![
                "/api/myapps".to_string(),
                "/api/.*application".to_string(),
                "application.*/api/".to_string(),
            ],
        }
    }
}

impl ScrapeConfig {
    /// Read a config object handed over by an entry shim. `undefined`/`null` yield defaults.
    pub fn from_js(value: JsValue) -> Result<Self, ConfigError> {
        if value.is_undefined() || value.is_null() {
            return Ok(ScrapeConfig::default());
        }

        let config: ScrapeConfig = serde_wasm_bindgen::from_value(value)
            .map_err(|e| ConfigError::Malformed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Like `from_js`, but an unusable config is logged and replaced by the defaults
    pub fn from_js_or_default(value: JsValue) -> Self {
        ScrapeConfig::from_js(value).unwrap_or_else(|e| {
            log::warn!("Ignoring scraper config: {}", e);
            ScrapeConfig::default()
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_retries == 0 {
            return Err(ConfigError::Zero { field: "maxRetries" });
        }
        if self.retry_interval_ms == 0 {
            return Err(ConfigError::Zero { field: "retryIntervalMs" });
        }
        if self.debounce_ms == 0 {
            return Err(ConfigError::Zero { field: "debounceMs" });
        }
        if self.max_name_len == 0 {
            return Err(ConfigError::Zero { field: "maxNameLen" });
        }

        self.portal_home_url()?;
        self.api_pattern_set()?;
        Ok(())
    }

    pub fn portal_home_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.portal_home).map_err(|e| ConfigError::InvalidUrl {
            value: self.portal_home.clone(),
            reason: e.to_string(),
        })
    }

    pub fn api_pattern_set(&self) -> Result<RegexSet, ConfigError> {
        // Compile one by one first so the error names the offending pattern
        for pattern in &self.api_patterns {
            regex::Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;
        }

        RegexSet::new(&self.api_patterns).map_err(|e| ConfigError::InvalidPattern {
            pattern: self.api_patterns.join(" | "),
            reason: e.to_string(),
        })
    }
}
