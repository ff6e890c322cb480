/// Network interception: observing the portal's own API calls from the page world

use crate::app_data::ApplicationRecord;
use crate::bridge::{self, js_reason, to_js};
use crate::config::ScrapeConfig;
use crate::error::{BridgeError, ConfigError};
use crate::normalize::{normalize_body, ExtractionContext};
use regex::RegexSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::rc::Rc;
use url::Url;
use wasm_bindgen::prelude::*;

/// Tag on `window.postMessage` payloads sent from the page world to the content script
pub const ENVELOPE_SOURCE: &str = "my-apps-launcher";

/// Decides which request URLs belong to the applications API
#[derive(Debug, Clone)]
pub struct ApiMatcher {
    patterns: RegexSet,
}

impl ApiMatcher {
    pub fn new(config: &ScrapeConfig) -> Result<Self, ConfigError> {
        Ok(ApiMatcher {
            patterns: config.api_pattern_set()?,
        })
    }

    pub fn matches(&self, url: &str) -> bool {
        self.patterns.is_match(url)
    }
}

#[derive(Debug, Clone)]
pub struct NetworkInterceptor {
    matcher: ApiMatcher,
    context: ExtractionContext,
}

impl NetworkInterceptor {
    pub fn new(config: &ScrapeConfig, base: Url) -> Result<Self, ConfigError> {
        Ok(NetworkInterceptor {
            matcher: ApiMatcher::new(config)?,
            context: ExtractionContext::new(config, base),
        })
    }

    pub fn matches(&self, url: &str) -> bool {
        self.matcher.matches(url)
    }

    /// Records from a completed response, if it came from the applications API and
    /// its body holds at least one usable item. Bodies that fail to parse are dropped.
    pub fn inspect(&self, url: &str, body: &str) -> Option<Vec<ApplicationRecord>> {
        if !self.matches(url) {
            return None;
        }

        match normalize_body(body, &self.context) {
            Ok(records) if !records.is_empty() => {
                log::debug!("Captured {} apps from {}", records.len(), url);
                Some(records)
            }
            Ok(_) => None,
            Err(e) => {
                log::debug!("Ignoring response from {}: {}", url, e);
                None
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureEnvelope {
    pub source: String,
    pub apps: Vec<ApplicationRecord>,
}

impl CaptureEnvelope {
    pub fn new(apps: Vec<ApplicationRecord>) -> Self {
        CaptureEnvelope {
            source: ENVELOPE_SOURCE.to_string(),
            apps,
        }
    }

    /// The records inside a posted message, or `None` if it is not one of ours
    pub fn open(message: &Value) -> Option<Vec<ApplicationRecord>> {
        let envelope: CaptureEnvelope = serde_json::from_value(message.clone()).ok()?;
        (envelope.source == ENVELOPE_SOURCE).then_some(envelope.apps)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStatus {
    Installed,
    AlreadyInstalled,
    /// Primitive missing or the page refused the patch (e.g. CSP, frozen prototype)
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageHooks {
    pub fetch: HookStatus,
    pub xhr: HookStatus,
}

impl PageHooks {
    pub fn any_installed(&self) -> bool {
        self.fetch != HookStatus::Unavailable || self.xhr != HookStatus::Unavailable
    }
}

fn hook_status(primitive: &'static str, result: Result<bool, JsValue>) -> HookStatus {
    match result {
        Ok(true) => HookStatus::Installed,
        Ok(false) => HookStatus::AlreadyInstalled,
        Err(e) => {
            let error = BridgeError::Hook {
                primitive,
                reason: js_reason(&e),
            };
            log::debug!("{}", error);
            HookStatus::Unavailable
        }
    }
}

/// Wrap `fetch` and `XMLHttpRequest` so matching responses reach `on_capture`.
/// Either hook may fail on its own; extraction then relies on the DOM alone.
pub fn install_page_hooks<F>(interceptor: NetworkInterceptor, on_capture: F) -> PageHooks
where
    F: Fn(Vec<ApplicationRecord>) + 'static,
{
    let interceptor = Rc::new(interceptor);

    let matches = {
        let interceptor = interceptor.clone();
        Closure::wrap(Box::new(move |url: String| interceptor.matches(&url)) as Box<dyn Fn(String) -> bool>)
    };
    let on_body = Closure::wrap(Box::new(move |url: String, body: String| {
        if let Some(records) = interceptor.inspect(&url, &body) {
            on_capture(records);
        }
    }) as Box<dyn Fn(String, String)>);

    let hooks = PageHooks {
        fetch: hook_status(
            "fetch",
            bridge::hook_fetch(matches.as_ref().unchecked_ref(), on_body.as_ref().unchecked_ref()),
        ),
        xhr: hook_status(
            "XMLHttpRequest",
            bridge::hook_xhr(matches.as_ref().unchecked_ref(), on_body.as_ref().unchecked_ref()),
        ),
    };

    // Hooks live as long as the page
    matches.forget();
    on_body.forget();
    hooks
}

/// Hand captured records to the content script of this page
pub fn post_capture(records: Vec<ApplicationRecord>) -> Result<(), BridgeError> {
    let window = web_sys::window().ok_or(BridgeError::Unavailable("window"))?;
    let origin = window
        .location()
        .origin()
        .map_err(|e| BridgeError::Messaging(js_reason(&e)))?;

    let message = to_js(&CaptureEnvelope::new(records))?;
    window
        .post_message(&message, &origin)
        .map_err(|e| BridgeError::Messaging(js_reason(&e)))
}
