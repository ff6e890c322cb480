/// Storage types and chrome.storage.local access

use crate::app_data::ApplicationRecord;
use crate::bridge::{self, from_js, js_reason, to_js};
use crate::error::BridgeError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use wasm_bindgen::prelude::*;

pub const APPS_KEY: &str = "apps";
pub const LAST_UPDATED_KEY: &str = "lastUpdated";
pub const VIEW_PREFERENCE_KEY: &str = "viewPreference";
pub const SORT_PREFERENCE_KEY: &str = "sortPreference";

/// The scraped application list, overwritten wholesale on every successful scrape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCatalog {
    #[serde(default)]
    pub apps: Vec<ApplicationRecord>,
    /// ISO-8601 time of the write, `None` when nothing was ever stored
    #[serde(rename = "lastUpdated", default)]
    pub last_updated: Option<String>,
}

impl StoredCatalog {
    pub fn new() -> Self {
        StoredCatalog {
            apps: Vec::new(),
            last_updated: None,
        }
    }

    /// A catalog to write, or `None` when there is nothing to write.
    /// An empty pass must never replace what is already stored.
    pub fn from_records(records: Vec<ApplicationRecord>, now: String) -> Option<Self> {
        if records.is_empty() {
            return None;
        }
        Some(StoredCatalog {
            apps: records,
            last_updated: Some(now),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }
}

impl Default for StoredCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ViewPreference {
    #[default]
    Grid,
    List,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortPreference {
    #[default]
    None,
    Asc,
    Desc,
}

impl SortPreference {
    /// none → asc → desc → none
    pub fn next(self) -> Self {
        match self {
            SortPreference::None => SortPreference::Asc,
            SortPreference::Asc => SortPreference::Desc,
            SortPreference::Desc => SortPreference::None,
        }
    }
}

/// Unknown or malformed stored values read as the default
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Preferences {
    #[serde(rename = "viewPreference", default, deserialize_with = "lenient")]
    pub view: ViewPreference,
    #[serde(rename = "sortPreference", default, deserialize_with = "lenient")]
    pub sort: SortPreference,
}

/// New catalog contents reported by a storage change notification
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogChange {
    pub apps: Vec<ApplicationRecord>,
    pub last_updated: Option<String>,
}

impl CatalogChange {
    /// Read `{apps: {oldValue, newValue}, lastUpdated: {...}}`; `None` when `apps` did not change
    pub fn from_changes(changes: &Value) -> Option<CatalogChange> {
        let apps_change = changes.get(APPS_KEY)?;
        let apps = apps_change
            .get("newValue")
            .cloned()
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default();
        let last_updated = changes
            .get(LAST_UPDATED_KEY)
            .and_then(|change| change.get("newValue"))
            .and_then(Value::as_str)
            .map(str::to_string);

        Some(CatalogChange { apps, last_updated })
    }
}

fn storage_error(operation: &'static str) -> impl Fn(JsValue) -> BridgeError {
    move |e| BridgeError::Storage {
        operation,
        reason: js_reason(&e),
    }
}

fn keys(names: &[&str]) -> Result<JsValue, BridgeError> {
    to_js(names)
}

pub async fn load_catalog() -> Result<StoredCatalog, BridgeError> {
    let data = bridge::storage_get(keys(&[APPS_KEY, LAST_UPDATED_KEY])?)
        .await
        .map_err(storage_error("get"))?;

    if data.is_null() || data.is_undefined() {
        return Ok(StoredCatalog::new());
    }
    from_js(data)
}

/// One `set` carrying both keys
pub async fn save_catalog(catalog: &StoredCatalog) -> Result<(), BridgeError> {
    bridge::storage_set(to_js(catalog)?)
        .await
        .map_err(storage_error("set"))?;
    Ok(())
}

pub async fn clear_catalog() -> Result<(), BridgeError> {
    bridge::storage_remove(keys(&[APPS_KEY, LAST_UPDATED_KEY])?)
        .await
        .map_err(storage_error("remove"))?;
    Ok(())
}

pub async fn load_preferences() -> Result<Preferences, BridgeError> {
    let data = bridge::storage_get(keys(&[VIEW_PREFERENCE_KEY, SORT_PREFERENCE_KEY])?)
        .await
        .map_err(storage_error("get"))?;

    if data.is_null() || data.is_undefined() {
        return Ok(Preferences::default());
    }
    let value: Value = from_js(data)?;
    serde_json::from_value(value).map_err(|e| BridgeError::Serialization(e.to_string()))
}

pub async fn save_preferences(preferences: &Preferences) -> Result<(), BridgeError> {
    bridge::storage_set(to_js(preferences)?)
        .await
        .map_err(storage_error("set"))?;
    Ok(())
}

/// Seed written on first install
pub async fn seed_defaults() -> Result<(), BridgeError> {
    let seed = serde_json::json!({
        APPS_KEY: [],
        VIEW_PREFERENCE_KEY: ViewPreference::Grid,
    });
    bridge::storage_set(to_js(&seed)?)
        .await
        .map_err(storage_error("set"))?;
    Ok(())
}

/// Call `callback` whenever another context rewrites the catalog
pub fn on_catalog_changed<F>(callback: F) -> Result<(), BridgeError>
where
    F: Fn(CatalogChange) + 'static,
{
    let listener = Closure::wrap(Box::new(move |changes: JsValue, area: JsValue| {
        if area.as_string().as_deref() != Some("local") {
            return;
        }
        let Ok(changes) = from_js::<Value>(changes) else {
            return;
        };
        if let Some(change) = CatalogChange::from_changes(&changes) {
            callback(change);
        }
    }) as Box<dyn Fn(JsValue, JsValue)>);

    bridge::on_storage_changed(listener.as_ref().unchecked_ref())
        .map_err(|e| BridgeError::Storage {
            operation: "onChanged",
            reason: js_reason(&e),
        })?;
    listener.forget();
    Ok(())
}
