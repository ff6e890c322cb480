/// JS bridge functions for chrome.* APIs and the page's request primitives

use crate::error::BridgeError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use wasm_bindgen::prelude::*;

#[wasm_bindgen(module = "/js/extension.js")]
extern "C" {
    #[wasm_bindgen(catch, js_name = storageGet)]
    pub(crate) async fn storage_get(keys: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_name = storageSet)]
    pub(crate) async fn storage_set(items: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_name = storageRemove)]
    pub(crate) async fn storage_remove(keys: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_name = onStorageChanged)]
    pub(crate) fn on_storage_changed(callback: &js_sys::Function) -> Result<(), JsValue>;

    /// `handler(message)` may return `undefined` (not handled), a value, or a Promise
    #[wasm_bindgen(catch, js_name = onRuntimeMessage)]
    pub(crate) fn on_runtime_message(handler: &js_sys::Function) -> Result<(), JsValue>;

    #[wasm_bindgen(catch, js_name = sendRuntimeMessage)]
    pub(crate) async fn send_runtime_message(message: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_name = onInstalled)]
    pub(crate) fn on_installed(callback: &js_sys::Function) -> Result<(), JsValue>;

    #[wasm_bindgen(catch, js_name = onTabUpdated)]
    pub(crate) fn on_tab_updated(callback: &js_sys::Function) -> Result<(), JsValue>;

    #[wasm_bindgen(catch, js_name = openTab)]
    pub(crate) async fn open_tab(url: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_name = setBadge)]
    pub(crate) async fn set_badge(tab_id: i32, text: &str, color: &str) -> Result<JsValue, JsValue>;
}

#[wasm_bindgen(module = "/js/page_hooks.js")]
extern "C" {
    /// Wraps `window.fetch`; `on_body(url, text)` receives a copy of matching response bodies
    #[wasm_bindgen(catch, js_name = hookFetch)]
    pub(crate) fn hook_fetch(
        matches: &js_sys::Function,
        on_body: &js_sys::Function,
    ) -> Result<bool, JsValue>;

    /// Wraps `XMLHttpRequest.prototype.open/send` the same way
    #[wasm_bindgen(catch, js_name = hookXhr)]
    pub(crate) fn hook_xhr(
        matches: &js_sys::Function,
        on_body: &js_sys::Function,
    ) -> Result<bool, JsValue>;
}

/// Serialize into a plain JS object (`None` becomes `null`, maps become objects)
pub fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, BridgeError> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| BridgeError::Serialization(e.to_string()))
}

pub fn from_js<T: DeserializeOwned>(value: JsValue) -> Result<T, BridgeError> {
    serde_wasm_bindgen::from_value(value).map_err(|e| BridgeError::Serialization(e.to_string()))
}

pub fn js_reason(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}
