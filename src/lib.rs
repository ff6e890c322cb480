/// My Apps Launcher - Chrome Extension that collects the apps listed on the My Apps portal
/// Built with Rust + WASM

pub mod app_data;
pub mod background;
mod bridge;
pub mod catalog;
pub mod config;
pub mod content;
pub mod dom;
pub mod error;
pub mod messages;
pub mod network;
pub mod normalize;
pub mod orchestrator;
pub mod portal;
pub mod storage;
pub mod strategies;

use app_data::ApplicationRecord;
use config::ScrapeConfig;
use storage::SortPreference;
use wasm_bindgen::prelude::*;

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

// Content script on the portal page
#[wasm_bindgen]
pub fn start_content_script(config: JsValue) {
    let config = ScrapeConfig::from_js_or_default(config);
    if let Err(e) = content::start(config) {
        log::warn!("Content script could not start: {}", e);
    }
}

// Injected into the page world; only this world can see the page's own requests
#[wasm_bindgen]
pub fn start_page_hooks(config: JsValue) {
    let config = ScrapeConfig::from_js_or_default(config);

    let base = web_sys::window()
        .and_then(|window| window.location().href().ok())
        .and_then(|href| portal::page_origin(&href));
    let base = match base {
        Some(base) => base,
        None => match config.portal_home_url() {
            Ok(base) => base,
            Err(e) => {
                log::debug!("API interception disabled: {}", e);
                return;
            }
        },
    };

    let interceptor = match network::NetworkInterceptor::new(&config, base) {
        Ok(interceptor) => interceptor,
        Err(e) => {
            log::debug!("API interception disabled: {}", e);
            return;
        }
    };

    let hooks = network::install_page_hooks(interceptor, |records| {
        if let Err(e) = network::post_capture(records) {
            log::debug!("Could not forward captured apps: {}", e);
        }
    });
    if !hooks.any_installed() {
        log::debug!("API interception unavailable, DOM scraping only");
    }
}

// Background service worker
#[wasm_bindgen]
pub fn start_background(config: JsValue) {
    let config = ScrapeConfig::from_js_or_default(config);
    if let Err(e) = background::start(config) {
        log::warn!("Background could not start: {}", e);
    }
}

// Popup helpers over stored records

fn parse_sort(sort: &str) -> SortPreference {
    serde_json::from_value(serde_json::Value::String(sort.to_string())).unwrap_or_default()
}

#[wasm_bindgen]
pub fn visible_apps(apps: JsValue, query: &str, sort: &str) -> Result<JsValue, JsValue> {
    let apps: Vec<ApplicationRecord> = bridge::from_js(apps).map_err(js_error)?;
    let visible = catalog::visible_apps(&apps, query, parse_sort(sort));
    bridge::to_js(&visible).map_err(js_error)
}

#[wasm_bindgen]
pub fn next_sort(sort: &str) -> String {
    match parse_sort(sort).next() {
        SortPreference::None => "none",
        SortPreference::Asc => "asc",
        SortPreference::Desc => "desc",
    }
    .to_string()
}

#[wasm_bindgen]
pub fn export_catalog(apps: JsValue, exported_at: &str) -> Result<String, JsValue> {
    let apps: Vec<ApplicationRecord> = bridge::from_js(apps).map_err(js_error)?;
    catalog::ExportDocument::new(apps, exported_at.to_string())
        .to_json()
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

#[wasm_bindgen]
pub fn export_filename(exported_at: &str) -> String {
    catalog::export_filename(exported_at)
}

#[wasm_bindgen]
pub fn app_initial(name: &str) -> String {
    catalog::app_initial(name)
}

// `config` is the same object the entry shims pass; `undefined` checks the default hosts
#[wasm_bindgen]
pub fn is_portal_url(url: &str, config: JsValue) -> bool {
    let config = ScrapeConfig::from_js_or_default(config);
    portal::is_portal_url(url, &config.portal_hosts)
}

fn js_error(e: error::BridgeError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

#[wasm_bindgen]
pub async fn read_preferences() -> Result<JsValue, JsValue> {
    let preferences = storage::load_preferences().await.unwrap_or_else(|e| {
        log::warn!("Reading preferences failed: {}", e);
        storage::Preferences::default()
    });
    bridge::to_js(&preferences).map_err(js_error)
}

#[wasm_bindgen]
pub async fn write_preferences(preferences: JsValue) -> Result<(), JsValue> {
    let preferences: storage::Preferences = bridge::from_js(preferences).map_err(js_error)?;
    storage::save_preferences(&preferences).await.map_err(js_error)
}

#[wasm_bindgen]
pub async fn clear_apps() -> Result<(), JsValue> {
    storage::clear_catalog().await.map_err(js_error)?;
    log::info!("Stored apps cleared");
    Ok(())
}
