/// Background service worker: message routing, install seeding, portal badge

use crate::bridge::{self, from_js, js_reason, to_js};
use crate::config::ScrapeConfig;
use crate::error::BridgeError;
use crate::messages::{Request, Response};
use crate::portal::is_portal_url;
use crate::storage::{self, StoredCatalog};
use serde_json::Value;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, spawn_local};

pub const BADGE_TEXT: &str = "✓";
pub const BADGE_COLOR: &str = "#107c10";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Badge {
    pub text: &'static str,
    pub color: &'static str,
}

/// Badge for a tab that finished loading one of the portal pages
pub fn badge_for(status: &str, url: &str, config: &ScrapeConfig) -> Option<Badge> {
    if status != "complete" || !is_portal_url(url, &config.portal_hosts) {
        return None;
    }
    Some(Badge {
        text: BADGE_TEXT,
        color: BADGE_COLOR,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallReason {
    Install,
    Update,
    Other,
}

impl InstallReason {
    pub fn parse(reason: &str) -> Self {
        match reason {
            "install" => InstallReason::Install,
            "update" => InstallReason::Update,
            _ => InstallReason::Other,
        }
    }
}

/// What the background does with a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    ReadCatalog,
    OpenPortal,
    Acknowledge { count: usize },
    /// Not ours (including `scrapeApps`, which the content script answers)
    Ignore,
}

pub fn route(request: Option<Request>) -> Route {
    match request {
        Some(Request::GetApps) => Route::ReadCatalog,
        Some(Request::OpenMyApps) => Route::OpenPortal,
        Some(Request::AppsSaved { count }) => Route::Acknowledge { count },
        Some(Request::ScrapeApps) | None => Route::Ignore,
    }
}

fn read_catalog() -> JsValue {
    future_to_promise(async move {
        let catalog = storage::load_catalog().await.unwrap_or_else(|e| {
            log::warn!("Reading apps failed: {}", e);
            StoredCatalog::new()
        });
        to_js(&Response::from(catalog)).map_err(|e| JsValue::from_str(&e.to_string()))
    })
    .into()
}

fn handle_message(message: JsValue, config: &ScrapeConfig) -> JsValue {
    let request = from_js::<Value>(message).ok().and_then(|m| Request::parse(&m));

    match route(request) {
        Route::ReadCatalog => read_catalog(),
        Route::OpenPortal => {
            let home = config.portal_home.clone();
            spawn_local(async move {
                if let Err(e) = bridge::open_tab(&home).await {
                    log::warn!("Opening {} failed: {}", home, js_reason(&e));
                }
            });
            to_js(&Response::ack()).unwrap_or(JsValue::UNDEFINED)
        }
        Route::Acknowledge { count } => {
            log::info!("{} apps saved", count);
            to_js(&Response::ack()).unwrap_or(JsValue::UNDEFINED)
        }
        Route::Ignore => JsValue::UNDEFINED,
    }
}

fn handle_install(reason: String, version: String) {
    match InstallReason::parse(&reason) {
        InstallReason::Install => {
            log::info!("Extension installed");
            spawn_local(async {
                if let Err(e) = storage::seed_defaults().await {
                    log::warn!("Seeding storage failed: {}", e);
                }
            });
        }
        InstallReason::Update => log::info!("Updated to version {}", version),
        InstallReason::Other => {}
    }
}

fn handle_tab_updated(tab_id: i32, status: String, url: String, config: &ScrapeConfig) {
    if let Some(badge) = badge_for(&status, &url, config) {
        spawn_local(async move {
            if let Err(e) = bridge::set_badge(tab_id, badge.text, badge.color).await {
                log::debug!("Setting badge failed: {}", js_reason(&e));
            }
        });
    }
}

pub fn start(config: ScrapeConfig) -> Result<(), BridgeError> {
    let config = Rc::new(config);

    let on_message = {
        let config = config.clone();
        Closure::wrap(Box::new(move |message: JsValue| handle_message(message, &config))
            as Box<dyn Fn(JsValue) -> JsValue>)
    };
    bridge::on_runtime_message(on_message.as_ref().unchecked_ref())
        .map_err(|e| BridgeError::Messaging(js_reason(&e)))?;
    on_message.forget();

    let on_installed = Closure::wrap(Box::new(handle_install) as Box<dyn Fn(String, String)>);
    bridge::on_installed(on_installed.as_ref().unchecked_ref())
        .map_err(|e| BridgeError::Messaging(js_reason(&e)))?;
    on_installed.forget();

    let on_tab_updated = Closure::wrap(Box::new(move |tab_id: i32, status: String, url: String| {
        handle_tab_updated(tab_id, status, url, &config)
    }) as Box<dyn Fn(i32, String, String)>);
    bridge::on_tab_updated(on_tab_updated.as_ref().unchecked_ref())
        .map_err(|e| BridgeError::Messaging(js_reason(&e)))?;
    on_tab_updated.forget();

    storage::on_catalog_changed(|change| {
        log::info!("Catalog now holds {} apps", change.apps.len());
    })?;

    log::info!("Background started");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_badge_only_for_loaded_portal_pages() {
        let config = ScrapeConfig::default();

        assert_eq!(
            badge_for("complete", "https://myapps.microsoft.com/", &config),
            Some(Badge {
                text: BADGE_TEXT,
                color: BADGE_COLOR
            })
        );
        assert!(badge_for("complete", "https://myapplications.microsoft.com/x", &config).is_some());
        assert_eq!(badge_for("loading", "https://myapps.microsoft.com/", &config), None);
        assert_eq!(badge_for("complete", "https://portal.azure.com/", &config), None);
    }

    #[test]
    fn test_install_reason() {
        assert_eq!(InstallReason::parse("install"), InstallReason::Install);
        assert_eq!(InstallReason::parse("update"), InstallReason::Update);
        assert_eq!(InstallReason::parse("chrome_update"), InstallReason::Other);
    }

    #[test]
    fn test_route() {
        assert_eq!(route(Some(Request::GetApps)), Route::ReadCatalog);
        assert_eq!(route(Some(Request::OpenMyApps)), Route::OpenPortal);
        assert_eq!(
            route(Some(Request::AppsSaved { count: 4 })),
            Route::Acknowledge { count: 4 }
        );
        assert_eq!(route(Some(Request::ScrapeApps)), Route::Ignore);
        assert_eq!(route(None), Route::Ignore);
    }
}
