/// Cross-context message protocol (`{action: ...}` requests and their responses)

use crate::app_data::ApplicationRecord;
use crate::storage::StoredCatalog;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    GetApps,
    OpenMyApps,
    AppsSaved {
        #[serde(default)]
        count: usize,
    },
    ScrapeApps,
}

impl Request {
    /// `None` for unknown actions and malformed messages, which get no response
    pub fn parse(message: &Value) -> Option<Request> {
        serde_json::from_value(message.clone()).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Apps {
        apps: Vec<ApplicationRecord>,
        #[serde(rename = "lastUpdated")]
        last_updated: Option<String>,
    },
    Scraped {
        success: bool,
        count: usize,
    },
    Ack {
        success: bool,
    },
}

impl Response {
    pub fn ack() -> Self {
        Response::Ack { success: true }
    }

    pub fn scraped(count: usize) -> Self {
        Response::Scraped {
            success: true,
            count,
        }
    }
}

impl From<StoredCatalog> for Response {
    fn from(catalog: StoredCatalog) -> Self {
        Response::Apps {
            apps: catalog.apps,
            last_updated: catalog.last_updated,
        }
    }
}
