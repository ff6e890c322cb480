/// Data structures for My Apps Launcher

use serde::{Deserialize, Serialize};

/// One launchable application as stored and displayed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApplicationRecord {
    pub name: String,
    pub url: String,
    /// Absolute image URL, empty when the portal offered none
    #[serde(default)]
    pub icon: String,
}

impl ApplicationRecord {
    pub fn new(name: String, url: String, icon: String) -> ApplicationRecord {
        ApplicationRecord { name, url, icon }
    }

    pub fn has_icon(&self) -> bool {
        !self.icon.is_empty()
    }
}
