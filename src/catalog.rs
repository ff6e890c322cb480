/// Catalog operations for the popup: search, sorting, export

use crate::app_data::ApplicationRecord;
use crate::storage::SortPreference;
use regex::Regex;
use serde::Serialize;
use std::cmp::Ordering;
use std::sync::LazyLock;

static ISO_STAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})-(\d{2})-(\d{2})T(\d{2}):(\d{2}):(\d{2})")
        .expect("valid timestamp regex (verified by tests)")
});

/// Case-insensitive substring match on the name; a blank query keeps everything
pub fn filter_apps(apps: &[ApplicationRecord], query: &str) -> Vec<ApplicationRecord> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return apps.to_vec();
    }

    apps.iter()
        .filter(|app| app.name.to_lowercase().contains(&query))
        .cloned()
        .collect()
}

fn compare_names(a: &ApplicationRecord, b: &ApplicationRecord) -> Ordering {
    a.name.to_lowercase().cmp(&b.name.to_lowercase())
}

/// Stable sort by lowercase name; `None` keeps the stored (scrape) order
pub fn sort_apps(mut apps: Vec<ApplicationRecord>, sort: SortPreference) -> Vec<ApplicationRecord> {
    match sort {
        SortPreference::None => {}
        SortPreference::Asc => apps.sort_by(compare_names),
        SortPreference::Desc => apps.sort_by(|a, b| compare_names(b, a)),
    }
    apps
}

/// What the popup shows for a search box value and sort setting
pub fn visible_apps(
    apps: &[ApplicationRecord],
    query: &str,
    sort: SortPreference,
) -> Vec<ApplicationRecord> {
    sort_apps(filter_apps(apps, query), sort)
}

/// Placeholder letter for apps without an icon
pub fn app_initial(name: &str) -> String {
    name.trim()
        .chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_else(|| "?".to_string())
}

/// File body for "export"
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportDocument {
    pub apps: Vec<ApplicationRecord>,
    #[serde(rename = "exportedAt")]
    pub exported_at: String,
    pub count: usize,
}

impl ExportDocument {
    pub fn new(apps: Vec<ApplicationRecord>, exported_at: String) -> Self {
        let count = apps.len();
        ExportDocument {
            apps,
            exported_at,
            count,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// `my-apps-export-YYYYMMDD-HHmmss.json` from an ISO-8601 timestamp
pub fn export_filename(iso_timestamp: &str) -> String {
    let stamp = ISO_STAMP.captures(iso_timestamp.trim()).map(|caps| {
        format!(
            "{}{}{}-{}{}{}",
            &caps[1], &caps[2], &caps[3], &caps[4], &caps[5], &caps[6]
        )
    });

    match stamp {
        Some(stamp) => format!("my-apps-export-{}.json", stamp),
        None => "my-apps-export.json".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(name: &str) -> ApplicationRecord {
        ApplicationRecord::new(name.to_string(), format!("https://apps/{}", name), String::new())
    }

    fn names(apps: &[ApplicationRecord]) -> Vec<&str> {
        apps.iter().map(|a| a.name.as_str()).collect()
    }

    #[test]
    fn test_filter_apps() {
        let apps = vec![app("Outlook"), app("OneDrive"), app("Teams"), app("Power BI")];

        assert_eq!(names(&filter_apps(&apps, "o")), vec!["Outlook", "OneDrive", "Power BI"]);
        assert_eq!(names(&filter_apps(&apps, "  TEAMS ")), vec!["Teams"]);
        assert_eq!(filter_apps(&apps, "   ").len(), 4);
        assert!(filter_apps(&apps, "salesforce").is_empty());
    }

    #[test]
    fn test_sort_apps() {
        let apps = vec![app("teams"), app("Outlook"), app("azure"), app("OneDrive")];

        assert_eq!(
            names(&sort_apps(apps.clone(), SortPreference::None)),
            vec!["teams", "Outlook", "azure", "OneDrive"]
        );
        assert_eq!(
            names(&sort_apps(apps.clone(), SortPreference::Asc)),
            vec!["azure", "OneDrive", "Outlook", "teams"]
        );
        assert_eq!(
            names(&sort_apps(apps, SortPreference::Desc)),
            vec!["teams", "Outlook", "OneDrive", "azure"]
        );
    }

    #[test]
    fn test_sort_is_stable_for_equal_names() {
        let mut first = app("Mail");
        first.url = "https://first".to_string();
        let mut second = app("mail");
        second.url = "https://second".to_string();

        let sorted = sort_apps(vec![first, second], SortPreference::Asc);

        assert_eq!(sorted[0].url, "https://first");
    }

    #[test]
    fn test_visible_apps_filters_then_sorts() {
        let apps = vec![app("Word"), app("Excel"), app("PowerPoint"), app("Whiteboard")];

        let visible = visible_apps(&apps, "w", SortPreference::Desc);

        assert_eq!(names(&visible), vec!["Word", "Whiteboard", "PowerPoint"]);
    }

    #[test]
    fn test_app_initial() {
        assert_eq!(app_initial("outlook"), "O");
        assert_eq!(app_initial("  ümlaut"), "Ü");
        assert_eq!(app_initial(""), "?");
    }

    #[test]
    fn test_export_document() {
        let doc = ExportDocument::new(vec![app("Teams")], "2026-10-19T08:05:09.123Z".to_string());

        let value: serde_json::Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();

        assert_eq!(value["count"], 1);
        assert_eq!(value["exportedAt"], "2026-10-19T08:05:09.123Z");
        assert_eq!(value["apps"][0]["name"], "Teams");
    }

    #[test]
    fn test_export_filename() {
        assert_eq!(
            export_filename("2026-10-19T08:05:09.123Z"),
            "my-apps-export-20261019-080509.json"
        );
        assert_eq!(export_filename("yesterday"), "my-apps-export.json");
    }

    #[test]
    fn test_export_filename_reuses_compiled_pattern() {
        let first = export_filename(" 2026-01-02T03:04:05Z ");
        let second = export_filename("2026-01-02T03:04:05+02:00");

        assert_eq!(first, "my-apps-export-20260102-030405.json");
        assert_eq!(second, first);
        assert_eq!(export_filename("2026-01-02 03:04:05"), "my-apps-export.json");
    }
}
