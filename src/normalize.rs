/// Turning raw DOM elements and API objects into `ApplicationRecord`s

use crate::app_data::ApplicationRecord;
use crate::config::ScrapeConfig;
use crate::dom::DomNode;
use crate::error::{ConfigError, PayloadError};
use crate::portal::resolve_url;
use serde_json::Value;
use std::collections::HashSet;
use url::Url;

const NAME_CLASS_SELECTOR: &str = r#"[class*="name"], [class*="Name"], [class*="title"]"#;
const LEAF_TEXT_SELECTOR: &str = "span, div";
const STYLED_ICON_SELECTOR: &str = r#"[class*="icon"] img, [class*="logo"] img"#;

/// Fields holding the item list when the payload is an object
const LIST_FIELDS: &[&str] = &["appList", "value", "items", "list"];
const NAME_FIELDS: &[&str] = &["displayName", "name", "appDisplayName"];
const URL_FIELDS: &[&str] = &["launchUrl", "loginUrl", "url", "homepageUrl"];
const ICON_FIELDS: &[&str] = &["logoUrl", "iconUrl", "logo"];

/// Per-page inputs to normalization
#[derive(Debug, Clone)]
pub struct ExtractionContext {
    pub base: Url,
    pub portal_home: String,
    pub max_name_len: usize,
}

impl ExtractionContext {
    pub fn new(config: &ScrapeConfig, base: Url) -> ExtractionContext {
        ExtractionContext {
            base,
            portal_home: config.portal_home.clone(),
            max_name_len: config.max_name_len,
        }
    }

    /// Context for a page whose origin is not known, relative links resolve against the portal
    pub fn for_portal(config: &ScrapeConfig) -> Result<ExtractionContext, ConfigError> {
        Ok(ExtractionContext::new(config, config.portal_home_url()?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSource {
    Dom,
    Network,
}

/// Raw strings pulled from one element or API item, not yet validated
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub source: CandidateSource,
    pub name: Option<String>,
    pub url: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    EmptyName,
    NameTooLong(usize),
    Duplicate(String),
    /// DOM candidate with neither a link nor an icon
    NoTarget,
}

/// Admits candidates into one pass's result set: bounds names, drops repeats, absolutizes URLs
#[derive(Debug)]
pub struct RecordCollector<'a> {
    context: &'a ExtractionContext,
    seen: HashSet<String>,
    records: Vec<ApplicationRecord>,
}

impl<'a> RecordCollector<'a> {
    pub fn new(context: &'a ExtractionContext) -> Self {
        RecordCollector {
            context,
            seen: HashSet::new(),
            records: Vec::new(),
        }
    }

    pub fn offer(&mut self, candidate: Candidate) -> Result<(), Rejection> {
        let name = candidate
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or(Rejection::EmptyName)?;

        let len = name.chars().count();
        if len > self.context.max_name_len {
            return Err(Rejection::NameTooLong(len));
        }
        if self.seen.contains(name) {
            return Err(Rejection::Duplicate(name.to_string()));
        }

        let url = candidate
            .url
            .as_deref()
            .and_then(|raw| resolve_url(&self.context.base, raw));
        let icon = candidate
            .icon
            .as_deref()
            .and_then(|raw| resolve_url(&self.context.base, raw));

        let url = match candidate.source {
            CandidateSource::Dom => match (url, &icon) {
                (Some(url), _) => url,
                (None, Some(_)) => self.context.portal_home.clone(),
                (None, None) => return Err(Rejection::NoTarget),
            },
            CandidateSource::Network => url.unwrap_or_default(),
        };

        self.seen.insert(name.to_string());
        self.records.push(ApplicationRecord::new(
            name.to_string(),
            url,
            icon.unwrap_or_default(),
        ));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<ApplicationRecord> {
        self.records
    }
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

/// Name: accessible name, title, name-like descendant, innermost leaf text, full text
fn element_name<N: DomNode>(el: &N) -> Option<String> {
    non_empty(el.attribute("aria-label"))
        .or_else(|| non_empty(el.attribute("title")))
        .or_else(|| {
            let labelled = el.select_first(NAME_CLASS_SELECTOR).ok().flatten();
            non_empty(labelled.map(|node| node.text_content()))
        })
        .or_else(|| {
            let leaf = el.select_all(LEAF_TEXT_SELECTOR).ok().and_then(|nodes| {
                nodes
                    .into_iter()
                    .find(|node| node.tag_name() == "span" || node.child_element_count() == 0)
            });
            non_empty(leaf.map(|node| node.text_content()))
        })
        .or_else(|| non_empty(Some(el.text_content())))
}

fn link_of<N: DomNode>(node: Option<N>) -> Option<String> {
    non_empty(node.and_then(|n| n.attribute("href")))
}

/// URL: own link, href attribute, descendant link, ancestor link
fn element_url<N: DomNode>(el: &N) -> Option<String> {
    let own = if matches!(el.tag_name().as_str(), "a" | "area") {
        non_empty(el.attribute("href"))
    } else {
        None
    };

    own.or_else(|| non_empty(el.attribute("href")))
        .or_else(|| link_of(el.select_first("a[href]").ok().flatten()))
        .or_else(|| link_of(el.closest("a[href]").ok().flatten()))
}

/// Icon: image inside an icon/logo container first, then any image
fn element_icon<N: DomNode>(el: &N) -> Option<String> {
    let src = |node: Option<N>| non_empty(node.and_then(|n| n.attribute("src")));

    src(el.select_first(STYLED_ICON_SELECTOR).ok().flatten())
        .or_else(|| src(el.select_first("img[src]").ok().flatten()))
}

pub fn element_candidate<N: DomNode>(el: &N) -> Candidate {
    Candidate {
        source: CandidateSource::Dom,
        name: element_name(el),
        url: element_url(el),
        icon: element_icon(el),
    }
}

/// The sequence of items in an API response: the value itself if it is an array,
/// otherwise the first conventional list field holding an array
pub fn payload_items(payload: &Value) -> Result<&[Value], PayloadError> {
    if let Value::Array(items) = payload {
        return Ok(items.as_slice());
    }

    LIST_FIELDS
        .iter()
        .find_map(|field| payload.get(field).and_then(Value::as_array))
        .map(Vec::as_slice)
        .ok_or(PayloadError::NoItemList)
}

fn first_field(item: &Value, fields: &[&str]) -> Option<String> {
    fields
        .iter()
        .filter_map(|field| item.get(field).and_then(Value::as_str))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

pub fn payload_candidate(item: &Value) -> Candidate {
    Candidate {
        source: CandidateSource::Network,
        name: first_field(item, NAME_FIELDS),
        url: first_field(item, URL_FIELDS),
        icon: first_field(item, ICON_FIELDS),
    }
}

/// Normalize a parsed API response into records
pub fn normalize_payload(
    payload: &Value,
    context: &ExtractionContext,
) -> Result<Vec<ApplicationRecord>, PayloadError> {
    let mut collector = RecordCollector::new(context);

    for item in payload_items(payload)? {
        if let Err(rejection) = collector.offer(payload_candidate(item)) {
            log::debug!("Skipping API item: {:?}", rejection);
        }
    }

    Ok(collector.into_records())
}

/// Parse a response body and normalize it
pub fn normalize_body(
    body: &str,
    context: &ExtractionContext,
) -> Result<Vec<ApplicationRecord>, PayloadError> {
    let payload: Value =
        serde_json::from_str(body).map_err(|e| PayloadError::NotJson(e.to_string()))?;
    normalize_payload(&payload, context)
}

/// Re-admit records handed over from another context (page world captures)
pub fn normalize_records(
    records: Vec<ApplicationRecord>,
    context: &ExtractionContext,
) -> Vec<ApplicationRecord> {
    let mut collector = RecordCollector::new(context);

    for record in records {
        let candidate = Candidate {
            source: CandidateSource::Network,
            name: Some(record.name),
            url: Some(record.url),
            icon: Some(record.icon),
        };
        if let Err(rejection) = collector.offer(candidate) {
            log::debug!("Dropping captured record: {:?}", rejection);
        }
    }

    collector.into_records()
}
