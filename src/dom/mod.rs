/// Minimal read-only view of a DOM element.
///
/// The extraction code only ever reads the page through this trait, so the
/// same strategies run against the live document (`web_sys::Element`) and
/// against parsed HTML snapshots in tests.

use crate::error::ExtractError;
use wasm_bindgen::JsCast;
use web_sys::Element;

#[cfg(test)]
pub mod snapshot;

pub trait DomNode: Sized + Clone {
    /// Lowercase tag name
    fn tag_name(&self) -> String;

    fn attribute(&self, name: &str) -> Option<String>;

    /// Concatenated text of the element and all of its descendants
    fn text_content(&self) -> String;

    fn child_element_count(&self) -> usize;

    /// Descendants matching `selector`, in document order
    fn select_all(&self, selector: &str) -> Result<Vec<Self>, ExtractError>;

    /// Nearest inclusive ancestor matching `selector`
    fn closest(&self, selector: &str) -> Result<Option<Self>, ExtractError>;

    fn select_first(&self, selector: &str) -> Result<Option<Self>, ExtractError> {
        Ok(self.select_all(selector)?.into_iter().next())
    }
}

impl DomNode for Element {
    fn tag_name(&self) -> String {
        Element::tag_name(self).to_lowercase()
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.get_attribute(name)
    }

    fn text_content(&self) -> String {
        web_sys::Node::text_content(self).unwrap_or_default()
    }

    fn child_element_count(&self) -> usize {
        Element::child_element_count(self) as usize
    }

    fn select_all(&self, selector: &str) -> Result<Vec<Self>, ExtractError> {
        let nodes = self
            .query_selector_all(selector)
            .map_err(|e| ExtractError::UnsupportedSelector {
                selector: selector.to_string(),
                reason: format!("{:?}", e),
            })?;

        Ok((0..nodes.length())
            .filter_map(|i| nodes.get(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect())
    }

    fn closest(&self, selector: &str) -> Result<Option<Self>, ExtractError> {
        Element::closest(self, selector).map_err(|e| ExtractError::Query {
            selector: selector.to_string(),
            reason: format!("{:?}", e),
        })
    }
}
