/// `DomNode` over a parsed HTML snapshot, for exercising strategies without a browser

use super::DomNode;
use crate::error::ExtractError;
use scraper::{ElementRef, Html, Selector};

fn parse_selector(selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector).map_err(|e| ExtractError::UnsupportedSelector {
        selector: selector.to_string(),
        reason: format!("{:?}", e),
    })
}

impl<'a> DomNode for ElementRef<'a> {
    fn tag_name(&self) -> String {
        self.value().name().to_lowercase()
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.value().attr(name).map(str::to_string)
    }

    fn text_content(&self) -> String {
        self.text().collect()
    }

    fn child_element_count(&self) -> usize {
        self.children().filter(|child| child.value().is_element()).count()
    }

    fn select_all(&self, selector: &str) -> Result<Vec<Self>, ExtractError> {
        let selector = parse_selector(selector)?;
        Ok(self.select(&selector).collect())
    }

    fn closest(&self, selector: &str) -> Result<Option<Self>, ExtractError> {
        let selector = parse_selector(selector)?;
        Ok(std::iter::once(*self)
            .chain(self.ancestors().filter_map(ElementRef::wrap))
            .find(|el| selector.matches(el)))
    }
}

/// Parse a full page; strategies run from `document.root_element()`
pub fn page(body: &str) -> Html {
    Html::parse_document(&format!("<!DOCTYPE html><html><head></head><body>{}</body></html>", body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_queries() {
        let doc = page(r#"<a href="/x" class="tile"><span>Mail</span><img src="/m.png"></a>"#);
        let root = doc.root_element();

        let tiles = root.select_all(".tile").unwrap();
        assert_eq!(tiles.len(), 1);
        assert_eq!(tiles[0].tag_name(), "a");
        assert_eq!(tiles[0].attribute("href"), Some("/x".to_string()));
        assert_eq!(tiles[0].text_content(), "Mail");
        assert_eq!(tiles[0].child_element_count(), 2);

        let span = tiles[0].select_first("span").unwrap().unwrap();
        let link = span.closest("a").unwrap().unwrap();
        assert_eq!(link.attribute("class"), Some("tile".to_string()));

        // closest includes the element itself
        assert!(tiles[0].closest("a.tile").unwrap().is_some());
    }

    #[test]
    fn test_snapshot_reports_bad_selector() {
        let doc = page("<div></div>");
        let err = doc.root_element().select_all("div[").unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedSelector { .. }));
    }
}
