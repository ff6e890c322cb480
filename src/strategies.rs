/// Ordered DOM lookup strategies for finding application tiles

use crate::app_data::ApplicationRecord;
use crate::dom::DomNode;
use crate::error::ExtractError;
use crate::normalize::{element_candidate, ExtractionContext, RecordCollector};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// Current portal markup
    CurrentPortal,
    /// Older portal markup
    LegacyPortal,
    /// Class names that merely look like app tiles
    ClassPattern,
    /// Links pointing at a sign-in/launch endpoint
    LaunchLink,
    /// Any clickable element holding an image and short text
    ClickableTile,
}

/// Extra condition an element must meet before it is normalized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    None,
    ImageAndShortText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strategy {
    pub kind: StrategyKind,
    pub selector: &'static str,
    pub requirement: Requirement,
}

const fn strategy(kind: StrategyKind, selector: &'static str) -> Strategy {
    Strategy {
        kind,
        selector,
        requirement: Requirement::None,
    }
}

/// Tried in order; the first one producing a record ends the pass
pub const STRATEGIES: &[Strategy] = &[
    strategy(StrategyKind::CurrentPortal, r#"[data-automationid="AppTile"]"#),
    strategy(StrategyKind::CurrentPortal, r#"[role="listitem"] a[href]"#),
    strategy(StrategyKind::CurrentPortal, ".ms-List-cell a[href]"),
    strategy(StrategyKind::LegacyPortal, ".app-tile"),
    strategy(StrategyKind::LegacyPortal, ".tile-link"),
    strategy(StrategyKind::LegacyPortal, "a[data-appid]"),
    strategy(StrategyKind::ClassPattern, r#"[class*="appTile"]"#),
    strategy(StrategyKind::ClassPattern, r#"[class*="app-tile"]"#),
    strategy(StrategyKind::ClassPattern, r#"[class*="AppCard"]"#),
    strategy(StrategyKind::ClassPattern, r#"[class*="app-card"]"#),
    strategy(StrategyKind::LaunchLink, r#"a[href*="signin/"]"#),
    Strategy {
        kind: StrategyKind::ClickableTile,
        selector: r#"div[role="button"], div[tabindex="0"], a[role="link"]"#,
        requirement: Requirement::ImageAndShortText,
    },
];

#[derive(Debug, Clone, PartialEq)]
pub enum StrategyOutcome {
    Matched { strategy: Strategy, admitted: usize },
    /// Elements were found (or not) but none became a record
    Empty { strategy: Strategy, elements: usize },
    Failed { strategy: Strategy, error: ExtractError },
}

/// Result of one pass over the page
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScrapePass {
    pub records: Vec<ApplicationRecord>,
    pub outcomes: Vec<StrategyOutcome>,
}

impl ScrapePass {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ExtractError> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            StrategyOutcome::Failed { error, .. } => Some(error),
            _ => None,
        })
    }
}

fn meets<N: DomNode>(el: &N, requirement: Requirement, max_name_len: usize) -> bool {
    match requirement {
        Requirement::None => true,
        Requirement::ImageAndShortText => {
            let has_image = matches!(el.select_first("img"), Ok(Some(_)));
            let text = el.text_content();
            let text = text.trim();
            has_image && !text.is_empty() && text.chars().count() < max_name_len
        }
    }
}

fn run_strategy<N: DomNode>(
    root: &N,
    strategy: Strategy,
    collector: &mut RecordCollector<'_>,
    max_name_len: usize,
) -> StrategyOutcome {
    let elements = match root.select_all(strategy.selector) {
        Ok(elements) => elements,
        Err(error) => return StrategyOutcome::Failed { strategy, error },
    };

    let before = collector.len();
    for el in elements.iter().filter(|el| meets(*el, strategy.requirement, max_name_len)) {
        if let Err(rejection) = collector.offer(element_candidate(el)) {
            log::debug!("{:?} skipped an element: {:?}", strategy.kind, rejection);
        }
    }

    match collector.len() - before {
        0 => StrategyOutcome::Empty {
            strategy,
            elements: elements.len(),
        },
        admitted => StrategyOutcome::Matched { strategy, admitted },
    }
}

/// Run `strategies` in order against `root`, stopping at the first that yields records
pub fn run_pass_with<N: DomNode>(
    root: &N,
    strategies: &[Strategy],
    context: &ExtractionContext,
) -> ScrapePass {
    let mut collector = RecordCollector::new(context);
    let mut outcomes = Vec::new();

    for strategy in strategies {
        let outcome = run_strategy(root, *strategy, &mut collector, context.max_name_len);
        if let StrategyOutcome::Failed { error, .. } = &outcome {
            log::debug!("Strategy {:?} failed: {}", strategy.kind, error);
        }

        let matched = matches!(outcome, StrategyOutcome::Matched { .. });
        outcomes.push(outcome);
        if matched {
            break;
        }
    }

    ScrapePass {
        records: collector.into_records(),
        outcomes,
    }
}

/// One scrape pass with the built-in strategy list
pub fn run_pass<N: DomNode>(root: &N, context: &ExtractionContext) -> ScrapePass {
    run_pass_with(root, STRATEGIES, context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScrapeConfig;
    use crate::dom::snapshot::page;

    fn context() -> ExtractionContext {
        ExtractionContext::for_portal(&ScrapeConfig::default()).unwrap()
    }

    fn names(pass: &ScrapePass) -> Vec<&str> {
        pass.records.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_primary_selector_with_duplicate_name() {
        let doc = page(
            r#"
            <div data-automationid="AppTile" aria-label="App A"><a href="/signin/a1">A</a></div>
            <div data-automationid="AppTile" aria-label="App B"><a href="/signin/b">B</a></div>
            <div data-automationid="AppTile" aria-label="App A"><a href="/signin/a2">A again</a></div>
            "#,
        );

        let pass = run_pass(&doc.root_element(), &context());

        assert_eq!(names(&pass), vec!["App A", "App B"]);
        assert_eq!(pass.records[0].url, "https://myapps.microsoft.com/signin/a1");
        assert_eq!(pass.outcomes.len(), 1);
        assert!(matches!(pass.outcomes[0], StrategyOutcome::Matched { admitted: 2, .. }));
    }

    #[test]
    fn test_launch_link_fallback() {
        let doc = page(
            r#"
            <header><a href="/help">Help</a></header>
            <a aria-label="Portal X" href="/signin/abc"></a>
            "#,
        );

        let pass = run_pass(&doc.root_element(), &context());

        assert_eq!(
            pass.records,
            vec![ApplicationRecord::new(
                "Portal X".to_string(),
                "https://myapps.microsoft.com/signin/abc".to_string(),
                String::new(),
            )]
        );
        let last = pass.outcomes.last().unwrap();
        assert!(matches!(
            last,
            StrategyOutcome::Matched { strategy: Strategy { kind: StrategyKind::LaunchLink, .. }, .. }
        ));
    }

    #[test]
    fn test_earlier_strategy_stops_looser_ones() {
        let doc = page(
            r#"
            <div class="app-tile" title="Legacy"><a href="/signin/legacy"></a></div>
            <a aria-label="Loose" href="/signin/loose"></a>
            "#,
        );

        let pass = run_pass(&doc.root_element(), &context());

        assert_eq!(names(&pass), vec!["Legacy"]);
    }

    #[test]
    fn test_clickable_tile_needs_image_and_short_text() {
        let long_text = "word ".repeat(30);
        let doc = page(&format!(
            r#"
            <div role="button" data-href="/x"><img src="/no-name.png"></div>
            <div role="button"><img src="/long.png"><span>{}</span></div>
            <div tabindex="0"><img src="/tools.png"><span>Tools</span></div>
            <div role="button"><span>No image</span></div>
            "#,
            long_text
        ));

        let pass = run_pass(&doc.root_element(), &context());

        assert_eq!(names(&pass), vec!["Tools"]);
        // Icon-only tile gets the portal home as its link
        assert_eq!(pass.records[0].url, "https://myapps.microsoft.com");
        assert_eq!(pass.records[0].icon, "https://myapps.microsoft.com/tools.png");
    }

    #[test]
    fn test_overlong_names_are_excluded() {
        let doc = page(&format!(
            r#"
            <div class="app-tile" aria-label="{}"><a href="/signin/long"></a></div>
            <div class="app-tile" aria-label="Short"><a href="/signin/short"></a></div>
            "#,
            "n".repeat(101)
        ));

        let pass = run_pass(&doc.root_element(), &context());

        assert_eq!(names(&pass), vec!["Short"]);
    }

    #[test]
    fn test_failed_strategy_is_recorded_and_skipped() {
        let broken = Strategy {
            kind: StrategyKind::ClassPattern,
            selector: "div[",
            requirement: Requirement::None,
        };
        let strategies = [broken, strategy(StrategyKind::LegacyPortal, ".tile-link")];
        let doc = page(r#"<a class="tile-link" href="/signin/ok">Ok App</a>"#);

        let pass = run_pass_with(&doc.root_element(), &strategies, &context());

        assert_eq!(names(&pass), vec!["Ok App"]);
        assert_eq!(pass.failures().count(), 1);
        assert!(matches!(pass.outcomes[0], StrategyOutcome::Failed { .. }));
    }

    #[test]
    fn test_empty_page_tries_everything() {
        let doc = page("<main><p>Loading…</p></main>");

        let pass = run_pass(&doc.root_element(), &context());

        assert!(pass.is_empty());
        assert_eq!(pass.outcomes.len(), STRATEGIES.len());
        assert_eq!(pass.failures().count(), 0);
    }

    #[test]
    fn test_pass_is_idempotent() {
        let doc = page(
            r#"
            <li role="listitem"><a href="/signin/1" title="One"></a></li>
            <li role="listitem"><a href="/signin/2" title="Two"></a></li>
            <li role="listitem"><a href="/signin/3" title="Three"></a></li>
            "#,
        );
        let root = doc.root_element();

        let first = run_pass(&root, &context());
        let second = run_pass(&root, &context());

        assert_eq!(first, second);
        assert_eq!(names(&first), vec!["One", "Two", "Three"]);
    }
}
