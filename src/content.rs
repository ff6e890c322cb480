/// Content script: drives the scrape session against the live portal page

use crate::app_data::ApplicationRecord;
use crate::bridge::{self, from_js, js_reason, to_js};
use crate::config::ScrapeConfig;
use crate::error::BridgeError;
use crate::messages::{Request, Response};
use crate::network::CaptureEnvelope;
use crate::normalize::{normalize_records, ExtractionContext};
use crate::orchestrator::{Effect, Orchestrator, Phase, Trigger};
use crate::portal::page_origin;
use crate::storage::{save_catalog, StoredCatalog};
use crate::strategies::{run_pass, ScrapePass, StrategyOutcome};
use gloo_timers::callback::{Interval, Timeout};
use serde_json::Value;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Element, MessageEvent, MutationObserver, MutationObserverInit};

thread_local! {
    // One session per page load
    static SESSION: RefCell<Option<Rc<ContentSession>>> = const { RefCell::new(None) };
}

/// The document being scraped plus what is needed to normalize its records
pub struct LivePage {
    root: Element,
    origin: String,
    context: ExtractionContext,
}

impl LivePage {
    pub fn from_window(config: &ScrapeConfig) -> Result<LivePage, BridgeError> {
        let window = web_sys::window().ok_or(BridgeError::Unavailable("window"))?;
        let document = window.document().ok_or(BridgeError::Unavailable("document"))?;
        let root = document
            .document_element()
            .ok_or(BridgeError::Unavailable("document element"))?;
        let href = window
            .location()
            .href()
            .map_err(|_| BridgeError::Unavailable("location"))?;

        let base = match page_origin(&href) {
            Some(base) => base,
            None => config
                .portal_home_url()
                .map_err(|_| BridgeError::Unavailable("page origin"))?,
        };
        let origin = base.origin().ascii_serialization();

        Ok(LivePage {
            root,
            origin,
            context: ExtractionContext::new(config, base),
        })
    }

    pub fn scrape(&self) -> ScrapePass {
        run_pass(&self.root, &self.context)
    }

    fn scrape_records(&self) -> Vec<ApplicationRecord> {
        let pass = self.scrape();
        match pass.outcomes.last() {
            Some(StrategyOutcome::Matched { strategy, admitted }) => {
                log::debug!("{:?} strategy found {} apps", strategy.kind, admitted);
            }
            _ => log::debug!(
                "No apps on page yet ({} strategies tried, {} failed)",
                pass.outcomes.len(),
                pass.failures().count()
            ),
        }
        pass.records
    }
}

#[derive(Default)]
struct Watchers {
    observer: Option<(MutationObserver, Closure<dyn FnMut(js_sys::Array, MutationObserver)>)>,
    retry: Option<Interval>,
    debounce: Option<Timeout>,
}

impl Watchers {
    fn is_armed(&self) -> bool {
        self.observer.is_some() || self.retry.is_some() || self.debounce.is_some()
    }

    fn disarm(&mut self) {
        if let Some((observer, _callback)) = self.observer.take() {
            observer.disconnect();
        }
        // Dropping gloo timers clears them
        self.retry = None;
        self.debounce = None;
    }
}

struct ContentSession {
    config: ScrapeConfig,
    page: LivePage,
    orchestrator: RefCell<Orchestrator>,
    watchers: RefCell<Watchers>,
}

fn dispatch(session: &Rc<ContentSession>, trigger: Trigger) {
    let effects = session
        .orchestrator
        .borrow_mut()
        .on_trigger(trigger, || session.page.scrape_records());
    apply(session, effects);
}

fn apply(session: &Rc<ContentSession>, effects: Vec<Effect>) {
    for effect in effects {
        match effect {
            Effect::ArmWatchers => arm(session),
            Effect::RestartDebounce => restart_debounce(session),
            Effect::Persist(records) => persist(records),
            Effect::Disarm => session.watchers.borrow_mut().disarm(),
        }
    }
}

fn observe_mutations(
    session: &Rc<ContentSession>,
) -> Result<(MutationObserver, Closure<dyn FnMut(js_sys::Array, MutationObserver)>), BridgeError> {
    let weak: Weak<ContentSession> = Rc::downgrade(session);
    let callback = Closure::wrap(Box::new(move |_records: js_sys::Array, _observer: MutationObserver| {
        if let Some(session) = weak.upgrade() {
            dispatch(&session, Trigger::Mutation);
        }
    }) as Box<dyn FnMut(js_sys::Array, MutationObserver)>);

    let observer = MutationObserver::new(callback.as_ref().unchecked_ref())
        .map_err(|e| BridgeError::Hook {
            primitive: "MutationObserver",
            reason: js_reason(&e),
        })?;

    let init = MutationObserverInit::new();
    init.set_child_list(true);
    init.set_subtree(true);
    observer
        .observe_with_options(&session.page.root, &init)
        .map_err(|e| BridgeError::Hook {
            primitive: "MutationObserver",
            reason: js_reason(&e),
        })?;

    Ok((observer, callback))
}

fn arm(session: &Rc<ContentSession>) {
    // Without an observer the retry timer alone still bounds the wait
    let observer = match observe_mutations(session) {
        Ok(observer) => Some(observer),
        Err(e) => {
            log::warn!("Watching DOM changes failed, relying on retries: {}", e);
            None
        }
    };

    let weak = Rc::downgrade(session);
    let retry = Interval::new(session.config.retry_interval_ms, move || {
        if let Some(session) = weak.upgrade() {
            dispatch(&session, Trigger::RetryTick);
        }
    });

    let mut watchers = session.watchers.borrow_mut();
    watchers.observer = observer;
    watchers.retry = Some(retry);
}

fn restart_debounce(session: &Rc<ContentSession>) {
    let weak = Rc::downgrade(session);
    let timeout = Timeout::new(session.config.debounce_ms, move || {
        if let Some(session) = weak.upgrade() {
            dispatch(&session, Trigger::DebounceElapsed);
        }
    });

    // Replacing the previous timeout cancels it
    session.watchers.borrow_mut().debounce = Some(timeout);
}

fn now_iso() -> String {
    String::from(js_sys::Date::new_0().to_iso_string())
}

fn persist(records: Vec<ApplicationRecord>) {
    let Some(catalog) = StoredCatalog::from_records(records, now_iso()) else {
        return;
    };

    spawn_local(async move {
        let count = catalog.apps.len();
        if let Err(e) = save_catalog(&catalog).await {
            log::warn!("Saving {} apps failed: {}", count, e);
            return;
        }
        log::info!("Saved {} apps", count);

        let notify = to_js(&Request::AppsSaved { count });
        if let Ok(message) = notify {
            if let Err(e) = bridge::send_runtime_message(message).await {
                log::debug!("Nobody listening for appsSaved: {}", js_reason(&e));
            }
        }
    });
}

fn force_pass(session: &Rc<ContentSession>) -> usize {
    let (count, effects) = session
        .orchestrator
        .borrow_mut()
        .force_pass(|| session.page.scrape_records());
    apply(session, effects);
    count
}

fn listen_for_requests(session: &Rc<ContentSession>) -> Result<(), BridgeError> {
    let weak = Rc::downgrade(session);
    let handler = Closure::wrap(Box::new(move |message: JsValue| -> JsValue {
        let request = from_js::<Value>(message).ok().and_then(|m| Request::parse(&m));
        let (Some(Request::ScrapeApps), Some(session)) = (request, weak.upgrade()) else {
            return JsValue::UNDEFINED;
        };

        let count = force_pass(&session);
        to_js(&Response::scraped(count)).unwrap_or(JsValue::UNDEFINED)
    }) as Box<dyn Fn(JsValue) -> JsValue>);

    bridge::on_runtime_message(handler.as_ref().unchecked_ref())
        .map_err(|e| BridgeError::Messaging(js_reason(&e)))?;
    handler.forget();
    Ok(())
}

fn listen_for_captures(session: &Rc<ContentSession>) -> Result<(), BridgeError> {
    let window = web_sys::window().ok_or(BridgeError::Unavailable("window"))?;
    let weak = Rc::downgrade(session);
    let origin = session.page.origin.clone();

    let listener = Closure::wrap(Box::new(move |event: MessageEvent| {
        if event.origin() != origin {
            return;
        }
        let Some(apps) = from_js::<Value>(event.data())
            .ok()
            .and_then(|data| CaptureEnvelope::open(&data))
        else {
            return;
        };
        if let Some(session) = weak.upgrade() {
            let records = normalize_records(apps, &session.page.context);
            dispatch(&session, Trigger::Captured(records));
        }
    }) as Box<dyn Fn(MessageEvent)>);

    window
        .add_event_listener_with_callback("message", listener.as_ref().unchecked_ref())
        .map_err(|e| BridgeError::Messaging(js_reason(&e)))?;
    listener.forget();
    Ok(())
}

/// Where the running session stands, and whether any watcher or timer is still live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStatus {
    pub phase: Phase,
    pub armed: bool,
}

/// `None` until `start` has run on this page
pub fn session_status() -> Option<SessionStatus> {
    SESSION.with(|slot| {
        slot.borrow().as_ref().map(|session| SessionStatus {
            phase: session.orchestrator.borrow().phase(),
            armed: session.watchers.borrow().is_armed(),
        })
    })
}

/// Start scraping the current page. Safe to call once per page load; later calls are ignored.
pub fn start(config: ScrapeConfig) -> Result<(), BridgeError> {
    if SESSION.with(|slot| slot.borrow().is_some()) {
        log::debug!("Content script already running");
        return Ok(());
    }

    let page = LivePage::from_window(&config)?;
    let session = Rc::new(ContentSession {
        orchestrator: RefCell::new(Orchestrator::new(&config)),
        watchers: RefCell::new(Watchers::default()),
        config,
        page,
    });
    SESSION.with(|slot| *slot.borrow_mut() = Some(session.clone()));

    if let Err(e) = listen_for_requests(&session) {
        log::warn!("scrapeApps requests unavailable: {}", e);
    }
    if let Err(e) = listen_for_captures(&session) {
        log::debug!("API captures unavailable: {}", e);
    }

    log::info!("Content script started on {}", session.page.origin);
    let effects = session
        .orchestrator
        .borrow_mut()
        .start(|| session.page.scrape_records());
    apply(&session, effects);
    Ok(())
}
