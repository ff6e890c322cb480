/// Scrape session state machine: Idle → Watching → Done.
///
/// The orchestrator owns no timers or observers. Each call returns the
/// effects the caller must carry out: arm the watchers, restart the debounce,
/// persist records or tear the watchers down. Extraction is passed in as a
/// closure and only invoked when a trigger is allowed to scrape.

use crate::app_data::ApplicationRecord;
use crate::config::ScrapeConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// A DOM pass produced this many records
    Scraped(usize),
    /// An intercepted API response produced this many records
    Captured(usize),
    /// Retry budget spent without a result
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Watching { retries: u32 },
    Done(Completion),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    /// Some subtree of the page changed
    Mutation,
    DebounceElapsed,
    RetryTick,
    /// Records normalized from an intercepted API response
    Captured(Vec<ApplicationRecord>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Start the mutation watcher and the retry interval
    ArmWatchers,
    /// Cancel any pending debounce and schedule a new one
    RestartDebounce,
    /// Write the records (with a fresh timestamp) in one update
    Persist(Vec<ApplicationRecord>),
    /// Disconnect the mutation watcher, clear the retry interval and any debounce
    Disarm,
}

#[derive(Debug, Clone)]
pub struct Orchestrator {
    phase: Phase,
    max_retries: u32,
}

impl Orchestrator {
    pub fn new(config: &ScrapeConfig) -> Self {
        Orchestrator {
            phase: Phase::Idle,
            max_retries: config.max_retries,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_done(&self) -> bool {
        matches!(self.phase, Phase::Done(_))
    }

    /// First pass on page load. Only meaningful from `Idle`.
    pub fn start<F>(&mut self, extract: F) -> Vec<Effect>
    where
        F: FnOnce() -> Vec<ApplicationRecord>,
    {
        if self.phase != Phase::Idle {
            return Vec::new();
        }

        let records = extract();
        if records.is_empty() {
            self.phase = Phase::Watching { retries: 0 };
            vec![Effect::ArmWatchers]
        } else {
            self.phase = Phase::Done(Completion::Scraped(records.len()));
            vec![Effect::Persist(records)]
        }
    }

    pub fn on_trigger<F>(&mut self, trigger: Trigger, extract: F) -> Vec<Effect>
    where
        F: FnOnce() -> Vec<ApplicationRecord>,
    {
        match (self.phase, trigger) {
            (Phase::Done(_), _) => Vec::new(),

            (Phase::Watching { .. }, Trigger::Mutation) => vec![Effect::RestartDebounce],
            (Phase::Idle, Trigger::Mutation) => Vec::new(),

            (Phase::Watching { .. }, Trigger::DebounceElapsed) => {
                let records = extract();
                self.finish_if_found(records, Completion::Scraped)
            }
            (Phase::Idle, Trigger::DebounceElapsed) => Vec::new(),

            (Phase::Watching { retries }, Trigger::RetryTick) => {
                let retries = retries.saturating_add(1);
                self.phase = Phase::Watching { retries };

                let effects = self.finish_if_found(extract(), Completion::Scraped);
                if effects.is_empty() && retries >= self.max_retries {
                    log::info!("No applications found after {} attempts", retries);
                    self.phase = Phase::Done(Completion::Exhausted);
                    return vec![Effect::Disarm];
                }
                effects
            }
            (Phase::Idle, Trigger::RetryTick) => Vec::new(),

            (_, Trigger::Captured(records)) => self.finish_if_found(records, Completion::Captured),
        }
    }

    /// Extraction requested from outside (popup/background), allowed in any phase.
    /// Returns the number of records found alongside the effects.
    pub fn force_pass<F>(&mut self, extract: F) -> (usize, Vec<Effect>)
    where
        F: FnOnce() -> Vec<ApplicationRecord>,
    {
        let records = extract();
        let count = records.len();
        if records.is_empty() {
            return (0, Vec::new());
        }

        let mut effects = Vec::new();
        if matches!(self.phase, Phase::Watching { .. }) {
            effects.push(Effect::Disarm);
        }
        if !self.is_done() {
            self.phase = Phase::Done(Completion::Scraped(count));
        }
        effects.push(Effect::Persist(records));
        (count, effects)
    }

    fn finish_if_found(
        &mut self,
        records: Vec<ApplicationRecord>,
        completion: fn(usize) -> Completion,
    ) -> Vec<Effect> {
        if records.is_empty() {
            return Vec::new();
        }

        let mut effects = Vec::new();
        if matches!(self.phase, Phase::Watching { .. }) {
            effects.push(Effect::Disarm);
        }
        self.phase = Phase::Done(completion(records.len()));
        effects.push(Effect::Persist(records));
        effects
    }
}
