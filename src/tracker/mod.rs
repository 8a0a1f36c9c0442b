//! Onboarding progress tracker
//!
//! [`OnboardingTracker`] reads flags through an injected [`FlagStore`],
//! derives task statuses with [`derive::evaluate`] and keeps the one piece
//! of state that outlives a refresh: the user's manual task selection.
//!
//! # Example
//!
//! ```
//! use ontrack::store::{FlagStore, MemoryFlagStore};
//! use ontrack::tracker::{OnboardingTracker, SelectionPolicy};
//!
//! let store = MemoryFlagStore::new();
//! store.set("companyProfileDone", true).unwrap();
//!
//! let mut tracker = OnboardingTracker::new(store, SelectionPolicy::RespectManual);
//! let view = tracker.refresh();
//! assert_eq!(view.selected, "entity");
//! assert_eq!(view.snapshot.percent_complete, 29);
//! ```

pub mod catalog;
pub mod derive;
pub mod refresh;
pub mod selection;

pub use derive::{evaluate, ProgressSnapshot, SetupProgress, TaskProgress};
pub use refresh::{Trigger, TriggerSource};
pub use selection::{Selection, SelectionOutcome, SelectionPolicy};

use crate::error::TrackerError;
use crate::models::OnboardingTask;
use crate::nav::{NavigationRequest, Navigator};
use crate::store::{read_flags, FlagStore};
use anyhow::Result;
use std::ops::ControlFlow;
use std::time::Duration;

/// Result of one refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerView {
    pub snapshot: ProgressSnapshot,
    pub selected: &'static str,
    /// Whether `selected` came from an explicit user choice
    pub manual: bool,
    /// Whether anything differs from the previous refresh
    pub changed: bool,
}

pub struct OnboardingTracker<S> {
    store: S,
    selection: Selection,
    last: Option<(ProgressSnapshot, &'static str)>,
}

impl<S: FlagStore> OnboardingTracker<S> {
    pub fn new(store: S, policy: SelectionPolicy) -> Self {
        Self {
            store,
            selection: Selection::new(policy),
            last: None,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.selection.policy()
    }

    /// Derive progress from a fresh read of the store. Does not touch selection.
    pub fn snapshot(&self) -> ProgressSnapshot {
        evaluate(read_flags(&self.store))
    }

    /// Re-read flags, derive progress and apply the selection policy
    pub fn refresh(&mut self) -> TrackerView {
        let snapshot = self.snapshot();
        let outcome = self.selection.apply(&snapshot);

        let changed = match &self.last {
            Some((prev, prev_selected)) => *prev != snapshot || *prev_selected != outcome.task_id,
            None => true,
        };
        if changed {
            log::debug!(
                "Progress {}% ({}/{} done), selected '{}'{}",
                snapshot.percent_complete,
                snapshot.done_count,
                snapshot.tasks.len(),
                outcome.task_id,
                if outcome.manual { " (manual)" } else { "" }
            );
        }
        self.last = Some((snapshot.clone(), outcome.task_id));

        TrackerView {
            snapshot,
            selected: outcome.task_id,
            manual: outcome.manual,
            changed,
        }
    }

    /// Record an explicit user selection
    pub fn select(&mut self, input: &str) -> Result<&'static OnboardingTask, TrackerError> {
        let task = catalog::resolve(input)?;
        let snapshot = self.snapshot();
        self.selection.select(task.id, &snapshot);
        Ok(task)
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Hand the given task (or the current selection) to `navigator`.
    /// Flags are left untouched.
    pub fn start<N: Navigator + ?Sized>(
        &mut self,
        input: Option<&str>,
        navigator: &mut N,
    ) -> Result<NavigationRequest> {
        let task = match input {
            Some(input) => catalog::resolve(input)?,
            None => {
                let selected = self.refresh().selected;
                catalog::find(selected).ok_or_else(|| {
                    TrackerError::UnknownTask(selected.to_string(), String::new())
                })?
            }
        };

        let request = NavigationRequest::for_task(task);
        log::info!("Starting task '{}' -> {}", task.id, request.target);
        navigator.navigate(&request)?;
        Ok(request)
    }

    /// Refresh on every trigger from a merged poll + notification source.
    ///
    /// `on_update` sees every trigger, including ones that changed nothing;
    /// it returns `ControlFlow::Break` to stop. `max_triggers` bounds the
    /// loop (the initial evaluation counts as one).
    pub fn watch<F>(&mut self, interval: Duration, max_triggers: Option<usize>, mut on_update: F) -> Result<()>
    where
        F: FnMut(&Trigger, &TrackerView) -> Result<ControlFlow<()>>,
    {
        let source = TriggerSource::new(self.store.subscribe(), interval);
        if !source.has_notifications() {
            log::debug!("Store has no change signal, polling every {:?}", interval);
        }

        let limit = max_triggers.unwrap_or(usize::MAX);
        for trigger in source.take(limit) {
            log::trace!("Refresh trigger: {}", trigger.label());
            let view = self.refresh();
            if on_update(&trigger, &view)?.is_break() {
                break;
            }
        }
        Ok(())
    }
}
