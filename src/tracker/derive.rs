//! Status derivation
//!
//! Everything here is a pure function of a [`FlagSet`]. Nothing is cached
//! between evaluations, so evaluating the same flags twice yields equal
//! snapshots and duplicate refresh triggers are harmless.

use crate::models::{Completion, Flag, FlagSet, OnboardingTask, TaskStatus};
use crate::tracker::catalog::{self, TASKS};
use serde::Serialize;

/// The two "set up basics" sub-steps shown as a quick tile
pub const SETUP_STEPS: [(&str, Flag); 2] = [
    ("Company profile", Flag::CompanyProfileDone),
    ("Legal entity", Flag::EntityCreated),
];

/// Status of one task.
///
/// A flag-backed task is done once its flag is set. Until then it is
/// in-progress if its predecessor was completed through a flag, otherwise
/// not-started. The account step is always done and does not gate its
/// successor; tasks without a flag never leave not-started.
pub fn derive_status(task: &OnboardingTask, flags: &FlagSet) -> TaskStatus {
    match task.completion {
        Completion::Always => TaskStatus::Done,
        Completion::Untracked => TaskStatus::NotStarted,
        Completion::Flag(flag) if flags.get(flag) => TaskStatus::Done,
        Completion::Flag(_) => {
            let gated_open = catalog::predecessor(task.id)
                .and_then(|prev| prev.depends_on())
                .map(|prev_flag| flags.get(prev_flag))
                .unwrap_or(false);
            if gated_open {
                TaskStatus::InProgress
            } else {
                TaskStatus::NotStarted
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskProgress {
    #[serde(flatten)]
    pub task: &'static OnboardingTask,
    pub status: TaskStatus,
}

/// Progress through the quick-tile sub-steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SetupProgress {
    pub done: usize,
    pub total: usize,
}

/// Everything derived from one flag snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub flags: FlagSet,
    pub tasks: Vec<TaskProgress>,
    pub default_selection: &'static str,
    pub done_count: usize,
    pub percent_complete: u8,
    pub setup: SetupProgress,
}

impl ProgressSnapshot {
    pub fn status_of(&self, task_id: &str) -> Option<TaskStatus> {
        self.tasks.iter().find(|p| p.task.id == task_id).map(|p| p.status)
    }
}

/// First task in sequence order that is not done; the last task when all are
pub fn default_selection(tasks: &[TaskProgress]) -> &'static str {
    tasks
        .iter()
        .find(|p| !p.status.is_done())
        .or_else(|| tasks.last())
        .map(|p| p.task.id)
        .unwrap_or(TASKS[TASKS.len() - 1].id)
}

/// `round(100 * done / total)`; 0 for an empty sequence
pub fn percent_complete(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    (100.0 * done as f64 / total as f64).round() as u8
}

pub fn setup_progress(flags: &FlagSet) -> SetupProgress {
    SetupProgress {
        done: SETUP_STEPS.iter().filter(|(_, flag)| flags.get(*flag)).count(),
        total: SETUP_STEPS.len(),
    }
}

/// Derive the full snapshot from raw flags
pub fn evaluate(flags: FlagSet) -> ProgressSnapshot {
    let tasks: Vec<TaskProgress> = TASKS
        .iter()
        .map(|task| TaskProgress {
            task,
            status: derive_status(task, &flags),
        })
        .collect();

    let done_count = tasks.iter().filter(|p| p.status.is_done()).count();

    ProgressSnapshot {
        flags,
        default_selection: default_selection(&tasks),
        percent_complete: percent_complete(done_count, tasks.len()),
        done_count,
        setup: setup_progress(&flags),
        tasks,
    }
}
