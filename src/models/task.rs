use serde::{Deserialize, Serialize};
use crate::models::Flag;

/// Derived onboarding task status
///
/// Never persisted; recomputed from the flag set on every evaluation.
/// Variants are declared in rank order so `Ord` matches
/// not-started < in-progress < done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "not-started",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Done => "done",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "not-started" => Some(TaskStatus::NotStarted),
            "in-progress" => Some(TaskStatus::InProgress),
            "done" => Some(TaskStatus::Done),
            _ => None,
        }
    }

    pub fn rank(&self) -> u8 {
        *self as u8
    }

    pub fn is_done(&self) -> bool {
        matches!(self, TaskStatus::Done)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the "Start" action for a task leads.
///
/// `page` and `tab` select a sub-page of the destination and are passed
/// along as navigation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaskRoute {
    pub path: &'static str,
    pub page: Option<&'static str>,
    pub tab: Option<&'static str>,
}

impl TaskRoute {
    pub const fn path(path: &'static str) -> Self {
        Self { path, page: None, tab: None }
    }

    pub const fn sub_page(path: &'static str, page: &'static str, tab: Option<&'static str>) -> Self {
        Self { path, page: Some(page), tab }
    }

    pub fn has_sub_page(&self) -> bool {
        self.page.is_some() || self.tab.is_some()
    }
}

/// What marks a task done
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "flag")]
pub enum Completion {
    /// Done as soon as anyone can see the tracker (the account exists)
    Always,
    /// Done once the flag is set
    Flag(Flag),
    /// No backing flag yet; never leaves not-started
    Untracked,
}

/// One step of the fixed onboarding sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OnboardingTask {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub completion: Completion,
    pub route: TaskRoute,
}

impl OnboardingTask {
    /// Flag whose value marks this task done, if any
    pub fn depends_on(&self) -> Option<Flag> {
        match self.completion {
            Completion::Flag(flag) => Some(flag),
            Completion::Always | Completion::Untracked => None,
        }
    }
}
