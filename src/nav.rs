//! Navigation handoff for the "Start" action
//!
//! Starting a task never touches flags. The tracker turns the task's route
//! into a [`NavigationRequest`] and hands it to whatever [`Navigator`] the
//! host provides; the destination flow is what eventually sets the flag.

use crate::models::{OnboardingTask, TaskRoute};
use anyhow::Result;
use serde::Serialize;

/// Sub-page selection passed along with the request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavState {
    pub active_page: Option<String>,
    pub active_tab: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationRequest {
    pub task_id: String,
    /// Path plus `page`/`tab` query parameters
    pub target: String,
    /// Present only when the route selects a sub-page
    pub state: Option<NavState>,
}

impl NavigationRequest {
    pub fn for_route(task_id: &str, route: &TaskRoute) -> Self {
        let mut query = Vec::new();
        if let Some(page) = route.page {
            query.push(format!("page={}", page));
        }
        if let Some(tab) = route.tab {
            query.push(format!("tab={}", tab));
        }

        let target = if query.is_empty() {
            route.path.to_string()
        } else {
            format!("{}?{}", route.path, query.join("&"))
        };

        let state = route.has_sub_page().then(|| NavState {
            active_page: route.page.map(str::to_string),
            active_tab: route.tab.map(str::to_string),
        });

        Self {
            task_id: task_id.to_string(),
            target,
            state,
        }
    }

    pub fn for_task(task: &OnboardingTask) -> Self {
        Self::for_route(task.id, &task.route)
    }
}

/// Host-provided navigation
pub trait Navigator {
    fn navigate(&mut self, request: &NavigationRequest) -> Result<()>;
}

/// Keeps every request it receives (embedding and tests)
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    pub requests: Vec<NavigationRequest>,
}

impl Navigator for RecordingNavigator {
    fn navigate(&mut self, request: &NavigationRequest) -> Result<()> {
        self.requests.push(request.clone());
        Ok(())
    }
}
