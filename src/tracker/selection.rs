use crate::models::{FlagSet, TaskStatus};
use crate::tracker::derive::ProgressSnapshot;

/// How a manual task selection interacts with refreshes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionPolicy {
    /// Keep the user's pick until the picked task's own status changes
    #[default]
    RespectManual,
    /// Snap back to the computed default whenever the flags change
    FollowDefault,
}

impl SelectionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionPolicy::RespectManual => "respect-manual",
            SelectionPolicy::FollowDefault => "follow-default",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "respect-manual" => Some(SelectionPolicy::RespectManual),
            "follow-default" => Some(SelectionPolicy::FollowDefault),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ManualSelection {
    task_id: &'static str,
    /// Status of the task when it was last seen selected
    status: Option<TaskStatus>,
    flags: FlagSet,
}

/// Effective selection after applying the policy to a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionOutcome {
    pub task_id: &'static str,
    pub manual: bool,
}

/// Selection state carried between refreshes
#[derive(Debug, Clone)]
pub struct Selection {
    policy: SelectionPolicy,
    manual: Option<ManualSelection>,
}

impl Selection {
    pub fn new(policy: SelectionPolicy) -> Self {
        Self { policy, manual: None }
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    /// Record an explicit user choice, evaluated against `snapshot`
    pub fn select(&mut self, task_id: &'static str, snapshot: &ProgressSnapshot) {
        self.manual = Some(ManualSelection {
            task_id,
            status: snapshot.status_of(task_id),
            flags: snapshot.flags,
        });
    }

    pub fn clear(&mut self) {
        self.manual = None;
    }

    pub fn manual_task(&self) -> Option<&'static str> {
        self.manual.map(|m| m.task_id)
    }

    /// Decide the selection for a fresh snapshot.
    ///
    /// Without a manual pick this is always the computed default. With one,
    /// the pick survives unless the policy says the change invalidates it.
    pub fn apply(&mut self, snapshot: &ProgressSnapshot) -> SelectionOutcome {
        if let Some(manual) = self.manual {
            let invalidated = match self.policy {
                SelectionPolicy::RespectManual => snapshot.status_of(manual.task_id) != manual.status,
                SelectionPolicy::FollowDefault => snapshot.flags != manual.flags,
            };

            if invalidated {
                log::debug!(
                    "Dropping manual selection '{}' ({}), back to default '{}'",
                    manual.task_id,
                    self.policy.as_str(),
                    snapshot.default_selection
                );
                self.manual = None;
            } else {
                self.manual = Some(ManualSelection {
                    flags: snapshot.flags,
                    ..manual
                });
                return SelectionOutcome { task_id: manual.task_id, manual: true };
            }
        }

        SelectionOutcome {
            task_id: snapshot.default_selection,
            manual: false,
        }
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self::new(SelectionPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::derive::evaluate;

    #[test]
    fn test_policy_conversion() {
        for policy in [SelectionPolicy::RespectManual, SelectionPolicy::FollowDefault] {
            assert_eq!(SelectionPolicy::from_str(policy.as_str()), Some(policy));
        }
        assert_eq!(SelectionPolicy::from_str("always"), None);
        assert_eq!(SelectionPolicy::default(), SelectionPolicy::RespectManual);
    }

    #[test]
    fn test_default_until_first_selection() {
        let mut selection = Selection::default();
        let snapshot = evaluate(FlagSet::default());
        assert_eq!(selection.apply(&snapshot), SelectionOutcome { task_id: "organization", manual: false });

        let snapshot = evaluate(FlagSet::new(true, false, false));
        assert_eq!(selection.apply(&snapshot).task_id, "entity");
    }

    #[test]
    fn test_respect_manual_ignores_unrelated_changes() {
        let mut selection = Selection::new(SelectionPolicy::RespectManual);
        let before = evaluate(FlagSet::new(true, false, false));
        selection.select("account", &before);

        // entity becomes done; account's own status is unchanged
        let after = evaluate(FlagSet::new(true, true, false));
        assert_eq!(selection.apply(&after), SelectionOutcome { task_id: "account", manual: true });
    }

    #[test]
    fn test_respect_manual_recomputes_when_selected_task_changes() {
        let mut selection = Selection::new(SelectionPolicy::RespectManual);
        let before = evaluate(FlagSet::new(true, false, false));
        selection.select("entity", &before);
        assert_eq!(selection.apply(&before).task_id, "entity");

        let after = evaluate(FlagSet::new(true, true, false));
        assert_eq!(selection.apply(&after), SelectionOutcome { task_id: "verification", manual: false });
        assert_eq!(selection.manual_task(), None);
    }

    #[test]
    fn test_follow_default_snaps_back_on_any_flag_change() {
        let mut selection = Selection::new(SelectionPolicy::FollowDefault);
        let before = evaluate(FlagSet::new(true, false, false));
        selection.select("account", &before);

        // Unchanged flags keep the pick
        assert_eq!(selection.apply(&before).task_id, "account");

        let after = evaluate(FlagSet::new(true, false, true));
        assert_eq!(selection.apply(&after), SelectionOutcome { task_id: "entity", manual: false });
    }

    #[test]
    fn test_clear() {
        let mut selection = Selection::default();
        let snapshot = evaluate(FlagSet::default());
        selection.select("payment", &snapshot);
        assert_eq!(selection.manual_task(), Some("payment"));
        selection.clear();
        assert_eq!(selection.apply(&snapshot).task_id, "organization");
    }
}
