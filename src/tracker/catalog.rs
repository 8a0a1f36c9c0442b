// The fixed onboarding sequence, in display order

use crate::error::TrackerError;
use crate::models::{Completion, Flag, OnboardingTask, TaskRoute};

pub const TASKS: [OnboardingTask; 7] = [
    OnboardingTask {
        id: "account",
        title: "Create your account",
        description: "Sign up and confirm your email address.",
        completion: Completion::Always,
        route: TaskRoute::sub_page("/settings", "account", Some("profile")),
    },
    OnboardingTask {
        id: "organization",
        title: "Set up your organization",
        description: "Add your company profile: legal name, address and industry.",
        completion: Completion::Flag(Flag::CompanyProfileDone),
        route: TaskRoute::path("/onboarding/company-profile"),
    },
    OnboardingTask {
        id: "entity",
        title: "Create a legal entity",
        description: "Register the entity that will contract and pay workers.",
        completion: Completion::Flag(Flag::EntityCreated),
        route: TaskRoute::path("/entities/new"),
    },
    OnboardingTask {
        id: "verification",
        title: "Verify your entity",
        description: "Upload registration documents so the entity can be verified.",
        completion: Completion::Flag(Flag::EntityVerified),
        route: TaskRoute::sub_page("/entities", "verification", Some("documents")),
    },
    OnboardingTask {
        id: "workers",
        title: "Invite workers",
        description: "Add your first contractors or employees.",
        completion: Completion::Untracked,
        route: TaskRoute::sub_page("/people", "workers", Some("invite")),
    },
    OnboardingTask {
        id: "timeoff",
        title: "Configure time off",
        description: "Choose leave policies and public holiday calendars.",
        completion: Completion::Untracked,
        route: TaskRoute::sub_page("/settings", "time-off", Some("policies")),
    },
    OnboardingTask {
        id: "payment",
        title: "Add a payment method",
        description: "Connect a bank account or card for payouts.",
        completion: Completion::Untracked,
        route: TaskRoute::sub_page("/settings", "billing", Some("payment-methods")),
    },
];

/// Look up a task by exact id
pub fn find(id: &str) -> Option<&'static OnboardingTask> {
    TASKS.iter().find(|task| task.id == id)
}

/// Position of a task in the sequence
pub fn position(id: &str) -> Option<usize> {
    TASKS.iter().position(|task| task.id == id)
}

/// The task immediately before `id`, if any
pub fn predecessor(id: &str) -> Option<&'static OnboardingTask> {
    position(id).and_then(|pos| pos.checked_sub(1)).map(|pos| &TASKS[pos])
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| *c != '-' && *c != '_')
        .collect::<String>()
        .to_lowercase()
}

/// Resolve user input to a task: exact id, 1-based position, or unique prefix.
/// Hyphens and underscores are ignored, so `time-off` finds `timeoff`.
pub fn resolve(input: &str) -> Result<&'static OnboardingTask, TrackerError> {
    let wanted = normalize(input.trim());
    let known = || TASKS.iter().map(|t| t.id).collect::<Vec<_>>().join(", ");

    if wanted.is_empty() {
        return Err(TrackerError::UnknownTask(input.to_string(), known()));
    }

    if let Some(task) = TASKS.iter().find(|task| normalize(task.id) == wanted) {
        return Ok(task);
    }

    if let Ok(n) = wanted.parse::<usize>() {
        return n
            .checked_sub(1)
            .and_then(|idx| TASKS.get(idx))
            .ok_or_else(|| TrackerError::UnknownTask(input.to_string(), known()));
    }

    let matches: Vec<&'static OnboardingTask> = TASKS
        .iter()
        .filter(|task| normalize(task.id).starts_with(&wanted))
        .collect();

    match matches.as_slice() {
        [task] => Ok(task),
        [] => Err(TrackerError::UnknownTask(input.to_string(), known())),
        many => Err(TrackerError::AmbiguousTask {
            input: input.to_string(),
            candidates: many.iter().map(|t| format!("'{}'", t.id)).collect::<Vec<_>>().join(", "),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_order() {
        let ids: Vec<&str> = TASKS.iter().map(|t| t.id).collect();
        assert_eq!(
            ids,
            vec!["account", "organization", "entity", "verification", "workers", "timeoff", "payment"]
        );
    }

    #[test]
    fn test_ids_unique() {
        let unique: std::collections::HashSet<&str> = TASKS.iter().map(|t| t.id).collect();
        assert_eq!(unique.len(), TASKS.len());
    }

    #[test]
    fn test_each_flag_backs_exactly_one_task() {
        for flag in Flag::ALL {
            let count = TASKS.iter().filter(|t| t.depends_on() == Some(flag)).count();
            assert_eq!(count, 1, "flag {} should back one task", flag);
        }
    }

    #[test]
    fn test_predecessor() {
        assert!(predecessor("account").is_none());
        assert_eq!(predecessor("entity").map(|t| t.id), Some("organization"));
        assert!(predecessor("nope").is_none());
    }

    #[test]
    fn test_resolve_exact_and_prefix() {
        assert_eq!(resolve("entity").unwrap().id, "entity");
        assert_eq!(resolve("org").unwrap().id, "organization");
        assert_eq!(resolve("Verif").unwrap().id, "verification");
        assert_eq!(resolve("time-off").unwrap().id, "timeoff");
        assert_eq!(resolve("3").unwrap().id, "entity");
    }

    #[test]
    fn test_resolve_errors() {
        assert!(matches!(resolve("a"), Ok(t) if t.id == "account"));
        assert!(matches!(resolve("banana"), Err(TrackerError::UnknownTask(..))));
        assert!(matches!(resolve("0"), Err(TrackerError::UnknownTask(..))));
        assert!(matches!(resolve("8"), Err(TrackerError::UnknownTask(..))));
        assert!(matches!(resolve(""), Err(TrackerError::UnknownTask(..))));
    }

    #[test]
    fn test_resolve_error_lists_known_tasks() {
        let err = resolve("banana").unwrap_err();
        assert!(err.to_string().contains("Known tasks: account, organization"));
    }
}
