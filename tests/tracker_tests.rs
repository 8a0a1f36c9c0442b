use ontrack::models::{FlagSet, TaskStatus};
use ontrack::nav::RecordingNavigator;
use ontrack::store::{FlagStore, MemoryFlagStore, SqliteFlagStore};
use ontrack::tracker::{evaluate, OnboardingTracker, SelectionPolicy, Trigger};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_every_flag_combination_is_consistent() {
    for flags in FlagSet::all_combinations() {
        let snapshot = evaluate(flags);

        assert_eq!(snapshot.tasks.len(), 7);
        assert_eq!(snapshot.status_of("account"), Some(TaskStatus::Done));
        for untracked in ["workers", "timeoff", "payment"] {
            assert_eq!(snapshot.status_of(untracked), Some(TaskStatus::NotStarted));
        }

        // The default selection is the first task that is not done
        let first_open = snapshot.tasks.iter().find(|p| !p.status.is_done()).unwrap();
        assert_eq!(snapshot.default_selection, first_open.task.id);

        let done = snapshot.tasks.iter().filter(|p| p.status.is_done()).count();
        assert_eq!(snapshot.done_count, done);
        assert!(snapshot.percent_complete <= 57);
    }
}

#[test]
fn test_progression_through_flags() {
    let store = Arc::new(MemoryFlagStore::new());
    let mut tracker = OnboardingTracker::new(Arc::clone(&store), SelectionPolicy::RespectManual);

    let expected = [
        (None, "organization", 14),
        (Some("companyProfileDone"), "entity", 29),
        (Some("entityCreated"), "verification", 43),
        (Some("entityVerified"), "workers", 57),
    ];
    for (flag, selected, percent) in expected {
        if let Some(flag) = flag {
            store.set(flag, true).unwrap();
        }
        let view = tracker.refresh();
        assert_eq!(view.selected, selected);
        assert_eq!(view.snapshot.percent_complete, percent);
    }
}

#[test]
fn test_manual_selection_survives_unrelated_changes() {
    let store = Arc::new(MemoryFlagStore::new());
    let mut tracker = OnboardingTracker::new(Arc::clone(&store), SelectionPolicy::RespectManual);

    tracker.select("payment").unwrap();
    store.set("entityVerified", true).unwrap();
    let view = tracker.refresh();
    assert_eq!(view.selected, "payment");
    assert!(view.manual);
}

#[test]
fn test_manual_selection_dropped_when_selected_task_completes() {
    let store = Arc::new(MemoryFlagStore::new());
    let mut tracker = OnboardingTracker::new(Arc::clone(&store), SelectionPolicy::RespectManual);

    tracker.select("entity").unwrap();
    store.set("entityCreated", true).unwrap();
    let view = tracker.refresh();
    assert_eq!(view.selected, "organization");
    assert!(!view.manual);
}

#[test]
fn test_follow_default_policy_resets_on_any_change() {
    let store = Arc::new(MemoryFlagStore::new());
    let mut tracker = OnboardingTracker::new(Arc::clone(&store), SelectionPolicy::FollowDefault);

    tracker.select("payment").unwrap();
    assert_eq!(tracker.refresh().selected, "payment");

    store.set("entityVerified", true).unwrap();
    assert_eq!(tracker.refresh().selected, "organization");
}

#[test]
fn test_start_hands_route_to_navigator() {
    let mut tracker = OnboardingTracker::new(MemoryFlagStore::new(), SelectionPolicy::RespectManual);
    let mut navigator = RecordingNavigator::default();

    let request = tracker.start(None, &mut navigator).unwrap();
    assert_eq!(request.task_id, "organization");
    assert_eq!(navigator.requests, vec![request]);

    tracker.start(Some("timeoff"), &mut navigator).unwrap();
    assert_eq!(navigator.requests[1].target, "/settings?page=time-off&tab=policies");
}

#[test]
fn test_sqlite_watch_picks_up_write_from_other_connection() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("flags.db");

    let reader = SqliteFlagStore::open(&db_path).unwrap();
    let writer = SqliteFlagStore::open(&db_path).unwrap();
    let mut tracker = OnboardingTracker::new(reader, SelectionPolicy::RespectManual);

    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        writer.set("companyProfileDone", true).unwrap();
    });

    let mut seen = Vec::new();
    tracker
        .watch(Duration::from_secs(10), Some(2), |trigger, view| {
            seen.push((trigger.clone(), view.selected));
            Ok(ControlFlow::Continue(()))
        })
        .unwrap();
    handle.join().unwrap();

    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0], (Trigger::Initial, "organization"));
    assert!(matches!(seen[1].0, Trigger::Changed(_)));
    assert_eq!(seen[1].1, "entity");
}

#[test]
fn test_store_read_failure_degrades_to_unset() {
    let temp_dir = TempDir::new().unwrap();
    let store = SqliteFlagStore::open(&temp_dir.path().join("flags.db")).unwrap();
    store.set_raw("entityCreated", "pending").unwrap();

    let mut tracker = OnboardingTracker::new(store, SelectionPolicy::RespectManual);
    let view = tracker.refresh();
    assert!(!view.snapshot.flags.entity_created);
    assert_eq!(view.snapshot.status_of("entity"), Some(TaskStatus::NotStarted));
}
