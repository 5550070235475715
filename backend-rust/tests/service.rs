use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use roster_backend::history::HistoryError;
use roster_backend::persistence::load_state;
use roster_backend::service::{RosterService, ServiceError};
use roster_backend::state::{RosterState, RosterUpdate};
use roster_backend::{Config, HistoryAccessor, MemoryHistory};
use roster_core::{Member, PairExclusion, ShuffleError, TaskLabel, Team};
use tempfile::TempDir;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, d).unwrap()
}

fn roster() -> RosterState {
    let teams = vec![
        Team { id: "ta".into(), name: "A".into(), order: Some(0) },
        Team { id: "tb".into(), name: "B".into(), order: Some(1) },
    ];
    let members = ["a1", "a2", "b1", "b2"]
        .iter()
        .map(|id| Member {
            id: id.to_string(),
            name: id.to_uppercase(),
            team_id: format!("t{}", &id[..1]),
            excluded_task_label_ids: Vec::new(),
            active: true,
            order: None,
        })
        .collect();
    let task_labels = ["l1", "l2"]
        .iter()
        .enumerate()
        .map(|(i, id)| TaskLabel {
            id: id.to_string(),
            left_label: id.to_uppercase(),
            right_label: None,
            order: Some(i as i32),
            placeholder: false,
        })
        .collect();
    RosterState { teams, members, task_labels, ..RosterState::default() }
}

fn setup() -> (TempDir, Arc<MemoryHistory>, RosterService) {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        state_file: dir.path().join("roster.json"),
        history_file: dir.path().join("history.json"),
        ..Config::default()
    };
    let history = Arc::new(MemoryHistory::new());
    let service = RosterService::new(config, roster(), history.clone());
    (dir, history, service)
}

#[tokio::test]
async fn trigger_then_apply_writes_the_result_once() {
    let (_dir, history, service) = setup();
    let now = Utc.with_ymd_and_hms(2025, 11, 18, 1, 0, 0).unwrap();

    let event = service.trigger_shuffle(Some(day(18)), now).await.unwrap();
    assert_eq!(event.target_date, day(18));
    assert_eq!(event.result_assignments.len(), 4);
    assert_eq!(event.base_version, Some(0));
    assert_eq!(event.duration_ms, 3000);

    let applied = service.apply_shuffle(event.event_id).await.unwrap().unwrap();
    assert_eq!(applied.version, 1);
    assert_eq!(history.history().await.unwrap().for_date(day(18)), event.result_assignments.as_slice());

    // A second viewer reporting the same event changes nothing.
    assert!(service.apply_shuffle(event.event_id).await.unwrap().is_none());
    assert_eq!(history.version(day(18)).await.unwrap(), 1);
    assert!(service.coordinator.read().await.active().is_none());
}

#[tokio::test]
async fn second_trigger_is_rejected_while_revealing() {
    let (_dir, _history, service) = setup();
    let now = Utc.with_ymd_and_hms(2025, 11, 18, 1, 0, 0).unwrap();

    let first = service.trigger_shuffle(Some(day(18)), now).await.unwrap();
    let err = service.trigger_shuffle(Some(day(19)), now).await.unwrap_err();
    match err {
        ServiceError::Shuffle(ShuffleError::InFlight { event_id, target_date }) => {
            assert_eq!(event_id, first.event_id);
            assert_eq!(target_date, day(18));
        }
        other => panic!("expected InFlight, got {other:?}"),
    }
}

#[tokio::test]
async fn concurrent_write_turns_into_a_conflict() {
    let (_dir, history, service) = setup();
    let now = Utc.with_ymd_and_hms(2025, 11, 18, 1, 0, 0).unwrap();

    let event = service.trigger_shuffle(Some(day(18)), now).await.unwrap();
    // Someone else writes the same date before the reveal finishes.
    history.replace_for_date(day(18), Vec::new(), None).await.unwrap();

    let err = service.apply_shuffle(event.event_id).await.unwrap_err();
    assert!(matches!(err, ServiceError::History(HistoryError::VersionConflict { .. })));
    assert!(service.coordinator.read().await.active().is_none());
    assert!(history.history().await.unwrap().for_date(day(18)).is_empty());
}

#[tokio::test]
async fn sweep_applies_only_after_the_grace_period() {
    let (_dir, history, service) = setup();
    let now = Utc.with_ymd_and_hms(2025, 11, 18, 1, 0, 0).unwrap();
    let event = service.trigger_shuffle(Some(day(18)), now).await.unwrap();

    let due = event.start_time + 3000;
    assert!(service.sweep(due).await.is_none());
    assert!(service.sweep(due + 4999).await.is_none());

    let applied = service.sweep(due + 5000).await.unwrap().unwrap();
    assert_eq!(applied.event_id, event.event_id);
    assert_eq!(history.version(day(18)).await.unwrap(), 1);
    assert!(service.sweep(due + 9000).await.is_none());
}

#[tokio::test]
async fn in_flight_event_survives_a_restart() {
    let (dir, _history, service) = setup();
    let now = Utc.with_ymd_and_hms(2025, 11, 18, 1, 0, 0).unwrap();
    let event = service.trigger_shuffle(Some(day(18)), now).await.unwrap();

    let reloaded = load_state(&dir.path().join("roster.json")).await;
    assert_eq!(reloaded.shuffle_event.as_ref().map(|e| e.event_id), Some(event.event_id));

    let restarted = RosterService::new(
        service.config.as_ref().clone(),
        reloaded,
        Arc::new(MemoryHistory::new()),
    );
    let init = restarted.init_state(now).await.unwrap();
    assert_eq!(init.shuffle_event.map(|e| e.event_id), Some(event.event_id));

    restarted.apply_shuffle(event.event_id).await.unwrap().unwrap();
    let cleared = load_state(&dir.path().join("roster.json")).await;
    assert!(cleared.shuffle_event.is_none());
}

#[tokio::test]
async fn init_state_shows_previous_weekday_until_rotated() {
    let (_dir, history, service) = setup();
    let friday = roster_core::Assignment {
        team_id: "ta".into(),
        task_label_id: "l1".into(),
        member_id: Some("a1".into()),
        assigned_date: day(14),
    };
    history.replace_for_date(day(14), vec![friday.clone()], None).await.unwrap();

    // 01:00 UTC Monday is 10:00 in +09:00, before the cutoff.
    let monday = Utc.with_ymd_and_hms(2025, 11, 17, 1, 0, 0).unwrap();
    let init = service.init_state(monday).await.unwrap();
    assert_eq!(init.target_date, day(17));
    assert_eq!(init.assignments, vec![friday]);
    assert_eq!(init.teams.len(), 2);
}

#[tokio::test]
async fn roster_update_is_persisted() {
    let (dir, _history, service) = setup();
    let update = RosterUpdate {
        teams: vec![Team { id: "tc".into(), name: "C".into(), order: None }],
        members: Vec::new(),
        task_labels: Vec::new(),
        pair_exclusions: vec![PairExclusion::new("a1", "b1")],
    };

    let state = service.update_roster(update).await.unwrap();
    assert_eq!(state.teams.len(), 1);

    let on_disk = load_state(&dir.path().join("roster.json")).await;
    assert_eq!(on_disk.teams[0].id, "tc");
    assert_eq!(on_disk.pair_exclusions, vec![PairExclusion::new("b1", "a1")]);
}

#[tokio::test]
async fn triggered_shuffles_respect_pair_exclusions() {
    let (_dir, _history, service) = setup();
    service.state.write().await.pair_exclusions = vec![PairExclusion::new("a1", "b1")];
    let now = Utc.with_ymd_and_hms(2025, 11, 18, 1, 0, 0).unwrap();

    for _ in 0..10 {
        let event = service.trigger_shuffle(Some(day(18)), now).await.unwrap();
        for label in ["l1", "l2"] {
            let row: Vec<&str> = event
                .result_assignments
                .iter()
                .filter(|a| a.task_label_id == label)
                .filter_map(|a| a.member_id.as_deref())
                .collect();
            assert!(!(row.contains(&"a1") && row.contains(&"b1")), "{label}: {row:?}");
        }
        service.apply_shuffle(event.event_id).await.unwrap();
    }
}
