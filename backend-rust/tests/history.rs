use chrono::NaiveDate;
use roster_backend::{FileHistory, HistoryAccessor, HistoryError, MemoryHistory};
use roster_core::Assignment;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, d).unwrap()
}

fn board(member: &str, date: NaiveDate) -> Vec<Assignment> {
    vec![Assignment {
        team_id: "ta".into(),
        task_label_id: "l1".into(),
        member_id: Some(member.into()),
        assigned_date: date,
    }]
}

#[tokio::test]
async fn file_history_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.json");

    let history = FileHistory::open(&path).await.unwrap();
    assert!(history.all_assignments().await.unwrap().is_empty());
    assert_eq!(history.version(day(18)).await.unwrap(), 0);

    let v1 = history.replace_for_date(day(18), board("m1", day(18)), Some(0)).await.unwrap();
    let v2 = history.replace_for_date(day(18), board("m2", day(18)), None).await.unwrap();
    assert_eq!((v1, v2), (1, 2));

    let reopened = FileHistory::open(&path).await.unwrap();
    let stored = reopened.history().await.unwrap();
    assert_eq!(stored.for_date(day(18)), board("m2", day(18)).as_slice());
    assert_eq!(reopened.version(day(18)).await.unwrap(), 2);
}

#[tokio::test]
async fn replace_restamps_records_with_the_target_date() {
    let history = MemoryHistory::new();
    history.replace_for_date(day(18), board("m1", day(3)), None).await.unwrap();

    let records = history.all_assignments().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].assigned_date, day(18));
}

#[tokio::test]
async fn stale_version_is_rejected_and_nothing_changes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.json");
    let history = FileHistory::open(&path).await.unwrap();

    history.replace_for_date(day(18), board("m1", day(18)), Some(0)).await.unwrap();
    let err = history
        .replace_for_date(day(18), board("m2", day(18)), Some(0))
        .await
        .unwrap_err();

    match err {
        HistoryError::VersionConflict { date, expected, actual } => {
            assert_eq!(date, day(18));
            assert_eq!(expected, 0);
            assert_eq!(actual, 1);
        }
        other => panic!("expected a version conflict, got {other:?}"),
    }
    assert_eq!(history.history().await.unwrap().for_date(day(18)), board("m1", day(18)).as_slice());
}

#[tokio::test]
async fn other_dates_keep_their_own_versions() {
    let history = MemoryHistory::new();
    history.replace_for_date(day(17), board("m1", day(17)), Some(0)).await.unwrap();
    history.replace_for_date(day(18), board("m2", day(18)), Some(0)).await.unwrap();

    assert_eq!(history.version(day(17)).await.unwrap(), 1);
    assert_eq!(history.version(day(18)).await.unwrap(), 1);
    assert_eq!(history.version(day(19)).await.unwrap(), 0);
}

#[tokio::test]
async fn corrupt_history_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.json");
    tokio::fs::write(&path, "[oops").await.unwrap();

    let err = FileHistory::open(&path).await.unwrap_err();
    assert!(matches!(err, HistoryError::Serde(_)));
}

#[tokio::test]
async fn failed_write_leaves_memory_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing-dir").join("history.json");
    let history = FileHistory::open(&path).await.unwrap();

    let err = history.replace_for_date(day(18), board("m1", day(18)), None).await.unwrap_err();
    assert!(matches!(err, HistoryError::Io(_)));
    assert!(history.all_assignments().await.unwrap().is_empty());
    assert_eq!(history.version(day(18)).await.unwrap(), 0);
}
