mod common;

use attendance::error::AttendanceError;
use attendance::model::attendance::{AttendanceStatus, RecordFlag};
use attendance::model::history::HistoryOutcome;
use attendance::service::ledger::{MarkOutcome, NotMarkedReason};
use common::{Harness, at, day, face};

const HISTORY_COUNT: &str = "SELECT COUNT(*) FROM attendance_history WHERE student_id = ?";

#[actix_web::test]
async fn initialize_day_creates_one_not_yet_here_record_per_active_student() {
    let date = day(2025, 1, 1);
    let h = Harness::new("init_creates", at(date, 6, 0, 0)).await;
    let roster = h.enroll(&[("A", "Alice"), ("B", "Bob")]).await;

    let created = h.ledger.initialize_day(date, &roster).await.unwrap();
    assert_eq!(created, 2);

    let entries = h.ledger.get_day(date).await.unwrap();
    assert_eq!(entries.len(), 2);
    for entry in &entries {
        assert_eq!(entry.record.status, AttendanceStatus::NotYetHere);
        assert_eq!(entry.record.check_in_time, None);
        assert_eq!(entry.flag, None);
    }
    assert_eq!(entries[0].student_name.as_deref(), Some("Alice"));
    assert_eq!(entries[1].student_name.as_deref(), Some("Bob"));
}

#[actix_web::test]
async fn initialize_day_twice_changes_nothing() {
    let date = day(2025, 1, 1);
    let h = Harness::new("init_idempotent", at(date, 6, 0, 0)).await;
    let roster = h.enroll(&[("A", "Alice"), ("B", "Bob")]).await;

    h.ledger.initialize_day(date, &roster).await.unwrap();
    let before = h.ledger.get_day(date).await.unwrap();

    h.clock.set(at(date, 7, 0, 0));
    let created = h.ledger.initialize_day(date, &roster).await.unwrap();
    let after = h.ledger.get_day(date).await.unwrap();

    assert_eq!(created, 0);
    assert_eq!(before, after);
}

#[actix_web::test]
async fn initialize_day_never_overwrites_a_check_in() {
    let date = day(2025, 1, 1);
    let h = Harness::new("init_no_overwrite", at(date, 6, 0, 0)).await;
    let roster = h.enroll(&[("A", "Alice")]).await;

    h.ledger.initialize_day(date, &roster).await.unwrap();
    h.ledger
        .mark_present("A", date, at(date, 8, 55, 0), &face(0.93))
        .await
        .unwrap();

    h.ledger.initialize_day(date, &roster).await.unwrap();
    let entries = h.ledger.get_day(date).await.unwrap();
    assert_eq!(entries[0].record.status, AttendanceStatus::Present);
    assert_eq!(entries[0].record.check_in_time, Some(at(date, 8, 55, 0)));
}

#[actix_web::test]
async fn second_mark_present_keeps_the_first_check_in() {
    let date = day(2025, 1, 1);
    let h = Harness::new("mark_twice", at(date, 6, 0, 0)).await;
    let roster = h.enroll(&[("A", "Alice")]).await;
    h.ledger.initialize_day(date, &roster).await.unwrap();

    let t1 = at(date, 9, 0, 0);
    let t2 = at(date, 9, 5, 0);

    let first = h.ledger.mark_present("A", date, t1, &face(0.97)).await.unwrap();
    match first {
        MarkOutcome::Marked(record) => {
            assert_eq!(record.status, AttendanceStatus::Present);
            assert_eq!(record.check_in_time, Some(t1));
        }
        other => panic!("expected a check-in, got {other:?}"),
    }

    let second = h.ledger.mark_present("A", date, t2, &face(0.99)).await.unwrap();
    assert_eq!(
        second,
        MarkOutcome::AlreadyMarkedOrMissing(NotMarkedReason::AlreadyPresent {
            check_in_time: Some(t1)
        })
    );

    let entries = h.ledger.get_day(date).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].record.check_in_time, Some(t1));
    assert_eq!(h.count(HISTORY_COUNT, "A").await, 1);
}

#[actix_web::test]
async fn mark_present_without_a_record_is_not_scheduled() {
    let date = day(2025, 1, 1);
    let h = Harness::new("mark_missing", at(date, 6, 0, 0)).await;
    h.enroll(&[("A", "Alice")]).await;

    let outcome = h
        .ledger
        .mark_present("A", date, at(date, 9, 0, 0), &face(0.9))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        MarkOutcome::AlreadyMarkedOrMissing(NotMarkedReason::NotScheduled)
    );
    assert!(h.ledger.get_day(date).await.unwrap().is_empty());
    assert_eq!(h.count(HISTORY_COUNT, "A").await, 0);
}

#[actix_web::test]
async fn concurrent_mark_present_records_exactly_one_check_in() {
    let date = day(2025, 1, 1);
    let h = Harness::new("mark_concurrent", at(date, 6, 0, 0)).await;
    let roster = h.enroll(&[("A", "Alice")]).await;
    h.ledger.initialize_day(date, &roster).await.unwrap();

    let ta = at(date, 9, 0, 0);
    let tb = at(date, 9, 0, 1);
    let evidence = face(0.95);

    let (a, b) = futures::future::join(
        h.ledger.mark_present("A", date, ta, &evidence),
        h.ledger.mark_present("A", date, tb, &evidence),
    )
    .await;

    let outcomes = [a.unwrap(), b.unwrap()];
    let marked: Vec<_> = outcomes
        .iter()
        .filter_map(|o| match o {
            MarkOutcome::Marked(record) => Some(record.check_in_time),
            _ => None,
        })
        .collect();
    assert_eq!(marked.len(), 1, "exactly one call must win: {outcomes:?}");

    let entries = h.ledger.get_day(date).await.unwrap();
    let recorded = entries[0].record.check_in_time;
    assert!(recorded == Some(ta) || recorded == Some(tb));
    assert_eq!(recorded, marked[0]);
    assert_eq!(h.count(HISTORY_COUNT, "A").await, 1);
}

#[actix_web::test]
async fn close_day_marks_only_missing_students_absent() {
    let date = day(2025, 1, 1);
    let h = Harness::new("close_day", at(date, 6, 0, 0)).await;
    let roster = h.enroll(&[("A", "Alice"), ("B", "Bob")]).await;
    h.ledger.initialize_day(date, &roster).await.unwrap();
    h.ledger
        .mark_present("A", date, at(date, 9, 0, 0), &face(0.9))
        .await
        .unwrap();

    h.clock.set(at(date, 18, 0, 0));
    assert_eq!(h.ledger.close_day(date).await.unwrap(), 1);
    assert_eq!(h.ledger.close_day(date).await.unwrap(), 0);

    let late = h
        .ledger
        .mark_present("B", date, at(date, 18, 5, 0), &face(0.9))
        .await
        .unwrap();
    assert_eq!(
        late,
        MarkOutcome::AlreadyMarkedOrMissing(NotMarkedReason::ClosedAbsent)
    );

    let summary = h.ledger.day_summary(date).await.unwrap();
    assert_eq!(summary.present, 1);
    assert_eq!(summary.absent, 1);
    assert_eq!(summary.not_yet_here, 0);
    assert_eq!(summary.orphaned, 0);
}

#[actix_web::test]
async fn get_day_flags_records_of_deleted_students() {
    let date = day(2025, 1, 1);
    let h = Harness::new("get_day_flags", at(date, 6, 0, 0)).await;
    let roster = h.enroll(&[("A", "Alice"), ("B", "Bob")]).await;
    h.ledger.initialize_day(date, &roster).await.unwrap();

    assert!(h.roster.delete_student("B").await.unwrap());

    let entries = h.ledger.get_day(date).await.unwrap();
    assert_eq!(entries.len(), 2);

    let a = entries.iter().find(|e| e.record.student_id == "A").unwrap();
    let b = entries.iter().find(|e| e.record.student_id == "B").unwrap();
    assert!(!a.is_deleted_student());
    assert_eq!(b.flag, Some(RecordFlag::DeletedStudent));
    assert_eq!(b.student_name, None);

    assert_eq!(h.ledger.day_summary(date).await.unwrap().orphaned, 1);
}

#[actix_web::test]
async fn mark_present_on_an_orphaned_record_is_reported() {
    let date = day(2025, 1, 1);
    let h = Harness::new("mark_orphan", at(date, 6, 0, 0)).await;
    let roster = h.enroll(&[("A", "Alice")]).await;
    h.ledger.initialize_day(date, &roster).await.unwrap();
    h.roster.delete_student("A").await.unwrap();

    let err = h
        .ledger
        .mark_present("A", date, at(date, 9, 0, 0), &face(0.9))
        .await
        .unwrap_err();

    assert!(matches!(err, AttendanceError::OrphanedReference { student_id } if student_id == "A"));
    let entries = h.ledger.get_day(date).await.unwrap();
    assert_eq!(entries[0].record.status, AttendanceStatus::NotYetHere);
}

#[actix_web::test]
async fn history_keeps_every_verification_event_newest_first() {
    let date = day(2025, 1, 1);
    let h = Harness::new("history", at(date, 6, 0, 0)).await;
    let roster = h.enroll(&[("A", "Alice")]).await;
    h.ledger.initialize_day(date, &roster).await.unwrap();

    h.ledger
        .record_attempt("A", date, &face(0.41), HistoryOutcome::Rejected, at(date, 8, 59, 0))
        .await
        .unwrap();
    h.ledger
        .mark_present("A", date, at(date, 9, 0, 0), &face(0.96))
        .await
        .unwrap();
    h.ledger
        .record_attempt("A", date, &face(0.97), HistoryOutcome::Duplicate, at(date, 9, 1, 0))
        .await
        .unwrap();

    let history = h.ledger.student_history("A", 10).await.unwrap();
    let outcomes: Vec<_> = history.iter().map(|e| e.outcome).collect();
    assert_eq!(
        outcomes,
        vec![
            HistoryOutcome::Duplicate,
            HistoryOutcome::CheckedIn,
            HistoryOutcome::Rejected
        ]
    );
    assert!(!history[2].verified);
    assert!(history[1].verified);

    assert_eq!(h.ledger.student_history("A", 1).await.unwrap().len(), 1);
}

#[actix_web::test]
async fn two_student_day_from_start_to_purge() {
    let date = day(2025, 1, 1);
    let h = Harness::new("two_student_day", at(date, 6, 0, 0)).await;
    let roster = h.enroll(&[("A", "Alice"), ("B", "Bob")]).await;

    assert_eq!(h.ledger.initialize_day(date, &roster).await.unwrap(), 2);

    h.ledger
        .mark_present("A", date, at(date, 9, 0, 0), &face(0.98))
        .await
        .unwrap();

    let entries = h.ledger.get_day(date).await.unwrap();
    assert_eq!(entries[0].record.status, AttendanceStatus::Present);
    assert_eq!(entries[0].record.check_in_time, Some(at(date, 9, 0, 0)));
    assert_eq!(entries[1].record.status, AttendanceStatus::NotYetHere);

    h.roster.delete_student("B").await.unwrap();
    h.reconciler.purge_orphans("B").await.unwrap();

    let entries = h.ledger.get_day(date).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].record.student_id, "A");
}
