mod common;

use attendance::error::AttendanceError;
use attendance::model::history::HistoryOutcome;
use attendance::service::reconciler::OrphanSource;
use common::{Harness, at, day, face};

async fn add_artifact(h: &Harness, student_id: &str, kind: &str, path: &str) {
    sqlx::query("INSERT INTO student_artifacts (student_id, kind, path) VALUES (?, ?, ?)")
        .bind(student_id)
        .bind(kind)
        .bind(path)
        .execute(&h.pool)
        .await
        .expect("insert artifact");
}

/// Two days of attendance for A and B, B with one history entry per day.
async fn two_days(h: &Harness) {
    let roster = h.enroll(&[("A", "Alice"), ("B", "Bob")]).await;
    for date in [day(2025, 1, 1), day(2025, 1, 2)] {
        h.ledger.initialize_day(date, &roster).await.unwrap();
        h.ledger
            .mark_present("B", date, at(date, 9, 0, 0), &face(0.9))
            .await
            .unwrap();
    }
}

#[actix_web::test]
async fn find_orphans_lists_daily_and_history_rows_of_deleted_students() {
    let h = Harness::new("find_orphans", at(day(2025, 1, 2), 12, 0, 0)).await;
    two_days(&h).await;

    assert!(h.reconciler.find_orphans().await.unwrap().is_empty());

    h.roster.delete_student("B").await.unwrap();
    let orphans = h.reconciler.find_orphans().await.unwrap();

    assert_eq!(orphans.len(), 4);
    assert!(orphans.iter().all(|o| o.student_id == "B"));
    let daily = orphans
        .iter()
        .filter(|o| o.source == OrphanSource::DailyAttendance)
        .count();
    let history = orphans
        .iter()
        .filter(|o| o.source == OrphanSource::AttendanceHistory)
        .count();
    assert_eq!((daily, history), (2, 2));

    // read only
    assert_eq!(h.reconciler.find_orphans().await.unwrap(), orphans);
}

#[actix_web::test]
async fn purge_orphans_removes_every_row_of_the_student_only() {
    let h = Harness::new("purge_rows", at(day(2025, 1, 2), 12, 0, 0)).await;
    two_days(&h).await;
    h.ledger
        .record_attempt("A", day(2025, 1, 2), &face(0.2), HistoryOutcome::Rejected, at(day(2025, 1, 2), 8, 0, 0))
        .await
        .unwrap();

    h.roster.delete_student("B").await.unwrap();
    let report = h.reconciler.purge_orphans("B").await.unwrap();

    assert_eq!(report.student_id, "B");
    assert_eq!(report.daily_removed, 2);
    assert_eq!(report.history_removed, 2);
    assert_eq!(report.artifacts_removed, 0);

    assert!(h.reconciler.find_orphans().await.unwrap().is_empty());
    assert_eq!(
        h.count("SELECT COUNT(*) FROM daily_attendance WHERE student_id = ?", "A").await,
        2
    );
    assert_eq!(
        h.count("SELECT COUNT(*) FROM attendance_history WHERE student_id = ?", "A").await,
        1
    );
}

#[actix_web::test]
async fn purge_refuses_enrolled_students() {
    let h = Harness::new("purge_enrolled", at(day(2025, 1, 2), 12, 0, 0)).await;
    two_days(&h).await;

    let err = h.reconciler.purge_orphans("B").await.unwrap_err();
    assert!(matches!(err, AttendanceError::StillEnrolled(id) if id == "B"));
    assert_eq!(
        h.count("SELECT COUNT(*) FROM daily_attendance WHERE student_id = ?", "B").await,
        2
    );
}

#[actix_web::test]
async fn purge_deletes_artifact_files_and_skips_missing_ones() {
    let h = Harness::new("purge_files", at(day(2025, 1, 1), 12, 0, 0)).await;
    h.enroll(&[("B", "Bob")]).await;

    std::fs::create_dir_all(h.artifact_dir.join("templates")).unwrap();
    std::fs::write(h.artifact_dir.join("templates/B.bin"), b"template").unwrap();
    add_artifact(&h, "B", "face_template", "templates/B.bin").await;
    add_artifact(&h, "B", "photo", "photos/B.jpg").await; // never written

    h.roster.delete_student("B").await.unwrap();
    let report = h.reconciler.purge_orphans("B").await.unwrap();

    assert_eq!(report.artifacts_removed, 2);
    assert_eq!(report.files_removed, 1);
    assert_eq!(report.files_skipped, 1);
    assert!(!h.artifact_dir.join("templates/B.bin").exists());
    assert_eq!(
        h.count("SELECT COUNT(*) FROM student_artifacts WHERE student_id = ?", "B").await,
        0
    );
}

#[actix_web::test]
async fn artifact_paths_outside_the_artifact_dir_are_never_touched() {
    let h = Harness::new("purge_escape", at(day(2025, 1, 1), 12, 0, 0)).await;
    h.enroll(&[("B", "Bob")]).await;

    let outside = h.dir.join("keep.txt");
    std::fs::write(&outside, b"keep").unwrap();
    add_artifact(&h, "B", "photo", "../keep.txt").await;

    h.roster.delete_student("B").await.unwrap();
    let report = h.reconciler.purge_orphans("B").await.unwrap();

    assert_eq!(report.files_skipped, 1);
    assert!(outside.exists());
}

#[actix_web::test]
async fn purge_students_keeps_going_after_a_failure() {
    let h = Harness::new("purge_continue", at(day(2025, 1, 2), 12, 0, 0)).await;
    two_days(&h).await;
    h.roster.delete_student("B").await.unwrap();

    let report = h
        .reconciler
        .purge_students(["A".to_string(), "B".to_string()])
        .await;

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].student_id, "A");
    assert_eq!(report.purged.len(), 1);
    assert_eq!(report.purged[0].student_id, "B");
    assert!(h.reconciler.find_orphans().await.unwrap().is_empty());
}

#[actix_web::test]
async fn purge_all_orphans_covers_artifact_only_students() {
    let h = Harness::new("purge_all", at(day(2025, 1, 2), 12, 0, 0)).await;
    two_days(&h).await;
    add_artifact(&h, "GHOST", "photo", "photos/ghost.jpg").await;
    h.roster.delete_student("B").await.unwrap();

    assert_eq!(
        h.reconciler.orphaned_student_ids().await.unwrap(),
        vec!["B".to_string(), "GHOST".to_string()]
    );

    let report = h.reconciler.purge_all_orphans().await.unwrap();
    assert!(report.failed.is_empty());
    let ids: Vec<_> = report.purged.iter().map(|p| p.student_id.as_str()).collect();
    assert_eq!(ids, vec!["B", "GHOST"]);
    assert!(h.reconciler.orphaned_student_ids().await.unwrap().is_empty());
}
