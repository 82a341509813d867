#![allow(dead_code)]

use attendance::{
    clock::{FixedClock, SharedClock},
    db::init_db_at,
    model::history::{VerificationEvidence, VerificationMethod},
    service::{
        ledger::AttendanceLedger,
        reconciler::RosterReconciler,
        roster::{NewStudent, StudentRoster},
    },
};
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;

pub fn temp_dir(test_name: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = base.join(format!("attendance_{test_name}_{pid}_{nonce}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn at(date: NaiveDate, h: u32, min: u32, s: u32) -> NaiveDateTime {
    date.and_hms_opt(h, min, s).expect("valid time")
}

pub fn face(confidence: f64) -> VerificationEvidence {
    VerificationEvidence {
        method: VerificationMethod::Face,
        confidence,
    }
}

pub fn new_student(student_id: &str, name: &str) -> NewStudent {
    NewStudent {
        student_id: student_id.to_string(),
        name: name.to_string(),
        email: Some(format!("{}@school.test", student_id.to_lowercase())),
        phone: None,
        enrollment_date: day(2024, 9, 1),
    }
}

pub struct Harness {
    pub dir: PathBuf,
    pub artifact_dir: PathBuf,
    pub pool: SqlitePool,
    pub clock: Arc<FixedClock>,
    pub ledger: AttendanceLedger,
    pub roster: StudentRoster,
    pub reconciler: RosterReconciler,
}

impl Harness {
    pub async fn new(test_name: &str, now: NaiveDateTime) -> Self {
        let dir = temp_dir(test_name);
        let artifact_dir = dir.join("artifacts");
        std::fs::create_dir_all(&artifact_dir).expect("create artifact dir");

        let pool = init_db_at(dir.join("attendance.db"))
            .await
            .expect("open database");

        let clock = Arc::new(FixedClock::new(now));
        let shared: SharedClock = clock.clone();

        let roster = StudentRoster::new(pool.clone());
        let ledger = AttendanceLedger::new(pool.clone(), shared);
        let reconciler = RosterReconciler::new(pool.clone(), roster.clone(), &artifact_dir);

        Self {
            dir,
            artifact_dir,
            pool,
            clock,
            ledger,
            roster,
            reconciler,
        }
    }

    /// Enroll students and return the active roster.
    pub async fn enroll(&self, students: &[(&str, &str)]) -> Vec<attendance::model::student::Student> {
        for (id, name) in students {
            self.roster
                .create_student(&new_student(id, name))
                .await
                .expect("create student");
        }
        self.roster
            .list_active_students()
            .await
            .expect("list students")
    }

    pub async fn count(&self, sql: &str, student_id: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(sql)
            .bind(student_id)
            .fetch_one(&self.pool)
            .await
            .expect("count query")
    }
}
