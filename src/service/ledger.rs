use crate::{
    clock::SharedClock,
    error::AttendanceError,
    model::{
        attendance::{
            AttendanceStatus, DailyAttendanceRecord, DayEntry, DaySummary, RecordFlag,
        },
        history::{AttendanceHistoryEntry, HistoryOutcome, VerificationEvidence},
        student::Student,
    },
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info, warn};

const RECORD_COLUMNS: &str =
    "id, student_id, date, status, check_in_time, created_at, updated_at";

/// Why a check-in did not happen. Expected, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum NotMarkedReason {
    AlreadyPresent { check_in_time: Option<NaiveDateTime> },
    /// The day was closed out before the student arrived.
    ClosedAbsent,
    /// No record for this student and date.
    NotScheduled,
}

impl NotMarkedReason {
    pub fn message(&self) -> &'static str {
        match self {
            Self::AlreadyPresent { .. } => "Already checked in today",
            Self::ClosedAbsent => "Attendance for today is closed",
            Self::NotScheduled => "Not scheduled today",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MarkOutcome {
    Marked(DailyAttendanceRecord),
    AlreadyMarkedOrMissing(NotMarkedReason),
}

#[derive(FromRow)]
struct DayRow {
    #[sqlx(flatten)]
    record: DailyAttendanceRecord,
    student_name: Option<String>,
    student_exists: bool,
}

/// Owns the per-day attendance records and the verification history.
#[derive(Clone)]
pub struct AttendanceLedger {
    pool: SqlitePool,
    clock: SharedClock,
}

impl AttendanceLedger {
    pub fn new(pool: SqlitePool, clock: SharedClock) -> Self {
        Self { pool, clock }
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    /// Create a `not_yet_here` record for every student in `roster` that lacks one
    /// for `date`. Existing records are never touched. Returns the number created.
    pub async fn initialize_day(
        &self,
        date: NaiveDate,
        roster: &[Student],
    ) -> Result<u64, AttendanceError> {
        let now = self.clock.now();
        let mut created = 0u64;

        let mut tx = self.pool.begin().await?;
        for student in roster {
            let result = sqlx::query(
                r#"
                INSERT INTO daily_attendance (student_id, date, status, created_at, updated_at)
                VALUES (?, ?, 'not_yet_here', ?, ?)
                ON CONFLICT (student_id, date) DO NOTHING
                "#,
            )
            .bind(&student.student_id)
            .bind(date)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            created += result.rows_affected();
        }
        tx.commit().await?;

        info!(%date, roster = roster.len(), created, "Attendance day initialized");
        Ok(created)
    }

    /// Move (student, date) from `not_yet_here` to `present`.
    ///
    /// The guarded UPDATE is the first statement of the transaction, so two
    /// concurrent calls for the same key cannot both see an affected row. The
    /// `checked_in` history entry commits together with the status change.
    pub async fn mark_present(
        &self,
        student_id: &str,
        date: NaiveDate,
        at: NaiveDateTime,
        evidence: &VerificationEvidence,
    ) -> Result<MarkOutcome, AttendanceError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE daily_attendance
            SET status = 'present', check_in_time = ?, updated_at = ?
            WHERE student_id = ?
              AND date = ?
              AND status = 'not_yet_here'
              AND EXISTS (SELECT 1 FROM students s WHERE s.student_id = daily_attendance.student_id)
            "#,
        )
        .bind(at)
        .bind(self.clock.now())
        .bind(student_id)
        .bind(date)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return self.classify_miss(student_id, date).await;
        }

        insert_history(
            &mut *tx,
            student_id,
            date,
            evidence,
            true,
            HistoryOutcome::CheckedIn,
            at,
        )
        .await?;

        let record = sqlx::query_as::<_, DailyAttendanceRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM daily_attendance WHERE student_id = ? AND date = ?"
        ))
        .bind(student_id)
        .bind(date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(student_id, %date, check_in = %at, "Student checked in");
        Ok(MarkOutcome::Marked(record))
    }

    async fn classify_miss(
        &self,
        student_id: &str,
        date: NaiveDate,
    ) -> Result<MarkOutcome, AttendanceError> {
        let row = sqlx::query_as::<_, (AttendanceStatus, Option<NaiveDateTime>, bool)>(
            r#"
            SELECT d.status, d.check_in_time,
                   EXISTS (SELECT 1 FROM students s WHERE s.student_id = d.student_id)
            FROM daily_attendance d
            WHERE d.student_id = ? AND d.date = ?
            "#,
        )
        .bind(student_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        let reason = match row {
            None => NotMarkedReason::NotScheduled,
            Some((AttendanceStatus::Present, check_in_time, _)) => {
                NotMarkedReason::AlreadyPresent { check_in_time }
            }
            Some((AttendanceStatus::Absent, _, _)) => NotMarkedReason::ClosedAbsent,
            Some((AttendanceStatus::NotYetHere, _, false)) => {
                warn!(student_id, %date, "Check-in attempted on an orphaned record");
                return Err(AttendanceError::OrphanedReference {
                    student_id: student_id.to_string(),
                });
            }
            // student re-enrolled between the guarded update and this read
            Some((AttendanceStatus::NotYetHere, _, true)) => NotMarkedReason::NotScheduled,
        };

        debug!(student_id, %date, ?reason, "Check-in not applied");
        Ok(MarkOutcome::AlreadyMarkedOrMissing(reason))
    }

    /// Append a history entry for a verification that did not check anyone in.
    pub async fn record_attempt(
        &self,
        student_id: &str,
        date: NaiveDate,
        evidence: &VerificationEvidence,
        outcome: HistoryOutcome,
        at: NaiveDateTime,
    ) -> Result<(), AttendanceError> {
        let verified = outcome != HistoryOutcome::Rejected;
        insert_history(&self.pool, student_id, date, evidence, verified, outcome, at).await?;
        Ok(())
    }

    /// Every record for `date`, joined with the roster. Records of deleted
    /// students are flagged, not hidden.
    pub async fn get_day(&self, date: NaiveDate) -> Result<Vec<DayEntry>, AttendanceError> {
        let rows = sqlx::query_as::<_, DayRow>(
            r#"
            SELECT d.id, d.student_id, d.date, d.status, d.check_in_time,
                   d.created_at, d.updated_at,
                   s.name AS student_name,
                   s.student_id IS NOT NULL AS student_exists
            FROM daily_attendance d
            LEFT JOIN students s ON s.student_id = d.student_id
            WHERE d.date = ?
            ORDER BY d.student_id
            "#,
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| DayEntry {
                flag: (!row.student_exists).then_some(RecordFlag::DeletedStudent),
                student_name: row.student_name,
                record: row.record,
            })
            .collect())
    }

    /// End-of-day close-out: `not_yet_here -> absent`. Present rows are untouched.
    pub async fn close_day(&self, date: NaiveDate) -> Result<u64, AttendanceError> {
        let result = sqlx::query(
            r#"
            UPDATE daily_attendance
            SET status = 'absent', updated_at = ?
            WHERE date = ? AND status = 'not_yet_here'
            "#,
        )
        .bind(self.clock.now())
        .bind(date)
        .execute(&self.pool)
        .await?;

        info!(%date, absent = result.rows_affected(), "Attendance day closed");
        Ok(result.rows_affected())
    }

    /// Dates before `date` that still hold `not_yet_here` records, oldest first.
    pub async fn open_days_before(&self, date: NaiveDate) -> Result<Vec<NaiveDate>, AttendanceError> {
        let dates = sqlx::query_scalar::<_, NaiveDate>(
            r#"
            SELECT DISTINCT date
            FROM daily_attendance
            WHERE date < ? AND status = 'not_yet_here'
            ORDER BY date
            "#,
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(dates)
    }

    pub async fn day_summary(&self, date: NaiveDate) -> Result<DaySummary, AttendanceError> {
        let (present, not_yet_here, absent, orphaned) =
            sqlx::query_as::<_, (i64, i64, i64, i64)>(
                r#"
                SELECT
                    COALESCE(SUM(d.status = 'present'), 0),
                    COALESCE(SUM(d.status = 'not_yet_here'), 0),
                    COALESCE(SUM(d.status = 'absent'), 0),
                    COALESCE(SUM(s.student_id IS NULL), 0)
                FROM daily_attendance d
                LEFT JOIN students s ON s.student_id = d.student_id
                WHERE d.date = ?
                "#,
            )
            .bind(date)
            .fetch_one(&self.pool)
            .await?;

        Ok(DaySummary {
            date,
            present,
            not_yet_here,
            absent,
            orphaned,
        })
    }

    /// Newest-first verification history of one student.
    pub async fn student_history(
        &self,
        student_id: &str,
        limit: u32,
    ) -> Result<Vec<AttendanceHistoryEntry>, AttendanceError> {
        let entries = sqlx::query_as::<_, AttendanceHistoryEntry>(
            r#"
            SELECT id, student_id, date, method, confidence, verified, outcome, recorded_at
            FROM attendance_history
            WHERE student_id = ?
            ORDER BY recorded_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(student_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

async fn insert_history<'e, E>(
    executor: E,
    student_id: &str,
    date: NaiveDate,
    evidence: &VerificationEvidence,
    verified: bool,
    outcome: HistoryOutcome,
    at: NaiveDateTime,
) -> Result<(), sqlx::Error>
where
    E: sqlx::SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO attendance_history
            (student_id, date, method, confidence, verified, outcome, recorded_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(student_id)
    .bind(date)
    .bind(evidence.method)
    .bind(evidence.confidence)
    .bind(verified)
    .bind(outcome)
    .bind(at)
    .execute(executor)
    .await?;

    Ok(())
}
