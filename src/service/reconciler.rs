use crate::{
    error::AttendanceError, model::artifact::StudentArtifact, service::roster::StudentRoster,
};
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum OrphanSource {
    DailyAttendance,
    AttendanceHistory,
}

/// An attendance row whose student is no longer on the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, ToSchema)]
pub struct OrphanRecord {
    pub source: OrphanSource,
    pub record_id: i64,
    #[schema(example = "STU-0042")]
    pub student_id: String,
    #[schema(example = "2025-01-01", value_type = String, format = "date")]
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct PurgeReport {
    pub student_id: String,
    pub daily_removed: u64,
    pub history_removed: u64,
    pub artifacts_removed: u64,
    pub files_removed: u64,
    /// Artifact files that could not be deleted (already gone, permissions).
    pub files_skipped: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PurgeFailure {
    pub student_id: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ReconcileReport {
    pub purged: Vec<PurgeReport>,
    pub failed: Vec<PurgeFailure>,
}

/// Keeps attendance storage consistent with the roster.
#[derive(Clone)]
pub struct RosterReconciler {
    pool: SqlitePool,
    roster: StudentRoster,
    artifact_dir: PathBuf,
}

impl RosterReconciler {
    pub fn new(pool: SqlitePool, roster: StudentRoster, artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            pool,
            roster,
            artifact_dir: artifact_dir.into(),
        }
    }

    /// Daily and history rows referencing a missing student. Read only.
    pub async fn find_orphans(&self) -> Result<Vec<OrphanRecord>, AttendanceError> {
        let orphans = sqlx::query_as::<_, OrphanRecord>(
            r#"
            SELECT 'daily_attendance' AS source, d.id AS record_id, d.student_id, d.date
            FROM daily_attendance d
            WHERE NOT EXISTS (SELECT 1 FROM students s WHERE s.student_id = d.student_id)
            UNION ALL
            SELECT 'attendance_history' AS source, h.id AS record_id, h.student_id, h.date
            FROM attendance_history h
            WHERE NOT EXISTS (SELECT 1 FROM students s WHERE s.student_id = h.student_id)
            ORDER BY student_id, date, source, record_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        if !orphans.is_empty() {
            warn!(count = orphans.len(), "Orphaned attendance rows found");
        }
        Ok(orphans)
    }

    /// Distinct student ids that still own attendance rows or artifacts.
    pub async fn orphaned_student_ids(&self) -> Result<Vec<String>, AttendanceError> {
        let ids = sqlx::query_scalar::<_, String>(
            r#"
            SELECT student_id FROM daily_attendance
            UNION
            SELECT student_id FROM attendance_history
            UNION
            SELECT student_id FROM student_artifacts
            EXCEPT
            SELECT student_id FROM students
            ORDER BY 1
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// Delete every attendance row and artifact of a student who left the roster.
    ///
    /// Rows go in one transaction, each delete guarded by the student's absence.
    /// Files are removed after commit; failures there are logged and counted,
    /// never fatal.
    pub async fn purge_orphans(&self, student_id: &str) -> Result<PurgeReport, AttendanceError> {
        if self.roster.refresh_exists(student_id).await? {
            return Err(AttendanceError::StillEnrolled(student_id.to_string()));
        }

        let mut tx = self.pool.begin().await?;

        let daily = sqlx::query(
            r#"
            DELETE FROM daily_attendance
            WHERE student_id = ?
              AND NOT EXISTS (SELECT 1 FROM students WHERE student_id = ?)
            "#,
        )
        .bind(student_id)
        .bind(student_id)
        .execute(&mut *tx)
        .await?;

        let history = sqlx::query(
            r#"
            DELETE FROM attendance_history
            WHERE student_id = ?
              AND NOT EXISTS (SELECT 1 FROM students WHERE student_id = ?)
            "#,
        )
        .bind(student_id)
        .bind(student_id)
        .execute(&mut *tx)
        .await?;

        let artifacts = sqlx::query_as::<_, StudentArtifact>(
            r#"
            DELETE FROM student_artifacts
            WHERE student_id = ?
              AND NOT EXISTS (SELECT 1 FROM students WHERE student_id = ?)
            RETURNING id, student_id, kind, path
            "#,
        )
        .bind(student_id)
        .bind(student_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let mut report = PurgeReport {
            student_id: student_id.to_string(),
            daily_removed: daily.rows_affected(),
            history_removed: history.rows_affected(),
            artifacts_removed: artifacts.len() as u64,
            ..Default::default()
        };

        for artifact in &artifacts {
            if remove_artifact(&self.artifact_dir, artifact).await {
                report.files_removed += 1;
            } else {
                report.files_skipped += 1;
            }
        }

        info!(
            student_id,
            daily = report.daily_removed,
            history = report.history_removed,
            artifacts = report.artifacts_removed,
            files_skipped = report.files_skipped,
            "Orphaned student purged"
        );
        Ok(report)
    }

    /// Purge every orphaned student.
    pub async fn purge_all_orphans(&self) -> Result<ReconcileReport, AttendanceError> {
        let student_ids = self.orphaned_student_ids().await?;
        Ok(self.purge_students(student_ids).await)
    }

    /// Purge each student independently; one failure never stops the rest.
    pub async fn purge_students(
        &self,
        student_ids: impl IntoIterator<Item = String>,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for student_id in student_ids {
            match self.purge_orphans(&student_id).await {
                Ok(purged) => report.purged.push(purged),
                Err(e) => {
                    error!(error = %e, student_id = %student_id, "Orphan purge failed");
                    report.failed.push(PurgeFailure {
                        student_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            purged = report.purged.len(),
            failed = report.failed.len(),
            "Reconciliation finished"
        );
        report
    }
}

/// True when the file was deleted.
async fn remove_artifact(root: &Path, artifact: &StudentArtifact) -> bool {
    let relative = Path::new(&artifact.path);
    if relative.is_absolute()
        || relative
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
    {
        warn!(kind = %artifact.kind, path = %relative.display(), "Artifact path escapes the artifact directory; skipped");
        return false;
    }

    let full = root.join(relative);
    match tokio::fs::remove_file(&full).await {
        Ok(()) => {
            debug!(kind = %artifact.kind, path = %full.display(), "Artifact file deleted");
            true
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(kind = %artifact.kind, path = %full.display(), "Artifact file already missing; skipped");
            false
        }
        Err(e) => {
            warn!(error = %e, kind = %artifact.kind, path = %full.display(), "Failed to delete artifact file; skipped");
            false
        }
    }
}
