use crate::{
    error::AttendanceError,
    model::student::Student,
    utils::{
        db_utils::{ColumnKind, build_update_sql, execute_update},
        roster_cache::RosterCache,
    },
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

/// Columns an administrator may patch through [`StudentRoster::update_student`].
const UPDATABLE_COLUMNS: &[(&str, ColumnKind)] = &[
    ("name", ColumnKind::Text),
    ("email", ColumnKind::NullableText),
    ("phone", ColumnKind::NullableText),
    ("enrollment_date", ColumnKind::Date),
    ("active", ColumnKind::Bool),
];

const STUDENT_COLUMNS: &str =
    "student_id, name, email, phone, enrollment_date, active, created_at";

#[derive(Debug, Clone, Deserialize)]
pub struct NewStudent {
    pub student_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub enrollment_date: NaiveDate,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct StudentFilter {
    pub active: Option<bool>,
    pub search: Option<String>,
}

/// Roster source backed by the `students` table.
#[derive(Clone)]
pub struct StudentRoster {
    pool: SqlitePool,
    cache: RosterCache,
}

impl StudentRoster {
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_cache(pool, RosterCache::default())
    }

    pub fn with_cache(pool: SqlitePool, cache: RosterCache) -> Self {
        Self { pool, cache }
    }

    pub fn cache(&self) -> &RosterCache {
        &self.cache
    }

    pub async fn list_active_students(&self) -> Result<Vec<Student>, AttendanceError> {
        let students = sqlx::query_as::<_, Student>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE active = 1 ORDER BY student_id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(students)
    }

    pub async fn student_exists(&self, student_id: &str) -> Result<bool, AttendanceError> {
        if let Some(exists) = self.cache.get(student_id).await {
            return Ok(exists);
        }

        self.refresh_exists(student_id).await
    }

    /// Ask the database, bypassing the cache, and store the answer.
    pub async fn refresh_exists(&self, student_id: &str) -> Result<bool, AttendanceError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM students WHERE student_id = ?)",
        )
        .bind(student_id)
        .fetch_one(&self.pool)
        .await?;

        self.cache.mark(student_id, exists).await;
        Ok(exists)
    }

    pub async fn get_student(&self, student_id: &str) -> Result<Option<Student>, AttendanceError> {
        let student = sqlx::query_as::<_, Student>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE student_id = ?"
        ))
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(student)
    }

    /// Page through the roster, newest enrollments first. Returns the page and the total.
    pub async fn list_students(
        &self,
        filter: &StudentFilter,
        page: u32,
        per_page: u32,
    ) -> Result<(Vec<Student>, i64), AttendanceError> {
        let offset = (u64::from(page.max(1)) - 1) * u64::from(per_page);

        // ---------- build WHERE clause dynamically ----------
        let mut conditions = Vec::new();
        let mut bindings: Vec<String> = Vec::new();

        if let Some(active) = filter.active {
            conditions.push(if active { "active = 1" } else { "active = 0" });
        }

        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            conditions.push("(student_id LIKE ? OR name LIKE ? OR email LIKE ?)");
            let like = format!("%{}%", search.trim());
            bindings.extend([like.clone(), like.clone(), like]);
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) FROM students {where_clause}");
        debug!(sql = %count_sql, bindings = ?bindings, "Counting students");

        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        for b in &bindings {
            count_query = count_query.bind(b);
        }
        let total = count_query.fetch_one(&self.pool).await?;

        let data_sql = format!(
            "SELECT {STUDENT_COLUMNS} FROM students {where_clause} \
             ORDER BY enrollment_date DESC, student_id LIMIT ? OFFSET ?"
        );
        debug!(sql = %data_sql, page, per_page, offset, "Fetching students");

        let mut data_query = sqlx::query_as::<_, Student>(&data_sql);
        for b in &bindings {
            data_query = data_query.bind(b);
        }
        let students = data_query
            .bind(i64::from(per_page))
            .bind(i64::try_from(offset).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        Ok((students, total))
    }

    pub async fn create_student(&self, new: &NewStudent) -> Result<Student, AttendanceError> {
        let student_id = new.student_id.trim();
        if student_id.is_empty() || new.name.trim().is_empty() {
            return Err(AttendanceError::InvalidInput(
                "student_id and name must not be empty".into(),
            ));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO students (student_id, name, email, phone, enrollment_date)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(student_id)
        .bind(new.name.trim())
        .bind(&new.email)
        .bind(&new.phone)
        .bind(new.enrollment_date)
        .execute(&self.pool)
        .await;

        if let Err(sqlx::Error::Database(db_err)) = &result {
            if db_err.is_unique_violation() {
                return Err(AttendanceError::InvalidInput(format!(
                    "student {student_id} already exists"
                )));
            }
        }
        result?;

        self.cache.mark(student_id, true).await;
        info!(student_id, "Student enrolled");

        self.get_student(student_id)
            .await?
            .ok_or_else(|| AttendanceError::NotFound(format!("student {student_id}")))
    }

    /// Apply a JSON patch restricted to [`UPDATABLE_COLUMNS`]. Returns false when no row matched.
    pub async fn update_student(
        &self,
        student_id: &str,
        patch: &Value,
    ) -> Result<bool, AttendanceError> {
        let update =
            build_update_sql("students", patch, UPDATABLE_COLUMNS, "student_id", student_id)?;
        let affected = execute_update(&self.pool, update).await?;
        Ok(affected > 0)
    }

    /// Remove a student from the roster. Attendance rows are left behind as
    /// orphans for the reconciler.
    pub async fn delete_student(&self, student_id: &str) -> Result<bool, AttendanceError> {
        let result = sqlx::query("DELETE FROM students WHERE student_id = ?")
            .bind(student_id)
            .execute(&self.pool)
            .await?;

        self.cache.mark(student_id, false).await;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        let dangling = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM daily_attendance WHERE student_id = ?",
        )
        .bind(student_id)
        .fetch_one(&self.pool)
        .await?;

        if dangling > 0 {
            warn!(
                student_id,
                dangling, "Student deleted; attendance rows are now orphaned"
            );
        } else {
            info!(student_id, "Student deleted");
        }

        Ok(true)
    }
}
