use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    sqlx::Type,
    ToSchema,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VerificationMethod {
    Face,
    Manual,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    sqlx::Type,
    ToSchema,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HistoryOutcome {
    /// The event moved the daily record to `present`.
    CheckedIn,
    /// Verified, but the day's record was already settled.
    Duplicate,
    /// The external verifier did not recognise the student.
    Rejected,
}

/// What the external verifier told us, minus the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VerificationEvidence {
    pub method: VerificationMethod,
    pub confidence: f64,
}

/// Immutable audit row; never updated once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceHistoryEntry {
    pub id: i64,
    #[schema(example = "STU-0042")]
    pub student_id: String,
    #[schema(example = "2025-01-01", value_type = String, format = "date")]
    pub date: NaiveDate,
    pub method: VerificationMethod,
    #[schema(example = 0.97)]
    pub confidence: f64,
    pub verified: bool,
    pub outcome: HistoryOutcome,
    #[schema(value_type = String, format = "date-time")]
    pub recorded_at: NaiveDateTime,
}
