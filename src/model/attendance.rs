use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Per-day status. Moves `NotYetHere -> Present` or `NotYetHere -> Absent`, never back.
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
pub enum AttendanceStatus {
    NotYetHere,
    Present,
    Absent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct DailyAttendanceRecord {
    pub id: i64,
    #[schema(example = "STU-0042")]
    pub student_id: String,
    #[schema(example = "2025-01-01", value_type = String, format = "date")]
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[schema(example = "2025-01-01T09:00:00", value_type = Option<String>, format = "date-time")]
    pub check_in_time: Option<NaiveDateTime>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: NaiveDateTime,
}

/// Marker for rows whose student has left the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordFlag {
    DeletedStudent,
}

/// A daily record joined with the roster for display.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DayEntry {
    #[serde(flatten)]
    pub record: DailyAttendanceRecord,
    #[schema(example = "Ada Lovelace", nullable = true)]
    pub student_name: Option<String>,
    #[schema(nullable = true)]
    pub flag: Option<RecordFlag>,
}

impl DayEntry {
    pub fn is_deleted_student(&self) -> bool {
        self.flag == Some(RecordFlag::DeletedStudent)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct DaySummary {
    #[schema(example = "2025-01-01", value_type = String, format = "date")]
    pub date: NaiveDate,
    pub present: i64,
    pub not_yet_here: i64,
    pub absent: i64,
    /// Records whose student no longer exists, whatever their status.
    pub orphaned: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_text_matches_storage_values() {
        assert_eq!(AttendanceStatus::NotYetHere.as_ref(), "not_yet_here");
        assert_eq!(
            AttendanceStatus::from_str("present").unwrap(),
            AttendanceStatus::Present
        );
        assert!(AttendanceStatus::from_str("late").is_err());
    }

    #[test]
    fn deleted_student_flag_serializes_upper_case() {
        let json = serde_json::to_value(RecordFlag::DeletedStudent).unwrap();
        assert_eq!(json, serde_json::json!("DELETED_STUDENT"));
    }
}
