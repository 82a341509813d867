use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "student_id": "STU-0042",
        "name": "Ada Lovelace",
        "email": "ada@school.edu",
        "phone": "+15550100",
        "enrollment_date": "2024-09-01",
        "active": true,
        "created_at": "2024-09-01T08:00:00"
    })
)]
pub struct Student {
    #[schema(example = "STU-0042")]
    pub student_id: String,

    #[schema(example = "Ada Lovelace")]
    pub name: String,

    #[schema(example = "ada@school.edu", nullable = true)]
    pub email: Option<String>,

    #[schema(example = "+15550100", nullable = true)]
    pub phone: Option<String>,

    #[schema(example = "2024-09-01", value_type = String, format = "date")]
    pub enrollment_date: NaiveDate,

    pub active: bool,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
}
