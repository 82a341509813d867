use crate::{
    auth::auth::AuthUser,
    model::{
        attendance::{DayEntry, DaySummary},
        history::{AttendanceHistoryEntry, HistoryOutcome, VerificationEvidence, VerificationMethod},
    },
    service::{
        ledger::{AttendanceLedger, MarkOutcome, NotMarkedReason},
        roster::StudentRoster,
    },
};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

fn default_method() -> VerificationMethod {
    VerificationMethod::Face
}

/// Result forwarded by the kiosk from the face-recognition service.
#[derive(Deserialize, ToSchema)]
pub struct VerifyReq {
    #[schema(example = "STU-0042")]
    pub student_id: String,
    #[schema(example = true)]
    pub verified: bool,
    #[schema(example = 0.97)]
    pub confidence: f64,
    #[serde(default = "default_method")]
    pub method: VerificationMethod,
}

#[derive(Serialize, ToSchema)]
pub struct DayResponse {
    #[schema(example = "2025-01-01", value_type = String, format = "date")]
    pub date: NaiveDate,
    pub data: Vec<DayEntry>,
}

#[derive(Deserialize, IntoParams)]
pub struct HistoryQuery {
    /// Maximum number of entries (1-500, default 50)
    pub limit: Option<u32>,
}

/// Record a verification event and check the student in
#[utoipa::path(
    post,
    path = "/api/attendance/verify",
    request_body = VerifyReq,
    responses(
        (status = 200, description = "Checked in successfully", body = Object, example = json!({
            "message": "Checked in successfully",
            "record": {
                "id": 1,
                "student_id": "STU-0042",
                "date": "2025-01-01",
                "status": "present",
                "check_in_time": "2025-01-01T09:00:00",
                "created_at": "2025-01-01T06:00:00",
                "updated_at": "2025-01-01T09:00:00"
            }
        })),
        (status = 404, description = "Not scheduled today or unknown student", body = Object, example = json!({
            "message": "Not scheduled today"
        })),
        (status = 409, description = "Already checked in today", body = Object, example = json!({
            "message": "Already checked in today"
        })),
        (status = 422, description = "Verification failed", body = Object, example = json!({
            "message": "Face not recognized"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn verify(
    auth: AuthUser,
    ledger: web::Data<AttendanceLedger>,
    roster: web::Data<StudentRoster>,
    payload: web::Json<VerifyReq>,
) -> actix_web::Result<impl Responder> {
    let student_id = payload.student_id.trim();
    if student_id.is_empty() || !(0.0..=1.0).contains(&payload.confidence) {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "student_id is required and confidence must be within 0..1"
        })));
    }

    let now = ledger.clock().now();
    let today = now.date();
    let evidence = VerificationEvidence {
        method: payload.method,
        confidence: payload.confidence,
    };

    if !payload.verified {
        // history rows for unknown ids would be orphans from birth
        if roster.refresh_exists(student_id).await? {
            ledger
                .record_attempt(student_id, today, &evidence, HistoryOutcome::Rejected, now)
                .await?;
        }
        tracing::info!(student_id, kiosk = %auth.username, confidence = payload.confidence, "Verification rejected");
        return Ok(HttpResponse::UnprocessableEntity().json(json!({
            "message": "Face not recognized"
        })));
    }

    match ledger.mark_present(student_id, today, now, &evidence).await? {
        MarkOutcome::Marked(record) => Ok(HttpResponse::Ok().json(json!({
            "message": "Checked in successfully",
            "record": record
        }))),
        MarkOutcome::AlreadyMarkedOrMissing(reason) => {
            let body = json!({
                "message": reason.message(),
                "detail": reason
            });
            match reason {
                NotMarkedReason::NotScheduled => Ok(HttpResponse::NotFound().json(body)),
                NotMarkedReason::AlreadyPresent { .. } | NotMarkedReason::ClosedAbsent => {
                    ledger
                        .record_attempt(student_id, today, &evidence, HistoryOutcome::Duplicate, now)
                        .await?;
                    Ok(HttpResponse::Conflict().json(body))
                }
            }
        }
    }
}

/// Attendance records of a day, joined with the roster
#[utoipa::path(
    get,
    path = "/api/attendance/day/{date}",
    params(
        ("date", Path, description = "Calendar date, YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "Records of the day; deleted students are flagged DELETED_STUDENT", body = DayResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn get_day(
    ledger: web::Data<AttendanceLedger>,
    path: web::Path<NaiveDate>,
) -> actix_web::Result<impl Responder> {
    let date = path.into_inner();
    let data = ledger.get_day(date).await?;

    Ok(HttpResponse::Ok().json(DayResponse { date, data }))
}

/// Status counts of a day
#[utoipa::path(
    get,
    path = "/api/attendance/day/{date}/summary",
    params(
        ("date", Path, description = "Calendar date, YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "Counts per status", body = DaySummary),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn day_summary(
    ledger: web::Data<AttendanceLedger>,
    path: web::Path<NaiveDate>,
) -> actix_web::Result<impl Responder> {
    let summary = ledger.day_summary(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(summary))
}

/// Create missing `not_yet_here` records for every active student
#[utoipa::path(
    post,
    path = "/api/attendance/day/{date}/initialize",
    params(
        ("date", Path, description = "Calendar date, YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "Day initialized", body = Object, example = json!({
            "date": "2025-01-01",
            "created": 2
        })),
        (status = 403, description = "Admin/Operator only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn initialize_day(
    auth: AuthUser,
    ledger: web::Data<AttendanceLedger>,
    roster: web::Data<StudentRoster>,
    path: web::Path<NaiveDate>,
) -> actix_web::Result<impl Responder> {
    auth.require_staff()?;

    let date = path.into_inner();
    let students = roster.list_active_students().await?;
    let created = ledger.initialize_day(date, &students).await?;

    Ok(HttpResponse::Ok().json(json!({
        "date": date,
        "created": created
    })))
}

/// Mark everyone still `not_yet_here` as absent
#[utoipa::path(
    post,
    path = "/api/attendance/day/{date}/close",
    params(
        ("date", Path, description = "Calendar date, YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "Day closed", body = Object, example = json!({
            "date": "2025-01-01",
            "absent": 3
        })),
        (status = 403, description = "Admin/Operator only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn close_day(
    auth: AuthUser,
    ledger: web::Data<AttendanceLedger>,
    path: web::Path<NaiveDate>,
) -> actix_web::Result<impl Responder> {
    auth.require_staff()?;

    let date = path.into_inner();
    let absent = ledger.close_day(date).await?;
    tracing::info!(%date, absent, closed_by = %auth.username, "Day closed by operator");

    Ok(HttpResponse::Ok().json(json!({
        "date": date,
        "absent": absent
    })))
}

/// Verification history of a student, newest first
#[utoipa::path(
    get,
    path = "/api/attendance/history/{student_id}",
    params(
        ("student_id", Path, description = "Student ID"),
        HistoryQuery
    ),
    responses(
        (status = 200, description = "History entries", body = [AttendanceHistoryEntry]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn student_history(
    ledger: web::Data<AttendanceLedger>,
    path: web::Path<String>,
    query: web::Query<HistoryQuery>,
) -> actix_web::Result<impl Responder> {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let entries = ledger.student_history(&path.into_inner(), limit).await?;

    Ok(HttpResponse::Ok().json(entries))
}
