use crate::api::attendance::{DayResponse, VerifyReq};
use crate::api::reconcile::OrphanListResponse;
use crate::api::students::{CreateStudent, StudentListResponse};
use crate::auth::handlers::{LoginResponse, OperatorReq};
use crate::model::attendance::{
    AttendanceStatus, DailyAttendanceRecord, DayEntry, DaySummary, RecordFlag,
};
use crate::model::history::{AttendanceHistoryEntry, HistoryOutcome, VerificationMethod};
use crate::model::student::Student;
use crate::models::LoginReqDto;
use crate::service::reconciler::{
    OrphanRecord, OrphanSource, PurgeFailure, PurgeReport, ReconcileReport,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Student Attendance API",
        version = "0.1.0",
        description = r#"
## Student Attendance Service

Daily attendance for enrolled students, driven by an external face-recognition check.

### Key Features
- **Check-in**
  - Kiosks forward the verifier's verdict; the first verified event of the day marks the student present
  - Repeated verifications never create a second record or overwrite the first check-in
- **Daily ledger**
  - One record per student per day: `not_yet_here`, `present` or `absent`
  - Records of deleted students are reported with the `DELETED_STUDENT` flag
- **Verification history**
  - Append-only audit of every verification event
- **Reconciliation**
  - Find and purge attendance rows, templates and photos of deleted students

### Security
Endpoints under `/api` require a JWT Bearer token. Roles: admin, operator, kiosk.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::health::health,

        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::register,

        crate::api::attendance::verify,
        crate::api::attendance::get_day,
        crate::api::attendance::day_summary,
        crate::api::attendance::initialize_day,
        crate::api::attendance::close_day,
        crate::api::attendance::student_history,

        crate::api::students::create_student,
        crate::api::students::list_students,
        crate::api::students::get_student,
        crate::api::students::update_student,
        crate::api::students::delete_student,

        crate::api::reconcile::list_orphans,
        crate::api::reconcile::purge_student,
        crate::api::reconcile::purge_all
    ),
    components(
        schemas(
            LoginReqDto,
            LoginResponse,
            OperatorReq,
            VerifyReq,
            DayResponse,
            DayEntry,
            DaySummary,
            DailyAttendanceRecord,
            AttendanceStatus,
            RecordFlag,
            AttendanceHistoryEntry,
            HistoryOutcome,
            VerificationMethod,
            Student,
            CreateStudent,
            StudentListResponse,
            OrphanRecord,
            OrphanSource,
            OrphanListResponse,
            PurgeReport,
            PurgeFailure,
            ReconcileReport
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Check-in and daily ledger APIs"),
        (name = "Student", description = "Roster management APIs"),
        (name = "Reconcile", description = "Orphan discovery and cleanup APIs"),
        (name = "Auth", description = "Operator authentication APIs"),
        (name = "Health", description = "Liveness"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
