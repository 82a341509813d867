use crate::{
    auth::auth::AuthUser,
    model::student::Student,
    service::roster::{NewStudent, StudentFilter, StudentRoster},
};
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateStudent {
    #[schema(example = "STU-0042")]
    pub student_id: String,
    #[schema(example = "Ada Lovelace")]
    pub name: String,
    #[schema(example = "ada@school.edu", format = "email")]
    pub email: Option<String>,
    #[schema(example = "+15550100")]
    pub phone: Option<String>,
    #[schema(example = "2024-09-01", format = "date", value_type = String)]
    pub enrollment_date: chrono::NaiveDate,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct StudentQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Filter by enrollment state
    pub active: Option<bool>,
    /// Search id, name or email
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct StudentListResponse {
    pub data: Vec<Student>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 120)]
    pub total: i64,
}

/// Enroll a student
#[utoipa::path(
    post,
    path = "/api/students",
    request_body = CreateStudent,
    responses(
        (status = 201, description = "Student enrolled", body = Student),
        (status = 400, description = "Invalid input or duplicate student_id"),
        (status = 403, description = "Admin only")
    ),
    tag = "Student",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_student(
    auth: AuthUser,
    roster: web::Data<StudentRoster>,
    payload: web::Json<CreateStudent>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let payload = payload.into_inner();
    let student = roster
        .create_student(&NewStudent {
            student_id: payload.student_id,
            name: payload.name,
            email: payload.email,
            phone: payload.phone,
            enrollment_date: payload.enrollment_date,
        })
        .await?;

    Ok(HttpResponse::Created().json(student))
}

/// Paginated roster
#[utoipa::path(
    get,
    path = "/api/students",
    params(StudentQuery),
    responses(
        (status = 200, description = "Paginated student list", body = StudentListResponse)
    ),
    tag = "Student",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_students(
    roster: web::Data<StudentRoster>,
    query: web::Query<StudentQuery>,
) -> actix_web::Result<impl Responder> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let filter = StudentFilter {
        active: query.active,
        search: query.search.clone(),
    };

    let (data, total) = roster.list_students(&filter, page, per_page).await?;

    Ok(HttpResponse::Ok().json(StudentListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

/// Get student by ID
#[utoipa::path(
    get,
    path = "/api/students/{student_id}",
    params(
        ("student_id", Path, description = "Student ID")
    ),
    responses(
        (status = 200, description = "Student found", body = Student),
        (status = 404, description = "Student not found", body = Object, example = json!({
            "message": "Student not found"
        }))
    ),
    tag = "Student",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_student(
    roster: web::Data<StudentRoster>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    match roster.get_student(&path.into_inner()).await? {
        Some(student) => Ok(HttpResponse::Ok().json(student)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Student not found"
        }))),
    }
}

/// Update student fields (name, email, phone, enrollment_date, active)
#[utoipa::path(
    put,
    path = "/api/students/{student_id}",
    params(
        ("student_id", Path, description = "Student ID")
    ),
    request_body = Object,
    responses(
        (status = 200, description = "Student updated successfully"),
        (status = 400, description = "Field cannot be updated"),
        (status = 404, description = "Student not found")
    ),
    tag = "Student",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_student(
    auth: AuthUser,
    roster: web::Data<StudentRoster>,
    path: web::Path<String>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    if !roster.update_student(&path.into_inner(), &body).await? {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Student not found"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Student updated successfully"
    })))
}

/// Delete a student. Attendance rows remain as orphans until reconciled.
#[utoipa::path(
    delete,
    path = "/api/students/{student_id}",
    params(
        ("student_id", Path, description = "Student ID")
    ),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 404, description = "Student not found"),
        (status = 403, description = "Admin only")
    ),
    tag = "Student",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_student(
    auth: AuthUser,
    roster: web::Data<StudentRoster>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let student_id = path.into_inner();
    if !roster.delete_student(&student_id).await? {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Student not found"
        })));
    }

    info!(student_id, deleted_by = %auth.username, "Student removed from roster");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Successfully deleted"
    })))
}
