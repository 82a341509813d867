use crate::{
    auth::auth::AuthUser,
    service::reconciler::{OrphanRecord, PurgeReport, ReconcileReport, RosterReconciler},
};
use actix_web::{HttpResponse, Responder, web};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct OrphanListResponse {
    pub data: Vec<OrphanRecord>,
    #[schema(example = 2)]
    pub total: usize,
}

/// Attendance rows referencing deleted students
#[utoipa::path(
    get,
    path = "/api/reconcile/orphans",
    responses(
        (status = 200, description = "Orphaned rows", body = OrphanListResponse),
        (status = 403, description = "Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Reconcile"
)]
pub async fn list_orphans(
    auth: AuthUser,
    reconciler: web::Data<RosterReconciler>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let data = reconciler.find_orphans().await?;
    Ok(HttpResponse::Ok().json(OrphanListResponse {
        total: data.len(),
        data,
    }))
}

/// Purge every attendance row and artifact of one deleted student
#[utoipa::path(
    post,
    path = "/api/reconcile/purge/{student_id}",
    params(
        ("student_id", Path, description = "Student ID")
    ),
    responses(
        (status = 200, description = "Purged", body = PurgeReport),
        (status = 409, description = "Student is still enrolled"),
        (status = 403, description = "Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Reconcile"
)]
pub async fn purge_student(
    auth: AuthUser,
    reconciler: web::Data<RosterReconciler>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let report = reconciler.purge_orphans(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(report))
}

/// Purge every orphaned student; failures are reported per student
#[utoipa::path(
    post,
    path = "/api/reconcile/purge",
    responses(
        (status = 200, description = "Reconciliation report", body = ReconcileReport),
        (status = 403, description = "Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Reconcile"
)]
pub async fn purge_all(
    auth: AuthUser,
    reconciler: web::Data<RosterReconciler>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let report = reconciler.purge_all_orphans().await?;
    tracing::info!(
        purged = report.purged.len(),
        failed = report.failed.len(),
        by = %auth.username,
        "Reconciliation requested"
    );
    Ok(HttpResponse::Ok().json(report))
}
