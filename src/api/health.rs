use actix_web::{HttpResponse, Responder, get, web};
use serde_json::json;
use sqlx::SqlitePool;

/// Liveness plus a storage round trip
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service and database reachable"),
        (status = 503, description = "Database unreachable")
    ),
    tag = "Health"
)]
#[get("/health")]
pub async fn health(pool: web::Data<SqlitePool>) -> impl Responder {
    match sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(pool.get_ref())
        .await
    {
        Ok(_) => HttpResponse::Ok().json(json!({ "status": "ok" })),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            HttpResponse::ServiceUnavailable().json(json!({ "status": "database unreachable" }))
        }
    }
}
