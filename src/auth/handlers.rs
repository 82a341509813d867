use crate::{
    auth::{
        auth::AuthUser,
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    model::role::Role,
    models::{LoginReqDto, OperatorSql, TokenType},
};
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct OperatorReq {
    #[schema(example = "kiosk-lobby")]
    pub username: String,
    pub password: String,
    /// 1 = admin, 2 = operator, 3 = kiosk
    #[schema(example = 3)]
    pub role_id: u8,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
}

/// Inserts a new operator. Returns an error response on conflict or failure.
async fn insert_operator(
    username: &str,
    password: &str,
    role: Role,
    pool: &SqlitePool,
) -> Result<(), HttpResponse> {
    let hashed = hash_password(password).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        HttpResponse::InternalServerError().json(json!({
            "error": "Failed to register operator"
        }))
    })?;

    let result = sqlx::query(r#"INSERT INTO operators (username, password, role_id) VALUES (?, ?, ?)"#)
        .bind(username)
        .bind(hashed)
        .bind(role.id())
        .execute(pool)
        .await;

    match result {
        Ok(_) => Ok(()),
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return Err(HttpResponse::Conflict().json(json!({
                        "error": "Username already exists"
                    })));
                }
            }

            error!(error = %e, "Failed to insert operator");
            Err(HttpResponse::InternalServerError().json(json!({
                "error": "Failed to register operator"
            })))
        }
    }
}

/// Create the first admin account when the operators table is empty.
pub async fn bootstrap_admin(pool: &SqlitePool, username: &str, password: &str) -> anyhow::Result<bool> {
    let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM operators")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        return Ok(false);
    }

    let hashed = hash_password(password).map_err(|e| anyhow::anyhow!("hash password: {e}"))?;
    sqlx::query("INSERT INTO operators (username, password, role_id) VALUES (?, ?, ?)")
        .bind(username)
        .bind(hashed)
        .bind(Role::Admin.id())
        .execute(pool)
        .await?;

    info!(username, "Bootstrap admin created");
    Ok(true)
}

/// Register an operator or kiosk account (admin only)
#[utoipa::path(
    post,
    path = "/api/operators",
    request_body = OperatorReq,
    responses(
        (status = 201, description = "Operator registered", body = Object, example = json!({
            "message": "Operator registered successfully"
        })),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Username already exists")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Auth"
)]
pub async fn register(
    auth: AuthUser,
    operator: web::Json<OperatorReq>,
    pool: web::Data<SqlitePool>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let username = operator.username.trim();
    if username.is_empty() || operator.password.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "error": "Username and password must not be empty"
        })));
    }

    let Some(role) = Role::from_id(operator.role_id) else {
        return Ok(HttpResponse::BadRequest().json(json!({
            "error": "Unknown role_id"
        })));
    };

    match insert_operator(username, &operator.password, role, pool.get_ref()).await {
        Ok(()) => {
            info!(username, ?role, registered_by = %auth.username, "Operator registered");
            Ok(HttpResponse::Created().json(json!({
                "message": "Operator registered successfully"
            })))
        }
        Err(err_resp) => Ok(err_resp),
    }
}

/// Exchange credentials for an access and a refresh token
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 400, description = "Username or password missing"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> impl Responder {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return HttpResponse::BadRequest().body("Username or password required");
    }

    debug!("Fetching operator from database");

    let db_user = match sqlx::query_as::<_, OperatorSql>(
        r#"
        SELECT id, username, password, role_id, is_active
        FROM operators
        WHERE username = ?
        "#,
    )
    .bind(user.username.trim())
    .fetch_optional(pool.get_ref())
    .await
    {
        Ok(Some(user)) if user.is_active => {
            debug!(operator_id = user.id, "Operator found");
            user
        }
        Ok(_) => {
            info!("Invalid credentials: operator not found or inactive");
            return HttpResponse::Unauthorized().body("Invalid credentials");
        }
        Err(e) => {
            error!(error = %e, "Database error while fetching operator");
            return HttpResponse::InternalServerError().finish();
        }
    };

    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return HttpResponse::Unauthorized().body("Invalid credentials");
    }

    debug!("Password verified");

    let tokens = generate_access_token(
        db_user.id,
        db_user.username.clone(),
        db_user.role_id,
        &config.jwt_secret,
        config.access_token_ttl,
    )
    .and_then(|access| {
        generate_refresh_token(
            db_user.id,
            db_user.username.clone(),
            db_user.role_id,
            &config.jwt_secret,
            config.refresh_token_ttl,
        )
        .map(|(refresh, _)| (access, refresh))
    });

    let (access_token, refresh_token) = match tokens {
        Ok(pair) => pair,
        Err(e) => {
            error!(error = %e, "Failed to sign tokens");
            return HttpResponse::InternalServerError().finish();
        }
    };

    // Update last_login_at (non-fatal)
    if let Err(e) = sqlx::query("UPDATE operators SET last_login_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(db_user.id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
    }

    info!("Login successful");

    HttpResponse::Ok().json(LoginResponse {
        access_token,
        refresh_token,
    })
}

/// Trade a refresh token for a new token pair
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair", body = LoginResponse),
        (status = 401, description = "Missing, invalid or non-refresh token")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> impl Responder {
    let header = match req.headers().get("Authorization") {
        Some(h) => h.to_str().unwrap_or(""),
        None => return HttpResponse::Unauthorized().body("No token"),
    };

    let token = match header.strip_prefix("Bearer ") {
        Some(t) => t,
        None => return HttpResponse::Unauthorized().body("Invalid token"),
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) if c.token_type == TokenType::Refresh => c,
        _ => return HttpResponse::Unauthorized().finish(),
    };

    // the account may have been disabled since the token was issued
    let operator = sqlx::query_as::<_, (u8, bool)>("SELECT role_id, is_active FROM operators WHERE id = ?")
        .bind(claims.operator_id)
        .fetch_optional(pool.get_ref())
        .await;

    let role_id = match operator {
        Ok(Some((role_id, true))) => role_id,
        Ok(_) => return HttpResponse::Unauthorized().finish(),
        Err(e) => {
            error!(error = %e, "Database error while refreshing token");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let pair = generate_access_token(
        claims.operator_id,
        claims.sub.clone(),
        role_id,
        &config.jwt_secret,
        config.access_token_ttl,
    )
    .and_then(|access| {
        generate_refresh_token(
            claims.operator_id,
            claims.sub.clone(),
            role_id,
            &config.jwt_secret,
            config.refresh_token_ttl,
        )
        .map(|(refresh, _)| (access, refresh))
    });

    match pair {
        Ok((access_token, refresh_token)) => HttpResponse::Ok().json(LoginResponse {
            access_token,
            refresh_token,
        }),
        Err(e) => {
            error!(error = %e, "Failed to sign tokens");
            HttpResponse::InternalServerError().finish()
        }
    }
}
