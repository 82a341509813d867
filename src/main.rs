use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

use attendance::app::Services;
use attendance::auth::handlers::bootstrap_admin;
use attendance::clock::{SharedClock, SystemClock};
use attendance::config::Config;
use attendance::db::init_db;
use attendance::docs::ApiDoc;
use attendance::routes;
use attendance::utils::day_rollover::DayRollover;

use tracing::{error, info};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Student attendance service"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "attendance.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config.database_url)
        .await
        .with_context(|| format!("failed to open database {}", config.database_url))?;

    if let Some((username, password)) = &config.bootstrap_admin {
        bootstrap_admin(&pool, username, password).await?;
    }

    let clock: SharedClock = Arc::new(SystemClock);
    let services = Services::new(pool, &config, clock);

    let roster_for_warmup = services.roster.clone();
    let pool_for_warmup = services.pool.clone();
    actix_web::rt::spawn(async move {
        if let Err(e) = roster_for_warmup
            .cache()
            .warmup(&pool_for_warmup, 250)
            .await
        {
            error!(error = %e, "Failed to warm up roster cache");
        }
    });

    let rollover = DayRollover::new(
        services.ledger.clone(),
        services.roster.clone(),
        config.auto_close_previous_day,
    );
    actix_web::rt::spawn(rollover.run(Duration::from_secs(
        config.day_rollover_interval_secs.max(1),
    )));

    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(config.clone()))
            .configure(|cfg| services.register(cfg))
            .service(index)
            // auth + protected routes with rate limiting
            .configure(|cfg| routes::configure(cfg, config.clone()))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
