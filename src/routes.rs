use crate::{
    api::{attendance, health, reconcile, students},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

// Per-route limiter; a zero budget still admits one request per millisecond
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        (60_000 / requests_per_min as u64).max(1)
    };
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .expect("per_millisecond and burst_size are non-zero");
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let verify_limiter = Arc::new(build_limiter(config.rate_verify_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    cfg.service(health::health);

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(login_limiter)
                    .route(web::post().to(handlers::refresh_token)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(web::resource("/operators").route(web::post().to(handlers::register)))
            .service(
                web::scope("/students")
                    // /students
                    .service(
                        web::resource("")
                            .route(web::post().to(students::create_student))
                            .route(web::get().to(students::list_students)),
                    )
                    // /students/{student_id}
                    .service(
                        web::resource("/{student_id}")
                            .route(web::get().to(students::get_student))
                            .route(web::put().to(students::update_student))
                            .route(web::delete().to(students::delete_student)),
                    ),
            )
            .service(
                web::scope("/attendance")
                    // /attendance/verify
                    .service(
                        web::resource("/verify")
                            .wrap(verify_limiter)
                            .route(web::post().to(attendance::verify)),
                    )
                    // /attendance/day/{date}
                    .service(web::resource("/day/{date}").route(web::get().to(attendance::get_day)))
                    .service(
                        web::resource("/day/{date}/summary")
                            .route(web::get().to(attendance::day_summary)),
                    )
                    .service(
                        web::resource("/day/{date}/initialize")
                            .route(web::post().to(attendance::initialize_day)),
                    )
                    .service(
                        web::resource("/day/{date}/close")
                            .route(web::post().to(attendance::close_day)),
                    )
                    // /attendance/history/{student_id}
                    .service(
                        web::resource("/history/{student_id}")
                            .route(web::get().to(attendance::student_history)),
                    ),
            )
            .service(
                web::scope("/reconcile")
                    .service(
                        web::resource("/orphans").route(web::get().to(reconcile::list_orphans)),
                    )
                    .service(web::resource("/purge").route(web::post().to(reconcile::purge_all)))
                    .service(
                        web::resource("/purge/{student_id}")
                            .route(web::post().to(reconcile::purge_student)),
                    ),
            ),
    );
}
