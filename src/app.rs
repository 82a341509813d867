use crate::{
    clock::SharedClock,
    config::Config,
    service::{ledger::AttendanceLedger, reconciler::RosterReconciler, roster::StudentRoster},
};
use actix_web::web::{self, Data};
use sqlx::SqlitePool;

/// Components built once per process around the shared pool.
#[derive(Clone)]
pub struct Services {
    pub pool: SqlitePool,
    pub ledger: AttendanceLedger,
    pub roster: StudentRoster,
    pub reconciler: RosterReconciler,
}

impl Services {
    pub fn new(pool: SqlitePool, config: &Config, clock: SharedClock) -> Self {
        let roster = StudentRoster::new(pool.clone());
        let ledger = AttendanceLedger::new(pool.clone(), clock);
        let reconciler = RosterReconciler::new(pool.clone(), roster.clone(), &config.artifact_dir);

        Self {
            pool,
            ledger,
            roster,
            reconciler,
        }
    }

    /// Register every component as app data for the handlers.
    pub fn register(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(Data::new(self.pool.clone()))
            .app_data(Data::new(self.ledger.clone()))
            .app_data(Data::new(self.roster.clone()))
            .app_data(Data::new(self.reconciler.clone()));
    }
}
