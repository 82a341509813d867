use crate::{
    error::AttendanceError,
    service::{ledger::AttendanceLedger, roster::StudentRoster},
};
use chrono::NaiveDate;
use std::time::Duration;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolloverTick {
    pub date: NaiveDate,
    /// Past days closed on this tick and how many records each marked absent.
    pub closed: Vec<(NaiveDate, u64)>,
    pub created: u64,
}

/// Keeps today's records in place for the whole roster.
pub struct DayRollover {
    ledger: AttendanceLedger,
    roster: StudentRoster,
    auto_close_previous_day: bool,
}

impl DayRollover {
    pub fn new(ledger: AttendanceLedger, roster: StudentRoster, auto_close_previous_day: bool) -> Self {
        Self {
            ledger,
            roster,
            auto_close_previous_day,
        }
    }

    /// Close every past day still holding `not_yet_here` records, then
    /// (re)initialize today. Days missed while the server was down are
    /// closed on the first tick after restart.
    pub async fn tick(&self) -> Result<RolloverTick, AttendanceError> {
        let today = self.ledger.clock().today();

        let mut closed = Vec::new();
        if self.auto_close_previous_day {
            for previous in self.ledger.open_days_before(today).await? {
                let absent = self.ledger.close_day(previous).await?;
                closed.push((previous, absent));
            }
        }

        let roster = self.roster.list_active_students().await?;
        let created = self.ledger.initialize_day(today, &roster).await?;

        Ok(RolloverTick {
            date: today,
            closed,
            created,
        })
    }

    pub async fn run(self, interval: Duration) {
        let mut ticker = actix_web::rt::time::interval(interval);
        info!(interval_secs = interval.as_secs(), "Day rollover started");

        loop {
            ticker.tick().await;
            match self.tick().await {
                Ok(tick) if tick.created > 0 || !tick.closed.is_empty() => {
                    info!(date = %tick.date, created = tick.created, closed = ?tick.closed, "Day rollover applied");
                }
                Ok(_) => {}
                Err(e) => error!(error = %e, "Day rollover failed"),
            }
        }
    }
}
