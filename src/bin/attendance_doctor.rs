//! Maintenance and diagnostics for the attendance database.
//!
//! ```text
//! attendance-doctor schema
//! attendance-doctor summary [YYYY-MM-DD]
//! attendance-doctor init-day [YYYY-MM-DD]
//! attendance-doctor close-day [YYYY-MM-DD]
//! attendance-doctor orphans
//! attendance-doctor purge <STUDENT_ID>
//! attendance-doctor purge-all
//! ```
//!
//! `--database-url` and `--artifact-dir` fall back to `DATABASE_URL` and
//! `ARTIFACT_DIR` (a `.env` file is honored).

use anyhow::{Result, bail};
use attendance::{
    clock::{Clock, SystemClock},
    db::init_db,
    service::{ledger::AttendanceLedger, reconciler::RosterReconciler, roster::StudentRoster},
};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "attendance-doctor")]
#[command(about = "Inspect and repair the attendance database")]
#[command(version)]
struct Cli {
    /// SQLite database URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Root directory of face templates and photos
    #[arg(long, env = "ARTIFACT_DIR", default_value = "data/artifacts")]
    artifact_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// List tables, their columns and row counts
    Schema,

    /// Status counts of a day
    Summary {
        /// Day to report, YYYY-MM-DD (default: today)
        date: Option<NaiveDate>,
    },

    /// Create missing records for every active student
    InitDay {
        /// Day to initialize, YYYY-MM-DD (default: today)
        date: Option<NaiveDate>,
    },

    /// Mark everyone still not_yet_here as absent
    CloseDay {
        /// Day to close, YYYY-MM-DD (default: today)
        date: Option<NaiveDate>,
    },

    /// List attendance rows of deleted students
    Orphans,

    /// Purge every row and artifact of one deleted student
    Purge {
        /// Student ID
        student_id: String,
    },

    /// Purge every orphaned student
    PurgeAll,
}

fn or_today(date: Option<NaiveDate>) -> NaiveDate {
    date.unwrap_or_else(|| SystemClock.today())
}

async fn print_schema(pool: &SqlitePool) -> Result<()> {
    let tables: Vec<(String,)> = sqlx::query_as(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    println!("=== Schema ===");
    for (table,) in &tables {
        let rows: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM \"{table}\""))
            .fetch_one(pool)
            .await?;
        println!("- {table} ({rows} rows)");

        let columns: Vec<(String, String, bool)> = sqlx::query_as(
            "SELECT name, type, \"notnull\" FROM pragma_table_info(?) ORDER BY cid",
        )
        .bind(table)
        .fetch_all(pool)
        .await?;

        for (name, ty, not_null) in columns {
            println!("    {name}: {ty}{}", if not_null { " NOT NULL" } else { "" });
        }
    }
    Ok(())
}

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let pool = init_db(&cli.database_url).await?;
    let roster = StudentRoster::new(pool.clone());
    let ledger = AttendanceLedger::new(pool.clone(), Arc::new(SystemClock));
    let reconciler = RosterReconciler::new(pool.clone(), roster.clone(), cli.artifact_dir);

    match cli.command {
        Commands::Schema => print_schema(&pool).await?,
        Commands::Summary { date } => {
            let summary = ledger.day_summary(or_today(date)).await?;
            println!("=== Attendance {} ===", summary.date);
            println!("present:      {}", summary.present);
            println!("not_yet_here: {}", summary.not_yet_here);
            println!("absent:       {}", summary.absent);
            println!("orphaned:     {}", summary.orphaned);
        }
        Commands::InitDay { date } => {
            let date = or_today(date);
            let students = roster.list_active_students().await?;
            let created = ledger.initialize_day(date, &students).await?;
            println!("{date}: {created} record(s) created for {} active student(s)", students.len());
        }
        Commands::CloseDay { date } => {
            let date = or_today(date);
            let absent = ledger.close_day(date).await?;
            println!("{date}: {absent} record(s) marked absent");
        }
        Commands::Orphans => {
            let orphans = reconciler.find_orphans().await?;
            println!("=== Orphaned attendance rows: {} ===", orphans.len());
            for orphan in &orphans {
                println!(
                    "  {:<20} {:<18} #{:<8} {}",
                    orphan.student_id,
                    format!("{:?}", orphan.source),
                    orphan.record_id,
                    orphan.date
                );
            }
        }
        Commands::Purge { student_id } => {
            let report = reconciler.purge_orphans(&student_id).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::PurgeAll => {
            let report = reconciler.purge_all_orphans().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.failed.is_empty() {
                bail!("{} student(s) could not be purged", report.failed.len());
            }
        }
    }

    Ok(())
}
