use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

const MAX_CONNECTIONS: u32 = 8;

/// Schema statements, applied in order on every start.
///
/// `daily_attendance` and `attendance_history` carry no foreign key
/// to `students`: deleting a student leaves orphans that the reconciler removes.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS students (
        student_id      TEXT PRIMARY KEY,
        name            TEXT NOT NULL,
        email           TEXT,
        phone           TEXT,
        enrollment_date TEXT NOT NULL,
        active          INTEGER NOT NULL DEFAULT 1,
        created_at      TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS daily_attendance (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        student_id    TEXT NOT NULL,
        date          TEXT NOT NULL,
        status        TEXT NOT NULL DEFAULT 'not_yet_here'
                      CHECK (status IN ('not_yet_here', 'present', 'absent')),
        check_in_time TEXT,
        created_at    TEXT NOT NULL,
        updated_at    TEXT NOT NULL,
        UNIQUE (student_id, date)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_daily_attendance_date ON daily_attendance (date)",
    r#"
    CREATE TABLE IF NOT EXISTS attendance_history (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        student_id  TEXT NOT NULL,
        date        TEXT NOT NULL,
        method      TEXT NOT NULL,
        confidence  REAL NOT NULL,
        verified    INTEGER NOT NULL,
        outcome     TEXT NOT NULL,
        recorded_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_attendance_history_student ON attendance_history (student_id)",
    r#"
    CREATE TABLE IF NOT EXISTS student_artifacts (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        student_id TEXT NOT NULL,
        kind       TEXT NOT NULL CHECK (kind IN ('face_template', 'photo')),
        path       TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS operators (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        username      TEXT NOT NULL UNIQUE COLLATE NOCASE,
        password      TEXT NOT NULL,
        role_id       INTEGER NOT NULL,
        is_active     INTEGER NOT NULL DEFAULT 1,
        last_login_at TEXT
    )
    "#,
];

/// Opens the shared pool and installs the schema.
pub async fn init_db(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    connect_with(options).await
}

/// Same as [`init_db`] for a database file path.
pub async fn init_db_at(path: impl AsRef<Path>) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path.as_ref())
        .create_if_missing(true);
    connect_with(options).await
}

async fn connect_with(options: SqliteConnectOptions) -> Result<SqlitePool, sqlx::Error> {
    let options = options
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await?;

    install_schema(&pool).await?;
    Ok(pool)
}

pub async fn install_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for statement in SCHEMA {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await?;

    tracing::debug!(statements = SCHEMA.len(), "Schema installed");
    Ok(())
}
