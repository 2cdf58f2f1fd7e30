//! Schema creation and in-place migration.
//!
//! # Responsibilities
//! - Create the `config` and `logs` tables if missing
//! - Add the `level` column to `logs` tables created before it existed
//! - Create the log indexes
//!
//! Every step is idempotent; running it against an up-to-date database is a no-op.

use sqlx::SqlitePool;

/// Timestamp expression used for server-assigned times (UTC, millisecond precision).
pub const NOW_EXPR: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

const CREATE_CONFIG: &str = r#"
    CREATE TABLE IF NOT EXISTS config (
        key TEXT PRIMARY KEY,
        value TEXT,
        updated_at DATETIME DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
    )
"#;

const CREATE_LOGS: &str = r#"
    CREATE TABLE IF NOT EXISTS logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        level TEXT DEFAULT 'INFO',
        event TEXT,
        data TEXT,
        timestamp DATETIME DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
    )
"#;

/// Bring the schema up to date.
pub async fn initialize(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(CREATE_CONFIG).execute(pool).await?;
    sqlx::query(CREATE_LOGS).execute(pool).await?;

    if !has_column(pool, "logs", "level").await? {
        sqlx::query("ALTER TABLE logs ADD COLUMN level TEXT DEFAULT 'INFO'")
            .execute(pool)
            .await?;
        tracing::info!("Added 'level' column to 'logs' table");
    }

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_logs_timestamp ON logs (timestamp)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_logs_level ON logs (level)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn has_column(pool: &SqlitePool, table: &str, column: &str) -> Result<bool, sqlx::Error> {
    let columns: Vec<(String,)> = sqlx::query_as("SELECT name FROM pragma_table_info(?)")
        .bind(table)
        .fetch_all(pool)
        .await?;

    Ok(columns.iter().any(|(name,)| name == column))
}
