use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::info;

const CREATE_APPLICATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS applications (
    seq     INTEGER PRIMARY KEY,
    company TEXT NOT NULL,
    role    TEXT NOT NULL,
    job_id  TEXT,
    link    TEXT,
    status  TEXT
)
"#;

/// Opens (creating if missing) the SQLite ledger and ensures its table exists.
///
/// WAL with `synchronous=FULL` means a committed append or status update is on
/// disk before the call returns.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    info!("Opening application ledger at {database_url}");

    ensure_parent_dir(database_url)?;

    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("Invalid ledger database URL '{database_url}'"))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Full);

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await?;

    sqlx::query(CREATE_APPLICATIONS_TABLE).execute(&pool).await?;

    info!("Application ledger ready");
    Ok(pool)
}

/// Creates the directory holding a file-backed SQLite database.
fn ensure_parent_dir(database_url: &str) -> Result<()> {
    let Some(rest) = database_url.strip_prefix("sqlite:") else {
        return Ok(());
    };
    if rest.starts_with(":memory:") {
        return Ok(());
    }
    let path = rest.trim_start_matches("//");
    let path = path.split_once('?').map(|(p, _)| p).unwrap_or(path);
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create ledger directory {}", parent.display()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_pool_creates_file_and_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ledger.db");
        let url = format!("sqlite://{}", path.display());

        let pool = create_pool(&url).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM applications")
            .fetch_one(&pool)
            .await
            .unwrap();

        assert_eq!(count, 0);
        assert!(path.exists());
    }
}
