//! Application Ledger: append-only log of every generated letter.
//!
//! Rows are keyed by `seq`, a 1-based integer recomputed as `MAX(seq) + 1` on
//! every append. Appends and status updates are serialized through one lock
//! shared by all clones of a `Ledger`; only one process may own the store.

pub mod handlers;
pub mod queue;

use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::application::{
    ApplicationRecord, ApplicationRow, ApplicationStatus, NewApplication,
};

pub use queue::LedgerQueue;

#[derive(Clone)]
pub struct Ledger {
    pool: SqlitePool,
    write_lock: Arc<Mutex<()>>,
}

impl Ledger {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Appends a record and returns its sequence number. Status starts unset.
    pub async fn append(&self, application: &NewApplication) -> Result<u32, AppError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        // Non-positive ids are not part of the sequence.
        let (max_seq, count): (Option<i64>, i64) =
            sqlx::query_as("SELECT MAX(seq), COUNT(*) FROM applications WHERE seq > 0")
                .fetch_one(&mut *tx)
                .await?;
        let highest = max_seq.unwrap_or(0);

        if highest != count {
            warn!(
                "Ledger sequence has gaps: highest #{highest} but {count} numbered rows; appending after #{highest}"
            );
        }

        let next = highest + 1;
        let seq = u32::try_from(next)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("Ledger sequence overflow at {next}")))?;

        sqlx::query(
            r#"
            INSERT INTO applications (seq, company, role, job_id, link, status)
            VALUES (?, ?, ?, ?, ?, NULL)
            "#,
        )
        .bind(next)
        .bind(&application.company)
        .bind(&application.role)
        .bind(&application.job_id)
        .bind(&application.link)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            "Logged application #{seq}: {} / {}",
            application.company, application.role
        );
        Ok(seq)
    }

    /// Writes the status marker on record `seq`. Re-marking overwrites.
    pub async fn update_status(&self, seq: u32, status: ApplicationStatus) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;

        let result = sqlx::query("UPDATE applications SET status = ? WHERE seq = ? AND seq > 0")
            .bind(status.marker())
            .bind(i64::from(seq))
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::RecordNotFound(seq));
        }

        info!("Marked application #{seq} as {status}");
        Ok(())
    }

    /// All records, top to bottom.
    pub async fn list(&self) -> Result<Vec<ApplicationRecord>, AppError> {
        let rows = sqlx::query_as::<_, ApplicationRow>(
            "SELECT seq, company, role, job_id, link, status FROM applications WHERE seq > 0 ORDER BY seq ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ApplicationRecord::from).collect())
    }

    pub async fn get(&self, seq: u32) -> Result<ApplicationRecord, AppError> {
        sqlx::query_as::<_, ApplicationRow>(
            "SELECT seq, company, role, job_id, link, status FROM applications WHERE seq = ? AND seq > 0",
        )
        .bind(i64::from(seq))
        .fetch_optional(&self.pool)
        .await?
        .map(ApplicationRecord::from)
        .ok_or(AppError::RecordNotFound(seq))
    }
}
