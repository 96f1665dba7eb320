//! Background ledger writer.
//!
//! Generation handlers hand finished applications to `LedgerQueue::submit` and
//! return immediately. A single worker task drains the queue in order. Failed
//! appends are logged as warnings; nothing is dropped without a log line.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::Ledger;
use crate::models::application::NewApplication;

#[derive(Clone)]
pub struct LedgerQueue {
    tx: mpsc::UnboundedSender<NewApplication>,
}

impl LedgerQueue {
    /// Starts the worker. It exits once every `LedgerQueue` clone is dropped
    /// and the remaining backlog has been written.
    pub fn spawn(ledger: Ledger) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<NewApplication>();

        let handle = tokio::spawn(async move {
            while let Some(application) = rx.recv().await {
                match ledger.append(&application).await {
                    Ok(seq) => info!(seq, company = %application.company, "background append done"),
                    Err(err) => warn!(
                        ?err,
                        company = %application.company,
                        role = %application.role,
                        "failed to log application to ledger"
                    ),
                }
            }
            info!("ledger queue drained; worker stopping");
        });

        (Self { tx }, handle)
    }

    /// Hands an application to the worker without waiting for the write.
    pub fn submit(&self, application: NewApplication) {
        if let Err(mpsc::error::SendError(lost)) = self.tx.send(application) {
            error!(
                company = %lost.company,
                role = %lost.role,
                "ledger worker is not running; application was not logged"
            );
        }
    }
}
