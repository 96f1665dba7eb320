use std::sync::Arc;

use crate::config::Config;
use crate::extractor::RequirementExtractor;
use crate::generation::router::ProviderRouter;
use crate::ledger::{Ledger, LedgerQueue};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Phase 1 of generation. Default: `ToolExtractor` over `EXTRACTOR_COMMAND`.
    pub extractor: Arc<dyn RequirementExtractor>,
    pub router: ProviderRouter,
    /// Read side and status updates. Appends go through `ledger_queue`.
    pub ledger: Ledger,
    pub ledger_queue: LedgerQueue,
}
