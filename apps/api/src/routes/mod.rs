pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};

use crate::generation::handlers as generation;
use crate::ledger::handlers as ledger;
use crate::state::AppState;

/// Resume PDFs routinely exceed axum's 2 MB default.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Generation
        .route("/api/v1/cover-letters", post(generation::handle_generate))
        .route("/api/generate", post(generation::handle_upload))
        // Application ledger
        .route("/api/v1/applications", get(ledger::handle_list_applications))
        .route(
            "/api/v1/applications/:seq/status",
            patch(ledger::handle_update_status),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}
