//! Route definitions.

use crate::{handlers, AppState};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the node's HTTP router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/balances/list", get(handlers::balances::list_balances))
        .route("/txn/add", post(handlers::transactions::add_txn))
        .route("/node/status", get(handlers::node::status))
        .route("/node/peer", get(handlers::node::add_peer))
        .route("/node/sync", get(handlers::node::sync_blocks))
        .route("/block/:id", get(handlers::blocks::block_by_height_or_hash))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
