//! # opb-api
//!
//! HTTP surface of the OPB node:
//! - `GET /balances/list`: canonical balances at the tip
//! - `POST /txn/add`: sign a transfer via the keystore and admit it
//! - `GET /node/status`: tip, known peers, pending txns
//! - `GET /node/peer`: join handshake from a remote node
//! - `GET /node/sync`: block backfill after a cursor
//! - `GET /block/:id`: stored block by height or hash
//!
//! Handlers are thin adapters; admission and state live behind
//! [`AppState`], which the node also hands to its sync loop so both entry
//! points share one code path.

mod error;
mod handlers;
mod routes;
mod state;

pub use error::{ApiError, ApiResult};
pub use routes::build_router;
pub use state::AppState;
