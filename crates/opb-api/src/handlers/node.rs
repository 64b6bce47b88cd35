//! Peer-facing endpoints: status, join, and block backfill.

use crate::{ApiError, ApiResult, AppState};
use axum::extract::{Query, State};
use axum::Json;
use opb_chain::{Address, Hash};
use opb_sync::{AddPeerResponse, PeerNode, StatusResponse, SyncResponse};
use serde::Deserialize;
use tracing::info;

/// GET /node/status
pub async fn status(State(state): State<AppState>) -> ApiResult<Json<StatusResponse>> {
    Ok(Json(StatusResponse {
        block_hash: state.ledger.latest_hash(),
        block_height: state.ledger.latest_height(),
        known_peers: state.peers.snapshot(),
        pending_txns: state.mempool.pending_txns(),
    }))
}

/// `GET /node/peer` query parameters.
#[derive(Deserialize)]
pub struct AddPeerParams {
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub port: String,
    #[serde(default)]
    pub miner: String,
}

/// GET /node/peer
///
/// A failed parse still answers 200 with `success: false` so the caller
/// can surface the reason, mirroring the join handshake contract.
pub async fn add_peer(
    State(state): State<AppState>,
    Query(params): Query<AddPeerParams>,
) -> Json<AddPeerResponse> {
    let port: u16 = match params.port.parse() {
        Ok(port) => port,
        Err(e) => {
            return Json(AddPeerResponse {
                success: false,
                error: e.to_string(),
            })
        }
    };
    let account = Address::from_hex(&params.miner).unwrap_or(Address::ZERO);

    let peer = PeerNode::new(params.ip, port, false, account, true);
    info!(peer = %peer.tcp_address(), "peer added into known peers");
    state.peers.add(peer);

    Json(AddPeerResponse {
        success: true,
        error: String::new(),
    })
}

/// `GET /node/sync` query parameters.
#[derive(Deserialize)]
pub struct SyncParams {
    #[serde(rename = "fromBlock")]
    pub from_block: String,
}

/// GET /node/sync
pub async fn sync_blocks(
    State(state): State<AppState>,
    Query(params): Query<SyncParams>,
) -> ApiResult<Json<SyncResponse>> {
    let from = Hash::from_hex(&params.from_block)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let blocks = state.ledger.blocks_after(&from)?;
    Ok(Json(SyncResponse { blocks }))
}
