//! Wire types shared by the sync client and the HTTP surface.

use crate::PeerNode;
use opb_chain::{Block, Hash, SignedTxn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `GET /node/status` response: the peer's tip, its peer table, and its
/// pending transactions for gossip.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct StatusResponse {
    pub block_hash: Hash,
    pub block_height: u64,
    pub known_peers: HashMap<String, PeerNode>,
    pub pending_txns: Vec<SignedTxn>,
}

/// `GET /node/sync` response: ordered blocks after the requested cursor.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SyncResponse {
    pub blocks: Vec<Block>,
}

/// `GET /node/peer` response.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct AddPeerResponse {
    pub success: bool,
    pub error: String,
}
