//! HTTP client side of the gossip protocol.

use crate::{AddPeerResponse, PeerNode, StatusResponse, SyncError, SyncResponse, SyncResult};
use opb_chain::{Block, Hash};
use std::time::Duration;
use tracing::debug;

/// Per-request timeout; a peer slower than this is treated as gone.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the peer endpoints of remote nodes.
#[derive(Clone)]
pub struct SyncClient {
    http: reqwest::Client,
}

impl SyncClient {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("http client construction cannot fail with static options");
        Self { http }
    }

    /// Probe a peer's tip and peer table.
    pub async fn status(&self, peer: &PeerNode) -> SyncResult<StatusResponse> {
        let url = format!("http://{}/node/status", peer.tcp_address());
        debug!(peer = %peer.tcp_address(), "querying peer status");

        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }

    /// Introduce ourselves so the peer adds us to its table.
    pub async fn join(&self, peer: &PeerNode, us: &PeerNode) -> SyncResult<()> {
        let url = format!(
            "http://{}/node/peer?ip={}&port={}&miner={}",
            peer.tcp_address(),
            us.ip,
            us.port,
            us.account
        );

        let response: AddPeerResponse =
            self.http.get(url).send().await?.error_for_status()?.json().await?;
        if !response.error.is_empty() {
            return Err(SyncError::Rejected(response.error));
        }
        if !response.success {
            return Err(SyncError::UnknownPeer(peer.tcp_address()));
        }
        Ok(())
    }

    /// Fetch the peer's blocks after our tip, exclusive. The zero hash asks
    /// for the peer's whole log.
    pub async fn blocks_after(&self, peer: &PeerNode, from: Hash) -> SyncResult<Vec<Block>> {
        let url = format!(
            "http://{}/node/sync?fromBlock={}",
            peer.tcp_address(),
            from.to_hex()
        );
        debug!(peer = %peer.tcp_address(), from = %from, "importing blocks from peer");

        let response: SyncResponse =
            self.http.get(url).send().await?.error_for_status()?.json().await?;
        Ok(response.blocks)
    }
}

impl Default for SyncClient {
    fn default() -> Self {
        Self::new()
    }
}
