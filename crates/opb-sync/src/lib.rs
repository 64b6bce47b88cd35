//! # opb-sync
//!
//! Peer bookkeeping and the HTTP client side of the OPB gossip protocol.
//!
//! Every node polls its known peers on a fixed interval: status probe,
//! one-time join so the peer learns us, block backfill from our tip, then a
//! merge of the peer's own peer table. The server side of the same
//! endpoints lives in `opb-api`; the wire types are shared from here.

mod client;
mod error;
mod messages;
mod peer;

pub use client::SyncClient;
pub use error::{SyncError, SyncResult};
pub use messages::{AddPeerResponse, StatusResponse, SyncResponse};
pub use peer::{PeerNode, PeerTable};

/// Seconds between sync cycles.
pub const SYNC_INTERVAL_SECS: u64 = 45;
