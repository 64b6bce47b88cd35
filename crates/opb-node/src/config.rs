//! Node configuration.

use anyhow::{Context, Result};
use opb_chain::Address;
use opb_sync::PeerNode;
use std::path::PathBuf;

/// Default listen address.
pub const DEFAULT_IP: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8081;

/// Default miner account; blocks mined without a configured miner credit
/// the zero address.
pub const DEFAULT_MINER: &str = "0x0000000000000000000000000000000000000000";

/// Well-known seed node of the network.
pub const DEFAULT_BOOTSTRAP_ACCOUNT: &str = "0x0418A658C5874D2Fe181145B685d2e73D761865D";
pub const DEFAULT_BOOTSTRAP_IP: &str = "127.0.0.1";
pub const DEFAULT_BOOTSTRAP_PORT: u16 = 8081;

/// Complete node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Data directory holding the database and the keystore.
    pub data_dir: PathBuf,
    /// Listen IP.
    pub ip: String,
    /// Listen port.
    pub port: u16,
    /// Account credited for mined blocks.
    pub miner: Address,
    /// Seed peer, if any.
    pub bootstrap: Option<PeerNode>,
}

impl NodeConfig {
    /// Assemble the configuration from CLI flags.
    #[allow(clippy::too_many_arguments)]
    pub fn from_flags(
        data_dir: PathBuf,
        ip: String,
        port: u16,
        miner: &str,
        bootstrap_account: &str,
        bootstrap_ip: &str,
        bootstrap_port: u16,
    ) -> Result<Self> {
        let miner = Address::from_hex(miner).context("invalid --miner address")?;

        let bootstrap = if bootstrap_ip.is_empty() || bootstrap_port == 0 {
            None
        } else {
            let account = if bootstrap_account.is_empty() {
                Address::ZERO
            } else {
                Address::from_hex(bootstrap_account).context("invalid --bootstrap_account")?
            };
            Some(PeerNode::new(
                bootstrap_ip.to_string(),
                bootstrap_port,
                true,
                account,
                false,
            ))
        };

        Ok(Self {
            data_dir,
            ip,
            port,
            miner,
            bootstrap,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bootstrap_flags_mean_no_bootstrap_peer() {
        let config = NodeConfig::from_flags(
            PathBuf::from("/tmp/opb"),
            DEFAULT_IP.to_string(),
            DEFAULT_PORT,
            DEFAULT_MINER,
            "",
            "",
            0,
        )
        .unwrap();

        assert!(config.bootstrap.is_none());
        assert!(config.miner.is_zero());
    }

    #[test]
    fn bootstrap_peer_is_marked_bootstrap_and_unconnected() {
        let config = NodeConfig::from_flags(
            PathBuf::from("/tmp/opb"),
            DEFAULT_IP.to_string(),
            9000,
            DEFAULT_MINER,
            DEFAULT_BOOTSTRAP_ACCOUNT,
            DEFAULT_BOOTSTRAP_IP,
            DEFAULT_BOOTSTRAP_PORT,
        )
        .unwrap();

        let bootstrap = config.bootstrap.unwrap();
        assert!(bootstrap.is_bootstrap);
        assert!(!bootstrap.connected);
        assert_eq!(bootstrap.tcp_address(), "127.0.0.1:8081");
    }

    #[test]
    fn bad_miner_address_is_rejected() {
        let result = NodeConfig::from_flags(
            PathBuf::from("/tmp/opb"),
            DEFAULT_IP.to_string(),
            DEFAULT_PORT,
            "not-an-address",
            "",
            "",
            0,
        );
        assert!(result.is_err());
    }
}
