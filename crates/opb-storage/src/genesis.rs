//! Genesis file handling.

use crate::{block_db_path, database_dir, genesis_path, StorageError, StorageResult};
use opb_chain::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::info;

/// Genesis written into a fresh data directory.
const DEFAULT_GENESIS_JSON: &str = r#"{
  "genesis_time": "2022-04-19T00:00:00.000000000Z",
  "chain_id": "the-one-piece-berries-ledger",
  "symbol": "OPB",
  "balances": {
    "0x0418A658C5874D2Fe181145B685d2e73D761865D": 1000000
  },
  "fork_oip_1": 10
}
"#;

/// The chain's immutable starting point: initial balances, display symbol,
/// and the height at which OIP-1 fee accounting activates.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Genesis {
    #[serde(default)]
    pub genesis_time: String,
    #[serde(default)]
    pub chain_id: String,
    pub symbol: String,
    pub balances: HashMap<Address, u64>,
    pub fork_oip_1: u64,
}

/// Load and parse `genesis.json`.
pub fn load_genesis(path: &Path) -> StorageResult<Genesis> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| StorageError::InvalidGenesis(e.to_string()))
}

/// Create `<dataDir>/database/` with the default genesis and an empty block
/// log if they do not exist yet. The genesis file is written once and never
/// touched again.
pub fn init_data_dir(data_dir: &Path) -> StorageResult<()> {
    let db_dir = database_dir(data_dir);
    if !db_dir.exists() {
        fs::create_dir_all(&db_dir)?;
    }

    let genesis = genesis_path(data_dir);
    if !genesis.exists() {
        info!(path = %genesis.display(), "writing default genesis");
        fs::write(&genesis, DEFAULT_GENESIS_JSON)?;
    }

    let block_db = block_db_path(data_dir);
    if !block_db.exists() {
        fs::write(&block_db, "")?;
    }

    Ok(())
}
