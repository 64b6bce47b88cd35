//! # opb-storage
//!
//! On-disk layout of an OPB node data directory:
//!
//! ```text
//! <dataDir>/database/genesis.json   initial balances, symbol, fork height
//! <dataDir>/database/block.db       one BlockFs JSON object per line
//! ```
//!
//! The block log is append-only and the sole source of truth for chain
//! state; startup replays it line by line while recording byte offsets so
//! blocks can later be served by height or hash without a scan.

mod error;
mod genesis;
mod log;

pub use error::{StorageError, StorageResult};
pub use genesis::{init_data_dir, load_genesis, Genesis};
pub use log::BlockLog;

use std::path::{Path, PathBuf};

/// Directory holding the genesis file and the block log.
pub fn database_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("database")
}

/// Path to `genesis.json`.
pub fn genesis_path(data_dir: &Path) -> PathBuf {
    database_dir(data_dir).join("genesis.json")
}

/// Path to the block log.
pub fn block_db_path(data_dir: &Path) -> PathBuf {
    database_dir(data_dir).join("block.db")
}
