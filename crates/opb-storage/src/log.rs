//! Append-only block log.

use crate::{block_db_path, StorageError, StorageResult};
use opb_chain::{Block, BlockFs, Hash};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Byte offsets of log lines, keyed by block height and block hash.
#[derive(Default)]
struct LogIndex {
    by_height: HashMap<u64, u64>,
    by_hash: HashMap<Hash, u64>,
}

/// The append-only block log.
///
/// The append handle is opened once at startup and held for the node
/// lifetime; reads for serving blocks use short-lived read-only handles so
/// they never disturb the append position.
pub struct BlockLog {
    path: PathBuf,
    file: Mutex<File>,
    index: RwLock<LogIndex>,
}

impl BlockLog {
    /// Open the block log of a data directory in append+read mode.
    pub fn open(data_dir: &Path) -> StorageResult<Self> {
        let path = block_db_path(data_dir);
        let file = OpenOptions::new().append(true).read(true).open(&path)?;
        info!(path = %path.display(), "block log opened");

        Ok(Self {
            path,
            file: Mutex::new(file),
            index: RwLock::new(LogIndex::default()),
        })
    }

    /// Stream every stored block through `apply` in log order, recording
    /// line offsets for later lookups. Called once at startup.
    pub fn replay<E, F>(&self, mut apply: F) -> Result<(), E>
    where
        E: From<StorageError>,
        F: FnMut(BlockFs) -> Result<(), E>,
    {
        let reader = BufReader::new(File::open(&self.path).map_err(StorageError::from)?);

        let mut offset = 0u64;
        let mut index = self.index.write();
        for line in reader.lines() {
            let line = line.map_err(StorageError::from)?;
            if line.is_empty() {
                offset += 1;
                continue;
            }

            let block_fs: BlockFs =
                serde_json::from_str(&line).map_err(StorageError::from)?;
            let height = block_fs.block.header.height;
            let hash = block_fs.hash;

            apply(block_fs)?;

            index.by_height.insert(height, offset);
            index.by_hash.insert(hash, offset);
            offset += line.len() as u64 + 1;
        }

        Ok(())
    }

    /// Durably append one block line and index it.
    pub fn append(&self, block_fs: &BlockFs) -> StorageResult<()> {
        let mut line = serde_json::to_vec(block_fs)?;
        line.push(b'\n');

        let mut file = self.file.lock();
        let offset = file.metadata()?.len();
        file.write_all(&line)?;
        file.sync_data()?;

        let mut index = self.index.write();
        index.by_height.insert(block_fs.block.header.height, offset);
        index.by_hash.insert(block_fs.hash, offset);
        Ok(())
    }

    /// All blocks after the given hash, exclusive, in log order. The zero
    /// hash returns the whole log.
    pub fn blocks_after(&self, from: &Hash) -> StorageResult<Vec<Block>> {
        let reader = BufReader::new(File::open(&self.path)?);

        let mut blocks = Vec::new();
        let mut collecting = from.is_zero();
        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let block_fs: BlockFs = serde_json::from_str(&line)?;

            if collecting {
                blocks.push(block_fs.block);
            } else if block_fs.hash == *from {
                collecting = true;
            }
        }
        Ok(blocks)
    }

    /// Look up a stored block by height.
    pub fn block_by_height(&self, height: u64) -> StorageResult<BlockFs> {
        let offset = self
            .index
            .read()
            .by_height
            .get(&height)
            .copied()
            .ok_or_else(|| StorageError::UnknownBlock(format!("height {height}")))?;
        self.read_at(offset)
    }

    /// Look up a stored block by hash.
    pub fn block_by_hash(&self, hash: &Hash) -> StorageResult<BlockFs> {
        let offset = self
            .index
            .read()
            .by_hash
            .get(hash)
            .copied()
            .ok_or_else(|| StorageError::UnknownBlock(format!("hash {hash}")))?;
        self.read_at(offset)
    }

    fn read_at(&self, offset: u64) -> StorageResult<BlockFs> {
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(offset))?;

        let mut line = String::new();
        BufReader::new(file).read_line(&mut line)?;
        Ok(serde_json::from_str(line.trim_end())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::init_data_dir;
    use opb_chain::{Address, Block};
    use tempfile::TempDir;

    fn stored(height: u64, parent: Hash) -> BlockFs {
        let block = Block::new(height, parent, 1_650_000_000 + height, height as u32, Address::ZERO, vec![]);
        let hash = block.hash().unwrap();
        BlockFs { hash, block }
    }

    fn open_log() -> (BlockLog, TempDir) {
        let tmp = TempDir::new().unwrap();
        init_data_dir(tmp.path()).unwrap();
        (BlockLog::open(tmp.path()).unwrap(), tmp)
    }

    #[test]
    fn append_then_lookup_by_height_and_hash() {
        let (log, _tmp) = open_log();

        let b0 = stored(0, Hash::ZERO);
        let b1 = stored(1, b0.hash);
        log.append(&b0).unwrap();
        log.append(&b1).unwrap();

        assert_eq!(log.block_by_height(0).unwrap(), b0);
        assert_eq!(log.block_by_height(1).unwrap(), b1);
        assert_eq!(log.block_by_hash(&b1.hash).unwrap(), b1);

        assert!(matches!(
            log.block_by_height(7),
            Err(StorageError::UnknownBlock(_))
        ));
    }

    #[test]
    fn replay_rebuilds_the_index() {
        let (log, tmp) = open_log();

        let b0 = stored(0, Hash::ZERO);
        let b1 = stored(1, b0.hash);
        log.append(&b0).unwrap();
        log.append(&b1).unwrap();

        // A fresh handle starts with an empty index.
        let reopened = BlockLog::open(tmp.path()).unwrap();
        let mut seen = Vec::new();
        reopened
            .replay::<StorageError, _>(|fs| {
                seen.push(fs.block.header.height);
                Ok(())
            })
            .unwrap();

        assert_eq!(seen, vec![0, 1]);
        assert_eq!(reopened.block_by_hash(&b0.hash).unwrap(), b0);
        assert_eq!(reopened.block_by_height(1).unwrap(), b1);
    }

    #[test]
    fn blocks_after_is_exclusive_and_zero_means_everything() {
        let (log, _tmp) = open_log();

        let b0 = stored(0, Hash::ZERO);
        let b1 = stored(1, b0.hash);
        let b2 = stored(2, b1.hash);
        for b in [&b0, &b1, &b2] {
            log.append(b).unwrap();
        }

        let all = log.blocks_after(&Hash::ZERO).unwrap();
        assert_eq!(all.len(), 3);

        let after_b0 = log.blocks_after(&b0.hash).unwrap();
        assert_eq!(after_b0.len(), 2);
        assert_eq!(after_b0[0].header.height, 1);

        let after_b2 = log.blocks_after(&b2.hash).unwrap();
        assert!(after_b2.is_empty());

        // An unknown cursor collects nothing.
        let unknown = log.blocks_after(&Hash::new([0xee; 32])).unwrap();
        assert!(unknown.is_empty());
    }

    #[test]
    fn replay_error_stops_the_scan() {
        let (log, tmp) = open_log();
        log.append(&stored(0, Hash::ZERO)).unwrap();
        log.append(&stored(1, Hash::ZERO)).unwrap();

        let reopened = BlockLog::open(tmp.path()).unwrap();
        let mut calls = 0;
        let result = reopened.replay::<StorageError, _>(|_| {
            calls += 1;
            Err(StorageError::UnknownBlock("boom".into()))
        });

        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
