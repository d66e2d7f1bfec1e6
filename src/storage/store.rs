// Block storage. Blocks live in one sled tree keyed by hash, next to a
// pointer to the newest block. Everything above this layer only sees the
// `LedgerStore` trait, so tests can run the same code on an in-memory map.

use crate::core::Block;
use crate::error::{LedgerError, Result};
use data_encoding::HEXLOWER;
use log::info;
use sled::{Db, Tree};
use std::path::{Path, PathBuf};

pub const TIP_BLOCK_HASH_KEY: &str = "tip_block_hash";
pub const BLOCKS_TREE: &str = "blocks";

/// Read access to a persisted chain, plus the single write path used to append.
pub trait LedgerStore {
    /// Hash of the most recent block.
    fn tip_hash(&self) -> Result<Vec<u8>>;

    /// Raw record stored under `key`, if any.
    fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Stores `block` and moves the tip to it in one atomic step.
    fn append_block(&self, block: &Block) -> Result<()>;

    fn block_by_hash(&self, hash: &[u8]) -> Result<Block> {
        let bytes = self.get_raw(hash)?.ok_or_else(|| {
            LedgerError::CorruptData(format!("Block {} is missing", HEXLOWER.encode(hash)))
        })?;
        Block::deserialize(&bytes).map_err(|e| {
            LedgerError::CorruptData(format!("Block {} failed to decode: {e}", HEXLOWER.encode(hash)))
        })
    }
}

pub struct SledStore {
    db: Db,
    blocks: Tree,
    db_path: PathBuf,
}

impl SledStore {
    /// Opens a ledger that must already exist and hold a tip.
    pub fn open_existing(path: &Path) -> Result<SledStore> {
        if !path.exists() {
            return Err(LedgerError::NotFound(format!(
                "No ledger at {}",
                path.display()
            )));
        }
        let store = Self::create(path)?;
        if store.blocks.get(TIP_BLOCK_HASH_KEY)?.is_none() {
            return Err(LedgerError::NotFound(format!(
                "Ledger at {} has no tip",
                path.display()
            )));
        }
        Ok(store)
    }

    /// Opens the ledger at `path`, creating an empty one if needed.
    pub fn create(path: &Path) -> Result<SledStore> {
        let db = sled::open(path)
            .map_err(|e| LedgerError::Database(format!("Failed to open database: {e}")))?;
        let blocks = db
            .open_tree(BLOCKS_TREE)
            .map_err(|e| LedgerError::Database(format!("Failed to open blocks tree: {e}")))?;
        Ok(SledStore {
            db,
            blocks,
            db_path: path.to_path_buf(),
        })
    }

    pub fn get_db_path(&self) -> &Path {
        &self.db_path
    }

    /// Every record of the blocks tree in key order.
    pub fn entries(&self) -> impl Iterator<Item = Result<(Vec<u8>, Vec<u8>)>> + '_ {
        self.blocks.iter().map(|item| {
            item.map(|(k, v)| (k.to_vec(), v.to_vec()))
                .map_err(|e| LedgerError::Database(format!("Failed to iterate blocks tree: {e}")))
        })
    }

    /// Writes a record verbatim. Only used when loading a ledger image.
    pub fn put_raw(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.blocks
            .insert(key, value)
            .map_err(|e| LedgerError::Database(format!("Failed to insert record: {e}")))?;
        Ok(())
    }

    pub fn flush(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| LedgerError::Database(format!("Failed to flush database: {e}")))?;
        Ok(())
    }
}

impl LedgerStore for SledStore {
    fn tip_hash(&self) -> Result<Vec<u8>> {
        let tip = self
            .blocks
            .get(TIP_BLOCK_HASH_KEY)
            .map_err(|e| LedgerError::Database(format!("Failed to get tip hash: {e}")))?
            .ok_or_else(|| LedgerError::NotFound("No tip block recorded".to_string()))?;
        Ok(tip.to_vec())
    }

    fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let data = self
            .blocks
            .get(key)
            .map_err(|e| LedgerError::Database(format!("Failed to get record: {e}")))?;
        Ok(data.map(|v| v.to_vec()))
    }

    fn append_block(&self, block: &Block) -> Result<()> {
        let block_hash = block.get_hash();
        let block_data = block.serialize()?;

        self.blocks
            .transaction(|tx_db| {
                tx_db.insert(block_hash, block_data.as_slice())?;
                tx_db.insert(TIP_BLOCK_HASH_KEY, block_hash)?;
                Ok(())
            })
            .map_err(|e: sled::transaction::TransactionError| {
                LedgerError::Database(format!("Failed to update blocks tree: {e}"))
            })?;

        info!("Appended block {}", block.get_hash_hex());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Transaction;
    use crate::wallet::{convert_address, hash_pub_key};
    use tempfile::tempdir;

    fn genesis() -> Block {
        let address = convert_address(&hash_pub_key(b"miner"));
        let coinbase = Transaction::new_coinbase_tx(&address, 50).unwrap();
        Block::generate_genesis_block(&coinbase).unwrap()
    }

    #[test]
    fn test_open_existing_missing_path() {
        let temp_dir = tempdir().unwrap();
        let result = SledStore::open_existing(&temp_dir.path().join("absent"));
        assert!(matches!(result, Err(LedgerError::NotFound(_))));
    }

    #[test]
    fn test_open_existing_without_tip() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("ledger");
        drop(SledStore::create(&path).unwrap());
        assert!(matches!(
            SledStore::open_existing(&path),
            Err(LedgerError::NotFound(_))
        ));
    }

    #[test]
    fn test_append_and_reopen() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("ledger");
        let block = genesis();
        {
            let store = SledStore::create(&path).unwrap();
            store.append_block(&block).unwrap();
            store.flush().unwrap();
        }

        let store = SledStore::open_existing(&path).unwrap();
        assert_eq!(store.tip_hash().unwrap(), block.get_hash());
        assert_eq!(store.block_by_hash(block.get_hash()).unwrap(), block);
    }

    #[test]
    fn test_undecodable_block_is_corrupt() {
        let temp_dir = tempdir().unwrap();
        let store = SledStore::create(&temp_dir.path().join("ledger")).unwrap();
        store.put_raw(b"bad", &[0xff, 0xff, 0xff]).unwrap();
        assert!(matches!(
            store.block_by_hash(b"bad"),
            Err(LedgerError::CorruptData(_))
        ));
    }
}
