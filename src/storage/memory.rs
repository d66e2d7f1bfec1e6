use crate::core::Block;
use crate::error::{LedgerError, Result};
use crate::storage::store::{LedgerStore, TIP_BLOCK_HASH_KEY};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// In-memory `LedgerStore` with the same key layout as the sled tree.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        Self::default()
    }

    /// Builds a store from blocks ordered genesis first; the last one becomes the tip.
    pub fn from_blocks(blocks: &[Block]) -> Result<MemoryStore> {
        let store = Self::new();
        for block in blocks {
            store.append_block(block)?;
        }
        Ok(store)
    }

    pub fn put_raw(&self, key: &[u8], value: &[u8]) {
        self.inner
            .write()
            .expect("Failed to acquire write lock on memory store - this should never happen")
            .insert(key.to_vec(), value.to_vec());
    }

    pub fn set_tip(&self, hash: &[u8]) {
        self.put_raw(TIP_BLOCK_HASH_KEY.as_bytes(), hash);
    }
}

impl LedgerStore for MemoryStore {
    fn tip_hash(&self) -> Result<Vec<u8>> {
        self.get_raw(TIP_BLOCK_HASH_KEY.as_bytes())?
            .ok_or_else(|| LedgerError::NotFound("No tip block recorded".to_string()))
    }

    fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let inner = self
            .inner
            .read()
            .expect("Failed to acquire read lock on memory store - this should never happen");
        Ok(inner.get(key).cloned())
    }

    fn append_block(&self, block: &Block) -> Result<()> {
        let block_data = block.serialize()?;
        let mut inner = self
            .inner
            .write()
            .expect("Failed to acquire write lock on memory store - this should never happen");
        inner.insert(block.get_hash().to_vec(), block_data);
        inner.insert(TIP_BLOCK_HASH_KEY.as_bytes().to_vec(), block.get_hash().to_vec());
        Ok(())
    }
}
