use crate::core::Block;
use crate::error::{LedgerError, Result};
use crate::storage::LedgerStore;
use data_encoding::HEXLOWER;
use std::collections::HashSet;

/// Walks the chain backward from the tip, following `pre_block_hash` links.
///
/// Yields the genesis block last and then stops. Any store or decode failure
/// is yielded once and ends the walk, as does a link that loops back onto a
/// block already visited. Build a fresh walker to start over.
pub struct ChainWalker<'a> {
    store: &'a dyn LedgerStore,
    current_hash: Option<Vec<u8>>,
    visited: HashSet<Vec<u8>>,
}

impl<'a> ChainWalker<'a> {
    /// Starts at the store's current tip.
    pub fn new(store: &'a dyn LedgerStore) -> Result<ChainWalker<'a>> {
        let tip = store.tip_hash()?;
        Ok(Self::from_hash(store, tip))
    }

    pub fn from_hash(store: &'a dyn LedgerStore, hash: Vec<u8>) -> ChainWalker<'a> {
        ChainWalker {
            store,
            current_hash: Some(hash),
            visited: HashSet::new(),
        }
    }
}

impl Iterator for ChainWalker<'_> {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        let hash = self.current_hash.take()?;

        if !self.visited.insert(hash.clone()) {
            return Some(Err(LedgerError::CorruptData(format!(
                "Chain loops back to block {}",
                HEXLOWER.encode(&hash)
            ))));
        }

        match self.store.block_by_hash(&hash) {
            Ok(block) => {
                if !block.is_genesis() {
                    self.current_hash = Some(block.get_pre_block_hash().to_vec());
                }
                Some(Ok(block))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Transaction;
    use crate::storage::MemoryStore;
    use crate::wallet::{convert_address, hash_pub_key};

    fn chain_of(len: usize) -> Vec<Block> {
        let address = convert_address(&hash_pub_key(b"miner"));
        let mut blocks: Vec<Block> = Vec::new();
        for nonce in 0..len {
            let coinbase = Transaction::new_coinbase_tx(&address, 50).unwrap();
            let pre = blocks.last().map(|b| b.get_hash().to_vec()).unwrap_or_default();
            blocks.push(Block::new_block(pre, &[coinbase], nonce as i64, vec![]).unwrap());
        }
        blocks
    }

    #[test]
    fn test_walks_tip_to_genesis() {
        let blocks = chain_of(4);
        let store = MemoryStore::from_blocks(&blocks).unwrap();

        let walked: Vec<Block> = ChainWalker::new(&store)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        let expected: Vec<Block> = blocks.into_iter().rev().collect();
        assert_eq!(walked, expected);
        assert!(walked.last().unwrap().is_genesis());
    }

    #[test]
    fn test_empty_store_has_no_tip() {
        let store = MemoryStore::new();
        assert!(matches!(
            ChainWalker::new(&store),
            Err(LedgerError::NotFound(_))
        ));
    }

    #[test]
    fn test_corrupt_block_ends_walk() {
        let blocks = chain_of(3);
        let store = MemoryStore::from_blocks(&blocks).unwrap();
        store.put_raw(blocks[1].get_hash(), b"garbage");

        let mut walker = ChainWalker::new(&store).unwrap();
        assert!(walker.next().unwrap().is_ok());
        assert!(matches!(
            walker.next(),
            Some(Err(LedgerError::CorruptData(_)))
        ));
        assert!(walker.next().is_none());
    }

    #[test]
    fn test_dangling_link_is_corrupt() {
        let blocks = chain_of(2);
        let store = MemoryStore::new();
        store.append_block(&blocks[1]).unwrap();

        let results: Vec<Result<Block>> = ChainWalker::new(&store).unwrap().collect();
        assert_eq!(results.len(), 2);
        assert!(matches!(results[1], Err(LedgerError::CorruptData(_))));
    }

    #[test]
    fn test_cycle_is_detected() {
        let address = convert_address(&hash_pub_key(b"miner"));
        let coinbase = Transaction::new_coinbase_tx(&address, 50).unwrap();
        let block = Block::new_block(b"somewhere".to_vec(), &[coinbase], 0, vec![]).unwrap();

        // Store the block under the hash it points back to, so it links to itself
        let store = MemoryStore::new();
        store.put_raw(b"somewhere", &block.serialize().unwrap());
        store.set_tip(b"somewhere");

        let results: Vec<Result<Block>> = ChainWalker::new(&store).unwrap().collect();
        assert_eq!(results.len(), 2);
        assert!(matches!(results[1], Err(LedgerError::CorruptData(_))));
    }
}
