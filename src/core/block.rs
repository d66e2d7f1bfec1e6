use crate::core::Transaction;
use crate::error::{LedgerError, Result};
use crate::utils::{current_timestamp, deserialize, serialize, sha256_digest};
use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Block {
    timestamp: i64,
    transactions: Vec<Transaction>,
    pre_block_hash: Vec<u8>, // empty for the genesis block
    nonce: i64,
    hash: Vec<u8>,
    peer_hints: Vec<String>, // addresses of peers that held this block
}

/// Header fields the block hash commits to.
#[derive(Serialize, bincode::Encode)]
struct BlockHeader<'a> {
    timestamp: i64,
    pre_block_hash: &'a [u8],
    tx_hash: Vec<u8>,
    nonce: i64,
}

impl Block {
    /// Assembles a block on top of `pre_block_hash`. No proof-of-work is run;
    /// blocks arrive already mined, this only seals the header.
    pub fn new_block(
        pre_block_hash: Vec<u8>,
        transactions: &[Transaction],
        nonce: i64,
        peer_hints: Vec<String>,
    ) -> Result<Block> {
        if transactions.is_empty() {
            return Err(LedgerError::CorruptData(
                "Block must contain at least one transaction".to_string(),
            ));
        }

        let mut block = Block {
            timestamp: current_timestamp()?,
            transactions: transactions.to_vec(),
            pre_block_hash,
            nonce,
            hash: vec![],
            peer_hints,
        };
        block.hash = block.compute_hash()?;
        Ok(block)
    }

    pub fn generate_genesis_block(transaction: &Transaction) -> Result<Block> {
        Block::new_block(vec![], std::slice::from_ref(transaction), 0, vec![])
    }

    fn compute_hash(&self) -> Result<Vec<u8>> {
        let header = BlockHeader {
            timestamp: self.timestamp,
            pre_block_hash: &self.pre_block_hash,
            tx_hash: self.hash_transactions(),
            nonce: self.nonce,
        };
        Ok(sha256_digest(&serialize(&header)?))
    }

    pub fn hash_transactions(&self) -> Vec<u8> {
        let mut txhashs = vec![];
        for transaction in &self.transactions {
            txhashs.extend(transaction.get_id());
        }
        sha256_digest(txhashs.as_slice())
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Block> {
        deserialize::<Block>(bytes)
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn is_genesis(&self) -> bool {
        self.pre_block_hash.is_empty()
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn get_pre_block_hash(&self) -> &[u8] {
        self.pre_block_hash.as_slice()
    }

    pub fn get_hash(&self) -> &[u8] {
        self.hash.as_slice()
    }

    pub fn get_hash_hex(&self) -> String {
        HEXLOWER.encode(&self.hash)
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_nonce(&self) -> i64 {
        self.nonce
    }

    pub fn get_peer_hints(&self) -> &[String] {
        self.peer_hints.as_slice()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::{convert_address, hash_pub_key};

    fn coinbase() -> Transaction {
        Transaction::new_coinbase_tx(&convert_address(&hash_pub_key(b"miner")), 50).unwrap()
    }

    #[test]
    fn test_genesis_has_empty_previous_hash() {
        let genesis = Block::generate_genesis_block(&coinbase()).unwrap();
        assert!(genesis.is_genesis());
        assert_eq!(genesis.get_hash().len(), 32);
    }

    #[test]
    fn test_block_links_to_parent() {
        let genesis = Block::generate_genesis_block(&coinbase()).unwrap();
        let next = Block::new_block(
            genesis.get_hash().to_vec(),
            &[coinbase()],
            7,
            vec!["10.0.0.2:9888".to_string()],
        )
        .unwrap();
        assert!(!next.is_genesis());
        assert_eq!(next.get_pre_block_hash(), genesis.get_hash());
        assert_eq!(next.get_nonce(), 7);
        assert_eq!(next.get_peer_hints(), ["10.0.0.2:9888".to_string()]);
        assert_ne!(next.get_hash(), genesis.get_hash());
    }

    #[test]
    fn test_empty_block_is_rejected() {
        assert!(Block::new_block(vec![], &[], 0, vec![]).is_err());
    }

    #[test]
    fn test_serialize_round_trip() {
        let block = Block::generate_genesis_block(&coinbase()).unwrap();
        let bytes = block.serialize().unwrap();
        assert_eq!(Block::deserialize(&bytes).unwrap(), block);
    }
}
