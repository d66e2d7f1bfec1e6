// Value-transfer transactions in the UTXO model.
// Inputs reference whole prior outputs by (txid, index); outputs are locked to a pub key hash.

use crate::error::Result;
use crate::utils::{deserialize, serialize, sha256_digest};
use crate::wallet::pub_key_hash_from_address;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Output index carried by the single input of a coinbase transaction.
pub const COINBASE_VOUT: i64 = -1;

#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct TXInput {
    txid: Vec<u8>,      // id of the transaction holding the referenced output
    vout: i64,          // index of that output, COINBASE_VOUT when there is none
    signature: Vec<u8>,
    pub_key: Vec<u8>,   // raw spender key, hashes to the referenced output's pub_key_hash
}

impl TXInput {
    pub fn new(txid: &[u8], vout: i64) -> TXInput {
        TXInput {
            txid: txid.to_vec(),
            vout,
            signature: vec![],
            pub_key: vec![],
        }
    }

    pub fn with_pub_key(mut self, pub_key: &[u8]) -> TXInput {
        self.pub_key = pub_key.to_vec();
        self
    }

    pub fn get_txid(&self) -> &[u8] {
        self.txid.as_slice()
    }

    pub fn get_vout(&self) -> i64 {
        self.vout
    }

    pub fn get_signature(&self) -> &[u8] {
        self.signature.as_slice()
    }

    pub fn get_pub_key(&self) -> &[u8] {
        self.pub_key.as_slice()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct TXOutput {
    value: u64,
    pub_key_hash: Vec<u8>,
}

impl TXOutput {
    pub fn new(value: u64, pub_key_hash: &[u8]) -> TXOutput {
        TXOutput {
            value,
            pub_key_hash: pub_key_hash.to_vec(),
        }
    }

    /// Locks `value` to the key hash carried inside a base58check address.
    pub fn to_address(value: u64, address: &str) -> Result<TXOutput> {
        let pub_key_hash = pub_key_hash_from_address(address)?;
        Ok(TXOutput {
            value,
            pub_key_hash,
        })
    }

    pub fn get_value(&self) -> u64 {
        self.value
    }

    pub fn get_pub_key_hash(&self) -> &[u8] {
        self.pub_key_hash.as_slice()
    }

    pub fn is_locked_with_key(&self, pub_key_hash: &[u8]) -> bool {
        self.pub_key_hash.eq(pub_key_hash)
    }
}

#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Transaction {
    id: Vec<u8>,
    vin: Vec<TXInput>,
    vout: Vec<TXOutput>,
}

impl Transaction {
    pub fn new(vin: Vec<TXInput>, vout: Vec<TXOutput>) -> Result<Transaction> {
        let mut tx = Transaction {
            id: vec![],
            vin,
            vout,
        };
        tx.id = tx.hash()?;
        Ok(tx)
    }

    /// Mints `reward` to `to`. The lone input carries random bytes so two
    /// coinbase transactions to the same address never share an id.
    pub fn new_coinbase_tx(to: &str, reward: u64) -> Result<Transaction> {
        let txout = TXOutput::to_address(reward, to)?;
        let tx_input = TXInput {
            txid: vec![],
            vout: COINBASE_VOUT,
            signature: Uuid::new_v4().as_bytes().to_vec(),
            pub_key: vec![],
        };
        Transaction::new(vec![tx_input], vec![txout])
    }

    pub fn is_coinbase(&self) -> bool {
        self.vin.len() == 1 && self.vin[0].txid.is_empty() && self.vin[0].vout == COINBASE_VOUT
    }

    // Id is the digest of the transaction with its own id left empty
    fn hash(&self) -> Result<Vec<u8>> {
        let tx_copy = Transaction {
            id: vec![],
            vin: self.vin.clone(),
            vout: self.vout.clone(),
        };
        Ok(sha256_digest(&tx_copy.serialize()?))
    }

    pub fn get_id(&self) -> &[u8] {
        self.id.as_slice()
    }

    pub fn get_vin(&self) -> &[TXInput] {
        self.vin.as_slice()
    }

    pub fn get_vout(&self) -> &[TXOutput] {
        self.vout.as_slice()
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Transaction> {
        deserialize(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::{convert_address, hash_pub_key};

    #[test]
    fn test_coinbase_detection() {
        let address = convert_address(&hash_pub_key(b"miner"));
        let coinbase = Transaction::new_coinbase_tx(&address, 50).unwrap();
        assert!(coinbase.is_coinbase());
        assert_eq!(coinbase.get_vin()[0].get_vout(), COINBASE_VOUT);
        assert_eq!(coinbase.get_vout()[0].get_value(), 50);
        assert_eq!(coinbase.get_vin()[0].get_signature().len(), 16);
    }

    #[test]
    fn test_regular_transaction_is_not_coinbase() {
        let spend = Transaction::new(
            vec![TXInput::new(b"prev", 0)],
            vec![TXOutput::new(10, &hash_pub_key(b"bob"))],
        )
        .unwrap();
        assert!(!spend.is_coinbase());

        // Empty txid alone is not enough, the sentinel index is required too
        let odd = Transaction::new(
            vec![TXInput::new(&[], 0)],
            vec![TXOutput::new(10, &hash_pub_key(b"bob"))],
        )
        .unwrap();
        assert!(!odd.is_coinbase());
    }

    #[test]
    fn test_id_covers_inputs_and_outputs() {
        let bob = hash_pub_key(b"bob");
        let a = Transaction::new(vec![TXInput::new(b"prev", 0)], vec![TXOutput::new(10, &bob)])
            .unwrap();
        let b = Transaction::new(vec![TXInput::new(b"prev", 1)], vec![TXOutput::new(10, &bob)])
            .unwrap();
        let c = Transaction::new(vec![TXInput::new(b"prev", 0)], vec![TXOutput::new(11, &bob)])
            .unwrap();

        assert_eq!(a.get_id().len(), 32);
        assert_ne!(a.get_id(), b.get_id());
        assert_ne!(a.get_id(), c.get_id());

        // Rebuilding from the same parts reproduces the id
        let again = Transaction::new(a.get_vin().to_vec(), a.get_vout().to_vec()).unwrap();
        assert_eq!(a.get_id(), again.get_id());
    }

    #[test]
    fn test_coinbase_ids_are_unique() {
        let address = convert_address(&hash_pub_key(b"miner"));
        let a = Transaction::new_coinbase_tx(&address, 50).unwrap();
        let b = Transaction::new_coinbase_tx(&address, 50).unwrap();
        assert_ne!(a.get_id(), b.get_id());
    }

    #[test]
    fn test_output_lock() {
        let pub_key = b"carol public key";
        let pub_key_hash = hash_pub_key(pub_key);
        let out = TXOutput::to_address(7, &convert_address(&pub_key_hash)).unwrap();
        assert!(out.is_locked_with_key(&pub_key_hash));
        assert!(!out.is_locked_with_key(&hash_pub_key(b"someone else")));
    }

    #[test]
    fn test_invalid_address_cannot_lock_output() {
        assert!(TXOutput::to_address(1, "definitely-not-an-address").is_err());
    }
}
