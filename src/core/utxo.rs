//! Unspent output resolution.
//!
//! Spend information for an output can sit in any later block, so resolution
//! takes two full walks: the first collects every `(txid, index)` consumed by
//! an input, the second keeps outputs whose index never shows up there.
//! Outputs are tracked per index; spending output 0 of a transaction leaves
//! output 1 of the same transaction untouched.

use crate::core::{ChainWalker, TXOutput, Transaction};
use crate::error::{LedgerError, Result};
use crate::storage::LedgerStore;
use crate::wallet::pub_key_hash_from_address;
use data_encoding::HEXLOWER;
use log::debug;
use std::collections::{HashMap, HashSet};

/// txid_hex -> output indices consumed by some input
pub type SpentOutputs = HashMap<String, HashSet<i64>>;

pub struct UtxoResolver<'a> {
    store: &'a dyn LedgerStore,
}

impl<'a> UtxoResolver<'a> {
    pub fn new(store: &'a dyn LedgerStore) -> UtxoResolver<'a> {
        UtxoResolver { store }
    }

    /// First pass: every output referenced by a non-coinbase input.
    pub fn spent_outputs(&self) -> Result<SpentOutputs> {
        let mut spent_txos: SpentOutputs = HashMap::new();

        for block in ChainWalker::new(self.store)? {
            for tx in block?.get_transactions() {
                if tx.is_coinbase() {
                    continue;
                }
                for txin in tx.get_vin() {
                    spent_txos
                        .entry(HEXLOWER.encode(txin.get_txid()))
                        .or_default()
                        .insert(txin.get_vout());
                }
            }
        }
        Ok(spent_txos)
    }

    /// Second pass: calls `visit` for each unspent output locked to `pub_key_hash`.
    fn scan_unspent<F>(&self, pub_key_hash: &[u8], mut visit: F) -> Result<()>
    where
        F: FnMut(&Transaction, usize, &TXOutput) -> bool,
    {
        let spent_txos = self.spent_outputs()?;

        for block in ChainWalker::new(self.store)? {
            let block = block?;
            for tx in block.get_transactions() {
                let spent = spent_txos.get(&HEXLOWER.encode(tx.get_id()));
                for (idx, out) in tx.get_vout().iter().enumerate() {
                    if spent.is_some_and(|outs| outs.contains(&(idx as i64))) {
                        continue;
                    }
                    if out.is_locked_with_key(pub_key_hash) && !visit(tx, idx, out) {
                        return Ok(());
                    }
                }
            }
        }
        Ok(())
    }

    pub fn find_utxo(&self, pub_key_hash: &[u8]) -> Result<Vec<TXOutput>> {
        let mut utxos = vec![];
        self.scan_unspent(pub_key_hash, |_, _, out| {
            utxos.push(out.clone());
            true
        })?;
        Ok(utxos)
    }

    /// Transactions holding at least one unspent output for `pub_key_hash`, each listed once.
    pub fn find_unspent_transactions(&self, pub_key_hash: &[u8]) -> Result<Vec<Transaction>> {
        let mut seen: HashSet<Vec<u8>> = HashSet::new();
        let mut unspent_txs = vec![];
        self.scan_unspent(pub_key_hash, |tx, _, _| {
            if seen.insert(tx.get_id().to_vec()) {
                unspent_txs.push(tx.clone());
            }
            true
        })?;
        Ok(unspent_txs)
    }

    /// Gathers unspent outputs until `amount` is covered or none are left.
    pub fn find_spendable_outputs(
        &self,
        pub_key_hash: &[u8],
        amount: u64,
    ) -> Result<(u64, HashMap<String, Vec<usize>>)> {
        let mut unspent_outputs: HashMap<String, Vec<usize>> = HashMap::new();
        let mut accumulated = 0u64;
        let mut overflow = None;
        self.scan_unspent(pub_key_hash, |tx, idx, out| {
            match add_value(accumulated, out) {
                Ok(total) => accumulated = total,
                Err(e) => {
                    overflow = Some(e);
                    return false;
                }
            }
            unspent_outputs
                .entry(HEXLOWER.encode(tx.get_id()))
                .or_default()
                .push(idx);
            accumulated < amount
        })?;
        match overflow {
            Some(e) => Err(e),
            None => Ok((accumulated, unspent_outputs)),
        }
    }
}

// Values come from peer-supplied ledgers; a sum that would wrap is corrupt data
fn add_value(total: u64, out: &TXOutput) -> Result<u64> {
    total.checked_add(out.get_value()).ok_or_else(|| {
        LedgerError::CorruptData(format!(
            "Output values overflow: {total} + {}",
            out.get_value()
        ))
    })
}

/// Spendable balance of a base58check address.
///
/// The checksum is verified before any chain access; an address that owns
/// nothing has a balance of zero.
pub fn get_balance(store: &dyn LedgerStore, address: &str) -> Result<u64> {
    let pub_key_hash = pub_key_hash_from_address(address)?;
    let utxos = UtxoResolver::new(store).find_utxo(&pub_key_hash)?;
    let balance = utxos.iter().try_fold(0u64, add_value)?;
    debug!("Balance of {address}: {balance} across {} outputs", utxos.len());
    Ok(balance)
}
