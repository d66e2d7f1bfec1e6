//! Core ledger functionality
//!
//! Blocks and transactions, the backward chain walk, and unspent output
//! resolution on top of it.

pub mod block;
pub mod chain;
pub mod transaction;
pub mod utxo;

pub use block::Block;
pub use chain::ChainWalker;
pub use transaction::{TXInput, TXOutput, Transaction, COINBASE_VOUT};
pub use utxo::{get_balance, SpentOutputs, UtxoResolver};
