//! # Ledger Node
//!
//! A single-node ledger: an append-only chain of blocks holding value
//! transfers, balance lookups that walk that chain for unspent outputs, and
//! a small TCP protocol that lets a peer pull or replace the whole ledger.
//!
//! ## Layout
//! - `core/`: blocks, transactions, the backward chain walk and UTXO resolution
//! - `storage/`: the sled block store, an in-memory store, ledger images and
//!   the shared `Ledger` that guards whole-store replacement
//! - `network/`: the `bal` / `syn` / `upd` protocol, server and client helpers
//! - `wallet/`: base58check address decoding and public-key hashing
//! - `config/`: listen address and ledger location
//! - `utils/`: hashing, base58 and bincode helpers
//! - `cli/`: command-line parsing for the node binary
//!
//! ## Where to start
//! 1. `core/utxo.rs` for how a balance is computed
//! 2. `network/server.rs` for the per-connection state machine
//! 3. `storage/ledger.rs` for how an upload replaces the ledger

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod network;
pub mod storage;
pub mod utils;
pub mod wallet;

// Re-export commonly used types for convenience
pub use cli::{Command, Opt};
pub use config::{Config, GLOBAL_CONFIG};
pub use core::{
    get_balance, Block, ChainWalker, TXInput, TXOutput, Transaction, UtxoResolver,
};
pub use error::{LedgerError, Result};
pub use network::{fetch_ledger, push_ledger, request_balance, OpCode, Server, Status};
pub use storage::{Ledger, LedgerStore, MemoryStore, SledStore};
pub use utils::{base58_decode, base58_encode, ripemd160_digest, sha256_digest};
pub use wallet::{
    convert_address, hash_pub_key, pub_key_hash_from_address, validate_address,
    ADDRESS_CHECK_SUM_LEN,
};
