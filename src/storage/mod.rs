//! Data storage and persistence
//!
//! The sled-backed block store, its in-memory twin for tests, the ledger
//! image used to move a whole store between nodes, and the shared `Ledger`
//! that serializes replacement against readers.

pub mod image;
pub mod ledger;
pub mod memory;
pub mod store;

pub use image::{read_image, write_image, ImageRecord};
pub use ledger::{ImageSnapshot, Ledger};
pub use memory::MemoryStore;
pub use store::{LedgerStore, SledStore, BLOCKS_TREE, TIP_BLOCK_HASH_KEY};
