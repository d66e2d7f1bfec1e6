//! Ledger transfer service
//!
//! One TCP listener multiplexes balance queries, whole-ledger downloads
//! (`syn`) and whole-ledger uploads (`upd`).

pub mod client;
pub mod protocol;
pub mod server;

pub use client::{fetch_ledger, push_ledger, request_balance};
pub use protocol::{OpCode, Status};
pub use server::Server;
