//! Configuration management
//!
//! Listen address and ledger location for the node process, taken from
//! the environment with CLI overrides applied in `main`.

pub mod settings;

pub use settings::{Config, GLOBAL_CONFIG};
