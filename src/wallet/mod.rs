//! Address encoding
//!
//! Decodes and validates base58check addresses and derives the public-key
//! hash that outputs are locked to. Key generation and signing live elsewhere.

pub mod address;

pub use address::{
    convert_address, hash_pub_key, pub_key_hash_from_address, validate_address,
    ADDRESS_CHECK_SUM_LEN,
};
