//! Error handling for the ledger node
//!
//! Every failure a request can hit is one of these variants. Handlers turn
//! them into a wire status code, so nothing escapes a single connection.

use std::fmt;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Error types for ledger operations
#[derive(Debug, Clone)]
pub enum LedgerError {
    /// Address failed base58 decoding or checksum validation
    InvalidAddress(String),
    /// No ledger is present on disk (or no tip has been written yet)
    NotFound(String),
    /// A stored record could not be decoded, or the chain links are broken
    CorruptData(String),
    /// Database-related errors
    Database(String),
    /// Serialization/deserialization errors
    Serialization(String),
    /// File I/O errors
    Io(String),
    /// Network communication errors
    Network(String),
    /// Peer sent something the protocol does not allow
    Protocol(String),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::InvalidAddress(addr) => write!(f, "Invalid address: {addr}"),
            LedgerError::NotFound(msg) => write!(f, "Ledger not found: {msg}"),
            LedgerError::CorruptData(msg) => write!(f, "Corrupt ledger data: {msg}"),
            LedgerError::Database(msg) => write!(f, "Database error: {msg}"),
            LedgerError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            LedgerError::Io(msg) => write!(f, "I/O error: {msg}"),
            LedgerError::Network(msg) => write!(f, "Network error: {msg}"),
            LedgerError::Protocol(msg) => write!(f, "Protocol error: {msg}"),
        }
    }
}

impl std::error::Error for LedgerError {}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::Io(err.to_string())
    }
}

impl From<sled::Error> for LedgerError {
    fn from(err: sled::Error) -> Self {
        LedgerError::Database(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for LedgerError {
    fn from(err: bincode::error::EncodeError) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for LedgerError {
    fn from(err: bincode::error::DecodeError) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "peer went away");
        let err: LedgerError = io.into();
        assert!(matches!(err, LedgerError::Io(_)));
        assert!(err.to_string().contains("peer went away"));
    }

    #[test]
    fn test_display_names_the_failure() {
        let err = LedgerError::InvalidAddress("1abc".to_string());
        assert_eq!(err.to_string(), "Invalid address: 1abc");
    }
}
