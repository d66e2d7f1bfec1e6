//! Wire format of the ledger transfer service.
//!
//! A request is a 3-byte ASCII opcode followed by its payload. Every answer
//! starts with a 4-byte status line, three ASCII digits and `\n`:
//!
//! | opcode | payload                            | success reply                   |
//! |--------|------------------------------------|---------------------------------|
//! | `bal`  | address, ended by `\n` or EOF      | `001\n` then decimal balance `\n` |
//! | `syn`  | none                               | `002\n` then a ledger image to EOF |
//! | `upd`  | ledger image until the peer half-closes | `003\n`                    |
//!
//! Unknown opcodes get no reply at all; the connection is just dropped.
//!
//! A `bal` address sent without `\n` is only complete at EOF. A peer that
//! omits the newline must half-close its write side, otherwise the node
//! waits out its read timeout and answers `105`.

use crate::error::{LedgerError, Result};
use std::fmt;
use std::io::{BufRead, Read, Write};

pub const OPCODE_LEN: usize = 3;
pub const STATUS_LEN: usize = 4;
pub const MAX_ADDRESS_LEN: usize = 128;
/// Buffer size for streaming ledger images in either direction.
pub const TRANSFER_CHUNK_SIZE: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Balance,
    Sync,
    Update,
}

impl OpCode {
    pub fn from_bytes(bytes: &[u8; OPCODE_LEN]) -> Option<OpCode> {
        match bytes {
            b"bal" => Some(OpCode::Balance),
            b"syn" => Some(OpCode::Sync),
            b"upd" => Some(OpCode::Update),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> &'static [u8; OPCODE_LEN] {
        match self {
            OpCode::Balance => b"bal",
            OpCode::Sync => b"syn",
            OpCode::Update => b"upd",
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.as_bytes()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    BalanceFollows,
    ChainFollows,
    UpdateAccepted,
    InvalidAddress,
    LedgerNotFound,
    CorruptLedger,
    MalformedRequest,
    TransferFailed,
}

impl Status {
    pub fn code(&self) -> &'static str {
        match self {
            Status::BalanceFollows => "001",
            Status::ChainFollows => "002",
            Status::UpdateAccepted => "003",
            Status::InvalidAddress => "101",
            Status::LedgerNotFound => "102",
            Status::CorruptLedger => "103",
            Status::MalformedRequest => "104",
            Status::TransferFailed => "105",
        }
    }

    pub fn from_code(code: &str) -> Option<Status> {
        let status = match code {
            "001" => Status::BalanceFollows,
            "002" => Status::ChainFollows,
            "003" => Status::UpdateAccepted,
            "101" => Status::InvalidAddress,
            "102" => Status::LedgerNotFound,
            "103" => Status::CorruptLedger,
            "104" => Status::MalformedRequest,
            "105" => Status::TransferFailed,
            _ => return None,
        };
        Some(status)
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Status::BalanceFollows | Status::ChainFollows | Status::UpdateAccepted
        )
    }

    /// The status a peer sees for a failed request.
    pub fn for_error(err: &LedgerError) -> Status {
        match err {
            LedgerError::InvalidAddress(_) => Status::InvalidAddress,
            LedgerError::NotFound(_) => Status::LedgerNotFound,
            LedgerError::CorruptData(_) => Status::CorruptLedger,
            LedgerError::Protocol(_) => Status::MalformedRequest,
            LedgerError::Database(_)
            | LedgerError::Serialization(_)
            | LedgerError::Io(_)
            | LedgerError::Network(_) => Status::TransferFailed,
        }
    }

    /// Turns a failure status received from a peer back into an error.
    pub fn into_error(self, context: &str) -> LedgerError {
        let msg = format!("{context}: peer answered {}", self.code());
        match self {
            Status::InvalidAddress => LedgerError::InvalidAddress(msg),
            Status::LedgerNotFound => LedgerError::NotFound(msg),
            Status::CorruptLedger => LedgerError::CorruptData(msg),
            Status::MalformedRequest => LedgerError::Protocol(msg),
            _ => LedgerError::Network(msg),
        }
    }
}

pub fn write_status<W: Write>(writer: &mut W, status: Status) -> Result<()> {
    writer.write_all(status.code().as_bytes())?;
    writer.write_all(b"\n")?;
    Ok(())
}

pub fn read_status<R: Read>(reader: &mut R) -> Result<Status> {
    let mut line = [0u8; STATUS_LEN];
    reader
        .read_exact(&mut line)
        .map_err(|e| LedgerError::Network(format!("No status from peer: {e}")))?;
    if line[3] != b'\n' {
        return Err(LedgerError::Protocol("Status line not terminated".to_string()));
    }
    let code = std::str::from_utf8(&line[..3])
        .map_err(|_| LedgerError::Protocol("Status code is not ASCII".to_string()))?;
    Status::from_code(code)
        .ok_or_else(|| LedgerError::Protocol(format!("Unknown status code {code}")))
}

/// Reads a status line and fails unless it is `expected`.
pub fn expect_status<R: Read>(reader: &mut R, expected: Status, context: &str) -> Result<()> {
    let status = read_status(reader)?;
    if status == expected {
        Ok(())
    } else if status.is_success() {
        Err(LedgerError::Protocol(format!(
            "{context}: expected {} but peer answered {}",
            expected.code(),
            status.code()
        )))
    } else {
        Err(status.into_error(context))
    }
}

/// Reads one newline- or EOF-terminated field of at most `max_len` bytes.
pub fn read_field<R: BufRead>(reader: &mut R, max_len: usize) -> Result<String> {
    let mut buf = Vec::new();
    reader
        .take(max_len as u64 + 1)
        .read_until(b'\n', &mut buf)?;

    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    } else if buf.len() > max_len {
        return Err(LedgerError::Protocol(format!(
            "Field longer than {max_len} bytes"
        )));
    }

    String::from_utf8(buf).map_err(|_| LedgerError::Protocol("Field is not UTF-8".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_opcodes() {
        assert_eq!(OpCode::from_bytes(b"bal"), Some(OpCode::Balance));
        assert_eq!(OpCode::from_bytes(b"syn"), Some(OpCode::Sync));
        assert_eq!(OpCode::from_bytes(b"upd"), Some(OpCode::Update));
        assert_eq!(OpCode::from_bytes(b"xyz"), None);
        assert_eq!(OpCode::Sync.to_string(), "syn");
    }

    #[test]
    fn test_sync_status_line_is_002() {
        let mut out = vec![];
        write_status(&mut out, Status::ChainFollows).unwrap();
        assert_eq!(out, b"002\n");
        assert_eq!(read_status(&mut Cursor::new(out)).unwrap(), Status::ChainFollows);
    }

    #[test]
    fn test_every_status_code_parses_back() {
        for status in [
            Status::BalanceFollows,
            Status::ChainFollows,
            Status::UpdateAccepted,
            Status::InvalidAddress,
            Status::LedgerNotFound,
            Status::CorruptLedger,
            Status::MalformedRequest,
            Status::TransferFailed,
        ] {
            assert_eq!(Status::from_code(status.code()), Some(status));
        }
    }

    #[test]
    fn test_error_statuses() {
        let err = LedgerError::InvalidAddress("x".to_string());
        assert_eq!(Status::for_error(&err), Status::InvalidAddress);
        assert!(!Status::InvalidAddress.is_success());
        assert!(matches!(
            Status::LedgerNotFound.into_error("balance"),
            LedgerError::NotFound(_)
        ));
    }

    #[test]
    fn test_expect_status() {
        let mut ok = Cursor::new(b"003\n".to_vec());
        assert!(expect_status(&mut ok, Status::UpdateAccepted, "update").is_ok());

        // A success code meant for another request is a protocol error
        let mut wrong = Cursor::new(b"001\n".to_vec());
        assert!(matches!(
            expect_status(&mut wrong, Status::ChainFollows, "sync"),
            Err(LedgerError::Protocol(_))
        ));

        let mut failed = Cursor::new(b"103\n".to_vec());
        assert!(matches!(
            expect_status(&mut failed, Status::BalanceFollows, "balance"),
            Err(LedgerError::CorruptData(_))
        ));
    }

    #[test]
    fn test_read_field_terminators() {
        let mut newline = Cursor::new(b"1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa\nrest".to_vec());
        assert_eq!(
            read_field(&mut newline, MAX_ADDRESS_LEN).unwrap(),
            "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa"
        );

        let mut eof = Cursor::new(b"abc".to_vec());
        assert_eq!(read_field(&mut eof, MAX_ADDRESS_LEN).unwrap(), "abc");

        let mut crlf = Cursor::new(b"abc\r\n".to_vec());
        assert_eq!(read_field(&mut crlf, MAX_ADDRESS_LEN).unwrap(), "abc");
    }

    #[test]
    fn test_read_field_too_long() {
        let mut long = Cursor::new(vec![b'a'; MAX_ADDRESS_LEN + 10]);
        assert!(matches!(
            read_field(&mut long, MAX_ADDRESS_LEN),
            Err(LedgerError::Protocol(_))
        ));
    }
}
