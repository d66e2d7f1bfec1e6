//! Ledger image: the whole store as one byte stream.
//!
//! This is what `syn` sends and `upd` receives. Layout:
//!
//! ```text
//! "LDGR" | version (1 byte) | Entry{key, value}* | End{entries}
//! ```
//!
//! Records are bincode-encoded in key order, so two stores with the same
//! contents always export the same bytes. Loading checks the framing only;
//! it never checks that the records form a valid chain.

use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

pub const IMAGE_MAGIC: &[u8; 4] = b"LDGR";
pub const IMAGE_VERSION: u8 = 1;

// Largest single record accepted from a peer
const MAX_RECORD_LEN: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub enum ImageRecord {
    Entry { key: Vec<u8>, value: Vec<u8> },
    End { entries: u64 },
}

/// Writes an image of `entries` to `writer`, returning how many were written.
pub fn write_image<W, I>(writer: &mut W, entries: I) -> Result<u64>
where
    W: Write,
    I: IntoIterator<Item = Result<(Vec<u8>, Vec<u8>)>>,
{
    let config = bincode::config::standard();
    writer.write_all(IMAGE_MAGIC)?;
    writer.write_all(&[IMAGE_VERSION])?;

    let mut count = 0u64;
    for entry in entries {
        let (key, value) = entry?;
        bincode::encode_into_std_write(ImageRecord::Entry { key, value }, writer, config)?;
        count += 1;
    }
    bincode::encode_into_std_write(ImageRecord::End { entries: count }, writer, config)?;
    writer.flush()?;
    Ok(count)
}

/// Reads an image from `reader`, handing each record to `sink`.
///
/// Fails if the stream ends before the `End` record or the entry count
/// disagrees with it; anything already handed to `sink` must then be discarded.
pub fn read_image<R, F>(reader: &mut R, mut sink: F) -> Result<u64>
where
    R: Read,
    F: FnMut(&[u8], &[u8]) -> Result<()>,
{
    let config = bincode::config::standard().with_limit::<MAX_RECORD_LEN>();
    let mut header = [0u8; 5];
    reader
        .read_exact(&mut header)
        .map_err(|e| LedgerError::Protocol(format!("Ledger image header unreadable: {e}")))?;
    if &header[..4] != IMAGE_MAGIC {
        return Err(LedgerError::Protocol("Not a ledger image".to_string()));
    }
    if header[4] != IMAGE_VERSION {
        return Err(LedgerError::Protocol(format!(
            "Unsupported ledger image version {}",
            header[4]
        )));
    }

    let mut count = 0u64;
    loop {
        let record: ImageRecord = bincode::decode_from_std_read(reader, config)
            .map_err(|e| LedgerError::Protocol(format!("Ledger image truncated: {e}")))?;
        match record {
            ImageRecord::Entry { key, value } => {
                sink(&key, &value)?;
                count += 1;
            }
            ImageRecord::End { entries } if entries == count => return Ok(count),
            ImageRecord::End { entries } => {
                return Err(LedgerError::Protocol(format!(
                    "Ledger image announced {entries} entries but carried {count}"
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample() -> Vec<(Vec<u8>, Vec<u8>)> {
        vec![
            (b"a".to_vec(), b"first".to_vec()),
            (b"b".to_vec(), vec![0u8; 5000]),
            (b"tip_block_hash".to_vec(), b"a".to_vec()),
        ]
    }

    fn encode(entries: Vec<(Vec<u8>, Vec<u8>)>) -> Vec<u8> {
        let mut bytes = vec![];
        write_image(&mut bytes, entries.into_iter().map(Ok)).unwrap();
        bytes
    }

    #[test]
    fn test_image_carries_every_entry() {
        let bytes = encode(sample());
        assert!(bytes.starts_with(IMAGE_MAGIC));

        let mut loaded = vec![];
        let count = read_image(&mut Cursor::new(bytes), |k, v| {
            loaded.push((k.to_vec(), v.to_vec()));
            Ok(())
        })
        .unwrap();
        assert_eq!(count, 3);
        assert_eq!(loaded, sample());
    }

    #[test]
    fn test_same_entries_same_bytes() {
        assert_eq!(encode(sample()), encode(sample()));
    }

    #[test]
    fn test_truncated_image_is_rejected() {
        let bytes = encode(sample());
        let cut = bytes[..bytes.len() - 2].to_vec();
        let result = read_image(&mut Cursor::new(cut), |_, _| Ok(()));
        assert!(matches!(result, Err(LedgerError::Protocol(_))));
    }

    #[test]
    fn test_foreign_bytes_are_rejected() {
        let result = read_image(&mut Cursor::new(b"SQLite format 3".to_vec()), |_, _| Ok(()));
        assert!(matches!(result, Err(LedgerError::Protocol(_))));
    }

    #[test]
    fn test_empty_image() {
        let bytes = encode(vec![]);
        assert_eq!(read_image(&mut Cursor::new(bytes), |_, _| Ok(())).unwrap(), 0);
    }
}
