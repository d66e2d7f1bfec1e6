// Peer side of the transfer protocol: ask a node for a balance, pull its
// ledger, or push ours to it.

use crate::error::{LedgerError, Result};
use crate::network::protocol::{expect_status, read_field, OpCode, Status, TRANSFER_CHUNK_SIZE};
use crate::storage::Ledger;
use log::info;
use std::io::{BufReader, BufWriter, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

const TCP_WRITE_TIMEOUT: u64 = 5000;
const TCP_READ_TIMEOUT: u64 = 60;

fn connect(addr: &str) -> Result<TcpStream> {
    let socket_addr = addr
        .parse::<SocketAddr>()
        .map_err(|e| LedgerError::Network(format!("Invalid address {addr}: {e}")))?;

    let stream =
        TcpStream::connect_timeout(&socket_addr, Duration::from_millis(TCP_WRITE_TIMEOUT))
            .map_err(|e| LedgerError::Network(format!("Failed to connect to {addr}: {e}")))?;

    stream
        .set_write_timeout(Some(Duration::from_millis(TCP_WRITE_TIMEOUT)))
        .map_err(|e| LedgerError::Network(format!("Failed to set write timeout: {e}")))?;
    stream
        .set_read_timeout(Some(Duration::from_secs(TCP_READ_TIMEOUT)))
        .map_err(|e| LedgerError::Network(format!("Failed to set read timeout: {e}")))?;

    Ok(stream)
}

/// Asks the node at `addr` for the balance of `address`.
pub fn request_balance(addr: &str, address: &str) -> Result<u64> {
    let mut stream = connect(addr)?;
    stream.write_all(OpCode::Balance.as_bytes())?;
    stream.write_all(address.as_bytes())?;
    stream.write_all(b"\n")?;
    stream.flush()?;

    let mut reader = BufReader::new(&stream);
    expect_status(&mut reader, Status::BalanceFollows, "balance request")?;
    let text = read_field(&mut reader, 20)?;
    text.parse::<u64>()
        .map_err(|e| LedgerError::Protocol(format!("Bad balance {text:?}: {e}")))
}

/// Pulls the whole ledger of the node at `addr` into `ledger`, replacing it.
pub fn fetch_ledger(addr: &str, ledger: &Ledger) -> Result<u64> {
    let mut stream = connect(addr)?;
    stream.write_all(OpCode::Sync.as_bytes())?;
    stream.flush()?;

    let mut reader = BufReader::with_capacity(TRANSFER_CHUNK_SIZE, &stream);
    expect_status(&mut reader, Status::ChainFollows, "sync request")?;
    let entries = ledger.import_image(&mut reader)?;
    info!("Fetched {entries} ledger records from {addr}");
    Ok(entries)
}

/// Replaces the ledger of the node at `addr` with ours.
pub fn push_ledger(addr: &str, ledger: &Ledger) -> Result<u64> {
    let stream = connect(addr)?;
    let entries = {
        let mut writer = BufWriter::with_capacity(TRANSFER_CHUNK_SIZE, &stream);
        writer.write_all(OpCode::Update.as_bytes())?;
        ledger.export_image(&mut writer)?
    };
    // Half-close so the node sees EOF and answers
    stream.shutdown(Shutdown::Write)?;

    let mut reader = BufReader::new(&stream);
    expect_status(&mut reader, Status::UpdateAccepted, "update request")?;
    info!("Pushed {entries} ledger records to {addr}");
    Ok(entries)
}
