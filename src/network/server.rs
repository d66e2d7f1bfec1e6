use crate::error::{LedgerError, Result};
use crate::network::protocol::{
    read_field, write_status, OpCode, Status, MAX_ADDRESS_LEN, OPCODE_LEN, TRANSFER_CHUNK_SIZE,
};
use crate::storage::{ImageSnapshot, Ledger};
use log::{debug, error, info, warn};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const TCP_READ_TIMEOUT: u64 = 60;
const TCP_WRITE_TIMEOUT: u64 = 5000;

/// Serves balance queries and whole-ledger transfers over one TCP listener.
pub struct Server {
    ledger: Arc<Ledger>,
}

impl Server {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    /// Bind to `addr` and serve until the process exits
    pub fn run(&self, addr: &str) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .map_err(|e| LedgerError::Network(format!("Failed to bind to {addr}: {e}")))?;

        info!("Server listening on {addr}");
        self.serve(listener);
        Ok(())
    }

    /// Accept loop. Each connection gets its own thread; whatever happens
    /// there is logged and never reaches this loop.
    pub fn serve(&self, listener: TcpListener) {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let peer_addr = match stream.peer_addr() {
                        Ok(addr) => addr,
                        Err(e) => {
                            error!("Failed to get peer address: {e}");
                            continue;
                        }
                    };

                    let ledger = Arc::clone(&self.ledger);
                    thread::spawn(move || {
                        if let Err(e) = Self::handle_connection(&ledger, &stream, peer_addr) {
                            error!("Error handling connection from {peer_addr}: {e}");
                        }
                        let _ = stream.shutdown(Shutdown::Both);
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {e}");
                }
            }
        }
    }

    fn handle_connection(ledger: &Ledger, stream: &TcpStream, peer_addr: SocketAddr) -> Result<()> {
        stream
            .set_read_timeout(Some(Duration::from_secs(TCP_READ_TIMEOUT)))
            .map_err(|e| LedgerError::Network(format!("Failed to set read timeout: {e}")))?;
        stream
            .set_write_timeout(Some(Duration::from_millis(TCP_WRITE_TIMEOUT)))
            .map_err(|e| LedgerError::Network(format!("Failed to set write timeout: {e}")))?;

        let mut reader = BufReader::with_capacity(TRANSFER_CHUNK_SIZE, stream);
        let mut writer = BufWriter::with_capacity(TRANSFER_CHUNK_SIZE, stream);

        let mut opcode = [0u8; OPCODE_LEN];
        reader
            .read_exact(&mut opcode)
            .map_err(|e| LedgerError::Network(format!("Failed to read opcode: {e}")))?;

        let Some(op) = OpCode::from_bytes(&opcode) else {
            warn!(
                "Invalid opcode {:?} from {peer_addr}, dropping connection",
                String::from_utf8_lossy(&opcode)
            );
            return Ok(());
        };
        info!("Received {op} request from {peer_addr}");

        let mut streaming = false;
        let result = match op {
            OpCode::Balance => Self::handle_balance(ledger, &mut reader, &mut writer),
            OpCode::Sync => ledger.snapshot().and_then(|snapshot| {
                streaming = true;
                Self::handle_sync(snapshot, &mut writer)
            }),
            OpCode::Update => Self::handle_update(ledger, &mut reader, &mut writer),
        };
        if let Err(e) = &result {
            // No status can follow a partly sent image
            if !streaming {
                Self::reply_failure(&mut writer, e);
            }
        }
        result?;

        info!("Completed {op} request from {peer_addr}");
        Ok(())
    }

    fn handle_balance<R: BufRead, W: Write>(
        ledger: &Ledger,
        reader: &mut R,
        writer: &mut W,
    ) -> Result<()> {
        let address = read_field(reader, MAX_ADDRESS_LEN)?;
        let address = address.trim();
        debug!("Requesting balance of {address}");

        let balance = ledger.balance(address)?;
        write_status(writer, Status::BalanceFollows)?;
        writeln!(writer, "{balance}")?;
        writer.flush()?;

        info!("Responded to balance request for {address}: {balance}");
        Ok(())
    }

    // The ledger lock was released once the snapshot was spooled, so a slow
    // peer here holds up nobody else. A failure after 002 shows up at the
    // receiver as an image that ends early.
    fn handle_sync<W: Write>(mut snapshot: ImageSnapshot, writer: &mut W) -> Result<()> {
        write_status(writer, Status::ChainFollows)?;
        let bytes = snapshot.copy_to(writer)?;
        writer.flush()?;
        info!(
            "Sent ledger image with {} records ({bytes} bytes)",
            snapshot.entries()
        );
        Ok(())
    }

    fn handle_update<R: Read, W: Write>(
        ledger: &Ledger,
        reader: &mut R,
        writer: &mut W,
    ) -> Result<()> {
        let entries = ledger.import_image(reader)?;
        write_status(writer, Status::UpdateAccepted)?;
        writer.flush()?;
        info!("Ledger image with {entries} records received successfully");
        Ok(())
    }

    fn reply_failure<W: Write>(writer: &mut W, err: &LedgerError) {
        let status = Status::for_error(err);
        if let Err(e) = write_status(writer, status).and_then(|()| Ok(writer.flush()?)) {
            debug!("Could not send status {} to peer: {e}", status.code());
        }
    }
}
