// Entry point for the ledger node: serve the transfer protocol or run a one-off client command
use clap::Parser;
use data_encoding::HEXLOWER;
use ledger_node::{
    convert_address, fetch_ledger, get_balance, hash_pub_key, push_ledger, request_balance,
    ChainWalker, Command, Ledger, Opt, Server, GLOBAL_CONFIG,
};
use log::{error, LevelFilter};
use std::process;
use std::sync::Arc;

fn main() {
    // Info by default; RUST_LOG still wins when set
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let opt = Opt::parse();
    if let Some(path) = opt.ledger {
        GLOBAL_CONFIG.set_ledger_path(path);
    }

    if let Err(e) = run_command(opt.command) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    let ledger_path = GLOBAL_CONFIG.get_ledger_path();

    match command {
        Command::StartNode { addr } => {
            if let Some(addr) = addr {
                GLOBAL_CONFIG.set_node_addr(addr);
            }
            let ledger = Arc::new(Ledger::open(&ledger_path)?);
            let server = Server::new(ledger);
            server
                .run(&GLOBAL_CONFIG.get_node_addr())
                .map_err(|e| format!("Server error: {e}"))?
        }
        Command::GetBalance { address } => {
            let ledger = Ledger::open(&ledger_path)?;
            let balance = ledger.with_store(|store| get_balance(store, &address))?;
            println!("Balance of {address}: {balance}");
        }
        Command::RemoteBalance { node, address } => {
            let balance = request_balance(&node, &address)?;
            println!("Balance of {address} at {node}: {balance}");
        }
        Command::FetchLedger { node } => {
            let ledger = Ledger::open(&ledger_path)?;
            let entries = fetch_ledger(&node, &ledger)?;
            println!("Fetched {entries} records from {node}");
        }
        Command::PushLedger { node } => {
            let ledger = Ledger::open(&ledger_path)?;
            let entries = push_ledger(&node, &ledger)?;
            println!("Pushed {entries} records to {node}");
        }
        Command::Printchain => {
            let ledger = Ledger::open(&ledger_path)?;
            ledger.with_store(|store| {
                for block in ChainWalker::new(store)? {
                    let block = block?;
                    println!("Pre block hash: {}", HEXLOWER.encode(block.get_pre_block_hash()));
                    println!("Cur block hash: {}", block.get_hash_hex());
                    println!("Cur block Timestamp: {}", block.get_timestamp());
                    println!("Nonce: {}", block.get_nonce());
                    if !block.get_peer_hints().is_empty() {
                        println!("Peers: {}", block.get_peer_hints().join(", "));
                    }

                    for tx in block.get_transactions() {
                        println!("- Transaction txid_hex: {}", HEXLOWER.encode(tx.get_id()));

                        if !tx.is_coinbase() {
                            for input in tx.get_vin() {
                                let from = convert_address(&hash_pub_key(input.get_pub_key()));
                                println!(
                                    "-- Input txid = {}, vout = {}, from = {}, signature = {}",
                                    HEXLOWER.encode(input.get_txid()),
                                    input.get_vout(),
                                    from,
                                    HEXLOWER.encode(input.get_signature()),
                                )
                            }
                        }
                        for output in tx.get_vout() {
                            let to = convert_address(output.get_pub_key_hash());
                            println!("-- Output value = {}, to = {}", output.get_value(), to)
                        }
                    }
                    println!()
                }
                Ok(())
            })?;
        }
    }
    Ok(())
}
