use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "ledger-node")]
pub struct Opt {
    #[arg(long = "ledger", global = true, help = "Ledger directory (overrides LEDGER_PATH)")]
    pub ledger: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "startnode", about = "Serve balance queries and ledger transfers")]
    StartNode {
        #[arg(long = "addr", help = "Listen address (overrides NODE_ADDRESS)")]
        addr: Option<String>,
    },
    #[command(
        name = "getbalance",
        about = "Get the balance of an address from the local ledger"
    )]
    GetBalance {
        #[arg(help = "The wallet address")]
        address: String,
    },
    #[command(name = "remotebalance", about = "Ask a node for the balance of an address")]
    RemoteBalance {
        #[arg(help = "Node address, e.g. 127.0.0.1:9888")]
        node: String,
        #[arg(help = "The wallet address")]
        address: String,
    },
    #[command(
        name = "fetchledger",
        about = "Replace the local ledger with a copy pulled from a node"
    )]
    FetchLedger {
        #[arg(help = "Node address, e.g. 127.0.0.1:9888")]
        node: String,
    },
    #[command(name = "pushledger", about = "Replace a node's ledger with the local one")]
    PushLedger {
        #[arg(help = "Node address, e.g. 127.0.0.1:9888")]
        node: String,
    },
    #[command(name = "printchain", about = "Print all blocks in the ledger")]
    Printchain,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_startnode_with_addr() {
        let opt = Opt::try_parse_from(["ledger-node", "startnode", "--addr", "127.0.0.1:9000"])
            .unwrap();
        assert!(matches!(
            opt.command,
            Command::StartNode { addr: Some(ref a) } if a == "127.0.0.1:9000"
        ));
    }

    #[test]
    fn test_parse_global_ledger_flag() {
        let opt = Opt::try_parse_from([
            "ledger-node",
            "getbalance",
            "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa",
            "--ledger",
            "/tmp/ledger",
        ])
        .unwrap();
        assert_eq!(opt.ledger, Some(PathBuf::from("/tmp/ledger")));
    }
}
