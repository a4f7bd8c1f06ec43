//! Nonce Wallet - submit transactions from one key without nonce collisions
//!
//! Reads the wallet and node settings from `NONCE_WALLET_CONFIG` (or
//! `--config`) and runs a single command against the configured node.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ethers::types::TransactionRequest;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use nonce_wallet::{
    metrics, EthersChainClient, LocalSigner, PrivateKey, SenderConfig, Settings,
    TransactionSender,
};

#[derive(Parser, Debug)]
#[command(name = "nonce-wallet")]
#[command(about = "Sign and submit Ethereum transactions with serialized nonce assignment")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to $NONCE_WALLET_CONFIG or config/default.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print Prometheus metrics after the command finishes
    #[arg(long)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the wallet address
    Address,
    /// Print the pending transaction count
    Nonce,
    /// Sign and broadcast a transaction given as JSON-RPC style JSON
    Send { params: String },
    /// Execute a read-only call given as JSON-RPC style JSON
    Call { params: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging();

    let cli = Cli::parse();

    info!("Starting Nonce Wallet v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    info!(
        "Loaded configuration with {} RPC endpoint(s), chain id {}",
        settings.chain.rpc_urls.len(),
        settings.wallet.chain_id
    );

    let key: PrivateKey = settings
        .wallet
        .resolve_private_key()?
        .parse()
        .context("Invalid wallet private key")?;

    let client = EthersChainClient::new(&settings.chain)?;
    let sender = TransactionSender::new(
        key,
        Arc::new(LocalSigner::new()),
        Arc::new(client),
        SenderConfig::from(&settings),
    )?;
    info!("Wallet address: {:?}", sender.address());

    match cli.command {
        Command::Address => println!("{:?}", sender.address()),
        Command::Nonce => println!("{}", sender.next_nonce().await?),
        Command::Send { params } => {
            let tx = parse_request(&params)?;
            let tx_hash = sender.send(tx).await?;
            println!("{:?}", tx_hash);
        }
        Command::Call { params } => {
            let tx = parse_request(&params)?;
            let result = sender.call(&tx).await?;
            println!("{}", result);
        }
    }

    if cli.metrics {
        print!("{}", metrics::encode());
    }

    Ok(())
}

fn parse_request(params: &str) -> Result<TransactionRequest> {
    serde_json::from_str(params).context("Failed to parse transaction JSON")
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,nonce_wallet=debug,hyper=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_send() {
        let cli = Cli::parse_from([
            "nonce-wallet",
            "--metrics",
            "send",
            r#"{"to":"0x0000000000000000000000000000000000000001"}"#,
        ]);
        assert!(cli.metrics);
        assert!(matches!(cli.command, Command::Send { .. }));
    }

    #[test]
    fn test_parse_request_json() {
        let tx = parse_request(
            r#"{"to":"0x3535353535353535353535353535353535353535","value":"0x3e8","gas":"0x5208"}"#,
        )
        .unwrap();
        assert_eq!(tx.value, Some(1000u64.into()));
        assert!(tx.nonce.is_none());
        assert!(parse_request("not json").is_err());
    }
}
