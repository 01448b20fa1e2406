//! docanchor-server binary
//!
//! Run with:
//! ```bash
//! cargo run -p docanchor-server -- --program-keypair ./dist/program/hash-keypair.json
//! ```

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use docanchor_core::ServiceConfig;
use docanchor_server::metrics::init_prometheus_recorder;
use docanchor_server::{LedgerKind, ServerBuilder};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LedgerArg {
    Rpc,
    Memory,
}

#[derive(Parser, Debug)]
#[command(name = "docanchor-server")]
#[command(about = "Anchor document hashes in Solana accounts")]
struct Args {
    /// JSON config file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Program keypair (or base58 program id) file
    #[arg(long)]
    program_keypair: Option<PathBuf>,

    /// Identity keypair file, created if missing
    #[arg(long)]
    identity_keypair: Option<PathBuf>,

    /// Solana JSON-RPC URL
    #[arg(long)]
    rpc_url: Option<String>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    /// Ledger backend
    #[arg(long, value_enum, default_value = "rpc")]
    ledger: LedgerArg,

    /// Startup airdrop in lamports (0 disables)
    #[arg(long)]
    airdrop_lamports: Option<u64>,

    /// Slot size in bytes
    #[arg(long)]
    slot_capacity: Option<usize>,

    /// Don't install the Prometheus recorder
    #[arg(long)]
    no_metrics: bool,
}

fn build_config(args: &Args) -> anyhow::Result<ServiceConfig> {
    let mut config = match (&args.config, &args.program_keypair) {
        (Some(path), _) => ServiceConfig::load(path)?,
        (None, Some(program)) => ServiceConfig::new(program),
        (None, None) => anyhow::bail!("either --config or --program-keypair is required"),
    };

    if let Some(program) = &args.program_keypair {
        config.program_keypair = program.clone();
    }
    if let Some(identity) = &args.identity_keypair {
        config.identity_keypair = Some(identity.clone());
    }
    if let Some(url) = &args.rpc_url {
        config.rpc_url = url.clone();
    }
    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(lamports) = args.airdrop_lamports {
        config.airdrop_lamports = lamports;
    }
    if let Some(capacity) = args.slot_capacity {
        config.slot_capacity = capacity;
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("docanchor_server=info".parse()?)
                .add_directive("docanchor_store=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = build_config(&args)?;

    let kind = match args.ledger {
        LedgerArg::Rpc => LedgerKind::Rpc,
        LedgerArg::Memory => LedgerKind::Memory,
    };

    let mut builder = ServerBuilder::new(config).ledger_kind(kind);
    if !args.no_metrics {
        builder = builder.metrics(init_prometheus_recorder()?);
    }

    let server = builder.build().await?;
    tracing::info!(addr = %server.addr(), "Server ready");
    server.run().await?;

    Ok(())
}
