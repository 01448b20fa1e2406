//! docanchor-client binary: store and look up document hashes

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use docanchor_client::{sha256_file, DocAnchorClient};
use docanchor_core::RecordKey;

#[derive(Parser, Debug)]
#[command(name = "docanchor-client")]
#[command(about = "Store and fetch document hashes through a docanchor server")]
struct Args {
    /// Server base URL
    #[arg(long, default_value = "http://127.0.0.1:3000")]
    server: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 90)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store a hash, given directly or computed from a file
    Store {
        #[arg(long)]
        hospital_id: i64,
        #[arg(long)]
        report_id: i64,
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        hash: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Print the hash stored for a record
    Fetch {
        #[arg(long)]
        hospital_id: i64,
        #[arg(long)]
        report_id: i64,
    },
    /// Check that a file matches the stored hash
    Verify {
        #[arg(long)]
        hospital_id: i64,
        #[arg(long)]
        report_id: i64,
        file: PathBuf,
    },
    /// Print the SHA-256 of a file
    Hash { file: PathBuf },
    /// Print the server identity and program
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let client = DocAnchorClient::with_timeout(&args.server, Duration::from_secs(args.timeout_secs))?;

    match args.command {
        Command::Store {
            hospital_id,
            report_id,
            hash,
            file,
        } => {
            let hash = match (hash, file) {
                (Some(hash), _) => hash,
                (None, Some(file)) => sha256_file(&file)?,
                (None, None) => anyhow::bail!("--hash or --file is required"),
            };
            let key = RecordKey::new(hospital_id, report_id);
            client.store(key, &hash).await?;
            tracing::info!(%key, hash = %hash, "Stored");
        }
        Command::Fetch {
            hospital_id,
            report_id,
        } => {
            let key = RecordKey::new(hospital_id, report_id);
            match client.fetch_hash(key).await? {
                Some(hash) => println!("{}", hash),
                None => anyhow::bail!("no record for {}", key),
            }
        }
        Command::Verify {
            hospital_id,
            report_id,
            file,
        } => {
            let key = RecordKey::new(hospital_id, report_id);
            let local = sha256_file(&file)?;
            match client.fetch_hash(key).await? {
                Some(stored) if stored == local => println!("match {}", local),
                Some(stored) => {
                    anyhow::bail!("mismatch: file {} but ledger has {}", local, stored)
                }
                None => anyhow::bail!("no record for {}", key),
            }
        }
        Command::Hash { file } => {
            println!("{}", sha256_file(&file)?);
        }
        Command::Health => {
            let health = client.health().await?;
            println!("status:        {}", health.status);
            println!("identity:      {}", health.identity);
            println!("program:       {}", health.program_id);
            println!("slot capacity: {}", health.slot_capacity);
        }
    }

    Ok(())
}
