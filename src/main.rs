mod counter;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::debug;
use serde_json::Value;
use stowage_server::persistence::PersistenceBridge;
use stowage_server::store::{DurableStore, FileStore, StoreConfig};
use stowage_utils::PersistedValue;

use crate::counter::CounterProgram;

/// Stowage - durable single-slot persistence bridge
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct CliArgs {
    /// Directory holding the persisted slot (default: $STOWAGE_DATA_DIR, then the user data dir)
    #[clap(long)]
    data_dir: Option<PathBuf>,

    /// Enable verbose debug logging
    #[clap(short, long)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the raw slot content, or `null` when nothing is stored
    Show,
    /// Persist a JSON value and print its acknowledgment
    Set {
        /// JSON text, e.g. '{"count":1}'
        value: String,
    },
    /// Remove the slot and print the acknowledgment
    Clear,
    /// Run the counter demo: load the stored count and bump it
    Counter {
        #[clap(long, default_value = "1")]
        steps: u64,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    if args.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_target(false)
            .init();
    }

    let config = match args.data_dir {
        Some(dir) => StoreConfig::default().with_data_dir(dir),
        None => StoreConfig::from_env(),
    };
    debug!("Stowage: data directory {}", config.data_dir.display());
    let store = FileStore::open_or_unavailable(&config);

    match args.command {
        Command::Show => {
            let (bridge, _acks) = PersistenceBridge::detached(store);
            println!("{}", bridge.initialize().raw_text().unwrap_or("null"));
        },
        Command::Set { value } => {
            let value: Value =
                serde_json::from_str(&value).context("value must be valid JSON text")?;
            submit_and_report(store, PersistedValue::present(value)).await?;
        },
        Command::Clear => {
            submit_and_report(store, PersistedValue::Absent).await?;
        },
        Command::Counter { steps } => {
            let session = stowage_client::start(store, CounterProgram::new(steps).echo(true))
                .await
                .context("counter session failed")?;
            println!(
                "count = {} ({} acknowledged, {} degraded)",
                session.program.state().count,
                session.program.acked(),
                session.program.degraded()
            );
        },
    }

    Ok(())
}

async fn submit_and_report(store: Box<dyn DurableStore>, value: PersistedValue) -> anyhow::Result<()> {
    let (mut bridge, mut acks) = PersistenceBridge::detached(store);
    bridge.submit(value)?;
    let ack = acks
        .recv()
        .await
        .context("acknowledgment channel closed before the write was acknowledged")?;
    println!("{}", serde_json::to_string(&ack)?);
    Ok(())
}
