//! `gravity-init` - submit the Gravity contract initialization transaction
//!
//! Prints the hex encoded instruction data, message and raw transaction so the
//! bytes can be checked independently, then the signature returned by the node.

use anyhow::{Context, Result};
use clap::Parser;
use gravity_init::{prepare_init, submit_init, InitConfig, JsonRpcClient};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "gravity-init", author, version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    config: InitConfig,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(rpc_url = %args.config.rpc_url, "Connecting to node");

    let client = JsonRpcClient::new(args.config.rpc_url.clone());
    let prepared = prepare_init(&args.config, &client)
        .await
        .context("init-gravity failed")?;

    // Printed before submission so a rejected transaction can still be inspected
    print_block("RAW INSTRUCTION DATA", &prepared.instruction_data_hex());
    print_block("RAW MESSAGE", &prepared.message_hex());
    print_block("RAW TRANSACTION", &prepared.transaction_hex());

    let signature = submit_init(&prepared, &client)
        .await
        .context("init-gravity failed")?;
    println!("txHash: {}", signature);

    Ok(())
}

fn print_block(title: &str, hex: &str) {
    println!("--------- {} ---------", title);
    println!("{}", hex);
    println!("------- END {} -------", title);
}

fn init_logging(verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        "gravity_init=debug,info"
    } else {
        "gravity_init=info,warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true).with_writer(std::io::stderr))
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(())
}
