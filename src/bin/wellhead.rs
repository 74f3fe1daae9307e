// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the wellhead-telemetry project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Simulated wellhead device
//!
//! Serves the generated position in Modbus input registers until Ctrl-C.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::{error, info};
use tokio::signal;

use wellhead_telemetry::config::Config;
use wellhead_telemetry::daemon::Daemon;

#[derive(Parser, Debug)]
#[command(author, version, about = "Simulated wellhead Modbus device", long_about = None)]
struct Args {
    /// Configuration file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Address the Modbus server binds to
    #[arg(short, long)]
    address: Option<String>,

    /// Modbus server port
    #[arg(short, long)]
    port: Option<u16>,

    /// Register refresh period in milliseconds
    #[arg(long)]
    update_interval: Option<u64>,

    /// Seed of the signal generator
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    let args = Args::parse();
    let mut config = Config::from_file(&args.config)?;
    config.apply_wellhead_args(args.address, args.port, args.update_interval, args.seed)?;

    info!("Starting in daemon mode");
    let mut daemon = Daemon::new();
    daemon.launch(&config.wellhead).await?;

    match signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal, terminating daemon"),
        Err(err) => error!("Error waiting for shutdown signal: {}", err),
    }

    daemon.shutdown();
    daemon.join().await
}
