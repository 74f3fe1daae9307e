// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the wellhead-telemetry project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Poll-relay between the wellhead registers and the ground station
//!
//! Exits with a non-zero status when the downlink fails.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use tokio::net::TcpStream;

use wellhead_telemetry::config::Config;
use wellhead_telemetry::modbus::ModbusRegisterClient;
use wellhead_telemetry::relay::{PollRelay, StreamLink};

#[derive(Parser, Debug)]
#[command(author, version, about = "Wellhead poll-relay", long_about = None)]
struct Args {
    /// Configuration file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Wellhead Modbus server address
    #[arg(long)]
    wellhead_address: Option<String>,

    /// Wellhead Modbus server port
    #[arg(long)]
    wellhead_port: Option<u16>,

    /// Poll period in milliseconds
    #[arg(long)]
    poll_interval: Option<u64>,

    /// Register read timeout in milliseconds
    #[arg(long)]
    read_timeout: Option<u64>,

    /// Ground station address
    #[arg(long)]
    downlink_address: Option<String>,

    /// Ground station port
    #[arg(long)]
    downlink_port: Option<u16>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    let args = Args::parse();
    let mut config = Config::from_file(&args.config)?;
    config.apply_relay_args(
        args.wellhead_address,
        args.wellhead_port,
        args.poll_interval,
        args.read_timeout,
        args.downlink_address,
        args.downlink_port,
    )?;
    let relay = config.relay;

    let wellhead: SocketAddr = format!("{}:{}", relay.wellhead_address, relay.wellhead_port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid wellhead address {}:{}",
                relay.wellhead_address, relay.wellhead_port
            )
        })?;
    let reader = ModbusRegisterClient::connect(wellhead, relay.unit_id, relay.read_timeout())
        .await
        .with_context(|| format!("Failed to connect to the wellhead at {}", wellhead))?;

    let downlink = TcpStream::connect((relay.downlink_address.as_str(), relay.downlink_port))
        .await
        .with_context(|| {
            format!(
                "Failed to connect to the ground station at {}:{}",
                relay.downlink_address, relay.downlink_port
            )
        })?;
    downlink.set_nodelay(true)?;
    info!(
        "Forwarding to the ground station at {}",
        downlink.peer_addr()?
    );

    let mut poll_relay = PollRelay::new(reader, StreamLink::new(downlink), relay.settings());
    poll_relay.run().await.context("Relay stopped")?;
    Ok(())
}
