// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the wellhead-telemetry project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use clap::Parser;
use std::error::Error;
use tokio::time::Duration;
use tokio_modbus::prelude::*;

use wellhead_telemetry::modbus::register_map::{
    decode_floats, BLOCK_BASE_ADDRESS, BLOCK_REGISTER_COUNT, ELAPSED_SLOT, SCALED_X_REGISTER,
    SEQUENCE_SLOT, STATUS_SLOT, X_SLOT, Y_SLOT,
};

/// Modbus client dumping the position block of a wellhead
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Modbus server address
    #[clap(long, default_value = "127.0.0.1")]
    address: String,

    /// Modbus server port
    #[clap(long, default_value = "5020")]
    port: u16,

    /// First input register of the position block
    #[clap(long, default_value_t = BLOCK_BASE_ADDRESS)]
    input_register: u16,

    /// Modbus unit identifier
    #[clap(long, default_value = "1")]
    unit_id: u8,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logging
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    // Parse command line arguments
    let args = Args::parse();

    // Format server address
    let socket_addr = format!("{}:{}", args.address, args.port).parse()?;
    println!("Connecting to Modbus server at {}", socket_addr);

    let mut ctx = tcp::connect_slave(socket_addr, Slave(args.unit_id)).await?;

    println!(
        "Reading {} input registers starting at address {}",
        BLOCK_REGISTER_COUNT, args.input_register
    );
    let words = tokio::time::timeout(
        Duration::from_secs(1),
        ctx.read_input_registers(args.input_register, BLOCK_REGISTER_COUNT),
    )
    .await???;
    println!("Raw register values: {:?}", words);

    let values = decode_floats(&words)?;
    let labels = [
        (SEQUENCE_SLOT, "Sequence"),
        (ELAPSED_SLOT, "Elapsed time (s)"),
        (STATUS_SLOT, "Device status"),
        (X_SLOT, "X angle (deg)"),
        (Y_SLOT, "Y angle (deg)"),
    ];
    for (slot, label) in labels {
        let register = args.input_register as usize + slot * 2;
        match values.get(slot) {
            Some(value) => println!("Registers {}-{}: {} = {}", register, register + 1, label, value),
            None => println!("Registers {}-{}: {} missing", register, register + 1, label),
        }
    }

    // Legacy scaled integers, offset by the peak amplitude
    let scaled = tokio::time::timeout(
        Duration::from_secs(1),
        ctx.read_holding_registers(SCALED_X_REGISTER, 2),
    )
    .await???;
    if let [x, y] = scaled[..] {
        println!("Holding registers 0-1: scaled X = {}, scaled Y = {}", x, y);
    }

    Ok(())
}
