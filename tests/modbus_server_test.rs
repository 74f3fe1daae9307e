// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the wellhead-telemetry project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Tests for the WellheadModbusServer implementation
//!
//! These tests start a server instance on a loopback listener and talk to it
//! with a real Modbus TCP client: position block reads, legacy holding
//! registers, rejected writes, and the relay-side client on top of it.

use std::str::FromStr;
use std::time::Duration;
use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::time;
use tokio_modbus::{
    prelude::*,
    server::tcp::{accept_tcp_connection, Server},
};

use wellhead_telemetry::modbus::register_map::{
    decode_floats, BLOCK_BASE_ADDRESS, BLOCK_LEN, BLOCK_REGISTER_COUNT,
};
use wellhead_telemetry::modbus::{ModbusRegisterClient, WellheadModbusServer};
use wellhead_telemetry::relay::RegisterReader;
use wellhead_telemetry::TelemetryError;

/// Test utility function to start a Modbus server in the background
async fn start_test_server(
    registers: WellheadModbusServer,
) -> Result<(SocketAddr, tokio::task::JoinHandle<()>), Box<dyn std::error::Error>> {
    // Use port 0 to let the OS assign an available port
    let socket_addr = SocketAddr::from_str("127.0.0.1:0")?;
    let listener = TcpListener::bind(socket_addr).await?;
    let socket_addr = listener.local_addr()?;

    let server = Server::new(listener);
    let on_connected = move |stream, socket_addr| {
        let service = registers.clone();
        async move {
            accept_tcp_connection(stream, socket_addr, move |_socket_addr| {
                Ok(Some(service.clone()))
            })
        }
    };
    let on_process_error = |err| {
        eprintln!("Server error: {}", err);
    };

    let handle = tokio::spawn(async move {
        if let Err(e) = server.serve(&on_connected, on_process_error).await {
            eprintln!("Server error: {}", e);
        }
    });

    // Give the server a moment to start
    time::sleep(Duration::from_millis(50)).await;

    Ok((socket_addr, handle))
}

#[tokio::test]
async fn test_read_position_block() -> Result<(), Box<dyn std::error::Error>> {
    let registers = WellheadModbusServer::new();
    registers.write_block(&[3.0, 0.3, 0.0, 1.25, -0.5])?;
    let (socket_addr, _server_handle) = start_test_server(registers).await?;

    let mut ctx = tcp::connect(socket_addr).await?;
    let words = ctx
        .read_input_registers(BLOCK_BASE_ADDRESS, BLOCK_REGISTER_COUNT)
        .await??;

    assert_eq!(words.len(), 10);
    assert_eq!(decode_floats(&words)?, vec![3.0, 0.3, 0.0, 1.25, -0.5]);

    Ok(())
}

#[tokio::test]
async fn test_read_legacy_holding_registers() -> Result<(), Box<dyn std::error::Error>> {
    let registers = WellheadModbusServer::new();
    registers.write_scaled(2000, 3234)?;
    let (socket_addr, _server_handle) = start_test_server(registers).await?;

    let mut ctx = tcp::connect(socket_addr).await?;
    let data = ctx.read_holding_registers(0, 2).await??;
    assert_eq!(data, vec![2000, 3234]);

    Ok(())
}

#[tokio::test]
async fn test_reads_outside_the_map_are_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let (socket_addr, _server_handle) = start_test_server(WellheadModbusServer::new()).await?;
    let mut ctx = tcp::connect(socket_addr).await?;

    let result = ctx.read_input_registers(0, 2).await?;
    assert_eq!(result, Err(ExceptionCode::IllegalDataAddress));

    let result = ctx
        .read_input_registers(BLOCK_BASE_ADDRESS, BLOCK_REGISTER_COUNT + 1)
        .await?;
    assert_eq!(result, Err(ExceptionCode::IllegalDataAddress));

    Ok(())
}

#[tokio::test]
async fn test_writes_are_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let registers = WellheadModbusServer::new();
    registers.write_scaled(1500, 2500)?;
    let (socket_addr, _server_handle) = start_test_server(registers).await?;
    let mut ctx = tcp::connect(socket_addr).await?;

    let result = ctx.write_single_register(0, 999).await?;
    assert_eq!(result, Err(ExceptionCode::IllegalFunction));

    // The holding registers are unchanged
    let data = ctx.read_holding_registers(0, 2).await??;
    assert_eq!(data, vec![1500, 2500]);

    Ok(())
}

#[tokio::test]
async fn test_register_client_reads_the_block() -> Result<(), Box<dyn std::error::Error>> {
    let registers = WellheadModbusServer::new();
    registers.write_block(&[1.0, 0.1, 0.0, -1.5, 0.75])?;
    let (socket_addr, _server_handle) = start_test_server(registers.clone()).await?;

    let mut client =
        ModbusRegisterClient::connect(socket_addr, 1, Duration::from_millis(520)).await?;
    client.discard_stale().await?;
    let block = client.read_block(BLOCK_BASE_ADDRESS, BLOCK_LEN).await?;
    assert_eq!(block, vec![1.0, 0.1, 0.0, -1.5, 0.75]);

    // Each read sees the latest block
    registers.write_block(&[2.0, 0.2, 0.0, 0.5, 0.5])?;
    let block = client.read_block(BLOCK_BASE_ADDRESS, BLOCK_LEN).await?;
    assert_eq!(block[3..], [0.5, 0.5]);

    Ok(())
}

#[tokio::test]
async fn test_register_client_reports_exceptions() -> Result<(), Box<dyn std::error::Error>> {
    let (socket_addr, _server_handle) = start_test_server(WellheadModbusServer::new()).await?;

    let mut client =
        ModbusRegisterClient::connect(socket_addr, 1, Duration::from_millis(520)).await?;
    let err = client.read_block(0, BLOCK_LEN).await.unwrap_err();
    assert!(matches!(
        err,
        TelemetryError::Exception(ExceptionCode::IllegalDataAddress)
    ));

    // An exception does not spoil the connection
    client.discard_stale().await?;
    let block = client.read_block(BLOCK_BASE_ADDRESS, BLOCK_LEN).await?;
    assert_eq!(block, vec![0.0; BLOCK_LEN]);

    Ok(())
}

#[tokio::test]
async fn test_register_client_times_out_on_a_silent_device() -> Result<(), Box<dyn std::error::Error>> {
    // Accepts connections but never answers
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let socket_addr = listener.local_addr()?;
    let _silent = tokio::spawn(async move {
        let mut connections = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            connections.push(stream);
        }
    });

    let mut client =
        ModbusRegisterClient::connect(socket_addr, 1, Duration::from_millis(100)).await?;
    let err = client.read_block(BLOCK_BASE_ADDRESS, BLOCK_LEN).await.unwrap_err();
    assert!(matches!(err, TelemetryError::Timeout(_)));

    // The stale connection is replaced before the next request
    client.discard_stale().await?;
    let err = client.read_block(BLOCK_BASE_ADDRESS, BLOCK_LEN).await.unwrap_err();
    assert!(matches!(err, TelemetryError::Timeout(_)));

    Ok(())
}
