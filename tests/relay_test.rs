// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the wellhead-telemetry project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! End-to-end relay tests: wellhead registers over Modbus TCP, relay frames
//! over a TCP downlink, decoded on the ground-station side.

use std::f64::consts::FRAC_PI_2;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_modbus::server::tcp::{accept_tcp_connection, Server};

use wellhead_telemetry::config::WellheadConfig;
use wellhead_telemetry::daemon::{Daemon, RegisterUpdater};
use wellhead_telemetry::ground_station::{PositionSource, RelayFeed};
use wellhead_telemetry::modbus::{ModbusRegisterClient, WellheadModbusServer};
use wellhead_telemetry::relay::{PollRelay, RelaySettings, StreamLink};
use wellhead_telemetry::signal::{Position, SignalConfig, SignalGenerator, WaveParameters};
use wellhead_telemetry::TelemetryError;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Launch a wellhead daemon on an ephemeral port.
async fn wellhead(signal: SignalConfig) -> (Daemon, SocketAddr) {
    let mut daemon = Daemon::new();
    let config = WellheadConfig {
        port: 0,
        update_interval_ms: 20,
        signal,
        ..Default::default()
    };
    let addr = daemon.launch(&config).await.unwrap();
    (daemon, addr)
}

/// Ground-station end of the downlink and the relay end connected to it.
async fn downlink() -> (TcpStream, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (relay_side, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
    (accepted.unwrap().0, relay_side.unwrap())
}

async fn wait_for_frames<R>(feed: &mut RelayFeed<R>, count: u64)
where
    R: tokio::io::AsyncRead + Unpin + Send,
{
    timeout(Duration::from_secs(5), async {
        while feed.frames() < count {
            feed.pump().await.unwrap();
        }
    })
    .await
    .unwrap();
}

/// Serve `registers` on an ephemeral port.
async fn serve(registers: WellheadModbusServer) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = Server::new(listener);
    tokio::spawn(async move {
        let on_connected = move |stream, socket_addr| {
            let service = registers.clone();
            async move {
                accept_tcp_connection(stream, socket_addr, move |_| Ok(Some(service.clone())))
            }
        };
        let _ = server
            .serve(&on_connected, |err| eprintln!("Server error: {err}"))
            .await;
    });
    addr
}

#[tokio::test]
async fn relay_forwards_the_register_position() {
    init_logger();

    // Device frozen at t = pi/2: x = y = 2 sin(pi/2) = 2
    let registers = WellheadModbusServer::new();
    let generator = SignalGenerator::new(WaveParameters::single_tone(2.0, 1.0, 0.0, 0.0));
    RegisterUpdater::new(generator, registers.clone(), 2.0)
        .update(FRAC_PI_2)
        .unwrap();
    let addr = serve(registers).await;

    let reader = ModbusRegisterClient::connect(addr, 1, Duration::from_millis(520))
        .await
        .unwrap();
    let (station_side, relay_side) = downlink().await;
    let mut relay = PollRelay::new(reader, StreamLink::new(relay_side), RelaySettings::default());

    let sent = relay.cycle().await.unwrap();
    assert_eq!(sent.to_wire(), "MX+02.00000Y+02.00000");

    let mut feed = RelayFeed::new(station_side);
    wait_for_frames(&mut feed, 1).await;
    assert_eq!(feed.sample(0.0), Some(Position::new(2.0, 2.0)));
}

#[tokio::test]
async fn relay_starts_at_the_origin_of_a_fresh_device() {
    init_logger();
    let addr = serve(WellheadModbusServer::new()).await;

    let reader = ModbusRegisterClient::connect(addr, 1, Duration::from_millis(520))
        .await
        .unwrap();
    let (_station_side, relay_side) = downlink().await;
    let mut relay = PollRelay::new(reader, StreamLink::new(relay_side), RelaySettings::default());

    let sent = relay.cycle().await.unwrap();
    assert_eq!(sent.to_wire(), "MX+00.00000Y+00.00000");
    assert_eq!(relay.read_failures(), 0);
}

#[tokio::test]
async fn relay_tracks_a_running_wellhead() {
    init_logger();
    let (daemon, addr) = wellhead(SignalConfig::SingleTone {
        amplitude: 2.0,
        frequency: 1.0,
        seed: Some(3),
    })
    .await;

    let reader = ModbusRegisterClient::connect(addr, 1, Duration::from_millis(520))
        .await
        .unwrap();
    let (station_side, relay_side) = downlink().await;
    let settings = RelaySettings {
        period: Duration::from_millis(50),
        ..Default::default()
    };
    let mut relay = PollRelay::new(reader, StreamLink::new(relay_side), settings);
    let relay_task = tokio::spawn(async move {
        let result = relay.run().await;
        (relay, result)
    });

    let mut feed = RelayFeed::new(station_side);
    wait_for_frames(&mut feed, 5).await;
    let position = feed.sample(0.0).unwrap();
    assert!(position.x.abs() <= 2.0 && position.y.abs() <= 2.0);

    // Closing the ground-station side ends the relay with a downlink error
    drop(feed);
    let (relay, result) = timeout(Duration::from_secs(5), relay_task)
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(result, Err(TelemetryError::Io(_))));
    assert!(relay.cycles() >= 5);

    daemon.shutdown();
    daemon.join().await.unwrap();
}

#[tokio::test]
async fn relay_keeps_sending_while_the_wellhead_is_silent() {
    init_logger();

    // Accepts connections but never answers
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut connections = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            connections.push(stream);
        }
    });

    let reader = ModbusRegisterClient::connect(addr, 1, Duration::from_millis(100))
        .await
        .unwrap();
    let (station_side, relay_side) = downlink().await;
    let mut relay = PollRelay::new(reader, StreamLink::new(relay_side), RelaySettings::default());

    let mut frames = Vec::new();
    for _ in 0..3 {
        frames.push(relay.cycle().await.unwrap().to_wire());
    }
    assert_eq!(frames, vec!["MX+00.00000Y+00.00000"; 3]);
    assert_eq!(relay.read_failures(), 3);

    let mut feed = RelayFeed::new(station_side);
    wait_for_frames(&mut feed, 3).await;
    assert_eq!(feed.sample(0.0), Some(Position::ORIGIN));
}
