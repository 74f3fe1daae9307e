// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the wellhead-telemetry project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Ground station entry point: calibrate, classify, log and plot the wellhead position

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use tokio::net::TcpListener;
use tokio::signal;

use wellhead_telemetry::config::{self, Config, GroundStationConfig, PositionFeed};
use wellhead_telemetry::ground_station::{
    GroundStation, LocalSimulation, PositionSource, RelayFeed, SessionLog, ShutdownReason,
};
use wellhead_telemetry::visualization::{CloseHandle, PlotSink};

#[derive(Debug, Parser)]
#[command(author, version, about = "Wellhead ground station", long_about = None)]
pub struct Args {
    /// Configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Validate a configuration file and exit
    #[arg(long)]
    validate_config: Option<PathBuf>,

    /// Print the configuration JSON schema and exit
    #[arg(long)]
    show_config_schema: bool,

    /// Position feed
    #[arg(long, value_enum)]
    feed: Option<PositionFeed>,

    /// Address the downlink listener binds to
    #[arg(short = 'l', long)]
    listen_address: Option<String>,

    /// Port the downlink listener binds to
    #[arg(short = 'p', long)]
    listen_port: Option<u16>,

    /// Directory receiving the session logs
    #[arg(long)]
    log_directory: Option<PathBuf>,

    /// Write the session to log_debug.csv
    #[arg(long)]
    debug: bool,

    /// SVG dashboard output
    #[arg(long)]
    plot: Option<PathBuf>,

    /// Visible history window in seconds
    #[arg(long)]
    window: Option<f64>,

    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut logger = env_logger::Builder::from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );
    if args.quiet {
        logger.filter_level(log::LevelFilter::Off);
    } else if args.verbose {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    if args.show_config_schema {
        return config::output_config_schema();
    }

    if let Some(validate_path) = args.validate_config {
        if !validate_path.exists() {
            return Err(anyhow::anyhow!(
                "Configuration file does not exist: {}",
                validate_path.display()
            ));
        }

        Config::from_file(&validate_path)
            .map_err(|err| anyhow::anyhow!("Configuration validation failed: {}", err))?;
        println!("Configuration file is valid: {}", validate_path.display());
        return Ok(());
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("config.yaml"));
    let mut config = Config::from_file(&config_path)?;

    config.apply_ground_station_args(
        args.feed,
        args.listen_address.clone(),
        args.listen_port,
        args.log_directory.clone(),
        args.debug,
        args.plot.clone(),
        args.window,
    )?;
    let station = config.ground_station;

    let sink = PlotSink::new(
        &station.plot_path,
        (station.plot_width, station.plot_height),
        station.max_angle,
    );
    let close = sink.close_handle();

    // Ctrl-C stands for the operator closing the plot
    let on_signal = close.clone();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal, closing the plot");
                on_signal.close();
            }
            Err(err) => error!("Error waiting for shutdown signal: {}", err),
        }
    });

    let reason = match station.feed {
        PositionFeed::Local => {
            info!("Using the local signal generator");
            let source = LocalSimulation::new(station.signal.build());
            session(source, sink, &station, &close).await?
        }
        PositionFeed::Relay => {
            let listener = TcpListener::bind((station.listen_address.as_str(), station.listen_port))
                .await
                .with_context(|| {
                    format!(
                        "Failed to bind downlink listener to {}:{}",
                        station.listen_address, station.listen_port
                    )
                })?;
            info!("Waiting for the relay on {}", listener.local_addr()?);

            let accepted = tokio::select! {
                accepted = listener.accept() => Some(accepted.context("Failed to accept the relay")?),
                _ = closed(&close) => None,
            };
            match accepted {
                Some((stream, peer)) => {
                    info!("Relay connected from {}", peer);
                    session(RelayFeed::new(stream), sink, &station, &close).await?
                }
                None => ShutdownReason::SurfaceClosed,
            }
        }
    };

    info!("Session ended: {:?}", reason);
    std::process::exit(reason.exit_code());
}

/// Run a whole session on `source` until the plot is closed.
async fn session<S: PositionSource>(
    source: S,
    sink: PlotSink,
    station: &GroundStationConfig,
    close: &CloseHandle,
) -> Result<ShutdownReason> {
    let polygon = station
        .tolerance
        .build()
        .context("Invalid tolerance polygon")?;
    let log = SessionLog::create(&station.log_directory, station.debug)?;

    let started = tokio::select! {
        started = GroundStation::start(source, sink, polygon, log, station.settings()) => Some(started?),
        _ = closed(close) => None,
    };

    match started {
        Some(mut ground_station) => ground_station.run().await,
        None => Ok(ShutdownReason::SurfaceClosed),
    }
}

/// Completes once `close` has been set.
async fn closed(close: &CloseHandle) {
    while !close.is_closed() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}
