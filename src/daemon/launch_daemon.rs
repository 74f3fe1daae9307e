// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the wellhead-telemetry project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use log::{debug, error, info, warn};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_modbus::server::tcp::{accept_tcp_connection, Server};

use crate::config::WellheadConfig;
use crate::modbus::WellheadModbusServer;
use crate::signal::{scaled_integer, SignalGenerator};

/// Status slot value of a healthy device.
const DEVICE_STATUS_NOMINAL: f32 = 0.0;

/// Runs the simulated wellhead: a Modbus TCP server and the task refreshing
/// its registers.
pub struct Daemon {
    tasks: Vec<JoinHandle<Result<()>>>,
    running: Arc<AtomicBool>,
    registers: WellheadModbusServer,
}

impl Default for Daemon {
    fn default() -> Self {
        Self::new()
    }
}

impl Daemon {
    /// Create a new daemon instance
    pub fn new() -> Self {
        Daemon {
            tasks: Vec::new(),
            running: Arc::new(AtomicBool::new(true)),
            registers: WellheadModbusServer::new(),
        }
    }

    /// Register storage served to clients.
    pub fn registers(&self) -> &WellheadModbusServer {
        &self.registers
    }

    /// Start the Modbus server and the register update loop.
    ///
    /// Returns the address the server is listening on, which differs from the
    /// configured one when port 0 is requested.
    pub async fn launch(&mut self, config: &WellheadConfig) -> Result<SocketAddr> {
        let local_addr = self.start_modbus_server(config).await?;
        self.start_register_updates(config)?;
        Ok(local_addr)
    }

    /// Bind the listener and serve the register block to every client.
    async fn start_modbus_server(&mut self, config: &WellheadConfig) -> Result<SocketAddr> {
        info!(
            "Starting modbus server on {}:{}",
            config.address, config.port
        );
        let socket_addr: SocketAddr = format!("{}:{}", config.address, config.port)
            .parse()
            .with_context(|| {
                format!(
                    "Invalid Modbus socket address {}:{}",
                    config.address, config.port
                )
            })?;
        let listener = TcpListener::bind(socket_addr)
            .await
            .with_context(|| format!("Failed to bind Modbus server to {}", socket_addr))?;
        let local_addr = listener.local_addr()?;

        let running = self.running.clone();
        let registers = self.registers.clone();

        let task = tokio::spawn(async move {
            let server = Server::new(listener);

            // Every connection shares the same register storage
            let on_connected = move |stream, socket_addr| {
                let service = registers.clone();
                async move {
                    debug!("Modbus client connected from {}", socket_addr);
                    accept_tcp_connection(stream, socket_addr, move |_socket_addr| {
                        Ok(Some(service.clone()))
                    })
                }
            };

            let on_process_error = |err| {
                error!("Modbus server error: {err}");
            };

            let server_handle = tokio::spawn(async move {
                if let Err(e) = server.serve(&on_connected, on_process_error).await {
                    error!("Modbus server error: {}", e);
                }
            });

            while running.load(Ordering::SeqCst) {
                time::sleep(Duration::from_millis(100)).await;
            }

            info!("Shutting down Modbus server...");
            server_handle.abort();
            match time::timeout(Duration::from_secs(5), server_handle).await {
                Ok(_) => info!("Modbus server shut down successfully"),
                Err(_) => warn!("Modbus server shutdown timed out, forcing termination"),
            }

            Ok(())
        });

        self.tasks.push(task);
        info!("Modbus server listening on {}", local_addr);
        Ok(local_addr)
    }

    /// Refresh the register block from the signal generator.
    fn start_register_updates(&mut self, config: &WellheadConfig) -> Result<()> {
        let period = config.update_interval();
        if period.is_zero() {
            return Err(anyhow!("Register update interval must be greater than 0"));
        }
        info!("Updating wellhead registers every {:?}", period);

        let generator = config.signal.build();
        let peak = config.signal.peak_amplitude();
        let running = self.running.clone();
        let registers = self.registers.clone();

        let task = tokio::spawn(async move {
            let mut updater = RegisterUpdater::new(generator, registers, peak);
            let started = Instant::now();
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            while running.load(Ordering::SeqCst) {
                ticker.tick().await;
                updater.update(started.elapsed().as_secs_f64())?;
            }
            Ok(())
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Stop all running tasks
    pub fn shutdown(&self) {
        info!("Shutting down daemon tasks");
        self.running.store(false, Ordering::SeqCst);
    }

    /// Wait for all tasks to complete
    pub async fn join(self) -> Result<()> {
        for task in self.tasks {
            match task.await {
                Ok(Err(e)) => error!("Task failed: {:#}", e),
                Err(e) => error!("Task panicked: {}", e),
                Ok(Ok(())) => {}
            }
        }
        Ok(())
    }
}

/// Writes successive generator outputs into the register block.
pub struct RegisterUpdater {
    generator: SignalGenerator,
    registers: WellheadModbusServer,
    peak_amplitude: f64,
    sequence: u32,
}

impl RegisterUpdater {
    pub fn new(generator: SignalGenerator, registers: WellheadModbusServer, peak_amplitude: f64) -> Self {
        Self {
            generator,
            registers,
            peak_amplitude,
            sequence: 0,
        }
    }

    /// Publish the position at `elapsed` seconds.
    pub fn update(&mut self, elapsed: f64) -> Result<()> {
        let position = self.generator.get_position(elapsed);
        self.sequence = self.sequence.wrapping_add(1);

        self.registers
            .write_block(&[
                self.sequence as f32,
                elapsed as f32,
                DEVICE_STATUS_NOMINAL,
                position.x as f32,
                position.y as f32,
            ])
            .map_err(|e| anyhow!("Failed to write position block: {:?}", e))?;
        self.registers
            .write_scaled(
                scaled_integer(position.x, self.peak_amplitude),
                scaled_integer(position.y, self.peak_amplitude),
            )
            .map_err(|e| anyhow!("Failed to write scaled position: {:?}", e))?;

        debug!(
            "Update {}: t={:.2} x={:.5} y={:.5}",
            self.sequence, elapsed, position.x, position.y
        );
        Ok(())
    }
}
