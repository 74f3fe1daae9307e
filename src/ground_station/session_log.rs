// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the wellhead-telemetry project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Append-only CSV record of a ground-station session
//!
//! ```text
//! t,X,Y,status
//! -1.00,0.412,-1.203,0
//! 0.00,0.000,0.000,0
//! 5.00,0.318,0.977,0
//! ```
//!
//! The first row holds the raw calibration fix. The file is opened, appended
//! and closed for every row.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use log::info;

use crate::safety::SafetyStatus;
use crate::signal::Position;

pub const HEADER: &str = "t,X,Y,status";

/// Time stamp of the calibration row.
pub const CALIBRATION_T: f64 = -1.0;

#[derive(Debug, Clone)]
pub struct SessionLog {
    path: PathBuf,
}

impl SessionLog {
    /// Create the log file in `directory` and write the header.
    ///
    /// In debug mode the file name is fixed and an earlier debug log is
    /// overwritten; otherwise it is derived from the current local time and
    /// an existing log of the same second gets a numbered sibling.
    pub fn create(directory: &Path, debug: bool) -> Result<Self> {
        fs::create_dir_all(directory)
            .with_context(|| format!("Failed to create log directory {}", directory.display()))?;

        let name = file_name(debug, Local::now());
        let (path, mut file) = if debug {
            let path = directory.join(name);
            let file = fs::File::create(&path)
                .with_context(|| format!("Failed to create session log {}", path.display()))?;
            (path, file)
        } else {
            create_new_log(directory, &name)?
        };
        writeln!(file, "{}", HEADER)
            .with_context(|| format!("Failed to write header to {}", path.display()))?;

        info!("Logging session to {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, t: f64, position: Position, status: SafetyStatus) -> Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open session log {}", self.path.display()))?;

        writeln!(file, "{}", format_row(t, position, status))
            .with_context(|| format!("Failed to append to {}", self.path.display()))
    }
}

/// Open `name` without clobbering an earlier log, falling back to
/// `<stem>_1.csv`, `<stem>_2.csv` and so on.
fn create_new_log(directory: &Path, name: &str) -> Result<(PathBuf, fs::File)> {
    let stem = name.trim_end_matches(".csv");
    let mut suffix = 0u32;
    loop {
        let path = if suffix == 0 {
            directory.join(name)
        } else {
            directory.join(format!("{}_{}.csv", stem, suffix))
        };
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(err) if err.kind() == ErrorKind::AlreadyExists && suffix < 1000 => suffix += 1,
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Failed to create session log {}", path.display()))
            }
        }
    }
}

/// `log_debug.csv` in debug mode, else `log_<YYYYMMDD_HHMMSS>.csv`.
pub fn file_name(debug: bool, now: DateTime<Local>) -> String {
    if debug {
        "log_debug.csv".to_string()
    } else {
        format!("log_{}.csv", now.format("%Y%m%d_%H%M%S"))
    }
}

pub fn format_row(t: f64, position: Position, status: SafetyStatus) -> String {
    format!(
        "{:.2},{:.3},{:.3},{}",
        t,
        position.x,
        position.y,
        status.code()
    )
}
