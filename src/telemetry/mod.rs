// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! CPU telemetry operation
//!
//! Resolves a device, opens a session, runs the filtered CPU command (falling
//! back to the full report when a dialect returns nothing for the filter),
//! closes the session and parses the response.
//!
//! # Example
//!
//! ```no_run
//! use netcpulib::{Inventory, SessionProvider, TelemetryOperation};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let inventory = Arc::new(Inventory::load("devices.yaml")?);
//! let operation = TelemetryOperation::new(inventory, SessionProvider::ssh());
//! let result = operation.get_cpu_utilization(Some("r1"))?;
//! println!("{:?}", result.parsed);
//! # Ok(())
//! # }
//! ```

pub mod parser;

pub use parser::{parse_cpu_utilization, CpuSample, CPU_LINE_MARKER};

use crate::error::Result;
use crate::inventory::Inventory;
use crate::session::{Session, SessionProvider};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Filtered command returning only the CPU summary line
pub const PRIMARY_COMMAND: &str = "show processes cpu | include one minute";

/// Full report, for dialects that reject output filters
pub const FALLBACK_COMMAND: &str = "show processes cpu";

/// Outcome of one telemetry request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryResult {
    /// Effective device name (explicit or inventory default)
    pub device: String,
    /// Verbatim command response
    pub raw: String,
    pub parsed: CpuSample,
}

/// CPU utilization query against inventory devices
#[derive(Clone)]
pub struct TelemetryOperation {
    inventory: Arc<Inventory>,
    sessions: SessionProvider,
}

impl TelemetryOperation {
    pub fn new(inventory: Arc<Inventory>, sessions: SessionProvider) -> Self {
        Self {
            inventory,
            sessions,
        }
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// Query CPU utilization of `device`, or of the default device.
    pub fn get_cpu_utilization(&self, device: Option<&str>) -> Result<TelemetryResult> {
        let profile = self.inventory.resolve(device)?;
        let mut session = self.sessions.open(profile)?;

        let raw = run_cpu_commands(&mut session);
        session.close();
        let raw = raw?;

        let parsed = parse_cpu_utilization(&raw);
        log::info!(
            "{}: cpu 5s={:?} 1m={:?} 5m={:?}",
            profile.name,
            parsed.five_seconds,
            parsed.one_minute,
            parsed.five_minutes
        );

        Ok(TelemetryResult {
            device: profile.name.clone(),
            raw,
            parsed,
        })
    }
}

fn run_cpu_commands(session: &mut Session) -> Result<String> {
    let raw = session.execute(PRIMARY_COMMAND)?;
    if !raw.trim().is_empty() {
        return Ok(raw);
    }
    log::debug!(
        "{}: filtered command returned nothing, retrying with '{}'",
        session.device(),
        FALLBACK_COMMAND
    );
    session.execute(FALLBACK_COMMAND)
}
