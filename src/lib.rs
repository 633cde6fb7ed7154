// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! # NetCPU Monitor
//!
//! CPU utilization of Cisco-style network devices, fetched over SSH and
//! exposed to AI agents as a Model Context Protocol tool.
//!
//! - [`inventory`]: named device profiles loaded from YAML
//! - [`session`]: scoped SSH command sessions with enable-mode elevation
//! - [`telemetry`]: `show processes cpu` parsing and the query operation
//! - [`mcp`]: JSON-RPC 2.0 stdio server
//!
//! ```no_run
//! use netcpulib::{Inventory, McpServer, SessionProvider, TelemetryOperation};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let inventory = Arc::new(Inventory::load("devices.yaml")?);
//! let operation = TelemetryOperation::new(inventory, SessionProvider::ssh());
//! let server = McpServer::new(operation);
//! let reply = server.handle_line(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#);
//! println!("{}", serde_json::to_string(&reply)?);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod inventory;
pub mod mcp;
pub mod session;
pub mod telemetry;

pub use error::{NetCpuError, Result};
pub use inventory::{DeviceProfile, DeviceSummary, Inventory};
pub use mcp::McpServer;
pub use session::{Connector, Platform, Session, SessionProvider, SshConnector, Transport, TransportError};
pub use telemetry::{parse_cpu_utilization, CpuSample, TelemetryOperation, TelemetryResult};
