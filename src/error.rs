// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Error types for NetCPU Monitor

use crate::session::TransportError;
use std::io;
use thiserror::Error;

/// Result type alias for NetCPU operations
pub type Result<T> = std::result::Result<T, NetCpuError>;

/// Main error type for NetCPU Monitor
#[derive(Error, Debug)]
pub enum NetCpuError {
    /// Inventory source unreadable or malformed
    #[error("Inventory load error: {0}")]
    Load(String),

    /// No device named and none configured
    #[error("Inventory is empty: no devices configured")]
    EmptyInventory,

    /// Named device absent from the inventory
    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    /// Session could not be established or elevated
    #[error("Connection to {device} failed: {source}")]
    Connection {
        device: String,
        #[source]
        source: TransportError,
    },

    /// Command round trip failed on an open session
    #[error("Command '{command}' on {device} failed: {source}")]
    Command {
        device: String,
        command: String,
        #[source]
        source: TransportError,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// JSON-RPC application error codes, one per error kind
pub const LOAD_ERROR: i32 = -32001;
pub const EMPTY_INVENTORY_ERROR: i32 = -32002;
pub const UNKNOWN_DEVICE_ERROR: i32 = -32003;
pub const CONNECTION_ERROR: i32 = -32004;
pub const COMMAND_ERROR: i32 = -32005;
pub const INTERNAL_ERROR: i32 = -32603;

impl NetCpuError {
    /// Stable snake_case tag for the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Load(_) => "load_error",
            Self::EmptyInventory => "empty_inventory",
            Self::UnknownDevice(_) => "unknown_device",
            Self::Connection { .. } => "connection_error",
            Self::Command { .. } => "command_error",
            Self::Io(_) => "io_error",
            Self::Json(_) => "json_error",
        }
    }

    /// JSON-RPC error code reported at the protocol boundary
    pub fn rpc_code(&self) -> i32 {
        match self {
            Self::Load(_) => LOAD_ERROR,
            Self::EmptyInventory => EMPTY_INVENTORY_ERROR,
            Self::UnknownDevice(_) => UNKNOWN_DEVICE_ERROR,
            Self::Connection { .. } => CONNECTION_ERROR,
            Self::Command { .. } => COMMAND_ERROR,
            Self::Io(_) | Self::Json(_) => INTERNAL_ERROR,
        }
    }
}
