// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Device inventory
//!
//! Named connection profiles for managed network devices, loaded once from a
//! YAML document at startup and read-only afterwards.
//!
//! ```yaml
//! devices:
//!   r1:
//!     host: 10.0.0.1
//!     username: admin
//!     password: cisco
//!     secret: enablepw        # optional, enables privilege elevation
//!     port: 22                # optional
//!     device_type: cisco_ios  # optional
//! ```
//!
//! The first device in document order is the implicit default.

use crate::error::{NetCpuError, Result};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Default SSH port
pub const DEFAULT_PORT: u16 = 22;

/// Default device-type dialect
pub const DEFAULT_DEVICE_TYPE: &str = "cisco_ios";

/// Default inventory file path
pub const DEFAULT_INVENTORY_PATH: &str = "devices.yaml";

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_device_type() -> String {
    DEFAULT_DEVICE_TYPE.to_string()
}

/// Connection profile for one device
#[derive(Clone, PartialEq, Deserialize)]
pub struct DeviceProfile {
    /// Inventory key; filled in from the mapping key at load time
    #[serde(skip)]
    pub name: String,
    /// Management address
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Dialect tag (e.g. "cisco_ios")
    #[serde(default = "default_device_type")]
    pub device_type: String,
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    /// Enable secret
    #[serde(default)]
    pub secret: Option<String>,
    /// Private key for public-key authentication
    #[serde(default)]
    pub key_file: Option<PathBuf>,
    /// Per-device session timeout in seconds
    #[serde(default)]
    pub timeout: Option<u64>,
    /// Transport-specific options not interpreted by the core
    #[serde(flatten)]
    pub extras: BTreeMap<String, Value>,
}

impl DeviceProfile {
    /// Create a profile with default port and device type
    pub fn new(name: impl Into<String>, host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port: DEFAULT_PORT,
            device_type: default_device_type(),
            username: username.into(),
            password: None,
            secret: None,
            key_file: None,
            timeout: None,
            extras: BTreeMap::new(),
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn with_device_type(mut self, device_type: impl Into<String>) -> Self {
        self.device_type = device_type.into();
        self
    }

    /// Enable secret, if one is set and non-empty
    pub fn enable_secret(&self) -> Option<&str> {
        self.secret.as_deref().filter(|s| !s.is_empty())
    }

    /// Public view without credentials
    pub fn summary(&self) -> DeviceSummary {
        DeviceSummary {
            name: self.name.clone(),
            host: self.host.clone(),
            port: self.port,
            device_type: self.device_type.clone(),
        }
    }
}

// Credentials stay out of logs.
impl fmt::Debug for DeviceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceProfile")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("device_type", &self.device_type)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("key_file", &self.key_file)
            .field("timeout", &self.timeout)
            .field("extras", &self.extras.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Device entry as exposed to protocol clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub device_type: String,
}

/// Read-only store of device profiles in insertion order
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    devices: Vec<DeviceProfile>,
}

impl Inventory {
    /// Load from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| NetCpuError::Load(format!("Cannot read {}: {}", path.display(), e)))?;
        let inventory = Self::from_yaml_str(&content)?;
        log::info!(
            "Loaded {} device(s) from {}",
            inventory.len(),
            path.display()
        );
        Ok(inventory)
    }

    /// Parse from a YAML string
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let is_blank = content
            .lines()
            .all(|l| l.trim().is_empty() || l.trim_start().starts_with('#'));
        if is_blank {
            return Ok(Self::default());
        }

        let doc: Value = serde_yaml::from_str(content)
            .map_err(|e| NetCpuError::Load(format!("YAML parse error: {}", e)))?;

        let root = match doc {
            Value::Null => return Ok(Self::default()),
            Value::Mapping(m) => m,
            _ => return Err(NetCpuError::Load("top level must be a mapping".into())),
        };

        let devices = match root.get("devices") {
            None | Some(Value::Null) => return Ok(Self::default()),
            Some(Value::Mapping(m)) => m,
            Some(_) => {
                return Err(NetCpuError::Load(
                    "'devices' must be a mapping of device name to settings".into(),
                ))
            }
        };

        Self::from_mapping(devices)
    }

    fn from_mapping(devices: &Mapping) -> Result<Self> {
        let mut profiles = Vec::with_capacity(devices.len());
        for (key, value) in devices {
            let name = match key {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => {
                    return Err(NetCpuError::Load(format!(
                        "device names must be strings, got {:?}",
                        key
                    )))
                }
            };
            if !value.is_mapping() {
                return Err(NetCpuError::Load(format!(
                    "device '{}' must be a mapping of settings",
                    name
                )));
            }
            let mut profile: DeviceProfile = serde_yaml::from_value(value.clone())
                .map_err(|e| NetCpuError::Load(format!("device '{}': {}", name, e)))?;
            profile.name = name;
            profiles.push(profile);
        }
        Ok(Self { devices: profiles })
    }

    /// Build from profiles already in memory; the first one is the default
    pub fn from_profiles(devices: Vec<DeviceProfile>) -> Self {
        Self { devices }
    }

    /// Profile for `name`, or the default device when no name is given
    pub fn resolve(&self, name: Option<&str>) -> Result<&DeviceProfile> {
        if self.devices.is_empty() {
            return Err(NetCpuError::EmptyInventory);
        }
        match name {
            Some(name) => self
                .get(name)
                .ok_or_else(|| NetCpuError::UnknownDevice(name.to_string())),
            None => Ok(&self.devices[0]),
        }
    }

    /// Exact, case-sensitive lookup
    pub fn get(&self, name: &str) -> Option<&DeviceProfile> {
        self.devices.iter().find(|d| d.name == name)
    }

    /// First-inserted device
    pub fn default_device(&self) -> Option<&DeviceProfile> {
        self.devices.first()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.devices.iter().map(|d| d.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceProfile> {
        self.devices.iter()
    }

    pub fn summaries(&self) -> Vec<DeviceSummary> {
        self.devices.iter().map(DeviceProfile::summary).collect()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
