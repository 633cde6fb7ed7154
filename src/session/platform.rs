// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Device-type dialects understood by the SSH transport.

use std::fmt;
use std::str::FromStr;

/// CLI dialect of a managed device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    CiscoIos,
    CiscoXe,
    CiscoNxos,
    CiscoXr,
    CiscoAsa,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::CiscoIos,
        Platform::CiscoXe,
        Platform::CiscoNxos,
        Platform::CiscoXr,
        Platform::CiscoAsa,
    ];

    /// Inventory tag for this dialect.
    pub fn device_type(&self) -> &'static str {
        match self {
            Self::CiscoIos => "cisco_ios",
            Self::CiscoXe => "cisco_xe",
            Self::CiscoNxos => "cisco_nxos",
            Self::CiscoXr => "cisco_xr",
            Self::CiscoAsa => "cisco_asa",
        }
    }

    /// Command that turns off output paging.
    pub fn paging_command(&self) -> &'static str {
        match self {
            Self::CiscoAsa => "terminal pager 0",
            _ => "terminal length 0",
        }
    }

    /// NX-OS and IOS-XR log users straight into privileged mode.
    pub fn has_enable_mode(&self) -> bool {
        matches!(self, Self::CiscoIos | Self::CiscoXe | Self::CiscoAsa)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.device_type())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.device_type() == s.trim())
            .ok_or_else(|| s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_type_round_trip() {
        for platform in Platform::ALL {
            assert_eq!(platform.device_type().parse::<Platform>(), Ok(platform));
        }
    }

    #[test]
    fn test_unknown_device_type() {
        assert!("juniper_junos".parse::<Platform>().is_err());
        assert!("cisco_ios_telnet".parse::<Platform>().is_err());
    }

    #[test]
    fn test_paging_commands() {
        assert_eq!(Platform::CiscoIos.paging_command(), "terminal length 0");
        assert_eq!(Platform::CiscoAsa.paging_command(), "terminal pager 0");
    }

    #[test]
    fn test_enable_mode() {
        assert!(Platform::CiscoIos.has_enable_mode());
        assert!(!Platform::CiscoNxos.has_enable_mode());
        assert!(!Platform::CiscoXr.has_enable_mode());
    }
}
