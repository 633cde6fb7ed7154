// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! `show processes cpu` output parsing.
//!
//! Only the first line carrying the `one minute:` marker is considered. The
//! three averages come from that one line together or not at all.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Substring identifying the CPU summary line (matched case-insensitively).
pub const CPU_LINE_MARKER: &str = "one minute:";

static CPU_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)five seconds: (?P<s5>\d+)%.*one minute: (?P<m1>\d+)%.*five minutes: (?P<m5>\d+)%",
    )
    .expect("valid CPU regex")
});

/// CPU utilization averages in percent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuSample {
    pub five_seconds: Option<f64>,
    pub one_minute: Option<f64>,
    pub five_minutes: Option<f64>,
}

impl CpuSample {
    /// Sample with all three fields absent.
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn is_present(&self) -> bool {
        self.five_seconds.is_some() && self.one_minute.is_some() && self.five_minutes.is_some()
    }
}

/// Extract the CPU averages from raw command output.
///
/// Missing marker lines, unexpected formatting and out-of-range numbers all
/// give [`CpuSample::absent`]; this never fails.
pub fn parse_cpu_utilization(raw: &str) -> CpuSample {
    let Some(line) = raw
        .lines()
        .find(|line| line.to_lowercase().contains(CPU_LINE_MARKER))
    else {
        return CpuSample::absent();
    };

    match extract(line) {
        Some(sample) => sample,
        None => {
            log::debug!("CPU marker line did not match expected format: {:?}", line);
            CpuSample::absent()
        }
    }
}

fn extract(line: &str) -> Option<CpuSample> {
    let caps = CPU_RE.captures(line)?;
    let percent = |name: &str| -> Option<f64> {
        let value: f64 = caps.name(name)?.as_str().parse().ok()?;
        (0.0..=100.0).contains(&value).then_some(value)
    };

    Some(CpuSample {
        five_seconds: Some(percent("s5")?),
        one_minute: Some(percent("m1")?),
        five_minutes: Some(percent("m5")?),
    })
}
