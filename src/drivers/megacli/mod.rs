//! MegaCli RAID controller output
//!
//! Three independent listings are parsed: logical drives (`-LDInfo`), physical
//! disks (`-PDList`) and battery backup units (`-AdpBbuCmd`). Each listing is
//! one block of `Label : value` lines; an adapter header precedes many records,
//! so the adapter number is carried as context and tagged onto every record.

/// Logical drive listing
pub mod raid;

/// Physical disk listing
pub mod disk;

/// Battery backup unit status
pub mod bbu;

pub use bbu::BbuDriver;
pub use disk::DiskDriver;
pub use raid::RaidDriver;

use crate::drivers::FormatDriver;
use crate::error::ConfigError;
use log::{debug, error, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tool versions below this are known to stall on busy systems
pub const MIN_RECOMMENDED_VERSION: f64 = 8.0;

static TOOL_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Tool\s+Ver\s+(?P<ver>\d\.\d{1,2})\.").unwrap());

/// Kind of MegaCli listing to gather
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GatherType {
    Raid,
    Disk,
    Bbu,
}

impl GatherType {
    pub const ALL: [GatherType; 3] = [GatherType::Raid, GatherType::Disk, GatherType::Bbu];

    /// MegaCli arguments producing this listing
    pub fn args(&self) -> &'static [&'static str] {
        match self {
            GatherType::Raid => &["-LDInfo", "-LALL", "-aAll", "-Nolog"],
            GatherType::Disk => &["-PDList", "-aALL", "-Nolog"],
            GatherType::Bbu => &["-AdpBbuCmd", "-GetBbuStatus", "-aALL", "-Nolog"],
        }
    }

    pub fn driver(&self) -> Box<dyn FormatDriver> {
        match self {
            GatherType::Raid => Box::new(RaidDriver),
            GatherType::Disk => Box::new(DiskDriver),
            GatherType::Bbu => Box::new(BbuDriver),
        }
    }
}

impl fmt::Display for GatherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GatherType::Raid => "raid",
            GatherType::Disk => "disk",
            GatherType::Bbu => "bbu",
        };
        f.write_str(name)
    }
}

impl FromStr for GatherType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raid" => Ok(GatherType::Raid),
            "disk" => Ok(GatherType::Disk),
            "bbu" => Ok(GatherType::Bbu),
            other => Err(ConfigError::ValidationError(format!(
                "gather_type: unknown type {}, must be raid, disk or bbu",
                other
            ))),
        }
    }
}

/// Extract the `major.minor` tool version from `MegaCli -v` output
pub fn parse_tool_version(output: &str) -> Option<f64> {
    TOOL_VERSION
        .captures(output)
        .and_then(|caps| caps.name("ver"))
        .and_then(|m| m.as_str().parse().ok())
}

/// Check `MegaCli -v` output and log what it means for collection
///
/// Returns the parsed version. An old tool is only warned about; unreadable
/// output usually means the tool could not run with enough privileges.
pub fn check_tool_version(output: &str) -> Option<f64> {
    match parse_tool_version(output) {
        Some(version) if version < MIN_RECOMMENDED_VERSION => {
            warn!(
                "MegaCli version {} is older than {}, listings may be incomplete",
                version, MIN_RECOMMENDED_VERSION
            );
            Some(version)
        }
        Some(version) => {
            debug!("MegaCli version {}", version);
            Some(version)
        }
        None => {
            error!("Cannot read MegaCli version, check that it runs with root privileges");
            None
        }
    }
}
