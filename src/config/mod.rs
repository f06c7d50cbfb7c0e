//! TOML configuration
//!
//! Each source section is optional; a present section enables that source.
//!
//! ```toml
//! interval_seconds = 60
//! concurrent = true
//!
//! [megacli]
//! path = "/opt/MegaRAID/MegaCli/MegaCli64"
//! gather_type = ["raid", "disk", "bbu"]
//! use_sudo = true
//!
//! [iptables]
//! use_rule = false
//! chains = ["INPUT", "FORWARD"]
//!
//! [pika]
//! servers = ["tcp://:secret@10.0.0.5:9221"]
//! ```

use crate::collectors::Target;
use crate::drivers::pika::parse_server_url;
use crate::drivers::{FormatDriver, GatherType, IptablesDriver, ListingMode, PikaInfoDriver};
use crate::error::ConfigError;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Seconds between collection cycles; 0 runs a single cycle
    pub interval_seconds: u64,
    /// Collect targets in parallel
    pub concurrent: bool,
    /// Default command timeout
    pub timeout_seconds: u64,
    /// Stamp records with the capture time
    pub timestamp: bool,
    pub megacli: Option<MegaCliConfig>,
    pub iptables: Option<IptablesConfig>,
    pub pika: Option<PikaConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval_seconds: 0,
            concurrent: true,
            timeout_seconds: 3,
            timestamp: true,
            megacli: None,
            iptables: None,
            pika: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MegaCliConfig {
    /// MegaCli executable, looked up on `PATH` when not absolute
    pub path: String,
    /// Listings to gather: `raid`, `disk`, `bbu`
    pub gather_type: Vec<String>,
    pub use_sudo: bool,
    /// Overrides the top-level timeout for MegaCli, which can be slow
    pub timeout_seconds: Option<u64>,
}

impl Default for MegaCliConfig {
    fn default() -> Self {
        Self {
            path: "MegaCli".to_string(),
            gather_type: GatherType::ALL.iter().map(|g| g.to_string()).collect(),
            use_sudo: false,
            timeout_seconds: None,
        }
    }
}

impl MegaCliConfig {
    /// Validated gather types
    ///
    /// Any unknown name resets the selection to all three listings.
    pub fn gather_types(&self) -> Vec<GatherType> {
        let parsed: Result<Vec<GatherType>, ConfigError> =
            self.gather_type.iter().map(|name| name.parse()).collect();
        match parsed {
            Ok(types) if !types.is_empty() => types,
            Ok(_) => GatherType::ALL.to_vec(),
            Err(e) => {
                error!("{}; gathering raid, disk and bbu", e);
                GatherType::ALL.to_vec()
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IptablesConfig {
    pub use_sudo: bool,
    /// Pass `-w 5` to wait for the xtables lock
    pub use_lock: bool,
    /// Per-rule counters (`-nvL`) instead of per-chain summaries (`-S`)
    pub use_rule: bool,
    /// Alternate executable such as `ip6tables`
    pub binary: String,
    pub table: String,
    pub chains: Vec<String>,
}

impl Default for IptablesConfig {
    fn default() -> Self {
        Self {
            use_sudo: false,
            use_lock: false,
            use_rule: true,
            binary: "iptables".to_string(),
            table: "filter".to_string(),
            chains: Vec::new(),
        }
    }
}

impl IptablesConfig {
    pub fn mode(&self) -> ListingMode {
        if self.use_rule {
            ListingMode::Rules
        } else {
            ListingMode::Chain
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PikaConfig {
    /// Server URLs, `[tcp://][:password@]host[:port]`
    pub servers: Vec<String>,
    /// Overrides any password given in the URLs
    pub password: Option<String>,
    /// Client used to fetch `INFO ALL`
    pub cli_path: String,
}

impl Default for PikaConfig {
    fn default() -> Self {
        Self {
            servers: vec!["tcp://localhost:9221".to_string()],
            password: None,
            cli_path: "redis-cli".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// * `ConfigError::ReadError` - the file cannot be read
    /// * `ConfigError::TomlError` - the file is not valid TOML for this schema
    /// * `ConfigError::ValidationError` - a value is out of range
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        let config: Config = toml::from_str(&text)?;
        config.validate()?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if let Some(megacli) = &self.megacli {
            if megacli.path.trim().is_empty() {
                return Err(ConfigError::ValidationError("megacli.path is empty".to_string()));
            }
            if megacli.timeout_seconds == Some(0) {
                return Err(ConfigError::ValidationError(
                    "megacli.timeout_seconds must be greater than 0".to_string(),
                ));
            }
        }
        if let Some(iptables) = &self.iptables {
            if iptables.table.trim().is_empty() {
                return Err(ConfigError::ValidationError("iptables.table is empty".to_string()));
            }
            if iptables.chains.is_empty() {
                warn!("iptables: no chains configured, nothing will be collected");
            }
        }
        if let Some(pika) = &self.pika {
            for server in &pika.servers {
                parse_server_url(server)?;
            }
        }
        Ok(())
    }

    pub fn interval(&self) -> Option<Duration> {
        (self.interval_seconds > 0).then(|| Duration::from_secs(self.interval_seconds))
    }

    /// Build the collection targets for every enabled source
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` for an unparseable pika server URL.
    pub fn targets(&self) -> Result<Vec<Target>, ConfigError> {
        let timeout = Duration::from_secs(self.timeout_seconds);
        let mut targets = Vec::new();

        if let Some(megacli) = &self.megacli {
            let timeout = megacli.timeout_seconds.map(Duration::from_secs).unwrap_or(timeout);
            for gather in megacli.gather_types() {
                let driver: Arc<dyn FormatDriver> = Arc::from(gather.driver());
                let mut target = Target::new(format!("megacli {}", gather), megacli.path.as_str(), driver)
                    .with_args(gather.args().iter().map(|a| a.to_string()).collect())
                    .with_timeout(timeout)
                    .with_combined_output();
                if megacli.use_sudo {
                    target = target.with_sudo();
                }
                targets.push(target);
            }
        }

        if let Some(iptables) = &self.iptables {
            for chain in &iptables.chains {
                let driver = IptablesDriver::new(iptables.table.as_str(), chain.as_str(), iptables.mode());
                let args = driver.command_args(iptables.use_lock);
                let mut target = Target::new(
                    format!("{} {} {}", iptables.binary, iptables.table, chain),
                    iptables.binary.as_str(),
                    Arc::new(driver),
                )
                .with_args(args)
                .with_timeout(timeout);
                if iptables.use_sudo {
                    target = target.with_sudo();
                }
                targets.push(target);
            }
        }

        if let Some(pika) = &self.pika {
            let driver: Arc<dyn FormatDriver> = Arc::new(PikaInfoDriver::new());
            for server in &pika.servers {
                let mut address = parse_server_url(server)?;
                if let Some(password) = &pika.password {
                    address.password = Some(password.clone());
                }
                targets.push(
                    Target::new(
                        format!("pika {}:{}", address.host, address.port),
                        pika.cli_path.as_str(),
                        Arc::clone(&driver),
                    )
                    .with_args(address.info_args())
                    .with_timeout(timeout)
                    .with_base_tags(address.base_tags()),
                );
            }
        }

        info!("Configured {} collection targets", targets.len());
        Ok(targets)
    }
}
