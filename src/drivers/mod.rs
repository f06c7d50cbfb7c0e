/// MegaCli RAID controller listings (logical drives, disks, batteries)
pub mod megacli;

/// Packet-filter counter listings
pub mod iptables;

/// Pika/redis-family `INFO` dumps
pub mod pika;

pub use iptables::{IptablesDriver, ListingMode};
pub use megacli::{BbuDriver, DiskDriver, GatherType, RaidDriver};
pub use pika::PikaInfoDriver;

use crate::error::ParseError;
use crate::parse::ParseOutput;
use crate::record::Tags;

/// A parser for one source format
///
/// Drivers are pure: the same block and base tags always produce the same
/// output, so one instance can be shared between concurrently collected
/// targets.
pub trait FormatDriver: Send + Sync {
    /// Name used in logs and by the offline replay command
    fn name(&self) -> &'static str;

    /// Parse one captured block into records
    ///
    /// # Arguments
    ///
    /// * `block` - Full captured text of one command or response
    /// * `base_tags` - Tags copied onto every emitted record
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when the block's structure cannot be recognized.
    /// Unparseable individual fields are reported in
    /// [`ParseOutput::field_errors`] instead.
    fn parse(&self, block: &str, base_tags: &Tags) -> Result<ParseOutput, ParseError>;
}

/// Names accepted by [`by_name`]
pub const DRIVER_NAMES: &[&str] = &["raid", "disk", "bbu", "iptables-rules", "iptables-chain", "pika"];

/// Look up a driver by its replay name
///
/// The packet-filter drivers need the table and chain the block was listed
/// from; other drivers ignore them.
pub fn by_name(name: &str, table: &str, chain: &str) -> Option<Box<dyn FormatDriver>> {
    let driver: Box<dyn FormatDriver> = match name {
        "raid" => Box::new(RaidDriver),
        "disk" => Box::new(DiskDriver),
        "bbu" => Box::new(BbuDriver),
        "iptables-rules" => Box::new(IptablesDriver::new(table, chain, ListingMode::Rules)),
        "iptables-chain" => Box::new(IptablesDriver::new(table, chain, ListingMode::Chain)),
        "pika" => Box::new(PikaInfoDriver::new()),
        _ => return None,
    };
    Some(driver)
}
