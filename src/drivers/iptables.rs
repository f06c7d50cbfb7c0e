//! Packet-filter chain listings
//!
//! Two output shapes are supported. In [`ListingMode::Rules`] the verbose
//! numeric listing (`-nvL CHAIN -x`) yields one record per commented rule with
//! its packet and byte counters. In [`ListingMode::Chain`] the rule-spec listing
//! (`-S CHAIN`) is summarized into a single record per chain: a checksum of the
//! listing, the rule count and, for the `filter` table, indicator fields telling
//! whether the chain ends in a DROP or REJECT rule.

use crate::drivers::FormatDriver;
use crate::error::{FieldError, ParseError};
use crate::parse::{Classifier, LineTag, Matcher, ParseOutput, Separator};
use crate::record::{RecordBuilder, Tags};
use crc::{Algorithm, Crc};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const MEASUREMENT: &str = "iptables";

/// CRC-32 with the reversed Koopman polynomial `0xD5828281`
pub const CRC_32_KOOPMAN_REFLECTED: Algorithm<u32> = Algorithm {
    width: 32,
    poly: 0x814141ab,
    init: 0xffffffff,
    refin: true,
    refout: true,
    xorout: 0xffffffff,
    check: 0xa9cc8179,
    residue: 0x4ac2a509,
};

const KOOPMAN: Crc<u32> = Crc::<u32>::new(&CRC_32_KOOPMAN_REFLECTED);

static FIELDS_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*pkts\s+bytes\s+target").unwrap());
static VALUES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?P<pkts>\d+)\s+(?P<bytes>\d+)\s+(?P<target>\w+).*?/\*\s*(?P<comment>.+?)\s*\*/\s*")
        .unwrap()
});

/// Where an indicator pattern is tested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    AnyLine,
    LastLine,
}

struct Indicator {
    chain: &'static str,
    field: &'static str,
    scope: Scope,
    pattern: Regex,
}

impl Indicator {
    fn new(chain: &'static str, field: &'static str, scope: Scope, pattern: &str) -> Self {
        Self {
            chain,
            field,
            scope,
            pattern: Regex::new(pattern).unwrap(),
        }
    }
}

/// Indicator fields reported for chains of the `filter` table
static FILTER_INDICATORS: Lazy<Vec<Indicator>> = Lazy::new(|| {
    vec![
        Indicator::new("INPUT", "is_state", Scope::AnyLine, r"^-A\s+INPUT\s+-m\s+state\s+"),
        Indicator::new("INPUT", "is_drop", Scope::LastLine, r"^-A\s+INPUT\s+.*-j\s+DROP"),
        Indicator::new("INPUT", "is_reject", Scope::LastLine, r"^-A\s+INPUT\s+.*-j\s+REJECT"),
        Indicator::new("FORWARD", "is_drop", Scope::LastLine, r"^-A\s+FORWARD\s+.*-j\s+DROP"),
        Indicator::new("FORWARD", "is_reject", Scope::LastLine, r"^-A\s+FORWARD\s+.*-j\s+REJECT"),
    ]
});

/// Which listing the driver parses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingMode {
    /// Per-rule counters from `-nvL CHAIN -x`
    Rules,
    /// Per-chain summary from `-S CHAIN`
    Chain,
}

/// Checksum of a whole listing; zero for empty input
pub fn checksum(block: &str) -> u32 {
    if block.is_empty() {
        return 0;
    }
    KOOPMAN.checksum(block.as_bytes())
}

/// Parser for the listing of one chain of one table
#[derive(Debug, Clone)]
pub struct IptablesDriver {
    table: String,
    chain: String,
    mode: ListingMode,
    classifier: Classifier,
}

impl IptablesDriver {
    pub fn new(table: impl Into<String>, chain: impl Into<String>, mode: ListingMode) -> Self {
        Self {
            table: table.into(),
            chain: chain.into(),
            mode,
            classifier: Classifier::new(Separator::Space)
                .on(Matcher::Pattern(FIELDS_HEADER.clone()), LineTag::SectionHeader)
                .on(Matcher::Pattern(VALUES.clone()), LineTag::RecordEnd),
        }
    }

    pub fn mode(&self) -> ListingMode {
        self.mode
    }

    /// Arguments passed to the iptables binary for this chain
    ///
    /// `use_lock` adds `-w 5` so the call waits for the xtables lock.
    pub fn command_args(&self, use_lock: bool) -> Vec<String> {
        let mut args: Vec<String> = Vec::new();
        if use_lock {
            args.extend(["-w".to_string(), "5".to_string()]);
        }
        match self.mode {
            ListingMode::Rules => args.extend([
                "-nvL".to_string(),
                self.chain.clone(),
                "-t".to_string(),
                self.table.clone(),
                "-x".to_string(),
            ]),
            ListingMode::Chain => args.extend([
                "-S".to_string(),
                self.chain.clone(),
                "-t".to_string(),
                self.table.clone(),
            ]),
        }
        args
    }

    fn parse_rules(&self, block: &str, base_tags: &Tags) -> Result<ParseOutput, ParseError> {
        let lines: Vec<&str> = block.lines().collect();
        let mut output = ParseOutput::default();
        if lines.len() < 3 {
            debug!("{} {}: no rules listed", self.table, self.chain);
            return Ok(output);
        }
        if self.classifier.classify(lines[1], "").tag != LineTag::SectionHeader {
            return Err(ParseError::Structural(format!(
                "{} {}: second line is not the pkts/bytes/target header: {:?}",
                self.table, self.chain, lines[1]
            )));
        }

        for raw in &lines[2..] {
            if self.classifier.classify(raw, "").tag != LineTag::RecordEnd {
                continue;
            }
            let Some(caps) = VALUES.captures(raw) else {
                continue;
            };

            let mut record = RecordBuilder::with_tags(base_tags);
            record.tag("table", self.table.as_str());
            record.tag("chain", self.chain.as_str());
            record.tag("target", &caps["target"]);
            record.tag("ruleid", &caps["comment"]);

            for name in ["pkts", "bytes"] {
                let raw_count = &caps[name];
                match raw_count.parse::<i64>() {
                    Ok(count) => record.field(name, count),
                    Err(e) => {
                        debug!("Dropping field {} from {:?}: {}", name, raw_count, e);
                        output
                            .field_errors
                            .push(FieldError::new(name, raw_count, e.to_string()));
                    }
                }
            }
            output.records.push(record.finish(MEASUREMENT));
        }

        Ok(output)
    }

    fn parse_chain(&self, block: &str, base_tags: &Tags) -> ParseOutput {
        let lines: Vec<&str> = block
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();

        let mut record = RecordBuilder::with_tags(base_tags);
        record.tag("table", self.table.as_str());
        record.tag("chain", self.chain.to_lowercase());
        record.field("total_rules", lines.len() as i64);
        record.field("checksum", i64::from(checksum(block)));

        if self.table == "filter" {
            // the trailing line only counts when it is a rule or policy line
            let last = lines.last().copied().filter(|l| l.starts_with('-'));
            for indicator in FILTER_INDICATORS.iter().filter(|i| i.chain == self.chain) {
                let hit = match indicator.scope {
                    Scope::AnyLine => lines.iter().any(|l| indicator.pattern.is_match(l)),
                    Scope::LastLine => match last {
                        Some(line) => indicator.pattern.is_match(line),
                        None => {
                            debug!(
                                "{} {}: no trailing rule, omitting {}",
                                self.table, self.chain, indicator.field
                            );
                            continue;
                        }
                    },
                };
                record.field(indicator.field, i64::from(hit));
            }
        }

        ParseOutput {
            records: vec![record.finish(MEASUREMENT)],
            field_errors: Vec::new(),
        }
    }
}

impl FormatDriver for IptablesDriver {
    fn name(&self) -> &'static str {
        MEASUREMENT
    }

    fn parse(&self, block: &str, base_tags: &Tags) -> Result<ParseOutput, ParseError> {
        match self.mode {
            ListingMode::Rules => self.parse_rules(block, base_tags),
            ListingMode::Chain => Ok(self.parse_chain(block, base_tags)),
        }
    }
}
