use crate::drivers::FormatDriver;
use crate::error::ParseError;
use crate::parse::{
    Classifier, ContextRule, Conversion, ExtractionRule, Extractor, LineTag, Matcher, ParseOutput,
    Pick, SentinelScanner, Separator,
};
use crate::record::Tags;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

pub const MEASUREMENT: &str = "megacli_raid";

const BANNER: &str = "Virtual Drive Information";

/// End sentinel emitted by newer tool versions, after `Bad Blocks Exist`
pub const HOT_SPARES_SENTINEL: &str = "Number of Dedicated Hot Spares";

/// End sentinel of older tool versions
pub const BAD_BLOCKS_SENTINEL: &str = "Bad Blocks Exist";

static ADAPTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"Adapter\s+(?P<id>\d+)\s+--").unwrap());
// `Adapter N -- ...` section headers; status lines such as
// `Adapter 1: No Virtual Drive Configured.` are not headers
static ADAPTER_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Adapter\s+\S+\s+--").unwrap());
static VIRTUAL_DRIVE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?P<num>\d+)").unwrap());
static RAID_LEVEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"Primary-(?P<primary>\d+),\s*Secondary-(?P<secondary>\d+),\s*RAID Level Qualifier-(?P<qualifier>\d+)",
    )
    .unwrap()
});

const STATES: &[(&str, i64)] = &[("Optimal", 1), ("Degraded", 2), ("Offline", 3)];
const CACHE_POLICIES: &[(&str, i64)] = &[("WriteBack", 1), ("WriteThrough", 2)];
const BAD_BLOCKS: &[(&str, i64)] = &[("No", 0)];

/// Logical drive listing of `MegaCli -LDInfo -LALL -aAll`
#[derive(Debug, Clone, Copy, Default)]
pub struct RaidDriver;

/// Pick the record end sentinel for a block
///
/// The hot-spares line closes records whenever the tool prints it; otherwise
/// `Bad Blocks Exist` does. In the hot-spares layout a drive that reached
/// `Bad Blocks Exist` is complete and is emitted at the next drive or adapter
/// even when no hot-spares line follows it.
///
/// # Errors
///
/// Returns [`ParseError::Sentinel`] when neither line is present.
pub fn end_sentinel(block: &str) -> Result<&'static str, ParseError> {
    if block.contains(HOT_SPARES_SENTINEL) {
        Ok(HOT_SPARES_SENTINEL)
    } else if block.contains(BAD_BLOCKS_SENTINEL) {
        Ok(BAD_BLOCKS_SENTINEL)
    } else {
        Err(ParseError::Sentinel(format!(
            "{}: neither {:?} nor {:?} present",
            MEASUREMENT, HOT_SPARES_SENTINEL, BAD_BLOCKS_SENTINEL
        )))
    }
}

fn scanner(end: &'static str) -> SentinelScanner {
    SentinelScanner {
        measurement: MEASUREMENT,
        banner: BANNER,
        classifier: Classifier::new(Separator::Colon)
            .on(Matcher::Pattern(ADAPTER_HEADER.clone()), LineTag::SectionHeader)
            .on(Matcher::KeyPrefix("Virtual Drive"), LineTag::RecordStart)
            .on(Matcher::KeyPrefix(end), LineTag::RecordEnd),
        extractor: Extractor::new(vec![
            ExtractionRule::captures("Virtual Drive", VIRTUAL_DRIVE.clone(), &[("num", "virtual_drive")]),
            ExtractionRule::field("Virtual Drive", "hotspares_num", Conversion::Constant(0)),
            ExtractionRule::captures(
                "RAID Level",
                RAID_LEVEL.clone(),
                &[
                    ("primary", "level_primary"),
                    ("secondary", "level_secondary"),
                    ("qualifier", "level_qualifier"),
                ],
            ),
            ExtractionRule::field("Size", "size", Conversion::ByteSize),
            ExtractionRule::field("Sector Size", "sector_size", Conversion::Integer),
            ExtractionRule::field("Parity Size", "parity_size", Conversion::ByteSize),
            ExtractionRule::field(
                "State",
                "state",
                Conversion::Lookup {
                    table: STATES,
                    default: 0,
                    pick: Pick::Whole,
                },
            ),
            ExtractionRule::field("Strip Size", "strip_size", Conversion::ByteSize),
            ExtractionRule::field("Number Of Drives", "drives_cnt", Conversion::Integer),
            ExtractionRule::field(
                "Current Cache Policy",
                "cache_policy",
                Conversion::Lookup {
                    table: CACHE_POLICIES,
                    default: 0,
                    pick: Pick::FirstItem,
                },
            ),
            ExtractionRule::field(
                "Bad Blocks Exist",
                "exist_bad_blocks",
                Conversion::Lookup {
                    table: BAD_BLOCKS,
                    default: 1,
                    pick: Pick::Whole,
                },
            ),
            ExtractionRule::field(HOT_SPARES_SENTINEL, "hotspares_num", Conversion::Integer),
        ]),
        context: ContextRule::Header(ADAPTER.clone()),
        context_tag: "adapter",
        // a drive without dedicated spares prints no hot-spares line
        settled_by: (end == HOT_SPARES_SENTINEL).then_some(BAD_BLOCKS_SENTINEL),
    }
}

impl FormatDriver for RaidDriver {
    fn name(&self) -> &'static str {
        MEASUREMENT
    }

    fn parse(&self, block: &str, base_tags: &Tags) -> Result<ParseOutput, ParseError> {
        if !block.contains(BANNER) {
            return Err(ParseError::Structural(format!(
                "{}: missing {:?} banner",
                MEASUREMENT, BANNER
            )));
        }
        let end = end_sentinel(block)?;
        debug!("{}: records end at {:?}", MEASUREMENT, end);
        scanner(end).scan(block, base_tags)
    }
}
