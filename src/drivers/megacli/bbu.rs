use crate::drivers::FormatDriver;
use crate::error::ParseError;
use crate::parse::{
    Classifier, ContextRule, Conversion, ExtractionRule, Extractor, LineTag, Matcher, ParseOutput,
    Pick, SentinelScanner, Separator,
};
use crate::record::Tags;

pub const MEASUREMENT: &str = "megacli_bbu";

const ADAPTER_LINE: &str = "BBU status for Adapter";

const OPTIMAL: &[(&str, i64)] = &[("Optimal", 1)];
const COMPLETE: &[(&str, i64)] = &[("Complete", 1)];
const YES: &[(&str, i64)] = &[("Yes", 1)];

/// Battery status of `MegaCli -AdpBbuCmd -GetBbuStatus -aALL`
///
/// One record per adapter, opened by `BBU status for Adapter: N` and closed by
/// `isSOHGood:`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BbuDriver;

fn flag(table: &'static [(&'static str, i64)]) -> Conversion {
    Conversion::Lookup {
        table,
        default: 0,
        pick: Pick::Whole,
    }
}

fn scanner() -> SentinelScanner {
    SentinelScanner {
        measurement: MEASUREMENT,
        banner: ADAPTER_LINE,
        classifier: Classifier::new(Separator::Colon)
            .on(Matcher::KeyPrefix(ADAPTER_LINE), LineTag::RecordStart)
            .on(Matcher::KeyPrefix("isSOHGood"), LineTag::RecordEnd),
        extractor: Extractor::new(vec![
            ExtractionRule::tag("BatteryType", "type"),
            ExtractionRule::field("Battery State", "state", flag(OPTIMAL)),
            ExtractionRule::field("Relative State of Charge", "charge_relative", Conversion::Percent),
            ExtractionRule::field("Charger Status", "charge_status", flag(COMPLETE)),
            ExtractionRule::field("isSOHGood", "issohgood", flag(YES)),
        ]),
        context: ContextRule::StartValue,
        context_tag: "adapter",
        settled_by: None,
    }
}

impl FormatDriver for BbuDriver {
    fn name(&self) -> &'static str {
        MEASUREMENT
    }

    fn parse(&self, block: &str, base_tags: &Tags) -> Result<ParseOutput, ParseError> {
        scanner().scan(block, base_tags)
    }
}
