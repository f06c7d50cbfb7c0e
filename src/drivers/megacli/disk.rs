use crate::drivers::FormatDriver;
use crate::error::ParseError;
use crate::parse::{
    Classifier, ContextRule, Conversion, ExtractionRule, Extractor, LineTag, Matcher, ParseOutput,
    Pick, SentinelScanner, Separator,
};
use crate::record::Tags;
use once_cell::sync::Lazy;
use regex::Regex;

pub const MEASUREMENT: &str = "megacli_disk";

static ADAPTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"Adapter\s+#(?P<id>\d+)").unwrap());
static RAW_SIZE_GB: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?P<value>\d+(?:\.\d+)?)\s*GB").unwrap());

const FIRMWARE_STATES: &[(&str, i64)] = &[
    ("Failed", -1),
    ("Unconfigured", 0),
    ("Online", 1),
    ("Rebuild", 2),
    ("Hotspare", 3),
];
const LOCKED: &[(&str, i64)] = &[("Unlocked", 0)];
const PORT_STATUS: &[(&str, i64)] = &[("Active", 1)];

/// Physical disk listing of `MegaCli -PDList -aALL`
///
/// Each disk ends with the `Drive has flagged a S.M.A.R.T alert` line. The raw
/// size is reported in GB as printed, not converted to bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskDriver;

fn scanner() -> SentinelScanner {
    SentinelScanner {
        measurement: MEASUREMENT,
        banner: "Enclosure Device ID",
        classifier: Classifier::new(Separator::Colon)
            .on(Matcher::LinePrefix("Adapter #"), LineTag::SectionHeader)
            .on(Matcher::KeyPrefix("Enclosure Device ID"), LineTag::RecordStart)
            .on(Matcher::KeyPrefix("Drive has flagged"), LineTag::RecordEnd),
        extractor: Extractor::new(vec![
            ExtractionRule::tag("Enclosure Device ID", "en_deviceid"),
            ExtractionRule::tag("Enclosure position", "en_position"),
            ExtractionRule::tag("Slot Number", "slot"),
            ExtractionRule::field("Media Error Count", "error_media_cnt", Conversion::Integer),
            ExtractionRule::field("Other Error Count", "error_other_cnt", Conversion::Integer),
            ExtractionRule::field(
                "Predictive Failure Count",
                "error_prefailure_cnt",
                Conversion::Integer,
            ),
            ExtractionRule::field(
                "Last Predictive Failure Event Seq Number",
                "last_prefailure_seq",
                Conversion::Integer,
            ),
            ExtractionRule::tag("PD Type", "type"),
            ExtractionRule::field(
                "Raw Size",
                "size_gb",
                Conversion::FloatCapture(RAW_SIZE_GB.clone()),
            ),
            ExtractionRule::field(
                "Firmware state",
                "state",
                Conversion::Lookup {
                    table: FIRMWARE_STATES,
                    default: 9,
                    pick: Pick::FirstWord,
                },
            ),
            ExtractionRule::field(
                "Locked",
                "islocked",
                Conversion::Lookup {
                    table: LOCKED,
                    default: 1,
                    pick: Pick::Whole,
                },
            ),
            ExtractionRule::field(
                "Port status",
                "port_status",
                Conversion::Lookup {
                    table: PORT_STATUS,
                    default: 0,
                    pick: Pick::Whole,
                },
            ),
        ]),
        context: ContextRule::Header(ADAPTER.clone()),
        context_tag: "adapter",
        settled_by: None,
    }
}

impl FormatDriver for DiskDriver {
    fn name(&self) -> &'static str {
        MEASUREMENT
    }

    fn parse(&self, block: &str, base_tags: &Tags) -> Result<ParseOutput, ParseError> {
        scanner().scan(block, base_tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Value;

    const PDLIST: &str = "

Adapter #0

Enclosure Device ID: 32
Slot Number: 0
Drive's position: DiskGroup: 0, Span: 0, Arm: 0
Enclosure position: 1
Device Id: 0
WWN: 55cd2e415316012a
Sequence Number: 2
Media Error Count: 0
Other Error Count: 0
Predictive Failure Count: 0
Last Predictive Failure Event Seq Number: 0
PD Type: SATA

Raw Size: 894.252 GB [0x6fc81ab0 Sectors]
Non Coerced Size: 893.752 GB [0x6fb81ab0 Sectors]
Coerced Size: 893.75 GB [0x6fb80000 Sectors]
Sector Size:  512
Logical Sector Size:  512
Physical Sector Size:  4096
Firmware state: Online, Spun Up
Device Firmware Level: DL69
Shield Counter: 0
Successful diagnostics completion on :  N/A
SAS Address(0): 0x4433221104000000
Connected Port Number: 2(path0)
Inquiry Data: PHYG045501DG960CGN  SSDSC2KG960G8R                          XCV1DL69
FDE Capable: Not Capable
FDE Enable: Disable
Secured: Unsecured
Locked: Unlocked
Needs EKM Attention: No
Foreign State: None
Device Speed: 6.0Gb/s
Link Speed: 6.0Gb/s
Media Type: Solid State Device
Drive Temperature :22C (71.60 F)
PI Eligibility:  No
Drive is formatted for PI information:  No
PI: No PI
Drive's NCQ setting : N/A
Port-0 :
Port status: Active
Port's Linkspeed: 6.0Gb/s
Drive has flagged a S.M.A.R.T alert : No



Exit Code: 0x00
";

    #[test]
    fn test_parse_single_disk() {
        let out = DiskDriver.parse(PDLIST, &Tags::new()).unwrap();
        assert_eq!(out.records.len(), 1);
        let disk = &out.records[0];

        assert_eq!(disk.measurement, "megacli_disk");
        assert_eq!(disk.tag("adapter"), Some("0"));
        assert_eq!(disk.tag("en_deviceid"), Some("32"));
        assert_eq!(disk.tag("en_position"), Some("1"));
        assert_eq!(disk.tag("slot"), Some("0"));
        assert_eq!(disk.tag("type"), Some("SATA"));

        assert_eq!(disk.field("error_media_cnt"), Some(&Value::Int(0)));
        assert_eq!(disk.field("error_other_cnt"), Some(&Value::Int(0)));
        assert_eq!(disk.field("error_prefailure_cnt"), Some(&Value::Int(0)));
        assert_eq!(disk.field("last_prefailure_seq"), Some(&Value::Int(0)));
        assert_eq!(disk.field("size_gb"), Some(&Value::Float(894.252)));
        assert_eq!(disk.field("state"), Some(&Value::Int(1)));
        assert_eq!(disk.field("islocked"), Some(&Value::Int(0)));
        assert_eq!(disk.field("port_status"), Some(&Value::Int(1)));
        assert_eq!(disk.fields.len(), 8);
    }

    #[test]
    fn test_record_count_matches_sentinels() {
        let second = PDLIST
            .replace("Slot Number: 0", "Slot Number: 1")
            .replace("Firmware state: Online, Spun Up", "Firmware state: Unconfigured(good), Spun Up")
            .replace("Adapter #0", "Adapter #1");
        let block = format!("{}{}", PDLIST, second);
        let out = DiskDriver.parse(&block, &Tags::new()).unwrap();

        let sentinels = block.matches("Drive has flagged a S.M.A.R.T alert").count();
        assert_eq!(out.records.len(), sentinels);
        assert_eq!(out.records[1].tag("adapter"), Some("1"));
        assert_eq!(out.records[1].tag("slot"), Some("1"));
        assert_eq!(out.records[1].field("state"), Some(&Value::Int(0)));
    }

    #[test]
    fn test_unknown_firmware_state_and_bad_raw_size() {
        let block = "Adapter #2\nEnclosure Device ID: 8\nRaw Size: unknown\nFirmware state: Copyback\nLocked: Locked\nPort status: Failed\nDrive has flagged a S.M.A.R.T alert : Yes\n";
        let out = DiskDriver.parse(block, &Tags::new()).unwrap();
        let disk = &out.records[0];
        assert_eq!(disk.field("state"), Some(&Value::Int(9)));
        assert_eq!(disk.field("islocked"), Some(&Value::Int(1)));
        assert_eq!(disk.field("port_status"), Some(&Value::Int(0)));
        assert!(disk.field("size_gb").is_none());
        assert_eq!(out.field_errors.len(), 1);
    }

    #[test]
    fn test_truncated_disk_is_dropped() {
        let block = "Adapter #0\nEnclosure Device ID: 32\nSlot Number: 0\nMedia Error Count: 3\n";
        let out = DiskDriver.parse(block, &Tags::new()).unwrap();
        assert!(out.records.is_empty());
    }

    #[test]
    fn test_missing_banner() {
        let err = DiskDriver.parse("Adapter #0\nExit Code: 0x01\n", &Tags::new()).unwrap_err();
        assert!(matches!(err, ParseError::Structural(_)));
    }
}
