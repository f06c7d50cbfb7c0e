/// Line classification by ordered transition tables
pub mod classify;

/// Extraction rules and the sentinel-bounded record scanner
pub mod extract;

pub use classify::{Classifier, Line, LineTag, Matcher, Separator};
pub use extract::{
    ContextRule, Conversion, ExtractionRule, Extractor, Pick, ScanState, SentinelScanner, Step,
};

use crate::error::FieldError;
use crate::record::Record;

/// Result of parsing one captured block
///
/// `field_errors` lists fields that were dropped from otherwise emitted records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseOutput {
    pub records: Vec<Record>,
    pub field_errors: Vec<FieldError>,
}

impl ParseOutput {
    pub fn extend(&mut self, other: ParseOutput) {
        self.records.extend(other.records);
        self.field_errors.extend(other.field_errors);
    }
}
