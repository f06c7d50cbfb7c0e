//! Record extraction
//!
//! [`Extractor`] applies a table of [`ExtractionRule`]s to classified lines and
//! writes tags and fields into the open record. [`SentinelScanner`] drives the
//! record lifecycle for formats whose records are bounded by start and end
//! sentinel lines, using the explicit [`transition`] table.

use super::classify::{Classifier, Line, LineTag};
use super::ParseOutput;
use crate::error::{FieldError, ParseError};
use crate::normalize::{normalize, parse_byte_size};
use crate::record::{RecordBuilder, Tags, Value};
use log::debug;
use regex::Regex;

/// Which part of the value an enumerated lookup inspects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pick {
    /// The whole trimmed value
    Whole,
    /// The first comma-separated item
    FirstItem,
    /// The leading word of the first comma-separated item
    FirstWord,
}

impl Pick {
    fn select(self, value: &str) -> &str {
        match self {
            Pick::Whole => value,
            Pick::FirstItem => value.split(',').next().unwrap_or_default().trim(),
            Pick::FirstWord => {
                let item = value.split(',').next().unwrap_or_default().trim();
                let end = item
                    .find(|c: char| !(c.is_alphanumeric() || c == '_'))
                    .unwrap_or(item.len());
                &item[..end]
            }
        }
    }
}

/// How a field's raw text becomes a typed value
#[derive(Debug, Clone)]
pub enum Conversion {
    /// Base-10 integer
    Integer,
    /// General scalar normalization
    Scalar,
    /// Byte quantity with a binary-prefixed unit
    ByteSize,
    /// Integer percentage, `%` stripped
    Percent,
    /// Float captured from the named group `value`
    FloatCapture(Regex),
    /// Case-insensitive string to integer table
    Lookup {
        table: &'static [(&'static str, i64)],
        default: i64,
        pick: Pick,
    },
    /// Fixed value regardless of the text
    Constant(i64),
}

impl Conversion {
    fn convert(&self, raw: &str) -> Result<Value, String> {
        match self {
            Conversion::Integer => raw
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|e| e.to_string()),
            Conversion::Scalar => Ok(normalize(raw)),
            Conversion::ByteSize => parse_byte_size(raw).map(Value::Int).map_err(|e| e.to_string()),
            Conversion::Percent => match normalize(raw.trim_end_matches('%')) {
                Value::Int(v) => Ok(Value::Int(v)),
                other => Err(format!("not an integer percentage: {}", other)),
            },
            Conversion::FloatCapture(re) => re
                .captures(raw)
                .and_then(|caps| caps.name("value"))
                .ok_or_else(|| format!("does not match {}", re.as_str()))?
                .as_str()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| e.to_string()),
            Conversion::Lookup {
                table,
                default,
                pick,
            } => {
                let picked = pick.select(raw);
                Ok(Value::Int(
                    table
                        .iter()
                        .find(|(name, _)| name.eq_ignore_ascii_case(picked))
                        .map(|(_, v)| *v)
                        .unwrap_or(*default),
                ))
            }
            Conversion::Constant(v) => Ok(Value::Int(*v)),
        }
    }
}

/// What a matching rule writes into the open record
#[derive(Debug, Clone)]
pub enum Action {
    /// Trimmed value as a tag
    Tag(&'static str),
    /// Converted value as a field
    Field(&'static str, Conversion),
    /// Named capture groups of the value as tags, written only when all match
    Captures(Regex, &'static [(&'static str, &'static str)]),
}

/// Maps lines whose key starts with `key` to tag or field writes
#[derive(Debug, Clone)]
pub struct ExtractionRule {
    pub key: &'static str,
    pub action: Action,
}

impl ExtractionRule {
    pub fn tag(key: &'static str, tag: &'static str) -> Self {
        Self {
            key,
            action: Action::Tag(tag),
        }
    }

    pub fn field(key: &'static str, field: &'static str, conversion: Conversion) -> Self {
        Self {
            key,
            action: Action::Field(field, conversion),
        }
    }

    pub fn captures(
        key: &'static str,
        pattern: Regex,
        groups: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self {
            key,
            action: Action::Captures(pattern, groups),
        }
    }
}

/// Ordered extraction rule table
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    rules: Vec<ExtractionRule>,
}

impl Extractor {
    pub fn new(rules: Vec<ExtractionRule>) -> Self {
        Self { rules }
    }

    /// Apply every rule matching the line's key
    ///
    /// Unconvertible values are reported in `errors` and left out of the
    /// record. Returns whether any rule matched.
    pub fn apply(&self, line: &Line, record: &mut RecordBuilder, errors: &mut Vec<FieldError>) -> bool {
        let Some(key) = line.key else {
            return false;
        };
        let value = line.value();
        let mut matched = false;

        for rule in self.rules.iter().filter(|r| key.starts_with(r.key)) {
            matched = true;
            match &rule.action {
                Action::Tag(name) => record.tag(*name, value),
                Action::Field(name, conversion) => match conversion.convert(value) {
                    Ok(v) => record.field(*name, v),
                    Err(reason) => {
                        debug!("Dropping field {} from {:?}: {}", name, value, reason);
                        errors.push(FieldError::new(*name, value, reason));
                    }
                },
                Action::Captures(re, groups) => {
                    let Some(caps) = re.captures(value) else {
                        debug!("No captures in {:?} for {}", value, re.as_str());
                        continue;
                    };
                    let found: Vec<(&str, &str)> = groups
                        .iter()
                        .filter_map(|(group, tag)| caps.name(group).map(|m| (*tag, m.as_str())))
                        .collect();
                    if found.len() == groups.len() {
                        for (tag, v) in found {
                            record.tag(tag, v);
                        }
                    }
                }
            }
        }

        matched
    }
}

/// Record lifecycle state of a sentinel-bounded scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Outside,
    Inside,
}

/// Effect of a line on the record lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Ignore,
    /// Update the side-channel context (adapter/controller id)
    Context,
    Open,
    /// Discard the unterminated open record and open a new one
    Reopen,
    Apply,
    /// Apply the line, then emit the record
    Close,
}

const TRANSITIONS: &[(ScanState, LineTag, ScanState, Step)] = &[
    (ScanState::Outside, LineTag::SectionHeader, ScanState::Outside, Step::Context),
    (ScanState::Inside, LineTag::SectionHeader, ScanState::Inside, Step::Context),
    (ScanState::Outside, LineTag::RecordStart, ScanState::Inside, Step::Open),
    (ScanState::Inside, LineTag::RecordStart, ScanState::Inside, Step::Reopen),
    (ScanState::Outside, LineTag::RecordField, ScanState::Outside, Step::Ignore),
    (ScanState::Inside, LineTag::RecordField, ScanState::Inside, Step::Apply),
    (ScanState::Outside, LineTag::RecordEnd, ScanState::Outside, Step::Ignore),
    (ScanState::Inside, LineTag::RecordEnd, ScanState::Outside, Step::Close),
];

/// Look up the next state and step for a line tag
///
/// Tags absent from the table (ignorable and unrecognized lines) keep the
/// state and do nothing.
pub fn transition(state: ScanState, tag: LineTag) -> (ScanState, Step) {
    TRANSITIONS
        .iter()
        .find(|(from, on, _, _)| *from == state && *on == tag)
        .map(|(_, _, to, step)| (*to, *step))
        .unwrap_or((state, Step::Ignore))
}

/// Where the adapter/controller identifier comes from
#[derive(Debug, Clone)]
pub enum ContextRule {
    /// Named group `id` of a pattern applied to section header lines
    Header(Regex),
    /// The value of the record start line
    StartValue,
}

/// Scanner for formats with one record between a start and an end sentinel
#[derive(Debug, Clone)]
pub struct SentinelScanner {
    pub measurement: &'static str,
    /// Text that must appear somewhere in the block
    pub banner: &'static str,
    pub classifier: Classifier,
    pub extractor: Extractor,
    pub context: ContextRule,
    /// Tag that receives the context value on each emitted record
    pub context_tag: &'static str,
    /// Key after which an open record counts as complete even if its end
    /// sentinel never follows; such a record is emitted at the next boundary
    pub settled_by: Option<&'static str>,
}

impl SentinelScanner {
    /// Scan a whole block and return the completed records
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Structural`] when the banner is missing or a
    /// context header cannot be decoded. No records are returned in that case.
    pub fn scan(&self, block: &str, base_tags: &Tags) -> Result<ParseOutput, ParseError> {
        if !block.contains(self.banner) {
            return Err(ParseError::Structural(format!(
                "{}: missing {:?} banner",
                self.measurement, self.banner
            )));
        }

        let mut output = ParseOutput::default();
        let mut state = ScanState::Outside;
        let mut record = RecordBuilder::with_tags(base_tags);
        let mut context: Option<String> = None;
        let mut settled = false;

        for raw in block.lines() {
            let line = self.classifier.classify(raw, "");
            let (mut next, step) = transition(state, line.tag);

            match step {
                Step::Ignore => {}
                Step::Context => {
                    if settled {
                        self.emit(&mut record, context.as_deref(), base_tags, &mut output);
                        settled = false;
                        next = ScanState::Outside;
                    }
                    context = Some(self.header_context(&line)?);
                }
                Step::Open | Step::Reopen => {
                    if step == Step::Reopen {
                        if settled {
                            self.emit(&mut record, context.as_deref(), base_tags, &mut output);
                        } else {
                            debug!(
                                "{}: discarding unterminated record at {:?}",
                                self.measurement, line.text
                            );
                        }
                    }
                    record = RecordBuilder::with_tags(base_tags);
                    settled = false;
                    if let ContextRule::StartValue = self.context {
                        context = Some(line.value().to_string());
                    }
                    self.extractor.apply(&line, &mut record, &mut output.field_errors);
                }
                Step::Apply => {
                    self.extractor.apply(&line, &mut record, &mut output.field_errors);
                    if self.settled_by.is_some_and(|key| line.key().starts_with(key)) {
                        settled = true;
                    }
                }
                Step::Close => {
                    self.extractor.apply(&line, &mut record, &mut output.field_errors);
                    self.emit(&mut record, context.as_deref(), base_tags, &mut output);
                    settled = false;
                }
            }
            state = next;
        }

        if state == ScanState::Inside {
            if settled {
                self.emit(&mut record, context.as_deref(), base_tags, &mut output);
            } else {
                debug!("{}: dropping unterminated record at end of input", self.measurement);
            }
        }
        Ok(output)
    }

    fn emit(&self, record: &mut RecordBuilder, context: Option<&str>, base_tags: &Tags, output: &mut ParseOutput) {
        if let Some(id) = context {
            record.tag(self.context_tag, id);
        }
        let done = std::mem::replace(record, RecordBuilder::with_tags(base_tags));
        output.records.push(done.finish(self.measurement));
    }

    fn header_context(&self, line: &Line) -> Result<String, ParseError> {
        match &self.context {
            ContextRule::Header(re) => re
                .captures(line.text)
                .and_then(|caps| caps.name("id"))
                .map(|m| m.as_str().to_string())
                .ok_or_else(|| {
                    ParseError::Structural(format!(
                        "{}: cannot match adapter number in {:?}",
                        self.measurement, line.text
                    ))
                }),
            ContextRule::StartValue => Ok(line.value().to_string()),
        }
    }
}
