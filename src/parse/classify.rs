//! Line classification
//!
//! A [`Classifier`] holds an ordered transition table of line matchers. Each
//! raw line is tagged by the first matcher that accepts it; lines no matcher
//! claims are split on the active separator and become candidate
//! [`LineTag::RecordField`] lines. Classification depends only on the line and
//! the active section name.

use regex::Regex;

/// Classification tag of one line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineTag {
    SectionHeader,
    RecordStart,
    RecordField,
    RecordEnd,
    Ignorable,
    Unrecognized,
}

/// Key/value separator style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    /// `Label : value`, split on the first colon
    Colon,
    /// `label value`, split on the first space
    Space,
}

impl Separator {
    /// Split a line into untrimmed key and value at the first separator
    pub fn split(self, line: &str) -> Option<(&str, &str)> {
        match self {
            Separator::Colon => line.split_once(':'),
            Separator::Space => line.split_once(' '),
        }
    }
}

/// What a transition tests a line against
#[derive(Debug, Clone)]
pub enum Matcher {
    /// The key part (before the separator) starts with the text
    KeyPrefix(&'static str),
    /// The line itself starts with the text
    LinePrefix(&'static str),
    /// The line matches the pattern
    Pattern(Regex),
}

impl Matcher {
    fn matches(&self, text: &str, key: Option<&str>) -> bool {
        match self {
            Matcher::KeyPrefix(prefix) => key.is_some_and(|k| k.starts_with(prefix)),
            Matcher::LinePrefix(prefix) => text.starts_with(prefix),
            Matcher::Pattern(re) => re.is_match(text),
        }
    }
}

/// One row of a classifier's transition table
#[derive(Debug, Clone)]
pub struct Transition {
    pub matcher: Matcher,
    pub tag: LineTag,
}

impl Transition {
    pub fn new(matcher: Matcher, tag: LineTag) -> Self {
        Self { matcher, tag }
    }
}

/// Separator override for lines matching a pattern outside one section
#[derive(Debug, Clone)]
struct SeparatorOverride {
    pattern: Regex,
    separator: Separator,
    unless_section: &'static str,
}

/// A classified line borrowed from the captured block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    /// Line text with leading and trailing whitespace removed
    pub text: &'a str,
    pub tag: LineTag,
    /// Key part, present when the line splits on the active separator
    pub key: Option<&'a str>,
    /// Value part, present when the line splits on the active separator
    pub value: Option<&'a str>,
}

impl<'a> Line<'a> {
    /// Trimmed key, empty when the line has none
    pub fn key(&self) -> &'a str {
        self.key.map(str::trim).unwrap_or_default()
    }

    /// Trimmed value, empty when the line has none
    pub fn value(&self) -> &'a str {
        self.value.map(str::trim).unwrap_or_default()
    }
}

/// Ordered, data-driven line classifier for one source format
#[derive(Debug, Clone)]
pub struct Classifier {
    separator: Separator,
    overrides: Vec<SeparatorOverride>,
    transitions: Vec<Transition>,
}

impl Classifier {
    pub fn new(separator: Separator) -> Self {
        Self {
            separator,
            overrides: Vec::new(),
            transitions: Vec::new(),
        }
    }

    /// Append a transition; earlier transitions win
    pub fn on(mut self, matcher: Matcher, tag: LineTag) -> Self {
        self.transitions.push(Transition::new(matcher, tag));
        self
    }

    /// Use `separator` for lines matching `pattern`, except inside `unless_section`
    pub fn separator_when(
        mut self,
        pattern: Regex,
        separator: Separator,
        unless_section: &'static str,
    ) -> Self {
        self.overrides.push(SeparatorOverride {
            pattern,
            separator,
            unless_section,
        });
        self
    }

    fn separator_for(&self, text: &str, section: &str) -> Separator {
        self.overrides
            .iter()
            .find(|o| !section.eq_ignore_ascii_case(o.unless_section) && o.pattern.is_match(text))
            .map(|o| o.separator)
            .unwrap_or(self.separator)
    }

    /// Classify one raw line within the active section
    pub fn classify<'a>(&self, raw: &'a str, section: &str) -> Line<'a> {
        let text = raw.trim();
        if text.is_empty() {
            return Line {
                text,
                tag: LineTag::Ignorable,
                key: None,
                value: None,
            };
        }

        let split = self.separator_for(text, section).split(text);
        let key = split.map(|(k, _)| k);
        let value = split.map(|(_, v)| v);

        let tag = self
            .transitions
            .iter()
            .find(|t| t.matcher.matches(text, key))
            .map(|t| t.tag)
            .unwrap_or(if split.is_some() {
                LineTag::RecordField
            } else {
                LineTag::Unrecognized
            });

        Line {
            text,
            tag,
            key,
            value,
        }
    }
}
