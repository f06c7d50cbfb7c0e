//! Scalar normalization of human-formatted values
//!
//! Tool output mixes plain numbers with percentages, yes/no words and byte
//! sizes such as `164.0 GB`. [`normalize`] turns a scalar into the narrowest
//! typed [`Value`] it can; [`parse_byte_size`] is the strict path for fields
//! that are declared to be sizes.

use crate::error::ByteSizeError;
use crate::record::Value;

const KILOBYTE: f64 = 1024.0;
const MEGABYTE: f64 = KILOBYTE * 1024.0;
const GIGABYTE: f64 = MEGABYTE * 1024.0;
const TERABYTE: f64 = GIGABYTE * 1024.0;
const PETABYTE: f64 = TERABYTE * 1024.0;
const EXABYTE: f64 = PETABYTE * 1024.0;

/// Normalize a scalar string into a typed value
///
/// Rules, applied in order:
/// 1. a single trailing `%` is stripped
/// 2. `Yes`/`No` (any case) become `1`/`0`
/// 3. base-10 integers become [`Value::Int`]
/// 4. finite floats become [`Value::Float`]
/// 5. anything else is returned as the trimmed string
///
/// Never fails: malformed input degrades to [`Value::Str`].
pub fn normalize(raw: &str) -> Value {
    let trimmed = raw.trim();
    let val = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();

    if val.eq_ignore_ascii_case("yes") {
        return Value::Int(1);
    }
    if val.eq_ignore_ascii_case("no") {
        return Value::Int(0);
    }

    if let Ok(ival) = val.parse::<i64>() {
        return Value::Int(ival);
    }

    match val.parse::<f64>() {
        Ok(fval) if fval.is_finite() => Value::Float(fval),
        _ => Value::Str(trimmed.to_string()),
    }
}

/// Parse a byte quantity such as `164.0 GB`, `64 KB` or `2TiB` into bytes
///
/// Binary and SI-looking prefixes both mean base-2 multiples:
/// `K = KB = KiB = 1024`, `M = MB = MiB = 1024 K`, and so on up to `E`.
/// Units are case-insensitive and may be separated from the number by spaces.
///
/// # Errors
///
/// Returns [`ByteSizeError`] when the unit is absent or unknown, when the
/// number part is not a non-negative number, or when the result overflows.
pub fn parse_byte_size(raw: &str) -> Result<i64, ByteSizeError> {
    let compact: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase();

    let unit_start = compact
        .find(|c: char| c.is_ascii_alphabetic())
        .ok_or_else(|| ByteSizeError::MissingUnit(raw.trim().to_string()))?;
    let (number, unit) = compact.split_at(unit_start);

    let quantity: f64 = number
        .parse()
        .map_err(|_| ByteSizeError::InvalidNumber(raw.trim().to_string()))?;
    if !quantity.is_finite() || quantity < 0.0 {
        return Err(ByteSizeError::InvalidNumber(raw.trim().to_string()));
    }

    let multiple = match unit {
        "B" => 1.0,
        "K" | "KB" | "KIB" => KILOBYTE,
        "M" | "MB" | "MIB" => MEGABYTE,
        "G" | "GB" | "GIB" => GIGABYTE,
        "T" | "TB" | "TIB" => TERABYTE,
        "P" | "PB" | "PIB" => PETABYTE,
        "E" | "EB" | "EIB" => EXABYTE,
        _ => return Err(ByteSizeError::UnknownUnit(raw.trim().to_string())),
    };

    let bytes = quantity * multiple;
    if bytes >= i64::MAX as f64 {
        return Err(ByteSizeError::Overflow(raw.trim().to_string()));
    }
    Ok(bytes as i64)
}
