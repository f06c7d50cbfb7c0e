//! Declared field types and cross-type coercion
//!
//! Some sources report the same field as `No` in one version and `0` or `0.0`
//! in another. A [`Schema`] is an ordered table of `(name, type, conversion)`
//! entries built once; [`Schema::apply`] forces every known field to its
//! declared type. Fields the schema does not list pass through untouched.

use crate::error::{CoerceError, FieldError};
use crate::record::{Fields, Value};
use log::debug;

/// Canonical output type of a declared field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Integer,
    Float,
    String,
}

impl FieldType {
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::String => "string",
        }
    }

    fn converter(&self) -> ConvertFn {
        match self {
            FieldType::Integer => to_integer,
            FieldType::Float => to_float,
            FieldType::String => to_string,
        }
    }
}

/// Conversion applied to a field's normalized value
pub type ConvertFn = fn(&Value) -> Result<Value, CoerceError>;

/// Declared type of one known field
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub target: FieldType,
    convert: ConvertFn,
}

impl FieldSpec {
    pub fn new(name: &'static str, target: FieldType) -> Self {
        Self {
            name,
            target,
            convert: target.converter(),
        }
    }

    pub fn convert(&self, value: &Value) -> Result<Value, CoerceError> {
        (self.convert)(value)
    }
}

/// Ordered table of declared field types for one driver
#[derive(Debug, Clone, Default)]
pub struct Schema {
    specs: Vec<FieldSpec>,
}

impl Schema {
    pub fn new(entries: &[(&'static str, FieldType)]) -> Self {
        Self {
            specs: entries
                .iter()
                .map(|(name, target)| FieldSpec::new(name, *target))
                .collect(),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&FieldSpec> {
        self.specs.iter().find(|spec| spec.name == name)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Force every declared field to its declared type
    ///
    /// Fields that cannot be coerced are dropped and reported; the remaining
    /// fields are returned.
    pub fn apply(&self, fields: Fields) -> (Fields, Vec<FieldError>) {
        let mut out = Fields::new();
        let mut errors = Vec::new();

        for (name, value) in fields {
            let Some(spec) = self.lookup(&name) else {
                out.insert(name, value);
                continue;
            };
            match spec.convert(&value) {
                Ok(converted) => {
                    out.insert(name, converted);
                }
                Err(e) => {
                    debug!("Dropping field {}: {}", name, e);
                    errors.push(FieldError::new(name, value.to_string(), e.to_string()));
                }
            }
        }

        (out, errors)
    }
}

/// Coerce a value to the given target type
pub fn coerce(value: &Value, target: FieldType) -> Result<Value, CoerceError> {
    (target.converter())(value)
}

fn to_integer(value: &Value) -> Result<Value, CoerceError> {
    match value {
        Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
        Value::Int(i) => Ok(Value::Int(*i)),
        Value::Float(f) => Ok(Value::Int(f.trunc() as i64)),
        Value::Str(s) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| CoerceError {
            value: s.clone(),
            target: FieldType::Integer.name(),
        }),
    }
}

fn to_float(value: &Value) -> Result<Value, CoerceError> {
    match value {
        Value::Bool(b) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
        Value::Int(i) => Ok(Value::Float(*i as f64)),
        Value::Float(f) => Ok(Value::Float(*f)),
        Value::Str(s) => match s.trim().parse::<f64>() {
            Ok(f) if f.is_finite() => Ok(Value::Float(f)),
            _ => Err(CoerceError {
                value: s.clone(),
                target: FieldType::Float.name(),
            }),
        },
    }
}

fn to_string(value: &Value) -> Result<Value, CoerceError> {
    Ok(Value::Str(match value {
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => format!("{:.6}", f),
        Value::Str(s) => s.clone(),
    }))
}


// Property-based tests
#[cfg(test)]
mod property_tests {
    use super::*;
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;

    #[derive(Debug, Clone)]
    struct AnyType(FieldType);

    impl Arbitrary for AnyType {
        fn arbitrary(g: &mut Gen) -> Self {
            AnyType(*g.choose(&[FieldType::Integer, FieldType::Float, FieldType::String]).unwrap())
        }
    }

    fn has_type(value: &Value, target: FieldType) -> bool {
        matches!(
            (value, target),
            (Value::Int(_), FieldType::Integer)
                | (Value::Float(_), FieldType::Float)
                | (Value::Str(_), FieldType::String)
        )
    }

    #[quickcheck]
    fn prop_numeric_sources_always_reach_target(n: i32, b: bool, target: AnyType) -> bool {
        [Value::Int(n as i64), Value::Float(n as f64 / 4.0), Value::Bool(b)]
            .iter()
            .all(|v| coerce(v, target.0).map(|c| has_type(&c, target.0)).unwrap_or(false))
    }

    #[quickcheck]
    fn prop_integer_text_and_integer_agree(n: i64) -> bool {
        coerce(&Value::Str(n.to_string()), FieldType::Integer) == coerce(&Value::Int(n), FieldType::Integer)
    }

    #[quickcheck]
    fn prop_coercion_is_idempotent(n: i32, target: AnyType) -> bool {
        let once = coerce(&Value::Int(n as i64), target.0).unwrap();
        coerce(&once, target.0) == Ok(once)
    }
}
