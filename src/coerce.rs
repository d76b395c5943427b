//! Literal coercers
//!
//! Pure functions turning a loosely typed [`Value`] into the canonical value of
//! one literal kind. Numeric parsing follows the prefix rules of classic
//! `parseInt`/`parseFloat`: leading whitespace is skipped and trailing garbage
//! after a valid prefix is ignored.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SubsecRound, TimeZone, Utc};

use crate::error::{BindingError, Result};
use crate::reflection::Reflection;
use crate::value::{iso8601, Value};

/// Format name that turns a string field into a date field
pub const DATE_TIME_FORMAT: &str = "date-time";

/// Target type of a literal field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    String,
    DateTime,
    Integer,
    Number,
    Boolean,
}

impl LiteralKind {
    /// Literal kind for a reflection leaf, `None` for containers.
    pub fn from_reflection(reflection: &Reflection) -> Option<Self> {
        match reflection {
            Reflection::String(lit) if lit.format.as_deref() == Some(DATE_TIME_FORMAT) => Some(Self::DateTime),
            Reflection::String(_) => Some(Self::String),
            Reflection::Integer(_) => Some(Self::Integer),
            Reflection::Number(_) => Some(Self::Number),
            Reflection::Boolean(_) => Some(Self::Boolean),
            _ => None,
        }
    }

    pub fn coerce(&self, value: &Value) -> Result<Value> {
        match self {
            Self::String => coerce_string(value),
            Self::DateTime => coerce_date_time(value),
            Self::Integer => coerce_integer(value),
            Self::Number => coerce_number(value),
            Self::Boolean => coerce_boolean(value),
        }
    }
}

fn not_a(expected: &'static str, value: &Value) -> BindingError {
    BindingError::Coercion { expected, value: value.to_string() }
}

/// Strings pass through; numbers and booleans are stringified; dates are
/// stringified once and retried.
pub fn coerce_string(value: &Value) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(s.clone())),
        Value::Integer(i) => Ok(Value::String(i.to_string())),
        Value::Number(n) => Ok(Value::String(n.to_string())),
        Value::Bool(b) => Ok(Value::String(if *b { "true" } else { "false" }.to_string())),
        Value::Date(d) => coerce_string(&Value::String(iso8601(d))),
        Value::Null | Value::Array(_) | Value::Object(_) => Err(not_a("string", value)),
    }
}

/// Dates pass through; strings are parsed; numbers are epoch milliseconds.
pub fn coerce_date_time(value: &Value) -> Result<Value> {
    let date = match value {
        Value::Date(d) => Some(*d),
        Value::String(s) => parse_date(s),
        Value::Integer(ms) => Utc.timestamp_millis_opt(*ms).single(),
        Value::Number(ms) if ms.is_finite() => Utc.timestamp_millis_opt(ms.trunc() as i64).single(),
        _ => None,
    };
    date.map(|d| Value::Date(d.trunc_subsecs(3)))
        .ok_or_else(|| not_a("Date", value))
}

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(d) = DateTime::parse_from_rfc3339(s) {
        return Some(d.with_timezone(&Utc));
    }
    if let Ok(d) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&d));
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0).map(|d| Utc.from_utc_datetime(&d));
    }
    None
}

/// Integer parsing; fractional parts are truncated.
pub fn coerce_integer(value: &Value) -> Result<Value> {
    let parsed = match value {
        Value::Integer(i) => Some(*i),
        Value::Number(n) if n.is_finite() => Some(n.trunc() as i64),
        Value::String(s) => parse_int_prefix(s),
        _ => None,
    };
    parsed.map(Value::Integer).ok_or_else(|| not_a("number", value))
}

/// Floating point parsing; NaN is rejected.
pub fn coerce_number(value: &Value) -> Result<Value> {
    let parsed = match value {
        Value::Integer(i) => Some(*i as f64),
        Value::Number(n) => Some(*n),
        Value::String(s) => parse_float_prefix(s),
        _ => None,
    };
    match parsed {
        Some(n) if !n.is_nan() => Ok(Value::Number(n)),
        _ => Err(not_a("number", value)),
    }
}

/// `true/yes/on` and `false/no/off` (any case); otherwise a numeric string is
/// true when nonzero.
pub fn coerce_boolean(value: &Value) -> Result<Value> {
    match value {
        Value::Bool(b) => Ok(Value::Bool(*b)),
        Value::Integer(i) => Ok(Value::Bool(*i != 0)),
        Value::Number(n) => Ok(Value::Bool(*n != 0.0 && !n.is_nan())),
        Value::String(s) => {
            let lower = s.trim().to_lowercase();
            if ["true", "yes", "on"].contains(&lower.as_str()) {
                return Ok(Value::Bool(true));
            }
            if ["false", "no", "off"].contains(&lower.as_str()) {
                return Ok(Value::Bool(false));
            }
            match parse_float_prefix(s) {
                Some(n) if !n.is_nan() => Ok(Value::Bool(n != 0.0)),
                _ => Err(not_a("boolean", value)),
            }
        }
        _ => Err(not_a("boolean", value)),
    }
}

fn parse_int_prefix(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let sign = usize::from(matches!(s.as_bytes().first(), Some(b'-') | Some(b'+')));
    let digits = s[sign..].bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    s[..sign + digits].parse().ok()
}

fn parse_float_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'-') | Some(b'+')) {
        end = 1;
    }
    if s[end..].starts_with("Infinity") {
        return s[..end + "Infinity".len()].replace("Infinity", "inf").parse().ok();
    }
    let int_digits = bytes[end..].iter().take_while(|b| b.is_ascii_digit()).count();
    end += int_digits;
    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = bytes[end + 1..].iter().take_while(|b| b.is_ascii_digit()).count();
        if int_digits + frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits + frac_digits == 0 {
        return None;
    }
    if matches!(bytes.get(end), Some(b'e') | Some(b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'-') | Some(b'+')) {
            exp_end += 1;
        }
        let exp_digits = bytes[exp_end.min(bytes.len())..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }
    s[..end].parse().ok()
}

// =============================================================================
// Format handlers
// =============================================================================

/// A named value transform applied before a field's literal coercer
pub type FormatFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Registry of format handlers keyed by the schema `format` string
#[derive(Clone, Default)]
pub struct Formats {
    handlers: HashMap<String, FormatFn>,
}

impl Formats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, handler: impl Fn(&Value) -> Value + Send + Sync + 'static) -> &mut Self {
        self.handlers.insert(name.into(), Arc::new(handler));
        self
    }

    pub fn get(&self, name: Option<&str>) -> Option<FormatFn> {
        name.and_then(|n| self.handlers.get(n)).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for Formats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Formats").field("handlers", &self.names()).finish()
    }
}

/// A literal coercer with its optional format override
#[derive(Clone)]
pub struct Coercer {
    kind: LiteralKind,
    format: Option<FormatFn>,
}

impl Coercer {
    pub fn new(kind: LiteralKind) -> Self {
        Self { kind, format: None }
    }

    /// Resolve the format handler for `format` from `formats`.
    pub fn with_format(kind: LiteralKind, format: Option<&str>, formats: &Formats) -> Self {
        Self { kind, format: formats.get(format) }
    }

    pub fn kind(&self) -> LiteralKind {
        self.kind
    }

    pub fn coerce(&self, value: &Value) -> Result<Value> {
        match &self.format {
            Some(handler) => self.kind.coerce(&handler(value)),
            None => self.kind.coerce(value),
        }
    }
}

impl fmt::Debug for Coercer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coercer")
            .field("kind", &self.kind)
            .field("format", &self.format.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_coercion() {
        assert_eq!(coerce_string(&Value::from("x")).unwrap(), Value::from("x"));
        assert_eq!(coerce_string(&Value::Number(6.4)).unwrap(), Value::from("6.4"));
        assert_eq!(coerce_string(&Value::Integer(4)).unwrap(), Value::from("4"));
        assert_eq!(coerce_string(&Value::Bool(false)).unwrap(), Value::from("false"));
        assert_eq!(coerce_string(&Value::Number(f64::NAN)).unwrap(), Value::from("NaN"));
        let err = coerce_string(&Value::Null).unwrap_err();
        assert_eq!(err.to_string(), "not a string: null");
    }

    #[test]
    fn test_date_coercion() {
        let epoch = coerce_date_time(&Value::Number(6.4)).unwrap();
        assert_eq!(epoch.to_string(), "1970-01-01T00:00:00.006Z");

        let day = coerce_date_time(&Value::from("2023-01-01")).unwrap();
        assert_eq!(day.to_string(), "2023-01-01T00:00:00.000Z");

        let full = coerce_date_time(&Value::from("2023-12-31T23:59:59.000Z")).unwrap();
        assert_eq!(coerce_date_time(&full).unwrap(), full);

        let err = coerce_date_time(&Value::from(serde_json::json!({}))).unwrap_err();
        assert!(err.to_string().starts_with("not a Date"));
    }

    #[test]
    fn test_integer_coercion() {
        assert_eq!(coerce_integer(&Value::Number(6.4)).unwrap(), Value::Integer(6));
        assert_eq!(coerce_integer(&Value::from("42.9")).unwrap(), Value::Integer(42));
        assert_eq!(coerce_integer(&Value::from("  -7px")).unwrap(), Value::Integer(-7));
        assert!(coerce_integer(&Value::from("WTF")).is_err());
        assert!(coerce_integer(&Value::Bool(true)).is_err());
        assert_eq!(
            coerce_integer(&Value::from("x")).unwrap_err().to_string(),
            "not a number: x"
        );
    }

    #[test]
    fn test_number_coercion() {
        assert_eq!(coerce_number(&Value::from("43.43")).unwrap(), Value::Number(43.43));
        assert_eq!(coerce_number(&Value::Integer(5000)).unwrap(), Value::Number(5000.0));
        assert_eq!(coerce_number(&Value::from("1e3x")).unwrap(), Value::Number(1000.0));
        assert_eq!(coerce_number(&Value::from(".5")).unwrap(), Value::Number(0.5));
        assert_eq!(coerce_number(&Value::from("-Infinity")).unwrap(), Value::Number(f64::NEG_INFINITY));
        assert!(coerce_number(&Value::Number(f64::NAN)).is_err());
        assert!(coerce_number(&Value::from(".")).is_err());
    }

    #[test]
    fn test_boolean_coercion() {
        for truthy in ["true", "YES", "On", "1", "47"] {
            assert_eq!(coerce_boolean(&Value::from(truthy)).unwrap(), Value::Bool(true), "{}", truthy);
        }
        for falsy in ["false", "No", "OFF", "0"] {
            assert_eq!(coerce_boolean(&Value::from(falsy)).unwrap(), Value::Bool(false), "{}", falsy);
        }
        assert_eq!(coerce_boolean(&Value::Integer(47)).unwrap(), Value::Bool(true));
        assert_eq!(coerce_boolean(&Value::Integer(0)).unwrap(), Value::Bool(false));
        assert_eq!(
            coerce_boolean(&Value::from("notabool")).unwrap_err().to_string(),
            "not a boolean: notabool"
        );
    }

    #[test]
    fn test_format_handler_runs_before_coercer() {
        let mut formats = Formats::new();
        formats.add("cents", |v: &Value| match v.as_f64() {
            Some(n) => Value::Number(n / 100.0),
            None => v.clone(),
        });
        let coercer = Coercer::with_format(LiteralKind::Number, Some("cents"), &formats);
        assert_eq!(coercer.coerce(&Value::Integer(250)).unwrap(), Value::Number(2.5));

        let plain = Coercer::with_format(LiteralKind::Number, Some("unknown"), &formats);
        assert_eq!(plain.coerce(&Value::Integer(250)).unwrap(), Value::Number(250.0));
    }
}
