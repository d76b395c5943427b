//! Record hashing
//!
//! Feeds the canonical string form of every leaf of a walked value into a
//! keyless HMAC-SHA1, in walk order. Object members are prefixed with their
//! raw schema name, empty strings contribute nothing. Leaves can be left out
//! by exact dotted path or by pattern.

use std::fmt;

use hmac::digest::Output;
use hmac::{Hmac, Mac};
use regex::Regex;
use sha1::Sha1;

use crate::value::{iso8601, Value};
use crate::walker::{as_dotted_path, PathNode, Walker};

/// A leaf exclusion
#[derive(Debug, Clone)]
pub enum Exclude {
    /// Exact dotted path
    Path(String),
    /// Pattern searched in the dotted path
    Pattern(Regex),
}

impl Exclude {
    pub fn matches(&self, dotted: &str) -> bool {
        match self {
            Exclude::Path(path) => path == dotted,
            Exclude::Pattern(regex) => regex.is_match(dotted),
        }
    }
}

impl From<&str> for Exclude {
    fn from(path: &str) -> Self {
        Exclude::Path(path.to_string())
    }
}

impl From<String> for Exclude {
    fn from(path: String) -> Self {
        Exclude::Path(path)
    }
}

impl From<Regex> for Exclude {
    fn from(regex: Regex) -> Self {
        Exclude::Pattern(regex)
    }
}

/// 20-byte HMAC-SHA1 digest of a record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordHash(Output<Hmac<Sha1>>);

impl RecordHash {
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl fmt::Display for RecordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

/// Canonical string form of a leaf, `None` for containers and null.
pub fn canonical(value: &Value) -> Option<String> {
    match value {
        Value::Bool(b) => Some(if *b { "true" } else { "false" }.to_string()),
        Value::Integer(i) => Some(exponential(*i as f64)),
        Value::Number(n) => Some(exponential(*n)),
        Value::String(s) => Some(s.clone()),
        Value::Date(d) => Some(iso8601(d)),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Exponential notation with 15 fraction digits and a signed exponent,
/// e.g. `4.200000000000000e+1`.
fn exponential(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let formatted = format!("{:.15e}", n);
    match formatted.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
        _ => formatted,
    }
}

/// Hash every leaf the walker emits, skipping excluded dotted paths.
pub fn to_hash(walker: &Walker<'_>, exclude: &[Exclude]) -> RecordHash {
    // An empty HMAC key is the all-zero block
    let mut mac = <Hmac<Sha1> as Mac>::new(&Default::default());
    walker.apply(|path| {
        let Some(last) = path.last() else {
            return;
        };
        let Some(text) = canonical(last.value).filter(|t| !t.is_empty()) else {
            return;
        };
        let dotted = as_dotted_path(path);
        if exclude.iter().any(|ex| ex.matches(&dotted)) {
            return;
        }
        if let PathNode::ObjectItem { name, .. } = &last.node {
            mac.update(name.as_bytes());
        }
        mac.update(text.as_bytes());
    });
    RecordHash(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::Factory;
    use crate::reflection::Reflection;
    use serde_json::json;

    fn hash(value: serde_json::Value, exclude: &[Exclude]) -> RecordHash {
        let value = Value::from(value);
        to_hash(&Walker::new(&value).labeled("R"), exclude)
    }

    #[test]
    fn test_exponential_matches_fixed_precision_form() {
        assert_eq!(exponential(42.0), "4.200000000000000e+1");
        assert_eq!(exponential(0.00125), "1.250000000000000e-3");
        assert_eq!(exponential(-7.0), "-7.000000000000000e+0");
        assert_eq!(exponential(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_integer_and_float_hash_alike() {
        assert_eq!(hash(json!({"n": 42}), &[]), hash(json!({"n": 42.0}), &[]));
    }

    #[test]
    fn test_exact_and_pattern_exclusion() {
        let a = json!({"keep": 1, "skip": "a", "nested": {"stamp": 1}});
        let b = json!({"keep": 1, "skip": "b", "nested": {"stamp": 2}});
        assert_ne!(hash(a.clone(), &[]), hash(b.clone(), &[]));

        let excludes = vec![Exclude::from("R.skip"), Exclude::from(Regex::new(r"\.stamp$").unwrap())];
        assert_eq!(hash(a.clone(), &excludes), hash(b.clone(), &excludes));

        let c = json!({"keep": 2, "skip": "a", "nested": {"stamp": 1}});
        assert_ne!(hash(a, &excludes), hash(c, &excludes));
    }

    #[test]
    fn test_member_key_is_part_of_the_hash() {
        assert_ne!(hash(json!({"a": "x"}), &[]), hash(json!({"b": "x"}), &[]));
    }

    #[test]
    fn test_empty_string_is_not_hashed() {
        assert_eq!(hash(json!({"a": ""}), &[]), hash(json!({}), &[]));
        assert_ne!(hash(json!({"a": " "}), &[]), hash(json!({}), &[]));
    }

    #[test]
    fn test_bound_member_is_prefixed_with_raw_name() {
        let schema = Reflection::from_json_schema(&json!({
            "title": "Doc",
            "type": "object",
            "properties": { "my-field": { "type": "string" } }
        }))
        .unwrap();
        let factory = Factory::new(schema).unwrap();
        let value = factory.builder().coerce(&Value::from(json!({"my-field": "x"}))).unwrap();
        assert_eq!(value.get("my_field"), Some(&Value::from("x")));

        let mut mac = <Hmac<Sha1> as Mac>::new(&Default::default());
        mac.update(b"my-field");
        mac.update(b"x");
        let expected = format!("{:x}", mac.finalize().into_bytes());
        assert_eq!(to_hash(&factory.getter(&value), &[]).to_string(), expected);
    }

    #[test]
    fn test_display_is_lowercase_hex() {
        let digest = hash(json!({"a": true}), &[]);
        let text = digest.to_string();
        assert_eq!(text.len(), 40);
        assert!(text.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
