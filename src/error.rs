//! Error types for the binding runtime
//!
//! The `Display` text of every variant is part of the public contract: callers
//! and tests match on the exact wording, so the format strings below must not
//! drift.

use thiserror::Error;

/// Result type for binding operations
pub type Result<T> = std::result::Result<T, BindingError>;

/// Binding errors
///
/// All variants carry owned strings so an error can be remembered by a
/// [`Builder`](crate::Builder) and reported again on a later `get()`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BindingError {
    /// A raw value could not be converted to its literal type.
    #[error("not a {expected}: {value}")]
    Coercion { expected: &'static str, value: String },

    /// A field rejected a raw value.
    #[error("Attribute[{path}] is {reason}")]
    Invalid { path: String, reason: Box<BindingError> },

    /// No value and no usable default at `get()` time.
    #[error("Attribute[{path}] is required")]
    Required { path: String },

    /// Neither accepted key was present in the input container.
    #[error("Attribute[{path}] not found:{key}")]
    NotFound { path: String, key: String },

    /// Field lookup was attempted on something that is not a keyed container.
    #[error("Attribute[{path}] is not an object:{value}")]
    NotAnObject { path: String, value: String },

    /// An array field or level received something that cannot be iterated.
    #[error("Attribute[{path}] is not an array:{value}")]
    NotAnArray { path: String, value: String },

    /// Failure reported by a nested builder, re-prefixed with the enclosing path.
    #[error("{}", prefix_lines(.path, .inner))]
    Nested { path: String, inner: Box<BindingError> },

    /// Every field-level failure of one coerce/get, in field order.
    #[error("{}", join_lines(.0))]
    Aggregate(Vec<BindingError>),

    #[error("{type_name}Payload Type mismatch:[{}] != {actual}", .names.join(","))]
    PayloadTypeMismatch {
        type_name: String,
        names: Vec<String>,
        actual: String,
    },

    #[error("no factory registered for type: {0}")]
    UnknownType(String),

    #[error("Attribute[{path}] unknown field:{key}")]
    UnknownField { path: String, key: String },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid default for Attribute[{path}]: {reason}")]
    InvalidDefault { path: String, reason: Box<BindingError> },
}

impl BindingError {
    /// Build an aggregate, flattening nested aggregates so each line names one leaf.
    pub fn aggregate(errors: impl IntoIterator<Item = BindingError>) -> Self {
        let mut flat = Vec::new();
        for err in errors {
            match err {
                BindingError::Aggregate(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        BindingError::Aggregate(flat)
    }

    /// Individual messages, one per line of the rendered error.
    pub fn lines(&self) -> Vec<String> {
        self.to_string().lines().map(String::from).collect()
    }
}

fn join_lines(errors: &[BindingError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

fn prefix_lines(path: &str, source: &BindingError) -> String {
    source
        .to_string()
        .lines()
        .map(|line| format!("Attribute[{}] {}", path, line))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_grammar() {
        let required = BindingError::Required { path: "Simple.x".into() };
        assert_eq!(required.to_string(), "Attribute[Simple.x] is required");

        let not_found = BindingError::NotFound { path: "Simple.x".into(), key: "x".into() };
        assert_eq!(not_found.to_string(), "Attribute[Simple.x] not found:x");

        let invalid = BindingError::Invalid {
            path: "Simple.b".into(),
            reason: Box::new(BindingError::Coercion { expected: "boolean", value: "nope".into() }),
        };
        assert_eq!(invalid.to_string(), "Attribute[Simple.b] is not a boolean: nope");
    }

    #[test]
    fn test_payload_mismatch_message() {
        let err = BindingError::PayloadTypeMismatch {
            type_name: "SimpleType".into(),
            names: vec!["https://SimpleType".into(), "SimpleType".into()],
            actual: "Kaput".into(),
        };
        assert_eq!(
            err.to_string(),
            "SimpleTypePayload Type mismatch:[https://SimpleType,SimpleType] != Kaput"
        );
    }

    #[test]
    fn test_aggregate_flattens_and_nested_prefixes_each_line() {
        let inner = BindingError::aggregate(vec![
            BindingError::Required { path: "S.sub.a".into() },
            BindingError::Required { path: "S.sub.b".into() },
        ]);
        let nested = BindingError::Nested { path: "S.sub".into(), inner: Box::new(inner.clone()) };
        assert_eq!(
            nested.to_string(),
            "Attribute[S.sub] Attribute[S.sub.a] is required\nAttribute[S.sub] Attribute[S.sub.b] is required"
        );

        let outer = BindingError::aggregate(vec![inner, BindingError::Required { path: "S.c".into() }]);
        match &outer {
            BindingError::Aggregate(items) => assert_eq!(items.len(), 3),
            other => panic!("expected aggregate, got {:?}", other),
        }
        assert_eq!(outer.lines().len(), 3);
    }
}
