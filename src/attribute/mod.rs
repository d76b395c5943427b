//! Field attributes
//!
//! An attribute owns one field of one builder: its two lookup keys, its dotted
//! path, the resolved schema default and the current value. Literal fields
//! wrap a [`Coercer`]; object and array fields live in the submodules.

pub mod array;
pub mod object;

use tracing::warn;

use crate::coerce::{Coercer, LiteralKind};
use crate::error::{BindingError, Result};
use crate::factory::Factory;
use crate::value::{Object, Value};

pub use array::ArrayAttribute;
pub use object::{ObjectAttribute, OpenObjectAttribute};

/// Language-safe spelling of a property name: every character outside
/// `[A-Za-z0-9_]` becomes `_`, and a leading digit gets a `_` prefix.
pub fn safe_key(name: &str) -> String {
    let mut key: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if key.starts_with(|c: char| c.is_ascii_digit()) {
        key.insert(0, '_');
    }
    key
}

/// Identity of one field
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeParam {
    /// Dotted path of the enclosing object, rooted at the schema title
    pub base: String,
    /// Raw schema name
    pub primary_key: String,
    /// Language-safe alternate spelling
    pub secondary_key: String,
    /// Raw schema default, not yet coerced
    pub default: Option<Value>,
    pub format: Option<String>,
}

impl AttributeParam {
    pub fn new(base: impl Into<String>, primary_key: impl Into<String>) -> Self {
        let primary_key = primary_key.into();
        Self {
            base: base.into(),
            secondary_key: safe_key(&primary_key),
            primary_key,
            default: None,
            format: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// `base.primary_key`; index keys (`[0]`) attach without a dot.
    pub fn dotted_path(&self) -> String {
        if self.base.is_empty() {
            self.primary_key.clone()
        } else if self.primary_key.starts_with('[') {
            format!("{}{}", self.base, self.primary_key)
        } else {
            format!("{}.{}", self.base, self.primary_key)
        }
    }

    /// First non-null value under the primary, then the secondary key.
    pub fn lookup<'a>(&self, container: &'a Object) -> Option<&'a Value> {
        [&self.primary_key, &self.secondary_key]
            .into_iter()
            .filter_map(|key| container.get(key.as_str()))
            .find(|v| !v.is_null())
    }
}

/// One field wrapper with coercion and required/optional/default retrieval
pub trait Attribute: Send {
    fn param(&self) -> &AttributeParam;

    /// Default coerced once at construction, if it coerced at all.
    fn resolved_default(&self) -> Option<&Value>;

    /// Coerce a raw value and make it current. On failure the previous value stays.
    fn coerce(&mut self, raw: &Value) -> Result<Value>;

    /// Current value, else the resolved default, else a required-field error.
    fn get(&self) -> Result<Value>;

    /// Look this field up in `container` and coerce what was found.
    fn coerce_attribute(&mut self, container: &Value) -> Result<Value> {
        let param = self.param();
        let map = container.as_object().ok_or_else(|| BindingError::NotAnObject {
            path: param.dotted_path(),
            value: container.to_string(),
        })?;
        let raw = match param.lookup(map) {
            Some(found) => found.clone(),
            None => match self.resolved_default() {
                Some(default) => default.clone(),
                None => {
                    return Err(BindingError::NotFound {
                        path: param.dotted_path(),
                        key: param.primary_key.clone(),
                    })
                }
            },
        };
        self.coerce(&raw)
    }
}

/// Coerce a raw schema default once. A default that fails is logged and dropped.
pub(crate) fn resolve_default(
    param: &AttributeParam,
    coerce: impl FnOnce(&Value) -> Result<Value>,
) -> Option<Value> {
    let raw = param.default.as_ref()?;
    match coerce(raw) {
        Ok(value) => Some(value),
        Err(reason) => {
            warn!(path = %param.dotted_path(), error = %reason, "discarding default that does not coerce");
            None
        }
    }
}

// =============================================================================
// Literal attribute
// =============================================================================

/// A required literal field
#[derive(Debug, Clone)]
pub struct LiteralAttribute {
    param: AttributeParam,
    coercer: Coercer,
    default: Option<Value>,
    value: Option<Value>,
}

impl LiteralAttribute {
    pub fn new(param: AttributeParam, coercer: Coercer) -> Self {
        let default = resolve_default(&param, |raw| coercer.coerce(raw));
        Self { param, coercer, default, value: None }
    }

    pub fn string(param: AttributeParam) -> Self {
        Self::new(param, Coercer::new(LiteralKind::String))
    }

    pub fn date_time(param: AttributeParam) -> Self {
        Self::new(param, Coercer::new(LiteralKind::DateTime))
    }

    pub fn integer(param: AttributeParam) -> Self {
        Self::new(param, Coercer::new(LiteralKind::Integer))
    }

    pub fn number(param: AttributeParam) -> Self {
        Self::new(param, Coercer::new(LiteralKind::Number))
    }

    pub fn boolean(param: AttributeParam) -> Self {
        Self::new(param, Coercer::new(LiteralKind::Boolean))
    }

    pub fn kind(&self) -> LiteralKind {
        self.coercer.kind()
    }
}

impl Attribute for LiteralAttribute {
    fn param(&self) -> &AttributeParam {
        &self.param
    }

    fn resolved_default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    fn coerce(&mut self, raw: &Value) -> Result<Value> {
        match self.coercer.coerce(raw) {
            Ok(value) => {
                self.value = Some(value.clone());
                Ok(value)
            }
            Err(reason) => Err(BindingError::Invalid {
                path: self.param.dotted_path(),
                reason: Box::new(reason),
            }),
        }
    }

    fn get(&self) -> Result<Value> {
        self.value
            .as_ref()
            .or(self.default.as_ref())
            .cloned()
            .ok_or_else(|| BindingError::Required { path: self.param.dotted_path() })
    }
}

// =============================================================================
// Optional attribute
// =============================================================================

/// Makes any attribute optional: null clears it and `get` never fails.
pub struct OptionalAttribute {
    inner: Box<dyn Attribute>,
    value: Option<Value>,
}

impl OptionalAttribute {
    pub fn new(inner: Box<dyn Attribute>) -> Self {
        Self { inner, value: None }
    }
}

impl Attribute for OptionalAttribute {
    fn param(&self) -> &AttributeParam {
        self.inner.param()
    }

    fn resolved_default(&self) -> Option<&Value> {
        self.inner.resolved_default()
    }

    fn coerce(&mut self, raw: &Value) -> Result<Value> {
        if raw.is_null() {
            self.value = None;
            return Ok(Value::Null);
        }
        let value = self.inner.coerce(raw)?;
        self.value = Some(value.clone());
        Ok(value)
    }

    fn get(&self) -> Result<Value> {
        Ok(self
            .value
            .as_ref()
            .or(self.inner.resolved_default())
            .cloned()
            .unwrap_or(Value::Null))
    }

    fn coerce_attribute(&mut self, container: &Value) -> Result<Value> {
        let param = self.inner.param();
        let map = container.as_object().ok_or_else(|| BindingError::NotAnObject {
            path: param.dotted_path(),
            value: container.to_string(),
        })?;
        match param.lookup(map).or(self.inner.resolved_default()).cloned() {
            Some(raw) => self.coerce(&raw),
            None => self.get(),
        }
    }
}

// =============================================================================
// Shapes
// =============================================================================

/// Compiled field shape, instantiated into fresh attributes per builder.
#[derive(Debug, Clone)]
pub(crate) enum Shape {
    Literal(Coercer),
    Object(Factory),
    /// Object without declared properties
    Open,
    /// `depth` levels of arrays around a non-array `item`
    Array { depth: usize, item: Box<Shape> },
}

impl Shape {
    pub(crate) fn instantiate(&self, param: AttributeParam, optional: bool) -> Box<dyn Attribute> {
        let attr: Box<dyn Attribute> = match self {
            Shape::Literal(coercer) => Box::new(LiteralAttribute::new(param, coercer.clone())),
            Shape::Object(factory) => Box::new(ObjectAttribute::new(param, factory.clone())),
            Shape::Open => Box::new(OpenObjectAttribute::new(param)),
            Shape::Array { depth, item } => Box::new(ArrayAttribute::new(param, *depth, (**item).clone())),
        };
        if optional {
            Box::new(OptionalAttribute::new(attr))
        } else {
            attr
        }
    }

    /// Fail if the schema default of `param` does not coerce to this shape.
    pub(crate) fn check_default(&self, param: &AttributeParam) -> Result<()> {
        let Some(raw) = &param.default else {
            return Ok(());
        };
        let mut probe = self.instantiate(AttributeParam { default: None, ..param.clone() }, false);
        probe.coerce(raw).map(|_| ()).map_err(|reason| BindingError::InvalidDefault {
            path: param.dotted_path(),
            reason: Box::new(reason),
        })
    }
}
