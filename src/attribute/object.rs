//! Object-shaped fields
//!
//! A declared object field owns a nested [`Builder`] rooted at its own dotted
//! path, so nested failures name the full path of the failing leaf. An object
//! without declared properties is kept verbatim.

use crate::builder::Builder;
use crate::error::{BindingError, Result};
use crate::factory::Factory;
use crate::value::Value;

use super::{resolve_default, Attribute, AttributeParam};

pub struct ObjectAttribute {
    param: AttributeParam,
    builder: Builder,
    default: Option<Value>,
    value: Option<Value>,
}

impl ObjectAttribute {
    pub fn new(param: AttributeParam, factory: Factory) -> Self {
        let base = param.dotted_path();
        let default = resolve_default(&param, |raw| factory.builder_at(&base).coerce(raw));
        Self {
            builder: factory.builder_at(&base),
            param,
            default,
            value: None,
        }
    }

    /// Builder of the last successful coerce
    pub fn builder(&self) -> &Builder {
        &self.builder
    }
}

impl Attribute for ObjectAttribute {
    fn param(&self) -> &AttributeParam {
        &self.param
    }

    fn resolved_default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    fn coerce(&mut self, raw: &Value) -> Result<Value> {
        if raw.as_object().is_none() {
            return Err(BindingError::NotAnObject {
                path: self.param.dotted_path(),
                value: raw.to_string(),
            });
        }
        // A failed coerce leaves the previous builder and value in place
        let mut fresh = self.builder.factory().builder_at(self.builder.base());
        let value = fresh.coerce(raw).map_err(|inner| BindingError::Nested {
            path: self.param.dotted_path(),
            inner: Box::new(inner),
        })?;
        self.builder = fresh;
        self.value = Some(value.clone());
        Ok(value)
    }

    fn get(&self) -> Result<Value> {
        self.value
            .as_ref()
            .or(self.default.as_ref())
            .cloned()
            .ok_or_else(|| BindingError::Required { path: self.param.dotted_path() })
    }
}

/// Object field without declared properties: any keyed container is accepted as is.
#[derive(Debug, Clone)]
pub struct OpenObjectAttribute {
    param: AttributeParam,
    default: Option<Value>,
    value: Option<Value>,
}

impl OpenObjectAttribute {
    pub fn new(param: AttributeParam) -> Self {
        let default = resolve_default(&param, accept_object);
        Self { param, default, value: None }
    }
}

fn accept_object(raw: &Value) -> Result<Value> {
    match raw {
        Value::Object(_) => Ok(raw.clone()),
        _ => Err(BindingError::Coercion { expected: "object", value: raw.to_string() }),
    }
}

impl Attribute for OpenObjectAttribute {
    fn param(&self) -> &AttributeParam {
        &self.param
    }

    fn resolved_default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    fn coerce(&mut self, raw: &Value) -> Result<Value> {
        let value = accept_object(raw).map_err(|reason| BindingError::Invalid {
            path: self.param.dotted_path(),
            reason: Box::new(reason),
        })?;
        self.value = Some(value.clone());
        Ok(value)
    }

    fn get(&self) -> Result<Value> {
        self.value
            .as_ref()
            .or(self.default.as_ref())
            .cloned()
            .ok_or_else(|| BindingError::Required { path: self.param.dotted_path() })
    }
}
