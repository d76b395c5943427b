//! Record builders
//!
//! A [`Builder`] owns one attribute per schema property, in declaration order.
//! It is mutated by a bulk [`Builder::coerce`] or by field setters and is
//! finalized with [`Builder::get`], which is side-effect free and repeatable.
//! Every field is attempted; failures are collected, never short-circuited.

use std::fmt;

use tracing::debug;

use crate::attribute::Attribute;
use crate::error::{BindingError, Result};
use crate::factory::Factory;
use crate::payload::{Payload, PayloadCodec};
use crate::reflection::Reflection;
use crate::value::{Object, Value};

struct Field {
    /// Key of the field in realized values
    key: String,
    attr: Box<dyn Attribute>,
}

pub struct Builder {
    factory: Factory,
    base: String,
    fields: Vec<Field>,
    /// Failures of the last bulk coerce, per field
    pending: Vec<Option<BindingError>>,
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("base", &self.base)
            .field("fields", &self.fields.iter().map(|f| &f.key).collect::<Vec<_>>())
            .field("pending", &self.pending.iter().filter(|p| p.is_some()).count())
            .finish()
    }
}

impl Builder {
    pub(crate) fn new(factory: Factory, base: &str) -> Self {
        let fields: Vec<Field> = factory
            .fields()
            .iter()
            .map(|spec| Field {
                key: spec.key.clone(),
                attr: spec.shape.instantiate(spec.param(base), spec.optional),
            })
            .collect();
        let pending = vec![None; fields.len()];
        Self {
            factory,
            base: base.to_string(),
            fields,
            pending,
        }
    }

    pub fn factory(&self) -> &Factory {
        &self.factory
    }

    pub fn schema(&self) -> &Reflection {
        self.factory.schema()
    }

    /// Dotted path this builder's fields are rooted at
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Coerce every field from `container`.
    ///
    /// Returns the realized value, or the aggregate of every field failure.
    /// Failures are remembered and reported again by [`Builder::get`] until the
    /// field is coerced successfully.
    pub fn coerce(&mut self, container: &Value) -> Result<Value> {
        if container.as_object().is_none() {
            return Err(BindingError::NotAnObject {
                path: self.base.clone(),
                value: container.to_string(),
            });
        }
        let mut errors = Vec::new();
        for (field, pending) in self.fields.iter_mut().zip(self.pending.iter_mut()) {
            match field.attr.coerce_attribute(container) {
                Ok(_) => *pending = None,
                Err(e) => {
                    *pending = Some(e.clone());
                    errors.push(e);
                }
            }
        }
        debug!(base = %self.base, errors = errors.len(), "coerced record");
        if errors.is_empty() {
            self.get()
        } else {
            Err(BindingError::aggregate(errors))
        }
    }

    /// Coerce one field, addressed by its raw or its language-safe name.
    pub fn set(&mut self, key: &str, raw: impl Into<Value>) -> Result<&mut Self> {
        let idx = self
            .fields
            .iter()
            .position(|f| f.attr.param().primary_key == key || f.key == key)
            .ok_or_else(|| BindingError::UnknownField {
                path: self.base.clone(),
                key: key.to_string(),
            })?;
        self.fields[idx].attr.coerce(&raw.into())?;
        self.pending[idx] = None;
        Ok(self)
    }

    /// The realized value keyed by language-safe names, or every failure.
    pub fn get(&self) -> Result<Value> {
        let mut out = Object::new();
        let mut errors = Vec::new();
        for (field, pending) in self.fields.iter().zip(&self.pending) {
            if let Some(e) = pending {
                errors.push(e.clone());
                continue;
            }
            match field.attr.get() {
                Ok(Value::Null) => {}
                Ok(value) => {
                    out.insert(field.key.clone(), value);
                }
                Err(e) => errors.push(e),
            }
        }
        if errors.is_empty() {
            Ok(Value::Object(out))
        } else {
            Err(BindingError::aggregate(errors))
        }
    }

    /// The realized value keyed by raw schema names, dates as ISO-8601 strings.
    pub fn to_object(&self) -> Result<Value> {
        self.factory.to_object(&self.get()?)
    }

    /// A fresh builder coerced from this one's object rendering.
    pub fn try_clone(&self) -> Result<Builder> {
        let mut copy = self.factory.builder_at(&self.base);
        copy.coerce(&self.to_object()?)?;
        Ok(copy)
    }

    pub fn to_payload(&self) -> Result<Payload> {
        self.factory.to_payload(&self.get()?)
    }

    pub fn to_payload_with(&self, codec: &dyn PayloadCodec) -> Result<Payload> {
        self.factory.to_payload_with(&self.get()?, codec)
    }

    /// Check the payload type, decode it and coerce the result into this builder.
    pub fn from_payload(&mut self, payload: &Payload) -> Result<Value> {
        let factory = self.factory.clone();
        self.from_payload_with(payload, factory.codec())
    }

    pub fn from_payload_with(&mut self, payload: &Payload, codec: &dyn PayloadCodec) -> Result<Value> {
        self.factory.check_payload_type(payload)?;
        let decoded = codec.decode(&payload.data)?;
        self.coerce(&Value::from(decoded))
    }
}
