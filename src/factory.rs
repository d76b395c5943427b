//! Record factories
//!
//! A [`Factory`] is one compiled object schema: its accepted identifiers, the
//! field shapes of every property and the payload codec. Factories are cheap
//! to clone and hand out fresh [`Builder`]s.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::attribute::{safe_key, AttributeParam, Shape};
use crate::builder::Builder;
use crate::coerce::{Coercer, Formats, LiteralKind};
use crate::error::{BindingError, Result};
use crate::payload::{JsonBytesCodec, Payload, PayloadCodec};
use crate::reflection::{ObjectReflection, Reflection};
use crate::value::{iso8601, Object, Value};
use crate::walker::Walker;

/// Identifiers of a schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Names {
    /// Canonical, URI-shaped id
    pub id: Option<String>,
    /// Bare title
    pub title: Option<String>,
    /// Display name used as the root of every dotted path
    pub type_name: String,
}

impl Names {
    fn from_schema(obj: &ObjectReflection) -> Self {
        let type_name = obj
            .title
            .clone()
            .or_else(|| obj.id.as_deref().map(last_segment))
            .unwrap_or_default();
        Self { id: obj.id.clone(), title: obj.title.clone(), type_name }
    }

    /// Identifiers accepted in a payload `Type`, id first
    pub fn accepted(&self) -> Vec<String> {
        self.id.iter().chain(self.title.iter()).cloned().collect()
    }

    pub fn accepts(&self, name: &str) -> bool {
        self.id.as_deref() == Some(name) || self.title.as_deref() == Some(name)
    }

    /// The identifier written into outgoing payloads
    pub fn canonical(&self) -> &str {
        self.id.as_deref().or(self.title.as_deref()).unwrap_or(&self.type_name)
    }
}

fn last_segment(id: &str) -> String {
    id.trim_end_matches(['/', '#'])
        .rsplit(['/', '#', ':'])
        .next()
        .unwrap_or(id)
        .to_string()
}

/// Compile-time options shared by a factory and its nested factories
#[derive(Clone)]
pub struct FactoryOptions {
    pub formats: Formats,
    pub codec: Arc<dyn PayloadCodec>,
    /// Reject schemas whose defaults do not coerce instead of dropping the default
    pub strict_defaults: bool,
}

impl Default for FactoryOptions {
    fn default() -> Self {
        Self {
            formats: Formats::default(),
            codec: Arc::new(JsonBytesCodec),
            strict_defaults: false,
        }
    }
}

impl fmt::Debug for FactoryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryOptions")
            .field("formats", &self.formats)
            .field("codec", &self.codec.name())
            .field("strict_defaults", &self.strict_defaults)
            .finish()
    }
}

/// One compiled property
#[derive(Debug, Clone)]
pub(crate) struct FieldSpec {
    /// Raw schema name
    pub name: String,
    /// Language-safe name, the key of realized values
    pub key: String,
    pub optional: bool,
    pub default: Option<Value>,
    pub format: Option<String>,
    pub shape: Shape,
}

impl FieldSpec {
    pub(crate) fn param(&self, base: &str) -> AttributeParam {
        AttributeParam {
            base: base.to_string(),
            primary_key: self.name.clone(),
            secondary_key: self.key.clone(),
            default: self.default.clone(),
            format: self.format.clone(),
        }
    }
}

struct Inner {
    schema: Reflection,
    names: Names,
    fields: Vec<FieldSpec>,
    codec: Arc<dyn PayloadCodec>,
}

/// A compiled object schema
#[derive(Clone)]
pub struct Factory(Arc<Inner>);

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("names", &self.0.names)
            .field("fields", &self.0.fields.iter().map(|f| &f.name).collect::<Vec<_>>())
            .finish()
    }
}

impl Factory {
    pub fn new(schema: Reflection) -> Result<Self> {
        Self::with_options(schema, &FactoryOptions::default())
    }

    pub fn from_json_schema(schema: &serde_json::Value) -> Result<Self> {
        Self::new(Reflection::from_json_schema(schema)?)
    }

    /// Compile a top-level object schema. It must carry a title or an id.
    pub fn with_options(schema: Reflection, options: &FactoryOptions) -> Result<Self> {
        let obj = schema
            .as_object()
            .ok_or_else(|| BindingError::InvalidSchema(format!("top-level type must be an object, got {}", schema.kind_name())))?;
        if obj.title.is_none() && obj.id.is_none() {
            return Err(BindingError::InvalidSchema("top-level object needs a title or an id".to_string()));
        }
        Self::compile(schema, options)
    }

    fn compile(schema: Reflection, options: &FactoryOptions) -> Result<Self> {
        let obj = schema
            .as_object()
            .ok_or_else(|| BindingError::InvalidSchema(format!("expected an object, got {}", schema.kind_name())))?;
        let names = Names::from_schema(obj);

        let mut fields = Vec::with_capacity(obj.properties.len());
        for item in &obj.properties {
            let spec = FieldSpec {
                name: item.name.clone(),
                key: item.key.clone().unwrap_or_else(|| safe_key(&item.name)),
                optional: item.optional,
                default: item.property.default_value().map(Value::from),
                format: item.property.format().map(String::from),
                shape: compile_shape(&item.property, options)?,
            };
            if options.strict_defaults {
                spec.shape.check_default(&spec.param(&names.type_name))?;
            }
            fields.push(spec);
        }

        Ok(Self(Arc::new(Inner {
            schema,
            names,
            fields,
            codec: options.codec.clone(),
        })))
    }

    pub fn names(&self) -> &Names {
        &self.0.names
    }

    pub fn type_name(&self) -> &str {
        &self.0.names.type_name
    }

    /// Identifiers accepted by [`Factory::from_payload`]
    pub fn accepted_names(&self) -> Vec<String> {
        self.0.names.accepted()
    }

    /// The immutable reflection tree this factory was compiled from
    pub fn schema(&self) -> &Reflection {
        &self.0.schema
    }

    pub fn codec(&self) -> &dyn PayloadCodec {
        self.0.codec.as_ref()
    }

    pub(crate) fn fields(&self) -> &[FieldSpec] {
        &self.0.fields
    }

    /// A fresh builder rooted at the type name
    pub fn builder(&self) -> Builder {
        self.builder_at(&self.0.names.type_name)
    }

    pub(crate) fn builder_at(&self, base: &str) -> Builder {
        Builder::new(self.clone(), base)
    }

    /// Render a realized value keyed by raw schema names, with dates as ISO-8601 strings.
    pub fn to_object(&self, value: &Value) -> Result<Value> {
        let map = value.as_object().ok_or_else(|| BindingError::NotAnObject {
            path: self.0.names.type_name.clone(),
            value: value.to_string(),
        })?;
        let mut out = Object::new();
        for field in &self.0.fields {
            let Some(found) = field.param("").lookup(map) else {
                continue;
            };
            out.insert(field.name.clone(), render(&field.shape, found)?);
        }
        Ok(Value::Object(out))
    }

    /// Structural copy validated through the same coercion path.
    pub fn clone_value(&self, value: &Value) -> Result<Value> {
        self.builder().coerce(&self.to_object(value)?)
    }

    pub fn to_payload(&self, value: &Value) -> Result<Payload> {
        self.to_payload_with(value, self.codec())
    }

    pub fn to_payload_with(&self, value: &Value, codec: &dyn PayloadCodec) -> Result<Payload> {
        Ok(Payload {
            type_name: self.0.names.canonical().to_string(),
            data: codec.encode(&self.to_object(value)?.to_json())?,
        })
    }

    pub fn from_payload(&self, payload: &Payload) -> Result<Value> {
        self.from_payload_with(payload, self.codec())
    }

    /// Decode a payload addressed to this schema and coerce it into a realized value.
    pub fn from_payload_with(&self, payload: &Payload, codec: &dyn PayloadCodec) -> Result<Value> {
        self.check_payload_type(payload)?;
        let decoded = codec.decode(&payload.data)?;
        debug!(type_name = %self.0.names.type_name, codec = codec.name(), "decoding payload");
        self.builder().coerce(&Value::from(decoded))
    }

    pub(crate) fn check_payload_type(&self, payload: &Payload) -> Result<()> {
        if self.0.names.accepts(&payload.type_name) {
            return Ok(());
        }
        Err(BindingError::PayloadTypeMismatch {
            type_name: self.0.names.type_name.clone(),
            names: self.0.names.accepted(),
            actual: payload.type_name.clone(),
        })
    }

    /// A walker over `value`, bound to this schema.
    pub fn getter<'a>(&'a self, value: &'a Value) -> Walker<'a> {
        Walker::with_schema(value, &self.0.schema).labeled(&self.0.names.type_name)
    }
}

fn compile_shape(reflection: &Reflection, options: &FactoryOptions) -> Result<Shape> {
    match reflection {
        Reflection::Object(obj) if obj.properties.is_empty() => Ok(Shape::Open),
        Reflection::Object(_) => Ok(Shape::Object(Factory::compile(reflection.clone(), options)?)),
        Reflection::Array(arr) => Ok(match compile_shape(&arr.items, options)? {
            Shape::Array { depth, item } => Shape::Array { depth: depth + 1, item },
            other => Shape::Array { depth: 1, item: Box::new(other) },
        }),
        Reflection::ObjectItem(_) | Reflection::ArrayItem(_) => Err(BindingError::InvalidSchema(format!(
            "{} is not a property type",
            reflection.kind_name()
        ))),
        literal => {
            let kind = LiteralKind::from_reflection(literal)
                .ok_or_else(|| BindingError::InvalidSchema(format!("unsupported type {}", literal.kind_name())))?;
            Ok(Shape::Literal(Coercer::with_format(kind, literal.format(), &options.formats)))
        }
    }
}

fn render(shape: &Shape, value: &Value) -> Result<Value> {
    match shape {
        Shape::Object(factory) => factory.to_object(value),
        Shape::Array { depth, item } => render_array(*depth, item, value),
        Shape::Literal(_) | Shape::Open => Ok(plain(value)),
    }
}

fn render_array(depth: usize, item: &Shape, value: &Value) -> Result<Value> {
    let Some(items) = value.as_array() else {
        return Ok(plain(value));
    };
    let rendered = items
        .iter()
        .map(|v| if depth > 1 { render_array(depth - 1, item, v) } else { render(item, v) })
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::Array(rendered))
}

/// Dates become ISO-8601 strings at any depth.
fn plain(value: &Value) -> Value {
    match value {
        Value::Date(d) => Value::String(iso8601(d)),
        Value::Array(items) => Value::Array(items.iter().map(plain).collect()),
        Value::Object(map) => Value::Object(map.iter().map(|(k, v)| (k.clone(), plain(v))).collect()),
        other => other.clone(),
    }
}
