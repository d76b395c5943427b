//! Familiar Binding
//!
//! A schema-driven data binding runtime. Given a JSON-Schema-like description
//! of a record type, it produces builders that accept loosely typed input,
//! coerce every field to its canonical type and report every failure at once.
//!
//! ## Features
//!
//! - **Coercing Builders**: required, optional and defaulted fields, nested objects and arrays of any depth
//! - **Exact Error Paths**: every failure names the fully dotted path of the failing leaf
//! - **Payload Envelopes**: `{Type, Data}` with pluggable codecs and type-tag verification
//! - **Deterministic Walking**: sorted traversal for record hashing and annotation grouping
//!
//! ## Architecture
//!
//! ```text
//! Reflection ──► Factory ──► Builder ──► Value ──► Walker ──► to_hash / groups
//!                   │           │
//!                   │           └── Attribute (literal, optional, object, array)
//!                   └── TypeRegistry (id/title ──► Factory, payload dispatch)
//! ```

pub mod attribute;
pub mod builder;
pub mod coerce;
pub mod config;
pub mod error;
pub mod factory;
pub mod groups;
pub mod hash;
pub mod payload;
pub mod reflection;
pub mod registry;
pub mod value;
pub mod walker;

pub use attribute::{safe_key, Attribute, AttributeParam, LiteralAttribute, OptionalAttribute};
pub use builder::Builder;
pub use coerce::{Coercer, Formats, LiteralKind};
pub use config::BindingConfig;
pub use error::{BindingError, Result};
pub use factory::{Factory, FactoryOptions, Names};
pub use groups::{groups, Group, Groups};
pub use hash::{to_hash, Exclude, RecordHash};
pub use payload::{JsonBytesCodec, PassThroughCodec, Payload, PayloadCodec, PayloadData};
pub use reflection::Reflection;
pub use registry::TypeRegistry;
pub use value::{Object, Value};
pub use walker::{as_dotted_path, path_value, PathEntry, PathNode, Walker};
