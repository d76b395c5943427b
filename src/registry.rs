//! Type Registry
//!
//! Maps every accepted schema identifier to its factory. The registry is an
//! ordinary value built at the composition root and passed to whatever needs
//! payload dispatch; there is no process-wide instance. Entries are added once
//! and never removed.

use std::collections::HashMap;

use tracing::debug;

use crate::coerce::Formats;
use crate::config::BindingConfig;
use crate::error::{BindingError, Result};
use crate::factory::{Factory, FactoryOptions};
use crate::payload::Payload;
use crate::reflection::Reflection;
use crate::value::Value;

/// The type registry
#[derive(Debug, Default)]
pub struct TypeRegistry {
    /// Factories by id and by title
    factories: HashMap<String, Factory>,
    /// Registered identifiers in registration order
    names: Vec<String>,
    /// Options for factories compiled through [`TypeRegistry::factory`]
    options: FactoryOptions,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: FactoryOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Registry whose compile options come from configuration
    pub fn from_config(config: &BindingConfig) -> Result<Self> {
        Ok(Self::with_options(config.factory_options()?))
    }

    pub fn options(&self) -> &FactoryOptions {
        &self.options
    }

    /// Add a named format handler used by factories compiled from now on.
    pub fn add_format(&mut self, name: impl Into<String>, handler: impl Fn(&Value) -> Value + Send + Sync + 'static) -> &mut Self {
        self.options.formats.add(name, handler);
        self
    }

    pub fn formats(&self) -> &Formats {
        &self.options.formats
    }

    /// Compile a schema with this registry's options and register the result.
    pub fn factory(&mut self, schema: Reflection) -> Result<Factory> {
        let factory = Factory::with_options(schema, &self.options)?;
        self.register(factory.clone());
        Ok(factory)
    }

    /// Register `factory` under every identifier it accepts.
    pub fn register(&mut self, factory: Factory) {
        for name in factory.accepted_names() {
            debug!(name = %name, type_name = %factory.type_name(), "registering factory");
            if !self.factories.contains_key(&name) {
                self.names.push(name.clone());
            }
            self.factories.insert(name, factory.clone());
        }
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Factory> {
        self.factories.get(name)
    }

    /// Every registered identifier, in registration order
    pub fn registered_names(&self) -> &[String] {
        &self.names
    }

    /// Pick the factory named by `payload.Type` and decode the payload with it.
    pub fn dispatch(&self, payload: &Payload) -> Result<(&Factory, Value)> {
        let factory = self
            .get_by_name(&payload.type_name)
            .ok_or_else(|| BindingError::UnknownType(payload.type_name.clone()))?;
        debug!(name = %payload.type_name, "dispatching payload");
        let value = factory.from_payload(payload)?;
        Ok((factory, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::PayloadData;
    use serde_json::json;

    fn schema(id: &str, title: &str) -> Reflection {
        Reflection::from_json_schema(&json!({
            "$id": id,
            "title": title,
            "type": "object",
            "properties": { "n": { "type": "integer" } },
            "required": ["n"]
        }))
        .unwrap()
    }

    #[test]
    fn test_register_under_id_and_title() {
        let mut registry = TypeRegistry::new();
        registry.factory(schema("https://A", "A")).unwrap();
        registry.factory(schema("https://B", "B")).unwrap();

        assert_eq!(registry.registered_names(), ["https://A", "A", "https://B", "B"]);
        assert_eq!(registry.get_by_name("A").map(Factory::type_name), Some("A"));
        assert_eq!(registry.get_by_name("https://B").map(Factory::type_name), Some("B"));
        assert!(registry.get_by_name("C").is_none());
    }

    #[test]
    fn test_dispatch() {
        let mut registry = TypeRegistry::new();
        let a = registry.factory(schema("https://A", "A")).unwrap();
        registry.factory(schema("https://B", "B")).unwrap();

        let value = a.builder().coerce(&Value::from(json!({"n": "7"}))).unwrap();
        let payload = a.to_payload(&value).unwrap();
        let (factory, decoded) = registry.dispatch(&payload).unwrap();
        assert_eq!(factory.type_name(), "A");
        assert_eq!(decoded, value);

        let unknown = Payload { type_name: "Z".to_string(), data: PayloadData::Object(json!({})) };
        assert_eq!(
            registry.dispatch(&unknown).unwrap_err().to_string(),
            "no factory registered for type: Z"
        );
    }

    #[test]
    fn test_formats_apply_to_later_factories() {
        let mut registry = TypeRegistry::new();
        registry.add_format("upper", |v: &Value| match v.as_str() {
            Some(s) => Value::from(s.to_uppercase()),
            None => v.clone(),
        });
        let factory = registry
            .factory(
                Reflection::from_json_schema(&json!({
                    "title": "Shout",
                    "type": "object",
                    "properties": { "word": { "type": "string", "format": "upper" } },
                    "required": ["word"]
                }))
                .unwrap(),
            )
            .unwrap();
        let value = factory.builder().coerce(&Value::from(json!({"word": "hey"}))).unwrap();
        assert_eq!(value.get("word"), Some(&Value::from("HEY")));
        assert_eq!(registry.registered_names(), ["Shout"]);
    }
}
