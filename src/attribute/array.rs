//! Array-shaped fields
//!
//! Nesting depth comes from the schema. Every leaf is coerced through a fresh
//! item attribute keyed by its index path (`[1][0]`), every failure is
//! collected, and the result keeps the input's array-of-array shape.

use crate::error::{BindingError, Result};
use crate::value::Value;

use super::{resolve_default, Attribute, AttributeParam, Shape};

pub struct ArrayAttribute {
    param: AttributeParam,
    depth: usize,
    item: Shape,
    default: Option<Value>,
    value: Option<Value>,
}

impl ArrayAttribute {
    pub(crate) fn new(param: AttributeParam, depth: usize, item: Shape) -> Self {
        let default = resolve_default(&param, |raw| coerce_items(&param, depth, &item, raw));
        Self { param, depth, item, default, value: None }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl Attribute for ArrayAttribute {
    fn param(&self) -> &AttributeParam {
        &self.param
    }

    fn resolved_default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    fn coerce(&mut self, raw: &Value) -> Result<Value> {
        let value = coerce_items(&self.param, self.depth, &self.item, raw)?;
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

/// Elements of one array level. Keyed containers yield their values in key order.
fn elements(raw: &Value) -> Option<Vec<&Value>> {
    match raw {
        Value::Array(items) => Some(items.iter().collect()),
        Value::Object(map) => Some(map.values().collect()),
        _ => None,
    }
}

fn coerce_items(param: &AttributeParam, depth: usize, item: &Shape, raw: &Value) -> Result<Value> {
    let base = param.dotted_path();
    let mut errors = Vec::new();
    let value = coerce_level(&base, "", depth, item, raw, &mut errors);
    if errors.is_empty() {
        Ok(value)
    } else {
        Err(BindingError::aggregate(errors))
    }
}

fn coerce_level(
    base: &str,
    index: &str,
    depth: usize,
    item: &Shape,
    raw: &Value,
    errors: &mut Vec<BindingError>,
) -> Value {
    let Some(elements) = elements(raw) else {
        errors.push(BindingError::NotAnArray {
            path: format!("{}{}", base, index),
            value: raw.to_string(),
        });
        return Value::Null;
    };
    let mut out = Vec::with_capacity(elements.len());
    for (i, element) in elements.into_iter().enumerate() {
        let key = format!("{}[{}]", index, i);
        if depth > 1 {
            out.push(coerce_level(base, &key, depth - 1, item, element, errors));
            continue;
        }
        let mut attr = item.instantiate(AttributeParam::new(base, key), false);
        match attr.coerce(element) {
            Ok(v) => out.push(v),
            Err(e) => {
                errors.push(e);
                out.push(Value::Null);
            }
        }
    }
    Value::Array(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coerce::{Coercer, LiteralKind};
    use serde_json::json;

    fn int_matrix() -> ArrayAttribute {
        ArrayAttribute::new(
            AttributeParam::new("S", "grid"),
            2,
            Shape::Literal(Coercer::new(LiteralKind::Integer)),
        )
    }

    #[test]
    fn test_nested_arrays_keep_shape() {
        let mut attr = int_matrix();
        let value = attr.coerce(&Value::from(json!([["1", 2.7], [], [3]]))).unwrap();
        assert_eq!(value, Value::from(json!([[1, 2], [], [3]])));
        assert_eq!(attr.get().unwrap(), value);
    }

    #[test]
    fn test_collects_every_failure_with_index_path() {
        let mut attr = int_matrix();
        let err = attr.coerce(&Value::from(json!([["x", 1], ["2", "y"], 5]))).unwrap_err();
        assert_eq!(
            err.lines(),
            vec![
                "Attribute[S.grid[0][0]] is not a number: x",
                "Attribute[S.grid[1][1]] is not a number: y",
                "Attribute[S.grid[2]] is not an array:5",
            ]
        );
        assert_eq!(attr.get().unwrap_err().to_string(), "Attribute[S.grid] is required");
    }

    #[test]
    fn test_keyed_container_iterates_values() {
        let mut attr = ArrayAttribute::new(
            AttributeParam::new("S", "names"),
            1,
            Shape::Literal(Coercer::new(LiteralKind::String)),
        );
        let value = attr.coerce(&Value::from(json!({"b": "second", "a": "first"}))).unwrap();
        assert_eq!(value, Value::from(json!(["first", "second"])));
    }

    #[test]
    fn test_default_is_coerced() {
        let param = AttributeParam::new("S", "grid").with_default(Value::from(json!([["4"]])));
        let attr = ArrayAttribute::new(param, 2, Shape::Literal(Coercer::new(LiteralKind::Integer)));
        assert_eq!(attr.get().unwrap(), Value::from(json!([[4]])));
    }
}
