//! Annotation-driven grouping
//!
//! Collects every walked node whose schema carries a grouping annotation into
//! the named groups it lists. Requires a schema-bound [`Walker`].

use std::collections::BTreeMap;

use serde::Serialize;

use crate::reflection::Reflection;
use crate::value::Value;
use crate::walker::{as_dotted_path, Walker};

/// Default annotation holding group names
pub const GROUPS_ANNOTATION: &str = "x-groups";

/// One grouped node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub path: String,
    pub schema: Reflection,
    pub value: Value,
}

/// Group name to members, in walk order
pub type Groups = BTreeMap<String, Vec<Group>>;

pub fn groups(walker: &Walker<'_>, annotation: &str) -> Groups {
    let mut out = Groups::new();
    walker.apply(|path| {
        let Some(last) = path.last() else {
            return;
        };
        let Some(schema) = last.schema else {
            return;
        };
        let names = schema.annotation(annotation);
        if names.is_empty() {
            return;
        }
        let dotted = as_dotted_path(path);
        for name in names {
            out.entry(name).or_default().push(Group {
                path: dotted.clone(),
                schema: schema.clone(),
                value: last.value.clone(),
            });
        }
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_leaves_and_containers_are_grouped() {
        let schema = Reflection::from_json_schema(&json!({
            "title": "Order",
            "type": "object",
            "properties": {
                "id": { "type": "string", "x-groups": ["key", "index"] },
                "note": { "type": "string" },
                "customer": {
                    "type": "object",
                    "x-groups": "index",
                    "properties": { "name": { "type": "string", "x-groups": ["key"] } }
                }
            }
        }))
        .unwrap();
        let value = Value::from(json!({"id": "o-1", "note": "n", "customer": {"name": "Ada"}}));
        let grouped = groups(&Walker::with_schema(&value, &schema), GROUPS_ANNOTATION);

        let key_paths: Vec<_> = grouped["key"].iter().map(|g| g.path.as_str()).collect();
        assert_eq!(key_paths, vec!["Order.customer.name", "Order.id"]);

        let index_paths: Vec<_> = grouped["index"].iter().map(|g| g.path.as_str()).collect();
        assert_eq!(index_paths, vec!["Order.customer", "Order.id"]);
        assert_eq!(grouped["index"][0].value, Value::from(json!({"name": "Ada"})));
        assert_eq!(grouped.len(), 2);
    }

    #[test]
    fn test_unbound_walker_has_no_groups() {
        let value = Value::from(json!({"id": "x"}));
        assert!(groups(&Walker::new(&value), GROUPS_ANNOTATION).is_empty());
    }
}
