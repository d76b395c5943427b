//! Generic value walker
//!
//! Visits a realized value in a deterministic order and reports, for every
//! container and every leaf, the full path from the root. The shape of each
//! node is discovered from the value itself; a schema can be bound to attach
//! property names, optionality and annotations to the path, but it never
//! drives the traversal.
//!
//! Order: a container is reported before its children, arrays by index and
//! objects by sorted key. Nulls are skipped.

use crate::attribute::safe_key;
use crate::reflection::{ObjectItem, Reflection};
use crate::value::Value;

/// Observed shape of one step on a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathNode {
    /// Root object
    Object { label: String },
    /// Root array
    Array { label: String },
    /// Member of an object. `key` is the key found in the value.
    ObjectItem { name: String, key: String, optional: bool },
    /// Element of an array, named `[idx]`
    ArrayItem { name: String, idx: usize },
    /// Scalar root
    Literal,
}

impl PathNode {
    fn segment(&self) -> Option<&str> {
        match self {
            PathNode::Object { label } | PathNode::Array { label } => Some(label).filter(|l| !l.is_empty()).map(String::as_str),
            PathNode::ObjectItem { name, .. } | PathNode::ArrayItem { name, .. } => Some(name),
            PathNode::Literal => None,
        }
    }
}

/// One step on a path with the value found there
#[derive(Debug, Clone, PartialEq)]
pub struct PathEntry<'a> {
    pub node: PathNode,
    /// Schema of the value at this step, when a schema is bound and knows it
    pub schema: Option<&'a Reflection>,
    pub value: &'a Value,
}

impl PathEntry<'_> {
    /// Leaf values are everything except objects and arrays.
    pub fn is_leaf(&self) -> bool {
        !matches!(self.value, Value::Object(_) | Value::Array(_))
    }
}

/// Dotted rendering of a path: root label, then item names. Index segments
/// attach without a dot.
pub fn as_dotted_path(path: &[PathEntry<'_>]) -> String {
    let mut out = String::new();
    for segment in path.iter().filter_map(|e| e.node.segment()) {
        if !out.is_empty() && !segment.starts_with('[') {
            out.push('.');
        }
        out.push_str(segment);
    }
    out
}

/// Value at the end of a path
pub fn path_value<'a>(path: &[PathEntry<'a>]) -> Option<&'a Value> {
    path.last().map(|e| e.value)
}

/// Deterministic traversal over one value
#[derive(Debug, Clone)]
pub struct Walker<'a> {
    value: &'a Value,
    schema: Option<&'a Reflection>,
    label: String,
}

impl<'a> Walker<'a> {
    pub fn new(value: &'a Value) -> Self {
        Self { value, schema: None, label: String::new() }
    }

    /// Bind a schema; the root label defaults to its title.
    pub fn with_schema(value: &'a Value, schema: &'a Reflection) -> Self {
        let label = schema
            .as_object()
            .and_then(|o| o.title.clone().or_else(|| o.id.clone()))
            .unwrap_or_default();
        Self { value, schema: Some(schema), label }
    }

    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn value(&self) -> &'a Value {
        self.value
    }

    pub fn schema(&self) -> Option<&'a Reflection> {
        self.schema
    }

    /// Call `f` with the path to every container and every leaf.
    pub fn apply<F>(&self, mut f: F)
    where
        F: FnMut(&[PathEntry<'a>]),
    {
        let node = match self.value {
            Value::Null => return,
            Value::Object(_) => PathNode::Object { label: self.label.clone() },
            Value::Array(_) => PathNode::Array { label: self.label.clone() },
            _ => PathNode::Literal,
        };
        let mut path = vec![PathEntry { node, schema: self.schema, value: self.value }];
        visit(&mut path, self.value, self.schema, &mut f);
    }

    /// Every emitted path, collected.
    pub fn paths(&self) -> Vec<Vec<PathEntry<'a>>> {
        let mut out = Vec::new();
        self.apply(|path| out.push(path.to_vec()));
        out
    }
}

fn bound_property<'a>(schema: Option<&'a Reflection>, key: &str) -> Option<&'a ObjectItem> {
    schema
        .and_then(Reflection::as_object)
        .and_then(|obj| obj.properties.iter().find(|p| p.name == key || safe_key(&p.name) == key))
}

fn visit<'a, F>(path: &mut Vec<PathEntry<'a>>, value: &'a Value, schema: Option<&'a Reflection>, f: &mut F)
where
    F: FnMut(&[PathEntry<'a>]),
{
    match value {
        Value::Null => {}
        Value::Array(items) => {
            f(path.as_slice());
            let item_schema = schema.and_then(Reflection::as_array).map(|a| a.items.as_ref());
            for (idx, item) in items.iter().enumerate() {
                path.push(PathEntry {
                    node: PathNode::ArrayItem { name: format!("[{}]", idx), idx },
                    schema: item_schema,
                    value: item,
                });
                visit(path, item, item_schema, f);
                path.pop();
            }
        }
        Value::Object(map) => {
            f(path.as_slice());
            // BTreeMap iteration is already sorted by key
            for (key, member) in map {
                let bound = bound_property(schema, key);
                let member_schema = bound.map(|p| p.property.as_ref());
                path.push(PathEntry {
                    node: PathNode::ObjectItem {
                        name: bound.map_or_else(|| key.clone(), |p| p.name.clone()),
                        key: key.clone(),
                        optional: bound.map_or(false, |p| p.optional),
                    },
                    schema: member_schema,
                    value: member,
                });
                visit(path, member, member_schema, f);
                path.pop();
            }
        }
        _ => f(path.as_slice()),
    }
}
