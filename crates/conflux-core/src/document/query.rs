use serde_json::{Map, Number, Value};

use crate::patch::ObjectId;

use super::types::{ConflictRegister, DocValue, Node};
use super::Document;

impl Document {
    /// Materialized JSON view of the whole document.
    pub fn view(&self) -> Value {
        self.view_of(&self.root).unwrap_or(Value::Null)
    }

    /// Materialized JSON view of one container. Maps render as objects,
    /// lists as arrays with unset slots as `null`, counters as their current
    /// integer value.
    pub fn view_of(&self, id: &ObjectId) -> Option<Value> {
        match self.nodes.get(id)? {
            Node::Map(node) => {
                let mut out = Map::new();
                for (key, value) in &node.entries {
                    out.insert(key.clone(), self.value_view(value));
                }
                Some(Value::Object(out))
            }
            Node::List(node) => Some(Value::Array(
                node.values
                    .iter()
                    .map(|slot| match slot {
                        Some(value) => self.value_view(value),
                        None => Value::Null,
                    })
                    .collect(),
            )),
        }
    }

    fn value_view(&self, value: &DocValue) -> Value {
        match value {
            DocValue::Primitive(v) => v.clone(),
            DocValue::Counter(n) => Value::Number(Number::from(*n)),
            DocValue::Map(id) | DocValue::List(id) => self.view_of(id).unwrap_or(Value::Null),
        }
    }

    pub fn contains_object(&self, id: &ObjectId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Rest state of the mutation guard: `true` whenever no apply call owns
    /// the node.
    pub fn is_frozen(&self, id: &ObjectId) -> Option<bool> {
        self.nodes.get(id).map(Node::is_frozen)
    }

    pub fn map_get(&self, id: &ObjectId, key: &str) -> Option<&DocValue> {
        match self.nodes.get(id)? {
            Node::Map(node) => node.entries.get(key),
            Node::List(_) => None,
        }
    }

    pub fn map_keys(&self, id: &ObjectId) -> Option<impl Iterator<Item = &str> + '_> {
        match self.nodes.get(id)? {
            Node::Map(node) => Some(node.entries.keys().map(String::as_str)),
            Node::List(_) => None,
        }
    }

    /// The conflict register for one map key: every concurrently written
    /// candidate last seen for that key.
    pub fn map_conflicts(&self, id: &ObjectId, key: &str) -> Option<&ConflictRegister> {
        match self.nodes.get(id)? {
            Node::Map(node) => node.recent_ops.get(key),
            Node::List(_) => None,
        }
    }

    pub fn list_len(&self, id: &ObjectId) -> Option<usize> {
        match self.nodes.get(id)? {
            Node::List(node) => Some(node.values.len()),
            Node::Map(_) => None,
        }
    }

    /// Visible value at a list index; `None` for unset placeholder slots and
    /// out-of-range indices.
    pub fn list_get(&self, id: &ObjectId, index: usize) -> Option<&DocValue> {
        match self.nodes.get(id)? {
            Node::List(node) => node.values.get(index)?.as_ref(),
            Node::Map(_) => None,
        }
    }

    pub fn elem_ids(&self, id: &ObjectId) -> Option<&[String]> {
        match self.nodes.get(id)? {
            Node::List(node) => Some(&node.elem_ids),
            Node::Map(_) => None,
        }
    }

    /// The conflict register for one list slot, positionally in parallel
    /// with the values and elem id sequences.
    pub fn list_conflicts(&self, id: &ObjectId, index: usize) -> Option<&ConflictRegister> {
        match self.nodes.get(id)? {
            Node::List(node) => node.recent_ops.get(index)?.as_ref(),
            Node::Map(_) => None,
        }
    }
}
