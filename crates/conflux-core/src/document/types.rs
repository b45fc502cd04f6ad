use std::collections::BTreeMap;

use serde_json::Value;

use crate::op_id::OpId;
use crate::patch::ObjectId;

/// Every concurrently written candidate last seen for one slot, keyed by the
/// operation that wrote it. The Lamport-greatest entry is the visible winner;
/// the rest are retained so a later patch can update one writer's candidate
/// without resending the others.
pub type ConflictRegister = BTreeMap<OpId, DocValue>;

/// A materialized document value. Containers are arena-held nodes addressed
/// by object id, so a `Map`/`List` value is a reference, not a copy.
#[derive(Debug, Clone, PartialEq)]
pub enum DocValue {
    Primitive(Value),
    Counter(i64),
    Map(ObjectId),
    List(ObjectId),
}

impl DocValue {
    pub fn object_id(&self) -> Option<&ObjectId> {
        match self {
            DocValue::Map(id) | DocValue::List(id) => Some(id),
            DocValue::Primitive(_) | DocValue::Counter(_) => None,
        }
    }

    pub fn as_primitive(&self) -> Option<&Value> {
        match self {
            DocValue::Primitive(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_counter(&self) -> Option<i64> {
        match self {
            DocValue::Counter(value) => Some(*value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Node {
    Map(MapNode),
    List(ListNode),
}

impl Node {
    pub(crate) fn set_frozen(&mut self, frozen: bool) {
        match self {
            Node::Map(node) => node.frozen = frozen,
            Node::List(node) => node.frozen = frozen,
        }
    }

    pub(crate) fn is_frozen(&self) -> bool {
        match self {
            Node::Map(node) => node.frozen,
            Node::List(node) => node.frozen,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct MapNode {
    pub(crate) entries: BTreeMap<String, DocValue>,
    pub(crate) recent_ops: BTreeMap<String, ConflictRegister>,
    pub(crate) frozen: bool,
}

impl Default for MapNode {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            recent_ops: BTreeMap::new(),
            frozen: true,
        }
    }
}

/// List state as three parallel sequences. They grow and shrink together;
/// `values[i]` and `recent_ops[i]` are `None` for slots inserted by an edit
/// and not yet filled by a property merge.
#[derive(Debug, Clone)]
pub(crate) struct ListNode {
    pub(crate) values: Vec<Option<DocValue>>,
    pub(crate) elem_ids: Vec<String>,
    pub(crate) recent_ops: Vec<Option<ConflictRegister>>,
    pub(crate) frozen: bool,
}

impl Default for ListNode {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            elem_ids: Vec::new(),
            recent_ops: Vec::new(),
            frozen: true,
        }
    }
}
