//! In-memory document graph and patch application.
//!
//! Design note:
//! - Containers are arena-held nodes addressed by object id. Values reference
//!   children by id, so re-materializing a container whose id matches an
//!   existing node mutates that node in place, and a slot's conflict register
//!   shares the node with the visible value by construction.
//! - Application is single-threaded and synchronous. The `frozen` flag on
//!   every node is a mutation guard for external readers, not a lock; callers
//!   serialize patch application per document root.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::patch::{ObjectId, Patch};

mod apply;
mod query;
pub(crate) mod types;

pub use types::{ConflictRegister, DocValue};

use types::{MapNode, Node};

/// Object id of the document root created by [`Document::new`].
pub const ROOT_OBJECT_ID: &str = "_root";

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("no such object in document: {0}")]
    UnknownObject(ObjectId),
    #[error("patch kind does not match node kind for object: {0}")]
    NodeKindMismatch(ObjectId),
    #[error("edit index {index} out of bounds for list of length {len}")]
    EditOutOfBounds { index: usize, len: usize },
    #[error("prop index {index} out of bounds for list of length {len}")]
    PropOutOfBounds { index: usize, len: usize },
    #[error("document invariant violation: {0}")]
    InvariantViolation(String),
}

/// The local replica's materialized document plus the conflict history needed
/// to merge future patches.
#[derive(Debug, Clone)]
pub struct Document {
    pub(crate) nodes: HashMap<ObjectId, Node>,
    pub(crate) root: ObjectId,
}

impl Document {
    /// Creates a document whose root is an empty map under [`ROOT_OBJECT_ID`].
    pub fn new() -> Self {
        Self::with_root(ObjectId::from(ROOT_OBJECT_ID))
    }

    /// Creates a document with an empty map root under an explicit id.
    pub fn with_root(root: ObjectId) -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(root.clone(), Node::Map(MapNode::default()));
        Self { nodes, root }
    }

    pub fn root_id(&self) -> &ObjectId {
        &self.root
    }

    /// Applies one patch to the object it names. The target must already be
    /// present in the document; nested containers are created on demand while
    /// materializing sub-patches.
    pub fn apply_patch(&mut self, patch: &Patch) -> Result<(), ApplyError> {
        let target = patch.object_id().clone();
        self.apply_to(&target, patch)?;
        #[cfg(debug_assertions)]
        self.validate_invariants()
            .map_err(ApplyError::InvariantViolation)?;
        Ok(())
    }

    /// Checks the document graph invariants: the root exists, list sequences
    /// are in lock-step, every visible value is its register's Lamport
    /// winner, references resolve, no node is unreachable, and every
    /// mutation guard is back in its rest state.
    pub fn validate_invariants(&self) -> Result<(), String> {
        if !self.nodes.contains_key(&self.root) {
            return Err("root points to missing node".to_string());
        }
        for (id, node) in &self.nodes {
            match node {
                Node::Map(map) => {
                    if map.entries.len() != map.recent_ops.len() {
                        return Err(format!(
                            "map node {id} has {} entries but {} registers",
                            map.entries.len(),
                            map.recent_ops.len()
                        ));
                    }
                    for (key, value) in &map.entries {
                        let Some(register) = map.recent_ops.get(key) else {
                            return Err(format!("map node {id} key {key} has no register"));
                        };
                        let Some((_, winner)) = register.last_key_value() else {
                            return Err(format!("map node {id} key {key} has an empty register"));
                        };
                        if winner != value {
                            return Err(format!(
                                "map node {id} key {key} visible value is not the Lamport winner"
                            ));
                        }
                    }
                    for register in map.recent_ops.values() {
                        for value in register.values() {
                            self.check_reference(value)?;
                        }
                    }
                    if !map.frozen {
                        return Err(format!("map node {id} left unfrozen outside apply"));
                    }
                }
                Node::List(list) => {
                    if list.values.len() != list.elem_ids.len()
                        || list.values.len() != list.recent_ops.len()
                    {
                        return Err(format!(
                            "list node {id} sequences out of lock-step: {} values, {} elem ids, {} registers",
                            list.values.len(),
                            list.elem_ids.len(),
                            list.recent_ops.len()
                        ));
                    }
                    for (index, slot) in list.values.iter().enumerate() {
                        match (slot, &list.recent_ops[index]) {
                            (Some(value), Some(register)) => {
                                let Some((_, winner)) = register.last_key_value() else {
                                    return Err(format!(
                                        "list node {id} slot {index} has an empty register"
                                    ));
                                };
                                if winner != value {
                                    return Err(format!(
                                        "list node {id} slot {index} visible value is not the Lamport winner"
                                    ));
                                }
                            }
                            (None, None) => {}
                            _ => {
                                return Err(format!(
                                    "list node {id} slot {index} value and register disagree"
                                ));
                            }
                        }
                    }
                    for register in list.recent_ops.iter().flatten() {
                        for value in register.values() {
                            self.check_reference(value)?;
                        }
                    }
                    if !list.frozen {
                        return Err(format!("list node {id} left unfrozen outside apply"));
                    }
                }
            }
        }
        self.check_reachability()
    }

    fn check_reference(&self, value: &DocValue) -> Result<(), String> {
        if let Some(id) = value.object_id() {
            if !self.nodes.contains_key(id) {
                return Err(format!("dangling reference to object {id}"));
            }
        }
        Ok(())
    }

    fn check_reachability(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        let mut stack = vec![self.root.clone()];
        while let Some(id) = stack.pop() {
            if !seen.insert(id.clone()) {
                continue;
            }
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            match node {
                Node::Map(map) => {
                    for register in map.recent_ops.values() {
                        for value in register.values() {
                            if let Some(child) = value.object_id() {
                                stack.push(child.clone());
                            }
                        }
                    }
                }
                Node::List(list) => {
                    for register in list.recent_ops.iter().flatten() {
                        for value in register.values() {
                            if let Some(child) = value.object_id() {
                                stack.push(child.clone());
                            }
                        }
                    }
                }
            }
        }
        for id in self.nodes.keys() {
            if !seen.contains(id) {
                return Err(format!("object {id} is unreachable from the root"));
            }
        }
        Ok(())
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
