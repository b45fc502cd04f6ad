use crate::patch::{ConflictSet, ListEdit, ListPatch, MapPatch, ObjectId, Patch, SubPatch};

use super::types::{ConflictRegister, DocValue, ListNode, MapNode, Node};
use super::{ApplyError, Document};

impl Document {
    /// Per-node dispatch. Opens the mutation guard for the duration of the
    /// call and restores it on every exit path, the error path included.
    pub(crate) fn apply_to(&mut self, id: &ObjectId, patch: &Patch) -> Result<(), ApplyError> {
        if !self.nodes.contains_key(id) {
            return Err(ApplyError::UnknownObject(id.clone()));
        }
        self.set_frozen(id, false);
        let result = self.apply_inner(id, patch);
        self.set_frozen(id, true);
        result
    }

    fn apply_inner(&mut self, id: &ObjectId, patch: &Patch) -> Result<(), ApplyError> {
        if patch.is_noop() {
            // Compatibility no-op: confirm shape, change nothing.
            return Ok(());
        }
        match patch {
            Patch::Map(map_patch) => self.apply_map_patch(id, map_patch),
            Patch::List(list_patch) => self.apply_list_patch(id, list_patch),
        }
    }

    fn apply_map_patch(&mut self, id: &ObjectId, patch: &MapPatch) -> Result<(), ApplyError> {
        if !matches!(self.nodes.get(id), Some(Node::Map(_))) {
            return Err(ApplyError::NodeKindMismatch(id.clone()));
        }
        let Some(props) = &patch.props else {
            return Ok(());
        };
        for (key, candidates) in props {
            if candidates.is_empty() {
                // An empty conflict set is a deletion signal.
                let node = self.map_node_mut(id)?;
                let old_value = node.entries.remove(key);
                let old_register = node.recent_ops.remove(key);
                if let Some(value) = old_value {
                    self.release_value(value);
                }
                if let Some(register) = old_register {
                    self.release_register(register);
                }
                continue;
            }
            let existing = self.map_node_mut(id)?.recent_ops.remove(key);
            let (register, winner) = self.merge_slot(existing, candidates)?;
            let node = self.map_node_mut(id)?;
            node.entries.insert(key.clone(), winner);
            node.recent_ops.insert(key.clone(), register);
        }
        Ok(())
    }

    fn apply_list_patch(&mut self, id: &ObjectId, patch: &ListPatch) -> Result<(), ApplyError> {
        if !matches!(self.nodes.get(id), Some(Node::List(_))) {
            return Err(ApplyError::NodeKindMismatch(id.clone()));
        }
        if let Some(edits) = &patch.edits {
            self.apply_list_edits(id, edits)?;
        }
        let Some(props) = &patch.props else {
            return Ok(());
        };
        for (&index, candidates) in props {
            let len = self.list_node_mut(id)?.values.len();
            if index >= len {
                return Err(ApplyError::PropOutOfBounds { index, len });
            }
            if candidates.is_empty() {
                // Clears the slot's value and history. Structural removal is
                // driven by edits only, so the slot itself stays.
                let node = self.list_node_mut(id)?;
                let old_value = node.values[index].take();
                let old_register = node.recent_ops[index].take();
                if let Some(value) = old_value {
                    self.release_value(value);
                }
                if let Some(register) = old_register {
                    self.release_register(register);
                }
                continue;
            }
            let existing = self.list_node_mut(id)?.recent_ops[index].take();
            let (register, winner) = self.merge_slot(existing, candidates)?;
            let node = self.list_node_mut(id)?;
            node.values[index] = Some(winner);
            node.recent_ops[index] = Some(register);
        }
        Ok(())
    }

    /// Structural edits grow and shrink the three parallel list sequences in
    /// lock-step; positions in the following `props` refer to the post-edit
    /// sequences. Inserted slots stay unset until a property merge fills
    /// them.
    fn apply_list_edits(&mut self, id: &ObjectId, edits: &[ListEdit]) -> Result<(), ApplyError> {
        for edit in edits {
            match edit {
                ListEdit::Insert { index, elem_id } => {
                    let node = self.list_node_mut(id)?;
                    if *index > node.values.len() {
                        return Err(ApplyError::EditOutOfBounds {
                            index: *index,
                            len: node.values.len(),
                        });
                    }
                    node.elem_ids.insert(*index, elem_id.clone());
                    node.values.insert(*index, None);
                    node.recent_ops.insert(*index, None);
                }
                ListEdit::Remove { index } => {
                    let (old_value, old_register) = {
                        let node = self.list_node_mut(id)?;
                        if *index >= node.values.len() {
                            return Err(ApplyError::EditOutOfBounds {
                                index: *index,
                                len: node.values.len(),
                            });
                        }
                        node.elem_ids.remove(*index);
                        (node.values.remove(*index), node.recent_ops.remove(*index))
                    };
                    if let Some(value) = old_value {
                        self.release_value(value);
                    }
                    if let Some(register) = old_register {
                        self.release_register(register);
                    }
                }
            }
        }
        Ok(())
    }

    /// Merges one slot's concurrent candidate set: every candidate is
    /// materialized, the fresh register replaces the old one wholesale, and
    /// the Lamport-greatest candidate becomes the visible value. Candidates
    /// absent from the new set are dropped and released.
    fn merge_slot(
        &mut self,
        mut existing: Option<ConflictRegister>,
        candidates: &ConflictSet,
    ) -> Result<(ConflictRegister, DocValue), ApplyError> {
        let mut register = ConflictRegister::new();
        for (op_id, sub) in candidates.iter().rev() {
            let prior = existing.as_mut().and_then(|reg| reg.remove(op_id));
            let value = self.materialize(prior, sub)?;
            register.insert(op_id.clone(), value);
        }
        if let Some(stale) = existing {
            self.release_register(stale);
        }
        let winner = register
            .last_key_value()
            .map(|(_, value)| value.clone())
            .ok_or_else(|| {
                ApplyError::InvariantViolation("empty conflict set reached merge".to_string())
            })?;
        Ok((register, winner))
    }

    /// Turns one sub-patch into a concrete document value.
    ///
    /// A nested container sub-patch reuses the existing node when the object
    /// id matches and reinitializes it when the id differs, because a
    /// differing id means the remote side replaced the whole subtree with a
    /// newly created container.
    fn materialize(
        &mut self,
        existing: Option<DocValue>,
        sub: &SubPatch,
    ) -> Result<DocValue, ApplyError> {
        match sub {
            SubPatch::Object(patch) => {
                let target = patch.object_id().clone();
                match existing {
                    Some(value) if value.object_id() == Some(&target) => {}
                    Some(value) => self.release_value(value),
                    None => {}
                }
                self.nodes.entry(target.clone()).or_insert_with(|| match patch {
                    Patch::Map(_) => Node::Map(MapNode::default()),
                    Patch::List(_) => Node::List(ListNode::default()),
                });
                self.apply_to(&target, patch)?;
                Ok(match patch {
                    Patch::Map(_) => DocValue::Map(target),
                    Patch::List(_) => DocValue::List(target),
                })
            }
            SubPatch::Counter(value) => {
                if let Some(old) = existing {
                    self.release_value(old);
                }
                Ok(DocValue::Counter(*value))
            }
            SubPatch::Primitive(value) => {
                if let Some(old) = existing {
                    self.release_value(old);
                }
                Ok(DocValue::Primitive(value.clone()))
            }
        }
    }

    fn map_node_mut(&mut self, id: &ObjectId) -> Result<&mut MapNode, ApplyError> {
        match self.nodes.get_mut(id) {
            Some(Node::Map(node)) => Ok(node),
            Some(Node::List(_)) => Err(ApplyError::NodeKindMismatch(id.clone())),
            None => Err(ApplyError::UnknownObject(id.clone())),
        }
    }

    fn list_node_mut(&mut self, id: &ObjectId) -> Result<&mut ListNode, ApplyError> {
        match self.nodes.get_mut(id) {
            Some(Node::List(node)) => Ok(node),
            Some(Node::Map(_)) => Err(ApplyError::NodeKindMismatch(id.clone())),
            None => Err(ApplyError::UnknownObject(id.clone())),
        }
    }

    fn set_frozen(&mut self, id: &ObjectId, frozen: bool) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.set_frozen(frozen);
        }
    }

    fn release_value(&mut self, value: DocValue) {
        match value {
            DocValue::Map(id) | DocValue::List(id) => self.release_tree(&id),
            DocValue::Primitive(_) | DocValue::Counter(_) => {}
        }
    }

    fn release_register(&mut self, register: ConflictRegister) {
        for value in register.into_values() {
            self.release_value(value);
        }
    }

    /// Recursively drops a replaced or deleted subtree from the node arena.
    /// The root node is never released.
    fn release_tree(&mut self, id: &ObjectId) {
        if *id == self.root {
            return;
        }
        let Some(node) = self.nodes.remove(id) else {
            return;
        };
        match node {
            Node::Map(map) => {
                for value in map.entries.into_values() {
                    self.release_value(value);
                }
                for register in map.recent_ops.into_values() {
                    self.release_register(register);
                }
            }
            Node::List(list) => {
                for value in list.values.into_iter().flatten() {
                    self.release_value(value);
                }
                for register in list.recent_ops.into_iter().flatten() {
                    self.release_register(register);
                }
            }
        }
    }
}
