//! Patch tree types and ingestion.
//!
//! Implementation note:
//! - Patches arrive from the sync layer as JSON-shaped trees. Decoding
//!   validates them into closed variants up front so apply logic is
//!   exhaustively matched instead of probing for the presence of fields.
//! - The wire format itself is out of scope; only the in-memory tree shape
//!   is consumed here.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::op_id::OpId;

mod decode;

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("not a valid op id: {0}")]
    MalformedOpId(String),
    #[error("unknown object type in patch: {0}")]
    UnknownPatchType(String),
    #[error("patch node must be a JSON object")]
    NotAnObject,
    #[error("patch is missing required field: {0}")]
    MissingField(&'static str),
    #[error("invalid JSON in patch: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("list prop index is not an unsigned integer: {0}")]
    InvalidIndex(String),
    #[error("list edits must be a JSON array")]
    EditsNotAnArray,
    #[error("unknown edit action: {0}")]
    UnknownEditAction(String),
    #[error("structural edits are only valid on list patches")]
    EditsOnMapPatch,
    #[error("unknown datatype tag: {0}")]
    UnknownDatatype(String),
    #[error("counter value must be an integer")]
    NonIntegerCounter,
    #[error("primitive value must be a JSON scalar")]
    NonScalarValue,
}

/// Stable identity of a document container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ObjectId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Concurrent candidate sub-patches for one key or index, keyed by the
/// operation that wrote each candidate. `OpId`'s `Ord` is the Lamport order,
/// so iteration runs from the Lamport-least to the Lamport-greatest entry.
pub type ConflictSet = BTreeMap<OpId, SubPatch>;

/// A change to one container, already validated into its declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    Map(MapPatch),
    List(ListPatch),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapPatch {
    pub object_id: ObjectId,
    pub props: Option<BTreeMap<String, ConflictSet>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListPatch {
    pub object_id: ObjectId,
    /// Structural edits, applied before `props` against the same sequences.
    pub edits: Option<Vec<ListEdit>>,
    pub props: Option<BTreeMap<usize, ConflictSet>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListEdit {
    Insert { index: usize, elem_id: String },
    Remove { index: usize },
}

/// One candidate value inside a conflict set: a nested container patch, a
/// counter leaf, or a primitive scalar leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum SubPatch {
    Object(Patch),
    Counter(i64),
    Primitive(Value),
}

impl Patch {
    pub fn object_id(&self) -> &ObjectId {
        match self {
            Patch::Map(patch) => &patch.object_id,
            Patch::List(patch) => &patch.object_id,
        }
    }

    /// A patch with neither `props` nor `edits` confirms the object's shape
    /// without changing it.
    pub fn is_noop(&self) -> bool {
        match self {
            Patch::Map(patch) => patch.props.is_none(),
            Patch::List(patch) => patch.props.is_none() && patch.edits.is_none(),
        }
    }

    /// Parses JSON text and validates it as a patch tree.
    pub fn from_slice(data: &[u8]) -> Result<Self, PatchError> {
        let value: Value = serde_json::from_slice(data)?;
        Self::from_json(&value)
    }
}
