//! JSON-shape validation for incoming patch trees.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::op_id::OpId;

use super::{ConflictSet, ListEdit, ListPatch, MapPatch, ObjectId, Patch, PatchError, SubPatch};

impl Patch {
    /// Validates one JSON-shaped patch node from the sync layer.
    ///
    /// Absent `props` and `edits` fields are preserved as absent; an empty
    /// `props` object is a different statement than no `props` at all.
    pub fn from_json(value: &Value) -> Result<Self, PatchError> {
        let fields = value.as_object().ok_or(PatchError::NotAnObject)?;
        let kind = fields
            .get("type")
            .and_then(Value::as_str)
            .ok_or(PatchError::MissingField("type"))?;
        let object_id = fields
            .get("objectId")
            .and_then(Value::as_str)
            .ok_or(PatchError::MissingField("objectId"))?;
        let object_id = ObjectId::from(object_id);
        match kind {
            "map" => {
                if fields.contains_key("edits") {
                    return Err(PatchError::EditsOnMapPatch);
                }
                let props = fields.get("props").map(decode_map_props).transpose()?;
                Ok(Patch::Map(MapPatch { object_id, props }))
            }
            "list" => {
                let edits = fields.get("edits").map(decode_edits).transpose()?;
                let props = fields.get("props").map(decode_list_props).transpose()?;
                Ok(Patch::List(ListPatch {
                    object_id,
                    edits,
                    props,
                }))
            }
            other => Err(PatchError::UnknownPatchType(other.to_string())),
        }
    }
}

fn decode_map_props(value: &Value) -> Result<BTreeMap<String, ConflictSet>, PatchError> {
    let entries = value.as_object().ok_or(PatchError::NotAnObject)?;
    let mut props = BTreeMap::new();
    for (key, candidates) in entries {
        props.insert(key.clone(), decode_conflict_set(candidates)?);
    }
    Ok(props)
}

fn decode_list_props(value: &Value) -> Result<BTreeMap<usize, ConflictSet>, PatchError> {
    let entries = value.as_object().ok_or(PatchError::NotAnObject)?;
    let mut props = BTreeMap::new();
    for (key, candidates) in entries {
        let index = key
            .parse::<usize>()
            .map_err(|_| PatchError::InvalidIndex(key.clone()))?;
        props.insert(index, decode_conflict_set(candidates)?);
    }
    Ok(props)
}

fn decode_conflict_set(value: &Value) -> Result<ConflictSet, PatchError> {
    let entries = value.as_object().ok_or(PatchError::NotAnObject)?;
    let mut set = ConflictSet::new();
    for (op_id, sub) in entries {
        set.insert(op_id.parse::<OpId>()?, decode_sub_patch(sub)?);
    }
    Ok(set)
}

fn decode_edits(value: &Value) -> Result<Vec<ListEdit>, PatchError> {
    let entries = value.as_array().ok_or(PatchError::EditsNotAnArray)?;
    let mut edits = Vec::with_capacity(entries.len());
    for entry in entries {
        let fields = entry.as_object().ok_or(PatchError::NotAnObject)?;
        let action = fields
            .get("action")
            .and_then(Value::as_str)
            .ok_or(PatchError::MissingField("action"))?;
        let index = fields
            .get("index")
            .and_then(Value::as_u64)
            .ok_or(PatchError::MissingField("index"))?;
        let index =
            usize::try_from(index).map_err(|_| PatchError::InvalidIndex(index.to_string()))?;
        match action {
            "insert" => {
                let elem_id = fields
                    .get("elemId")
                    .and_then(Value::as_str)
                    .ok_or(PatchError::MissingField("elemId"))?;
                edits.push(ListEdit::Insert {
                    index,
                    elem_id: elem_id.to_string(),
                });
            }
            "remove" => edits.push(ListEdit::Remove { index }),
            other => return Err(PatchError::UnknownEditAction(other.to_string())),
        }
    }
    Ok(edits)
}

fn decode_sub_patch(value: &Value) -> Result<SubPatch, PatchError> {
    let fields = value.as_object().ok_or(PatchError::NotAnObject)?;
    if fields.contains_key("objectId") {
        return Ok(SubPatch::Object(Patch::from_json(value)?));
    }
    if let Some(tag) = fields.get("datatype") {
        return decode_counter(fields, tag);
    }
    let scalar = fields
        .get("value")
        .ok_or(PatchError::MissingField("value"))?;
    if scalar.is_array() || scalar.is_object() {
        return Err(PatchError::NonScalarValue);
    }
    Ok(SubPatch::Primitive(scalar.clone()))
}

fn decode_counter(fields: &Map<String, Value>, tag: &Value) -> Result<SubPatch, PatchError> {
    match tag.as_str() {
        Some("counter") => {}
        Some(other) => return Err(PatchError::UnknownDatatype(other.to_string())),
        None => return Err(PatchError::UnknownDatatype(tag.to_string())),
    }
    let value = fields
        .get("value")
        .ok_or(PatchError::MissingField("value"))?;
    value
        .as_i64()
        .map(SubPatch::Counter)
        .ok_or(PatchError::NonIntegerCounter)
}
