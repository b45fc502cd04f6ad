//! Shape validation of incoming JSON patch trees.

use serde_json::json;

use conflux_core::op_id::OpId;
use conflux_core::patch::{ListEdit, Patch, PatchError, SubPatch};

#[test]
fn decodes_a_map_patch_with_nested_candidates() {
    let patch = Patch::from_json(&json!({
        "type": "map", "objectId": "_root",
        "props": {"x": {
            "3@A": {"value": 10},
            "4@B": {"type": "list", "objectId": "4@B"}
        }}
    }))
    .expect("valid patch");

    let Patch::Map(map_patch) = patch else {
        panic!("expected a map patch");
    };
    let props = map_patch.props.expect("props present");
    let candidates = props.get("x").expect("slot x");
    assert_eq!(candidates.len(), 2);
    assert!(matches!(
        candidates.get(&"3@A".parse::<OpId>().expect("op id")),
        Some(SubPatch::Primitive(value)) if value == &json!(10)
    ));
    assert!(matches!(
        candidates.get(&"4@B".parse::<OpId>().expect("op id")),
        Some(SubPatch::Object(Patch::List(_)))
    ));
}

#[test]
fn decodes_list_edits_in_order() {
    let patch = Patch::from_json(&json!({
        "type": "list", "objectId": "1@A",
        "edits": [
            {"action": "insert", "index": 0, "elemId": "2@A"},
            {"action": "remove", "index": 0}
        ]
    }))
    .expect("valid patch");

    let Patch::List(list_patch) = patch else {
        panic!("expected a list patch");
    };
    assert_eq!(
        list_patch.edits.expect("edits present"),
        vec![
            ListEdit::Insert {
                index: 0,
                elem_id: "2@A".to_string()
            },
            ListEdit::Remove { index: 0 }
        ]
    );
}

#[test]
fn absent_and_empty_props_are_distinct() {
    let noop = Patch::from_json(&json!({"type": "map", "objectId": "_root"})).expect("noop");
    assert!(noop.is_noop());

    let empty =
        Patch::from_json(&json!({"type": "map", "objectId": "_root", "props": {}})).expect("empty");
    assert!(!empty.is_noop());
}

#[test]
fn from_slice_parses_json_text() {
    let patch = Patch::from_slice(br#"{"type":"map","objectId":"_root"}"#).expect("valid text");
    assert_eq!(patch.object_id().as_str(), "_root");

    let err = Patch::from_slice(b"{not json").expect_err("invalid text");
    assert!(matches!(err, PatchError::InvalidJson(_)));
}

#[test]
fn malformed_op_ids_are_rejected() {
    for bad in ["x@A", "@A", "", "12"] {
        let mut tree = json!({
            "type": "map", "objectId": "_root",
            "props": {"k": {}}
        });
        tree["props"]["k"][bad] = json!({"value": 1});
        let err = Patch::from_json(&tree).expect_err("malformed op id");
        assert!(matches!(err, PatchError::MalformedOpId(_)), "for {bad:?}");
    }
}

#[test]
fn unknown_patch_type_is_rejected() {
    let err = Patch::from_json(&json!({"type": "text", "objectId": "1@A"}))
        .expect_err("unknown type");
    assert!(matches!(err, PatchError::UnknownPatchType(kind) if kind == "text"));
}

#[test]
fn missing_required_fields_are_rejected() {
    let err = Patch::from_json(&json!({"objectId": "_root"})).expect_err("missing type");
    assert!(matches!(err, PatchError::MissingField("type")));

    let err = Patch::from_json(&json!({"type": "map"})).expect_err("missing object id");
    assert!(matches!(err, PatchError::MissingField("objectId")));

    let err = Patch::from_json(&json!({
        "type": "list", "objectId": "1@A",
        "edits": [{"action": "insert", "index": 0}]
    }))
    .expect_err("insert without elem id");
    assert!(matches!(err, PatchError::MissingField("elemId")));

    let err = Patch::from_json(&json!({
        "type": "map", "objectId": "_root",
        "props": {"k": {"1@A": {}}}
    }))
    .expect_err("leaf without value");
    assert!(matches!(err, PatchError::MissingField("value")));
}

#[test]
fn non_object_patch_nodes_are_rejected() {
    let err = Patch::from_json(&json!(42)).expect_err("number as patch");
    assert!(matches!(err, PatchError::NotAnObject));

    let err = Patch::from_json(&json!({
        "type": "map", "objectId": "_root",
        "props": {"k": {"1@A": "leaf"}}
    }))
    .expect_err("string as sub-patch");
    assert!(matches!(err, PatchError::NotAnObject));
}

#[test]
fn list_prop_keys_must_be_unsigned_indices() {
    let err = Patch::from_json(&json!({
        "type": "list", "objectId": "1@A",
        "props": {"first": {"2@A": {"value": 1}}}
    }))
    .expect_err("non-numeric index");
    assert!(matches!(err, PatchError::InvalidIndex(key) if key == "first"));
}

#[test]
fn edit_shape_is_validated() {
    let err = Patch::from_json(&json!({
        "type": "list", "objectId": "1@A",
        "edits": {"action": "insert"}
    }))
    .expect_err("edits not an array");
    assert!(matches!(err, PatchError::EditsNotAnArray));

    let err = Patch::from_json(&json!({
        "type": "list", "objectId": "1@A",
        "edits": [{"action": "move", "index": 0}]
    }))
    .expect_err("unknown action");
    assert!(matches!(err, PatchError::UnknownEditAction(action) if action == "move"));

    let err = Patch::from_json(&json!({
        "type": "map", "objectId": "_root",
        "edits": [{"action": "insert", "index": 0, "elemId": "1@A"}]
    }))
    .expect_err("edits on a map patch");
    assert!(matches!(err, PatchError::EditsOnMapPatch));
}

#[test]
fn datatype_tags_are_validated() {
    let err = Patch::from_json(&json!({
        "type": "map", "objectId": "_root",
        "props": {"k": {"1@A": {"value": 1, "datatype": "timestamp"}}}
    }))
    .expect_err("unknown datatype");
    assert!(matches!(err, PatchError::UnknownDatatype(tag) if tag == "timestamp"));

    let err = Patch::from_json(&json!({
        "type": "map", "objectId": "_root",
        "props": {"k": {"1@A": {"value": 1.5, "datatype": "counter"}}}
    }))
    .expect_err("fractional counter");
    assert!(matches!(err, PatchError::NonIntegerCounter));
}

#[test]
fn primitive_values_must_be_scalars() {
    let err = Patch::from_json(&json!({
        "type": "map", "objectId": "_root",
        "props": {"k": {"1@A": {"value": [1, 2]}}}
    }))
    .expect_err("array primitive");
    assert!(matches!(err, PatchError::NonScalarValue));

    for scalar in [json!(1), json!("s"), json!(true), json!(null)] {
        Patch::from_json(&json!({
            "type": "map", "objectId": "_root",
            "props": {"k": {"1@A": {"value": scalar}}}
        }))
        .expect("scalar primitive");
    }
}
