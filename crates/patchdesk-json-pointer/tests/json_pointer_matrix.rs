use patchdesk_json_pointer::{
    format_json_pointer, get, get_mut, is_child, parse_checked, parse_json_pointer, validate_json_pointer,
    JsonPointerError,
};
use serde_json::json;

#[test]
fn pointer_parse_format_roundtrip_matrix() {
    let cases = ["", "/", "/foo", "/foo/bar", "/a~0b/c~1d", "/arr/0", "/~0/~1", "/foo///"];

    for pointer in cases {
        let path = parse_json_pointer(pointer);
        assert_eq!(format_json_pointer(&path), pointer, "roundtrip for {pointer:?}");
    }
}

#[test]
fn pointer_get_matrix() {
    let mut doc = json!({"foo": {"bar": [10, 20, null]}});

    assert_eq!(get(&doc, &parse_json_pointer("/foo/bar/0")), Some(&json!(10)));
    assert_eq!(get(&doc, &parse_json_pointer("/foo/bar/2")), Some(&json!(null)));
    assert_eq!(get(&doc, &parse_json_pointer("/foo/bar/3")), None);
    assert_eq!(get(&doc, &parse_json_pointer("/foo/bar/-")), None);

    *get_mut(&mut doc, &parse_json_pointer("/foo/bar/1")).expect("present") = json!(21);
    assert_eq!(doc["foo"]["bar"][1], json!(21));
}

#[test]
fn pointer_empty_key_components() {
    let doc = json!({"": "root-empty", "foo": {"": 1}});

    assert_eq!(get(&doc, &parse_json_pointer("/")), Some(&json!("root-empty")));
    assert_eq!(get(&doc, &parse_json_pointer("/foo/")), Some(&json!(1)));
    assert_eq!(get(&doc, &parse_json_pointer("/foo//")), None);
}

#[test]
fn pointer_validation_and_relationships() {
    assert!(validate_json_pointer("/foo/bar").is_ok());
    assert!(validate_json_pointer("foo/bar").is_err());
    assert_eq!(parse_checked("foo/bar"), Err(JsonPointerError::PointerInvalid));

    let p = parse_json_pointer("/foo/bar");
    let q = parse_json_pointer("/foo/bar/baz");
    assert!(is_child(&p, &q));
    assert!(!is_child(&q, &p));
}

#[test]
fn pointer_get_rejects_non_canonical_index() {
    let doc = json!({"arr": [1, 2, 3]});
    assert_eq!(get(&doc, &parse_json_pointer("/arr/-1")), None);
    assert_eq!(get(&doc, &parse_json_pointer("/arr/01")), None);
}
