use apiweave_test::{resolve_path, MultipartForm};
use serde_json::{json, Value};

#[test]
fn resolves_nested_fields_and_indices() {
    let v = json!({"detail": {"json": {"name": ["Missing data for required field."]}}});
    assert_eq!(
        resolve_path(&v, "detail.json.name[0]"),
        json!("Missing data for required field.")
    );
}

#[test]
fn len_counts_arrays_and_objects() {
    let v = json!({"pets": [1, 2, 3], "meta": {"a": 1, "b": 2}});
    assert_eq!(resolve_path(&v, "pets.len()"), json!(3));
    assert_eq!(resolve_path(&v, "meta.len()"), json!(2));
}

#[test]
fn missing_members_are_null() {
    let v = json!({"name": "Buddy"});
    assert_eq!(resolve_path(&v, "category"), Value::Null);
    assert_eq!(resolve_path(&v, "tags[3]"), Value::Null);
}

#[test]
fn multipart_body_has_one_part_per_field() {
    let form = MultipartForm::new()
        .text("name", "avatar")
        .file("image", "cat.png", "image/png", b"png-bytes".to_vec());
    assert!(form.content_type().contains(MultipartForm::BOUNDARY));
    let body = String::from_utf8(form.into_body()).unwrap();
    assert!(body.contains("name=\"name\"\r\n\r\navatar\r\n"));
    assert!(body.contains("name=\"image\"; filename=\"cat.png\"\r\nContent-Type: image/png"));
    assert!(body.ends_with(&format!("--{}--\r\n", MultipartForm::BOUNDARY)));
}
