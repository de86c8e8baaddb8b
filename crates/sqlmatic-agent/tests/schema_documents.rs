//! Schema inference over a directory of JSON document collections.

use std::fs;

use tempfile::TempDir;

use sqlmatic_agent::{DatabaseBackend, DocumentBackend, SchemaOptions};

fn backend(dir: &TempDir) -> DatabaseBackend {
    DatabaseBackend::Documents(DocumentBackend::new(dir.path()))
}

#[tokio::test]
async fn flattens_nested_fields_and_skips_id() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(
        dir.path().join("users.json"),
        r#"[{"_id": "u1", "name": "Ada", "address": {"city": "London", "zip": 123}, "active": true}]"#,
    )
    .expect("write collection");

    let schema = backend(&dir)
        .describe_schema(&SchemaOptions::default())
        .await
        .expect("describe schema");

    assert_eq!(schema.tables.len(), 1);
    let users = &schema.tables[0];
    assert_eq!(users.name, "users");
    let fields: Vec<(&str, &str)> = users
        .columns
        .iter()
        .map(|c| (c.name.as_str(), c.type_name.as_str()))
        .collect();
    assert!(fields.contains(&("name", "string")));
    assert!(fields.contains(&("address.city", "string")));
    assert!(fields.contains(&("address.zip", "integer")));
    assert!(fields.contains(&("active", "boolean")));
    assert!(!fields.iter().any(|(name, _)| *name == "_id"));
}

#[tokio::test]
async fn single_object_file_is_its_own_sample() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(
        dir.path().join("settings.json"),
        r#"{"theme": "dark", "retries": 3.5}"#,
    )
    .expect("write collection");

    let schema = backend(&dir)
        .describe_schema(&SchemaOptions::default())
        .await
        .expect("describe schema");
    let table = &schema.tables[0];
    let retries = table
        .columns
        .iter()
        .find(|c| c.name == "retries")
        .expect("retries field");
    assert_eq!(retries.type_name, "number");
}

#[tokio::test]
async fn empty_collections_and_non_json_files_are_skipped() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("empty.json"), "[]").expect("write empty collection");
    fs::write(dir.path().join("notes.txt"), "not a collection").expect("write stray file");
    fs::write(dir.path().join("orders.json"), r#"[{"total": 10}]"#).expect("write collection");

    let schema = backend(&dir)
        .describe_schema(&SchemaOptions::default())
        .await
        .expect("describe schema");
    let names: Vec<&str> = schema.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["orders"]);
}

#[tokio::test]
async fn system_collections_are_excluded_on_request() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("system.indexes.json"), r#"[{"v": 1}]"#)
        .expect("write system collection");
    fs::write(dir.path().join("orders.json"), r#"[{"total": 10}]"#).expect("write collection");

    let all = backend(&dir)
        .describe_schema(&SchemaOptions::default())
        .await
        .expect("describe schema");
    assert_eq!(all.tables.len(), 2);

    let options = SchemaOptions {
        exclude_system_tables: true,
        ..SchemaOptions::default()
    };
    let filtered = backend(&dir)
        .describe_schema(&options)
        .await
        .expect("describe schema");
    let names: Vec<&str> = filtered.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["orders"]);
}

#[tokio::test]
async fn collection_cap_applies_alphabetically() {
    let dir = TempDir::new().expect("tempdir");
    for name in ["c.json", "a.json", "b.json"] {
        fs::write(dir.path().join(name), r#"[{"x": 1}]"#).expect("write collection");
    }

    let options = SchemaOptions {
        max_tables: 2,
        ..SchemaOptions::default()
    };
    let schema = backend(&dir)
        .describe_schema(&options)
        .await
        .expect("describe schema");
    let names: Vec<&str> = schema.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["a", "b"]);
}

#[tokio::test]
async fn missing_directory_is_an_error() {
    let dir = TempDir::new().expect("tempdir");
    let missing = dir.path().join("no-such-dir");
    let error = DatabaseBackend::Documents(DocumentBackend::new(missing))
        .describe_schema(&SchemaOptions::default())
        .await
        .expect_err("missing directory must fail");
    assert_eq!(error.backend, "documents");
}

#[tokio::test]
async fn malformed_collection_fails_atomically() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("bad.json"), "{not json").expect("write bad collection");
    fs::write(dir.path().join("good.json"), r#"[{"x": 1}]"#).expect("write collection");

    // No partial description escapes when any collection is unreadable.
    let result = backend(&dir)
        .describe_schema(&SchemaOptions::default())
        .await;
    assert!(result.is_err());
}
