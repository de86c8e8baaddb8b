//! Document-store backend: a directory of JSON collections.
//!
//! Each `<collection>.json` file holds an array of documents (or a single
//! document object). The schema is inferred by sampling one representative
//! document per collection and flattening nested objects into dotted-path
//! field names; the store's `_id` identity field is skipped.

use std::path::{Path, PathBuf};

use crate::error::SchemaError;

use super::{ColumnDescription, SchemaDescription, SchemaOptions, TableDescription};

const BACKEND: &str = "documents";

/// Document-store backend over a directory of JSON collection files.
pub struct DocumentBackend {
    dir: PathBuf,
}

impl DocumentBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Infer a flattened field list per collection. Collections without a
    /// sample document are skipped; an empty directory yields an empty
    /// description.
    pub async fn describe_schema(
        &self,
        options: &SchemaOptions,
    ) -> Result<SchemaDescription, SchemaError> {
        let dir = self.dir.clone();
        let options = options.clone();
        tokio::task::spawn_blocking(move || introspect(&dir, &options))
            .await
            .map_err(|e| SchemaError::new(BACKEND, format!("introspection task failed: {e}")))?
    }
}

fn introspect(dir: &Path, options: &SchemaOptions) -> Result<SchemaDescription, SchemaError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| SchemaError::new(BACKEND, format!("cannot open {}: {e}", dir.display())))?;

    let mut collections: Vec<(String, PathBuf)> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| SchemaError::new(BACKEND, e.to_string()))?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        if options.exclude_system_tables && name.starts_with("system.") {
            continue;
        }
        collections.push((name.to_string(), path));
    }
    collections.sort_by(|a, b| a.0.cmp(&b.0));
    collections.truncate(options.max_tables);

    let mut description = SchemaDescription::default();
    for (name, path) in collections {
        let text = std::fs::read_to_string(&path).map_err(|e| {
            SchemaError::new(BACKEND, format!("cannot read {}: {e}", path.display()))
        })?;
        let parsed: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
            SchemaError::new(BACKEND, format!("invalid JSON in {}: {e}", path.display()))
        })?;
        let Some(sample) = sample_document(&parsed) else {
            continue;
        };
        let mut columns = Vec::new();
        flatten_fields(sample, "", &mut columns);
        description.tables.push(TableDescription {
            name,
            columns,
            foreign_keys: Vec::new(),
        });
    }
    Ok(description)
}

/// One representative document: the first array element, or the object itself.
fn sample_document(value: &serde_json::Value) -> Option<&serde_json::Map<String, serde_json::Value>> {
    match value {
        serde_json::Value::Array(documents) => documents.first().and_then(|doc| doc.as_object()),
        serde_json::Value::Object(document) => Some(document),
        _ => None,
    }
}

fn flatten_fields(
    document: &serde_json::Map<String, serde_json::Value>,
    prefix: &str,
    out: &mut Vec<ColumnDescription>,
) {
    for (key, value) in document {
        if key == "_id" {
            continue;
        }
        let field = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            serde_json::Value::Object(nested) => flatten_fields(nested, &field, out),
            other => out.push(ColumnDescription {
                name: field,
                type_name: json_type_name(other).to_string(),
                notnull: false,
                pk: false,
            }),
        }
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
