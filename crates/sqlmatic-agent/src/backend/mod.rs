//! Canonical schema description and the closed set of database backends.
//!
//! Backends are selected by the configuration-time `database.kind` tag and
//! expose one capability interface: `describe_schema` plus
//! `execute_if_supported`. Adding a backend means adding a variant here.

mod documents;
mod sqlite;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{BackendKind, DatabaseSettings};
use crate::error::{QueryError, SchemaError};
use crate::observability::AgentEvent;

pub use documents::DocumentBackend;
pub use sqlite::SqliteBackend;

/// One column of a table (or one flattened field of a document collection).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescription {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub notnull: bool,
    pub pk: bool,
}

/// Foreign key edge from a column of this table to another table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyDescription {
    #[serde(rename = "from")]
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
}

/// One table (or document collection), columns in source-engine order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescription {
    pub name: String,
    pub columns: Vec<ColumnDescription>,
    pub foreign_keys: Vec<ForeignKeyDescription>,
}

/// One index, reported when `include_indexes` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescription {
    pub table: String,
    pub name: String,
    pub unique: bool,
}

/// Canonical, backend-independent description of a database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDescription {
    pub tables: Vec<TableDescription>,
    pub indexes: Vec<IndexDescription>,
}

/// Options recognized by `describe_schema`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaOptions {
    /// Cap on the number of tables enumerated.
    #[serde(default = "default_max_tables")]
    pub max_tables: usize,
    /// Skip engine-internal tables (`sqlite_*`, `system.*` collections).
    #[serde(default)]
    pub exclude_system_tables: bool,
    /// Populate foreign keys.
    #[serde(default = "default_true")]
    pub include_relationships: bool,
    /// Populate the index list.
    #[serde(default)]
    pub include_indexes: bool,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self {
            max_tables: default_max_tables(),
            exclude_system_tables: false,
            include_relationships: true,
            include_indexes: false,
        }
    }
}

/// Output shaping for `execute`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReturnFormat {
    /// One JSON object per row, keyed by column name.
    #[default]
    StructuredRecords,
    /// CSV text with a header row.
    DelimitedText,
    /// Positional value arrays.
    RawTuples,
}

/// Options recognized by `execute`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Execution time bound in seconds; exceeding it cancels the statement.
    #[serde(default = "default_max_execution_time")]
    pub max_execution_time: u64,
    /// Row cap on the returned window; the true total is reported separately.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default)]
    pub return_format: ReturnFormat,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            max_execution_time: default_max_execution_time(),
            max_results: default_max_results(),
            return_format: ReturnFormat::default(),
        }
    }
}

/// Rows of the truncated window, shaped per the requested format.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryRows {
    Records(Vec<serde_json::Map<String, serde_json::Value>>),
    Delimited(String),
    Tuples(Vec<Vec<serde_json::Value>>),
}

/// Result of executing a statement. `row_count` is always the true total
/// before truncation; `columns` is empty only for non-query statements.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub results: QueryRows,
    pub row_count: usize,
    pub message: String,
}

/// Closed set of database backends behind one capability interface.
pub enum DatabaseBackend {
    Sqlite(SqliteBackend),
    Documents(DocumentBackend),
}

impl DatabaseBackend {
    /// Build the backend named by the configuration tag.
    pub fn from_settings(settings: &DatabaseSettings) -> Self {
        match settings.kind {
            BackendKind::Sqlite => Self::Sqlite(SqliteBackend::new(&settings.path)),
            BackendKind::Documents => Self::Documents(DocumentBackend::new(&settings.path)),
        }
    }

    /// Backend tag used in logs and error values.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "sqlite",
            Self::Documents(_) => "documents",
        }
    }

    /// Whether this backend can execute SQL statements.
    pub const fn supports_sql(&self) -> bool {
        matches!(self, Self::Sqlite(_))
    }

    /// Produce the canonical schema description. Atomic: either a complete
    /// description or a single error value. Foreign keys whose target table
    /// is absent from the (possibly capped) description are dropped.
    pub async fn describe_schema(
        &self,
        options: &SchemaOptions,
    ) -> Result<SchemaDescription, SchemaError> {
        let mut description = match self {
            Self::Sqlite(backend) => backend.describe_schema(options).await?,
            Self::Documents(backend) => backend.describe_schema(options).await?,
        };
        let known: HashSet<String> = description
            .tables
            .iter()
            .map(|table| table.name.clone())
            .collect();
        for table in &mut description.tables {
            table
                .foreign_keys
                .retain(|fk| known.contains(&fk.to_table));
        }
        debug!(
            event = AgentEvent::SchemaDescribed.as_str(),
            backend = self.kind(),
            tables = description.tables.len(),
            indexes = description.indexes.len(),
            "schema described"
        );
        Ok(description)
    }

    /// Execute a SQL statement if this backend supports SQL; `None` otherwise.
    pub async fn execute_if_supported(
        &self,
        sql: &str,
        options: &QueryOptions,
    ) -> Option<Result<QueryOutput, QueryError>> {
        match self {
            Self::Sqlite(backend) => Some(backend.execute(sql, options).await),
            Self::Documents(_) => None,
        }
    }
}

/// Shape the truncated row window per the requested format.
pub(crate) fn format_rows(
    columns: &[String],
    window: &[Vec<serde_json::Value>],
    format: ReturnFormat,
) -> Result<QueryRows, QueryError> {
    match format {
        ReturnFormat::StructuredRecords => {
            let records = window
                .iter()
                .map(|row| {
                    columns
                        .iter()
                        .cloned()
                        .zip(row.iter().cloned())
                        .collect::<serde_json::Map<_, _>>()
                })
                .collect();
            Ok(QueryRows::Records(records))
        }
        ReturnFormat::RawTuples => Ok(QueryRows::Tuples(window.to_vec())),
        ReturnFormat::DelimitedText => {
            let mut writer = csv::Writer::from_writer(Vec::new());
            writer
                .write_record(columns)
                .map_err(|e| QueryError::Other(format!("failed to format results: {e}")))?;
            for row in window {
                let fields: Vec<String> = row.iter().map(value_to_field).collect();
                writer
                    .write_record(&fields)
                    .map_err(|e| QueryError::Other(format!("failed to format results: {e}")))?;
            }
            let bytes = writer
                .into_inner()
                .map_err(|e| QueryError::Other(format!("failed to format results: {e}")))?;
            let text = String::from_utf8(bytes)
                .map_err(|e| QueryError::Other(format!("failed to format results: {e}")))?;
            Ok(QueryRows::Delimited(text))
        }
    }
}

/// Type-to-string coercion for delimited output.
fn value_to_field(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn default_max_tables() -> usize {
    100
}

fn default_true() -> bool {
    true
}

fn default_max_execution_time() -> u64 {
    30
}

fn default_max_results() -> usize {
    100
}
