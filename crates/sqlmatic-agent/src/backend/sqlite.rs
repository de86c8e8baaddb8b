//! SQLite backend: catalog introspection and bounded statement execution.
//!
//! All rusqlite work runs on the blocking pool. Execution is bounded by
//! `max_execution_time`: when the bound fires, the statement is interrupted
//! through the connection's interrupt handle and any partial rows are
//! discarded.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::Connection;
use tracing::debug;

use crate::error::{QueryError, SchemaError};
use crate::observability::AgentEvent;

use super::{
    format_rows, ColumnDescription, ForeignKeyDescription, IndexDescription, QueryOptions,
    QueryOutput, SchemaDescription, SchemaOptions, TableDescription,
};

const BACKEND: &str = "sqlite";

/// Relational row-store backend over a SQLite database file.
pub struct SqliteBackend {
    path: PathBuf,
}

impl SqliteBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Enumerate tables, columns, foreign keys and (optionally) indexes.
    pub async fn describe_schema(
        &self,
        options: &SchemaOptions,
    ) -> Result<SchemaDescription, SchemaError> {
        let path = self.path.clone();
        let options = options.clone();
        tokio::task::spawn_blocking(move || introspect(&path, &options))
            .await
            .map_err(|e| SchemaError::new(BACKEND, format!("introspection task failed: {e}")))?
    }

    /// Execute one SQL statement with the configured bounds and format.
    pub async fn execute(
        &self,
        sql: &str,
        options: &QueryOptions,
    ) -> Result<QueryOutput, QueryError> {
        let path = self.path.clone();
        let sql_owned = sql.to_string();
        let (handle_tx, handle_rx) = tokio::sync::oneshot::channel();
        let mut task =
            tokio::task::spawn_blocking(move || run_statement(&path, &sql_owned, handle_tx));

        let deadline = Duration::from_secs(options.max_execution_time);
        let raw = match tokio::time::timeout(deadline, &mut task).await {
            Ok(joined) => {
                joined.map_err(|e| QueryError::Other(format!("execution task failed: {e}")))??
            }
            Err(_elapsed) => {
                // Stop the running statement, then reclaim the worker. Partial
                // results are discarded per contract.
                if let Ok(handle) = handle_rx.await {
                    handle.interrupt();
                }
                let _ = task.await;
                return Err(QueryError::Timeout(options.max_execution_time));
            }
        };

        let total = raw.rows.len();
        let window_len = total.min(options.max_results);
        let window = &raw.rows[..window_len];
        let results = format_rows(&raw.columns, window, options.return_format)?;
        let message = match raw.affected {
            Some(affected) => format!("statement executed; {affected} rows affected"),
            None if total > window_len => {
                format!("returned {window_len} of {total} rows (truncated to max_results)")
            }
            None => format!("returned {total} rows"),
        };
        debug!(
            event = AgentEvent::QueryExecuted.as_str(),
            backend = BACKEND,
            row_count = total,
            returned_rows = window_len,
            "query executed"
        );
        Ok(QueryOutput {
            columns: raw.columns,
            results,
            row_count: total,
            message,
        })
    }
}

struct RawOutput {
    columns: Vec<String>,
    rows: Vec<Vec<serde_json::Value>>,
    /// Set for non-query statements (which have no result set).
    affected: Option<usize>,
}

fn run_statement(
    path: &Path,
    sql: &str,
    handle_tx: tokio::sync::oneshot::Sender<rusqlite::InterruptHandle>,
) -> Result<RawOutput, QueryError> {
    let conn = Connection::open(path).map_err(|e| QueryError::Connection(e.to_string()))?;
    // Hand the interrupt handle to the async side; if this races with an
    // already-expired deadline the receiver is simply gone.
    let _ = handle_tx.send(conn.get_interrupt_handle());

    let mut stmt = conn.prepare(sql).map_err(classify_prepare_error)?;
    let column_count = stmt.column_count();
    if column_count == 0 {
        let affected = stmt.execute([]).map_err(classify_runtime_error)?;
        return Ok(RawOutput {
            columns: Vec::new(),
            rows: Vec::new(),
            affected: Some(affected),
        });
    }

    // Column names are captured up front so they survive empty result sets.
    let columns: Vec<String> = stmt.column_names().iter().map(ToString::to_string).collect();
    let mut out = Vec::new();
    let mut rows = stmt.query([]).map_err(classify_runtime_error)?;
    while let Some(row) = rows.next().map_err(classify_runtime_error)? {
        let mut record = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            let value = row.get_ref(idx).map_err(classify_runtime_error)?;
            record.push(value_ref_to_json(value));
        }
        out.push(record);
    }
    Ok(RawOutput {
        columns,
        rows: out,
        affected: None,
    })
}

fn classify_prepare_error(error: rusqlite::Error) -> QueryError {
    let message = error.to_string();
    if message.contains("syntax error") || message.contains("unrecognized token") {
        QueryError::Syntax(message)
    } else {
        QueryError::Other(message)
    }
}

fn classify_runtime_error(error: rusqlite::Error) -> QueryError {
    QueryError::Other(error.to_string())
}

fn value_ref_to_json(value: rusqlite::types::ValueRef<'_>) -> serde_json::Value {
    use rusqlite::types::ValueRef;
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(text) => {
            serde_json::Value::String(String::from_utf8_lossy(text).into_owned())
        }
        ValueRef::Blob(blob) => serde_json::Value::String(format!("<blob {} bytes>", blob.len())),
    }
}

fn introspect(path: &Path, options: &SchemaOptions) -> Result<SchemaDescription, SchemaError> {
    let conn =
        Connection::open(path).map_err(|e| SchemaError::new(BACKEND, e.to_string()))?;

    let tables_sql = if options.exclude_system_tables {
        "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
         ORDER BY name LIMIT ?1"
    } else {
        "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name LIMIT ?1"
    };
    let names = {
        let mut stmt = conn
            .prepare(tables_sql)
            .map_err(|e| SchemaError::new(BACKEND, e.to_string()))?;
        let rows = stmt
            .query_map([options.max_tables as i64], |row| row.get::<_, String>(0))
            .map_err(|e| SchemaError::new(BACKEND, e.to_string()))?;
        rows.collect::<Result<Vec<String>, _>>()
            .map_err(|e| SchemaError::new(BACKEND, e.to_string()))?
    };

    let mut description = SchemaDescription::default();
    for name in names {
        let columns = table_columns(&conn, &name)?;
        let foreign_keys = if options.include_relationships {
            // Missing FK metadata degrades to an empty list, not a failure.
            table_foreign_keys(&conn, &name).unwrap_or_default()
        } else {
            Vec::new()
        };
        if options.include_indexes {
            description.indexes.extend(table_indexes(&conn, &name)?);
        }
        description.tables.push(TableDescription {
            name,
            columns,
            foreign_keys,
        });
    }
    Ok(description)
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<ColumnDescription>, SchemaError> {
    let mut stmt = conn
        .prepare("SELECT name, type, \"notnull\", pk FROM pragma_table_info(?1) ORDER BY cid")
        .map_err(|e| SchemaError::new(BACKEND, e.to_string()))?;
    let rows = stmt
        .query_map([table], |row| {
            Ok(ColumnDescription {
                name: row.get(0)?,
                type_name: row.get(1)?,
                notnull: row.get::<_, i64>(2)? != 0,
                pk: row.get::<_, i64>(3)? != 0,
            })
        })
        .map_err(|e| SchemaError::new(BACKEND, e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| SchemaError::new(BACKEND, e.to_string()))
}

fn table_foreign_keys(
    conn: &Connection,
    table: &str,
) -> Result<Vec<ForeignKeyDescription>, SchemaError> {
    let mut stmt = conn
        .prepare(
            "SELECT \"from\", \"table\", \"to\" FROM pragma_foreign_key_list(?1) \
             ORDER BY id, seq",
        )
        .map_err(|e| SchemaError::new(BACKEND, e.to_string()))?;
    let rows = stmt
        .query_map([table], |row| {
            Ok(ForeignKeyDescription {
                from_column: row.get(0)?,
                to_table: row.get(1)?,
                // SQLite omits the target column when it is the implied
                // primary key; fall back to an empty name.
                to_column: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            })
        })
        .map_err(|e| SchemaError::new(BACKEND, e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| SchemaError::new(BACKEND, e.to_string()))
}

fn table_indexes(conn: &Connection, table: &str) -> Result<Vec<IndexDescription>, SchemaError> {
    let mut stmt = conn
        .prepare("SELECT name, \"unique\" FROM pragma_index_list(?1)")
        .map_err(|e| SchemaError::new(BACKEND, e.to_string()))?;
    let rows = stmt
        .query_map([table], |row| {
            Ok(IndexDescription {
                table: table.to_string(),
                name: row.get(0)?,
                unique: row.get::<_, i64>(1)? != 0,
            })
        })
        .map_err(|e| SchemaError::new(BACKEND, e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| SchemaError::new(BACKEND, e.to_string()))
}
