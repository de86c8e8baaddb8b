//! Bounded SQL execution: truncation, formats, error classification, timeout.

use rusqlite::Connection;
use tempfile::TempDir;

use sqlmatic_agent::{
    DatabaseBackend, DocumentBackend, QueryError, QueryOptions, QueryRows, ReturnFormat,
    SqliteBackend,
};

fn seeded_db(dir: &TempDir, rows: usize) -> std::path::PathBuf {
    let path = dir.path().join("seeded.db");
    let conn = Connection::open(&path).expect("open db");
    conn.execute_batch("CREATE TABLE items (id INTEGER PRIMARY KEY, label TEXT)")
        .expect("create table");
    for i in 0..rows {
        conn.execute(
            "INSERT INTO items (id, label) VALUES (?1, ?2)",
            rusqlite::params![i as i64, format!("item-{i}")],
        )
        .expect("insert row");
    }
    path
}

#[tokio::test]
async fn truncates_window_but_reports_true_total() {
    let dir = TempDir::new().expect("tempdir");
    let backend = SqliteBackend::new(seeded_db(&dir, 150));

    let output = backend
        .execute("SELECT id, label FROM items ORDER BY id", &QueryOptions::default())
        .await
        .expect("execute");

    assert_eq!(output.row_count, 150);
    assert_eq!(output.columns, ["id", "label"]);
    match &output.results {
        QueryRows::Records(records) => assert_eq!(records.len(), 100),
        other => panic!("expected records, got {other:?}"),
    }
    assert!(output.message.contains("truncated"), "message: {}", output.message);
}

#[tokio::test]
async fn small_result_set_is_not_marked_truncated() {
    let dir = TempDir::new().expect("tempdir");
    let backend = SqliteBackend::new(seeded_db(&dir, 3));

    let output = backend
        .execute("SELECT id FROM items", &QueryOptions::default())
        .await
        .expect("execute");
    assert_eq!(output.row_count, 3);
    assert!(!output.message.contains("truncated"));
}

#[tokio::test]
async fn delimited_text_round_trips_through_a_csv_reader() {
    let dir = TempDir::new().expect("tempdir");
    let backend = SqliteBackend::new(seeded_db(&dir, 2));

    let options = QueryOptions {
        return_format: ReturnFormat::DelimitedText,
        ..QueryOptions::default()
    };
    let output = backend
        .execute("SELECT id, label FROM items ORDER BY id", &options)
        .await
        .expect("execute");

    let QueryRows::Delimited(text) = &output.results else {
        panic!("expected delimited text");
    };
    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let headers = reader.headers().expect("headers").clone();
    assert_eq!(headers.iter().collect::<Vec<_>>(), ["id", "label"]);
    let rows: Vec<csv::StringRecord> = reader
        .records()
        .collect::<Result<_, _>>()
        .expect("records");
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][1], "item-0");
}

#[tokio::test]
async fn raw_tuples_preserve_column_order() {
    let dir = TempDir::new().expect("tempdir");
    let backend = SqliteBackend::new(seeded_db(&dir, 1));

    let options = QueryOptions {
        return_format: ReturnFormat::RawTuples,
        ..QueryOptions::default()
    };
    let output = backend
        .execute("SELECT id, label FROM items", &options)
        .await
        .expect("execute");
    let QueryRows::Tuples(tuples) = &output.results else {
        panic!("expected tuples");
    };
    assert_eq!(tuples[0][0], serde_json::json!(0));
    assert_eq!(tuples[0][1], serde_json::json!("item-0"));
}

#[tokio::test]
async fn malformed_sql_is_a_syntax_error() {
    let dir = TempDir::new().expect("tempdir");
    let backend = SqliteBackend::new(seeded_db(&dir, 1));

    let error = backend
        .execute("SELEC * FRM items", &QueryOptions::default())
        .await
        .expect_err("malformed SQL must fail");
    assert!(matches!(error, QueryError::Syntax(_)), "got {error:?}");
}

#[tokio::test]
async fn non_query_statement_reports_affected_rows() {
    let dir = TempDir::new().expect("tempdir");
    let backend = SqliteBackend::new(seeded_db(&dir, 5));

    let output = backend
        .execute("DELETE FROM items WHERE id < 3", &QueryOptions::default())
        .await
        .expect("execute");
    assert!(output.columns.is_empty());
    assert_eq!(output.row_count, 0);
    assert!(output.message.contains("3 rows affected"), "message: {}", output.message);
}

#[tokio::test]
async fn empty_result_set_keeps_column_names() {
    let dir = TempDir::new().expect("tempdir");
    let backend = SqliteBackend::new(seeded_db(&dir, 1));

    let output = backend
        .execute("SELECT id, label FROM items WHERE id = 999", &QueryOptions::default())
        .await
        .expect("execute");
    assert_eq!(output.columns, ["id", "label"]);
    assert_eq!(output.row_count, 0);
    match &output.results {
        QueryRows::Records(records) => assert!(records.is_empty()),
        other => panic!("expected records, got {other:?}"),
    }
}

#[tokio::test]
async fn runaway_statement_is_cancelled_at_the_time_bound() {
    let dir = TempDir::new().expect("tempdir");
    let backend = SqliteBackend::new(seeded_db(&dir, 1));

    let options = QueryOptions {
        max_execution_time: 1,
        ..QueryOptions::default()
    };
    let error = backend
        .execute(
            "WITH RECURSIVE counter(n) AS (SELECT 1 UNION ALL SELECT n + 1 FROM counter) \
             SELECT count(*) FROM counter",
            &options,
        )
        .await
        .expect_err("runaway statement must be cancelled");
    assert!(matches!(error, QueryError::Timeout(1)), "got {error:?}");
}

#[tokio::test]
async fn document_backend_declines_sql_execution() {
    let dir = TempDir::new().expect("tempdir");
    let backend = DatabaseBackend::Documents(DocumentBackend::new(dir.path()));

    assert!(!backend.supports_sql());
    let result = backend
        .execute_if_supported("SELECT 1", &QueryOptions::default())
        .await;
    assert!(result.is_none());
}
