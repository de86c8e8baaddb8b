//! Schema introspection against real SQLite fixture databases.

use rusqlite::Connection;
use tempfile::TempDir;

use sqlmatic_agent::{DatabaseBackend, SchemaOptions, SqliteBackend};

fn fixture_db(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("fixture.db");
    let conn = Connection::open(&path).expect("open fixture db");
    conn.execute_batch(
        "CREATE TABLE artists (
             id INTEGER PRIMARY KEY,
             name TEXT NOT NULL
         );
         CREATE TABLE albums (
             id INTEGER PRIMARY KEY,
             title TEXT NOT NULL,
             artist_id INTEGER REFERENCES artists(id)
         );
         CREATE UNIQUE INDEX idx_artists_name ON artists(name);",
    )
    .expect("create fixture schema");
    path
}

#[tokio::test]
async fn describes_tables_columns_and_foreign_keys() {
    let dir = TempDir::new().expect("tempdir");
    let backend = DatabaseBackend::Sqlite(SqliteBackend::new(fixture_db(&dir)));

    let schema = backend
        .describe_schema(&SchemaOptions::default())
        .await
        .expect("describe schema");

    let names: Vec<&str> = schema.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["albums", "artists"]);

    let artists = &schema.tables[1];
    let id = &artists.columns[0];
    assert_eq!(id.name, "id");
    assert!(id.pk);
    let name = &artists.columns[1];
    assert_eq!(name.type_name, "TEXT");
    assert!(name.notnull);
    assert!(!name.pk);

    let albums = &schema.tables[0];
    assert_eq!(albums.foreign_keys.len(), 1);
    let fk = &albums.foreign_keys[0];
    assert_eq!(fk.from_column, "artist_id");
    assert_eq!(fk.to_table, "artists");
    assert_eq!(fk.to_column, "id");
}

#[tokio::test]
async fn indexes_reported_only_when_requested() {
    let dir = TempDir::new().expect("tempdir");
    let backend = DatabaseBackend::Sqlite(SqliteBackend::new(fixture_db(&dir)));

    let without = backend
        .describe_schema(&SchemaOptions::default())
        .await
        .expect("describe schema");
    assert!(without.indexes.is_empty());

    let options = SchemaOptions {
        include_indexes: true,
        ..SchemaOptions::default()
    };
    let with = backend
        .describe_schema(&options)
        .await
        .expect("describe schema");
    let idx = with
        .indexes
        .iter()
        .find(|i| i.name == "idx_artists_name")
        .expect("fixture index present");
    assert_eq!(idx.table, "artists");
    assert!(idx.unique);
}

#[tokio::test]
async fn relationships_can_be_disabled() {
    let dir = TempDir::new().expect("tempdir");
    let backend = DatabaseBackend::Sqlite(SqliteBackend::new(fixture_db(&dir)));

    let options = SchemaOptions {
        include_relationships: false,
        ..SchemaOptions::default()
    };
    let schema = backend
        .describe_schema(&options)
        .await
        .expect("describe schema");
    assert!(schema.tables.iter().all(|t| t.foreign_keys.is_empty()));
}

#[tokio::test]
async fn foreign_key_to_a_capped_out_table_is_dropped() {
    let dir = TempDir::new().expect("tempdir");
    let backend = DatabaseBackend::Sqlite(SqliteBackend::new(fixture_db(&dir)));

    // Alphabetical cap keeps "albums" but drops "artists", so the
    // albums -> artists edge must not dangle.
    let options = SchemaOptions {
        max_tables: 1,
        ..SchemaOptions::default()
    };
    let schema = backend
        .describe_schema(&options)
        .await
        .expect("describe schema");
    assert_eq!(schema.tables.len(), 1);
    assert_eq!(schema.tables[0].name, "albums");
    assert!(schema.tables[0].foreign_keys.is_empty());
}

#[tokio::test]
async fn empty_database_yields_empty_description() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("empty.db");
    Connection::open(&path).expect("create empty db");
    let backend = DatabaseBackend::Sqlite(SqliteBackend::new(path));

    let schema = backend
        .describe_schema(&SchemaOptions::default())
        .await
        .expect("describe schema");
    assert!(schema.tables.is_empty());
    assert!(schema.indexes.is_empty());
}
