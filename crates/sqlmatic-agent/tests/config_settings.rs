//! Configuration loading: YAML overrides layered over defaults.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use sqlmatic_agent::{AgentConfig, BackendKind, ConfigError, ReturnFormat};

#[test]
fn defaults_apply_when_the_file_is_minimal() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("config.yaml");
    fs::write(&path, "model: gpt-4o\n").expect("write config");

    let config = AgentConfig::load(&path).expect("load config");
    assert_eq!(config.model, "gpt-4o");
    assert_eq!(config.max_tool_rounds, 8);
    assert_eq!(config.thread_capacity, 64);
    assert_eq!(config.database.kind, BackendKind::Sqlite);
    assert_eq!(config.tool_execute_sql.max_results, 100);
    assert_eq!(config.tool_execute_sql.max_execution_time, 30);
    assert_eq!(config.tool_get_schema.max_tables, 100);
    assert!(config.tool_get_schema.include_relationships);
    assert_eq!(config.evaluation.similarity_threshold, 0.8);
    assert_eq!(config.tool_get_data_dictionary.max_results, 5);
}

#[test]
fn nested_sections_override_defaults() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("config.yaml");
    fs::write(
        &path,
        "model: local-model\n\
         max_tool_rounds: 3\n\
         database:\n\
         \x20 kind: documents\n\
         \x20 path: fixtures/collections\n\
         tool_execute_sql:\n\
         \x20 max_results: 25\n\
         \x20 return_format: delimited-text\n\
         evaluation:\n\
         \x20 similarity_threshold: 0.9\n",
    )
    .expect("write config");

    let config = AgentConfig::load(&path).expect("load config");
    assert_eq!(config.max_tool_rounds, 3);
    assert_eq!(config.database.kind, BackendKind::Documents);
    assert_eq!(config.database.path, PathBuf::from("fixtures/collections"));
    assert_eq!(config.tool_execute_sql.max_results, 25);
    assert_eq!(config.tool_execute_sql.return_format, ReturnFormat::DelimitedText);
    assert_eq!(config.evaluation.similarity_threshold, 0.9);
    // Untouched sections keep their defaults.
    assert_eq!(config.tool_get_schema.max_tables, 100);
}

#[test]
fn missing_file_is_a_read_error() {
    let error = AgentConfig::load(&PathBuf::from("/nonexistent/config.yaml"))
        .expect_err("must fail");
    assert!(matches!(error, ConfigError::Read { .. }));
}

#[test]
fn malformed_yaml_is_a_parse_error() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("config.yaml");
    fs::write(&path, "model: [unclosed\n").expect("write config");

    let error = AgentConfig::load(&path).expect_err("must fail");
    assert!(matches!(error, ConfigError::Parse { .. }));
}

#[test]
fn blank_api_key_counts_as_unset() {
    let config = AgentConfig {
        api_key: Some("   ".to_string()),
        ..AgentConfig::default()
    };
    // Whitespace-only keys fall through to the environment (or None).
    if std::env::var("OPENAI_API_KEY").is_err() {
        assert!(config.resolve_api_key().is_none());
    }

    let config = AgentConfig {
        api_key: Some("sk-test".to_string()),
        ..AgentConfig::default()
    };
    assert_eq!(config.resolve_api_key().as_deref(), Some("sk-test"));
}
