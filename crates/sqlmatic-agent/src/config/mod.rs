//! Agent configuration.
//!
//! One immutable `AgentConfig` value is constructed at process start (from a
//! YAML file plus environment fallback for the API key) and passed explicitly
//! to every component constructor. There is no global configuration state.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::backend::{QueryOptions, SchemaOptions};
use crate::error::ConfigError;

/// Default chat completions endpoint.
pub const DEFAULT_INFERENCE_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Process-wide settings shared by all components.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Chat completions endpoint (OpenAI-compatible).
    #[serde(default = "default_inference_url")]
    pub inference_url: String,
    /// Model id (e.g. `gpt-4o-mini`).
    #[serde(default = "default_model")]
    pub model: String,
    /// API key; if None, read from env `OPENAI_API_KEY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// System directive prepended to every model invocation so instructions
    /// are never lost regardless of history length.
    #[serde(default = "default_system_directive")]
    pub system_directive: String,
    /// Max tool-dispatch rounds per turn; exceeding it aborts the turn with
    /// a diagnostic instead of looping forever.
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,
    /// Max live threads held in memory before LRU eviction.
    #[serde(default = "default_thread_capacity")]
    pub thread_capacity: usize,
    /// Backend selection and location.
    #[serde(default)]
    pub database: DatabaseSettings,
    /// Defaults for the `get_schema` tool.
    #[serde(default)]
    pub tool_get_schema: SchemaOptions,
    /// Defaults for the `execute_sql` tool.
    #[serde(default)]
    pub tool_execute_sql: QueryOptions,
    /// Reference table for the `lookup_field` tool.
    #[serde(default)]
    pub tool_get_data_dictionary: DictionarySettings,
    /// Offline evaluation settings.
    #[serde(default)]
    pub evaluation: EvaluationSettings,
}

impl AgentConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// API key from config, else `OPENAI_API_KEY`. Empty values count as unset.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| {
                std::env::var("OPENAI_API_KEY")
                    .ok()
                    .filter(|key| !key.trim().is_empty())
            })
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            inference_url: default_inference_url(),
            model: default_model(),
            api_key: None,
            system_directive: default_system_directive(),
            max_tool_rounds: default_max_tool_rounds(),
            thread_capacity: default_thread_capacity(),
            database: DatabaseSettings::default(),
            tool_get_schema: SchemaOptions::default(),
            tool_execute_sql: QueryOptions::default(),
            tool_get_data_dictionary: DictionarySettings::default(),
            evaluation: EvaluationSettings::default(),
        }
    }
}

/// Closed set of supported backend variants, selected by configuration tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Relational row store (SQLite file).
    Sqlite,
    /// Document store (directory of JSON collections).
    Documents,
}

/// Backend selection and location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_backend_kind")]
    pub kind: BackendKind,
    /// Database file (sqlite) or collection directory (documents).
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            kind: default_backend_kind(),
            path: default_database_path(),
        }
    }
}

/// Data dictionary reference table: a CSV with named columns, re-read on
/// every lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DictionarySettings {
    #[serde(default = "default_dictionary_path")]
    pub file_path: PathBuf,
    /// Column holding field names (matched case-insensitively).
    #[serde(default = "default_field_column")]
    pub field_column: String,
    /// Column holding human-authored descriptions.
    #[serde(default = "default_description_column")]
    pub description_column: String,
    /// Optional column with additional metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_column: Option<String>,
    /// Cap on returned entries.
    #[serde(default = "default_dictionary_max_results")]
    pub max_results: usize,
}

impl Default for DictionarySettings {
    fn default() -> Self {
        Self {
            file_path: default_dictionary_path(),
            field_column: default_field_column(),
            description_column: default_description_column(),
            metadata_column: None,
            max_results: default_dictionary_max_results(),
        }
    }
}

/// Offline evaluation harness settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationSettings {
    /// CSV of labeled cases (question + ground-truth SQL columns).
    #[serde(default = "default_ground_truth_path")]
    pub ground_truth_path: PathBuf,
    /// A case passes when similarity is at or above this value.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    #[serde(default = "default_question_column")]
    pub question_column: String,
    #[serde(default = "default_ground_truth_column")]
    pub ground_truth_column: String,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            ground_truth_path: default_ground_truth_path(),
            similarity_threshold: default_similarity_threshold(),
            question_column: default_question_column(),
            ground_truth_column: default_ground_truth_column(),
        }
    }
}

fn default_inference_url() -> String {
    DEFAULT_INFERENCE_URL.to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_system_directive() -> String {
    "You are a SQL assistant that helps users query databases. \
     Use get_schema to inspect the database structure, execute_sql to run \
     statements, and lookup_field to fetch field definitions from the data \
     dictionary. Always show the SQL you used in your final answer."
        .to_string()
}

fn default_max_tool_rounds() -> u32 {
    8
}

fn default_thread_capacity() -> usize {
    64
}

fn default_backend_kind() -> BackendKind {
    BackendKind::Sqlite
}

fn default_database_path() -> PathBuf {
    PathBuf::from("data/chinook.db")
}

fn default_dictionary_path() -> PathBuf {
    PathBuf::from("data/data_dictionary.csv")
}

fn default_field_column() -> String {
    "field".to_string()
}

fn default_description_column() -> String {
    "description".to_string()
}

fn default_dictionary_max_results() -> usize {
    5
}

fn default_ground_truth_path() -> PathBuf {
    PathBuf::from("data/ground_truth.csv")
}

fn default_similarity_threshold() -> f64 {
    0.8
}

fn default_question_column() -> String {
    "question".to_string()
}

fn default_ground_truth_column() -> String {
    "ground_truth_sql".to_string()
}
