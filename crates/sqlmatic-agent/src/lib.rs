//! NL-to-SQL agent: an orchestration loop that turns natural-language
//! questions into grounded SQL answers using schema introspection, bounded
//! query execution, and a data dictionary, plus an offline evaluation
//! harness that scores generated SQL against labeled ground truth.

pub mod agent;
pub mod backend;
pub mod config;
pub mod error;
pub mod eval;
pub mod llm;
pub mod observability;
pub mod session;
pub mod tools;

pub use agent::Agent;
pub use backend::{
    ColumnDescription, DatabaseBackend, DocumentBackend, ForeignKeyDescription, IndexDescription,
    QueryOptions, QueryOutput, QueryRows, ReturnFormat, SchemaDescription, SchemaOptions,
    SqliteBackend, TableDescription,
};
pub use config::{
    AgentConfig, BackendKind, DatabaseSettings, DictionarySettings, EvaluationSettings,
    DEFAULT_INFERENCE_URL,
};
pub use error::{ConfigError, DictionaryError, QueryError, SchemaError};
pub use eval::{
    extract_sql_candidate, load_cases_from_csv, normalize, tfidf_cosine_similarity, Assistant,
    CaseOutcome, CaseStatus, EvaluationCase, EvaluationHarness, EvaluationReport,
};
pub use llm::{AssistantReply, ChatModel, LlmClient};
pub use session::{ChatMessage, FunctionCall, ThreadStore, ToolCallOut};
pub use tools::{
    DataDictionary, DictionaryEntry, ToolRegistry, ToolResult, ToolSpec, TOOL_EXECUTE_SQL,
    TOOL_GET_SCHEMA, TOOL_LOOKUP_FIELD,
};
