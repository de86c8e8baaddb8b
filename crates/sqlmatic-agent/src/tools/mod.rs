//! Self-describing tools and the dispatch boundary.
//!
//! Dispatch is the system's primary isolation guarantee: whatever goes wrong
//! inside a tool (bad arguments, engine failures, missing files) is converted
//! to `ToolResult::Error` here. A malfunctioning tool degrades one turn, never
//! the whole conversation.

mod dictionary;

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::backend::{DatabaseBackend, QueryOptions, ReturnFormat, SchemaOptions};
use crate::observability::AgentEvent;

pub use dictionary::{DataDictionary, DictionaryEntry};

/// Tool names as exposed to the model.
pub const TOOL_GET_SCHEMA: &str = "get_schema";
pub const TOOL_EXECUTE_SQL: &str = "execute_sql";
pub const TOOL_LOOKUP_FIELD: &str = "lookup_field";

/// Outcome of executing one tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    Success(Value),
    Error(String),
}

impl ToolResult {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Text folded back into the conversation as the tool-result message.
    pub fn into_message_text(self) -> String {
        match self {
            Self::Success(payload) => {
                serde_json::to_string(&payload).unwrap_or_else(|_| "{}".to_string())
            }
            Self::Error(message) => json!({ "error": message }).to_string(),
        }
    }
}

/// Declared surface of one tool: name, description, flat argument schema.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

impl ToolSpec {
    /// OpenAI-style function definition consumed by the model client.
    pub fn to_model_json(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "parameters": self.parameters,
        })
    }
}

/// Registry of the callable capabilities exposed to the orchestration loop.
pub struct ToolRegistry {
    backend: Arc<DatabaseBackend>,
    dictionary: DataDictionary,
    schema_defaults: SchemaOptions,
    query_defaults: QueryOptions,
}

impl ToolRegistry {
    pub fn new(
        backend: Arc<DatabaseBackend>,
        dictionary: DataDictionary,
        schema_defaults: SchemaOptions,
        query_defaults: QueryOptions,
    ) -> Self {
        Self {
            backend,
            dictionary,
            schema_defaults,
            query_defaults,
        }
    }

    /// All declared tools.
    pub fn specs(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: TOOL_GET_SCHEMA,
                description: "Get the database schema: tables, columns, foreign keys and \
                              optionally indexes.",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "max_tables": { "type": "integer", "description": "Cap on enumerated tables" },
                        "exclude_system_tables": { "type": "boolean" },
                        "include_relationships": { "type": "boolean" },
                        "include_indexes": { "type": "boolean" }
                    }
                }),
            },
            ToolSpec {
                name: TOOL_EXECUTE_SQL,
                description: "Execute a SQL statement against the configured database and \
                              return the (truncated) results.",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "query": { "type": "string", "description": "SQL statement to execute" },
                        "max_results": { "type": "integer", "description": "Row cap on returned results" },
                        "return_format": {
                            "type": "string",
                            "enum": ["structured-records", "delimited-text", "raw-tuples"]
                        }
                    },
                    "required": ["query"]
                }),
            },
            ToolSpec {
                name: TOOL_LOOKUP_FIELD,
                description: "Look up a database field's human-authored description in the \
                              data dictionary.",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "field_name": { "type": "string", "description": "Field name to look up" }
                    },
                    "required": ["field_name"]
                }),
            },
        ]
    }

    /// Function definitions handed to the model with every invocation.
    pub fn specs_for_model(&self) -> Vec<Value> {
        self.specs().iter().map(ToolSpec::to_model_json).collect()
    }

    /// Locate and invoke the named tool with the raw JSON argument string.
    /// Unknown tools, argument coercion failures, and invocation failures all
    /// come back as `ToolResult::Error`; this method never fails.
    pub async fn dispatch(&self, name: &str, raw_arguments: &str) -> ToolResult {
        let arguments = match parse_arguments(raw_arguments) {
            Ok(arguments) => arguments,
            Err(message) => return self.failed(name, message),
        };
        let result = match name {
            TOOL_GET_SCHEMA => self.get_schema(arguments).await,
            TOOL_EXECUTE_SQL => self.execute_sql(arguments).await,
            TOOL_LOOKUP_FIELD => self.lookup_field(arguments).await,
            other => Err(format!("unknown tool `{other}`")),
        };
        match result {
            Ok(payload) => {
                debug!(
                    event = AgentEvent::ToolDispatched.as_str(),
                    tool = name,
                    "tool dispatched"
                );
                ToolResult::Success(payload)
            }
            Err(message) => self.failed(name, message),
        }
    }

    fn failed(&self, name: &str, message: String) -> ToolResult {
        warn!(
            event = AgentEvent::ToolFailed.as_str(),
            tool = name,
            error = %message,
            "tool invocation failed"
        );
        ToolResult::Error(message)
    }

    async fn get_schema(&self, arguments: Value) -> Result<Value, String> {
        let args: GetSchemaArgs = coerce(TOOL_GET_SCHEMA, arguments)?;
        let options = args.merged(&self.schema_defaults);
        let schema = self
            .backend
            .describe_schema(&options)
            .await
            .map_err(|e| e.to_string())?;
        Ok(json!({
            "message": format!(
                "schema retrieved successfully for {} backend",
                self.backend.kind()
            ),
            "schema": schema,
        }))
    }

    async fn execute_sql(&self, arguments: Value) -> Result<Value, String> {
        let args: ExecuteSqlArgs = coerce(TOOL_EXECUTE_SQL, arguments)?;
        let mut options = self.query_defaults.clone();
        if let Some(max_results) = args.max_results {
            options.max_results = max_results;
        }
        if let Some(return_format) = args.return_format {
            options.return_format = return_format;
        }
        match self.backend.execute_if_supported(&args.query, &options).await {
            None => Err(format!(
                "the {} backend does not support SQL execution",
                self.backend.kind()
            )),
            Some(Ok(output)) => serde_json::to_value(output).map_err(|e| e.to_string()),
            Some(Err(error)) => Err(error.to_string()),
        }
    }

    async fn lookup_field(&self, arguments: Value) -> Result<Value, String> {
        let args: LookupFieldArgs = coerce(TOOL_LOOKUP_FIELD, arguments)?;
        let dictionary = self.dictionary.clone();
        let field_name = args.field_name.clone();
        let matches = tokio::task::spawn_blocking(move || dictionary.lookup(&field_name))
            .await
            .map_err(|e| format!("lookup task failed: {e}"))?
            .map_err(|e| e.to_string())?;
        if matches.is_empty() {
            return Ok(json!({
                "message": format!("no matching entries for `{}`", args.field_name),
                "matches": [],
            }));
        }
        Ok(json!({ "matches": matches }))
    }
}

#[derive(Debug, Default, Deserialize)]
struct GetSchemaArgs {
    max_tables: Option<usize>,
    exclude_system_tables: Option<bool>,
    include_relationships: Option<bool>,
    include_indexes: Option<bool>,
}

impl GetSchemaArgs {
    fn merged(&self, defaults: &SchemaOptions) -> SchemaOptions {
        SchemaOptions {
            max_tables: self.max_tables.unwrap_or(defaults.max_tables),
            exclude_system_tables: self
                .exclude_system_tables
                .unwrap_or(defaults.exclude_system_tables),
            include_relationships: self
                .include_relationships
                .unwrap_or(defaults.include_relationships),
            include_indexes: self.include_indexes.unwrap_or(defaults.include_indexes),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExecuteSqlArgs {
    query: String,
    max_results: Option<usize>,
    return_format: Option<ReturnFormat>,
}

#[derive(Debug, Deserialize)]
struct LookupFieldArgs {
    field_name: String,
}

/// Model-emitted argument strings: empty means no arguments.
fn parse_arguments(raw: &str) -> Result<Value, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_str(trimmed).map_err(|e| format!("tool arguments are not valid JSON: {e}"))
}

fn coerce<T: serde::de::DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, String> {
    let arguments = if arguments.is_null() {
        json!({})
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| format!("invalid arguments for `{tool}`: {e}"))
}
