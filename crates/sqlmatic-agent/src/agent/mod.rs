//! Orchestration loop: user question in, grounded answer out.
//!
//! Each turn replays the thread history behind the system directive, then
//! alternates model invocations with tool dispatch until the model answers
//! without tool calls or the round cap fires. Only the turn's own messages
//! (user, assistant, tool results) are persisted; the directive is prepended
//! fresh on every invocation and never stored.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::backend::DatabaseBackend;
use crate::config::AgentConfig;
use crate::error::ConfigError;
use crate::eval::Assistant;
use crate::llm::{ChatModel, LlmClient};
use crate::observability::AgentEvent;
use crate::session::{ChatMessage, ThreadStore};
use crate::tools::{DataDictionary, ToolRegistry};

/// The NL-to-SQL agent: model, tools, and conversation memory behind one
/// `run_turn` entry point.
pub struct Agent {
    config: AgentConfig,
    threads: ThreadStore,
    registry: ToolRegistry,
    model: Box<dyn ChatModel>,
}

impl Agent {
    /// Build an agent backed by the configured LLM endpoint. Fails when no
    /// API key is available from the config or the environment.
    pub fn from_config(config: AgentConfig) -> Result<Self, ConfigError> {
        let api_key = config
            .resolve_api_key()
            .ok_or(ConfigError::MissingSetting("api_key (or OPENAI_API_KEY)"))?;
        let model = Box::new(LlmClient::new(
            config.inference_url.clone(),
            config.model.clone(),
            Some(api_key),
        ));
        Ok(Self::with_model(config, model))
    }

    /// Build an agent around an explicit model implementation.
    pub fn with_model(config: AgentConfig, model: Box<dyn ChatModel>) -> Self {
        let backend = Arc::new(DatabaseBackend::from_settings(&config.database));
        let dictionary = DataDictionary::new(config.tool_get_data_dictionary.clone());
        let registry = ToolRegistry::new(
            backend,
            dictionary,
            config.tool_get_schema.clone(),
            config.tool_execute_sql.clone(),
        );
        let threads = ThreadStore::with_capacity(config.thread_capacity);
        Self {
            config,
            threads,
            registry,
            model,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn threads(&self) -> &ThreadStore {
        &self.threads
    }

    /// Drop a thread's conversation memory. Returns true if it existed.
    pub async fn clear_thread(&self, thread_id: &str) -> bool {
        self.threads.evict(thread_id).await
    }

    /// Run one conversational turn and return the model's final answer.
    ///
    /// Tool failures are folded into the conversation as error payloads and
    /// never abort the turn; only a model transport failure or the tool-round
    /// cap surfaces as `Err`. On `Err` nothing from this turn is persisted.
    pub async fn run_turn(&self, thread_id: &str, user_message: &str) -> Result<String> {
        info!(
            event = AgentEvent::TurnStarted.as_str(),
            thread_id, "turn started"
        );
        let mut context = vec![ChatMessage::system(self.config.system_directive.clone())];
        context.extend(self.threads.get(thread_id).await);
        // Everything from the user message onward belongs to this turn and is
        // what gets persisted on success.
        let turn_start = context.len();
        context.push(ChatMessage::user(user_message));

        let tools = self.registry.specs_for_model();
        let mut rounds: u32 = 0;
        let mut dispatched: usize = 0;
        loop {
            if rounds >= self.config.max_tool_rounds {
                let last_tools: Vec<&str> = context
                    .iter()
                    .rev()
                    .filter(|m| m.role == "tool")
                    .take(3)
                    .filter_map(|m| m.name.as_deref())
                    .collect();
                warn!(
                    event = AgentEvent::TurnAborted.as_str(),
                    thread_id,
                    rounds,
                    tool_calls = dispatched,
                    "turn aborted at tool-round cap"
                );
                return Err(anyhow::anyhow!(
                    "turn aborted: {} tool rounds ({} tool calls) without a final \
                     answer; most recent tools: {:?}",
                    rounds,
                    dispatched,
                    last_tools
                ));
            }
            let reply = self
                .model
                .chat(context.clone(), Some(tools.clone()))
                .await?;
            let Some(tool_calls) = reply.tool_calls.filter(|calls| !calls.is_empty()) else {
                let answer = reply.content.unwrap_or_default();
                context.push(ChatMessage::assistant(answer.clone()));
                let turn_messages = context.split_off(turn_start);
                self.threads.append(thread_id, turn_messages).await;
                info!(
                    event = AgentEvent::TurnCompleted.as_str(),
                    thread_id,
                    rounds,
                    tool_calls = dispatched,
                    "turn completed"
                );
                return Ok(answer);
            };
            rounds += 1;
            context.push(ChatMessage::assistant_tool_calls(
                reply.content,
                tool_calls.clone(),
            ));
            for call in &tool_calls {
                let result = self
                    .registry
                    .dispatch(&call.function.name, &call.function.arguments)
                    .await;
                dispatched += 1;
                context.push(ChatMessage::tool_result(
                    call.id.clone(),
                    call.function.name.clone(),
                    result.into_message_text(),
                ));
            }
        }
    }
}

#[async_trait::async_trait]
impl Assistant for Agent {
    async fn answer(&self, thread_id: &str, question: &str) -> Result<String> {
        self.run_turn(thread_id, question).await
    }
}
