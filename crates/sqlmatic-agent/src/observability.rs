//! Stable event names for structured tracing.
//!
//! Log lines carry `event = AgentEvent::X.as_str()` so dashboards and tests
//! can match on names without parsing free-form messages.

/// Structured event identifiers emitted by the agent runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentEvent {
    ThreadCreated,
    ThreadEvicted,
    ThreadMessagesAppended,
    ThreadMessagesLoaded,
    ThreadCleared,
    TurnStarted,
    TurnCompleted,
    TurnAborted,
    ToolDispatched,
    ToolFailed,
    SchemaDescribed,
    QueryExecuted,
    DictionaryQueried,
    EvaluationStarted,
    EvaluationCaseScored,
    EvaluationCompleted,
}

impl AgentEvent {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ThreadCreated => "thread_created",
            Self::ThreadEvicted => "thread_evicted",
            Self::ThreadMessagesAppended => "thread_messages_appended",
            Self::ThreadMessagesLoaded => "thread_messages_loaded",
            Self::ThreadCleared => "thread_cleared",
            Self::TurnStarted => "turn_started",
            Self::TurnCompleted => "turn_completed",
            Self::TurnAborted => "turn_aborted",
            Self::ToolDispatched => "tool_dispatched",
            Self::ToolFailed => "tool_failed",
            Self::SchemaDescribed => "schema_described",
            Self::QueryExecuted => "query_executed",
            Self::DictionaryQueried => "dictionary_queried",
            Self::EvaluationStarted => "evaluation_started",
            Self::EvaluationCaseScored => "evaluation_case_scored",
            Self::EvaluationCompleted => "evaluation_completed",
        }
    }
}
