//! Chat message wire types (OpenAI-compatible).

use serde::{Deserialize, Serialize};

/// One message in OpenAI-compatible chat format.
///
/// Conversation invariants enforced by the loop, not by this type: the first
/// message of any model invocation is the system directive, and tool-result
/// messages always follow the assistant message that requested them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role: "system", "user", "assistant", or "tool".
    pub role: String,
    /// Text content (absent when only tool_calls are present).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Assistant-requested tool calls (role "assistant" only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallOut>>,
    /// Id of the tool call this message answers (role "tool" only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Tool name for tool-result messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChatMessage {
    /// Plain system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain("system", content)
    }

    /// Plain user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::plain("user", content)
    }

    /// Assistant message with final text content.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain("assistant", content)
    }

    /// Assistant message carrying tool call requests.
    pub fn assistant_tool_calls(content: Option<String>, tool_calls: Vec<ToolCallOut>) -> Self {
        Self {
            role: "assistant".to_string(),
            content,
            tool_calls: Some(tool_calls),
            tool_call_id: None,
            name: None,
        }
    }

    /// Tool-result message answering `tool_call_id` for tool `name`.
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
            name: Some(name.into()),
        }
    }

    fn plain(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        }
    }
}

/// Tool call emitted by the assistant step (OpenAI format).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallOut {
    /// Unique id for this tool call, echoed back in the tool-result message.
    pub id: String,
    /// Call type (always "function" today).
    #[serde(rename = "type")]
    pub typ: String,
    /// Named function and its arguments.
    pub function: FunctionCall,
}

/// Function name plus a JSON string of arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}
