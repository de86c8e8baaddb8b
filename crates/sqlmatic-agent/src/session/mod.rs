//! Conversation state: chat message wire types and the bounded thread store.

mod message;
mod store;

pub use message::{ChatMessage, FunctionCall, ToolCallOut};
pub use store::ThreadStore;
