//! Bounded thread store: thread_id → conversation messages.
//!
//! The table is capacity-bounded with least-recently-used eviction so a
//! long-lived process cannot grow its conversation memory without limit.
//! Threads are created on first use and removed either by explicit eviction
//! or by LRU displacement when a new thread would exceed capacity.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::observability::AgentEvent;

use super::message::ChatMessage;

const DEFAULT_THREAD_CAPACITY: usize = 64;

struct ThreadTable {
    threads: HashMap<String, Vec<ChatMessage>>,
    /// Front = least recently used, back = most recently used.
    recency: VecDeque<String>,
}

impl ThreadTable {
    fn touch(&mut self, thread_id: &str) {
        if let Some(pos) = self.recency.iter().position(|id| id == thread_id) {
            self.recency.remove(pos);
        }
        self.recency.push_back(thread_id.to_string());
    }
}

/// Capacity-bounded LRU store of conversations, thread-safe via `RwLock`.
#[derive(Clone)]
pub struct ThreadStore {
    inner: Arc<RwLock<ThreadTable>>,
    capacity: usize,
}

impl ThreadStore {
    /// Create a store with the default thread capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_THREAD_CAPACITY)
    }

    /// Create a store holding at most `capacity` live threads.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ThreadTable {
                threads: HashMap::new(),
                recency: VecDeque::new(),
            })),
            capacity: capacity.max(1),
        }
    }

    /// Append messages to a thread, creating it on first use. Creating a
    /// thread beyond capacity evicts the least-recently-used one.
    pub async fn append(&self, thread_id: &str, messages: Vec<ChatMessage>) {
        if messages.is_empty() {
            return;
        }
        let mut table = self.inner.write().await;
        if !table.threads.contains_key(thread_id) {
            if table.threads.len() >= self.capacity {
                if let Some(victim) = table.recency.pop_front() {
                    table.threads.remove(&victim);
                    debug!(
                        event = AgentEvent::ThreadEvicted.as_str(),
                        thread_id = %victim,
                        capacity = self.capacity,
                        "least-recently-used thread evicted"
                    );
                }
            }
            debug!(
                event = AgentEvent::ThreadCreated.as_str(),
                thread_id, "thread created"
            );
        }
        let appended = messages.len();
        let entry = table.threads.entry(thread_id.to_string()).or_default();
        entry.extend(messages);
        let total = entry.len();
        table.touch(thread_id);
        debug!(
            event = AgentEvent::ThreadMessagesAppended.as_str(),
            thread_id,
            appended_messages = appended,
            total_messages = total,
            "thread messages appended"
        );
    }

    /// Copy of the message history for a thread (empty if unknown).
    pub async fn get(&self, thread_id: &str) -> Vec<ChatMessage> {
        let mut table = self.inner.write().await;
        let messages = table.threads.get(thread_id).cloned().unwrap_or_default();
        if table.threads.contains_key(thread_id) {
            table.touch(thread_id);
        }
        debug!(
            event = AgentEvent::ThreadMessagesLoaded.as_str(),
            thread_id,
            loaded_messages = messages.len(),
            "thread messages loaded"
        );
        messages
    }

    /// Explicitly evict a thread. Returns true if it existed.
    pub async fn evict(&self, thread_id: &str) -> bool {
        let mut table = self.inner.write().await;
        let existed = table.threads.remove(thread_id).is_some();
        if let Some(pos) = table.recency.iter().position(|id| id == thread_id) {
            table.recency.remove(pos);
        }
        if existed {
            debug!(
                event = AgentEvent::ThreadCleared.as_str(),
                thread_id, "thread evicted"
            );
        }
        existed
    }

    /// Message count for a thread without cloning the payload.
    pub async fn len(&self, thread_id: &str) -> usize {
        let table = self.inner.read().await;
        table.threads.get(thread_id).map_or(0, Vec::len)
    }

    /// Number of live threads.
    pub async fn thread_count(&self) -> usize {
        let table = self.inner.read().await;
        table.threads.len()
    }
}

impl Default for ThreadStore {
    fn default() -> Self {
        Self::new()
    }
}
