//! State store abstraction and the default in-memory implementation.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use vkbot_core::{ConversationId, Result, StateData};

/// State and data of one conversation. A conversation never seen before reads as the default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationState {
    pub state: Option<String>,
    pub data: StateData,
}

/// Per-conversation FSM storage. Unknown ids must read as `{state: None, data: {}}`, never as errors.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get_state(&self, conversation_id: ConversationId) -> Result<Option<String>>;
    async fn set_state(&self, conversation_id: ConversationId, state: Option<String>)
        -> Result<()>;
    async fn get_data(&self, conversation_id: ConversationId) -> Result<StateData>;
    async fn set_data(&self, conversation_id: ConversationId, data: StateData) -> Result<()>;
}

/// In-memory store; contents are lost on restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    conversations: Arc<RwLock<HashMap<ConversationId, ConversationState>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of conversations that have been written to.
    pub async fn len(&self) -> usize {
        self.conversations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get_state(&self, conversation_id: ConversationId) -> Result<Option<String>> {
        let conversations = self.conversations.read().await;
        Ok(conversations
            .get(&conversation_id)
            .and_then(|c| c.state.clone()))
    }

    async fn set_state(
        &self,
        conversation_id: ConversationId,
        state: Option<String>,
    ) -> Result<()> {
        debug!(conversation_id, state = ?state, "Setting conversation state");
        let mut conversations = self.conversations.write().await;
        conversations.entry(conversation_id).or_default().state = state;
        Ok(())
    }

    async fn get_data(&self, conversation_id: ConversationId) -> Result<StateData> {
        let conversations = self.conversations.read().await;
        Ok(conversations
            .get(&conversation_id)
            .map(|c| c.data.clone())
            .unwrap_or_default())
    }

    async fn set_data(&self, conversation_id: ConversationId, data: StateData) -> Result<()> {
        debug!(conversation_id, keys = data.len(), "Setting conversation data");
        let mut conversations = self.conversations.write().await;
        conversations.entry(conversation_id).or_default().data = data;
        Ok(())
    }
}
