use std::sync::Arc;
use vkbot_core::{ConversationId, Result, StateData};

use crate::state::IntoState;
use crate::storage::Storage;

/// Handle on one conversation's state and data. Cheap to clone.
///
/// Operations are not atomic with respect to other contexts on the same conversation;
/// callers that need that must serialize externally.
#[derive(Clone)]
pub struct FsmContext {
    storage: Arc<dyn Storage>,
    conversation_id: ConversationId,
}

impl FsmContext {
    pub fn new(storage: Arc<dyn Storage>, conversation_id: ConversationId) -> Self {
        Self {
            storage,
            conversation_id,
        }
    }

    pub fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }

    /// Current state identity, read live from the store.
    pub async fn get_state(&self) -> Result<Option<String>> {
        self.storage.get_state(self.conversation_id).await
    }

    /// Sets the state from a definition, a raw identity, or `None` (reset).
    pub async fn set_state(&self, state: impl IntoState) -> Result<()> {
        self.storage
            .set_state(self.conversation_id, state.into_state())
            .await
    }

    pub async fn get_data(&self) -> Result<StateData> {
        self.storage.get_data(self.conversation_id).await
    }

    /// Replaces the data bag wholesale.
    pub async fn set_data(&self, data: StateData) -> Result<()> {
        self.storage.set_data(self.conversation_id, data).await
    }

    /// Merges `partial` into the stored data and returns the merged result.
    pub async fn update_data(&self, partial: StateData) -> Result<StateData> {
        let mut data = self.get_data().await?;
        data.extend(partial);
        self.set_data(data.clone()).await?;
        Ok(data)
    }

    /// Resets state to `None` and data to an empty map.
    pub async fn clear(&self) -> Result<()> {
        self.set_state(None::<String>).await?;
        self.set_data(StateData::new()).await
    }
}

impl std::fmt::Debug for FsmContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsmContext")
            .field("conversation_id", &self.conversation_id)
            .finish()
    }
}
