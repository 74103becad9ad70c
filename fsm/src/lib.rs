//! FSM crate: per-conversation state storage, the [`FsmContext`] handle and state groups.
//!
//! ## Modules
//!
//! - [`state`] – StateDefinition, StateGroup, IntoState
//! - [`storage`] – Storage trait, MemoryStorage
//! - [`sqlite_storage`] – SqliteStorage
//! - [`context`] – FsmContext

pub mod context;
pub mod sqlite_storage;
pub mod state;
pub mod storage;

pub use context::FsmContext;
pub use sqlite_storage::SqliteStorage;
pub use state::{IntoState, StateDefinition, StateGroup};
pub use storage::{ConversationState, MemoryStorage, Storage};
