//! Wires config, storage, middleware and the profile routers into a [`Dispatcher`] and runs it.

use anyhow::{Context, Result};
use dispatcher::{Dispatcher, PollingOptions};
use fsm::{MemoryStorage, SqliteStorage, Storage};
use middleware::{AuthMiddleware, LoggingMiddleware, UserTrackingMiddleware};
use std::sync::Arc;
use tracing::{info, instrument};
use vkbot_core::init_tracing;
use vkbot_vk::{LongPollApi, VkClient, VkConfig};

use crate::profile::{profile_routers, MessageSender};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// SQLite file for conversation state; memory when `None`.
    pub database: Option<String>,
    /// Peer allowlist; empty means everyone.
    pub allowed_peers: Vec<i64>,
}

/// Assembles the dispatcher: logging (and the allowlist when set) → user tracking → routers.
pub fn build_dispatcher(
    api: Arc<dyn LongPollApi>,
    sender: Arc<dyn MessageSender>,
    storage: Arc<dyn Storage>,
    allowed_peers: Vec<i64>,
) -> Dispatcher {
    let mut dispatcher = Dispatcher::new(api)
        .with_storage(storage)
        .with_middleware(Arc::new(LoggingMiddleware));
    if !allowed_peers.is_empty() {
        dispatcher = dispatcher.with_middleware(Arc::new(AuthMiddleware::new(allowed_peers)));
    }
    let (questionnaire, summary) = profile_routers(sender);
    dispatcher
        .with_middleware(Arc::new(UserTrackingMiddleware))
        .include_router(questionnaire)
        .include_router(summary)
}

#[instrument(skip(config, options))]
pub async fn run_bot(config: VkConfig, options: RunOptions) -> Result<()> {
    init_tracing(&config.log_file)?;

    info!(
        group_id = config.group_id,
        api_url = %config.api_url,
        database = ?options.database,
        "Initializing bot"
    );

    let storage: Arc<dyn Storage> = match &options.database {
        Some(path) => Arc::new(
            SqliteStorage::new(path)
                .await
                .with_context(|| format!("Open state database {}", path))?,
        ),
        None => Arc::new(MemoryStorage::new()),
    };

    let client = Arc::new(VkClient::from_config(&config));
    let dispatcher = build_dispatcher(
        client.clone(),
        client,
        storage,
        options.allowed_peers,
    );

    info!("Bot started successfully");
    dispatcher
        .start_polling(PollingOptions::from_config(&config))
        .await?;
    Ok(())
}
