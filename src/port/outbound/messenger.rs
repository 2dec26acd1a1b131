//! Messenger port for direct messages to subscribers.

use async_trait::async_trait;

use crate::error::Result;

/// Sends plain-text direct messages.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()>;
}
