//! Recording messenger for assertions on outbound messages.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::port::outbound::messenger::Messenger;

/// Thread-safe message collector.
#[derive(Clone, Default)]
pub struct RecordingMessenger {
    sent: Arc<Mutex<Vec<(i64, String)>>>,
    failing: Arc<Mutex<HashSet<i64>>>,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send to `chat_id` fail, as for a user who blocked the bot.
    pub fn fail_for(&self, chat_id: i64) {
        self.failing
            .lock()
            .expect("lock failing chats")
            .insert(chat_id);
    }

    /// Every delivered message, in send order.
    pub fn messages(&self) -> Vec<(i64, String)> {
        self.sent.lock().expect("lock sent messages").clone()
    }

    /// Texts delivered to one chat, in send order.
    pub fn messages_to(&self, chat_id: i64) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|(id, _)| *id == chat_id)
            .map(|(_, text)| text)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sent.lock().expect("lock sent messages").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        if self
            .failing
            .lock()
            .expect("lock failing chats")
            .contains(&chat_id)
        {
            return Err(Error::Telegram("Forbidden: bot was blocked by the user".into()));
        }
        self.sent
            .lock()
            .expect("lock sent messages")
            .push((chat_id, text.to_string()));
        Ok(())
    }
}
