//! In-progress registration conversations.
//!
//! Each user walks through `AwaitingApiKey → AwaitingApiSecret →
//! AwaitingAmount`. Drafts live only in memory; a restart simply asks the
//! user to `/register` again.

use dashmap::DashMap;

use crate::domain::subscriber::ApiCredentials;

/// Where a user is in the registration conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationStep {
    AwaitingApiKey,
    AwaitingApiSecret { api_key: String },
    AwaitingAmount { credentials: ApiCredentials },
}

/// Registration drafts keyed by Telegram user id.
#[derive(Debug, Default)]
pub struct RegistrationDrafts {
    drafts: DashMap<i64, RegistrationStep>,
}

impl RegistrationDrafts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) a conversation at the API key step.
    pub fn begin(&self, user_id: i64) {
        self.drafts.insert(user_id, RegistrationStep::AwaitingApiKey);
    }

    #[must_use]
    pub fn step(&self, user_id: i64) -> Option<RegistrationStep> {
        self.drafts.get(&user_id).map(|entry| entry.value().clone())
    }

    pub fn advance(&self, user_id: i64, step: RegistrationStep) {
        self.drafts.insert(user_id, step);
    }

    /// Drop a draft. Returns false when there was none.
    pub fn cancel(&self, user_id: i64) -> bool {
        self.drafts.remove(&user_id).is_some()
    }

    #[must_use]
    pub fn is_active(&self, user_id: i64) -> bool {
        self.drafts.contains_key(&user_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }
}
