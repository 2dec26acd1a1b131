//! Inbound adapters (driving side).
//!
//! - [`telegram`] - Bot updates via long polling or webhook
//! - [`http`] - Health endpoint, shared with the webhook route
//! - [`cli`] - Command-line entry points

pub mod cli;
pub mod http;
pub mod telegram;
