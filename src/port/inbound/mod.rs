//! Inbound (driving) ports consumed by inbound adapters.
//!
//! Inbound ports expose application capabilities to external drivers such as:
//!
//! - The Telegram dispatcher (messages and channel posts)
//! - The HTTP health endpoint
//!
//! # Modules
//!
//! - [`chat`]: Transport-independent chat messages and the actions taken on them

pub mod chat;
