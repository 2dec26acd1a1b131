//! Signalbot - a centralized Telegram bot that mirrors futures trading
//! signals onto subscriber exchange accounts.
//!
//! An admin posts signals (in a private chat with the bot or in a signal
//! channel); every active subscriber gets the same trade placed on their
//! own Mudrex futures account, sized by their personal USDT amount and
//! capped by their leverage limit.
//!
//! # Architecture
//!
//! The crate follows a hexagonal layout:
//!
//! - [`domain`] - Signals, subscribers, trade outcomes, and sizing math
//! - [`port`] - Trait seams: exchange, store, messenger, inbound chat
//! - [`application`] - Command routing, registration, broadcast fan-out
//! - [`adapter`] - Telegram, Mudrex REST, SQLite, encryption, HTTP, CLI
//! - [`infrastructure`] - Configuration, health, and process wiring
//! - [`error`] - Error types for the crate
//!
//! # Features
//!
//! - `testkit` - Export in-memory doubles for integration tests

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
