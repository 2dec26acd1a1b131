//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`exchange`] - `ScriptedExchange` and `MockConnector` for the exchange port
//! - [`messenger`] - `RecordingMessenger` capturing outbound messages
//! - [`store`] - `MemoryStore`, an in-memory subscriber and signal store
//! - [`domain`] - Builders for signals, subscribers, and assets

pub mod domain;
pub mod exchange;
pub mod messenger;
pub mod store;
