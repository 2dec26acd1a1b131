//! Outbound ports (driven side): interfaces implemented by outbound adapters.
//!
//! These contracts describe infrastructure dependencies: the futures
//! exchange, persistent storage, and direct messaging to subscribers.

pub mod exchange;
pub mod messenger;
pub mod store;
