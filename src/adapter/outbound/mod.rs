//! Outbound adapters (driven side).

pub mod crypto;
pub mod mudrex;
pub mod sqlite;
pub mod telegram;
