//! Application services (use cases).
//!
//! These services orchestrate domain logic and coordinate adapters
//! to implement the bot's use cases.

pub mod bot;
pub mod broadcast;
pub mod command;
pub mod format;
pub mod registration;
