//! Infrastructure configuration modules.

pub mod bot;
pub mod database;
pub mod logging;
pub mod security;
pub mod server;
pub mod settings;
pub mod telegram;
