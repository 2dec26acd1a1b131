//! SQLite persistence adapters.
//!
//! Provides the SQLite-backed implementation of the subscriber and signal
//! stores using Diesel ORM. API credentials are encrypted before they
//! reach the database.

pub mod database;
pub mod store;
