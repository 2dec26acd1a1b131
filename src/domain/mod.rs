//! Exchange-agnostic domain types for the signal bot.
//!
//! - [`signal`] - Admin trading signals and follow-up instructions
//! - [`parser`] - Signal command grammar
//! - [`subscriber`] - Registered subscribers and their trade limits
//! - [`trade`] - Per-subscriber execution outcomes
//! - [`quantity`] - USD-to-contract sizing arithmetic

pub mod error;
pub mod id;
pub mod parser;
pub mod quantity;
pub mod signal;
pub mod subscriber;
pub mod trade;
