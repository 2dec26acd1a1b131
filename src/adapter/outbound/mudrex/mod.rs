//! Mudrex futures exchange adapter.

pub mod client;
pub mod dto;
pub mod settings;

pub use client::{MudrexClient, MudrexConnector};
pub use settings::MudrexConfig;
