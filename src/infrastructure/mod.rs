//! Infrastructure layer.
//!
//! Technical concerns that support the application without containing
//! business logic.
//!
//! - [`bootstrap`] - Composition root for runtime wiring
//! - [`config`] - Configuration loading and validation
//! - [`health`] - Liveness checks behind `GET /health`

pub mod bootstrap;
pub mod config;
pub mod health;
