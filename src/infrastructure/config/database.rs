//! Database location.

use serde::Deserialize;

/// SQLite database settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite file; its parent directory is created on startup.
    #[serde(default = "default_database_path")]
    pub path: String,
}

fn default_database_path() -> String {
    "/app/data/subscribers.db".into()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}
