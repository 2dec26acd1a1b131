//! Credential encryption settings.

use std::fmt;

use serde::Deserialize;

/// Key material for encrypting subscriber API credentials.
#[derive(Clone, Default, Deserialize)]
pub struct SecurityConfig {
    /// Base64 32-byte key, or a raw 32-character string.
    #[serde(default)]
    pub encryption_key: Option<String>,
}

impl fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityConfig")
            .field(
                "encryption_key",
                &self.encryption_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}
