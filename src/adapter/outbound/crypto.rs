//! Encryption of exchange credentials at rest.
//!
//! Values are sealed with ChaCha20-Poly1305 under a 32-byte key and stored
//! as `base64(nonce || ciphertext)`. Each encryption draws a fresh nonce.

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::{rngs::OsRng, RngCore};

use crate::error::{Error, Result};

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Symmetric cipher for API keys and secrets.
#[derive(Clone)]
pub struct CredentialCipher {
    key: [u8; KEY_LEN],
}

impl fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialCipher").finish_non_exhaustive()
    }
}

impl CredentialCipher {
    /// Build a cipher from a configured key.
    ///
    /// Accepts a base64 string decoding to 32 bytes, or a raw 32-character
    /// ASCII value.
    ///
    /// # Errors
    /// Returns [`Error::Crypto`] when the key has the wrong shape.
    pub fn from_key(raw: &str) -> Result<Self> {
        Ok(Self {
            key: decode_key(raw)?,
        })
    }

    /// A new random key in the base64 form [`Self::from_key`] accepts.
    #[must_use]
    pub fn generate_key() -> String {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        BASE64.encode(key)
    }

    /// Encrypt a plaintext value.
    ///
    /// # Errors
    /// Returns [`Error::Crypto`] if sealing fails.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);

        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.key));
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|_| Error::Crypto("failed to encrypt credential".into()))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(sealed))
    }

    /// Decrypt a value produced by [`Self::encrypt`].
    ///
    /// # Errors
    /// Returns [`Error::Crypto`] on malformed input, a wrong key, or
    /// tampered ciphertext.
    pub fn decrypt(&self, sealed: &str) -> Result<String> {
        let bytes = BASE64
            .decode(sealed.trim())
            .map_err(|e| Error::Crypto(format!("failed to decode credential: {e}")))?;
        if bytes.len() <= NONCE_LEN {
            return Err(Error::Crypto("credential ciphertext is truncated".into()));
        }

        let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.key));
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| Error::Crypto("failed to decrypt credential".into()))?;

        String::from_utf8(plaintext)
            .map_err(|_| Error::Crypto("decrypted credential is not UTF-8".into()))
    }
}

fn decode_key(raw: &str) -> Result<[u8; KEY_LEN]> {
    let trimmed = raw.trim();
    let decoded = match BASE64.decode(trimmed) {
        Ok(bytes) if bytes.len() == KEY_LEN => bytes,
        _ if trimmed.len() == KEY_LEN => trimmed.as_bytes().to_vec(),
        Ok(_) => {
            return Err(Error::Crypto(
                "ENCRYPTION_KEY must decode to exactly 32 bytes".into(),
            ))
        }
        Err(_) => {
            return Err(Error::Crypto(
                "ENCRYPTION_KEY must be a base64 string or 32-byte ascii value".into(),
            ))
        }
    };

    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(&decoded);
    Ok(key)
}
