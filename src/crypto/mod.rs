//! AES-256-GCM encryption and key handling for `.pak` containers.
//!
//! Key string forms:
//!   `0x` + 64 hex digits → raw 256-bit key, used as-is for every container
//!   anything else        → passphrase, Argon2id(passphrase, salt=container_uuid)
//!
//! Encrypted payload layout: [ nonce (12 B) | ciphertext | GCM tag (16 B) ]

use std::fmt;
use std::str::FromStr;

use argon2::{Argon2, Algorithm, Version, Params};
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng as AeadOsRng};
use aes_gcm::Aes256Gcm;
use thiserror::Error;

/// Byte length of the AES-GCM nonce prepended to every encrypted payload.
pub const NONCE_LEN: usize = 12;

/// Byte length of a derived or raw key.
pub const KEY_LEN: usize = 32;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption failed")]
    EncryptionFailed,
    #[error("Decryption failed: wrong key or corrupted data")]
    DecryptionFailed,
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),
    #[error("Encrypted payload too short (minimum {NONCE_LEN} bytes)")]
    TooShort,
    #[error("Malformed hex key: {0}")]
    MalformedKey(String),
}

// ── ArchiveKey ───────────────────────────────────────────────────────────────

/// The shared key applied to every container of a load.
#[derive(Clone, PartialEq, Eq)]
pub enum ArchiveKey {
    Raw([u8; KEY_LEN]),
    Passphrase(String),
}

impl ArchiveKey {
    /// Produce the 256-bit cipher key for one container.
    ///
    /// `salt` is the container's 16-byte UUID; it is ignored for raw keys.
    pub fn derive(&self, salt: &[u8]) -> Result<[u8; KEY_LEN], CryptoError> {
        match self {
            ArchiveKey::Raw(key)         => Ok(*key),
            ArchiveKey::Passphrase(pass) => derive_key(pass, salt),
        }
    }
}

impl FromStr for ArchiveKey {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(digits) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            let bytes = hex::decode(digits).map_err(|e| CryptoError::MalformedKey(e.to_string()))?;
            let key: [u8; KEY_LEN] = bytes.try_into().map_err(|b: Vec<u8>| {
                CryptoError::MalformedKey(format!("expected {KEY_LEN} bytes, got {}", b.len()))
            })?;
            return Ok(ArchiveKey::Raw(key));
        }
        if s.is_empty() {
            return Err(CryptoError::MalformedKey("empty key".into()));
        }
        Ok(ArchiveKey::Passphrase(s.to_owned()))
    }
}

// Never print key material.
impl fmt::Debug for ArchiveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveKey::Raw(_)        => f.write_str("ArchiveKey::Raw(..)"),
            ArchiveKey::Passphrase(_) => f.write_str("ArchiveKey::Passphrase(..)"),
        }
    }
}

// ── Primitives ───────────────────────────────────────────────────────────────

/// Derive a 256-bit encryption key from a passphrase and a salt using Argon2id.
pub fn derive_key(password: &str, salt: &[u8]) -> Result<[u8; KEY_LEN], CryptoError> {
    let params = Params::new(64 * 1024, 3, 1, Some(KEY_LEN))
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let mut key = [0u8; KEY_LEN];
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut key)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(key)
}

/// Encrypt `plaintext` with AES-256-GCM using a random nonce.
///
/// Returns `nonce (12 B) || ciphertext || GCM-tag (16 B)`.
pub fn encrypt(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|_| CryptoError::EncryptionFailed)?;
    let nonce = Aes256Gcm::generate_nonce(&mut AeadOsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(nonce.as_slice());
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt an AES-256-GCM payload produced by [`encrypt`].
pub fn decrypt(key: &[u8; KEY_LEN], data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if data.len() < NONCE_LEN {
        return Err(CryptoError::TooShort);
    }
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|_| CryptoError::DecryptionFailed)?;
    let nonce = aes_gcm::Nonce::from_slice(&data[..NONCE_LEN]);
    cipher
        .decrypt(nonce, &data[NONCE_LEN..])
        .map_err(|_| CryptoError::DecryptionFailed)
}
