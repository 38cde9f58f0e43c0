//! AES-256-GCM-SIV sealing and opening of whole payloads into tokens.
//!
//! **Algorithm choice:** AES-256-GCM-SIV (RFC 8452) is nonce-misuse-resistant.
//! A fresh random nonce is still drawn per call, so identical payloads sealed
//! under the same key produce different tokens.
//!
//! The token header (`version || issued_at`) is bound as associated data:
//! changing the timestamp breaks authentication just like changing the
//! ciphertext does.

use std::time::{SystemTime, UNIX_EPOCH};

use aes_gcm_siv::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng, Payload},
    Aes256GcmSiv, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use thiserror::Error;

use super::kdf::AeadKey;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of an AES-GCM-SIV nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of the AES-GCM-SIV authentication tag.
pub const TAG_LEN: usize = 16;

/// First byte of every token frame.
pub const TOKEN_VERSION: u8 = 0xE1;

/// Tokens stamped further than this into the future are rejected when an age
/// window is enforced.
pub const MAX_CLOCK_SKEW_SECS: u64 = 60;

const HEADER_LEN: usize = 1 + 8;
const MIN_FRAME_LEN: usize = HEADER_LEN + NONCE_LEN + TAG_LEN;

/// A parsed token.
///
/// The wire form is `base64url-no-pad(version || issued_at_be || nonce || ciphertext+tag)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedToken {
    /// Seconds since the Unix epoch at sealing time.
    pub issued_at: u64,
    /// Raw nonce bytes.
    pub nonce: [u8; NONCE_LEN],
    /// Raw ciphertext + authentication tag bytes.
    pub ciphertext: Vec<u8>,
}

impl SealedToken {
    fn header(&self) -> [u8; HEADER_LEN] {
        let mut header = [0u8; HEADER_LEN];
        header[0] = TOKEN_VERSION;
        header[1..].copy_from_slice(&self.issued_at.to_be_bytes());
        header
    }

    /// Encode this token to its canonical text representation.
    pub fn to_string_repr(&self) -> String {
        let mut frame = Vec::with_capacity(HEADER_LEN + NONCE_LEN + self.ciphertext.len());
        frame.extend_from_slice(&self.header());
        frame.extend_from_slice(&self.nonce);
        frame.extend_from_slice(&self.ciphertext);
        URL_SAFE_NO_PAD.encode(frame)
    }

    /// Parse token text back into a [`SealedToken`].
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidFormat`] if the input is not base64url,
    /// is shorter than a minimal frame, or carries an unknown version byte.
    pub fn parse(text: &[u8]) -> Result<Self, CipherError> {
        let frame = URL_SAFE_NO_PAD
            .decode(text)
            .map_err(|_| CipherError::InvalidFormat)?;
        if frame.len() < MIN_FRAME_LEN || frame[0] != TOKEN_VERSION {
            return Err(CipherError::InvalidFormat);
        }

        let mut ts = [0u8; 8];
        ts.copy_from_slice(&frame[1..HEADER_LEN]);
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&frame[HEADER_LEN..HEADER_LEN + NONCE_LEN]);

        Ok(Self {
            issued_at: u64::from_be_bytes(ts),
            nonce,
            ciphertext: frame[HEADER_LEN + NONCE_LEN..].to_vec(),
        })
    }
}

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The key text cannot be turned into an AES-256 key.
    #[error("malformed key: {0}")]
    MalformedKey(String),

    /// AES-GCM-SIV encryption or authentication failed.
    #[error("aead operation failed")]
    AeadFailure,

    /// The token text does not match the expected frame.
    #[error("invalid token format")]
    InvalidFormat,

    /// The token is authentic but older than the allowed age.
    #[error("token expired")]
    Expired,

    /// The token is authentic but stamped too far in the future.
    #[error("token timestamp is in the future")]
    FromFuture,
}

/// Current time in seconds since the Unix epoch.
pub fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Seal `plaintext` under `key`, stamping it with `now`.
///
/// # Errors
///
/// Returns [`CipherError::AeadFailure`] on an internal AEAD error (unreachable
/// with a valid key and nonce).
pub fn seal(plaintext: &[u8], key: &AeadKey, now: u64) -> Result<SealedToken, CipherError> {
    let cipher = build_cipher(key)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);

    let mut token = SealedToken {
        issued_at: now,
        nonce: nonce_bytes,
        ciphertext: Vec::new(),
    };
    let aad = token.header();
    token.ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce_bytes),
            Payload {
                msg: plaintext,
                aad: &aad,
            },
        )
        .map_err(|_| CipherError::AeadFailure)?;

    Ok(token)
}

/// Verify and decrypt `token` under `key`.
///
/// Authentication happens first; the age window is checked only for tokens
/// that verified. `max_age_secs = None` accepts any age.
///
/// # Errors
///
/// - [`CipherError::AeadFailure`] on wrong key or tampered data.
/// - [`CipherError::Expired`] if `now - issued_at > max_age_secs`.
/// - [`CipherError::FromFuture`] if `issued_at > now + MAX_CLOCK_SKEW_SECS`.
pub fn open(
    token: &SealedToken,
    key: &AeadKey,
    now: u64,
    max_age_secs: Option<u64>,
) -> Result<Vec<u8>, CipherError> {
    let cipher = build_cipher(key)?;
    let aad = token.header();
    let plaintext = cipher
        .decrypt(
            Nonce::from_slice(&token.nonce),
            Payload {
                msg: &token.ciphertext,
                aad: &aad,
            },
        )
        .map_err(|_| CipherError::AeadFailure)?;

    if let Some(max_age) = max_age_secs {
        if token.issued_at > now.saturating_add(MAX_CLOCK_SKEW_SECS) {
            return Err(CipherError::FromFuture);
        }
        if now.saturating_sub(token.issued_at) > max_age {
            return Err(CipherError::Expired);
        }
    }

    Ok(plaintext)
}

fn build_cipher(key: &AeadKey) -> Result<Aes256GcmSiv, CipherError> {
    Aes256GcmSiv::new_from_slice(key.as_bytes())
        .map_err(|_| CipherError::MalformedKey(format!("expected {KEY_LEN} bytes")))
}
