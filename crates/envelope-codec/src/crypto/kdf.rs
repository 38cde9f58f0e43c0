//! Key text parsing and HMAC-SHA256 subkey derivation.
//!
//! The configured key is URL-safe base64 text of [`KEY_LEN`] random bytes (the
//! master key). The master key is never used directly: the AEAD key and the
//! public key id are derived from it under distinct labels.

use aes_gcm_siv::aead::{rand_core::RngCore, OsRng};
use base64::{
    alphabet,
    engine::{
        general_purpose::{GeneralPurpose, GeneralPurposeConfig, URL_SAFE},
        DecodePaddingMode,
    },
    Engine as _,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::cipher::{CipherError, KEY_LEN};

type HmacSha256 = Hmac<Sha256>;

/// Label for the AES-256-GCM-SIV key.
const AEAD_LABEL: &[u8] = b"envelope-codec/v1/aead";

/// Label for the public key id.
const KEY_ID_LABEL: &[u8] = b"envelope-codec/v1/key-id";

/// Bytes of the derived id exposed as hex.
const KEY_ID_LEN: usize = 8;

/// Accepts padded and unpadded URL-safe base64.
const KEY_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decoded master key. Zeroed on drop.
pub struct MasterKey([u8; KEY_LEN]);

impl MasterKey {
    /// Decode key text into a master key.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::MalformedKey`] if `text` is not URL-safe base64
    /// or does not decode to exactly [`KEY_LEN`] bytes.
    pub fn parse(text: &[u8]) -> Result<Self, CipherError> {
        let trimmed = text.trim_ascii();
        let decoded = KEY_ENGINE
            .decode(trimmed)
            .map_err(|_| CipherError::MalformedKey("key must be URL-safe base64".into()))?;
        if decoded.len() != KEY_LEN {
            return Err(CipherError::MalformedKey(format!(
                "key must decode to {KEY_LEN} bytes, got {}",
                decoded.len()
            )));
        }
        let mut buf = [0u8; KEY_LEN];
        buf.copy_from_slice(&decoded);
        Ok(Self(buf))
    }

    /// Derive the AEAD key.
    pub fn aead_key(&self) -> Result<AeadKey, CipherError> {
        prf(&self.0, AEAD_LABEL).map(AeadKey)
    }

    /// Derive the hex key id. Safe to log.
    pub fn key_id(&self) -> Result<String, CipherError> {
        let tag = prf(&self.0, KEY_ID_LABEL)?;
        Ok(hex::encode(&tag[..KEY_ID_LEN]))
    }
}

impl Drop for MasterKey {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

/// Derived AES-256-GCM-SIV key. Zeroed on drop.
pub struct AeadKey([u8; KEY_LEN]);

impl AeadKey {
    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Drop for AeadKey {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

/// Generate fresh key text: URL-safe base64 (padded) of [`KEY_LEN`] random bytes.
pub fn generate_key() -> String {
    let mut raw = [0u8; KEY_LEN];
    OsRng.fill_bytes(&mut raw);
    let text = URL_SAFE.encode(raw);
    raw.iter_mut().for_each(|b| *b = 0);
    text
}

fn prf(master: &[u8], label: &[u8]) -> Result<[u8; KEY_LEN], CipherError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(master)
        .map_err(|_| CipherError::MalformedKey("HMAC rejected key".into()))?;
    mac.update(label);
    let tag = mac.finalize().into_bytes();
    let mut out = [0u8; KEY_LEN];
    out.copy_from_slice(&tag);
    Ok(out)
}
