//! [`ActiveKey`]: the resolved key held by one codec for its lifetime.

use crate::crypto::{
    cipher::CipherError,
    kdf::{AeadKey, MasterKey},
};

/// Where the active key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOrigin {
    /// Passed by the caller.
    Explicit,
    /// Read from the key variable.
    Environment,
}

impl KeyOrigin {
    /// Short label for log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            KeyOrigin::Explicit => "explicit",
            KeyOrigin::Environment => "environment",
        }
    }
}

/// Key bytes exactly as supplied, normally URL-safe base64 text.
///
/// The bytes are not validated until first cryptographic use; see
/// [`ActiveKey::master`]. When this type is dropped the buffer is overwritten
/// with zeroes.
pub struct ActiveKey {
    bytes: Box<[u8]>,
    origin: KeyOrigin,
}

impl ActiveKey {
    pub(crate) fn new(bytes: &[u8], origin: KeyOrigin) -> Self {
        Self {
            bytes: bytes.into(),
            origin,
        }
    }

    /// Where this key was resolved from.
    pub fn origin(&self) -> KeyOrigin {
        self.origin
    }

    #[cfg(test)]
    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Decode the key for use by the cipher.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::MalformedKey`] if the bytes are not a valid key.
    pub(crate) fn master(&self) -> Result<MasterKey, CipherError> {
        MasterKey::parse(&self.bytes)
    }

    pub(crate) fn aead_key(&self) -> Result<AeadKey, CipherError> {
        self.master()?.aead_key()
    }
}

impl Drop for ActiveKey {
    fn drop(&mut self) {
        self.bytes.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for ActiveKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        f.debug_struct("ActiveKey")
            .field("bytes", &"[REDACTED]")
            .field("origin", &self.origin)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::generate_key;

    #[test]
    fn debug_is_redacted() {
        let key = ActiveKey::new(b"super-secret-key-text", KeyOrigin::Explicit);
        let printed = format!("{key:?}");
        assert!(printed.contains("REDACTED"));
        assert!(!printed.contains("super-secret"));
    }

    #[test]
    fn keeps_bytes_verbatim() {
        let key = ActiveKey::new(b"KEY", KeyOrigin::Environment);
        assert_eq!(key.as_bytes(), b"KEY");
        assert_eq!(key.origin(), KeyOrigin::Environment);
    }

    #[test]
    fn malformed_key_fails_lazily() {
        let key = ActiveKey::new(b"KEY", KeyOrigin::Explicit);
        assert!(matches!(key.aead_key(), Err(CipherError::MalformedKey(_))));
    }

    #[test]
    fn generated_key_derives() {
        let text = generate_key();
        let key = ActiveKey::new(text.as_bytes(), KeyOrigin::Explicit);
        assert!(key.aead_key().is_ok());
    }
}
