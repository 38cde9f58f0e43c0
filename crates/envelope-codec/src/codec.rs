//! [`EnvelopeCodec`]: inner serializer wrapped in authenticated encryption.
//!
//! `serialize` encodes with the chosen serializer, then seals the bytes into a
//! token. `deserialize` opens the token, then decodes. A token that fails
//! verification never reaches the inner decoder.

use std::{fmt, time::Duration};

use common::{CodecError, ConfigurationError, SecurityError};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::crypto::cipher::{self, CipherError, SealedToken};
use crate::key::{self, ActiveKey, EnvKeySource, KeyOrigin, KeySource};
use crate::serializer::Serializer;

impl From<CipherError> for CodecError {
    fn from(e: CipherError) -> Self {
        match e {
            CipherError::MalformedKey(reason) => {
                CodecError::Configuration(ConfigurationError::MalformedKey(reason))
            }
            CipherError::Expired => CodecError::Security(SecurityError::Expired),
            CipherError::AeadFailure | CipherError::InvalidFormat | CipherError::FromFuture => {
                CodecError::Security(SecurityError::InvalidToken)
            }
        }
    }
}

/// An opaque token produced by [`EnvelopeCodec::serialize`].
///
/// Tokens are base64url text and can be sent as a message body verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    /// Borrow the token text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the token, returning its text.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<[u8]> for Token {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl From<String> for Token {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encrypted serializer bound to one key and one inner format.
///
/// All state is fixed at construction. The codec is `Send + Sync` and may be
/// shared across threads without locking.
#[derive(Debug)]
pub struct EnvelopeCodec {
    key: ActiveKey,
    serializer: Serializer,
    max_age: Option<Duration>,
    max_age_secs: Option<u64>,
}

/// Age window in whole seconds, rounded up so a sub-second remainder never
/// shortens the configured window.
fn window_secs(max_age: Duration) -> u64 {
    max_age
        .as_secs()
        .saturating_add(u64::from(max_age.subsec_nanos() > 0))
}

impl EnvelopeCodec {
    /// Start building a codec.
    pub fn builder() -> EnvelopeCodecBuilder {
        EnvelopeCodecBuilder::default()
    }

    /// Build a codec with `key` (or the key variable) and the named serializer.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Configuration`] if no key is available or the
    /// serializer name is unsupported.
    pub fn new(key: Option<&[u8]>, serializer: &str) -> Result<Self, CodecError> {
        let mut builder = Self::builder().serializer(serializer);
        if let Some(k) = key {
            builder = builder.key(k);
        }
        builder.build()
    }

    /// Build a codec from loaded [`Settings`], resolving the key through `source`.
    ///
    /// # Errors
    ///
    /// See [`EnvelopeCodec::new`].
    pub fn from_settings(
        settings: &Settings,
        key: Option<&[u8]>,
        source: &dyn KeySource,
    ) -> Result<Self, CodecError> {
        let mut builder = Self::builder().serializer(&settings.serializer);
        if let Some(secs) = settings.max_age_secs {
            builder = builder.max_age(Duration::from_secs(secs));
        }
        if let Some(k) = key {
            builder = builder.key(k);
        }
        builder.build_with(source)
    }

    /// The inner serializer.
    pub fn serializer(&self) -> Serializer {
        self.serializer
    }

    /// The configured maximum token age, if any.
    ///
    /// Token timestamps have one-second resolution; the window is enforced
    /// as this duration rounded up to whole seconds.
    pub fn max_age(&self) -> Option<Duration> {
        self.max_age
    }

    /// Where the active key came from.
    pub fn key_origin(&self) -> KeyOrigin {
        self.key.origin()
    }

    /// Non-secret fingerprint of the active key, safe to log.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::MalformedKey`] if the key is not usable.
    pub fn key_id(&self) -> Result<String, CodecError> {
        Ok(self.key.master()?.key_id()?)
    }

    /// Encode `value` with the inner serializer and seal it into a token.
    ///
    /// # Errors
    ///
    /// - [`CodecError::PayloadEncoding`] if the serializer rejects `value`.
    /// - [`CodecError::Configuration`] if the key is malformed.
    pub fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<Token, CodecError> {
        self.serialize_at(value, cipher::now_unix())
    }

    /// Open `token` and decode the verified plaintext.
    ///
    /// Accepts token text as `&str`, `String`, [`Token`], or raw bytes.
    ///
    /// # Errors
    ///
    /// - [`CodecError::Security`] if the token is malformed, tampered, sealed
    ///   under another key, or outside the age window.
    /// - [`CodecError::PayloadDecoding`] if the verified bytes do not decode.
    /// - [`CodecError::Configuration`] if the key is malformed.
    pub fn deserialize<T: DeserializeOwned>(
        &self,
        token: impl AsRef<[u8]>,
    ) -> Result<T, CodecError> {
        self.deserialize_at(token.as_ref(), cipher::now_unix())
    }

    fn serialize_at<T: Serialize + ?Sized>(&self, value: &T, now: u64) -> Result<Token, CodecError> {
        let raw = self
            .serializer
            .encode(value)
            .map_err(CodecError::PayloadEncoding)?;
        let aead_key = self.key.aead_key()?;
        let token = cipher::seal(&raw, &aead_key, now)?.to_string_repr();
        debug!(
            serializer = %self.serializer,
            payload_len = raw.len(),
            token_len = token.len(),
            "payload sealed"
        );
        Ok(Token(token))
    }

    fn deserialize_at<T: DeserializeOwned>(&self, token: &[u8], now: u64) -> Result<T, CodecError> {
        let aead_key = self.key.aead_key()?;
        let raw = SealedToken::parse(token)
            .and_then(|sealed| cipher::open(&sealed, &aead_key, now, self.max_age_secs))
            .map_err(|e| {
                warn!(reason = %e, serializer = %self.serializer, "token rejected");
                CodecError::from(e)
            })?;
        debug!(serializer = %self.serializer, payload_len = raw.len(), "token opened");
        self.serializer
            .decode(&raw)
            .map_err(CodecError::PayloadDecoding)
    }
}

/// Builder for [`EnvelopeCodec`].
#[derive(Default)]
pub struct EnvelopeCodecBuilder {
    key: Option<Vec<u8>>,
    serializer: Option<String>,
    max_age: Option<Duration>,
}

impl EnvelopeCodecBuilder {
    /// Use `key` instead of the key variable. Text or raw bytes.
    pub fn key(mut self, key: impl AsRef<[u8]>) -> Self {
        self.wipe_key();
        self.key = Some(key.as_ref().to_vec());
        self
    }

    /// Select the inner serializer by name. Defaults to `cbor`.
    pub fn serializer(mut self, name: impl Into<String>) -> Self {
        self.serializer = Some(name.into());
        self
    }

    /// Reject tokens older than `max_age`. Unbounded by default; must be
    /// non-zero when set.
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Build, reading the key variable from the process environment if needed.
    ///
    /// # Errors
    ///
    /// See [`EnvelopeCodec::new`].
    pub fn build(self) -> Result<EnvelopeCodec, CodecError> {
        self.build_with(&EnvKeySource::new())
    }

    /// Build, reading the key variable from `source` if needed.
    ///
    /// # Errors
    ///
    /// See [`EnvelopeCodec::new`].
    pub fn build_with(self, source: &dyn KeySource) -> Result<EnvelopeCodec, CodecError> {
        let serializer = match self.serializer.as_deref() {
            Some(name) => Serializer::lookup(name)?,
            None => Serializer::default(),
        };
        if self.max_age == Some(Duration::ZERO) {
            return Err(ConfigurationError::InvalidSettings("max_age must be > 0".into()).into());
        }
        let max_age_secs = self.max_age.map(window_secs);
        let key = key::resolve(self.key.as_deref(), source)?;

        info!(
            serializer = %serializer,
            key_origin = key.origin().as_str(),
            max_age_secs,
            "envelope codec ready"
        );

        Ok(EnvelopeCodec {
            key,
            serializer,
            max_age: self.max_age,
            max_age_secs,
        })
    }

    fn wipe_key(&mut self) {
        if let Some(k) = self.key.as_mut() {
            k.iter_mut().for_each(|b| *b = 0);
        }
    }
}

impl Drop for EnvelopeCodecBuilder {
    fn drop(&mut self) {
        self.wipe_key();
    }
}

impl fmt::Debug for EnvelopeCodecBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvelopeCodecBuilder")
            .field("key", &self.key.as_ref().map(|_| "[REDACTED]"))
            .field("serializer", &self.serializer)
            .field("max_age", &self.max_age)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::generate_key;
    use crate::key::{source::MockKeySource, KEY_VARIABLE};
    use serde_json::{json, Value};

    fn no_env() -> EnvKeySource {
        EnvKeySource::from_vars(std::iter::empty::<(String, String)>())
    }

    fn codec(serializer: &str) -> EnvelopeCodec {
        EnvelopeCodec::builder()
            .key(generate_key())
            .serializer(serializer)
            .build_with(&no_env())
            .unwrap()
    }

    #[test]
    fn round_trip_default_serializer() {
        let c = EnvelopeCodec::builder()
            .key(generate_key())
            .build_with(&no_env())
            .unwrap();
        assert_eq!(c.serializer(), Serializer::Cbor);
        let data = json!({"test": "data", "hello": "wow", "num": 12});
        let out: Value = c.deserialize(c.serialize(&data).unwrap()).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn key_is_taken_from_variable() {
        let source = EnvKeySource::from_vars([(KEY_VARIABLE, "KEY")]);
        let c = EnvelopeCodec::builder().build_with(&source).unwrap();
        assert_eq!(c.key.as_bytes(), b"KEY");
        assert_eq!(c.key_origin(), KeyOrigin::Environment);
    }

    #[test]
    fn explicit_key_ignores_variable() {
        let mut source = MockKeySource::new();
        source.expect_lookup().never();
        let c = EnvelopeCodec::builder()
            .key("explicit")
            .build_with(&source)
            .unwrap();
        assert_eq!(c.key.as_bytes(), b"explicit");
        assert_eq!(c.key_origin(), KeyOrigin::Explicit);
    }

    #[test]
    fn missing_key_fails_at_construction() {
        let err = EnvelopeCodec::builder().build_with(&no_env()).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn unsupported_serializer_fails_at_construction() {
        let err = EnvelopeCodec::builder()
            .key(generate_key())
            .serializer("xml")
            .build_with(&no_env())
            .unwrap_err();
        assert!(matches!(
            err,
            CodecError::Configuration(ConfigurationError::UnsupportedSerializer(_))
        ));
    }

    #[test]
    fn malformed_key_surfaces_on_first_use() {
        let source = EnvKeySource::from_vars([(KEY_VARIABLE, "KEY")]);
        let c = EnvelopeCodec::builder().build_with(&source).unwrap();
        let err = c.serialize(&1).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Configuration(ConfigurationError::MalformedKey(_))
        ));
        assert!(c.deserialize::<Value>("anything").unwrap_err().is_configuration());
        assert!(c.key_id().is_err());
    }

    #[test]
    fn non_token_input_is_security_error() {
        for name in ["json", "cbor", "yaml", "msgpack"] {
            let err = codec(name).deserialize::<Value>("blah").unwrap_err();
            assert!(err.is_security(), "{name}: {err}");
        }
    }

    #[test]
    fn authentic_undecodable_payload_is_decoding_error() {
        let c = codec("json");
        let token = c.serialize("just a string").unwrap();
        let err = c.deserialize::<Vec<u32>>(&token).unwrap_err();
        assert!(matches!(err, CodecError::PayloadDecoding(_)));
    }

    #[test]
    fn unencodable_value_is_encoding_error() {
        use std::collections::BTreeMap;
        let mut map = BTreeMap::new();
        map.insert(vec![1u8], 1);
        let err = codec("json").serialize(&map).unwrap_err();
        assert!(matches!(err, CodecError::PayloadEncoding(_)));
    }

    #[test]
    fn expired_token_rejected() {
        let c = EnvelopeCodec::builder()
            .key(generate_key())
            .max_age(Duration::from_secs(30))
            .build_with(&no_env())
            .unwrap();
        let token = c.serialize_at(&true, 1_000).unwrap();
        assert!(c.deserialize_at::<bool>(token.as_ref(), 1_030).unwrap());
        let err = c.deserialize_at::<bool>(token.as_ref(), 1_031).unwrap_err();
        assert!(matches!(err, CodecError::Security(SecurityError::Expired)));
    }

    #[test]
    fn sub_second_max_age_rounds_up() {
        let c = EnvelopeCodec::builder()
            .key(generate_key())
            .max_age(Duration::from_millis(1900))
            .build_with(&no_env())
            .unwrap();
        assert_eq!(c.max_age(), Some(Duration::from_millis(1900)));
        let token = c.serialize_at(&1u8, 1_000).unwrap();
        assert_eq!(c.deserialize_at::<u8>(token.as_ref(), 1_002).unwrap(), 1);
        assert!(c.deserialize_at::<u8>(token.as_ref(), 1_003).unwrap_err().is_security());

        assert_eq!(window_secs(Duration::from_millis(500)), 1);
        assert_eq!(window_secs(Duration::from_secs(30)), 30);
    }

    #[test]
    fn zero_max_age_is_rejected() {
        let err = EnvelopeCodec::builder()
            .key(generate_key())
            .max_age(Duration::ZERO)
            .build_with(&no_env())
            .unwrap_err();
        assert!(matches!(
            err,
            CodecError::Configuration(ConfigurationError::InvalidSettings(_))
        ));
    }

    #[test]
    fn builder_wipes_key_copy() {
        let mut b = EnvelopeCodec::builder().key("hunter2");
        b.wipe_key();
        assert!(b.key.as_ref().unwrap().iter().all(|&byte| byte == 0));
    }

    #[test]
    fn failed_build_drops_builder_cleanly() {
        let err = EnvelopeCodec::builder()
            .key("hunter2")
            .serializer("xml")
            .build_with(&no_env())
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn unbounded_age_accepts_old_tokens() {
        let c = codec("cbor");
        assert_eq!(c.max_age(), None);
        let token = c.serialize_at(&7u8, 0).unwrap();
        assert_eq!(c.deserialize::<u8>(&token).unwrap(), 7);
    }

    #[test]
    fn key_id_matches_for_same_key() {
        let key = generate_key();
        let a = EnvelopeCodec::builder().key(&key).build_with(&no_env()).unwrap();
        let b = EnvelopeCodec::builder()
            .key(&key)
            .serializer("json")
            .build_with(&no_env())
            .unwrap();
        assert_eq!(a.key_id().unwrap(), b.key_id().unwrap());
    }

    #[test]
    fn from_settings_applies_serializer_and_age() {
        let settings = Settings {
            serializer: "yaml".into(),
            max_age_secs: Some(60),
            ..Settings::default()
        };
        let key = generate_key();
        let c = EnvelopeCodec::from_settings(&settings, Some(key.as_bytes()), &no_env()).unwrap();
        assert_eq!(c.serializer(), Serializer::Yaml);
        assert_eq!(c.max_age(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn builder_debug_redacts_key() {
        let b = EnvelopeCodec::builder().key("hunter2");
        assert!(!format!("{b:?}").contains("hunter2"));
    }

    #[test]
    fn codec_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EnvelopeCodec>();
    }
}
