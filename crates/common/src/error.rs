//! Error taxonomy shared across crates.

use thiserror::Error;

/// Boxed cause of an inner serializer failure.
///
/// The codec never inspects it; it is carried through for display and
/// `source()` chaining only.
pub type PayloadCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level codec error type.
///
/// Each variant has a stable machine-readable code (see [`CodecError::code`]):
/// - [`CodecError::Configuration`] → `configuration_error`
/// - [`CodecError::Security`] → `security_error`
/// - [`CodecError::PayloadEncoding`] → `payload_encoding_error`
/// - [`CodecError::PayloadDecoding`] → `payload_decoding_error`
#[derive(Debug, Error)]
pub enum CodecError {
    /// Missing or malformed key, unknown serializer, or invalid settings.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// The token failed verification under the active key.
    #[error("security error: {0}")]
    Security(#[from] SecurityError),

    /// The inner serializer could not encode the value.
    #[error("payload encoding failed: {0}")]
    PayloadEncoding(#[source] PayloadCause),

    /// The inner serializer could not decode the verified plaintext.
    #[error("payload decoding failed: {0}")]
    PayloadDecoding(#[source] PayloadCause),
}

impl CodecError {
    /// Returns the machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            CodecError::Configuration(_) => "configuration_error",
            CodecError::Security(_) => "security_error",
            CodecError::PayloadEncoding(_) => "payload_encoding_error",
            CodecError::PayloadDecoding(_) => "payload_decoding_error",
        }
    }

    /// Returns `true` if the token was rejected by the integrity check.
    pub fn is_security(&self) -> bool {
        matches!(self, CodecError::Security(_))
    }

    /// Returns `true` for configuration problems the caller must fix.
    pub fn is_configuration(&self) -> bool {
        matches!(self, CodecError::Configuration(_))
    }
}

/// Configuration failures, raised at construction or on first cryptographic use.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Neither an explicit key nor the key variable yielded a value.
    #[error("no key available: pass a key explicitly or set {variable}")]
    MissingKey {
        /// Name of the variable that was consulted.
        variable: String,
    },

    /// The serializer name is not one of the supported set.
    #[error("unsupported serializer: {0}")]
    UnsupportedSerializer(String),

    /// The key could not be used by the encryption primitive.
    #[error("malformed key: {0}")]
    MalformedKey(String),

    /// Settings failed validation.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

/// Token verification failures.
///
/// Both variants display as "invalid token" so callers cannot distinguish
/// a wrong key from tampering by message text alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SecurityError {
    /// Malformed, truncated, tampered, or sealed under a different key.
    #[error("invalid token")]
    InvalidToken,

    /// Authentic, but older than the configured maximum age.
    #[error("invalid token (expired)")]
    Expired,
}
