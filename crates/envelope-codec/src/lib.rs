//! Encrypted message envelope codec.
//!
//! Wraps a pluggable payload serializer (JSON, CBOR, YAML, MessagePack) with AES-256-GCM-SIV
//! so a value becomes one opaque token suitable as a message body, and a token
//! becomes a verified value again.
//!
//! ```no_run
//! use envelope_codec::{generate_key, EnvelopeCodec};
//! use serde_json::{json, Value};
//!
//! let codec = EnvelopeCodec::builder()
//!     .key(generate_key())
//!     .serializer("json")
//!     .build()?;
//!
//! let token = codec.serialize(&json!({"num": 12}))?;
//! let value: Value = codec.deserialize(&token)?;
//! assert_eq!(value["num"], 12);
//! # Ok::<(), envelope_codec::CodecError>(())
//! ```
//!
//! # Layers
//!
//! - [`key`] resolves the single active key (explicit, else `ENVELOPE_CODEC_KEY`).
//! - [`serializer`] is the closed set of inner formats.
//! - [`crypto`] seals and opens tokens.
//! - [`codec`] composes the three; [`registry`] exposes codecs by content type.

pub mod codec;
pub mod config;
pub mod crypto;
pub mod key;
pub mod registry;
pub mod serializer;
pub mod telemetry;

pub use codec::{EnvelopeCodec, EnvelopeCodecBuilder, Token};
pub use common::{CodecError, ConfigurationError, ContentRegistration, EncodedMessage, SecurityError};
pub use config::Settings;
pub use crypto::generate_key;
pub use key::{EnvKeySource, KeySource, KEY_VARIABLE};
pub use registry::{setup_encrypted_serializer, CodecRegistry, RegistryError};
pub use serializer::Serializer;
