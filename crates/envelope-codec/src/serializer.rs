//! Inner payload serializers, selected by name at codec construction.
//!
//! The set is closed. Every format here is self-describing, so dynamic
//! [`serde_json::Value`] trees round-trip with booleans kept distinct from
//! integers.

use std::fmt;

use common::{ConfigurationError, PayloadCause};
use serde::{de::DeserializeOwned, Serialize};

/// A supported inner serializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Serializer {
    /// JSON via `serde_json`.
    Json,
    /// CBOR via `ciborium`. Binary, schema-less, native type fidelity.
    #[default]
    Cbor,
    /// YAML via `serde_yaml`.
    Yaml,
    /// MessagePack via `rmp-serde`. Structs are written as maps keyed by field name.
    Msgpack,
}

impl Serializer {
    /// Every supported serializer.
    pub const ALL: [Serializer; 4] = [
        Serializer::Json,
        Serializer::Cbor,
        Serializer::Yaml,
        Serializer::Msgpack,
    ];

    /// Resolve a serializer by name.
    ///
    /// `pickle` is accepted as an alias for the default object format.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::UnsupportedSerializer`] for unknown names.
    pub fn lookup(name: &str) -> Result<Self, ConfigurationError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Serializer::Json),
            "cbor" | "pickle" => Ok(Serializer::Cbor),
            "yaml" | "yml" => Ok(Serializer::Yaml),
            "msgpack" => Ok(Serializer::Msgpack),
            _ => Err(ConfigurationError::UnsupportedSerializer(name.to_owned())),
        }
    }

    /// Canonical name, used in content types.
    pub fn name(self) -> &'static str {
        match self {
            Serializer::Json => "json",
            Serializer::Cbor => "cbor",
            Serializer::Yaml => "yaml",
            Serializer::Msgpack => "msgpack",
        }
    }

    /// Encode `value` to bytes.
    pub fn encode<T: Serialize + ?Sized>(self, value: &T) -> Result<Vec<u8>, PayloadCause> {
        match self {
            Serializer::Json => Ok(serde_json::to_vec(value)?),
            Serializer::Cbor => {
                let mut buf = Vec::new();
                ciborium::ser::into_writer(value, &mut buf)?;
                Ok(buf)
            }
            Serializer::Yaml => Ok(serde_yaml::to_string(value)?.into_bytes()),
            Serializer::Msgpack => Ok(rmp_serde::to_vec_named(value)?),
        }
    }

    /// Decode bytes produced by [`Serializer::encode`].
    pub fn decode<T: DeserializeOwned>(self, bytes: &[u8]) -> Result<T, PayloadCause> {
        match self {
            Serializer::Json => Ok(serde_json::from_slice(bytes)?),
            Serializer::Cbor => Ok(ciborium::de::from_reader(bytes)?),
            Serializer::Yaml => Ok(serde_yaml::from_slice(bytes)?),
            Serializer::Msgpack => Ok(rmp_serde::from_slice(bytes)?),
        }
    }
}

impl fmt::Display for Serializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Serializer {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::lookup(s)
    }
}
