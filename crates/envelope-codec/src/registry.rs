//! Content-type registry: the boundary toward the hosting message library.
//!
//! Codecs are registered under a content name and advertised with a MIME type
//! (`application/x-encrypted-<serializer>`). The host encodes by name and
//! decodes by the MIME type found on the incoming message, so each MIME type
//! belongs to at most one name.
//!
//! Reads use `arc-swap` and never block; registration swaps in a new map.

use std::{collections::HashMap, sync::Arc};

use arc_swap::ArcSwap;
use common::{CodecError, ContentRegistration, EncodedMessage};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::codec::EnvelopeCodec;
use crate::config::Settings;
use crate::key::{EnvKeySource, KeySource};

/// Errors from the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No codec is registered under the requested name.
    #[error("unknown content name: {0}")]
    UnknownName(String),

    /// No codec advertises the requested MIME type.
    #[error("unknown content type: {0}")]
    UnknownContentType(String),

    /// Another name already advertises this MIME type.
    #[error("content type {content_type} is already registered as {name}")]
    ContentTypeInUse {
        /// The contested MIME type.
        content_type: String,
        /// The name currently holding it.
        name: String,
    },

    /// The registered codec failed.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// A codec together with its registration record.
#[derive(Debug, Clone)]
pub struct RegisteredCodec {
    /// Name, MIME type, and encoding advertised to the host.
    pub registration: ContentRegistration,
    /// The codec handling this content type.
    pub codec: Arc<EnvelopeCodec>,
}

/// Shared, lock-free registry of codecs keyed by content name.
#[derive(Clone, Debug)]
pub struct CodecRegistry {
    inner: Arc<ArcSwap<HashMap<String, RegisteredCodec>>>,
}

impl CodecRegistry {
    /// Create a new, empty [`CodecRegistry`].
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ArcSwap::new(Arc::new(HashMap::new()))),
        }
    }

    /// Return the number of registered codecs.
    pub fn len(&self) -> usize {
        self.inner.load().len()
    }

    /// Return `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.inner.load().is_empty()
    }

    /// Register `codec` under `name`, replacing any previous entry for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ContentTypeInUse`] if a different name already
    /// advertises the codec's MIME type. The registry is left unchanged.
    pub fn register(
        &self,
        name: &str,
        codec: EnvelopeCodec,
    ) -> Result<ContentRegistration, RegistryError> {
        let registration = ContentRegistration::new(name, codec.serializer().name());
        let entry = RegisteredCodec {
            registration: registration.clone(),
            codec: Arc::new(codec),
        };
        let mut holder = None;
        self.inner.rcu(|current| {
            holder = current
                .iter()
                .find(|(other, e)| {
                    other.as_str() != name
                        && e.registration.content_type == registration.content_type
                })
                .map(|(other, _)| other.clone());
            let mut next = HashMap::clone(current);
            if holder.is_none() {
                next.insert(name.to_owned(), entry.clone());
            }
            next
        });
        if let Some(holder) = holder {
            warn!(
                name,
                holder = %holder,
                content_type = %registration.content_type,
                "content type already registered"
            );
            return Err(RegistryError::ContentTypeInUse {
                content_type: registration.content_type,
                name: holder,
            });
        }
        info!(
            name,
            content_type = %registration.content_type,
            key_id = entry.codec.key_id().ok().as_deref(),
            "codec registered"
        );
        Ok(registration)
    }

    /// Remove the codec registered under `name`. Returns `true` if one was removed.
    pub fn unregister(&self, name: &str) -> bool {
        let mut removed = false;
        self.inner.rcu(|current| {
            let mut next = HashMap::clone(current);
            removed = next.remove(name).is_some();
            next
        });
        removed
    }

    /// Look up a codec by content name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownName`] if `name` is not registered.
    pub fn get(&self, name: &str) -> Result<RegisteredCodec, RegistryError> {
        self.inner
            .load()
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownName(name.to_owned()))
    }

    /// Look up a codec by the MIME type it advertises.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownContentType`] if no codec matches.
    pub fn get_by_content_type(&self, content_type: &str) -> Result<RegisteredCodec, RegistryError> {
        self.inner
            .load()
            .values()
            .find(|entry| entry.registration.content_type == content_type)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownContentType(content_type.to_owned()))
    }

    /// Encode `value` with the codec registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownName`] or the codec's own error.
    pub fn encode<T: Serialize + ?Sized>(
        &self,
        name: &str,
        value: &T,
    ) -> Result<EncodedMessage, RegistryError> {
        let entry = self.get(name)?;
        let token = entry.codec.serialize(value)?;
        Ok(EncodedMessage {
            content_type: entry.registration.content_type,
            content_encoding: entry.registration.content_encoding,
            body: token.into_string(),
        })
    }

    /// Decode `body` with the codec advertising `content_type`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownContentType`] or the codec's own error.
    pub fn decode<T: DeserializeOwned>(
        &self,
        content_type: &str,
        body: impl AsRef<[u8]>,
    ) -> Result<T, RegistryError> {
        let entry = self.get_by_content_type(content_type)?;
        Ok(entry.codec.deserialize(body)?)
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a codec from the process environment and register it.
///
/// The key is read from [`crate::key::KEY_VARIABLE`]; `serializer` selects the
/// inner format and `name` the content name.
///
/// # Errors
///
/// Returns [`RegistryError::Codec`] wrapping [`CodecError::Configuration`] if
/// no key is available or the serializer is unsupported, and
/// [`RegistryError::ContentTypeInUse`] if another name already serves the
/// same inner format.
pub fn setup_encrypted_serializer(
    registry: &CodecRegistry,
    name: &str,
    serializer: &str,
) -> Result<ContentRegistration, RegistryError> {
    setup_encrypted_serializer_with(registry, name, serializer, &EnvKeySource::new())
}

/// [`setup_encrypted_serializer`] with an injected key source.
///
/// # Errors
///
/// See [`setup_encrypted_serializer`].
pub fn setup_encrypted_serializer_with(
    registry: &CodecRegistry,
    name: &str,
    serializer: &str,
    source: &dyn KeySource,
) -> Result<ContentRegistration, RegistryError> {
    let codec = EnvelopeCodec::builder()
        .serializer(serializer)
        .build_with(source)?;
    registry.register(name, codec)
}

/// Build a codec from [`Settings`] and register it under `settings.content_name`.
///
/// # Errors
///
/// See [`setup_encrypted_serializer`].
pub fn setup_from_settings(
    registry: &CodecRegistry,
    settings: &Settings,
    source: &dyn KeySource,
) -> Result<ContentRegistration, RegistryError> {
    let codec = EnvelopeCodec::from_settings(settings, None, source)?;
    registry.register(&settings.content_name, codec)
}
