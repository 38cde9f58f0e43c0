//! Key resolution: explicit key first, then the key variable, else fail.
//!
//! # Invariants
//!
//! - The resolver checks presence only. Key format is validated by the cipher
//!   on first use, so a malformed key surfaces from `serialize`/`deserialize`
//!   as a configuration error rather than at construction.
//! - The key is read once per codec and never logged.

pub mod material;
pub mod source;

pub use material::{ActiveKey, KeyOrigin};
pub use source::{EnvKeySource, KeySource, KEY_VARIABLE};

use common::ConfigurationError;
use tracing::debug;

/// Resolve the active key.
///
/// A non-empty `explicit` key wins verbatim. Otherwise [`KEY_VARIABLE`] is
/// looked up in `source`; an empty value counts as unset.
///
/// # Errors
///
/// Returns [`ConfigurationError::MissingKey`] if neither yields a value, or
/// the source's own error if the variable cannot be read.
pub fn resolve(
    explicit: Option<&[u8]>,
    source: &dyn KeySource,
) -> Result<ActiveKey, ConfigurationError> {
    if let Some(bytes) = explicit.filter(|b| !b.is_empty()) {
        debug!(origin = "explicit", "key resolved");
        return Ok(ActiveKey::new(bytes, KeyOrigin::Explicit));
    }

    match source.lookup(KEY_VARIABLE)?.filter(|v| !v.is_empty()) {
        Some(value) => {
            debug!(origin = "environment", variable = KEY_VARIABLE, "key resolved");
            Ok(ActiveKey::new(value.as_bytes(), KeyOrigin::Environment))
        }
        None => Err(ConfigurationError::MissingKey {
            variable: KEY_VARIABLE.into(),
        }),
    }
}
