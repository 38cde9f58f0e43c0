//! Key sources: the single process-wide lookup the resolver consults.

use anyhow::{Context, Result};
use common::ConfigurationError;

/// Name of the variable holding the key text.
pub const KEY_VARIABLE: &str = "ENVELOPE_CODEC_KEY";

/// A key-value lookup for configuration entries.
///
/// The resolver reads exactly one entry per codec construction. Injecting the
/// source keeps tests independent of the real process environment.
#[cfg_attr(test, mockall::automock)]
pub trait KeySource: Send + Sync {
    /// Return the value of `name`, or `None` if it is unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidSettings`] if the source itself
    /// cannot be read.
    fn lookup(&self, name: &str) -> Result<Option<String>, ConfigurationError>;
}

/// [`KeySource`] backed by the `config` crate's environment source.
///
/// By default it reads the process environment. [`EnvKeySource::from_vars`]
/// substitutes a fixed map for deterministic tests.
#[derive(Debug, Clone, Default)]
pub struct EnvKeySource {
    vars: Option<config::Map<String, String>>,
}

impl EnvKeySource {
    /// Read from the process environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read from `vars` instead of the process environment.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: Some(
                vars.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    fn read(&self, name: &str) -> Result<Option<String>> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default().source(self.vars.clone()))
            .build()
            .context("failed to build configuration from environment")?;

        // The environment source lowercases every key.
        match cfg.get_string(&name.to_lowercase()) {
            Ok(value) => Ok(Some(value)),
            Err(config::ConfigError::NotFound(_)) => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to read {name}")),
        }
    }
}

impl KeySource for EnvKeySource {
    fn lookup(&self, name: &str) -> Result<Option<String>, ConfigurationError> {
        self.read(name).map_err(|e| {
            tracing::warn!(variable = name, error = %e, "key source lookup failed");
            ConfigurationError::InvalidSettings(format!("{e:#}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_injected_vars() {
        let source = EnvKeySource::from_vars([(KEY_VARIABLE, "KEY")]);
        assert_eq!(source.lookup(KEY_VARIABLE).unwrap().as_deref(), Some("KEY"));
    }

    #[test]
    fn missing_var_is_none() {
        let source = EnvKeySource::from_vars([("SOMETHING_ELSE", "x")]);
        assert_eq!(source.lookup(KEY_VARIABLE).unwrap(), None);
    }

    #[test]
    fn key_text_is_not_altered() {
        let text = "q9Xh3bV0-_aZc1T7m2kQeR8pLwN4sYuJ6vGdHfKiOxE=";
        let source = EnvKeySource::from_vars([(KEY_VARIABLE, text)]);
        assert_eq!(source.lookup(KEY_VARIABLE).unwrap().as_deref(), Some(text));
    }
}
