//! Settings loading and validation.
//!
//! Values are read from environment variables prefixed `ENVELOPE_CODEC_`
//! (e.g. `ENVELOPE_CODEC_SERIALIZER`). The key itself is not part of
//! [`Settings`]; it is read through [`crate::key::KeySource`] so it never sits
//! in a loggable struct.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::serializer::Serializer;

/// Prefix shared by every settings variable.
pub const ENV_PREFIX: &str = "ENVELOPE_CODEC";

/// Validated codec settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Inner serializer name.
    #[serde(default = "default_serializer")]
    pub serializer: String,

    /// Maximum token age in seconds. Unset means unbounded.
    #[serde(default)]
    pub max_age_secs: Option<u64>,

    /// Content name the codec registers under.
    #[serde(default = "default_content_name")]
    pub content_name: String,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_serializer() -> String {
    Serializer::default().name().into()
}
fn default_content_name() -> String {
    "encrypted".into()
}
fn default_log_level() -> String {
    "info".into()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            serializer: default_serializer(),
            max_age_secs: None,
            content_name: default_content_name(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Load and validate settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or validation fails.
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// Load and validate settings from `vars` instead of the process environment.
    ///
    /// # Errors
    ///
    /// See [`Settings::from_env`].
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::load(Some(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ))
    }

    fn load(vars: Option<config::Map<String, String>>) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .source(vars),
            )
            .build()
            .context("failed to build configuration from environment")?;

        let s: Settings = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        s.validate()?;
        Ok(s)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        Serializer::lookup(&self.serializer)
            .with_context(|| format!("{ENV_PREFIX}_SERIALIZER is invalid"))?;
        ensure_non_empty(&self.content_name, "CONTENT_NAME")?;
        if self.max_age_secs == Some(0) {
            anyhow::bail!("{ENV_PREFIX}_MAX_AGE_SECS must be > 0 when set");
        }
        Ok(())
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{ENV_PREFIX}_{name} must not be empty");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        assert_eq!(default_serializer(), "cbor");
        assert_eq!(default_content_name(), "encrypted");
        assert_eq!(default_log_level(), "info");
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let s = Settings::from_vars(std::iter::empty::<(String, String)>()).unwrap();
        assert_eq!(s.serializer, "cbor");
        assert_eq!(s.max_age_secs, None);
        assert_eq!(s.content_name, "encrypted");
    }

    #[test]
    fn reads_prefixed_vars() {
        let s = Settings::from_vars([
            ("ENVELOPE_CODEC_SERIALIZER", "json"),
            ("ENVELOPE_CODEC_MAX_AGE_SECS", "300"),
            ("ENVELOPE_CODEC_CONTENT_NAME", "secure"),
            ("UNRELATED", "x"),
        ])
        .unwrap();
        assert_eq!(s.serializer, "json");
        assert_eq!(s.max_age_secs, Some(300));
        assert_eq!(s.content_name, "secure");
    }

    #[test]
    fn validate_rejects_unknown_serializer() {
        let s = Settings {
            serializer: "xml".into(),
            ..Settings::default()
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_max_age() {
        let s = Settings {
            max_age_secs: Some(0),
            ..Settings::default()
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn validate_rejects_blank_content_name() {
        let s = Settings {
            content_name: "  ".into(),
            ..Settings::default()
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn validate_accepts_defaults() {
        assert!(Settings::default().validate().is_ok());
    }
}
