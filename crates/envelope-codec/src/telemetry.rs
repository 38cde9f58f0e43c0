//! Tracing subscriber setup for hosts embedding the codec.
//!
//! The codec itself only emits `tracing` events. Hosts that have no subscriber
//! of their own can call [`init`] once at startup to get structured JSON logs.
//!
//! # Telemetry invariants
//!
//! - **No key material, plaintext, or token text** appears in any log field.
//!   Keys are identified only by [`crate::EnvelopeCodec::key_id`].
//! - `RUST_LOG` overrides the configured level.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Initialise a JSON tracing subscriber at `log_level`.
///
/// # Errors
///
/// Returns an error if a global subscriber has already been set.
pub fn init(log_level: &str) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise tracing subscriber: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_fails() {
        let _ = init("debug");
        assert!(init("info").is_err());
    }
}
