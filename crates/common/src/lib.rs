//! Common types, registration records, and errors shared across `envelope-codec` crates.

pub mod error;
pub mod protocol;

pub use error::{CodecError, ConfigurationError, PayloadCause, SecurityError};
pub use protocol::{ContentRegistration, EncodedMessage};
