//! AES-256-GCM-SIV token primitives and key derivation.
//!
//! This module is free of serializer and configuration dependencies. It turns
//! plaintext bytes into tokens and back; the codec layer decides what the
//! bytes mean.
//!
//! # Token format
//!
//! ```text
//! base64url-no-pad( 0xE1 || issued_at:u64be || nonce:12 || ciphertext+tag )
//! ```
//!
//! The leading version byte enables future algorithm migration without
//! breaking existing tokens.

pub mod cipher;
pub mod kdf;

pub use cipher::{CipherError, SealedToken, KEY_LEN};
pub use kdf::{generate_key, MasterKey};
