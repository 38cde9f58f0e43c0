//! Content-type registration types exchanged with the hosting message library.
//!
//! A host routes a message through a codec by the MIME type carried in the
//! message headers; [`ContentRegistration`] is the record that ties the two.

use serde::{Deserialize, Serialize};

/// MIME prefix for every encrypted content type.
pub const CONTENT_TYPE_PREFIX: &str = "application/x-encrypted-";

/// Content encoding of every token body. Tokens are base64url text.
pub const CONTENT_ENCODING: &str = "utf-8";

/// A codec's registration under a content name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRegistration {
    /// Name the host uses to select the codec (e.g. `"encrypted"`).
    pub name: String,
    /// MIME type written to message headers (e.g. `"application/x-encrypted-cbor"`).
    pub content_type: String,
    /// Content encoding written to message headers.
    pub content_encoding: String,
}

impl ContentRegistration {
    /// Build the registration for `name` backed by the inner serializer `serializer`.
    pub fn new(name: impl Into<String>, serializer: &str) -> Self {
        Self {
            name: name.into(),
            content_type: format!("{CONTENT_TYPE_PREFIX}{serializer}"),
            content_encoding: CONTENT_ENCODING.into(),
        }
    }
}

/// A message body produced by a registered codec, ready for a broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedMessage {
    /// MIME type of `body`.
    pub content_type: String,
    /// Content encoding of `body`.
    pub content_encoding: String,
    /// Opaque token text.
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_content_type() {
        let r = ContentRegistration::new("encrypted", "json");
        assert_eq!(r.name, "encrypted");
        assert_eq!(r.content_type, "application/x-encrypted-json");
        assert_eq!(r.content_encoding, "utf-8");
    }

    #[test]
    fn encoded_message_serde() {
        let m = EncodedMessage {
            content_type: "application/x-encrypted-cbor".into(),
            content_encoding: CONTENT_ENCODING.into(),
            body: "4QAAAAB".into(),
        };
        let json = serde_json::to_string(&m).unwrap();
        let decoded: EncodedMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, m);
    }
}
