//! Codec trait and implementations for serializing/deserializing frames.
//!
//! A "codec" (coder/decoder) converts between Rust types and raw bytes.
//! The server doesn't care HOW frames are serialized, only that something
//! implements [`Codec`]. Browser clients speak JSON, so [`JsonCodec`] is
//! the one the server uses.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because a single codec is shared by every
/// connection task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use fogrelay_protocol::{Codec, JsonCodec, Message};
///
/// let codec = JsonCodec;
/// let msg = Message::new("move", serde_json::json!({"x": 1, "y": 2}));
///
/// let bytes = codec.encode(&msg).unwrap();
/// let decoded: Message = codec.decode(&bytes).unwrap();
/// assert_eq!(msg, decoded);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ControlFrame, Message};

    #[test]
    fn test_json_codec_decodes_browser_frame() {
        let codec = JsonCodec;
        let raw = br#"{"content":"fog","data":{"cells":[1,2,3]}}"#;

        let msg: Message = codec.decode(raw).unwrap();

        assert_eq!(msg.category, "fog");
        assert_eq!(msg.payload["cells"], serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn test_json_codec_decode_garbage_fails() {
        let codec = JsonCodec;
        let result: Result<Message, _> = codec.decode(b"not json at all");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_json_codec_decode_missing_content_is_empty_category() {
        let codec = JsonCodec;
        let msg: Message = codec.decode(br#"{"data":{"x":1}}"#).unwrap();
        assert_eq!(msg.category, "");
        assert_eq!(msg.payload, serde_json::json!({"x": 1}));
    }

    #[test]
    fn test_json_codec_encodes_control_frame() {
        let codec = JsonCodec;
        let bytes = codec.encode(&ControlFrame::failure("not found")).unwrap();
        assert_eq!(bytes, br#"{"error":"not found"}"#);
    }
}
