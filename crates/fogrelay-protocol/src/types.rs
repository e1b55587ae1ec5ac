//! Core protocol types for fogrelay's wire format.
//!
//! Every type here is serialized to JSON, sent over a WebSocket, and
//! parsed by a browser client (or by the server, for frames coming from
//! the game master).

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The identifier of a room, as typed or shared by humans (e.g. `"k7m2p"`).
///
/// Newtype over `String` so a room id can't be confused with a secret.
/// `#[serde(transparent)]` keeps it a plain JSON string on the wire.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
    Default,
)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if no id was supplied.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for RoomId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ---------------------------------------------------------------------------
// Message — the unit a game master publishes
// ---------------------------------------------------------------------------

/// A message relayed from the game master to every player of a room.
///
/// `category` is a free-form key ("map", "fog", "tokens", ...). Rooms keep
/// the most recent message per category so late joiners can catch up.
/// `payload` is opaque to the relay. Either field may be missing: an absent
/// `content` is the empty category and an absent `data` is `null`.
///
/// The field names on the wire are `content` and `data`, which is what the
/// browser clients send:
///
/// ```json
/// { "content": "move", "data": { "x": 1, "y": 2 } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "content", default)]
    pub category: String,
    #[serde(rename = "data", default)]
    pub payload: serde_json::Value,
}

impl Message {
    /// Builds a message from a category and a payload.
    pub fn new(
        category: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            category: category.into(),
            payload,
        }
    }
}

// ---------------------------------------------------------------------------
// ControlFrame — server → client bookkeeping
// ---------------------------------------------------------------------------

/// A frame the server sends outside of the relayed message stream.
///
/// Untagged, so each variant is a flat JSON object:
/// - `Welcome` → `{"id": "k7m2p", "auth": "Xy91..."}`
/// - `Failure` → `{"error": "unauthorized"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ControlFrame {
    /// Sent to a game master once its publish handle is issued. The master
    /// keeps `auth` to reclaim the room after a reconnect.
    Welcome { id: RoomId, auth: String },

    /// Sent right before the server closes a connection it refused.
    Failure { error: String },
}

impl ControlFrame {
    /// Shorthand for a `Failure` frame.
    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =====================================================================
    // RoomId
    // =====================================================================

    #[test]
    fn test_room_id_serializes_as_plain_string() {
        let id = RoomId::from("k7m2p");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#""k7m2p""#);
    }

    #[test]
    fn test_room_id_display_and_empty() {
        assert_eq!(RoomId::from("abc").to_string(), "abc");
        assert!(RoomId::default().is_empty());
        assert!(!RoomId::from("x").is_empty());
    }

    // =====================================================================
    // Message
    // =====================================================================

    #[test]
    fn test_message_uses_content_and_data_on_the_wire() {
        let msg = Message::new("move", serde_json::json!({"x": 1, "y": 2}));
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["content"], "move");
        assert_eq!(json["data"]["x"], 1);
        assert_eq!(json["data"]["y"], 2);
        assert!(json.get("category").is_none());
    }

    #[test]
    fn test_message_missing_data_defaults_to_null() {
        let msg: Message =
            serde_json::from_str(r#"{"content":"clear"}"#).unwrap();
        assert_eq!(msg.category, "clear");
        assert!(msg.payload.is_null());
    }

    // =====================================================================
    // ControlFrame
    // =====================================================================

    #[test]
    fn test_welcome_frame_json_format() {
        let frame = ControlFrame::Welcome {
            id: RoomId::from("k7m2p"),
            auth: "secret".into(),
        };
        let json = serde_json::to_value(&frame).unwrap();

        assert_eq!(json, serde_json::json!({"id": "k7m2p", "auth": "secret"}));
    }

    #[test]
    fn test_failure_frame_parses_back() {
        let frame: ControlFrame =
            serde_json::from_str(r#"{"error":"unauthorized"}"#).unwrap();
        assert_eq!(frame, ControlFrame::failure("unauthorized"));
    }
}
