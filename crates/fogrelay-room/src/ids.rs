//! Room id and secret issuance.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use fogrelay_protocol::RoomId;
use rand::Rng;

/// Symbols used for room ids. Visually ambiguous characters
/// (`0 1 l o I O`) are left out because players type these codes by hand.
pub const ID_ALPHABET: &[u8] =
    b"23456789abcdefghijkmnpqrstuvwxyzABCDEFGHJKLMNPQRSTUVWXYZ";

/// Number of random bytes in a room secret.
const SECRET_BYTES: usize = 25;

/// Generates a room id from the current wall-clock second.
///
/// Two ids generated within the same second are equal; the registry
/// reports that as [`RoomError::Overloaded`](crate::RoomError::Overloaded).
pub fn generate_room_id() -> RoomId {
    room_id_at(SystemTime::now())
}

/// Encodes `time` (whole seconds since the UNIX epoch) over
/// [`ID_ALPHABET`], least significant digit first.
pub fn room_id_at(time: SystemTime) -> RoomId {
    let base = ID_ALPHABET.len() as u64;
    let mut secs = time
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    let mut id = String::new();
    while secs > 0 {
        id.push(char::from(ID_ALPHABET[(secs % base) as usize]));
        secs /= base;
    }
    RoomId(id)
}

/// Generates a room secret: 25 bytes from the thread-local CSPRNG,
/// encoded as URL-safe base64 without padding so it can travel in a
/// query string untouched.
pub fn generate_secret() -> String {
    let bytes: [u8; SECRET_BYTES] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_alphabet_has_no_ambiguous_symbols() {
        for c in b"01loIO" {
            assert!(!ID_ALPHABET.contains(c), "{} in alphabet", *c as char);
        }
        assert_eq!(ID_ALPHABET.len(), 56);
    }

    #[test]
    fn test_room_id_at_encodes_least_significant_first() {
        // 57 = 1 * 56 + 1 → digits [1, 1] → "33"
        let id = room_id_at(UNIX_EPOCH + Duration::from_secs(57));
        assert_eq!(id.as_str(), "33");

        // 56 = 0 * 1 + 1 * 56 → digits [0, 1] → "23"
        let id = room_id_at(UNIX_EPOCH + Duration::from_secs(56));
        assert_eq!(id.as_str(), "23");
    }

    #[test]
    fn test_room_id_same_second_collides() {
        let t = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        assert_eq!(room_id_at(t), room_id_at(t + Duration::from_millis(500)));
        assert_ne!(room_id_at(t), room_id_at(t + Duration::from_secs(1)));
    }

    #[test]
    fn test_room_id_uses_only_alphabet() {
        let id = generate_room_id();
        assert!(!id.is_empty());
        assert!(id.as_str().bytes().all(|b| ID_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_secret_is_url_safe_and_random() {
        let a = generate_secret();
        let b = generate_secret();

        // 25 bytes → ceil(25 * 4 / 3) = 34 characters without padding.
        assert_eq!(a.len(), 34);
        assert_ne!(a, b);
        assert!(
            a.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }
}
