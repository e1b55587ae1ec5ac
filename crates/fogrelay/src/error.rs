//! Unified error type for the relay server.

use fogrelay_protocol::ProtocolError;
use fogrelay_room::RoomError;
use fogrelay_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (unauthorized, not found, closed).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The server configuration is unusable.
    #[error("invalid server config: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::MessageTooLarge { limit: 16 };
        let relay_err: RelayError = err.into();
        assert!(matches!(
            relay_err,
            RelayError::Transport(TransportError::MessageTooLarge { .. })
        ));
        assert!(relay_err.to_string().contains("16 bytes"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let relay_err: RelayError = err.into();
        assert!(matches!(relay_err, RelayError::Protocol(_)));
    }

    #[test]
    fn test_from_room_error() {
        let err = RoomError::NotFound("k7m2p".into());
        let relay_err: RelayError = err.into();
        assert!(matches!(relay_err, RelayError::Room(_)));
        assert!(relay_err.to_string().contains("k7m2p"));
    }
}
