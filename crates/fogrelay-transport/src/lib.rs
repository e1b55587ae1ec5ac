//! Transport abstraction layer for fogrelay.
//!
//! Provides the [`Transport`] and [`Connection`] traits the relay server is
//! written against, plus a WebSocket implementation. A connection carries
//! the [`RequestTarget`] of its upgrade request so the server can route on
//! path and read query parameters.
//!
//! # Feature Flags
//!
//! - `websocket` (default) — WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
mod request;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use request::RequestTarget;
#[cfg(feature = "websocket")]
pub use websocket::{
    PendingWebSocket, WebSocketConnection, WebSocketTransport,
};

use std::fmt;
use std::net::SocketAddr;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Why the server is closing a connection.
///
/// Maps onto WebSocket close codes 1001, 1003 and 1011.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The endpoint is going away or refused the peer.
    GoingAway(String),
    /// The peer sent something that cannot be processed.
    UnsupportedData(String),
    /// The server hit a condition it cannot recover from.
    InternalError(String),
}

impl CloseReason {
    /// The WebSocket close code for this reason.
    pub fn code(&self) -> u16 {
        match self {
            Self::GoingAway(_) => 1001,
            Self::UnsupportedData(_) => 1003,
            Self::InternalError(_) => 1011,
        }
    }

    /// Human-readable text sent with the close frame.
    pub fn text(&self) -> &str {
        match self {
            Self::GoingAway(text)
            | Self::UnsupportedData(text)
            | Self::InternalError(text) => text,
        }
    }
}

/// Accepts new incoming connections.
///
/// Accepting only takes the socket off the listener; the protocol
/// handshake runs later in [`Incoming::upgrade`], so one slow client
/// never holds up the accept loop.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// A socket accepted but not upgraded yet.
    type Incoming: Incoming<
            Connection = Self::Connection,
            Error = Self::Error,
        >;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next incoming socket.
    async fn accept(&mut self) -> Result<Self::Incoming, Self::Error>;

    /// The address the transport is listening on.
    fn local_addr(&self) -> std::io::Result<SocketAddr>;
}

/// An accepted socket whose protocol handshake is still pending.
pub trait Incoming: Send + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Address of the remote peer.
    fn peer_addr(&self) -> SocketAddr;

    /// Runs the handshake, bounded by the transport's handshake timeout.
    async fn upgrade(self) -> Result<Self::Connection, Self::Error>;
}

/// A single connection carrying text frames.
///
/// Sending and receiving may run concurrently from different tasks.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends one text frame to the remote peer.
    async fn send(&self, text: &str) -> Result<(), Self::Error>;

    /// Receives the next data frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Closes the connection normally.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Closes the connection with an explicit reason.
    async fn close_with(&self, reason: CloseReason)
    -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;

    /// The path and query of the request that opened this connection.
    fn target(&self) -> &RequestTarget;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
        assert_eq!(id.into_inner(), 7);
    }

    #[test]
    fn test_close_reason_codes() {
        assert_eq!(CloseReason::GoingAway("bye".into()).code(), 1001);
        assert_eq!(CloseReason::UnsupportedData("x".into()).code(), 1003);
        assert_eq!(CloseReason::InternalError("y".into()).code(), 1011);
    }

    #[test]
    fn test_close_reason_text() {
        let reason = CloseReason::GoingAway("not found".into());
        assert_eq!(reason.text(), "not found");
        let reason = CloseReason::InternalError("cannot connect".into());
        assert_eq!(reason.text(), "cannot connect");
    }
}
