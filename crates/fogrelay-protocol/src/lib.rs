//! Wire protocol for fogrelay.
//!
//! This crate defines what travels between the relay and its clients:
//!
//! - **Types** ([`Message`], [`RoomId`], [`ControlFrame`]) — the payloads
//!   a game master publishes and players receive, plus the small control
//!   frames the server sends when a connection is accepted or refused.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those values are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong during
//!   encoding/decoding.
//!
//! The protocol layer knows nothing about rooms or connections:
//!
//! ```text
//! Transport (bytes) → Protocol (Message) → Room (fan-out)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{ControlFrame, Message, RoomId};
