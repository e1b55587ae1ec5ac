//! Per-connection handlers.
//!
//! Each accepted connection gets its own Tokio task running
//! [`handle_connection`], which routes on the upgrade path:
//!   - `<base>/master` → publish loop: receive frames, submit to the room
//!   - `<base>/player` → replay, then forward live messages
//!   - anything else   → `{"error":"not found"}` and close

use std::sync::Arc;

use fogrelay_protocol::{Codec, ControlFrame, Message, ProtocolError};
use fogrelay_room::{PublishHandle, RoomError, SubscriptionQueue};
use fogrelay_transport::{CloseReason, Connection, WebSocketConnection};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::server::ServerState;
use crate::stats::ConnectionGuard;
use crate::RelayError;

const UNAUTHORIZED: &str = "unauthorized";
const NOT_FOUND: &str = "not found";
const BOTH_OR_NEITHER: &str =
    "id and auth must be either both missing or present";
const UNKNOWN_FORMAT: &str = "unknown data format";
const CANNOT_RELAY: &str = "cannot connect to clients";
const ROOM_CLOSED: &str = "room closed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    Master,
    Player,
}

/// Maps a request path to an endpoint under `base_path`.
fn route(path: &str, base_path: &str) -> Option<Endpoint> {
    match path.strip_prefix(base_path)? {
        "master" => Some(Endpoint::Master),
        "player" => Some(Endpoint::Player),
        _ => None,
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), RelayError> {
    match route(conn.target().path(), &state.base_path) {
        Some(Endpoint::Master) => handle_master(conn, &state).await,
        Some(Endpoint::Player) => handle_player(conn, &state).await,
        None => {
            tracing::debug!(
                conn_id = %conn.id(),
                path = conn.target().path(),
                "unknown endpoint"
            );
            refuse(&conn, &state.codec, NOT_FOUND).await
        }
    }
}

// ---------------------------------------------------------------------------
// Game master
// ---------------------------------------------------------------------------

async fn handle_master<C: Codec>(
    conn: WebSocketConnection,
    state: &ServerState<C>,
) -> Result<(), RelayError> {
    let _guard = ConnectionGuard::master(&state.stats);
    let conn_id = conn.id();

    let id = conn.target().param("id");
    let auth = conn.target().param("auth");
    if id.is_some() != auth.is_some() {
        return refuse(&conn, &state.codec, BOTH_OR_NEITHER).await;
    }

    let handle = match state.registry.publish(
        id.as_deref().unwrap_or_default(),
        auth.as_deref().unwrap_or_default(),
    ) {
        Ok(handle) => handle,
        Err(e) => {
            tracing::info!(
                %conn_id,
                room_id = ?id,
                error = %e,
                "master refused"
            );
            return refuse(&conn, &state.codec, UNAUTHORIZED).await;
        }
    };
    tracing::info!(%conn_id, room_id = %handle.room_id(), "master connected");

    let result = publish_loop(&conn, &state.codec, &handle).await;
    handle.close();
    result
}

async fn publish_loop<C: Codec>(
    conn: &WebSocketConnection,
    codec: &C,
    handle: &PublishHandle,
) -> Result<(), RelayError> {
    let room_id = handle.room_id();
    send_frame(
        conn,
        codec,
        &ControlFrame::Welcome {
            id: room_id.clone(),
            auth: handle.secret().to_owned(),
        },
    )
    .await?;

    // Submission only waits on the room; the connection going away shows
    // up as a failed recv on the next iteration.
    let never = CancellationToken::new();
    loop {
        let data = tokio::select! {
            biased;
            () = handle.closed() => {
                tracing::info!(%room_id, "publisher revoked, dropping master");
                let reason = CloseReason::GoingAway(ROOM_CLOSED.into());
                let _ = conn.close_with(reason).await;
                return Ok(());
            }
            received = conn.recv() => received,
        };

        let data = match data {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%room_id, "master disconnected");
                return Ok(());
            }
            Err(e) => {
                tracing::info!(%room_id, error = %e, "cannot read master");
                close_unsupported(conn).await;
                return Err(e.into());
            }
        };
        tracing::debug!(%room_id, bytes = data.len(), "master sent");

        let msg: Message = match codec.decode(&data) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::info!(%room_id, error = %e, "cannot decode master");
                close_unsupported(conn).await;
                return Err(e.into());
            }
        };

        if let Err(e) = handle.submit(msg, &never).await {
            tracing::info!(%room_id, error = %e, "cannot submit to room");
            let _ = conn
                .close_with(CloseReason::InternalError(CANNOT_RELAY.into()))
                .await;
            return Err(e.into());
        }
    }
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

async fn handle_player<C: Codec>(
    conn: WebSocketConnection,
    state: &ServerState<C>,
) -> Result<(), RelayError> {
    let _guard = ConnectionGuard::player(&state.stats);
    let conn_id = conn.id();

    let subscribed = match conn.target().param("id") {
        Some(id) => state.registry.subscribe(&id),
        None => Err(RoomError::NotFound(Default::default())),
    };
    let (mut queue, replay) = match subscribed {
        Ok(subscribed) => subscribed,
        Err(e) => {
            tracing::info!(%conn_id, error = %e, "player refused");
            return refuse(&conn, &state.codec, NOT_FOUND).await;
        }
    };
    tracing::info!(%conn_id, room_id = %queue.room_id(), "player connected");

    // Players never send anything useful; reading only detects the client
    // going away, which cancels the pending receive.
    let conn = Arc::new(conn);
    let gone = CancellationToken::new();
    let watcher =
        tokio::spawn(watch_disconnect(Arc::clone(&conn), gone.clone()));

    let result =
        forward_loop(&conn, &state.codec, &mut queue, replay, &gone).await;

    queue.close();
    watcher.abort();
    result
}

async fn watch_disconnect(
    conn: Arc<WebSocketConnection>,
    gone: CancellationToken,
) {
    loop {
        match conn.recv().await {
            Ok(Some(_)) => continue,
            Ok(None) | Err(_) => break,
        }
    }
    gone.cancel();
}

async fn forward_loop<C: Codec>(
    conn: &WebSocketConnection,
    codec: &C,
    queue: &mut SubscriptionQueue,
    replay: Vec<Arc<Message>>,
    gone: &CancellationToken,
) -> Result<(), RelayError> {
    let room_id = queue.room_id().clone();
    for msg in &replay {
        send_frame(conn, codec, msg.as_ref()).await?;
    }

    loop {
        match queue.receive(gone).await {
            Ok(msg) => send_frame(conn, codec, msg.as_ref()).await?,
            Err(RoomError::Canceled) => {
                tracing::info!(%room_id, "player disconnected");
                return Ok(());
            }
            Err(e) => {
                tracing::info!(%room_id, error = %e, "player queue closed");
                let _ = conn
                    .close_with(CloseReason::GoingAway(ROOM_CLOSED.into()))
                    .await;
                return Ok(());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Encodes `frame` and sends it as a text frame.
async fn send_frame<C: Codec, T: Serialize>(
    conn: &WebSocketConnection,
    codec: &C,
    frame: &T,
) -> Result<(), RelayError> {
    let bytes = codec.encode(frame)?;
    let text = String::from_utf8(bytes)
        .map_err(|e| ProtocolError::InvalidMessage(e.to_string()))?;
    conn.send(&text).await?;
    Ok(())
}

async fn close_unsupported(conn: &WebSocketConnection) {
    let reason = CloseReason::UnsupportedData(UNKNOWN_FORMAT.into());
    let _ = conn.close_with(reason).await;
}

/// Tells the client why it is being turned away, then closes.
async fn refuse<C: Codec>(
    conn: &WebSocketConnection,
    codec: &C,
    reason: &str,
) -> Result<(), RelayError> {
    send_frame(conn, codec, &ControlFrame::failure(reason)).await?;
    let _ = conn.close_with(CloseReason::GoingAway(reason.into())).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_known_endpoints() {
        assert_eq!(route("/api/master", "/api/"), Some(Endpoint::Master));
        assert_eq!(route("/api/player", "/api/"), Some(Endpoint::Player));
        assert_eq!(route("/master", "/"), Some(Endpoint::Master));
    }

    #[test]
    fn test_route_rejects_unknown_paths() {
        assert_eq!(route("/api/", "/api/"), None);
        assert_eq!(route("/api/master/x", "/api/"), None);
        assert_eq!(route("/other/master", "/api/"), None);
        assert_eq!(route("/api/Master", "/api/"), None);
    }
}
