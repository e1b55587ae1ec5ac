//! Integration tests for the relay server: routing, the game master and
//! player flows, refusals, and counters, all over real WebSockets.

use std::time::Duration;

use fogrelay::prelude::*;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message as WsMessage;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

struct TestServer {
    addr: String,
    registry: Registry,
    stats: StatsReporter,
}

/// Starts a server on a random port.
async fn start_server() -> TestServer {
    start_with(RelayServer::builder()).await
}

async fn start_with(builder: RelayServerBuilder) -> TestServer {
    let server = builder
        .bind("127.0.0.1:0")
        .build()
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();
    let registry = server.registry().clone();
    let stats = server.stats();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    TestServer {
        addr,
        registry,
        stats,
    }
}

async fn connect(addr: &str, path: &str) -> ClientWs {
    let url = format!("ws://{addr}{path}");
    let (ws, _) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("should connect");
    ws
}

async fn connect_player(addr: &str, room_id: &str) -> ClientWs {
    connect(addr, &format!("/api/player?id={room_id}")).await
}

/// Reads the next frame and parses it as JSON.
async fn recv_json(ws: &mut ClientWs) -> Value {
    let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("frame within timeout")
        .expect("stream open")
        .expect("valid frame");
    match frame {
        WsMessage::Text(text) => {
            serde_json::from_str(text.as_str()).expect("json frame")
        }
        other => panic!("expected text frame, got {other:?}"),
    }
}

/// Reads until a close frame and returns its code and reason.
async fn recv_close(ws: &mut ClientWs) -> (CloseCode, String) {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("close within timeout");
        match frame {
            Some(Ok(WsMessage::Close(Some(frame)))) => {
                return (frame.code, frame.reason.as_str().to_owned());
            }
            Some(Ok(WsMessage::Text(text))) => {
                panic!("unexpected text frame before close: {text}")
            }
            Some(Ok(_)) => continue,
            other => panic!("expected close frame, got {other:?}"),
        }
    }
}

async fn send_json(ws: &mut ClientWs, value: Value) {
    ws.send(WsMessage::Text(value.to_string().into()))
        .await
        .expect("send");
}

/// Connects a game master without credentials; returns the socket and
/// the issued id and secret.
async fn new_master(addr: &str) -> (ClientWs, String, String) {
    let mut ws = connect(addr, "/api/master").await;
    let welcome = recv_json(&mut ws).await;
    let id = welcome["id"].as_str().expect("id").to_owned();
    let auth = welcome["auth"].as_str().expect("auth").to_owned();
    (ws, id, auth)
}

/// Polls `check` until it holds or a second passes.
async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..100 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 1s");
}

// =========================================================================
// Game master
// =========================================================================

#[tokio::test]
async fn test_master_without_credentials_gets_new_room() {
    let server = start_server().await;
    let (_ws, id, auth) = new_master(&server.addr).await;

    assert!(!id.is_empty());
    assert!(!auth.is_empty());
    assert!(server.registry.contains(&id));
}

#[tokio::test]
async fn test_master_with_only_id_is_refused() {
    let server = start_server().await;
    let mut ws = connect(&server.addr, "/api/master?id=abc").await;

    let frame = recv_json(&mut ws).await;
    assert_eq!(
        frame,
        json!({"error": "id and auth must be either both missing or present"})
    );
    let (code, _) = recv_close(&mut ws).await;
    assert_eq!(code, CloseCode::Away);
    assert!(!server.registry.contains("abc"));
}

#[tokio::test]
async fn test_master_with_wrong_secret_is_unauthorized() {
    let server = start_server().await;
    let (_owner, id, _auth) = new_master(&server.addr).await;

    let path = format!("/api/master?id={id}&auth=wrong");
    let mut intruder = connect(&server.addr, &path).await;

    assert_eq!(
        recv_json(&mut intruder).await,
        json!({"error": "unauthorized"})
    );
    let (code, reason) = recv_close(&mut intruder).await;
    assert_eq!(code, CloseCode::Away);
    assert_eq!(reason, "unauthorized");
    assert!(server.registry.room_info(&id).unwrap().has_publisher);
}

#[tokio::test]
async fn test_master_reconnect_takes_over_room() {
    let server = start_server().await;
    let (mut old, id, auth) = new_master(&server.addr).await;

    let path = format!("/api/master?id={id}&auth={auth}");
    let mut new = connect(&server.addr, &path).await;
    assert_eq!(recv_json(&mut new).await, json!({"id": id, "auth": auth}));

    let (code, _) = recv_close(&mut old).await;
    assert_eq!(code, CloseCode::Away);
}

#[tokio::test]
async fn test_master_reclaims_unknown_room_id() {
    let server = start_server().await;
    let mut ws =
        connect(&server.addr, "/api/master?id=k7m2p&auth=saved").await;

    assert_eq!(
        recv_json(&mut ws).await,
        json!({"id": "k7m2p", "auth": "saved"})
    );
}

#[tokio::test]
async fn test_master_garbage_closes_with_unsupported_data() {
    let server = start_server().await;
    let (mut ws, _, _) = new_master(&server.addr).await;

    ws.send(WsMessage::Text("not json".into())).await.unwrap();

    let (code, reason) = recv_close(&mut ws).await;
    assert_eq!(code, CloseCode::Unsupported);
    assert_eq!(reason, "unknown data format");
}

#[tokio::test]
async fn test_master_message_without_content_is_relayed() {
    let server = start_server().await;
    let (mut master, id, _) = new_master(&server.addr).await;
    let mut player = connect_player(&server.addr, &id).await;
    eventually(|| {
        server.registry.room_info(&id).unwrap().subscriber_count == 1
    })
    .await;

    send_json(&mut master, json!({"data": {"x": 1}})).await;

    assert_eq!(
        recv_json(&mut player).await,
        json!({"content": "", "data": {"x": 1}})
    );
    assert_eq!(server.registry.room_info(&id).unwrap().subscriber_count, 1);
}

#[tokio::test]
async fn test_room_expiry_closes_master() {
    let server = start_with(RelayServer::builder().registry_config(
        RegistryConfig {
            expiration: Duration::from_millis(200),
            ..RegistryConfig::default()
        },
    ))
    .await;
    let (mut master, id, _) = new_master(&server.addr).await;

    let (code, reason) = recv_close(&mut master).await;
    assert_eq!(code, CloseCode::Away);
    assert_eq!(reason, "room closed");
    eventually(|| !server.registry.contains(&id)).await;
    eventually(|| server.stats.snapshot().connected_masters == 0).await;
}

// =========================================================================
// Player
// =========================================================================

#[tokio::test]
async fn test_player_gets_replay_then_live_messages() {
    let server = start_server().await;
    let (mut master, id, _) = new_master(&server.addr).await;

    send_json(&mut master, json!({"content": "move", "data": {"x": 1}}))
        .await;
    send_json(&mut master, json!({"content": "hp", "data": 10})).await;
    send_json(&mut master, json!({"content": "move", "data": {"x": 2}}))
        .await;
    eventually(|| server.registry.metrics().dispatched_messages.get() == 3)
        .await;

    let mut player = connect_player(&server.addr, &id).await;
    let mut replay =
        vec![recv_json(&mut player).await, recv_json(&mut player).await];
    replay.sort_by_key(|v| v["content"].to_string());
    assert_eq!(
        replay,
        vec![
            json!({"content": "hp", "data": 10}),
            json!({"content": "move", "data": {"x": 2}}),
        ]
    );

    send_json(&mut master, json!({"content": "move", "data": {"x": 3}}))
        .await;
    assert_eq!(
        recv_json(&mut player).await,
        json!({"content": "move", "data": {"x": 3}})
    );
}

#[tokio::test]
async fn test_every_player_sees_messages_in_order() {
    let server = start_server().await;
    let (mut master, id, _) = new_master(&server.addr).await;
    let path = format!("/api/player?id={id}");
    let mut a = connect(&server.addr, &path).await;
    let mut b = connect(&server.addr, &path).await;
    eventually(|| {
        server.registry.room_info(&id).unwrap().subscriber_count == 2
    })
    .await;

    for n in 0..3 {
        send_json(&mut master, json!({"content": "seq", "data": n})).await;
    }

    for player in [&mut a, &mut b] {
        for n in 0..3 {
            assert_eq!(
                recv_json(player).await,
                json!({"content": "seq", "data": n})
            );
        }
    }
}

#[tokio::test]
async fn test_player_unknown_room_not_found() {
    let server = start_server().await;
    let mut ws = connect(&server.addr, "/api/player?id=nope").await;

    assert_eq!(recv_json(&mut ws).await, json!({"error": "not found"}));
    let (code, _) = recv_close(&mut ws).await;
    assert_eq!(code, CloseCode::Away);
}

#[tokio::test]
async fn test_player_without_id_not_found() {
    let server = start_server().await;
    let mut ws = connect(&server.addr, "/api/player").await;
    assert_eq!(recv_json(&mut ws).await, json!({"error": "not found"}));
}

#[tokio::test]
async fn test_player_disconnect_releases_queue() {
    let server = start_server().await;
    let (_master, id, _) = new_master(&server.addr).await;

    let mut player = connect_player(&server.addr, &id).await;
    eventually(|| server.stats.snapshot().connected_players == 1).await;

    player.close(None).await.unwrap();

    eventually(|| server.stats.snapshot().connected_players == 0).await;
    assert_eq!(server.stats.snapshot().total_players, 1);
    assert_eq!(server.registry.metrics().closed_queues.get(), 1);
}

#[tokio::test]
async fn test_room_expiry_disconnects_players() {
    let server = start_with(RelayServer::builder().registry_config(
        RegistryConfig {
            expiration: Duration::from_millis(200),
            ..RegistryConfig::default()
        },
    ))
    .await;
    let (_master, id, _) = new_master(&server.addr).await;
    let mut player = connect_player(&server.addr, &id).await;

    let (code, reason) = recv_close(&mut player).await;
    assert_eq!(code, CloseCode::Away);
    assert_eq!(reason, "room closed");
    eventually(|| !server.registry.contains(&id)).await;
}

// =========================================================================
// Routing and counters
// =========================================================================

#[tokio::test]
async fn test_unknown_path_not_found() {
    let server = start_server().await;
    let mut ws = connect(&server.addr, "/api/spectator").await;
    assert_eq!(recv_json(&mut ws).await, json!({"error": "not found"}));
}

#[tokio::test]
async fn test_idle_socket_does_not_block_other_clients() {
    let server = start_server().await;

    // Opens TCP but never sends an upgrade request.
    let _idle = tokio::net::TcpStream::connect(&server.addr)
        .await
        .expect("tcp connect");

    let (_master, id, _) = tokio::time::timeout(
        Duration::from_secs(2),
        new_master(&server.addr),
    )
    .await
    .expect("master should be served while another socket idles");
    assert!(server.registry.contains(&id));
}

#[tokio::test]
async fn test_custom_base_path() {
    let server = start_with(RelayServer::builder().base_path("relay")).await;

    let mut ws = connect(&server.addr, "/relay/master").await;
    assert!(recv_json(&mut ws).await.get("id").is_some());

    let mut old = connect(&server.addr, "/api/master").await;
    assert_eq!(recv_json(&mut old).await, json!({"error": "not found"}));
}

#[tokio::test]
async fn test_stats_count_connections() {
    let server = start_server().await;
    let (_master, id, _) = new_master(&server.addr).await;
    let _player = connect_player(&server.addr, &id).await;

    eventually(|| server.stats.snapshot().connected_players == 1).await;
    let snapshot = server.stats.snapshot();
    assert_eq!(snapshot.connected_masters, 1);
    assert_eq!(snapshot.total_masters, 1);
    assert_eq!(snapshot.generated_ids, 1);
    assert_eq!(snapshot.stored_rooms, 1);

    let summary = server.stats.summary();
    assert!(summary.contains(&"/api/connected_masters: 1".to_string()));
    assert!(summary.contains(&"/room/stored_rooms: 1".to_string()));
}

#[tokio::test]
async fn test_build_rejects_invalid_registry_config() {
    let result = RelayServer::builder()
        .bind("127.0.0.1:0")
        .registry_config(RegistryConfig {
            queue_capacity: 0,
            ..RegistryConfig::default()
        })
        .build()
        .await;
    assert!(matches!(
        result,
        Err(RelayError::Room(RoomError::InvalidConfig(_)))
    ));
}
