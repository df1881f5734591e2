use std::{net::SocketAddr, sync::Arc, time::Duration};

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Map, Value};
use sleeper_mcp::{
    build_app,
    errors::AppError,
    sleeper_client::{LeagueProvider, LeagueResponse},
    AppState,
};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, Message},
    MaybeTlsStream, WebSocketStream,
};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct StaticProvider;

#[async_trait]
impl LeagueProvider for StaticProvider {
    async fn fetch_league(&self, _league_id: &str) -> Result<Option<LeagueResponse>, AppError> {
        Ok(Some(LeagueResponse {
            name: Some(json!("Integration League")),
            season: Some(json!(2025)),
            total_rosters: Some(json!(10)),
        }))
    }

    async fn fetch_matchups(&self, _league_id: &str, _week: &str) -> Result<Value, AppError> {
        Ok(json!([]))
    }

    async fn fetch_players(&self) -> Result<Map<String, Value>, AppError> {
        Ok(Map::new())
    }
}

async fn spawn_server() -> (SocketAddr, AppState) {
    let state = AppState::new(
        "42".to_string(),
        Arc::new(StaticProvider),
        Duration::from_secs(25),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");

    let app = build_app(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service())
            .await
            .expect("server runs");
    });

    (addr, state)
}

async fn connect(addr: SocketAddr) -> Socket {
    let mut request = format!("ws://{addr}/mcp")
        .into_client_request()
        .expect("client request");
    request.headers_mut().insert(
        "sec-websocket-protocol",
        "mcp".parse().expect("header value"),
    );

    let (socket, response) = connect_async(request).await.expect("websocket handshake");
    assert_eq!(response.headers()["sec-websocket-protocol"], "mcp");
    socket
}

async fn next_json(socket: &mut Socket) -> Value {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(2), socket.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("socket still open")
            .expect("valid frame");

        if let Message::Text(text) = message {
            return serde_json::from_str(text.as_str()).expect("json frame");
        }
    }
}

async fn send_json(socket: &mut Socket, value: Value) {
    socket
        .send(Message::text(value.to_string()))
        .await
        .expect("send frame");
}

#[tokio::test]
async fn session_announces_ready_and_answers_requests() {
    let (addr, _state) = spawn_server().await;
    let mut socket = connect(addr).await;

    let ready = next_json(&mut socket).await;
    assert_eq!(ready["method"], "notifications/ready");
    assert!(ready.get("id").is_none());

    send_json(
        &mut socket,
        json!({ "jsonrpc": "2.0", "id": 1, "method": "tools/list" }),
    )
    .await;
    let listed = next_json(&mut socket).await;
    assert_eq!(listed["id"], 1);
    assert_eq!(listed["result"]["tools"][2]["name"], "player_search");

    send_json(
        &mut socket,
        json!({
            "jsonrpc": "2.0",
            "id": "info",
            "method": "tools/call",
            "params": { "name": "league_info", "arguments": {} }
        }),
    )
    .await;
    let info = next_json(&mut socket).await;
    assert_eq!(info["id"], "info");
    assert_eq!(info["result"]["structuredContent"]["leagueId"], "42");
    assert_eq!(info["result"]["structuredContent"]["name"], "Integration League");
    assert_eq!(info["result"]["structuredContent"]["season"], 2025);
}

#[tokio::test]
async fn malformed_frames_are_ignored_and_session_stays_open() {
    let (addr, _state) = spawn_server().await;
    let mut socket = connect(addr).await;
    let _ready = next_json(&mut socket).await;

    socket
        .send(Message::text("this is not json"))
        .await
        .expect("send garbage");
    send_json(&mut socket, json!({ "jsonrpc": "2.0", "method": "ping" })).await;
    send_json(&mut socket, json!({ "jsonrpc": "2.0", "id": 7, "method": "ping" })).await;

    let pong = next_json(&mut socket).await;
    assert_eq!(pong["id"], 7);
    assert_eq!(pong["result"]["pong"], "ok");

    send_json(
        &mut socket,
        json!({ "jsonrpc": "2.0", "id": 8, "method": "resources/list" }),
    )
    .await;
    let missing = next_json(&mut socket).await;
    assert_eq!(missing["id"], 8);
    assert_eq!(missing["error"]["code"], -32601);
}

#[tokio::test]
async fn closing_socket_removes_session() {
    let (addr, state) = spawn_server().await;
    let mut socket = connect(addr).await;
    let _ready = next_json(&mut socket).await;
    assert_eq!(state.sessions.len(), 1);

    socket.close(None).await.expect("close handshake");

    tokio::time::timeout(Duration::from_secs(2), async {
        while !state.sessions.is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("session removed after close");
}
