//! Test fixtures: an in-process server and a small WebSocket client.

#![allow(dead_code)]

use std::{net::SocketAddr, time::Duration};

use futures_util::{SinkExt, StreamExt};
use kairo_server::{ServerConfig, ServerError};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::oneshot,
    task::JoinHandle,
};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, tungstenite::Message};

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long a client waits for a frame before failing the test
const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Server running on a free local port, stopped when dropped
pub struct TestServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<Result<(), ServerError>>>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(ServerConfig::default()).await
    }

    pub async fn start_with(config: ServerConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local address");
        let (shutdown, signal) = oneshot::channel::<()>();

        let handle = tokio::spawn(kairo_server::serve(listener, config, async move {
            let _ = signal.await;
        }));

        Self {
            addr,
            shutdown: Some(shutdown),
            handle: Some(handle),
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }

    /// Trigger graceful shutdown and wait for the server to return.
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.handle.take() {
            tokio::time::timeout(RECV_TIMEOUT, handle)
                .await
                .expect("Server did not stop in time")
                .expect("Server task panicked")
                .expect("Server returned an error");
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

pub async fn connect(url: &str) -> WsClient {
    let (ws, _) = tokio_tungstenite::connect_async(url)
        .await
        .expect("Failed to connect");
    ws
}

pub async fn send_json(ws: &mut WsClient, value: serde_json::Value) {
    ws.send(Message::text(value.to_string()))
        .await
        .expect("Failed to send");
}

pub async fn send_text(ws: &mut WsClient, text: &str) {
    ws.send(Message::text(text.to_string()))
        .await
        .expect("Failed to send");
}

/// Next text frame as a raw string
pub async fn recv_text(ws: &mut WsClient) -> String {
    loop {
        let msg = tokio::time::timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("Timed out waiting for a frame")
            .expect("Connection closed")
            .expect("WebSocket error");
        if let Message::Text(text) = msg {
            return text.as_str().to_string();
        }
    }
}

pub async fn recv_json(ws: &mut WsClient) -> serde_json::Value {
    let text = recv_text(ws).await;
    serde_json::from_str(&text).expect("Frame is not JSON")
}

/// Assert that no text frame arrives within `wait`
pub async fn expect_silence(ws: &mut WsClient, wait: Duration) {
    if let Ok(Some(Ok(Message::Text(text)))) = tokio::time::timeout(wait, ws.next()).await {
        panic!("Unexpected frame: {}", text.as_str());
    }
}

/// Wait until the server closes the connection
pub async fn expect_closed(ws: &mut WsClient) {
    loop {
        match tokio::time::timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("Timed out waiting for close")
        {
            None | Some(Err(_)) | Some(Ok(Message::Close(_))) => return,
            Some(Ok(_)) => continue,
        }
    }
}

pub fn join_room(room_id: &str, user_id: &str, name: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "join-room",
        "data": {"room_id": room_id, "user_id": user_id, "name": name}
    })
}

/// Poll the HTTP API until `GET /api/rooms/{room_id}` returns `status`
pub async fn wait_for_room_status(server: &TestServer, room_id: &str, status: u16) {
    let client = reqwest::Client::new();
    let url = format!("{}/api/rooms/{}", server.base_url(), room_id);
    for _ in 0..50 {
        let response = client.get(&url).send().await.expect("Failed to send request");
        if response.status() == status {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("Room '{}' never reached status {}", room_id, status);
}
