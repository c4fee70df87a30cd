//! HTTP API integration tests.
//!
//! Tests for REST API endpoints (health check, room list, room details).

mod fixtures;
use fixtures::{TestServer, connect, join_room, recv_json, send_json, wait_for_room_status};

#[tokio::test]
async fn test_health_endpoint() {
    // テスト項目: /api/health エンドポイントが正常に動作する
    // given (前提条件):
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    // when (操作):
    let response = client
        .get(format!("{}/api/health", server.base_url()))
        .send()
        .await
        .expect("Failed to send request");

    // then (期待する結果):
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["connections"], 0);
    assert_eq!(body["rooms"], 0);
}

#[tokio::test]
async fn test_rooms_list_is_empty_without_members() {
    // テスト項目: 誰も入室していなければルーム一覧は空
    // given (前提条件):
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    // when (操作):
    let response = client
        .get(format!("{}/api/rooms", server.base_url()))
        .send()
        .await
        .expect("Failed to send request");

    // then (期待する結果):
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body, serde_json::json!([]));
}

#[tokio::test]
async fn test_rooms_list_endpoint() {
    // テスト項目: /api/rooms エンドポイントが入室中のメンバーを含むルーム一覧を返す
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = connect(&server.ws_url("/ws")).await;
    let mut bob = connect(&server.ws_url("/ws")).await;
    send_json(&mut alice, join_room("r1", "u1", "Alice")).await;
    wait_for_room_status(&server, "r1", 200).await;
    send_json(&mut bob, join_room("r1", "u2", "Bob")).await;
    // bob の入室が完了したことを alice への通知で確認する
    recv_json(&mut alice).await;
    let client = reqwest::Client::new();

    // when (操作):
    let response = client
        .get(format!("{}/api/rooms", server.base_url()))
        .send()
        .await
        .expect("Failed to send request");

    // then (期待する結果):
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    let rooms = body.as_array().expect("Response should be an array");
    assert_eq!(rooms.len(), 1);

    // ルームの構造を確認
    let room = &rooms[0];
    assert_eq!(room["id"], "r1");
    assert_eq!(room["participants"], serde_json::json!(["u1", "u2"]));
    assert!(room["created_at"].is_string());
}

#[tokio::test]
async fn test_room_detail_endpoint_success() {
    // テスト項目: /api/rooms/{room_id} エンドポイントが正常にルーム詳細を返す
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = connect(&server.ws_url("/ws")).await;
    send_json(&mut alice, join_room("r1", "u1", "Alice")).await;
    wait_for_room_status(&server, "r1", 200).await;
    let client = reqwest::Client::new();

    // when (操作):
    let response = client
        .get(format!("{}/api/rooms/r1", server.base_url()))
        .send()
        .await
        .expect("Failed to send request");

    // then (期待する結果):
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["id"], "r1");
    assert!(body["created_at"].is_string());

    // participants の各要素が user_id, name, connected_at を持つ
    let participants = body["participants"].as_array().unwrap();
    assert_eq!(participants.len(), 1);
    assert_eq!(participants[0]["user_id"], "u1");
    assert_eq!(participants[0]["name"], "Alice");
    assert!(participants[0]["connected_at"].is_string());
}

#[tokio::test]
async fn test_room_detail_endpoint_not_found() {
    // テスト項目: /api/rooms/{room_id} エンドポイントが存在しないルームに対して404を返す
    // given (前提条件):
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    // when (操作):
    let response = client
        .get(format!("{}/api/rooms/nonexistent", server.base_url()))
        .send()
        .await
        .expect("Failed to send request");

    // then (期待する結果):
    assert_eq!(response.status(), 404);
}
