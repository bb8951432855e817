mod support;

use futures::StreamExt;
use serde_json::{Value, json};
use std::time::Duration;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Viewer = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

async fn next_json(viewer: &mut Viewer) -> Value {
    let msg = tokio::time::timeout(Duration::from_secs(5), viewer.next())
        .await
        .expect("timed out waiting for a viewer message")
        .expect("viewer stream ended")
        .expect("viewer stream error");
    serde_json::from_str(msg.to_text().expect("expected text frame")).expect("expected json")
}

// Skips traffic caused by other tests sharing the server.
async fn next_event_where(viewer: &mut Viewer, matches: impl Fn(&Value) -> bool) -> Value {
    loop {
        let msg = next_json(viewer).await;
        if msg["type"] == "event" && matches(&msg["data"]) {
            return msg["data"].clone();
        }
    }
}

async fn connect_viewer() -> Viewer {
    let (viewer, _response) = connect_async(support::ws_url())
        .await
        .expect("websocket connect should succeed");
    viewer
}

#[tokio::test]
async fn test_viewer_receives_ack_then_state() {
    let mut viewer = connect_viewer().await;

    let ack = next_json(&mut viewer).await;
    assert_eq!(ack["type"], "connected");
    assert!(ack["data"]["timestamp"].is_u64());

    let state = next_event_where(&mut viewer, |data| data["type"] == "state").await;
    assert_eq!(state["data"]["player"]["name"], "主播");
    assert_eq!(state["data"]["enemy"]["name"], "BOSS");
}

#[tokio::test]
async fn test_danmaku_is_broadcast_with_activation() {
    let base_url = support::ensure_server();
    let mut viewer = connect_viewer().await;
    assert_eq!(next_json(&mut viewer).await["type"], "connected");

    let res = reqwest::Client::new()
        .post(format!("{base_url}/webhook/events"))
        .json(&json!({
            "event_type": "danmaku",
            "data": {"user_id": "e2e-heal", "user_name": "治疗观众", "content": "我来治疗一下"},
            "sign": "unchecked"
        }))
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(res.status(), reqwest::StatusCode::OK);

    let danmaku = next_event_where(&mut viewer, |data| {
        data["type"] == "danmaku" && data["data"]["user_id"] == "e2e-heal"
    })
    .await;
    assert_eq!(danmaku["data"]["skill_type"], "heal");
    assert_eq!(danmaku["data"]["content"], "我来治疗一下");

    let activation = next_event_where(&mut viewer, |data| {
        data["type"] == "activation" && data["data"]["actor_name"] == "治疗观众"
    })
    .await;
    assert_eq!(activation["data"]["ability"], "heal");
    assert_eq!(activation["data"]["effect"]["kind"], "heal");
    assert_eq!(activation["data"]["effect"]["amount"], 200);
    assert_eq!(activation["data"]["multiplier"], 1.0);
}

#[tokio::test]
async fn test_display_only_event_is_broadcast_without_activation() {
    let base_url = support::ensure_server();
    let mut viewer = connect_viewer().await;

    let res = reqwest::Client::new()
        .post(format!("{base_url}/webhook/events"))
        .json(&json!({
            "event_type": "enter_room",
            "data": {"user_id": "e2e-enter", "user_name": "路人"}
        }))
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(res.status(), reqwest::StatusCode::OK);

    let entered = next_event_where(&mut viewer, |data| {
        data["type"] == "enter_room" && data["data"]["user_id"] == "e2e-enter"
    })
    .await;
    assert_eq!(entered["data"]["user_name"], "路人");
    assert!(entered["data"].get("skill_type").is_none());
}

#[tokio::test]
async fn test_malformed_event_is_rejected() {
    let base_url = support::ensure_server();

    let res = reqwest::Client::new()
        .post(format!("{base_url}/webhook/events"))
        .json(&json!({"event_type": "danmaku", "data": {"user_id": "e2e-bad"}}))
        .send()
        .await
        .expect("request should succeed");

    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.expect("expected json body");
    assert!(body["error"].as_str().is_some_and(|e| e.contains("content")));
}

#[tokio::test]
async fn test_webhook_status_counts_connected_viewers() {
    let base_url = support::ensure_server();
    let mut viewer = connect_viewer().await;
    // The ack proves registration has happened.
    assert_eq!(next_json(&mut viewer).await["type"], "connected");

    let body: Value = reqwest::get(format!("{base_url}/webhook/events"))
        .await
        .expect("request should succeed")
        .json()
        .await
        .expect("expected json body");

    assert_eq!(body["status"], "ok");
    assert!(body["connected_clients"].as_u64().is_some_and(|n| n >= 1));
}
