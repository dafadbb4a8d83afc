//! Gateway Integration Tests
//!
//! These tests require:
//! - Running PostgreSQL instance (and Redis for notification push)
//! - Environment variables: DATABASE_URL, JWT_SECRET, REDIS_URL
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use integration_tests::{
    assert_json, assert_status, check_redis_env, check_test_env, fixtures::*, next_dispatch, send_json,
    TestServer,
};
use reqwest::StatusCode;
use serde_json::json;

async fn public_room(server: &TestServer, owner: chat_core::Snowflake) -> RoomResponse {
    let response = server
        .post_auth("/api/v1/rooms", owner, &CreateRoomRequest::public())
        .await
        .unwrap();
    assert_json(response, StatusCode::CREATED).await.unwrap()
}

#[tokio::test]
async fn test_subscriber_sees_rest_actions_in_order() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let owner = unique_user();
    let room = public_room(&server, owner).await;

    let mut socket = server.gateway(owner).await.unwrap();
    send_json(&mut socket, &json!({"op": 3, "d": {"room_id": room.id}}))
        .await
        .unwrap();
    let subscribed = next_dispatch(&mut socket, "SUBSCRIBED").await.unwrap();
    let base = subscribed["d"]["seq"].as_u64().unwrap();

    let member = unique_user();
    assert_status(
        server
            .post_empty(&format!("/api/v1/rooms/{}/join", room.id), member)
            .await
            .unwrap(),
        StatusCode::OK,
    )
    .await
    .unwrap();
    server
        .post_auth(&format!("/api/v1/rooms/{}/messages", room.id), member, &json!({"content": "hi"}))
        .await
        .unwrap();

    let joined = next_dispatch(&mut socket, "ROOM_EVENT").await.unwrap();
    assert_eq!(joined["d"]["type"], "MEMBER_JOINED");
    assert_eq!(joined["d"]["seq"].as_u64().unwrap(), base + 1);

    let posted = next_dispatch(&mut socket, "ROOM_EVENT").await.unwrap();
    assert_eq!(posted["d"]["type"], "MESSAGE_POSTED");
    assert_eq!(posted["d"]["seq"].as_u64().unwrap(), base + 2);
}

#[tokio::test]
async fn test_banned_subscriber_is_removed() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let owner = unique_user();
    let member = unique_user();
    let room = public_room(&server, owner).await;
    server
        .post_empty(&format!("/api/v1/rooms/{}/join", room.id), member)
        .await
        .unwrap();

    let mut socket = server.gateway(member).await.unwrap();
    send_json(&mut socket, &json!({"op": 3, "d": {"room_id": room.id}}))
        .await
        .unwrap();
    next_dispatch(&mut socket, "SUBSCRIBED").await.unwrap();

    assert_status(
        server
            .put_empty(&format!("/api/v1/rooms/{}/bans/{member}", room.id), owner)
            .await
            .unwrap(),
        StatusCode::NO_CONTENT,
    )
    .await
    .unwrap();

    let removed = next_dispatch(&mut socket, "REMOVED").await.unwrap();
    assert_eq!(removed["d"]["room_id"], room.id);
    assert_eq!(removed["d"]["reason"], "banned");
}

#[tokio::test]
async fn test_notification_is_pushed_to_invitee() {
    if !check_redis_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let owner = unique_user();
    let invitee = unique_user();

    let response = server
        .post_auth("/api/v1/rooms", owner, &CreateRoomRequest::private(None))
        .await
        .unwrap();
    let room: RoomResponse = assert_json(response, StatusCode::CREATED).await.unwrap();

    let mut socket = server.gateway(invitee).await.unwrap();
    // Give the relay time to finish its pattern subscription
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;

    server
        .post_auth(
            &format!("/api/v1/rooms/{}/invitations", room.id),
            owner,
            &json!({"invitee_id": invitee.to_string()}),
        )
        .await
        .unwrap();

    let notification = next_dispatch(&mut socket, "NOTIFICATION").await.unwrap();
    assert_eq!(notification["d"]["kind"], "INVITED");
    assert_eq!(notification["d"]["room_id"], room.id);
}
