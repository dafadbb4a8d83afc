//! API Integration Tests
//!
//! These tests require:
//! - Running PostgreSQL instance
//! - Environment variables: DATABASE_URL, JWT_SECRET
//!
//! Run with: cargo test -p integration-tests --test api_tests

use integration_tests::{
    assert_json, assert_status, check_test_env, fixtures::*, TestServer,
};
use reqwest::StatusCode;
use serde_json::json;

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let response = server.get("/health").await.expect("Request failed");
    assert_status(response, StatusCode::OK).await.unwrap();
}

#[tokio::test]
async fn test_health_ready() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let response = server.get("/health/ready").await.expect("Request failed");
    let body: serde_json::Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(body["checks"]["database"], "healthy");
}

// ============================================================================
// Room Tests
// ============================================================================

#[tokio::test]
async fn test_create_and_get_room() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let owner = unique_user();

    let request = CreateRoomRequest::public();
    let response = server.post_auth("/api/v1/rooms", owner, &request).await.unwrap();
    let room: RoomResponse = assert_json(response, StatusCode::CREATED).await.unwrap();
    assert_eq!(room.name, request.name);
    assert_eq!(room.owner_id, owner.to_string());
    assert_eq!(room.member_count, 1);

    let response = server
        .get_auth(&format!("/api/v1/rooms/{}", room.id), unique_user())
        .await
        .unwrap();
    let fetched: RoomResponse = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(fetched.id, room.id);
    assert_eq!(fetched.visibility, "public");
}

#[tokio::test]
async fn test_private_room_hidden_from_strangers() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let owner = unique_user();

    let response = server
        .post_auth("/api/v1/rooms", owner, &CreateRoomRequest::private(Some("hunter22")))
        .await
        .unwrap();
    let room: RoomResponse = assert_json(response, StatusCode::CREATED).await.unwrap();
    assert!(room.has_password);

    let response = server
        .get_auth(&format!("/api/v1/rooms/{}", room.id), unique_user())
        .await
        .unwrap();
    assert_status(response, StatusCode::FORBIDDEN).await.unwrap();

    let stranger = unique_user();
    let response = server
        .post_auth(&format!("/api/v1/rooms/{}/join", room.id), stranger, &json!({"password": "hunter22"}))
        .await
        .unwrap();
    let member: MemberResponse = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(member.role, "member");
}

#[tokio::test]
async fn test_concurrent_joins_create_one_membership() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let owner = unique_user();
    let response = server
        .post_auth("/api/v1/rooms", owner, &CreateRoomRequest::public())
        .await
        .unwrap();
    let room: RoomResponse = assert_json(response, StatusCode::CREATED).await.unwrap();

    let joiner = unique_user();
    let path = format!("/api/v1/rooms/{}/join", room.id);
    let joins = (0..8).map(|_| server.post_empty(&path, joiner));
    for response in futures_util::future::join_all(joins).await {
        assert_status(response.unwrap(), StatusCode::OK).await.unwrap();
    }

    let response = server
        .get_auth(&format!("/api/v1/rooms/{}/members", room.id), owner)
        .await
        .unwrap();
    let members: Vec<MemberResponse> = assert_json(response, StatusCode::OK).await.unwrap();
    let joiner_rows = members.iter().filter(|m| m.user_id == joiner.to_string()).count();
    assert_eq!(joiner_rows, 1);
    assert_eq!(members.len(), 2);
}

#[tokio::test]
async fn test_messages_get_consecutive_sequence_numbers() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let owner = unique_user();
    let response = server
        .post_auth("/api/v1/rooms", owner, &CreateRoomRequest::public())
        .await
        .unwrap();
    let room: RoomResponse = assert_json(response, StatusCode::CREATED).await.unwrap();
    let path = format!("/api/v1/rooms/{}/messages", room.id);

    let mut last = None;
    for content in ["one", "two", "three"] {
        let response = server.post_auth(&path, owner, &json!({"content": content})).await.unwrap();
        let message: MessageResponse = assert_json(response, StatusCode::CREATED).await.unwrap();
        assert_eq!(message.content, content);
        if let Some(previous) = last {
            assert_eq!(message.seq, previous + 1);
        }
        last = Some(message.seq);
    }
}

// ============================================================================
// Moderation Tests
// ============================================================================

#[tokio::test]
async fn test_ban_removes_member_and_blocks_rejoin() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let owner = unique_user();
    let member = unique_user();

    let response = server
        .post_auth("/api/v1/rooms", owner, &CreateRoomRequest::public())
        .await
        .unwrap();
    let room: RoomResponse = assert_json(response, StatusCode::CREATED).await.unwrap();

    let join = format!("/api/v1/rooms/{}/join", room.id);
    assert_status(server.post_empty(&join, member).await.unwrap(), StatusCode::OK)
        .await
        .unwrap();

    let ban = format!("/api/v1/rooms/{}/bans/{member}", room.id);
    assert_status(server.put_empty(&ban, owner).await.unwrap(), StatusCode::NO_CONTENT)
        .await
        .unwrap();

    let response = server.post_empty(&join, member).await.unwrap();
    let error: ErrorResponse = assert_json(response, StatusCode::FORBIDDEN).await.unwrap();
    assert_eq!(error.error.code, "FORBIDDEN");
    assert!(!error.error.retryable);

    // The owner can never be banned
    let owner_ban = format!("/api/v1/rooms/{}/bans/{owner}", room.id);
    assert_status(server.put_empty(&owner_ban, owner).await.unwrap(), StatusCode::FORBIDDEN)
        .await
        .unwrap();
}

// ============================================================================
// Invitation Tests
// ============================================================================

#[tokio::test]
async fn test_invitation_accept_is_idempotent_in_effect() {
    if !check_test_env().await {
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

    let invite = format!("/api/v1/rooms/{}/invitations", room.id);
    let body = json!({"invitee_id": invitee.to_string()});
    let response = server.post_auth(&invite, owner, &body).await.unwrap();
    let first: InvitationResponse = assert_json(response, StatusCode::CREATED).await.unwrap();

    // Re-inviting while pending updates the same invitation
    let response = server.post_auth(&invite, owner, &body).await.unwrap();
    let second: InvitationResponse = assert_json(response, StatusCode::CREATED).await.unwrap();
    assert_eq!(first.id, second.id);

    let response = server.get_auth("/api/v1/users/@me/invitations", invitee).await.unwrap();
    let pending: Vec<InvitationResponse> = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(pending.len(), 1);

    let accept = format!("/api/v1/invitations/{}/accept", first.id);
    let response = server.post_empty(&accept, invitee).await.unwrap();
    let accepted: InvitationResponse = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(accepted.status, "accepted");

    assert_status(server.post_empty(&accept, invitee).await.unwrap(), StatusCode::CONFLICT)
        .await
        .unwrap();

    let response = server
        .get_auth(&format!("/api/v1/rooms/{}/members", room.id), invitee)
        .await
        .unwrap();
    let members: Vec<MemberResponse> = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(members.iter().filter(|m| m.user_id == invitee.to_string()).count(), 1);
}
