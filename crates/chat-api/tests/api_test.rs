//! REST tests against the in-memory store, driven through the router

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chat_api::{create_app, AppState};
use chat_common::{
    AppConfig, AppSettings, BusConfig, Claims, CorsConfig, DatabaseConfig, Environment, GatewaySettings, JwtConfig,
    RateLimitConfig, RetryConfig, ServerConfig, SnowflakeConfig, StorageBackend, TokenVerifier,
};
use chat_core::{Snowflake, SnowflakeGenerator};
use chat_db::MemoryDatabase;
use chat_gateway::ConnectionManager;
use chat_service::ServiceContextBuilder;
use serde_json::{json, Value};
use tower::ServiceExt;

const SECRET: &str = "api-test-secret";
const OWNER: Snowflake = Snowflake::new(100);
const ALICE: Snowflake = Snowflake::new(200);
const BOB: Snowflake = Snowflake::new(300);

fn test_config() -> AppConfig {
    AppConfig {
        app: AppSettings {
            name: "room-server-test".to_string(),
            env: Environment::Development,
        },
        api: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: DatabaseConfig {
            backend: StorageBackend::Memory,
            url: None,
            max_connections: 1,
            min_connections: 1,
        },
        redis: None,
        jwt: JwtConfig {
            secret: SECRET.to_string(),
        },
        rate_limit: RateLimitConfig {
            requests_per_second: 1000,
            burst: 1000,
        },
        cors: CorsConfig {
            allowed_origins: vec![],
        },
        snowflake: SnowflakeConfig { worker_id: 1 },
        bus: BusConfig::default(),
        retry: RetryConfig {
            max_attempts: 3,
            base_delay_ms: 1,
            max_delay_ms: 2,
        },
        gateway: GatewaySettings::default(),
    }
}

struct TestApi {
    app: Router,
    verifier: TokenVerifier,
}

impl TestApi {
    fn new() -> Self {
        let ctx = ServiceContextBuilder::new()
            .memory(&MemoryDatabase::new())
            .token_verifier(Arc::new(TokenVerifier::new(SECRET)))
            .snowflake_generator(Arc::new(SnowflakeGenerator::new(1)))
            .retry(test_config().retry)
            .build()
            .unwrap();

        let state = AppState::new(Arc::new(ctx), ConnectionManager::new_shared(), test_config());
        Self {
            app: create_app(state),
            verifier: TokenVerifier::new(SECRET),
        }
    }

    fn token(&self, user_id: Snowflake) -> String {
        self.verifier
            .sign(&Claims::new(user_id, chrono::Duration::hours(1)))
            .unwrap()
    }

    async fn call(&self, method: Method, uri: &str, user: Option<Snowflake>, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", self.token(user)));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn create_room(&self, body: Value) -> String {
        let (status, room) = self.call(Method::POST, "/api/v1/rooms", Some(OWNER), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "{room}");
        room["id"].as_str().unwrap().to_string()
    }

    /// Notifications are written by a background task
    async fn wait_for_notifications(&self, user: Snowflake) -> Vec<Value> {
        for _ in 0..50 {
            let (status, body) = self
                .call(Method::GET, "/api/v1/users/@me/notifications", Some(user), None)
                .await;
            assert_eq!(status, StatusCode::OK);
            let items = body.as_array().cloned().unwrap_or_default();
            if !items.is_empty() {
                return items;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("no notifications arrived for {user}");
    }
}

#[tokio::test]
async fn test_health_endpoints() {
    let api = TestApi::new();

    let (status, body) = api.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = api.call(Method::GET, "/health/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["checks"]["database"], "disabled");
    assert_eq!(body["checks"]["redis"], "disabled");
}

#[tokio::test]
async fn test_requests_without_token_are_rejected() {
    let api = TestApi::new();

    let (status, body) = api
        .call(Method::POST, "/api/v1/rooms", None, Some(json!({"name": "lobby"})))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "MISSING_AUTHORIZATION");

    let request = Request::builder()
        .uri("/api/v1/users/@me/invitations")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();
    let response = api.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_public_room_join_and_post() {
    let api = TestApi::new();
    let room_id = api.create_room(json!({"name": "lobby"})).await;

    let (status, member) = api
        .call(Method::POST, &format!("/api/v1/rooms/{room_id}/join"), Some(ALICE), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(member["role"], "member");

    let (status, first) = api
        .call(
            Method::POST,
            &format!("/api/v1/rooms/{room_id}/messages"),
            Some(ALICE),
            Some(json!({"content": "hello"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, second) = api
        .call(
            Method::POST,
            &format!("/api/v1/rooms/{room_id}/messages"),
            Some(OWNER),
            Some(json!({"content": "welcome"})),
        )
        .await;
    assert_eq!(second["seq"].as_u64().unwrap(), first["seq"].as_u64().unwrap() + 1);

    let (status, members) = api
        .call(Method::GET, &format!("/api/v1/rooms/{room_id}/members"), Some(BOB), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(members.as_array().unwrap().len(), 2);

    let (_, room) = api
        .call(Method::GET, &format!("/api/v1/rooms/{room_id}"), Some(ALICE), None)
        .await;
    assert_eq!(room["member_count"], 2);
}

#[tokio::test]
async fn test_non_member_cannot_post() {
    let api = TestApi::new();
    let room_id = api.create_room(json!({"name": "lobby"})).await;

    let (status, body) = api
        .call(
            Method::POST,
            &format!("/api/v1/rooms/{room_id}/messages"),
            Some(BOB),
            Some(json!({"content": "hi"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_private_room_password() {
    let api = TestApi::new();
    let room_id = api
        .create_room(json!({"name": "vault", "visibility": "private", "password": "open-sesame"}))
        .await;
    let join = format!("/api/v1/rooms/{room_id}/join");

    let (status, _) = api.call(Method::POST, &join, Some(ALICE), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = api
        .call(Method::POST, &join, Some(ALICE), Some(json!({"password": "wrong"})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, member) = api
        .call(Method::POST, &join, Some(ALICE), Some(json!({"password": "open-sesame"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(member["user_id"], ALICE.to_string());
}

#[tokio::test]
async fn test_join_password_without_content_headers() {
    let api = TestApi::new();
    let room_id = api
        .create_room(json!({"name": "vault", "visibility": "private", "password": "open-sesame"}))
        .await;

    // Neither content-length nor content-type, as with a chunked upload
    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/v1/rooms/{room_id}/join"))
        .header(header::AUTHORIZATION, format!("Bearer {}", api.token(ALICE)))
        .body(Body::from(json!({"password": "open-sesame"}).to_string()))
        .unwrap();
    assert!(request.headers().get(header::CONTENT_LENGTH).is_none());

    let response = api.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_invitation_flow() {
    let api = TestApi::new();
    let room_id = api
        .create_room(json!({"name": "inner circle", "visibility": "private"}))
        .await;

    // No password: invitation only
    let (status, _) = api
        .call(Method::POST, &format!("/api/v1/rooms/{room_id}/join"), Some(ALICE), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, invitation) = api
        .call(
            Method::POST,
            &format!("/api/v1/rooms/{room_id}/invitations"),
            Some(OWNER),
            Some(json!({"invitee_id": ALICE.to_string()})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(invitation["status"], "pending");
    let invitation_id = invitation["id"].as_str().unwrap().to_string();

    let (_, pending) = api
        .call(Method::GET, "/api/v1/users/@me/invitations", Some(ALICE), None)
        .await;
    assert_eq!(pending.as_array().unwrap().len(), 1);

    let (status, _) = api
        .call(Method::POST, &format!("/api/v1/invitations/{invitation_id}/accept"), Some(BOB), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, accepted) = api
        .call(Method::POST, &format!("/api/v1/invitations/{invitation_id}/accept"), Some(ALICE), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["status"], "accepted");

    let (status, _) = api
        .call(Method::POST, &format!("/api/v1/invitations/{invitation_id}/decline"), Some(ALICE), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, members) = api
        .call(Method::GET, &format!("/api/v1/rooms/{room_id}/members"), Some(ALICE), None)
        .await;
    assert!(members
        .as_array()
        .unwrap()
        .iter()
        .any(|m| m["user_id"] == ALICE.to_string()));

    let notifications = api.wait_for_notifications(ALICE).await;
    assert_eq!(notifications[0]["kind"], "INVITED");
    assert_eq!(notifications[0]["invitation_id"], invitation_id);
}

#[tokio::test]
async fn test_moderation_routes() {
    let api = TestApi::new();
    let room_id = api.create_room(json!({"name": "lobby"})).await;
    for user in [ALICE, BOB] {
        let (status, _) = api
            .call(Method::POST, &format!("/api/v1/rooms/{room_id}/join"), Some(user), None)
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, promoted) = api
        .call(Method::PUT, &format!("/api/v1/rooms/{room_id}/moderators/{ALICE}"), Some(OWNER), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(promoted["role"], "moderator");

    // Moderators ban members but never the owner
    let (status, _) = api
        .call(Method::PUT, &format!("/api/v1/rooms/{room_id}/bans/{OWNER}"), Some(ALICE), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = api
        .call(Method::PUT, &format!("/api/v1/rooms/{room_id}/bans/{BOB}"), Some(ALICE), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = api
        .call(Method::PUT, &format!("/api/v1/rooms/{room_id}/bans/{BOB}"), Some(ALICE), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, bans) = api
        .call(Method::GET, &format!("/api/v1/rooms/{room_id}/bans"), Some(OWNER), None)
        .await;
    assert_eq!(bans.as_array().unwrap().len(), 1);
    assert_eq!(bans[0]["user_id"], BOB.to_string());

    let (status, _) = api
        .call(Method::POST, &format!("/api/v1/rooms/{room_id}/join"), Some(BOB), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = api
        .call(Method::DELETE, &format!("/api/v1/rooms/{room_id}/bans/{BOB}"), Some(OWNER), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, demoted) = api
        .call(Method::DELETE, &format!("/api/v1/rooms/{room_id}/moderators/{ALICE}"), Some(OWNER), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(demoted["role"], "member");

    let (status, _) = api
        .call(Method::DELETE, &format!("/api/v1/rooms/{room_id}/members/{ALICE}"), Some(OWNER), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let notifications = api.wait_for_notifications(BOB).await;
    assert_eq!(notifications[0]["kind"], "BANNED");
}

#[tokio::test]
async fn test_owner_cannot_leave_but_member_can() {
    let api = TestApi::new();
    let room_id = api.create_room(json!({"name": "lobby"})).await;
    let leave = format!("/api/v1/rooms/{room_id}/members/@me");

    let (status, _) = api.call(Method::DELETE, &leave, Some(OWNER), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    api.call(Method::POST, &format!("/api/v1/rooms/{room_id}/join"), Some(ALICE), None)
        .await;
    let (status, _) = api.call(Method::DELETE, &leave, Some(ALICE), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_owner_only_settings() {
    let api = TestApi::new();
    let room_id = api.create_room(json!({"name": "lobby"})).await;
    api.call(Method::POST, &format!("/api/v1/rooms/{room_id}/join"), Some(ALICE), None)
        .await;

    let (status, _) = api
        .call(
            Method::PUT,
            &format!("/api/v1/rooms/{room_id}/announcement"),
            Some(ALICE),
            Some(json!({"announcement": "free pizza"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, room) = api
        .call(
            Method::PUT,
            &format!("/api/v1/rooms/{room_id}/announcement"),
            Some(OWNER),
            Some(json!({"announcement": "free pizza"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(room["announcement"], "free pizza");

    let (status, room) = api
        .call(
            Method::PATCH,
            &format!("/api/v1/rooms/{room_id}"),
            Some(OWNER),
            Some(json!({"name": "renamed"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(room["name"], "renamed");
}

#[tokio::test]
async fn test_bad_input_is_rejected() {
    let api = TestApi::new();

    let (status, body) = api
        .call(Method::POST, "/api/v1/rooms", Some(OWNER), Some(json!({"name": ""})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(body["error"]["details"].is_object());

    let (status, body) = api
        .call(Method::GET, "/api/v1/rooms/not-a-room", Some(OWNER), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_PATH_PARAMETER");

    let (status, body) = api
        .call(Method::GET, "/api/v1/rooms/999", Some(OWNER), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].get("retryable").is_none());

    let (status, _) = api
        .call(
            Method::POST,
            "/api/v1/users/@me/notifications/read",
            Some(OWNER),
            Some(json!({"ids": []})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_mark_notifications_read() {
    let api = TestApi::new();
    let room_id = api.create_room(json!({"name": "lobby"})).await;
    api.call(Method::POST, &format!("/api/v1/rooms/{room_id}/join"), Some(ALICE), None)
        .await;
    api.call(Method::DELETE, &format!("/api/v1/rooms/{room_id}/members/{ALICE}"), Some(OWNER), None)
        .await;

    let notifications = api.wait_for_notifications(ALICE).await;
    assert_eq!(notifications[0]["kind"], "KICKED");
    assert_eq!(notifications[0]["read"], false);
    let id = notifications[0]["id"].clone();

    let (status, body) = api
        .call(
            Method::POST,
            "/api/v1/users/@me/notifications/read",
            Some(ALICE),
            Some(json!({"ids": [id]})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 1);

    let (_, unread) = api
        .call(Method::GET, "/api/v1/users/@me/notifications?unread_only=true", Some(ALICE), None)
        .await;
    assert!(unread.as_array().unwrap().is_empty());
}
