//! Test helpers for integration tests
//!
//! Provides utilities for spawning test servers, making HTTP requests,
//! and driving the gateway over a real WebSocket.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use chat_api::server::start_notification_relay;
use chat_api::{create_app, create_app_state};
use chat_common::{AppConfig, Claims, TokenVerifier};
use chat_core::Snowflake;
use futures_util::{SinkExt, StreamExt};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub type GatewaySocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Test server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    verifier: TokenVerifier,
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a new test server
    pub async fn start() -> Result<Self> {
        let config = test_config()?;
        Self::start_with_config(config).await
    }

    /// Start a test server with custom config
    pub async fn start_with_config(config: AppConfig) -> Result<Self> {
        let verifier = TokenVerifier::new(&config.jwt.secret);

        let state = create_app_state(config).await?;
        let relay = start_notification_relay(&state);
        let app = create_app(state);

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            // Keep the relay alive for the life of the server
            let _relay = relay;
            axum::serve(listener, app).await.ok();
        });

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            addr,
            client,
            verifier,
            _handle: handle,
        })
    }

    /// Get base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Bearer token for `user_id`, signed like the auth service signs them
    pub fn token(&self, user_id: Snowflake) -> String {
        self.verifier
            .sign(&Claims::new(user_id, chrono::Duration::hours(1)))
            .unwrap_or_default()
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).send().await?)
    }

    /// Make a GET request as `user`
    pub async fn get_auth(&self, path: &str, user: Snowflake) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).bearer_auth(self.token(user)).send().await?)
    }

    /// Make a POST request as `user` with a JSON body
    pub async fn post_auth<T: Serialize>(&self, path: &str, user: Snowflake, body: &T) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self
            .client
            .post(&url)
            .bearer_auth(self.token(user))
            .json(body)
            .send()
            .await?)
    }

    /// Make a POST request as `user` without a body
    pub async fn post_empty(&self, path: &str, user: Snowflake) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.post(&url).bearer_auth(self.token(user)).send().await?)
    }

    /// Make a PUT request as `user` without a body
    pub async fn put_empty(&self, path: &str, user: Snowflake) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.put(&url).bearer_auth(self.token(user)).send().await?)
    }

    /// Make a PUT request as `user` with a JSON body
    pub async fn put_auth<T: Serialize>(&self, path: &str, user: Snowflake, body: &T) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self
            .client
            .put(&url)
            .bearer_auth(self.token(user))
            .json(body)
            .send()
            .await?)
    }

    /// Make a PATCH request as `user`
    pub async fn patch_auth<T: Serialize>(&self, path: &str, user: Snowflake, body: &T) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self
            .client
            .patch(&url)
            .bearer_auth(self.token(user))
            .json(body)
            .send()
            .await?)
    }

    /// Make a DELETE request as `user`
    pub async fn delete_auth(&self, path: &str, user: Snowflake) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.delete(&url).bearer_auth(self.token(user)).send().await?)
    }

    /// Open a gateway session and identify as `user`; returns after READY
    pub async fn gateway(&self, user: Snowflake) -> Result<GatewaySocket> {
        let (mut socket, _) = connect_async(format!("ws://{}/gateway", self.addr)).await?;

        let hello = next_json(&mut socket).await?;
        anyhow::ensure!(hello["op"] == 10, "expected HELLO, got {hello}");

        send_json(&mut socket, &json!({"op": 2, "d": {"token": self.token(user)}})).await?;
        let ready = next_json(&mut socket).await?;
        anyhow::ensure!(ready["t"] == "READY", "expected READY, got {ready}");

        Ok(socket)
    }
}

/// Send one gateway frame
pub async fn send_json(socket: &mut GatewaySocket, value: &Value) -> Result<()> {
    socket.send(Message::Text(value.to_string())).await?;
    Ok(())
}

/// Next text frame as JSON, failing after five seconds
pub async fn next_json(socket: &mut GatewaySocket) -> Result<Value> {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .context("timed out waiting for a gateway frame")?
            .context("gateway closed")??;
        match frame {
            Message::Text(text) => return Ok(serde_json::from_str(&text)?),
            Message::Close(close) => anyhow::bail!("gateway closed: {close:?}"),
            _ => {}
        }
    }
}

/// Skip dispatches until one named `event` arrives
pub async fn next_dispatch(socket: &mut GatewaySocket, event: &str) -> Result<Value> {
    loop {
        let frame = next_json(socket).await?;
        if frame["t"] == event {
            return Ok(frame);
        }
    }
}

/// Create a test configuration
pub fn test_config() -> Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    Ok(config)
}

/// Helper to check if test environment is available
pub async fn check_test_env() -> bool {
    dotenvy::dotenv().ok();

    for var in ["DATABASE_URL", "JWT_SECRET"] {
        if std::env::var(var).is_err() {
            eprintln!("Skipping test: {var} not set");
            return false;
        }
    }

    true
}

/// Like [`check_test_env`], and also requires Redis for notification push
pub async fn check_redis_env() -> bool {
    if !check_test_env().await {
        return false;
    }
    if std::env::var("REDIS_URL").is_err() {
        eprintln!("Skipping test: REDIS_URL not set");
        return false;
    }
    true
}

/// Assert response status and parse JSON body
pub async fn assert_json<T: DeserializeOwned>(response: Response, expected_status: StatusCode) -> Result<T> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        anyhow::bail!(
            "Expected status {}, got {}. Body: {}",
            expected_status,
            status,
            body
        );
    }
    Ok(response.json().await?)
}

/// Assert response status without parsing body
pub async fn assert_status(response: Response, expected_status: StatusCode) -> Result<()> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        anyhow::bail!(
            "Expected status {}, got {}. Body: {}",
            expected_status,
            status,
            body
        );
    }
    Ok(())
}
