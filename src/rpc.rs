//! JSON-RPC 1.0 client for Bitcoin Core.
//!
//! [`RpcClient`] builds the envelope and picks the node-global or wallet path.
//! It also folds node errors into [`ApiError`]. Moving bytes is left to an
//! [`RpcTransport`], which is [`HttpTransport`] in production.

use crate::config::RpcConfig;
use crate::error::{ApiError, ApiResult};
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

const LOG_PREVIEW_CHARS: usize = 200;

/// Which node endpoint a call goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Node,
    Wallet,
}

/// Moves one serialized request to the node and returns the raw response body.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn post(&self, path: &str, body: String) -> ApiResult<String>;
}

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    user: String,
    password: String,
}

impl HttpTransport {
    pub fn new(config: &RpcConfig) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::InvalidConfig(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url(),
            user: config.user.clone(),
            password: config.password.clone(),
        })
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn post(&self, path: &str, body: String) -> ApiResult<String> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .basic_auth(&self.user, Some(&self.password))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        // Bitcoin Core answers RPC errors with 404/500 and a JSON body, so only
        // auth failures (empty body) are treated as transport-level.
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ApiError::Transport(format!(
                "RPC authentication rejected (HTTP {})",
                status
            )));
        }

        response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))
    }
}

#[derive(Deserialize)]
struct RpcErrorBody {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Clone)]
pub struct RpcClient {
    transport: Arc<dyn RpcTransport>,
    wallet: String,
    next_id: Arc<AtomicU64>,
}

impl RpcClient {
    pub fn new(transport: Arc<dyn RpcTransport>, wallet: impl Into<String>) -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        Self {
            transport,
            wallet: wallet.into(),
            next_id: Arc::new(AtomicU64::new(seed)),
        }
    }

    pub fn wallet_name(&self) -> &str {
        &self.wallet
    }

    fn path_for(&self, endpoint: Endpoint) -> String {
        match endpoint {
            Endpoint::Node => "/".to_string(),
            Endpoint::Wallet => format!("/wallet/{}", self.wallet),
        }
    }

    pub async fn call(&self, method: &str, params: Vec<Value>, endpoint: Endpoint) -> ApiResult<Value> {
        if method.trim().is_empty() {
            return Err(ApiError::BadRequest("RPC method must not be empty".to_string()));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let path = self.path_for(endpoint);
        let body = json!({
            "jsonrpc": "1.0",
            "id": id,
            "method": method,
            "params": params,
        })
        .to_string();

        debug!("RPC call: {} id={} path={}", method, id, path);

        let raw = self.transport.post(&path, body).await?;

        debug!(
            "RPC response for {}: {}",
            method,
            raw.chars().take(LOG_PREVIEW_CHARS).collect::<String>()
        );

        let mut envelope: Value = serde_json::from_str(&raw)
            .map_err(|e| ApiError::Protocol(format!("Failed to parse RPC response: {}", e)))?;

        let error = envelope.get_mut("error").map(Value::take).unwrap_or(Value::Null);
        if !error.is_null() {
            let error: RpcErrorBody = serde_json::from_value(error)
                .map_err(|e| ApiError::Protocol(format!("Malformed RPC error object: {}", e)))?;
            let message = error.message.unwrap_or_else(|| "RPC Error".to_string());
            return Err(ApiError::rpc(error.code, message));
        }

        // `null` is a legitimate result (invalidateblock, reconsiderblock),
        // so only a missing key is malformed.
        envelope
            .get_mut("result")
            .map(Value::take)
            .ok_or_else(|| {
                ApiError::Protocol(format!(
                    "RPC response for {} carried neither result nor error",
                    method
                ))
            })
    }

    pub async fn call_as<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
        endpoint: Endpoint,
    ) -> ApiResult<T> {
        let value = self.call(method, params, endpoint).await?;
        serde_json::from_value(value)
            .map_err(|e| ApiError::Protocol(format!("Unexpected {} result: {}", method, e)))
    }
}
