use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::auth::JwtTokenProvider;

/// JSON-RPC error code returned by execution clients for an unknown or pruned payload id.
pub const UNKNOWN_PAYLOAD_CODE: i64 = -38001;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RpcCallError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Execution client rejected credentials with HTTP {0}")]
    Auth(u16),

    #[error("Could not create bearer token: {0}")]
    Token(String),

    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl RpcCallError {
    /// Only transport level failures are retried. Anything the execution client actually
    /// answered is final for that call.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout(_))
    }
}

/// Seam between the engine client and the wire. Implementations perform exactly one attempt;
/// retries are layered on top by [crate::ExecutionEngine].
#[async_trait]
pub trait EngineTransport: Send + Sync {
    async fn request(
        &self,
        method: &'static str,
        params: Vec<Value>,
        timeout: Duration,
    ) -> Result<Value, RpcCallError>;
}

#[derive(Serialize, Deserialize, Debug)]
pub struct JsonRpcRequest {
    pub id: u64,
    pub jsonrpc: String,
    pub method: String,
    pub params: Vec<Value>,
}

#[derive(Deserialize, Debug)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Deserialize, Debug)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn into_result(self) -> Result<Value, RpcCallError> {
        match (self.result, self.error) {
            (_, Some(error)) => Err(RpcCallError::Rpc {
                code: error.code,
                message: error.message,
            }),
            (Some(result), None) => Ok(result),
            (None, None) => Ok(Value::Null),
        }
    }
}

pub struct HttpTransport {
    http_client: Client,
    endpoint: Url,
    tokens: Arc<JwtTokenProvider>,
    next_id: AtomicU64,
}

impl HttpTransport {
    pub fn new(endpoint: Url, tokens: Arc<JwtTokenProvider>) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http_client: Client::builder().build()?,
            endpoint,
            tokens,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl EngineTransport for HttpTransport {
    async fn request(
        &self,
        method: &'static str,
        params: Vec<Value>,
        timeout: Duration,
    ) -> Result<Value, RpcCallError> {
        let token = self
            .tokens
            .token()
            .await
            .map_err(|err| RpcCallError::Token(err.to_string()))?;
        let request_body = JsonRpcRequest {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
        };

        let response = self
            .http_client
            .post(self.endpoint.clone())
            .timeout(timeout)
            .bearer_auth(token)
            .json(&request_body)
            .send()
            .await
            .map_err(|err| classify_send_error(err, timeout))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(RpcCallError::Auth(status.as_u16()));
        }
        if status.is_server_error() {
            return Err(RpcCallError::Transport(format!("HTTP {status}")));
        }

        response
            .json::<JsonRpcResponse>()
            .await
            .map_err(|err| classify_body_error(err, timeout))?
            .into_result()
    }
}

fn classify_send_error(err: reqwest::Error, timeout: Duration) -> RpcCallError {
    if err.is_timeout() {
        RpcCallError::Timeout(timeout)
    } else {
        RpcCallError::Transport(err.to_string())
    }
}

fn classify_body_error(err: reqwest::Error, timeout: Duration) -> RpcCallError {
    if err.is_timeout() {
        RpcCallError::Timeout(timeout)
    } else if err.is_decode() {
        RpcCallError::InvalidResponse(err.to_string())
    } else {
        RpcCallError::Transport(err.to_string())
    }
}
