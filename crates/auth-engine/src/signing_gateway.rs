//! Boundary to the external signing capability.
//!
//! The coordinator only sees [`SigningGateway`]. [`SnapSigningGateway`] maps
//! the two calls onto JSON-RPC requests addressed to the message-signing
//! capability and hands them to a [`CapabilityDispatcher`] for delivery.

use crate::login_message::LoginRawMessage;
use crate::{AuthError, AuthResult};
use async_trait::async_trait;
use auth_config_and_utils::Config;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;

/// Capability that holds the signing key.
pub const SIGNING_SNAP_ID: &str = "npm:@metamask/message-signing-snap";
/// Origin the requests are issued under.
pub const SIGNING_ORIGIN: &str = "metamask";
/// Capability entry point.
pub const SIGNING_HANDLER: &str = "onRpcRequest";

/// Signer operations needed by the handshake.
#[async_trait]
pub trait SigningGateway: Send + Sync {
    /// Public key identifying this signer to the service.
    async fn get_public_key(&self) -> AuthResult<String>;

    /// Sign a login message. Only prefixed messages can be constructed.
    async fn sign_message(&self, message: &LoginRawMessage) -> AuthResult<String>;
}

/// JSON-RPC request carried to the capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    pub id: String,
}

/// Envelope addressing a JSON-RPC request to a capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityRequest {
    pub snap_id: String,
    pub origin: String,
    pub handler: String,
    pub request: JsonRpcRequest,
}

/// Delivers capability requests and returns the JSON-RPC `result`.
#[async_trait]
pub trait CapabilityDispatcher: Send + Sync {
    async fn dispatch(&self, request: CapabilityRequest) -> AuthResult<Value>;
}

/// [`SigningGateway`] backed by the message-signing capability.
pub struct SnapSigningGateway<D> {
    dispatcher: D,
}

impl<D: CapabilityDispatcher> SnapSigningGateway<D> {
    pub fn new(dispatcher: D) -> Self {
        Self { dispatcher }
    }

    fn envelope(method: &str, params: Option<Value>) -> CapabilityRequest {
        CapabilityRequest {
            snap_id: SIGNING_SNAP_ID.to_string(),
            origin: SIGNING_ORIGIN.to_string(),
            handler: SIGNING_HANDLER.to_string(),
            request: JsonRpcRequest {
                jsonrpc: "2.0".to_string(),
                method: method.to_string(),
                params,
                id: uuid::Uuid::new_v4().to_string(),
            },
        }
    }
}

fn expect_string(value: Value, method: &str) -> AuthResult<String> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(AuthError::Signer(format!(
            "{method} returned a non-string result ({})",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[async_trait]
impl<D: CapabilityDispatcher> SigningGateway for SnapSigningGateway<D> {
    async fn get_public_key(&self) -> AuthResult<String> {
        let result = self
            .dispatcher
            .dispatch(Self::envelope("getPublicKey", None))
            .await?;
        expect_string(result, "getPublicKey")
    }

    async fn sign_message(&self, message: &LoginRawMessage) -> AuthResult<String> {
        let params = json!({ "message": message.as_str() });
        let result = self
            .dispatcher
            .dispatch(Self::envelope("signMessage", Some(params)))
            .await?;
        expect_string(result, "signMessage")
    }
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    #[serde(default)]
    code: i64,
    message: String,
}

/// Dispatcher that POSTs capability requests to a signer host over HTTP.
#[derive(Clone)]
pub struct HttpCapabilityDispatcher {
    http_client: reqwest::Client,
    url: Url,
}

impl HttpCapabilityDispatcher {
    pub fn new(url: Url) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            url,
        }
    }

    /// Dispatcher for the `signer_url` in `config`.
    pub fn from_config(config: &Config) -> AuthResult<Self> {
        Ok(Self::new(config.signer_url()?))
    }

    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = client;
        self
    }
}

#[async_trait]
impl CapabilityDispatcher for HttpCapabilityDispatcher {
    async fn dispatch(&self, request: CapabilityRequest) -> AuthResult<Value> {
        tracing::debug!(
            url = %self.url,
            method = %request.request.method,
            "Dispatching signer request"
        );

        let response = self
            .http_client
            .post(self.url.clone())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Signer(format!(
                "signer host returned status {status}"
            )));
        }

        let body: JsonRpcResponse = response.json().await?;
        if let Some(error) = body.error {
            return Err(AuthError::Signer(format!(
                "{} (code {})",
                error.message, error.code
            )));
        }

        body.result
            .ok_or_else(|| AuthError::Signer("signer response has no result".to_string()))
    }
}
