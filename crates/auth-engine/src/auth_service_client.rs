//! REST client for the authorization service's three handshake endpoints.
//!
//! Every call has the same shape: build the request, send it, and decode the
//! expected field. Non-2xx responses, transport failures, and undecodable
//! bodies are logged and reported as `Ok(None)`. `Err` is reserved for
//! conditions the client cannot turn into an ordinary failure, such as an
//! endpoint URL that cannot be built.

use crate::login_message::LoginRawMessage;
use crate::{AuthError, AuthResult};
use auth_config_and_utils::Config;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use session_storage::SessionProfile;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use url::Url;

/// Nonce issuance endpoint, relative to the authentication base URL.
pub const NONCE_PATH: &str = "/api/v2/nonce";
/// Signature login endpoint, relative to the authentication base URL.
pub const LOGIN_PATH: &str = "/api/v2/srp/login";
/// Token exchange endpoint, relative to the OIDC base URL.
pub const TOKEN_PATH: &str = "/oauth2/token";
/// Grant type sent with the token exchange.
pub const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

fn summarize_response_body(body: &str) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("len={},digest={:016x}", body.len(), hasher.finish())
}

/// Authorization service client.
#[derive(Clone)]
pub struct AuthServiceClient {
    http_client: reqwest::Client,
    auth_base_url: Url,
    oidc_base_url: Url,
    client_id: String,
}

#[derive(Debug, Deserialize)]
struct NonceResponse {
    #[serde(default)]
    nonce: Option<String>,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    signature: &'a str,
    raw_message: &'a str,
}

/// Body of a successful login response.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    /// Single-use token exchanged for an access token.
    #[serde(default)]
    pub token: Option<String>,
    pub profile: LoginProfile,
}

/// Profile payload as the service sends it (snake_case).
#[derive(Debug, Clone, Deserialize)]
pub struct LoginProfile {
    pub identifier_id: String,
    pub profile_id: String,
    pub metametrics_id: String,
}

impl From<LoginProfile> for SessionProfile {
    fn from(profile: LoginProfile) -> Self {
        SessionProfile {
            identifier_id: profile.identifier_id,
            profile_id: profile.profile_id,
            metametrics_id: profile.metametrics_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

impl AuthServiceClient {
    /// Create a new client.
    ///
    /// # Arguments
    /// * `auth_base_url` - Authentication service base (nonce + login)
    /// * `oidc_base_url` - OIDC service base (token exchange)
    /// * `client_id` - OAuth client id sent with the token exchange
    pub fn new(auth_base_url: Url, oidc_base_url: Url, client_id: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            auth_base_url,
            oidc_base_url,
            client_id: client_id.into(),
        }
    }

    /// Create a client for the environment described by `config`.
    pub fn from_config(config: &Config) -> AuthResult<Self> {
        Ok(Self::new(
            config.auth_base_url()?,
            config.oidc_base_url()?,
            config.client_id()?,
        ))
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = client;
        self
    }

    /// Join `path` onto `base`, keeping any path prefix the base carries.
    fn endpoint(base: &Url, path: &str) -> AuthResult<Url> {
        let joined = format!("{}{}", base.as_str().trim_end_matches('/'), path);
        Url::parse(&joined).map_err(AuthError::from)
    }

    /// Fetch a login nonce for `public_key`.
    pub async fn get_nonce(&self, public_key: &str) -> AuthResult<Option<String>> {
        let mut url = Self::endpoint(&self.auth_base_url, NONCE_PATH)?;
        url.query_pairs_mut().append_pair("identifier", public_key);

        tracing::debug!(url = %url, "Requesting nonce");

        let request = self.http_client.get(url);
        let body: Option<NonceResponse> = self.send_and_decode(request, "nonce").await;
        Ok(body.and_then(|b| b.nonce))
    }

    /// Exchange a signed login message for a single-use token and profile.
    pub async fn login(
        &self,
        raw_message: &LoginRawMessage,
        signature: &str,
    ) -> AuthResult<Option<LoginResponse>> {
        let url = Self::endpoint(&self.auth_base_url, LOGIN_PATH)?;

        tracing::debug!(url = %url, "Logging in with signed message");

        let request = self.http_client.post(url).json(&LoginRequest {
            signature,
            raw_message: raw_message.as_str(),
        });
        Ok(self.send_and_decode(request, "login").await)
    }

    /// Exchange the login token (a JWT) for a bearer access token.
    pub async fn get_access_token(&self, jwt: &str) -> AuthResult<Option<String>> {
        let url = Self::endpoint(&self.oidc_base_url, TOKEN_PATH)?;

        tracing::debug!(url = %url, "Requesting access token");

        let params = [
            ("grant_type", JWT_BEARER_GRANT_TYPE),
            ("client_id", self.client_id.as_str()),
            ("assertion", jwt),
        ];
        let request = self.http_client.post(url).form(&params);
        let body: Option<TokenResponse> = self.send_and_decode(request, "access token").await;
        Ok(body.and_then(|b| b.access_token))
    }

    /// Send `request` and decode a 2xx JSON body. Every failure is logged
    /// and collapsed to `None`.
    async fn send_and_decode<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        operation: &'static str,
    ) -> Option<T> {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(operation, error = %e, "Auth service request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let body_summary = summarize_response_body(&body);
            tracing::warn!(
                operation,
                status = %status,
                body_summary = %body_summary,
                "Auth service returned an error status"
            );
            return None;
        }

        match response.json::<T>().await {
            Ok(body) => Some(body),
            Err(e) => {
                tracing::error!(operation, error = %e, "Failed to decode auth service response");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::login_message::create_login_raw_message;
    use serde_json::json;
    use wiremock::matchers::{body_json, body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> AuthServiceClient {
        let base = Url::parse(&server.uri()).unwrap();
        AuthServiceClient::new(base.clone(), base, "test-client")
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let base = Url::parse("https://auth.example.com/prefix/").unwrap();
        let url = AuthServiceClient::endpoint(&base, NONCE_PATH).unwrap();
        assert_eq!(url.as_str(), "https://auth.example.com/prefix/api/v2/nonce");
    }

    #[test]
    fn test_from_config_requires_client_id() {
        let config = Config::default();
        assert!(matches!(
            AuthServiceClient::from_config(&config),
            Err(AuthError::Config(_))
        ));
    }

    #[test]
    fn test_login_profile_translation() {
        let profile: SessionProfile = LoginProfile {
            identifier_id: "id".to_string(),
            profile_id: "profile".to_string(),
            metametrics_id: "mm".to_string(),
        }
        .into();
        assert_eq!(profile.identifier_id, "id");
        assert_eq!(profile.profile_id, "profile");
        assert_eq!(profile.metametrics_id, "mm");
    }

    #[test]
    fn test_summarize_response_body_hides_content() {
        let summary = summarize_response_body("secret body");
        assert!(summary.starts_with("len=11,digest="));
        assert!(!summary.contains("secret"));
    }

    #[tokio::test]
    async fn test_get_nonce_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(NONCE_PATH))
            .and(query_param("identifier", "PK1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "nonce": "N1" })))
            .expect(1)
            .mount(&server)
            .await;

        let nonce = client_for(&server).get_nonce("PK1").await.unwrap();
        assert_eq!(nonce, Some("N1".to_string()));
    }

    #[tokio::test]
    async fn test_get_nonce_error_status_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(NONCE_PATH))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        assert_eq!(client_for(&server).get_nonce("PK1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_nonce_missing_field_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(NONCE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        assert_eq!(client_for(&server).get_nonce("PK1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_login_sends_signature_and_raw_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .and(body_json(json!({
                "signature": "sig-1",
                "raw_message": "metamask:N1:PK1",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token": "login-token",
                "expires_in": "3600",
                "profile": {
                    "identifier_id": "identifier-1",
                    "profile_id": "profile-1",
                    "metametrics_id": "metametrics-1",
                },
            })))
            .expect(1)
            .mount(&server)
            .await;

        let message = create_login_raw_message("N1", "PK1");
        let response = client_for(&server)
            .login(&message, "sig-1")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(response.token.as_deref(), Some("login-token"));
        assert_eq!(response.profile.identifier_id, "identifier-1");
    }

    #[tokio::test]
    async fn test_login_malformed_body_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let message = create_login_raw_message("N1", "PK1");
        assert!(client_for(&server).login(&message, "sig").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_access_token_posts_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(body_string_contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer"))
            .and(body_string_contains("client_id=test-client"))
            .and(body_string_contains("assertion=login-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "access-1",
                "expires_in": 3600,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let token = client_for(&server)
            .get_access_token("login-token")
            .await
            .unwrap();
        assert_eq!(token, Some("access-1".to_string()));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_none() {
        // Nothing listens on the discard port
        let base = Url::parse("http://127.0.0.1:9").unwrap();
        let client = AuthServiceClient::new(base.clone(), base, "test-client");

        assert_eq!(client.get_nonce("PK1").await.unwrap(), None);
    }
}
