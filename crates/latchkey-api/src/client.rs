// Lock cloud HTTP client
//
// Wraps `reqwest::Client` with cloud-specific URL construction, token
// header management, and response decoding. All endpoint groups
// (session, directory, operate, verification) are inherent methods here;
// the API surface is small enough that splitting files would add noise.

use std::sync::RwLock;

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::types::{LockOperation, LockSummary, OperateAck, RawLockRecord, Session};

/// Header names used by the cloud API.
///
/// Defaults match the production service; override only when pointing
/// at a gateway that rewrites headers.
#[derive(Debug, Clone)]
pub struct ApiHeaders {
    /// Request/response header carrying the access token.
    pub access_token: String,
    /// Request header carrying the application key.
    pub api_key: String,
}

impl Default for ApiHeaders {
    fn default() -> Self {
        Self {
            access_token: "x-august-access-token".into(),
            api_key: "x-kease-api-key".into(),
        }
    }
}

/// Session response body. The token itself comes from a response header;
/// the body only supplies account metadata.
#[derive(Deserialize)]
struct SessionBody {
    #[serde(rename = "userId")]
    user_id: Option<String>,
}

/// Raw HTTP client for the lock cloud API.
///
/// Handles URL construction, the application-key and access-token
/// headers, and HTTP status mapping. Lock ids are upper-cased before
/// they reach a URL -- the cloud rejects lowercase ids on some
/// endpoints.
pub struct DirectoryClient {
    http: reqwest::Client,
    base_url: Url,
    headers: ApiHeaders,
    /// Access token captured from the session response header. Applied
    /// to every request once present; cleared when the session is
    /// invalidated so a retry re-authenticates from scratch.
    access_token: RwLock<Option<SecretString>>,
}

impl DirectoryClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// The application key is baked into the client as a default header
    /// so every request carries it.
    pub fn new(base_url: Url, api_key: &str, transport: &TransportConfig) -> Result<Self, Error> {
        Self::with_headers(base_url, api_key, transport, ApiHeaders::default())
    }

    /// Create a client with non-default header names.
    pub fn with_headers(
        base_url: Url,
        api_key: &str,
        transport: &TransportConfig,
        headers: ApiHeaders,
    ) -> Result<Self, Error> {
        let mut defaults = reqwest::header::HeaderMap::new();
        let mut key_value = reqwest::header::HeaderValue::from_str(api_key)
            .map_err(|_| Error::Authentication {
                message: "application key is not a valid header value".into(),
            })?;
        key_value.set_sensitive(true);
        let key_name: reqwest::header::HeaderName =
            headers.api_key.parse().map_err(|_| Error::Authentication {
                message: format!("invalid API key header name: {}", headers.api_key),
            })?;
        defaults.insert(key_name, key_value);

        let http = transport.build_client(defaults)?;
        Ok(Self {
            http,
            base_url,
            headers,
            access_token: RwLock::new(None),
        })
    }

    /// The cloud base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Whether an access token is currently held.
    pub fn has_token(&self) -> bool {
        self.access_token.read().expect("token lock poisoned").is_some()
    }

    /// Drop the stored access token. The next request must be preceded
    /// by a fresh `authenticate` call.
    pub fn clear_token(&self) {
        *self.access_token.write().expect("token lock poisoned") = None;
    }

    // ── Session ──────────────────────────────────────────────────────

    /// Authenticate with account credentials.
    ///
    /// The access token arrives in the `x-august-access-token` response
    /// header, not the body. It is stored on the client for subsequent
    /// requests and also returned in the `Session`.
    pub async fn authenticate(
        &self,
        identifier: &str,
        password: &SecretString,
        install_id: &str,
    ) -> Result<Session, Error> {
        let url = self.api_url("session");
        debug!("POST {url}");

        let body = json!({
            "identifier": identifier,
            "password": password.expose_secret(),
            "installId": install_id,
        });
        let resp = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(Error::Transport)?;

        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Authentication {
                message: "invalid credentials".into(),
            });
        }
        if !resp.status().is_success() {
            return Err(Self::status_error(resp).await);
        }

        let token = resp
            .headers()
            .get(self.headers.access_token.as_str())
            .and_then(|v| v.to_str().ok())
            .map(|v| SecretString::from(v.to_owned()))
            .ok_or(Error::MissingToken)?;

        let session_body: SessionBody = Self::decode_body(resp).await?;
        *self.access_token.write().expect("token lock poisoned") = Some(token.clone());

        Ok(Session {
            token,
            user_id: session_body.user_id.unwrap_or_default(),
        })
    }

    // ── Directory ────────────────────────────────────────────────────

    /// List locks visible to the authenticated account.
    ///
    /// The endpoint returns a JSON object keyed by lock id; this is
    /// flattened into `(id, summary)` pairs.
    pub async fn list_locks(&self) -> Result<Vec<(String, LockSummary)>, Error> {
        let url = self.api_url("users/locks/mine");
        let map: std::collections::HashMap<String, LockSummary> = self.get(url).await?;
        Ok(map.into_iter().collect())
    }

    /// Fetch the full record for one lock.
    pub async fn get_lock(&self, lock_id: &str) -> Result<RawLockRecord, Error> {
        let url = self.api_url(&format!("locks/{}", lock_id.to_uppercase()));
        self.get(url).await
    }

    // ── Remote operation ─────────────────────────────────────────────

    /// Request a remote lock or unlock over the bridge.
    ///
    /// A 2xx response means the cloud accepted the command; the settled
    /// bolt state must be confirmed by a follow-up fetch.
    pub async fn remote_operate(
        &self,
        lock_id: &str,
        op: LockOperation,
    ) -> Result<OperateAck, Error> {
        let url = self.api_url(&format!(
            "remoteoperate/{}/{}",
            lock_id.to_uppercase(),
            op.as_path()
        ));
        self.put(url, &json!({})).await
    }

    // ── Verification ─────────────────────────────────────────────────

    /// Ask the cloud to send a verification code to a phone number.
    pub async fn send_code_to_phone(&self, phone: &str) -> Result<(), Error> {
        let url = self.api_url("validation/phone");
        self.post_unit(url, &json!({ "value": phone })).await
    }

    /// Ask the cloud to send a verification code to an email address.
    pub async fn send_code_to_email(&self, email: &str) -> Result<(), Error> {
        let url = self.api_url("validation/email");
        self.post_unit(url, &json!({ "value": email })).await
    }

    /// Submit a phone verification code.
    pub async fn validate_phone(&self, phone: &str, code: &str) -> Result<(), Error> {
        let url = self.api_url("validate/phone");
        self.post_unit(url, &json!({ "phone": phone, "code": code }))
            .await
    }

    /// Submit an email verification code.
    pub async fn validate_email(&self, email: &str, code: &str) -> Result<(), Error> {
        let url = self.api_url("validate/email");
        self.post_unit(url, &json!({ "email": email, "code": code }))
            .await
    }

    // ── URL and request helpers ──────────────────────────────────────

    /// Build a full URL for an API path.
    fn api_url(&self, path: &str) -> Url {
        let base = self.base_url.as_str().trim_end_matches('/');
        let full = format!("{base}/{path}");
        Url::parse(&full).expect("invalid API URL")
    }

    /// Apply the stored access token to a request builder.
    fn apply_token(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let guard = self.access_token.read().expect("token lock poisoned");
        match guard.as_ref() {
            Some(token) => builder.header(
                self.headers.access_token.as_str(),
                token.expose_secret(),
            ),
            None => builder,
        }
    }

    /// Send a GET request and decode the JSON response.
    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {url}");
        let resp = self
            .apply_token(self.http.get(url))
            .send()
            .await
            .map_err(Error::Transport)?;
        Self::check_status(resp).await
    }

    /// Send a PUT request with JSON body and decode the JSON response.
    async fn put<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<T, Error> {
        debug!("PUT {url}");
        let resp = self
            .apply_token(self.http.put(url).json(body))
            .send()
            .await
            .map_err(Error::Transport)?;
        Self::check_status(resp).await
    }

    /// Send a POST request, discarding the response body.
    async fn post_unit(&self, url: Url, body: &(impl Serialize + Sync)) -> Result<(), Error> {
        debug!("POST {url}");
        let resp = self
            .apply_token(self.http.post(url).json(body))
            .send()
            .await
            .map_err(Error::Transport)?;
        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Authentication {
                message: "session expired or invalid credentials".into(),
            });
        }
        if !resp.status().is_success() {
            return Err(Self::status_error(resp).await);
        }
        Ok(())
    }

    /// Map the HTTP status, then decode the body as `T`.
    async fn check_status<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Authentication {
                message: "session expired or invalid credentials".into(),
            });
        }
        if !status.is_success() {
            return Err(Self::status_error(resp).await);
        }
        Self::decode_body(resp).await
    }

    /// Decode a response body, preserving a preview on parse failure.
    async fn decode_body<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let body = resp.text().await.map_err(Error::Transport)?;
        serde_json::from_str(&body).map_err(|e| {
            let preview = &body[..body.len().min(200)];
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })
    }

    /// Build an `Error::Api` from a non-success response.
    async fn status_error(resp: reqwest::Response) -> Error {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Error::Api {
            status,
            message: body[..body.len().min(200)].to_owned(),
        }
    }
}
