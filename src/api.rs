//! Admin backend API client.
//!
//! Every backend call goes through [`ApiClient::request`], which folds the
//! three ways a call can end (body, no usable body, failure) into one
//! [`ApiOutcome`]. The byte-level HTTP exchange sits behind the
//! [`ApiTransport`] trait so the session logic can be driven without a
//! network.

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::context::SessionContext;
use crate::error::CajaError;
use crate::fields::{as_text, FieldMap};

/// Default timeout for API requests (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// URL normalisation
// ---------------------------------------------------------------------------

/// Normalise the backend base URL:
/// - ensure a scheme is present (https, or http for localhost)
/// - strip trailing slashes
/// - strip a trailing `/api` segment (paths already carry it)
pub fn normalize_base_url(url: &str) -> String {
    let mut url = url.trim().to_string();

    if !url.starts_with("http://") && !url.starts_with("https://") {
        if url.starts_with("localhost") || url.starts_with("127.0.0.1") {
            url = format!("http://{url}");
        } else {
            url = format!("https://{url}");
        }
    }

    while url.ends_with('/') {
        url.pop();
    }
    if url.ends_with("/api") {
        url.truncate(url.len() - 4);
    }
    while url.ends_with('/') {
        url.pop();
    }

    url
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Convert a `reqwest::Error` into a user-friendly message.
fn friendly_error(url: &str, err: &reqwest::Error) -> String {
    if err.is_connect() {
        return format!("Cannot reach the backend at {url}");
    }
    if err.is_timeout() {
        return format!("Connection to {url} timed out");
    }
    if err.is_builder() {
        return format!("Invalid backend URL: {url}");
    }
    format!("Network error communicating with {url}: {err}")
}

const ERROR_BODY_FIELDS: FieldMap = FieldMap::new(&[
    ("message", &["message", "Message", "error", "Error", "title", "Title"]),
    ("errors", &["errors", "Errors"]),
]);

/// Pull a readable message out of a failed response body.
///
/// A validation `errors` map (field → list of messages) wins and is
/// flattened with ", ". Otherwise the first of `message`/`error`/`title`,
/// then the raw text. `None` when the body carries nothing.
pub fn extract_error_message(body_text: &str) -> Option<String> {
    let trimmed = body_text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(json) = serde_json::from_str::<Value>(trimmed) {
        if let Some(errors) = ERROR_BODY_FIELDS.object(&json, "errors") {
            let flattened: Vec<String> = errors
                .values()
                .flat_map(|v| match v {
                    Value::Array(items) => items.iter().filter_map(as_text).collect::<Vec<_>>(),
                    other => as_text(other).into_iter().collect::<Vec<_>>(),
                })
                .collect();
            if !flattened.is_empty() {
                return Some(flattened.join(", "));
            }
        }
        if let Some(message) = ERROR_BODY_FIELDS.text(&json, "message") {
            return Some(message);
        }
        if json.is_string() {
            return as_text(&json);
        }
    }

    Some(trimmed.to_string())
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Abstract HTTP exchange with the backend.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// Send one request. `Err` means no response was obtained at all.
    async fn send(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<&Value>,
    ) -> Result<RawResponse, String>;

    /// Human-readable description of the target.
    fn description(&self) -> String;
}

/// `reqwest` transport against a real backend.
pub struct HttpTransport {
    base_url: String,
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, CajaError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CajaError::transport(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            base_url: normalize_base_url(&config.base_url),
            client,
        })
    }
}

#[async_trait]
impl ApiTransport for HttpTransport {
    async fn send(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<&Value>,
    ) -> Result<RawResponse, String> {
        let full_url = format!("{}{path}", self.base_url);
        let mut req = self.client.request(method, &full_url);

        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        if let Some(b) = body {
            req = req.json(b);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| friendly_error(&self.base_url, &e))?;
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Ok(RawResponse { status, body })
    }

    fn description(&self) -> String {
        self.base_url.clone()
    }
}

// ---------------------------------------------------------------------------
// Request helper
// ---------------------------------------------------------------------------

/// How a backend call ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiOutcome {
    /// 2xx with a JSON body.
    Success(Value),
    /// 2xx with an empty, `null` or unparseable body.
    EmptyBody,
    /// No response (`status: None`) or a non-2xx one. `message` is whatever
    /// could be read from the body or the network error.
    Failure {
        status: Option<u16>,
        message: Option<String>,
    },
}

impl ApiOutcome {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Failure { status: Some(404), .. })
    }

    /// Write-path reading: an empty success is an empty object.
    pub fn into_write_result(self, fallback: &str) -> Result<Value, CajaError> {
        match self {
            Self::Success(v) => Ok(v),
            Self::EmptyBody => Ok(serde_json::json!({})),
            Self::Failure { message, .. } => Err(CajaError::transport(
                message.unwrap_or_else(|| fallback.to_string()),
            )),
        }
    }

    /// Read-path reading: an empty success is absence of data.
    pub fn into_read_result(self, fallback: &str) -> Result<Option<Value>, CajaError> {
        match self {
            Self::Success(v) => Ok(Some(v)),
            Self::EmptyBody => Ok(None),
            Self::Failure { message, .. } => Err(CajaError::transport(
                message.unwrap_or_else(|| fallback.to_string()),
            )),
        }
    }
}

/// Cheap-to-clone handle shared by every operation.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn ApiTransport>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn ApiTransport>) -> Self {
        Self { transport }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, CajaError> {
        Ok(Self::new(Arc::new(HttpTransport::new(config)?)))
    }

    pub fn description(&self) -> String {
        self.transport.description()
    }

    /// Perform an authenticated request. The bearer token is attached when
    /// the context has one; its absence is left for the backend to reject.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        ctx: &SessionContext,
        body: Option<Value>,
    ) -> ApiOutcome {
        debug!(%method, path, "backend request");
        let resp = match self
            .transport
            .send(method.clone(), path, ctx.token.as_deref(), body.as_ref())
            .await
        {
            Ok(r) => r,
            Err(message) => {
                warn!(%method, path, error = %message, "backend unreachable");
                return ApiOutcome::Failure {
                    status: None,
                    message: Some(message).filter(|m| !m.trim().is_empty()),
                };
            }
        };

        if !resp.is_success() {
            let message = extract_error_message(&resp.body);
            debug!(%method, path, status = resp.status, ?message, "backend rejected request");
            return ApiOutcome::Failure {
                status: Some(resp.status),
                message,
            };
        }

        if resp.body.trim().is_empty() {
            return ApiOutcome::EmptyBody;
        }
        match serde_json::from_str::<Value>(&resp.body) {
            Ok(Value::Null) => ApiOutcome::EmptyBody,
            Ok(v) => ApiOutcome::Success(v),
            Err(e) => {
                debug!(%method, path, error = %e, "unparseable success body treated as empty");
                ApiOutcome::EmptyBody
            }
        }
    }

    pub async fn get(&self, path: &str, ctx: &SessionContext) -> ApiOutcome {
        self.request(Method::GET, path, ctx, None).await
    }

    pub async fn post(&self, path: &str, ctx: &SessionContext, body: Value) -> ApiOutcome {
        self.request(Method::POST, path, ctx, Some(body)).await
    }

    pub async fn put(&self, path: &str, ctx: &SessionContext, body: Value) -> ApiOutcome {
        self.request(Method::PUT, path, ctx, Some(body)).await
    }

    pub async fn delete(&self, path: &str, ctx: &SessionContext) -> ApiOutcome {
        self.request(Method::DELETE, path, ctx, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedTransport;
    use serde_json::json;

    #[test]
    fn normalize_adds_scheme_and_strips_api_suffix() {
        assert_eq!(normalize_base_url("localhost:5000/api/"), "http://localhost:5000");
        assert_eq!(normalize_base_url("pos.example.com//"), "https://pos.example.com");
        assert_eq!(
            normalize_base_url(" https://pos.example.com/api "),
            "https://pos.example.com"
        );
    }

    #[test]
    fn error_message_prefers_structured_field() {
        let body = r#"{"message":"Ya existe una caja abierta","error":"conflict"}"#;
        assert_eq!(
            extract_error_message(body).as_deref(),
            Some("Ya existe una caja abierta")
        );
        assert_eq!(
            extract_error_message(r#"{"title":"Bad Request"}"#).as_deref(),
            Some("Bad Request")
        );
    }

    #[test]
    fn error_message_flattens_validation_errors() {
        let body = r#"{"title":"One or more validation errors occurred.",
                       "errors":{"Nombre":["Required"],"Precio":["Must be positive"]}}"#;
        assert_eq!(
            extract_error_message(body).as_deref(),
            Some("Required, Must be positive")
        );
    }

    #[test]
    fn error_message_skips_non_text_error_objects() {
        assert_eq!(
            extract_error_message(r#"{"error":{"code":7},"title":"Saldo requerido"}"#).as_deref(),
            Some("Saldo requerido")
        );
    }

    #[test]
    fn error_message_falls_back_to_raw_text_then_nothing() {
        assert_eq!(
            extract_error_message("  Internal failure \n").as_deref(),
            Some("Internal failure")
        );
        assert_eq!(extract_error_message("   "), None);
    }

    #[tokio::test]
    async fn request_classifies_success_empty_and_failure() {
        let transport = ScriptedTransport::new()
            .reply("GET", "/ok", 200, r#"{"id":1}"#)
            .reply("GET", "/empty", 204, "")
            .reply("GET", "/garbled", 200, "<html>")
            .reply("GET", "/missing", 404, "")
            .unreachable("GET", "/down", "Cannot reach the backend at http://x");
        let api = transport.client();
        let ctx = SessionContext::anonymous();

        assert_eq!(api.get("/ok", &ctx).await, ApiOutcome::Success(json!({"id": 1})));
        assert_eq!(api.get("/empty", &ctx).await, ApiOutcome::EmptyBody);
        assert_eq!(api.get("/garbled", &ctx).await, ApiOutcome::EmptyBody);
        assert!(api.get("/missing", &ctx).await.is_not_found());
        assert_eq!(
            api.get("/down", &ctx).await,
            ApiOutcome::Failure {
                status: None,
                message: Some("Cannot reach the backend at http://x".into())
            }
        );
    }

    #[tokio::test]
    async fn bearer_token_is_forwarded_when_present() {
        let transport = ScriptedTransport::new().reply("GET", "/api/Caja", 200, "[]");
        let api = transport.client();

        api.get("/api/Caja", &SessionContext::new(Some("tok".into()), None))
            .await;
        api.get("/api/Caja", &SessionContext::anonymous()).await;

        let sent = transport.requests();
        assert_eq!(sent[0].token.as_deref(), Some("tok"));
        assert_eq!(sent[1].token, None);
    }

    #[test]
    fn write_result_uses_fallback_when_body_is_silent() {
        let failure = ApiOutcome::Failure {
            status: Some(500),
            message: None,
        };
        assert_eq!(
            failure.into_write_result("Failed to open the cash register"),
            Err(CajaError::Transport("Failed to open the cash register".into()))
        );
        assert_eq!(ApiOutcome::EmptyBody.into_write_result("x"), Ok(json!({})));
        assert_eq!(ApiOutcome::EmptyBody.into_read_result("x"), Ok(None));
    }
}
