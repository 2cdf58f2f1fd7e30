//! Resilient HTTP client.
//!
//! # Responsibilities
//! - Resolve paths against the configured base URL
//! - Attach bearer credentials and a per-request id
//! - Retry transient failures with linear backoff
//! - Record every lifecycle stage in the audit log
//!
//! # Design Decisions
//! - `send` is a fixed pipeline: prepare → log sent → execute with retry → log outcome
//! - One instance is bound to one base URL and credential; cloning is cheap
//! - The Authorization value never reaches the audit log

use std::collections::BTreeMap;
use std::error::Error as _;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde_json::{json, Value};
use tracing::Instrument;
use url::Url;
use uuid::Uuid;

use crate::audit::{AuditLog, LogLevel};
use crate::client::types::{
    ApiError, ApiRequest, ApiResponse, ApiResult, RequestRecord, RequestSummary,
};
use crate::config::ApiConfig;
use crate::observability::metrics;
use crate::resilience::{classify_status, FailureClass, RetryPolicy};

const REQUEST_ID_HEADER: &str = "x-request-id";
const ACCEPT_VALUE: &str = "application/json, text/plain, */*";
const REDACTED: &str = "Bearer [REDACTED]";

/// Construction parameters for [`ApiClient`].
///
/// An empty `bearer_token` sends no Authorization header.
#[derive(Clone)]
pub struct ClientOptions {
    pub base_url: Url,
    pub bearer_token: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_delay_factor: Duration,
}

impl From<&ApiConfig> for ClientOptions {
    fn from(config: &ApiConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            bearer_token: config.bearer_token.clone(),
            timeout: Duration::from_millis(config.client_timeout_ms),
            max_retries: config.retry_max_attempts,
            retry_delay_factor: Duration::from_millis(config.retry_delay_factor_ms),
        }
    }
}

impl std::fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientOptions")
            .field("base_url", &self.base_url.as_str())
            .field("bearer_token", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("retry_delay_factor", &self.retry_delay_factor)
            .finish()
    }
}

/// A request after URL resolution and header assembly.
struct Prepared {
    method: Method,
    url: Url,
    headers: HeaderMap,
    params: BTreeMap<String, String>,
    body: Option<Value>,
    record: RequestRecord,
}

/// Why one attempt failed.
enum AttemptFailure {
    Status(ApiResponse),
    Network(String),
}

impl AttemptFailure {
    fn class(&self) -> FailureClass {
        match self {
            AttemptFailure::Status(response) => {
                classify_status(response.status).unwrap_or(FailureClass::Terminal)
            }
            AttemptFailure::Network(_) => FailureClass::Transient,
        }
    }

    fn message(&self) -> String {
        match self {
            AttemptFailure::Status(response) => {
                format!("Request failed with status code {}", response.status)
            }
            AttemptFailure::Network(message) => message.clone(),
        }
    }

    fn into_error(self, retries: u32) -> ApiError {
        match self {
            AttemptFailure::Status(response) => ApiError::Status {
                status: response.status,
                response: Box::new(response),
                retries,
            },
            AttemptFailure::Network(message) => ApiError::Network { message, retries },
        }
    }
}

/// HTTP client with classified retries and audit logging.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: Client,
    options: ClientOptions,
    policy: RetryPolicy,
    audit: AuditLog,
}

impl ApiClient {
    pub fn new(options: ClientOptions, audit: AuditLog) -> ApiResult<Self> {
        let http = Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| ApiError::Setup(format!("Failed to create HTTP client: {}", e)))?;
        let policy = RetryPolicy::new(options.max_retries, options.retry_delay_factor);

        Ok(Self { http, options, policy, audit })
    }

    /// Build a client from validated API settings.
    pub fn from_config(config: &ApiConfig, audit: AuditLog) -> ApiResult<Self> {
        Self::new(ClientOptions::from(config), audit)
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub async fn get(&self, path: &str, params: BTreeMap<String, String>) -> ApiResult<ApiResponse> {
        self.send(ApiRequest::get(path).params(params)).await
    }

    pub async fn post(&self, path: &str, body: Value) -> ApiResult<ApiResponse> {
        self.send(ApiRequest::post(path, body)).await
    }

    /// GET the base URL itself.
    pub async fn check_connection(&self) -> ApiResult<ApiResponse> {
        self.send(ApiRequest::get("")).await
    }

    /// Run one request through the full pipeline.
    pub async fn send(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        let request_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!(
            "api_request",
            request_id = %request_id,
            method = %request.method,
            path = %request.path
        );

        async move {
            let prepared = match self.prepare(request.clone(), &request_id) {
                Ok(prepared) => prepared,
                Err(e) => {
                    self.log_setup_failed(&request, &e).await;
                    return Err(e);
                }
            };

            self.log_sent(&prepared).await;
            let result = self.execute_with_retry(&prepared).await;
            self.log_outcome(&prepared, &result).await;
            result
        }
        .instrument(span)
        .await
    }

    fn prepare(&self, request: ApiRequest, request_id: &str) -> ApiResult<Prepared> {
        let url = resolve_url(&self.options.base_url, &request.path)?;

        let request_id_value = HeaderValue::from_str(request_id)
            .map_err(|e| ApiError::Setup(format!("Invalid request id header: {}", e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));
        if !self.options.bearer_token.is_empty() {
            let authorization =
                HeaderValue::from_str(&format!("Bearer {}", self.options.bearer_token))
                    .map_err(|e| ApiError::Setup(format!("Invalid bearer token header: {}", e)))?;
            headers.insert(AUTHORIZATION, authorization);
        }
        headers.insert(HeaderName::from_static(REQUEST_ID_HEADER), request_id_value);
        if request.body.is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        let record = RequestRecord {
            method: request.method.to_string(),
            url: url.to_string(),
            headers: redacted_headers(&headers),
            params: request.params.clone(),
            data: request.body.clone(),
        };

        Ok(Prepared {
            method: request.method,
            url,
            headers,
            params: request.params,
            body: request.body,
            record,
        })
    }

    async fn execute_with_retry(&self, prepared: &Prepared) -> ApiResult<ApiResponse> {
        let start = Instant::now();
        let method = prepared.record.method.as_str();
        let mut retries = 0u32;

        loop {
            let failure = match self.attempt(prepared).await {
                Ok(response) if response.is_success() => {
                    metrics::record_request(method, response.status, start);
                    return Ok(response);
                }
                Ok(response) => AttemptFailure::Status(response),
                Err(message) => AttemptFailure::Network(message),
            };

            let next = retries + 1;
            if !self.policy.should_retry(next, failure.class()) {
                let status = match &failure {
                    AttemptFailure::Status(response) => response.status,
                    AttemptFailure::Network(_) => 0,
                };
                metrics::record_request(method, status, start);
                return Err(failure.into_error(retries));
            }

            retries = next;
            self.log_retry(prepared, retries, &failure).await;
            metrics::record_retry(method);
            tokio::time::sleep(self.policy.delay_for(retries)).await;
        }
    }

    /// One network round trip. `Err` carries the network error message.
    async fn attempt(&self, prepared: &Prepared) -> Result<ApiResponse, String> {
        let mut builder = self
            .http
            .request(prepared.method.clone(), prepared.url.clone())
            .headers(prepared.headers.clone());
        if !prepared.params.is_empty() {
            builder = builder.query(&prepared.params);
        }
        if let Some(body) = &prepared.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| self.describe(&e))?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let text = response.text().await.map_err(|e| self.describe(&e))?;

        Ok(ApiResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            data: decode_body(&text),
            request: RequestSummary {
                method: prepared.record.method.clone(),
                url: prepared.record.url.clone(),
                params: prepared.params.clone(),
            },
        })
    }

    fn describe(&self, error: &reqwest::Error) -> String {
        if error.is_timeout() {
            return format!("timeout of {}ms exceeded", self.options.timeout.as_millis());
        }
        let mut message = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        message
    }

    async fn log_setup_failed(&self, request: &ApiRequest, error: &ApiError) {
        tracing::error!(error = %error, "Request setup failed");
        self.audit
            .add_log_entry(
                LogLevel::Error,
                "ApiClientRequestSetupFailed",
                Some(json!({
                    "method": request.method.as_str(),
                    "url": request.path,
                    "params": request.params,
                    "data": request.body,
                    "error": error.to_string(),
                })),
            )
            .await;
    }

    async fn log_sent(&self, prepared: &Prepared) {
        tracing::debug!(url = %prepared.record.url, "Sending request");
        self.audit
            .add_log_entry(
                LogLevel::Debug,
                "ApiClientRequestSent",
                Some(json!({
                    "method": prepared.record.method,
                    "url": prepared.record.url,
                    "headers": prepared.record.headers,
                    "params": prepared.record.params,
                    "data": prepared.record.data,
                })),
            )
            .await;
    }

    async fn log_retry(&self, prepared: &Prepared, attempt: u32, failure: &AttemptFailure) {
        let message = failure.message();
        tracing::warn!(
            url = %prepared.record.url,
            attempt,
            error = %message,
            "Retrying request"
        );

        let (response_data, response_status) = match failure {
            AttemptFailure::Status(response) => (response.data.clone(), json!(response.status)),
            AttemptFailure::Network(_) => (Value::Null, Value::Null),
        };
        self.audit
            .add_log_entry(
                LogLevel::Warning,
                "ApiClientRetry",
                Some(json!({
                    "url": prepared.record.url,
                    "method": prepared.record.method,
                    "attempt": attempt,
                    "error": message,
                    "responseData": response_data,
                    "responseStatus": response_status,
                })),
            )
            .await;
    }

    async fn log_outcome(&self, prepared: &Prepared, result: &ApiResult<ApiResponse>) {
        match result {
            Ok(response) => {
                tracing::debug!(status = response.status, "Response received");
                self.audit
                    .add_log_entry(
                        LogLevel::Debug,
                        "ApiClientResponseReceived",
                        Some(json!({
                            "status": response.status,
                            "statusText": response.status_text,
                            "headers": response.headers,
                            "data": response.data,
                            "request": response.request,
                        })),
                    )
                    .await;
            }
            Err(error) => {
                tracing::error!(
                    url = %prepared.record.url,
                    retries = error.retries(),
                    error = %error,
                    "Request failed"
                );
                let response = error.response();
                self.audit
                    .add_log_entry(
                        LogLevel::Error,
                        "ApiClientRequestFailed",
                        Some(json!({
                            "url": prepared.record.url,
                            "method": prepared.record.method,
                            "params": prepared.record.params,
                            "data": prepared.record.data,
                            "error": error.to_string(),
                            "responseData": response.map(|r| r.data.clone()),
                            "responseStatus": error.status(),
                            "headers": response.map(|r| r.headers.clone()),
                        })),
                    )
                    .await;
            }
        }
    }
}

/// Resolve `path` against `base`.
///
/// Absolute `http(s)` URLs are used as-is, an empty path targets the base
/// itself, anything else is appended to the base path.
pub fn resolve_url(base: &Url, path: &str) -> ApiResult<Url> {
    let invalid = |target: &str, e: url::ParseError| {
        ApiError::Setup(format!("Invalid URL '{}': {}", target, e))
    };

    if path.starts_with("http://") || path.starts_with("https://") {
        return Url::parse(path).map_err(|e| invalid(path, e));
    }
    if path.is_empty() {
        return Ok(base.clone());
    }

    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined).map_err(|e| invalid(&joined, e))
}

fn redacted_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            let shown = if name == AUTHORIZATION {
                REDACTED.to_string()
            } else {
                value.to_str().unwrap_or_default().to_string()
            };
            (name.as_str().to_string(), shown)
        })
        .collect()
}

fn decode_body(text: &str) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
