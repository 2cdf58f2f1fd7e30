//! Request/response records and the client error type.

use std::collections::BTreeMap;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// An outbound call, before URL resolution.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Absolute `http(s)` URL or a path relative to the client's base URL.
    pub path: String,
    pub params: BTreeMap<String, String>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            params: BTreeMap::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            params: BTreeMap::new(),
            body: Some(body),
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn params(mut self, params: BTreeMap<String, String>) -> Self {
        self.params.extend(params);
        self
    }
}

/// What was sent, as it appears in audit payloads.
#[derive(Debug, Clone, Serialize)]
pub struct RequestRecord {
    pub method: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub params: BTreeMap<String, String>,
    pub data: Option<Value>,
}

/// The originating request, carried by a response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestSummary {
    pub method: String,
    pub url: String,
    pub params: BTreeMap<String, String>,
}

/// A received response with its body decoded.
///
/// `data` is the JSON body, or the raw text when the body is not JSON, or
/// `null` when it is empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    pub data: Value,
    pub request: RequestSummary,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Deserialize the body into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data)
    }
}

/// Error type for outbound calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be built; nothing was sent.
    #[error("Request setup failed: {0}")]
    Setup(String),

    /// The server answered with a non-2xx status.
    #[error("Request failed with status code {status}")]
    Status {
        status: u16,
        response: Box<ApiResponse>,
        retries: u32,
    },

    /// No response was received (connect, DNS, timeout, body read).
    #[error("{message}")]
    Network { message: String, retries: u32 },
}

impl ApiError {
    /// Response status, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The last response, if one was received.
    pub fn response(&self) -> Option<&ApiResponse> {
        match self {
            ApiError::Status { response, .. } => Some(response),
            _ => None,
        }
    }

    /// Retries made before giving up.
    pub fn retries(&self) -> u32 {
        match self {
            ApiError::Setup(_) => 0,
            ApiError::Status { retries, .. } | ApiError::Network { retries, .. } => *retries,
        }
    }
}

/// Result type for outbound calls.
pub type ApiResult<T> = Result<T, ApiError>;
