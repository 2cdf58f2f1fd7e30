//! Outbound HTTP.
//!
//! # Data Flow
//! ```text
//! ApiRequest
//!     → api_client.rs prepare (URL resolution, headers)   ── ApiClientRequestSetupFailed
//!     → log sent                                          ── ApiClientRequestSent
//!     → execute with retry (resilience::retries)          ── ApiClientRetry × n
//!     → log outcome                                       ── ApiClientResponseReceived
//!                                                            | ApiClientRequestFailed
//! ```

pub mod api_client;
pub mod types;

pub use api_client::{resolve_url, ApiClient, ClientOptions};
pub use types::{ApiError, ApiRequest, ApiResponse, ApiResult, RequestRecord, RequestSummary};
