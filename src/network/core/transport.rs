//! Transport abstraction used by the executor and the identity providers.
//!
//! Keeping the HTTP client behind a trait lets the retry state machine be
//! driven by scripted responses in tests.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::types::{FetchResponse, OutboundRequest, ProxyRoute};

/// Contract for sending one HTTP request through an optional proxy route.
///
/// Implementations must honour `timeout` for the whole exchange and must not
/// retry on their own.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(
        &self,
        request: &OutboundRequest,
        route: Option<&ProxyRoute>,
        timeout: Duration,
    ) -> Result<FetchResponse, TransportError>;
}

/// Network-level failure; always retried by the executor.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("proxy configuration rejected: {0}")]
    Proxy(String),
    #[error("failed to read response body: {0}")]
    Body(String),
    #[error("http transport error: {0}")]
    Other(String),
}

impl TransportError {
    /// Short class name used in logs and attempt records.
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::Timeout(_) => "timeout",
            TransportError::Connect(_) => "connect",
            TransportError::Proxy(_) => "proxy",
            TransportError::Body(_) => "body",
            TransportError::Other(_) => "transport",
        }
    }
}
