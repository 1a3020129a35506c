//! Core data structures shared by the identity providers, the transport and
//! the resilient executor.

use std::fmt;

use bytes::Bytes;
use http::header::SET_COOKIE;
use http::{HeaderMap, Method};
use serde::de::DeserializeOwned;
use url::Url;

/// Outbound proxy configuration for both URL schemes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyRoute {
    pub http: String,
    pub https: String,
}

impl ProxyRoute {
    pub fn new(http: impl Into<String>, https: impl Into<String>) -> Self {
        Self {
            http: http.into(),
            https: https.into(),
        }
    }

    /// Same endpoint for both schemes.
    pub fn both(endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        Self {
            http: endpoint.clone(),
            https: endpoint,
        }
    }

    /// Endpoint with any `user:pass@` section removed, safe for logs.
    pub fn redacted(&self) -> String {
        redact_credentials(&self.https)
    }
}

fn redact_credentials(endpoint: &str) -> String {
    match (endpoint.find("://"), endpoint.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}***@{}", &endpoint[..scheme_end + 3], &endpoint[at + 1..])
        }
        _ => endpoint.to_string(),
    }
}

/// Network path a request is routed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Proxy,
    Tor,
}

impl Strategy {
    /// Ordered strategies for the configured mode.
    pub fn sequence(tor_only: bool) -> &'static [Strategy] {
        if tor_only {
            &[Strategy::Tor]
        } else {
            &[Strategy::Proxy, Strategy::Tor]
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Proxy => "proxy",
            Strategy::Tor => "tor",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Concrete outbound configuration selected for one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkIdentity {
    pub strategy: Strategy,
    pub route: Option<ProxyRoute>,
}

impl NetworkIdentity {
    pub fn new(strategy: Strategy, route: Option<ProxyRoute>) -> Self {
        Self { strategy, route }
    }

    /// `"proxy"`, `"tor"`, or `"direct"` when the proxy strategy resolved to no proxy.
    pub fn label(&self) -> &'static str {
        match (self.strategy, &self.route) {
            (Strategy::Tor, _) => "tor",
            (Strategy::Proxy, Some(_)) => "proxy",
            (Strategy::Proxy, None) => "direct",
        }
    }
}

/// Request handed to the transport.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub json: Option<serde_json::Value>,
}

impl OutboundRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            json: None,
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_json(mut self, json: Option<serde_json::Value>) -> Self {
        self.json = json;
        self
    }
}

/// Read-only HTTP response returned to callers of the executor.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    status: u16,
    headers: HeaderMap,
    body: Bytes,
    url: Url,
}

impl FetchResponse {
    pub fn new(status: u16, headers: HeaderMap, body: impl Into<Bytes>, url: Url) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
            url,
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Final URL after redirects.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn bytes(&self) -> Bytes {
        self.body.clone()
    }

    pub fn content_length(&self) -> usize {
        self.body.len()
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// `name=value` pairs announced through `Set-Cookie`.
    pub fn cookies(&self) -> Vec<(String, String)> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|raw| {
                let pair = raw.split(';').next()?.trim();
                let (name, value) = pair.split_once('=')?;
                let name = name.trim();
                if name.is_empty() {
                    return None;
                }
                Some((name.to_string(), value.trim().to_string()))
            })
            .collect()
    }

    /// Cookies formatted for replay in a `Cookie` request header.
    pub fn cookie_header(&self) -> Option<String> {
        let cookies = self.cookies();
        if cookies.is_empty() {
            return None;
        }
        Some(
            cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// Outcome of a single HTTP call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Response(u16),
    Failed(&'static str),
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptOutcome::Response(status) => write!(f, "status {status}"),
            AttemptOutcome::Failed(kind) => write!(f, "{kind} error"),
        }
    }
}

/// One HTTP call made on behalf of a logical request.
#[derive(Debug, Clone)]
pub struct RequestAttempt {
    pub method: Method,
    pub url: Url,
    pub strategy: Strategy,
    pub identity: String,
    pub attempt: u32,
    pub max_attempts: u32,
    pub outcome: AttemptOutcome,
}
