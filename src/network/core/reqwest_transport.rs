//! Reqwest-based implementation of the `HttpTransport` trait.
//!
//! Clients are pooled per proxy route. Proxied routes never keep idle
//! connections: a Tor circuit is bound to its SOCKS connection, so every
//! request must open a fresh one to pick up a new identity after NEWNYM.
//! No client keeps a cookie jar; session cookies are replayed explicitly.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Proxy};
use tokio::sync::Mutex;

use super::transport::{HttpTransport, TransportError};
use super::types::{FetchResponse, OutboundRequest, ProxyRoute};

/// Reqwest client pool keyed by proxy route (`None` = direct connection).
struct ClientPool {
    clients: Mutex<HashMap<Option<ProxyRoute>, Client>>,
}

impl ClientPool {
    fn new() -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
        }
    }

    async fn client(&self, route: Option<&ProxyRoute>) -> Result<Client, TransportError> {
        let mut guard = self.clients.lock().await;
        let key = route.cloned();
        if let Some(client) = guard.get(&key) {
            return Ok(client.clone());
        }

        let mut builder = Client::builder();
        if let Some(route) = route {
            builder = builder
                .pool_max_idle_per_host(0)
                .proxy(Proxy::http(&route.http).map_err(|err| TransportError::Proxy(err.to_string()))?)
                .proxy(
                    Proxy::https(&route.https)
                        .map_err(|err| TransportError::Proxy(err.to_string()))?,
                );
        }

        let client = builder
            .build()
            .map_err(|err| TransportError::Other(err.to_string()))?;
        guard.insert(key, client.clone());
        Ok(client)
    }
}

/// Production transport backed by `reqwest`.
pub struct ReqwestTransport {
    pool: ClientPool,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            pool: ClientPool::new(),
        }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(
        &self,
        request: &OutboundRequest,
        route: Option<&ProxyRoute>,
        timeout: Duration,
    ) -> Result<FetchResponse, TransportError> {
        let client = self.pool.client(route).await?;

        let mut builder = client
            .request(request.method.clone(), request.url.as_str())
            .headers(request.headers.clone())
            .timeout(timeout);
        if let Some(ref payload) = request.json {
            builder = builder.json(payload);
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let url = response.url().clone();
        let body = response
            .bytes()
            .await
            .map_err(|err| TransportError::Body(err.to_string()))?;

        Ok(FetchResponse::new(status, headers, body, url))
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else if err.is_body() || err.is_decode() {
        TransportError::Body(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}
