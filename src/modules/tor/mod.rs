//! Tor exit-identity rotation.
//!
//! A rotation only counts once the exit IP observed through the Tor route
//! actually changes; a successful NEWNYM acknowledgement alone is not enough
//! because Tor may hand back a circuit through the same exit node.

pub mod control;

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::Method;
use serde::Deserialize;
use tokio::time::sleep;
use url::Url;

use crate::config::ScraperConfig;
use crate::network::core::{HttpTransport, OutboundRequest, ProxyRoute};

pub use control::{ControlChannel, ControlError, TorControlClient};

/// Controls the exit identity of the anonymizing network.
#[async_trait]
pub trait IdentityRotator: Send + Sync {
    /// Current exit IP, or an empty string when it cannot be determined.
    async fn get_current_ip(&self) -> String;

    /// Request a new identity; returns the new IP, the unchanged original IP,
    /// or an empty string when no baseline could be established.
    async fn rotate_ip(&self) -> String;
}

#[derive(Debug, Deserialize)]
struct IpEcho {
    ip: Option<String>,
}

/// Tor-backed rotator: IP echo through the SOCKS route, NEWNYM via the control port.
pub struct TorRotator {
    transport: Arc<dyn HttpTransport>,
    control: Arc<dyn ControlChannel>,
    route: ProxyRoute,
    ip_echo_url: String,
    timeout: Duration,
    settle: Duration,
    max_retries: u32,
}

impl TorRotator {
    pub fn new(
        config: &ScraperConfig,
        transport: Arc<dyn HttpTransport>,
        control: Arc<dyn ControlChannel>,
    ) -> Self {
        Self {
            transport,
            control,
            route: config.tor.proxy_route(),
            ip_echo_url: config.network.ip_info_url.clone(),
            timeout: config.network.request_timeout(),
            settle: config.tor.settle(),
            max_retries: config.tor.rotation_max_retries.max(1),
        }
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn route(&self) -> &ProxyRoute {
        &self.route
    }
}

#[async_trait]
impl IdentityRotator for TorRotator {
    async fn get_current_ip(&self) -> String {
        let url = match Url::parse(&self.ip_echo_url) {
            Ok(url) => url,
            Err(err) => {
                log::warn!("[TOR] invalid IP echo url {}: {err}", self.ip_echo_url);
                return String::new();
            }
        };

        let request = OutboundRequest::new(Method::GET, url);
        match self
            .transport
            .execute(&request, Some(&self.route), self.timeout)
            .await
        {
            Ok(response) if response.status() == 200 => parse_ip(&response.text()),
            Ok(response) => {
                log::warn!("[TOR] IP echo returned status {}", response.status());
                String::new()
            }
            Err(err) => {
                log::warn!("[TOR] could not read current IP: {err}");
                String::new()
            }
        }
    }

    async fn rotate_ip(&self) -> String {
        let original_ip = self.get_current_ip().await;
        log::info!("[TOR] exit IP before rotation: {original_ip}");
        if original_ip.is_empty() {
            log::error!("[TOR] no baseline IP, aborting rotation");
            return String::new();
        }

        for attempt in 1..=self.max_retries {
            log::info!("[TOR] sending NEWNYM ({attempt}/{})", self.max_retries);
            if let Err(err) = self.control.signal_newnym().await {
                log::error!("[TOR] control port unavailable: {err}");
                return original_ip;
            }

            if !self.settle.is_zero() {
                sleep(self.settle).await;
            }

            let new_ip = self.get_current_ip().await;
            if !new_ip.is_empty() && new_ip != original_ip {
                log::info!("[TOR] rotation succeeded: {original_ip} -> {new_ip}");
                return new_ip;
            }
            log::warn!("[TOR] exit IP unchanged (observed {new_ip:?})");
        }

        log::warn!("[TOR] could not rotate exit IP after {} attempts", self.max_retries);
        original_ip
    }
}

/// Accepts `{"ip": "..."}` bodies as well as plain-text echo services.
fn parse_ip(body: &str) -> String {
    if let Ok(echo) = serde_json::from_str::<IpEcho>(body) {
        return echo.ip.unwrap_or_default().trim().to_string();
    }
    let trimmed = body.trim();
    if trimmed.parse::<IpAddr>().is_ok() {
        trimmed.to_string()
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::core::{FetchResponse, TransportError};
    use http::HeaderMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves scripted IP echo bodies; `None` simulates a network failure.
    struct StubEcho {
        bodies: Mutex<Vec<Option<&'static str>>>,
    }

    impl StubEcho {
        fn new(bodies: Vec<Option<&'static str>>) -> Self {
            Self {
                bodies: Mutex::new(bodies.into_iter().rev().collect()),
            }
        }
    }

    #[async_trait]
    impl HttpTransport for StubEcho {
        async fn execute(
            &self,
            request: &OutboundRequest,
            route: Option<&ProxyRoute>,
            _timeout: Duration,
        ) -> Result<FetchResponse, TransportError> {
            assert!(route.is_some(), "IP echo must go through the Tor route");
            let next = self.bodies.lock().unwrap().pop().flatten();
            match next {
                Some(body) => Ok(FetchResponse::new(
                    200,
                    HeaderMap::new(),
                    body.as_bytes().to_vec(),
                    request.url.clone(),
                )),
                None => Err(TransportError::Timeout("stub".into())),
            }
        }
    }

    struct StubControl {
        calls: AtomicUsize,
        fail: bool,
    }

    impl StubControl {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }
    }

    #[async_trait]
    impl ControlChannel for StubControl {
        async fn signal_newnym(&self) -> Result<(), ControlError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ControlError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "refused",
                )))
            } else {
                Ok(())
            }
        }
    }

    fn rotator(echo: StubEcho, control: Arc<StubControl>, max_retries: u32) -> TorRotator {
        TorRotator::new(&ScraperConfig::default(), Arc::new(echo), control)
            .with_settle(Duration::ZERO)
            .with_max_retries(max_retries)
    }

    #[tokio::test]
    async fn returns_new_ip_once_it_changes() {
        let control = StubControl::new(false);
        let echo = StubEcho::new(vec![
            Some(r#"{"ip":"1.1.1.1"}"#),
            Some(r#"{"ip":"1.1.1.1"}"#),
            Some(r#"{"ip":"2.2.2.2"}"#),
        ]);
        let rotator = rotator(echo, control.clone(), 3);

        assert_eq!(rotator.rotate_ip().await, "2.2.2.2");
        assert_eq!(control.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn aborts_without_baseline() {
        let control = StubControl::new(false);
        let rotator = rotator(StubEcho::new(vec![None]), control.clone(), 3);

        assert_eq!(rotator.rotate_ip().await, "");
        assert_eq!(control.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stops_when_control_port_is_down() {
        let control = StubControl::new(true);
        let echo = StubEcho::new(vec![Some("1.1.1.1"), Some("2.2.2.2")]);
        let rotator = rotator(echo, control.clone(), 5);

        assert_eq!(rotator.rotate_ip().await, "1.1.1.1");
        assert_eq!(control.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn keeps_original_after_exhausting_retries() {
        let control = StubControl::new(false);
        let echo = StubEcho::new(vec![
            Some("1.1.1.1"),
            Some("1.1.1.1"),
            None,
            Some("1.1.1.1"),
        ]);
        let rotator = rotator(echo, control.clone(), 3);

        assert_eq!(rotator.rotate_ip().await, "1.1.1.1");
        assert_eq!(control.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn parses_json_and_plain_echo_bodies() {
        assert_eq!(parse_ip(r#"{"ip":"9.9.9.9","city":"X"}"#), "9.9.9.9");
        assert_eq!(parse_ip("203.0.113.7\n"), "203.0.113.7");
        assert_eq!(parse_ip("<html>blocked</html>"), "");
    }
}
