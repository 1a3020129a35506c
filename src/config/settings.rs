//! Process-wide scraper configuration.
//!
//! The configuration is static for a run: it is loaded once (JSON file plus
//! environment overrides), validated, and then handed to the components that
//! need it. Misconfiguration is the only error class that is allowed to
//! propagate out of the network layer.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::network::core::ProxyRoute;

const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 Chrome/88.0.4324.96 Safari/537.36",
    "Mozilla/5.0 (Linux; Android 6.0; Nexus 5) AppleWebKit/537.36 Chrome/90.0.4430.91 Mobile Safari/537.36",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("config file {path:?} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Root configuration object.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub target: TargetSettings,
    pub network: NetworkSettings,
    pub tor: TorSettings,
    pub retry: RetrySettings,
    pub scraper: ScraperSettings,
    pub output: OutputSettings,
}

/// Endpoints of the movie database.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TargetSettings {
    pub base_url: String,
    pub chart_path: String,
    /// Detail page path, `{id}` is replaced with the title identifier.
    pub title_path: String,
    pub graphql_url: String,
    pub graphql_hash: String,
    pub graphql_operation: String,
    pub graphql_locale: String,
    pub graphql_version: u32,
    pub num_movies: usize,
}

impl Default for TargetSettings {
    fn default() -> Self {
        Self {
            base_url: "https://www.imdb.com".into(),
            chart_path: "/chart/top/".into(),
            title_path: "/title/{id}/".into(),
            graphql_url: "https://caching.graphql.imdb.com/".into(),
            graphql_hash: "2db1d515844c69836ea8dc532d5bff27684fdce990c465ebf52d36d185a187b3"
                .into(),
            graphql_operation: "Top250MoviesPagination".into(),
            graphql_locale: "en-US".into(),
            graphql_version: 1,
            num_movies: 150,
        }
    }
}

impl TargetSettings {
    pub fn chart_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.chart_path)
    }

    pub fn title_url(&self, imdb_id: &str) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.title_path.replace("{id}", imdb_id)
        )
    }
}

/// Strategy switches, proxy credentials and request shaping.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    /// Route every request through Tor only.
    pub use_tor: bool,
    pub use_custom_proxy: bool,
    pub proxy_host: Option<String>,
    pub proxy_port: Option<u16>,
    pub proxy_user: Option<String>,
    pub proxy_pass: Option<String>,
    pub proxy_list: Vec<String>,
    pub request_timeout_secs: f64,
    pub ip_info_url: String,
    /// Look up the apparent identity (proxy location / Tor exit IP) before each attempt.
    pub log_identity: bool,
    pub user_agents: Vec<String>,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            use_tor: false,
            use_custom_proxy: false,
            proxy_host: None,
            proxy_port: None,
            proxy_user: None,
            proxy_pass: None,
            proxy_list: Vec::new(),
            request_timeout_secs: 10.0,
            ip_info_url: "https://ipinfo.io/json".into(),
            log_identity: true,
            user_agents: DEFAULT_USER_AGENTS.iter().map(|ua| ua.to_string()).collect(),
        }
    }
}

impl NetworkSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.request_timeout_secs)
    }
}

/// Local Tor daemon endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TorSettings {
    pub host: String,
    pub socks_port: u16,
    pub control_port: u16,
    pub control_password: Option<String>,
    pub settle_secs: f64,
    pub rotation_max_retries: u32,
}

impl Default for TorSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            socks_port: 9050,
            control_port: 9051,
            control_password: None,
            settle_secs: 10.0,
            rotation_max_retries: 3,
        }
    }
}

impl TorSettings {
    /// SOCKS route with remote DNS resolution, used for both schemes.
    pub fn proxy_route(&self) -> ProxyRoute {
        ProxyRoute::both(format!("socks5h://{}:{}", self.host, self.socks_port))
    }

    pub fn settle(&self) -> Duration {
        Duration::from_secs_f64(self.settle_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub delays_secs: Vec<f64>,
    pub block_codes: Vec<u16>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delays_secs: vec![1.0, 3.0, 5.0],
            block_codes: vec![202, 403, 429, 503],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScraperSettings {
    pub max_workers: usize,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self { max_workers: 8 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub csv_dir: Option<PathBuf>,
    pub sqlite_path: Option<PathBuf>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            csv_dir: Some(PathBuf::from("data")),
            sqlite_path: None,
        }
    }
}

impl ScraperConfig {
    /// Parse a JSON document; missing fields keep their defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Load from an optional file, apply environment overrides, validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_json_str(&raw).map_err(|source| ConfigError::Json {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Override credentials and mode switches from a variable lookup.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let net = &mut self.network;
        if let Some(host) = lookup("PROXY_HOST") {
            net.proxy_host = Some(host);
        }
        if let Some(port) = lookup("PROXY_PORT").and_then(|raw| raw.trim().parse().ok()) {
            net.proxy_port = Some(port);
        }
        if let Some(user) = lookup("PROXY_USER") {
            net.proxy_user = Some(user);
        }
        if let Some(pass) = lookup("PROXY_PASS") {
            net.proxy_pass = Some(pass);
        }
        if let Some(flag) = lookup("USE_TOR").and_then(|raw| parse_flag(&raw)) {
            net.use_tor = flag;
        }
        if let Some(flag) = lookup("USE_CUSTOM_PROXY").and_then(|raw| parse_flag(&raw)) {
            net.use_custom_proxy = flag;
        }
        if let Some(host) = lookup("TOR_HOST") {
            self.tor.host = host;
        }
        if let Some(password) = lookup("TOR_CONTROL_PASSWORD") {
            self.tor.control_password = Some(password);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_retries == 0 {
            return Err(ConfigError::Invalid("retry.max_retries must be at least 1".into()));
        }
        if self.retry.delays_secs.is_empty() {
            return Err(ConfigError::Invalid("retry.delays_secs cannot be empty".into()));
        }
        if self
            .retry
            .delays_secs
            .iter()
            .any(|delay| !delay.is_finite() || *delay < 0.0)
        {
            return Err(ConfigError::Invalid(
                "retry.delays_secs entries must be finite and non-negative".into(),
            ));
        }
        if self.network.user_agents.is_empty() {
            return Err(ConfigError::Invalid("network.user_agents cannot be empty".into()));
        }
        if !self.network.request_timeout_secs.is_finite() || self.network.request_timeout_secs <= 0.0 {
            return Err(ConfigError::Invalid(
                "network.request_timeout_secs must be positive".into(),
            ));
        }
        if !self.tor.settle_secs.is_finite() || self.tor.settle_secs < 0.0 {
            return Err(ConfigError::Invalid("tor.settle_secs must be non-negative".into()));
        }
        if self.scraper.max_workers == 0 {
            return Err(ConfigError::Invalid("scraper.max_workers must be at least 1".into()));
        }
        if !self.target.title_path.contains("{id}") {
            return Err(ConfigError::Invalid(
                "target.title_path must contain the {id} placeholder".into(),
            ));
        }
        Url::parse(&self.target.base_url).map_err(|err| {
            ConfigError::Invalid(format!("target.base_url '{}': {err}", self.target.base_url))
        })?;
        Ok(())
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "y" | "yes" | "true" | "on" => Some(true),
        "0" | "n" | "no" | "false" | "off" => Some(false),
        _ => None,
    }
}
