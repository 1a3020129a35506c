//! # imdb-scraper-rs
//!
//! Scrapes the IMDb top chart through a resilient acquisition layer that
//! survives blocking, rate limiting and flaky proxies.
//!
//! ## Features
//!
//! - Proxy-first requests with Tor fallback, or Tor-only mode
//! - Bounded retries with an escalating backoff schedule
//! - Tor exit-identity rotation over the control port on block statuses
//! - User-Agent rotation per attempt
//! - Chart ids from both the HTML chart and the GraphQL endpoint
//! - CSV and SQLite sinks
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use imdb_scraper_rs::{CsvSink, ImdbScraper, ResilientExecutor, ScraperConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ScraperConfig::load(None)?;
//!     let executor = Arc::new(ResilientExecutor::from_config(&config)?);
//!     let sink = Arc::new(CsvSink::create("data")?);
//!
//!     let summary = ImdbScraper::new(&config, executor, sink).scrape().await?;
//!     println!("saved {} of {} titles", summary.saved, summary.requested);
//!     Ok(())
//! }
//! ```

mod executor;

pub mod config;
pub mod domain;
pub mod imdb;
pub mod modules;
pub mod network;
pub mod persistence;

pub use crate::executor::{
    ExecutorError,
    ExecutorResult,
    ExecutorSettings,
    ResilientExecutor,
    ResilientExecutorBuilder,
};

pub use crate::config::{ConfigError, ScraperConfig};

pub use crate::domain::{Actor, ModelError, Movie, MovieActor, MovieDraft};

pub use crate::imdb::{ImdbScraper, ParseError, ScrapeError, ScrapeSummary};

pub use crate::network::core::{
    AttemptOutcome,
    FetchResponse,
    HttpTransport,
    NetworkIdentity,
    OutboundRequest,
    ProxyRoute,
    ReqwestTransport,
    RequestAttempt,
    RetryPolicy,
    Strategy,
    TransportError,
};

pub use crate::network::user_agents::{UserAgentError, UserAgentPool};

pub use crate::modules::{
    ControlChannel,
    ControlError,
    EventDispatcher,
    EventHandler,
    IdentityRotator,
    LoggingHandler,
    NetworkEvent,
    ProxyLocation,
    ProxyProvider,
    ProxySource,
    TorControlClient,
    TorRotator,
};

pub use crate::persistence::{CompositeSink, CsvSink, MovieSink, SinkError, SqliteSink};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
