//! Chart-to-sink pipeline.
//!
//! Collects title ids from the chart page and the GraphQL endpoint, then
//! fetches every title page on a bounded pool of tasks and hands validated
//! movies to the sink. A title that cannot be fetched, parsed or validated is
//! logged and skipped; the run itself only fails when no ids are found.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::{ScraperConfig, TargetSettings};
use crate::domain::Movie;
use crate::executor::{ExecutorError, ResilientExecutor};
use crate::persistence::MovieSink;

use super::graphql::{ChartQuery, chart_query_headers, parse_chart_ids};
use super::parser::{dedupe, extract_chart_ids, parse_title_page};

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Executor(#[from] ExecutorError),
    #[error("no title ids could be collected from the chart page or GraphQL")]
    NoIds,
}

/// Totals reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrapeSummary {
    pub requested: usize,
    pub saved: usize,
    pub invalid: usize,
    pub unavailable: usize,
    pub sink_failures: usize,
    pub bytes_used: u64,
}

impl ScrapeSummary {
    pub fn megabytes_used(&self) -> f64 {
        self.bytes_used as f64 / (1024.0 * 1024.0)
    }
}

#[derive(Debug, Default)]
struct RunStats {
    saved: AtomicUsize,
    invalid: AtomicUsize,
    unavailable: AtomicUsize,
    sink_failures: AtomicUsize,
    bytes_used: AtomicU64,
}

/// IMDb top-chart scraper.
#[derive(Clone)]
pub struct ImdbScraper {
    executor: Arc<ResilientExecutor>,
    sink: Arc<dyn MovieSink>,
    target: Arc<TargetSettings>,
    max_workers: usize,
    stats: Arc<RunStats>,
}

impl ImdbScraper {
    pub fn new(config: &ScraperConfig, executor: Arc<ResilientExecutor>, sink: Arc<dyn MovieSink>) -> Self {
        Self {
            executor,
            sink,
            target: Arc::new(config.target.clone()),
            max_workers: config.scraper.max_workers.max(1),
            stats: Arc::new(RunStats::default()),
        }
    }

    pub async fn scrape(&self) -> Result<ScrapeSummary, ScrapeError> {
        log::info!("starting IMDb scrape from {}", self.target.base_url);

        let ids = self.collect_ids().await?;
        if ids.is_empty() {
            log::error!("no title ids from the chart page or GraphQL");
            return Err(ScrapeError::NoIds);
        }
        let requested = ids.len();

        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut tasks = JoinSet::new();
        for (index, imdb_id) in ids.into_iter().enumerate() {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            let scraper = self.clone();
            let movie_id = index as u32 + 1;
            tasks.spawn(async move {
                let _permit = permit;
                scraper.scrape_title(movie_id, imdb_id).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(err)) => log::error!("title task aborted: {err}"),
                Err(err) => log::error!("title task panicked: {err}"),
            }
        }

        let summary = ScrapeSummary {
            requested,
            saved: self.stats.saved.load(Ordering::Relaxed),
            invalid: self.stats.invalid.load(Ordering::Relaxed),
            unavailable: self.stats.unavailable.load(Ordering::Relaxed),
            sink_failures: self.stats.sink_failures.load(Ordering::Relaxed),
            bytes_used: self.stats.bytes_used.load(Ordering::Relaxed),
        };
        log::info!(
            "scrape finished: {}/{} saved, {} invalid, {} unavailable, {} sink failures",
            summary.saved,
            summary.requested,
            summary.invalid,
            summary.unavailable,
            summary.sink_failures
        );
        log::info!("total traffic used by the scraper: {:.2} MB", summary.megabytes_used());
        Ok(summary)
    }

    /// Chart-page ids followed by GraphQL ids, de-duplicated and capped at `num_movies`.
    pub async fn collect_ids(&self) -> Result<Vec<String>, ScrapeError> {
        let mut html_ids = Vec::new();
        let mut cookie = None;

        match self.executor.get(&self.target.chart_url()).await? {
            Some(response) => {
                self.record_bytes(response.content_length());
                html_ids = extract_chart_ids(&response.text());
                cookie = response.cookie_header();
                log::info!("[HTML] collected {} ids", html_ids.len());
            }
            None => log::warn!("[HTML] chart page unavailable"),
        }

        let graphql_ids = self.fetch_graphql_ids(cookie.as_deref()).await?;

        let mut ids = dedupe(html_ids.into_iter().chain(graphql_ids));
        ids.truncate(self.target.num_movies);
        Ok(ids)
    }

    async fn fetch_graphql_ids(&self, cookie: Option<&str>) -> Result<Vec<String>, ScrapeError> {
        let payload = match ChartQuery::from_target(&self.target).to_value() {
            Ok(payload) => payload,
            Err(err) => {
                log::error!("[GraphQL] could not encode payload: {err}");
                return Ok(Vec::new());
            }
        };
        let headers = chart_query_headers(cookie);

        let Some(response) = self
            .executor
            .post_json(&self.target.graphql_url, &payload, Some(&headers))
            .await?
        else {
            log::warn!("[GraphQL] endpoint unavailable");
            return Ok(Vec::new());
        };
        self.record_bytes(response.content_length());

        match parse_chart_ids(&response.bytes()) {
            Ok(ids) => {
                log::info!("[GraphQL] collected {} ids", ids.len());
                Ok(ids)
            }
            Err(err) => {
                log::warn!("[GraphQL] {err}");
                Ok(Vec::new())
            }
        }
    }

    async fn scrape_title(&self, movie_id: u32, imdb_id: String) -> Result<(), ScrapeError> {
        let url = self.target.title_url(&imdb_id);
        let Some(response) = self.executor.get(&url).await? else {
            self.stats.unavailable.fetch_add(1, Ordering::Relaxed);
            log::warn!("skipping {imdb_id}: title page unavailable");
            return Ok(());
        };
        self.record_bytes(response.content_length());

        let movie = match parse_title_page(&response.text(), movie_id, &imdb_id)
            .map_err(|err| err.to_string())
            .and_then(|draft| Movie::new(draft).map_err(|err| err.to_string()))
        {
            Ok(movie) => movie,
            Err(reason) => {
                self.stats.invalid.fetch_add(1, Ordering::Relaxed);
                log::warn!("skipping {imdb_id}: {reason}");
                return Ok(());
            }
        };

        let sink = self.sink.clone();
        let title = movie.title().to_string();
        let saved = tokio::task::spawn_blocking(move || sink.save(&movie)).await;
        match saved {
            Ok(Ok(())) => {
                self.stats.saved.fetch_add(1, Ordering::Relaxed);
                log::info!("saved {imdb_id} ({title})");
            }
            Ok(Err(err)) => {
                self.stats.sink_failures.fetch_add(1, Ordering::Relaxed);
                log::error!("could not save {imdb_id}: {err}");
            }
            Err(err) => {
                self.stats.sink_failures.fetch_add(1, Ordering::Relaxed);
                log::error!("sink task for {imdb_id} failed: {err}");
            }
        }
        Ok(())
    }

    fn record_bytes(&self, bytes: usize) {
        self.stats.bytes_used.fetch_add(bytes as u64, Ordering::Relaxed);
    }
}
