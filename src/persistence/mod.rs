//! Output sinks for validated movies.
//!
//! Sinks are synchronous and serialise their own writes; the driver calls
//! them from blocking tasks so worker concurrency never interleaves rows.

pub mod csv;
pub mod sqlite;

use std::sync::Arc;

use thiserror::Error;

use crate::domain::{ModelError, Movie};

pub use self::csv::CsvSink;
pub use self::sqlite::{SqliteSink, TableCounts};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink I/O failed for {path:?}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("csv write failed: {0}")]
    Csv(#[from] ::csv::Error),
    #[error("sqlite write failed: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("invalid relation: {0}")]
    Model(#[from] ModelError),
    #[error("{0} sink lock poisoned")]
    Poisoned(&'static str),
}

/// Destination for scraped movies, their actors and the links between them.
pub trait MovieSink: Send + Sync {
    fn name(&self) -> &'static str;

    fn save(&self, movie: &Movie) -> Result<(), SinkError>;
}

/// Fans one movie out to several sinks.
///
/// Every sink is attempted; the first failure is returned after the rest ran.
#[derive(Default, Clone)]
pub struct CompositeSink {
    sinks: Vec<Arc<dyn MovieSink>>,
}

impl CompositeSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: Arc<dyn MovieSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl MovieSink for CompositeSink {
    fn name(&self) -> &'static str {
        "composite"
    }

    fn save(&self, movie: &Movie) -> Result<(), SinkError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(err) = sink.save(movie) {
                log::error!("{} sink failed for {}: {err}", sink.name(), movie.imdb_id());
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
