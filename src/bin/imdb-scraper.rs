//! Command-line entry point: load configuration, wire the acquisition layer
//! once, scrape the chart and write the configured sinks.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use imdb_scraper_rs::{
    CompositeSink, CsvSink, ImdbScraper, ResilientExecutor, ScraperConfig, SqliteSink, VERSION,
};

#[derive(Parser, Debug)]
#[command(name = "imdb-scraper", version)]
#[command(about = "Scrape the IMDb top chart through proxies and Tor")]
struct Args {
    /// JSON configuration file (defaults are used for missing fields)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Default log level, overridable through RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Route every request through Tor only
    #[arg(long)]
    tor_only: bool,

    /// Number of titles to scrape
    #[arg(short, long)]
    num_movies: Option<usize>,

    /// Concurrent title fetches
    #[arg(short = 'w', long)]
    max_workers: Option<usize>,

    /// Directory for the CSV files
    #[arg(long)]
    csv_dir: Option<PathBuf>,

    /// Skip CSV output
    #[arg(long)]
    no_csv: bool,

    /// SQLite database file
    #[arg(long)]
    sqlite: Option<PathBuf>,
}

fn init_logging(level: &str) {
    let default = format!("{level},reqwest=warn,hyper=warn,html5ever=warn,selectors=warn");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();
}

fn build_config(args: &Args) -> Result<ScraperConfig> {
    let mut config = ScraperConfig::load(args.config.as_deref()).context("loading configuration")?;

    if args.tor_only {
        config.network.use_tor = true;
    }
    if let Some(num_movies) = args.num_movies {
        config.target.num_movies = num_movies;
    }
    if let Some(max_workers) = args.max_workers {
        config.scraper.max_workers = max_workers;
    }
    if args.no_csv {
        config.output.csv_dir = None;
    } else if let Some(ref dir) = args.csv_dir {
        config.output.csv_dir = Some(dir.clone());
    }
    if let Some(ref path) = args.sqlite {
        config.output.sqlite_path = Some(path.clone());
    }

    config.validate().context("validating command-line overrides")?;
    Ok(config)
}

fn build_sink(config: &ScraperConfig) -> Result<(CompositeSink, Option<Arc<SqliteSink>>)> {
    let mut sink = CompositeSink::new();
    if let Some(ref dir) = config.output.csv_dir {
        let csv = CsvSink::create(dir).with_context(|| format!("creating CSV output in {}", dir.display()))?;
        sink = sink.with_sink(Arc::new(csv));
    }

    let mut sqlite = None;
    if let Some(ref path) = config.output.sqlite_path {
        let db = Arc::new(
            SqliteSink::open(path).with_context(|| format!("opening SQLite database {}", path.display()))?,
        );
        sink = sink.with_sink(db.clone());
        sqlite = Some(db);
    }

    if sink.is_empty() {
        bail!("no output configured: enable CSV output or pass --sqlite");
    }
    Ok((sink, sqlite))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);
    log::info!("imdb-scraper {VERSION}");

    let config = build_config(&args)?;
    if config.network.use_tor {
        log::info!("mode: Tor only via {}:{}", config.tor.host, config.tor.socks_port);
    } else {
        log::info!("mode: proxy first, Tor fallback");
    }

    let (sink, sqlite) = build_sink(&config)?;
    let executor = Arc::new(ResilientExecutor::from_config(&config).context("building request executor")?);
    let scraper = ImdbScraper::new(&config, executor, Arc::new(sink));

    let summary = scraper.scrape().await?;
    println!(
        "saved {}/{} titles, traffic used: {:.2} MB",
        summary.saved,
        summary.requested,
        summary.megabytes_used()
    );

    if let Some(db) = sqlite {
        let counts = db.counts()?;
        log::info!(
            "sqlite totals: {} movies, {} actors, {} links",
            counts.movies,
            counts.actors,
            counts.links
        );
    }
    Ok(())
}
