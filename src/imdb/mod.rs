//! IMDb top-chart scraping: id collection, title-page parsing and the
//! bounded worker pipeline that feeds the sinks.

pub mod driver;
pub mod graphql;
pub mod parser;

pub use driver::{ImdbScraper, ScrapeError, ScrapeSummary};
pub use graphql::{ChartQuery, chart_query_headers, parse_chart_ids};
pub use parser::{ParseError, dedupe, extract_chart_ids, parse_duration, parse_title_page};
