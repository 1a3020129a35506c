//! Domain records produced by the scraper and consumed by the sinks.

pub mod movie;

pub use movie::{Actor, MAX_YEAR, MIN_YEAR, ModelError, Movie, MovieActor, MovieDraft};
