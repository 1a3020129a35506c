use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use csv::Writer;

use super::{MovieSink, SinkError};
use crate::domain::Movie;

pub const MOVIES_FILE: &str = "movies.csv";
pub const ACTORS_FILE: &str = "actors.csv";
pub const MOVIE_ACTOR_FILE: &str = "movie_actor.csv";

const MOVIE_HEADERS: [&str; 8] = [
    "id",
    "imdb_id",
    "title",
    "year",
    "rating",
    "duration_minutes",
    "metascore",
    "actors",
];
const ACTOR_HEADERS: [&str; 2] = ["id", "name"];
const MOVIE_ACTOR_HEADERS: [&str; 2] = ["movie_id", "actor_id"];

struct CsvWriters {
    movies: Writer<File>,
    actors: Writer<File>,
    links: Writer<File>,
}

/// Writes `movies.csv`, `actors.csv` and `movie_actor.csv` into one directory.
///
/// Files are truncated and given their header row on creation.
pub struct CsvSink {
    dir: PathBuf,
    writers: Mutex<CsvWriters>,
}

impl CsvSink {
    pub fn create(dir: impl AsRef<Path>) -> Result<Self, SinkError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| SinkError::Io {
            path: dir.clone(),
            source,
        })?;

        let writers = CsvWriters {
            movies: open_with_headers(&dir.join(MOVIES_FILE), &MOVIE_HEADERS)?,
            actors: open_with_headers(&dir.join(ACTORS_FILE), &ACTOR_HEADERS)?,
            links: open_with_headers(&dir.join(MOVIE_ACTOR_FILE), &MOVIE_ACTOR_HEADERS)?,
        };
        log::info!("writing CSV output to {}", dir.display());

        Ok(Self {
            dir,
            writers: Mutex::new(writers),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn open_with_headers(path: &Path, headers: &[&str]) -> Result<Writer<File>, SinkError> {
    let file = File::create(path).map_err(|source| SinkError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = Writer::from_writer(file);
    writer.write_record(headers)?;
    writer.flush().map_err(|source| SinkError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(writer)
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

impl MovieSink for CsvSink {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn save(&self, movie: &Movie) -> Result<(), SinkError> {
        let relations = movie.relations()?;
        let mut writers = self.writers.lock().map_err(|_| SinkError::Poisoned("csv"))?;

        let actor_names = movie
            .actors()
            .iter()
            .map(|actor| actor.name.as_str())
            .collect::<Vec<_>>()
            .join(",");
        writers.movies.write_record([
            optional(movie.id()),
            movie.imdb_id().to_string(),
            movie.title().to_string(),
            movie.year().to_string(),
            movie.rating().to_string(),
            optional(movie.duration_minutes()),
            optional(movie.metascore()),
            actor_names,
        ])?;

        for actor in movie.actors() {
            writers
                .actors
                .write_record([optional(actor.id), actor.name.clone()])?;
        }
        for link in &relations {
            writers
                .links
                .write_record([link.movie_id.to_string(), link.actor_id.to_string()])?;
        }

        let CsvWriters {
            movies,
            actors,
            links,
        } = &mut *writers;
        for writer in [movies, actors, links] {
            writer.flush().map_err(|source| SinkError::Io {
                path: self.dir.clone(),
                source,
            })?;
        }
        Ok(())
    }
}
