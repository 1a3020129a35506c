//! SQLite sink with upsert semantics keyed on the IMDb id and actor name.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, params};

use super::{MovieSink, SinkError};
use crate::domain::Movie;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS movies (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        imdb_id TEXT NOT NULL UNIQUE,
        title TEXT NOT NULL,
        year INTEGER NOT NULL,
        rating REAL NOT NULL,
        duration_minutes INTEGER,
        metascore INTEGER
    );

    CREATE TABLE IF NOT EXISTS actors (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS movie_actor (
        movie_id INTEGER NOT NULL REFERENCES movies(id),
        actor_id INTEGER NOT NULL REFERENCES actors(id),
        PRIMARY KEY (movie_id, actor_id)
    );
"#;

/// Row counts per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCounts {
    pub movies: u64,
    pub actors: u64,
    pub links: u64,
}

pub struct SqliteSink {
    conn: Mutex<Connection>,
}

impl SqliteSink {
    /// Open (or create) the database file and make sure the schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| SinkError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        log::info!("writing SQLite output to {}", path.display());
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self, SinkError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, SinkError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn counts(&self) -> Result<TableCounts, SinkError> {
        let conn = self.conn.lock().map_err(|_| SinkError::Poisoned("sqlite"))?;
        let count = |table: &str| -> Result<u64, rusqlite::Error> {
            conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|n| n as u64)
        };
        Ok(TableCounts {
            movies: count("movies")?,
            actors: count("actors")?,
            links: count("movie_actor")?,
        })
    }
}

impl MovieSink for SqliteSink {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn save(&self, movie: &Movie) -> Result<(), SinkError> {
        let mut conn = self.conn.lock().map_err(|_| SinkError::Poisoned("sqlite"))?;
        let tx = conn.transaction()?;

        let movie_id: i64 = tx.query_row(
            "INSERT INTO movies (imdb_id, title, year, rating, duration_minutes, metascore)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(imdb_id) DO UPDATE SET
                title = excluded.title,
                year = excluded.year,
                rating = excluded.rating,
                duration_minutes = excluded.duration_minutes,
                metascore = excluded.metascore
             RETURNING id",
            params![
                movie.imdb_id(),
                movie.title(),
                movie.year(),
                f64::from(movie.rating()),
                movie.duration_minutes(),
                movie.metascore(),
            ],
            |row| row.get(0),
        )?;

        for actor in movie.actors() {
            tx.execute(
                "INSERT INTO actors (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
                params![actor.name],
            )?;
            let actor_id: i64 = tx.query_row(
                "SELECT id FROM actors WHERE name = ?1",
                params![actor.name],
                |row| row.get(0),
            )?;
            tx.execute(
                "INSERT OR IGNORE INTO movie_actor (movie_id, actor_id) VALUES (?1, ?2)",
                params![movie_id, actor_id],
            )?;
        }

        tx.commit()?;
        Ok(())
    }
}
