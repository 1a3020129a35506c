use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

pub const MIN_YEAR: i32 = 1888;
pub const MAX_YEAR: i32 = 2030;

static IMDB_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^tt\d{7,}$").expect("invalid imdb id regex"));

/// Validation failures raised while building domain records.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("invalid IMDb id '{0}'")]
    InvalidImdbId(String),
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("invalid year {0}, expected {MIN_YEAR}..={MAX_YEAR}")]
    InvalidYear(i32),
    #[error("invalid rating {0}, expected 0.0..=10.0")]
    InvalidRating(f32),
    #[error("duration must be positive")]
    InvalidDuration,
    #[error("invalid metascore {0}, expected 0..=100")]
    InvalidMetascore(u32),
    #[error("actor name must not be empty")]
    EmptyActorName,
    #[error("{field} must be a positive integer")]
    NonPositiveId { field: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub id: Option<u32>,
    pub name: String,
}

impl Actor {
    pub fn new(id: Option<u32>, name: &str) -> Result<Self, ModelError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ModelError::EmptyActorName);
        }
        Ok(Self {
            id,
            name: name.to_string(),
        })
    }
}

/// Unvalidated fields scraped from a title page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovieDraft {
    pub id: Option<u32>,
    pub imdb_id: String,
    pub title: String,
    pub year: i32,
    pub rating: f32,
    pub duration_minutes: Option<u32>,
    pub metascore: Option<u32>,
    pub actors: Vec<Actor>,
}

/// A validated movie record.
///
/// Only constructible through [`Movie::new`], so every instance satisfies the
/// field constraints (id format, year range, rating bounds and so on).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Movie {
    id: Option<u32>,
    imdb_id: String,
    title: String,
    year: i32,
    rating: f32,
    duration_minutes: Option<u32>,
    metascore: Option<u8>,
    actors: Vec<Actor>,
}

impl Movie {
    pub fn new(draft: MovieDraft) -> Result<Self, ModelError> {
        let imdb_id = draft.imdb_id.trim().to_string();
        if !IMDB_ID_RE.is_match(&imdb_id) {
            return Err(ModelError::InvalidImdbId(imdb_id));
        }

        let title = draft.title.trim().to_string();
        if title.is_empty() {
            return Err(ModelError::EmptyTitle);
        }

        if !(MIN_YEAR..=MAX_YEAR).contains(&draft.year) {
            return Err(ModelError::InvalidYear(draft.year));
        }

        if !(0.0..=10.0).contains(&draft.rating) {
            return Err(ModelError::InvalidRating(draft.rating));
        }

        if draft.duration_minutes == Some(0) {
            return Err(ModelError::InvalidDuration);
        }

        let metascore = match draft.metascore {
            Some(score) if score > 100 => return Err(ModelError::InvalidMetascore(score)),
            Some(score) => Some(score as u8),
            None => None,
        };

        Ok(Self {
            id: draft.id,
            imdb_id,
            title,
            year: draft.year,
            rating: draft.rating,
            duration_minutes: draft.duration_minutes,
            metascore,
            actors: draft.actors,
        })
    }

    pub fn id(&self) -> Option<u32> {
        self.id
    }

    pub fn imdb_id(&self) -> &str {
        &self.imdb_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn rating(&self) -> f32 {
        self.rating
    }

    pub fn duration_minutes(&self) -> Option<u32> {
        self.duration_minutes
    }

    pub fn metascore(&self) -> Option<u8> {
        self.metascore
    }

    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    /// Movie/actor links for every actor carrying a local id.
    pub fn relations(&self) -> Result<Vec<MovieActor>, ModelError> {
        let Some(movie_id) = self.id else {
            return Ok(Vec::new());
        };
        self.actors
            .iter()
            .filter_map(|actor| actor.id)
            .map(|actor_id| MovieActor::new(movie_id, actor_id))
            .collect()
    }
}

/// N:M link between a movie and an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MovieActor {
    pub movie_id: u32,
    pub actor_id: u32,
}

impl MovieActor {
    pub fn new(movie_id: u32, actor_id: u32) -> Result<Self, ModelError> {
        if movie_id == 0 {
            return Err(ModelError::NonPositiveId { field: "movie_id" });
        }
        if actor_id == 0 {
            return Err(ModelError::NonPositiveId { field: "actor_id" });
        }
        Ok(Self { movie_id, actor_id })
    }
}
