use serde::{Deserialize, Serialize};

pub type MovieId = u32;
pub type UserId = u32;

/// A movie record from the metadata table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub movie_id: MovieId,
    pub title: String,
    #[serde(default)]
    pub overview: String,
    /// Comma separated genre list, e.g. "Animation, Comedy, Family"
    #[serde(default)]
    pub genre: String,
    /// Comma separated cast list, billing order
    #[serde(default)]
    pub cast: String,
    #[serde(default)]
    pub director: String,
    #[serde(default)]
    pub tagline: String,
    #[serde(default)]
    pub original_language: String,
    #[serde(default)]
    pub release_date: Option<String>,
    /// Average audience rating
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub production_companies: Option<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
}

impl Movie {
    /// Genre names split out of the comma separated field
    pub fn genres(&self) -> Vec<&str> {
        split_list(&self.genre)
    }

    /// Cast names in billing order
    pub fn cast_members(&self) -> Vec<&str> {
        split_list(&self.cast)
    }
}

fn split_list(value: &str) -> Vec<&str> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// A single (user, movie, rating) observation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Rating {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    #[serde(rename = "movieId")]
    pub movie_id: MovieId,
    pub rating: f64,
}

/// Compact movie view returned by the search endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieSummary {
    pub movie_id: MovieId,
    pub title: String,
    pub genre: String,
    pub rating: f64,
}

impl From<&Movie> for MovieSummary {
    fn from(movie: &Movie) -> Self {
        Self {
            movie_id: movie.movie_id,
            title: movie.title.clone(),
            genre: movie.genre.clone(),
            rating: movie.rating,
        }
    }
}
