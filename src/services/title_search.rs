use strsim::normalized_levenshtein;

use crate::{
    error::{AppError, AppResult},
    models::{Movie, MovieId},
};

/// Minimum similarity for a fuzzy title match unless configured otherwise
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.75;

/// How a requested title was resolved
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchKind {
    Exact,
    Substring,
    /// Closest title by normalized Levenshtein similarity
    Fuzzy(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TitleMatch {
    pub movie_id: MovieId,
    pub kind: MatchKind,
}

/// Resolves a user supplied title to a movie
///
/// Resolution order, all case-insensitive:
/// 1. exact title match (first in catalog order),
/// 2. titles containing the query, shortest title first, then lowest id,
/// 3. the most similar title if its similarity reaches `fuzzy_threshold`.
pub fn find_movie(movies: &[Movie], title: &str, fuzzy_threshold: f64) -> AppResult<TitleMatch> {
    let query = title.trim().to_lowercase();
    if query.is_empty() {
        return Err(AppError::Validation("movie_title must not be empty".to_string()));
    }

    if let Some(movie) = movies.iter().find(|m| m.title.to_lowercase() == query) {
        return Ok(TitleMatch {
            movie_id: movie.movie_id,
            kind: MatchKind::Exact,
        });
    }

    if let Some(movie) = movies
        .iter()
        .filter(|m| m.title.to_lowercase().contains(&query))
        .min_by_key(|m| (m.title.chars().count(), m.movie_id))
    {
        return Ok(TitleMatch {
            movie_id: movie.movie_id,
            kind: MatchKind::Substring,
        });
    }

    let mut best: Option<(&Movie, f64)> = None;
    for movie in movies {
        let score = normalized_levenshtein(&query, &movie.title.to_lowercase());
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((movie, score));
        }
    }

    match best {
        Some((movie, score)) if score >= fuzzy_threshold => {
            tracing::debug!(
                query = %title,
                matched = %movie.title,
                similarity = score,
                "Fuzzy title match"
            );
            Ok(TitleMatch {
                movie_id: movie.movie_id,
                kind: MatchKind::Fuzzy(score),
            })
        }
        _ => Err(AppError::NotFound(format!(
            "No movie found matching \"{}\"",
            title.trim()
        ))),
    }
}

/// Case-insensitive substring search over titles, in catalog order
///
/// An empty query matches every movie.
pub fn search_movies<'a>(movies: &'a [Movie], query: &str, limit: usize) -> Vec<&'a Movie> {
    let query = query.trim().to_lowercase();
    movies
        .iter()
        .filter(|m| query.is_empty() || m.title.to_lowercase().contains(&query))
        .take(limit)
        .collect()
}
