use serde::{Deserialize, Serialize};

mod movie;

pub use movie::{Movie, MovieId, MovieSummary, Rating, UserId};

/// Validated parameters for a hybrid recommendation
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationQuery {
    pub movie_title: String,
    pub user_id: i64,
    pub alpha: f64,
    pub top_n: i64,
}

/// One ranked recommendation; built per request, never persisted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationResult {
    pub movie_id: MovieId,
    pub title: String,
    pub genre: String,
    pub overview: String,
    pub rating: f64,
    /// Blended score, `alpha * content_score + (1 - alpha) * collab_score`
    pub score: f64,
    pub content_score: f64,
    pub collab_score: f64,
}

/// Ranked list plus the movie the title resolved to
#[derive(Debug, Clone)]
pub struct Recommendations {
    pub reference: Movie,
    pub results: Vec<RecommendationResult>,
    /// Candidates whose collaborative score came from the cold-start fallback
    pub fallback_count: usize,
}

/// Collaborative prediction, flagged when the cold-start fallback was used
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Prediction {
    Estimated(f64),
    Fallback(f64),
}

impl Prediction {
    pub fn value(&self) -> f64 {
        match self {
            Prediction::Estimated(v) | Prediction::Fallback(v) => *v,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Prediction::Fallback(_))
    }
}

/// Counts describing the loaded dataset
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatasetStats {
    pub movies: usize,
    pub ratings: usize,
    pub users: usize,
}
