use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::{
    config::Config,
    data::Dataset,
    error::{AppError, AppResult},
    models::{DatasetStats, Movie, MovieId, Prediction, UserId},
    services::{
        collaborative::{CollaborativeModel, FactorizationConfig},
        content::ContentModel,
        title_search,
    },
};

/// Read-only model access the hybrid scorer depends on
#[cfg_attr(test, mockall::automock)]
pub trait RecommendationModels: Send + Sync {
    /// Resolves a title to a movie id
    fn find_movie(&self, title: &str) -> AppResult<MovieId>;

    /// Content similarity of `movie_id` to every other movie
    fn get_content_similarity(&self, movie_id: MovieId) -> AppResult<HashMap<MovieId, f64>>;

    /// Predicted rating, or the cold-start fallback
    fn predict_rating(&self, user_id: UserId, movie_id: MovieId) -> Prediction;

    fn movie(&self, movie_id: MovieId) -> Option<Movie>;

    /// Every movie id in the catalog
    fn movie_ids(&self) -> Vec<MovieId>;
}

impl From<&Config> for FactorizationConfig {
    fn from(config: &Config) -> Self {
        Self {
            latent_factors: config.latent_factors,
            epochs: config.training_epochs,
            learning_rate: config.learning_rate,
            regularization: config.regularization,
            ..Default::default()
        }
    }
}

/// Everything a request needs, built once and shared immutably
#[derive(Debug, Clone)]
pub struct ModelContext {
    movies: Vec<Movie>,
    movie_index: HashMap<MovieId, usize>,
    content: ContentModel,
    collab: CollaborativeModel,
    stats: DatasetStats,
    trained_at: DateTime<Utc>,
    fuzzy_threshold: f64,
}

impl ModelContext {
    pub fn new(
        movies: Vec<Movie>,
        content: ContentModel,
        collab: CollaborativeModel,
        stats: DatasetStats,
        trained_at: DateTime<Utc>,
        fuzzy_threshold: f64,
    ) -> Self {
        let movie_index = movies
            .iter()
            .enumerate()
            .map(|(i, m)| (m.movie_id, i))
            .collect();

        Self {
            movies,
            movie_index,
            content,
            collab,
            stats,
            trained_at,
            fuzzy_threshold,
        }
    }

    /// Fits both models on `dataset`
    pub fn train(dataset: &Dataset, config: &Config) -> AppResult<Self> {
        let content = ContentModel::fit(&dataset.movies, config.max_features);
        let collab = CollaborativeModel::fit(&dataset.ratings, &FactorizationConfig::from(config))?;

        Ok(Self::new(
            dataset.movies.clone(),
            content,
            collab,
            dataset.stats(),
            Utc::now(),
            config.fuzzy_threshold,
        ))
    }

    pub fn movies(&self) -> &[Movie] {
        &self.movies
    }

    pub fn content(&self) -> &ContentModel {
        &self.content
    }

    pub fn collab(&self) -> &CollaborativeModel {
        &self.collab
    }

    pub fn stats(&self) -> DatasetStats {
        self.stats
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }
}

impl RecommendationModels for ModelContext {
    fn find_movie(&self, title: &str) -> AppResult<MovieId> {
        title_search::find_movie(&self.movies, title, self.fuzzy_threshold).map(|m| m.movie_id)
    }

    fn get_content_similarity(&self, movie_id: MovieId) -> AppResult<HashMap<MovieId, f64>> {
        self.content.similarities(movie_id).ok_or_else(|| {
            AppError::NotFound(format!("movie {} has no content vector", movie_id))
        })
    }

    fn predict_rating(&self, user_id: UserId, movie_id: MovieId) -> Prediction {
        self.collab.predict(user_id, movie_id)
    }

    fn movie(&self, movie_id: MovieId) -> Option<Movie> {
        self.movie_index
            .get(&movie_id)
            .map(|&i| self.movies[i].clone())
    }

    fn movie_ids(&self) -> Vec<MovieId> {
        self.movies.iter().map(|m| m.movie_id).collect()
    }
}

#[cfg(test)]
pub(crate) fn test_context() -> ModelContext {
    let config = Config {
        latent_factors: 4,
        training_epochs: 300,
        learning_rate: 0.05,
        regularization: 0.02,
        ..Config::default()
    };
    ModelContext::train(&crate::data::fixtures::dataset(), &config).unwrap()
}
