use std::str::FromStr;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    data::{artifacts, ModelInfo},
    error::{AppError, AppResult},
    middleware::RequestId,
    models::{DatasetStats, MovieSummary, RecommendationQuery, RecommendationResult},
    services::{recommendations, title_search},
};

use super::AppState;

const DEFAULT_ALPHA: f64 = 0.6;
const DEFAULT_TOP_N: i64 = 10;
const DEFAULT_MOVIE_LIMIT: usize = 20;

// Request/Response types

/// Raw query parameters; parsed by hand so malformed values get JSON errors
#[derive(Debug, Default, Deserialize)]
pub struct RecommendParams {
    pub movie_title: Option<String>,
    pub user_id: Option<String>,
    pub alpha: Option<String>,
    pub top_n: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendResponse {
    pub movie_title: String,
    pub matched_title: String,
    pub user_id: i64,
    pub alpha: f64,
    pub top_n: i64,
    pub recommendations: Vec<RecommendationResult>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MovieSearchParams {
    pub q: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MovieSearchResponse {
    pub query: String,
    pub total: usize,
    pub movies: Vec<MovieSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
    pub models: ModelInfo,
    pub dataset: Option<DatasetStats>,
    pub trained_at: Option<DateTime<Utc>>,
    pub loaded_at: Option<DateTime<Utc>>,
}

impl RecommendParams {
    fn into_query(self, max_top_n: usize) -> AppResult<RecommendationQuery> {
        let movie_title = self
            .movie_title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                AppError::Validation("movie_title parameter is required".to_string())
            })?;

        let user_id = required(self.user_id, "user_id")?;
        let alpha = optional(self.alpha, "alpha")?.unwrap_or(DEFAULT_ALPHA);
        let top_n = optional(self.top_n, "top_n")?.unwrap_or(DEFAULT_TOP_N);

        if top_n > max_top_n as i64 {
            return Err(AppError::Validation(format!(
                "top_n must be between 1 and {}",
                max_top_n
            )));
        }

        Ok(RecommendationQuery {
            movie_title,
            user_id,
            alpha,
            top_n,
        })
    }
}

fn optional<T: FromStr>(value: Option<String>, name: &str) -> AppResult<Option<T>> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| AppError::Validation(format!("{} has an invalid value: {}", name, raw))),
    }
}

fn required<T: FromStr>(value: Option<String>, name: &str) -> AppResult<T> {
    optional(value, name)?
        .ok_or_else(|| AppError::Validation(format!("{} parameter is required", name)))
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Hybrid recommendations for a reference movie and a user
pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<RecommendParams>,
) -> AppResult<Json<RecommendResponse>> {
    let query = params.into_query(state.config.max_top_n)?;
    // Bad parameters are a 400 even when no models are loaded
    recommendations::validate(&query)?;
    let models = state.models()?;

    tracing::info!(
        request_id = %request_id,
        movie_title = %query.movie_title,
        user_id = query.user_id,
        alpha = query.alpha,
        top_n = query.top_n,
        "Processing recommendation request"
    );

    let recs = recommendations::recommend(models, &query)?;

    tracing::info!(
        request_id = %request_id,
        matched_title = %recs.reference.title,
        results = recs.results.len(),
        collab_fallbacks = recs.fallback_count,
        "Recommendations generated"
    );

    Ok(Json(RecommendResponse {
        movie_title: query.movie_title,
        matched_title: recs.reference.title,
        user_id: query.user_id,
        alpha: query.alpha,
        top_n: query.top_n,
        recommendations: recs.results,
    }))
}

/// Model and dataset status
pub async fn status(State(state): State<AppState>) -> AppResult<Json<StatusResponse>> {
    let models_dir = state.config.models_dir.clone();
    let models = tokio::task::spawn_blocking(move || artifacts::model_info(models_dir))
        .await
        .map_err(|e| AppError::Internal(format!("model listing task failed: {}", e)))?;
    let loaded = state.models().ok();
    let ready = loaded.is_some();

    Ok(Json(StatusResponse {
        status: if ready { "ready" } else { "not_ready" }.to_string(),
        message: if ready {
            "System ready"
        } else {
            "Models not found or invalid"
        }
        .to_string(),
        models,
        dataset: loaded.map(|m| m.stats()),
        trained_at: loaded.map(|m| m.trained_at()),
        loaded_at: state.loaded_at(),
    }))
}

/// Title substring search
pub async fn search_movies(
    State(state): State<AppState>,
    Query(params): Query<MovieSearchParams>,
) -> AppResult<Json<MovieSearchResponse>> {
    let limit = optional::<usize>(params.limit, "limit")?.unwrap_or(DEFAULT_MOVIE_LIMIT);
    if limit == 0 {
        return Err(AppError::Validation("limit must be positive".to_string()));
    }
    let models = state.models()?;

    let query = params.q.unwrap_or_default().trim().to_string();
    let movies: Vec<MovieSummary> = title_search::search_movies(models.movies(), &query, limit)
        .into_iter()
        .map(MovieSummary::from)
        .collect();

    Ok(Json(MovieSearchResponse {
        query,
        total: movies.len(),
        movies,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(title: Option<&str>, user: Option<&str>, alpha: Option<&str>, top_n: Option<&str>) -> RecommendParams {
        RecommendParams {
            movie_title: title.map(String::from),
            user_id: user.map(String::from),
            alpha: alpha.map(String::from),
            top_n: top_n.map(String::from),
        }
    }

    #[test]
    fn test_defaults_applied() {
        let query = params(Some(" Toy Story "), Some("1"), None, None)
            .into_query(50)
            .unwrap();
        assert_eq!(query.movie_title, "Toy Story");
        assert_eq!(query.user_id, 1);
        assert_eq!(query.alpha, DEFAULT_ALPHA);
        assert_eq!(query.top_n, DEFAULT_TOP_N);
    }

    #[test]
    fn test_missing_required_params() {
        let err = params(None, Some("1"), None, None).into_query(50).unwrap_err();
        assert_eq!(err.to_string(), "Invalid input: movie_title parameter is required");

        let err = params(Some("Toy Story"), None, None, None).into_query(50).unwrap_err();
        assert_eq!(err.to_string(), "Invalid input: user_id parameter is required");
    }

    #[test]
    fn test_unparsable_params() {
        let err = params(Some("Toy Story"), Some("abc"), None, None)
            .into_query(50)
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = params(Some("Toy Story"), Some("1"), Some("high"), None)
            .into_query(50)
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_top_n_cap() {
        assert!(params(Some("Toy Story"), Some("1"), None, Some("50"))
            .into_query(50)
            .is_ok());
        assert!(params(Some("Toy Story"), Some("1"), None, Some("51"))
            .into_query(50)
            .is_err());
    }
}
