use std::cmp::Ordering;

use crate::{
    error::{AppError, AppResult},
    models::{MovieId, RecommendationQuery, RecommendationResult, Recommendations, UserId},
    services::context::RecommendationModels,
};

/// Value every candidate gets when a score set has no spread
const FLAT_NORMALIZED: f64 = 0.5;

/// Checks request parameters, returning the user id in model space
pub fn validate(query: &RecommendationQuery) -> AppResult<UserId> {
    if !(0.0..=1.0).contains(&query.alpha) {
        return Err(AppError::Validation(
            "alpha must be between 0 and 1".to_string(),
        ));
    }
    if query.top_n <= 0 {
        return Err(AppError::Validation("top_n must be positive".to_string()));
    }
    if query.user_id <= 0 {
        return Err(AppError::Validation(
            "user_id must be a positive integer".to_string(),
        ));
    }
    UserId::try_from(query.user_id)
        .map_err(|_| AppError::Validation("user_id is out of range".to_string()))
}

/// Blends content similarity and predicted rating into a ranked list
///
/// Both signals are min-max scaled over this request's candidates, then
/// combined as `alpha * content + (1 - alpha) * collab`. Results exclude the
/// reference movie and are ordered by score descending, then movie id.
pub fn recommend(
    models: &dyn RecommendationModels,
    query: &RecommendationQuery,
) -> AppResult<Recommendations> {
    let user_id = validate(query)?;
    let reference_id = models.find_movie(&query.movie_title)?;
    let reference = models
        .movie(reference_id)
        .ok_or_else(|| AppError::Internal(format!("movie {} missing from catalog", reference_id)))?;

    let similarities = models.get_content_similarity(reference_id)?;
    let mut candidates: Vec<MovieId> = models
        .movie_ids()
        .into_iter()
        .filter(|&id| id != reference_id)
        .collect();
    candidates.sort_unstable();
    candidates.dedup();

    let content: Vec<f64> = candidates
        .iter()
        .map(|id| similarities.get(id).copied().unwrap_or(0.0))
        .collect();

    let mut fallback_count = 0;
    let collab: Vec<f64> = candidates
        .iter()
        .map(|&id| {
            let prediction = models.predict_rating(user_id, id);
            if prediction.is_fallback() {
                fallback_count += 1;
            }
            prediction.value()
        })
        .collect();

    if fallback_count > 0 {
        tracing::debug!(
            user_id,
            fallback_count,
            candidates = candidates.len(),
            "Collaborative score fell back to global mean"
        );
    }

    let content = min_max_normalize(&content);
    let collab = min_max_normalize(&collab);

    let mut ranked: Vec<(usize, f64)> = content
        .iter()
        .zip(&collab)
        .map(|(c, f)| query.alpha * c + (1.0 - query.alpha) * f)
        .enumerate()
        .collect();

    ranked.sort_by(|a, b| match b.1.total_cmp(&a.1) {
        Ordering::Equal => candidates[a.0].cmp(&candidates[b.0]),
        other => other,
    });
    ranked.truncate(usize::try_from(query.top_n).unwrap_or(usize::MAX));

    let results = ranked
        .into_iter()
        .filter_map(|(i, score)| {
            let movie = models.movie(candidates[i])?;
            Some(RecommendationResult {
                movie_id: movie.movie_id,
                title: movie.title,
                genre: movie.genre,
                overview: movie.overview,
                rating: movie.rating,
                score,
                content_score: content[i],
                collab_score: collab[i],
            })
        })
        .collect();

    Ok(Recommendations {
        reference,
        results,
        fallback_count,
    })
}

/// Scales values linearly onto `[0, 1]`
///
/// A set with no spread maps every value to 0.5.
pub fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    if !(range > 0.0) {
        return vec![FLAT_NORMALIZED; values.len()];
    }
    values.iter().map(|v| (v - min) / range).collect()
}
