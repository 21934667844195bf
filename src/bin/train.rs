//! Offline training: fits both models from the dataset and writes the
//! artifacts the server loads at startup.
//!
//! Paths and hyperparameters come from the same environment configuration as
//! the server (`MOVIES_PATH`, `RATINGS_PATH`, `MODELS_DIR`, `LATENT_FACTORS`, ...).
//! Set `CLEAN_MODELS=true` to delete existing artifacts first.

use std::time::Instant;

use anyhow::Context;
use marquee_api::{
    config::Config,
    data::{artifacts, Dataset},
    models::RecommendationQuery,
    services::{recommendations, ModelContext},
    telemetry,
};

const SMOKE_TITLE: &str = "Toy Story";
const SMOKE_USER: i64 = 1;

fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();
    let config = Config::from_env()?;
    let start = Instant::now();

    tracing::info!(
        movies_path = %config.movies_path,
        ratings_path = %config.ratings_path,
        models_dir = %config.models_dir,
        "Starting training"
    );

    if config.clean_models {
        let removed = artifacts::cleanup_models(&config.models_dir)
            .context("Failed to clean up existing models")?;
        tracing::info!(removed, "Removed existing artifacts");
    }

    let dataset = Dataset::load(&config.movies_path, &config.ratings_path)
        .context("Failed to load dataset")?;
    let ctx = ModelContext::train(&dataset, &config).context("Training failed")?;

    artifacts::save_models(&config.models_dir, &ctx).context("Failed to save models")?;

    let info = artifacts::model_info(&config.models_dir);
    if !info.is_ready || !artifacts::validate_models(&config.models_dir) {
        anyhow::bail!(
            "Model validation failed, missing: {}",
            info.missing_models.join(", ")
        );
    }

    let (movies, features) = ctx.content().shape();
    tracing::info!(
        elapsed_secs = start.elapsed().as_secs_f64(),
        movies,
        ratings = dataset.ratings.len(),
        tfidf_features = features,
        collab_users = ctx.collab().num_users(),
        artifacts = %info.available_models.join(", "),
        "Training completed"
    );

    smoke_test(&ctx);
    Ok(())
}

/// Runs one recommendation against the fresh models and logs the top results
fn smoke_test(ctx: &ModelContext) {
    let query = RecommendationQuery {
        movie_title: SMOKE_TITLE.to_string(),
        user_id: SMOKE_USER,
        alpha: 0.6,
        top_n: 5,
    };

    match recommendations::recommend(ctx, &query) {
        Ok(recs) if !recs.results.is_empty() => {
            for rec in recs.results.iter().take(3) {
                tracing::info!(title = %rec.title, score = %format!("{:.3}", rec.score), "Sample recommendation");
            }
        }
        Ok(_) => tracing::warn!("Sample recommendation returned no results"),
        Err(e) => tracing::warn!(error = %e, "Sample recommendation failed"),
    }
}
