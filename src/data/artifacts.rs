use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::{DatasetStats, Movie},
    services::{
        collaborative::CollaborativeModel, content::ContentModel,
        title_search::DEFAULT_FUZZY_THRESHOLD, ModelContext,
    },
};

pub const MOVIES_FILE: &str = "movies.json";
pub const CONTENT_MODEL_FILE: &str = "content_model.json";
pub const COLLAB_MODEL_FILE: &str = "collab_model.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Artifacts that must all be present for the service to serve recommendations
pub const REQUIRED_ARTIFACTS: [&str; 4] = [
    MOVIES_FILE,
    CONTENT_MODEL_FILE,
    COLLAB_MODEL_FILE,
    MANIFEST_FILE,
];

const ARTIFACT_EXTENSION: &str = "json";

/// Training metadata stored next to the models
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Manifest {
    pub trained_at: DateTime<Utc>,
    pub dataset: DatasetStats,
    pub content_features: usize,
    pub collab_users: usize,
    pub collab_items: usize,
    pub global_mean: f64,
}

impl Manifest {
    fn for_context(ctx: &ModelContext) -> Self {
        Self {
            trained_at: ctx.trained_at(),
            dataset: ctx.stats(),
            content_features: ctx.content().shape().1,
            collab_users: ctx.collab().num_users(),
            collab_items: ctx.collab().num_items(),
            global_mean: ctx.collab().global_mean(),
        }
    }
}

/// What is on disk in the models directory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelInfo {
    pub models_dir: String,
    pub available_models: Vec<String>,
    pub total_models: usize,
    pub missing_models: Vec<String>,
    pub is_ready: bool,
}

/// Persists every artifact of `ctx` into `dir`, creating it if needed
pub fn save_models(dir: impl AsRef<Path>, ctx: &ModelContext) -> AppResult<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    write_json(&dir.join(MOVIES_FILE), ctx.movies())?;
    write_json(&dir.join(CONTENT_MODEL_FILE), ctx.content())?;
    write_json(&dir.join(COLLAB_MODEL_FILE), ctx.collab())?;
    write_json(&dir.join(MANIFEST_FILE), &Manifest::for_context(ctx))?;

    tracing::info!(models_dir = %dir.display(), "Models saved");
    Ok(())
}

/// Loads a [`ModelContext`] from `dir`
///
/// Fails with [`AppError::ModelsNotFound`] when any required artifact is absent.
pub fn load_models(dir: impl AsRef<Path>, fuzzy_threshold: f64) -> AppResult<ModelContext> {
    let dir = dir.as_ref();
    let info = model_info(dir);
    if !info.is_ready {
        return Err(AppError::ModelsNotFound(format!(
            "missing {} in {}",
            info.missing_models.join(", "),
            dir.display()
        )));
    }

    let movies: Vec<Movie> = read_json(&dir.join(MOVIES_FILE))?;
    let mut content: ContentModel = read_json(&dir.join(CONTENT_MODEL_FILE))?;
    let mut collab: CollaborativeModel = read_json(&dir.join(COLLAB_MODEL_FILE))?;
    let manifest: Manifest = read_json(&dir.join(MANIFEST_FILE))?;

    content.reindex();
    collab.reindex();

    if content.shape().0 != movies.len() {
        return Err(AppError::ModelsNotFound(format!(
            "content model covers {} movies but the movie table has {}",
            content.shape().0,
            movies.len()
        )));
    }

    tracing::info!(
        models_dir = %dir.display(),
        movies = movies.len(),
        trained_at = %manifest.trained_at,
        "Models loaded"
    );

    Ok(ModelContext::new(
        movies,
        content,
        collab,
        manifest.dataset,
        manifest.trained_at,
        fuzzy_threshold,
    ))
}

/// Artifact files present in `dir`, sorted
pub fn list_models(dir: impl AsRef<Path>) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir.as_ref()) else {
        return Vec::new();
    };

    let mut files: Vec<String> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| p.extension().is_some_and(|ext| ext == ARTIFACT_EXTENSION))
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    files.sort();
    files
}

pub fn model_info(dir: impl AsRef<Path>) -> ModelInfo {
    let dir = dir.as_ref();
    let available_models = list_models(dir);
    let missing_models: Vec<String> = REQUIRED_ARTIFACTS
        .iter()
        .filter(|name| !available_models.iter().any(|m| m.as_str() == **name))
        .map(|name| name.to_string())
        .collect();

    ModelInfo {
        models_dir: dir.display().to_string(),
        total_models: available_models.len(),
        is_ready: missing_models.is_empty(),
        available_models,
        missing_models,
    }
}

/// True when every artifact is present and loads cleanly
pub fn validate_models(dir: impl AsRef<Path>) -> bool {
    match load_models(dir, DEFAULT_FUZZY_THRESHOLD) {
        Ok(_) => true,
        Err(e) => {
            tracing::error!(error = %e, "Model validation failed");
            false
        }
    }
}

/// Removes all artifact files from `dir`, returning how many were deleted
pub fn cleanup_models(dir: impl AsRef<Path>) -> AppResult<usize> {
    let dir = dir.as_ref();
    let files = list_models(dir);
    for name in &files {
        fs::remove_file(dir.join(name))?;
        tracing::debug!(file = %name, "Removed artifact");
    }
    tracing::info!(removed = files.len(), models_dir = %dir.display(), "Cleaned up models");
    Ok(files.len())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> AppResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> AppResult<T> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}
