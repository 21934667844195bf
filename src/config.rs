use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding the trained model artifacts
    #[serde(default = "default_models_dir")]
    pub models_dir: String,

    /// Movie metadata table (JSON array)
    #[serde(default = "default_movies_path")]
    pub movies_path: String,

    /// Ratings table (CSV with userId,movieId,rating)
    #[serde(default = "default_ratings_path")]
    pub ratings_path: String,

    /// Upper bound accepted for `top_n`
    #[serde(default = "default_max_top_n")]
    pub max_top_n: usize,

    /// Minimum normalized Levenshtein similarity for a fuzzy title match
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f64,

    /// Latent dimension of the factorization model
    #[serde(default = "default_latent_factors")]
    pub latent_factors: usize,

    #[serde(default = "default_training_epochs")]
    pub training_epochs: usize,

    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,

    #[serde(default = "default_regularization")]
    pub regularization: f64,

    /// Vocabulary cap for the TF-IDF vectorizer
    #[serde(default = "default_max_features")]
    pub max_features: usize,

    /// Remove existing artifacts before training
    #[serde(default)]
    pub clean_models: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_models_dir() -> String {
    "models".to_string()
}

fn default_movies_path() -> String {
    "data/movies.json".to_string()
}

fn default_ratings_path() -> String {
    "data/ratings.csv".to_string()
}

fn default_max_top_n() -> usize {
    50
}

fn default_fuzzy_threshold() -> f64 {
    crate::services::title_search::DEFAULT_FUZZY_THRESHOLD
}

fn default_latent_factors() -> usize {
    50
}

fn default_training_epochs() -> usize {
    40
}

fn default_learning_rate() -> f64 {
    0.01
}

fn default_regularization() -> f64 {
    0.05
}

fn default_max_features() -> usize {
    50_000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            models_dir: default_models_dir(),
            movies_path: default_movies_path(),
            ratings_path: default_ratings_path(),
            max_top_n: default_max_top_n(),
            fuzzy_threshold: default_fuzzy_threshold(),
            latent_factors: default_latent_factors(),
            training_epochs: default_training_epochs(),
            learning_rate: default_learning_rate(),
            regularization: default_regularization(),
            max_features: default_max_features(),
            clean_models: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Socket address string for the HTTP listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
