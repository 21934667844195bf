//! Collaborative filtering by biased matrix factorization.
//!
//! `prediction(u, i) = mu + b_u + b_i + p_u · q_i`, fitted with stochastic
//! gradient descent over the observed ratings only. Training is seeded, so the
//! same ratings and configuration always produce the same model.

use std::collections::HashMap;

use ndarray::{Array1, Array2};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::{MovieId, Prediction, Rating, UserId},
};

pub const MIN_RATING: f64 = 1.0;
pub const MAX_RATING: f64 = 5.0;

const INIT_SCALE: f64 = 0.1;

/// Training hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FactorizationConfig {
    pub latent_factors: usize,
    pub epochs: usize,
    pub learning_rate: f64,
    pub regularization: f64,
    pub seed: u64,
}

impl Default for FactorizationConfig {
    fn default() -> Self {
        Self {
            latent_factors: 50,
            epochs: 40,
            learning_rate: 0.01,
            regularization: 0.05,
            seed: 42,
        }
    }
}

/// Fitted user/item latent-factor model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaborativeModel {
    global_mean: f64,
    user_ids: Vec<UserId>,
    item_ids: Vec<MovieId>,
    user_bias: Vec<f64>,
    item_bias: Vec<f64>,
    user_factors: Array2<f64>,
    item_factors: Array2<f64>,
    #[serde(skip)]
    user_index: HashMap<UserId, usize>,
    #[serde(skip)]
    item_index: HashMap<MovieId, usize>,
}

impl CollaborativeModel {
    pub fn fit(ratings: &[Rating], config: &FactorizationConfig) -> AppResult<Self> {
        if ratings.is_empty() {
            return Err(AppError::InvalidDataset(
                "cannot factorize an empty ratings table".to_string(),
            ));
        }
        if config.latent_factors == 0 {
            return Err(AppError::Validation(
                "latent_factors must be positive".to_string(),
            ));
        }

        let mut user_ids: Vec<UserId> = ratings.iter().map(|r| r.user_id).collect();
        user_ids.sort_unstable();
        user_ids.dedup();
        let mut item_ids: Vec<MovieId> = ratings.iter().map(|r| r.movie_id).collect();
        item_ids.sort_unstable();
        item_ids.dedup();

        let k = config.latent_factors;
        let mut rng = StdRng::seed_from_u64(config.seed);

        let mut model = Self {
            global_mean: ratings.iter().map(|r| r.rating).sum::<f64>() / ratings.len() as f64,
            user_bias: vec![0.0; user_ids.len()],
            item_bias: vec![0.0; item_ids.len()],
            user_factors: Array2::from_shape_fn((user_ids.len(), k), |_| {
                rng.gen_range(-INIT_SCALE..INIT_SCALE)
            }),
            item_factors: Array2::from_shape_fn((item_ids.len(), k), |_| {
                rng.gen_range(-INIT_SCALE..INIT_SCALE)
            }),
            user_ids,
            item_ids,
            user_index: HashMap::new(),
            item_index: HashMap::new(),
        };
        model.reindex();

        let observations: Vec<(usize, usize, f64)> = ratings
            .iter()
            .map(|r| (model.user_index[&r.user_id], model.item_index[&r.movie_id], r.rating))
            .collect();

        let mut order: Vec<usize> = (0..observations.len()).collect();
        for _ in 0..config.epochs {
            order.shuffle(&mut rng);
            for &n in &order {
                let (u, i, rating) = observations[n];
                model.step(u, i, rating, config.learning_rate, config.regularization);
            }
        }

        tracing::info!(
            users = model.user_ids.len(),
            items = model.item_ids.len(),
            factors = k,
            epochs = config.epochs,
            rmse = model.rmse(ratings),
            "Collaborative model trained"
        );

        Ok(model)
    }

    fn step(&mut self, u: usize, i: usize, rating: f64, lr: f64, reg: f64) {
        let pu: Array1<f64> = self.user_factors.row(u).to_owned();
        let qi: Array1<f64> = self.item_factors.row(i).to_owned();

        let err = rating - (self.global_mean + self.user_bias[u] + self.item_bias[i] + pu.dot(&qi));

        self.user_bias[u] += lr * (err - reg * self.user_bias[u]);
        self.item_bias[i] += lr * (err - reg * self.item_bias[i]);
        self.user_factors
            .row_mut(u)
            .scaled_add(lr, &(&qi * err - &pu * reg));
        self.item_factors
            .row_mut(i)
            .scaled_add(lr, &(&pu * err - &qi * reg));
    }

    /// Rebuilds the id lookups after deserialization
    pub(crate) fn reindex(&mut self) {
        self.user_index = self
            .user_ids
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, i))
            .collect();
        self.item_index = self
            .item_ids
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, i))
            .collect();
    }

    /// Predicted rating clamped to the rating scale
    ///
    /// Unknown users or items fall back to the global mean rating.
    pub fn predict(&self, user_id: UserId, movie_id: MovieId) -> Prediction {
        match (self.user_index.get(&user_id), self.item_index.get(&movie_id)) {
            (Some(&u), Some(&i)) => {
                let raw = self.global_mean
                    + self.user_bias[u]
                    + self.item_bias[i]
                    + self.user_factors.row(u).dot(&self.item_factors.row(i));
                Prediction::Estimated(raw.clamp(MIN_RATING, MAX_RATING))
            }
            _ => Prediction::Fallback(self.global_mean),
        }
    }

    /// Root mean squared error over `ratings`
    pub fn rmse(&self, ratings: &[Rating]) -> f64 {
        if ratings.is_empty() {
            return 0.0;
        }
        let sse: f64 = ratings
            .iter()
            .map(|r| (self.predict(r.user_id, r.movie_id).value() - r.rating).powi(2))
            .sum();
        (sse / ratings.len() as f64).sqrt()
    }

    pub fn global_mean(&self) -> f64 {
        self.global_mean
    }

    pub fn knows_user(&self, user_id: UserId) -> bool {
        self.user_index.contains_key(&user_id)
    }

    pub fn num_users(&self) -> usize {
        self.user_ids.len()
    }

    pub fn num_items(&self) -> usize {
        self.item_ids.len()
    }
}
