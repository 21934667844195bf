//! Hybrid movie recommendation service.
//!
//! A content model (TF-IDF over movie metadata) and a collaborative model
//! (matrix factorization over user ratings) are trained offline by the `train`
//! binary, persisted to a models directory, and served over HTTP by the main
//! binary, which blends both signals per request.

pub mod api;
pub mod config;
pub mod data;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
pub mod telemetry;
