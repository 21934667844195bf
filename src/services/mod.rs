pub mod collaborative;
pub mod content;
pub mod context;
pub mod recommendations;
pub mod title_search;

pub use context::{ModelContext, RecommendationModels};
