pub mod artifacts;
pub mod dataset;

pub use artifacts::{load_models, model_info, save_models, ModelInfo};
pub use dataset::Dataset;

#[cfg(test)]
pub(crate) use dataset::fixtures;
