pub mod config;
pub mod dryrun;
pub mod gemini;
pub mod identity;
pub mod pipeline;
pub mod provider;
pub mod tracker;
pub mod valuation;

#[cfg(test)]
mod testing;

pub use config::{EngineConfig, Market};
pub use pipeline::{PricePipeline, StageModels};
pub use tracker::{IgnoreReason, Phase, SubmitOutcome, Tracker};

/// Request metadata keys shared by the stages and the offline provider.
pub const META_STAGE: &str = "stage";
pub const META_INPUT_KIND: &str = "input_kind";
pub const META_SUBJECT: &str = "subject";
pub const META_PRODUCT_NAME: &str = "product_name";
