pub mod config;
pub mod executor;
pub mod harvest;
pub mod model;
pub mod traits;

// Re-export common types for convenience
pub use config::PipelineConfig;
pub use executor::*;
pub use harvest::{CatalogPipeline, PipelineError, RunReport, SkippedArtifact};
pub use model::*;
pub use traits::*;
