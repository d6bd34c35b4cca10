pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{Database, LocalStorage};
pub use app::pipelines::atterberg_pipeline::AtterbergPipeline;
pub use config::GeostorConfig;
pub use core::PipelineEngine;
pub use utils::error::{GeostorError, Result};
