pub mod atterberg;
pub mod chart;
pub mod engine;

pub use crate::domain::model::{AnalysisOutput, ProjectTrials};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
pub use engine::PipelineEngine;
