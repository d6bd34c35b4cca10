use crate::config::toml_config::AtterbergSettings;
use crate::domain::model::{AnalysisOutput, ProjectTrials};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// Human-readable location of `path` inside this storage.
    fn locate(&self, path: &str) -> String;
}

pub trait ConfigProvider: Send + Sync {
    fn output_path(&self) -> &str;
    fn output_formats(&self) -> &[String];
    fn archive_enabled(&self) -> bool;
    fn atterberg(&self) -> &AtterbergSettings;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<ProjectTrials>;
    async fn transform(&self, data: ProjectTrials) -> Result<AnalysisOutput>;
    async fn load(&self, result: AnalysisOutput) -> Result<String>;
}
