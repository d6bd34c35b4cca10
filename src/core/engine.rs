use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

/// Drives a pipeline through extract, transform and load.
pub struct PipelineEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> PipelineEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("🚀 Starting Atterberg analysis...");
        self.monitor.log_stats("Start");

        tracing::info!("📥 Extracting trial data...");
        let trials = self.pipeline.extract().await?;
        tracing::info!(
            "📥 Extracted {} trials ({} liquid limit, {} plastic limit)",
            trials.len(),
            trials.liquid_limit.len(),
            trials.plastic_limit.len()
        );
        self.monitor.log_stats("Extract");

        tracing::info!("🔄 Calculating limits...");
        let output = self.pipeline.transform(trials).await?;
        tracing::info!("🔄 Calculated results for {} samples", output.results.len());
        self.monitor.log_stats("Transform");

        tracing::info!("💾 Saving results...");
        let output_path = self.pipeline.load(output).await?;
        tracing::info!("💾 Output saved to: {}", output_path);
        self.monitor.log_stats("Load");

        self.monitor.log_final_stats();
        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{AnalysisOutput, ProjectTrials};
    use crate::utils::error::GeostorError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingPipeline {
        calls: AtomicUsize,
        fail_extract: bool,
    }

    #[async_trait::async_trait]
    impl Pipeline for CountingPipeline {
        async fn extract(&self) -> Result<ProjectTrials> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_extract {
                return Err(GeostorError::NoData {
                    message: "No data found for project number: X".to_string(),
                });
            }
            Ok(ProjectTrials {
                project_number: "X".to_string(),
                ..Default::default()
            })
        }

        async fn transform(&self, data: ProjectTrials) -> Result<AnalysisOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(AnalysisOutput {
                project_number: data.project_number,
                ..Default::default()
            })
        }

        async fn load(&self, result: AnalysisOutput) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("out/atterberg_{}.csv", result.project_number))
        }
    }

    #[tokio::test]
    async fn test_engine_runs_all_stages() {
        let engine = PipelineEngine::new(CountingPipeline {
            calls: AtomicUsize::new(0),
            fail_extract: false,
        });
        let path = engine.run().await.unwrap();
        assert_eq!(path, "out/atterberg_X.csv");
        assert_eq!(engine.pipeline().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_engine_stops_after_failed_extract() {
        let engine = PipelineEngine::new_with_monitoring(
            CountingPipeline {
                calls: AtomicUsize::new(0),
                fail_extract: true,
            },
            true,
        );
        let err = engine.run().await.unwrap_err();
        assert!(matches!(err, GeostorError::NoData { .. }));
        assert_eq!(engine.pipeline().calls.load(Ordering::SeqCst), 1);
    }
}
