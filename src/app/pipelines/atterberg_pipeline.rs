use crate::adapters::sqlite::Database;
use crate::core::atterberg;
use crate::domain::model::{AnalysisOutput, AtterbergResult, ProjectTrials, SampleCharts};
use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
use crate::utils::error::{GeostorError, Result};
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

/// Atterberg limits analysis for one project: raw trials in, results and
/// chart data out.
pub struct AtterbergPipeline<S: Storage, C: ConfigProvider> {
    pub(crate) db: Database,
    pub(crate) storage: S,
    pub(crate) config: C,
    pub(crate) project_number: String,
}

impl<S: Storage, C: ConfigProvider> AtterbergPipeline<S, C> {
    pub fn new(db: Database, storage: S, config: C, project_number: impl Into<String>) -> Self {
        Self {
            db,
            storage,
            config,
            project_number: project_number.into(),
        }
    }

    fn wants(&self, format: &str) -> bool {
        self.config.output_formats().iter().any(|f| f == format)
    }
}

/// File-system friendly name for chart files.
pub(crate) fn file_stem(part: &str) -> String {
    part.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect()
}

pub(crate) fn results_csv(results: &[AtterbergResult]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for result in results {
        writer.serialize(result)?;
    }
    writer
        .into_inner()
        .map_err(|e| GeostorError::IoError(e.into_error()))
}

fn chart_file_name(charts: &SampleCharts) -> String {
    format!(
        "charts/{}_{}.json",
        file_stem(&charts.location_name),
        file_stem(&charts.sample_reference)
    )
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for AtterbergPipeline<S, C> {
    async fn extract(&self) -> Result<ProjectTrials> {
        self.db.verify_schema()?;

        let liquid_limit = self.db.fetch_liquid_limit_rows(&self.project_number)?;
        if liquid_limit.is_empty() {
            return Err(GeostorError::NoData {
                message: format!("No data found for project number: {}", self.project_number),
            });
        }
        let plastic_limit = self.db.fetch_plastic_limit_rows(&self.project_number)?;
        if plastic_limit.is_empty() {
            tracing::warn!(
                "No plastic limit trials for project {}; plasticity index will not be computed",
                self.project_number
            );
        }

        tracing::debug!(
            "Fetched {} LL and {} PL rows for project {}",
            liquid_limit.len(),
            plastic_limit.len(),
            self.project_number
        );

        Ok(ProjectTrials {
            project_number: self.project_number.clone(),
            liquid_limit,
            plastic_limit,
        })
    }

    async fn transform(&self, data: ProjectTrials) -> Result<AnalysisOutput> {
        atterberg::analyse_project(&data, self.config.atterberg())
    }

    async fn load(&self, result: AnalysisOutput) -> Result<String> {
        let saved = self.db.save_atterberg_results(&result.results)?;
        tracing::info!("Saved {} Atterberg results to the database", saved);

        let base = format!("atterberg_{}", file_stem(&result.project_number));
        let mut files: Vec<(String, Vec<u8>)> = Vec::new();

        if self.wants("csv") {
            files.push((format!("{}.csv", base), results_csv(&result.results)?));
        }
        if self.wants("json") {
            files.push((
                format!("{}.json", base),
                serde_json::to_vec_pretty(&result.results)?,
            ));
            for charts in &result.charts {
                if charts.flow_curve.is_none() && charts.plasticity_chart.is_none() {
                    continue;
                }
                files.push((chart_file_name(charts), serde_json::to_vec_pretty(charts)?));
            }
        }

        if self.config.archive_enabled() {
            let archive_name = format!("{}.zip", base);
            tracing::debug!("Creating ZIP file with {} files", files.len());

            let zip_data = {
                let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
                for (name, data) in &files {
                    zip.start_file::<_, ()>(name.as_str(), FileOptions::default())?;
                    zip.write_all(data)?;
                }
                let cursor = zip.finish()?;
                cursor.into_inner()
            };

            self.storage.write_file(&archive_name, &zip_data).await?;
            return Ok(self.storage.locate(&archive_name));
        }

        for (name, data) in &files {
            self.storage.write_file(name, data).await?;
        }

        Ok(files
            .first()
            .map(|(name, _)| self.storage.locate(name))
            .unwrap_or_else(|| self.storage.locate("")))
    }
}
