//! Project bundle export: one zip with a CSV per table.

use crate::adapters::sqlite::Database;
use crate::domain::model::{GeologyLayer, LabTest, Location, Sample};
use crate::app::pipelines::atterberg_pipeline::file_stem;
use crate::domain::ports::Storage;
use crate::utils::error::{GeostorError, Result};
use serde::Serialize;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

fn opt<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(T::to_string).unwrap_or_default()
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| GeostorError::IoError(e.into_error()))
}

fn locations_csv(locations: &[Location]) -> Result<Vec<u8>> {
    let mut w = csv::Writer::from_writer(Vec::new());
    w.write_record([
        "location_id",
        "location_name",
        "location_type",
        "status",
        "easting",
        "northing",
        "ground_elevation",
        "final_depth",
        "start_date",
        "end_date",
        "lat",
        "lon",
        "method",
        "remarks",
    ])?;
    for loc in locations {
        let d = &loc.details;
        w.write_record([
            loc.id.to_string(),
            loc.name.clone(),
            opt(&d.location_type),
            opt(&d.status),
            opt(&d.easting),
            opt(&d.northing),
            opt(&d.ground_elevation),
            opt(&d.final_depth),
            opt(&d.start_date),
            opt(&d.end_date),
            opt(&d.lat),
            opt(&d.lon),
            opt(&d.method),
            opt(&d.remarks),
        ])?;
    }
    finish(w)
}

fn samples_csv(samples: &[(String, Sample)]) -> Result<Vec<u8>> {
    let mut w = csv::Writer::from_writer(Vec::new());
    w.write_record([
        "sample_id",
        "location_name",
        "sample_reference",
        "sample_type",
        "top_depth",
        "base_depth",
        "description",
        "classification",
        "remarks",
    ])?;
    for (location_name, s) in samples {
        w.write_record([
            s.id.to_string(),
            location_name.clone(),
            s.reference.clone(),
            s.sample_type.clone(),
            s.top_depth.to_string(),
            opt(&s.details.base_depth),
            opt(&s.details.description),
            opt(&s.details.classification),
            opt(&s.details.remarks),
        ])?;
    }
    finish(w)
}

#[derive(Serialize)]
struct GeologyRow<'a> {
    location_name: &'a str,
    #[serde(flatten)]
    layer: &'a GeologyLayer,
}

#[derive(Serialize)]
struct SampleRow<'a> {
    location_name: &'a str,
    #[serde(flatten)]
    sample: &'a Sample,
}

#[derive(Serialize)]
struct LabTestRow<'a> {
    location_name: &'a str,
    sample_reference: &'a str,
    #[serde(flatten)]
    test: &'a LabTest,
}

fn geology_csv(layers: &[(String, GeologyLayer)]) -> Result<Vec<u8>> {
    let mut w = csv::Writer::from_writer(Vec::new());
    w.write_record([
        "location_name",
        "top_depth",
        "base_depth",
        "legend",
        "description",
        "consistency",
        "weathering",
        "structure",
        "remarks",
    ])?;
    for (location_name, g) in layers {
        w.write_record([
            location_name.clone(),
            g.top_depth.to_string(),
            g.base_depth.to_string(),
            opt(&g.legend),
            opt(&g.description),
            opt(&g.consistency),
            opt(&g.weathering),
            opt(&g.structure),
            opt(&g.remarks),
        ])?;
    }
    finish(w)
}

fn lab_tests_csv(tests: &[(String, String, LabTest)]) -> Result<Vec<u8>> {
    let mut w = csv::Writer::from_writer(Vec::new());
    w.write_record([
        "location_name",
        "sample_reference",
        "test_type",
        "test_result",
        "test_unit",
        "test_date",
        "remarks",
    ])?;
    for (location_name, reference, t) in tests {
        w.write_record([
            location_name.clone(),
            reference.clone(),
            t.test_type.clone(),
            opt(&t.test_result),
            opt(&t.test_unit),
            opt(&t.test_date),
            opt(&t.remarks),
        ])?;
    }
    finish(w)
}

/// Writes `<project>_export.zip` with the project's tables as CSV (and JSON
/// copies when `formats` asks for them). Returns the archive location.
pub async fn export_project<S: Storage>(
    db: &Database,
    storage: &S,
    project_number: &str,
    formats: &[String],
) -> Result<String> {
    let project = db.require_project_by_number(project_number)?;
    let locations = db.list_locations(Some(project.id))?;

    let mut samples = Vec::new();
    let mut geology = Vec::new();
    let mut lab_tests = Vec::new();
    for loc in &locations {
        for layer in db.list_geology(loc.id)? {
            geology.push((loc.name.clone(), layer));
        }
        for sample in db.list_samples(loc.id)? {
            for test in db.list_lab_tests(sample.id)? {
                lab_tests.push((loc.name.clone(), sample.reference.clone(), test));
            }
            samples.push((loc.name.clone(), sample));
        }
    }
    let results = db.list_atterberg_results(project_number)?;

    let mut files: Vec<(&str, Vec<u8>)> = vec![
        ("locations.csv", locations_csv(&locations)?),
        ("samples.csv", samples_csv(&samples)?),
        ("geology.csv", geology_csv(&geology)?),
        ("laboratory.csv", lab_tests_csv(&lab_tests)?),
    ];
    let mut w = csv::Writer::from_writer(Vec::new());
    for result in &results {
        w.serialize(result)?;
    }
    files.push(("atterberg_limits.csv", finish(w)?));

    if formats.iter().any(|f| f == "json") {
        files.push(("project.json", serde_json::to_vec_pretty(&project)?));
        files.push(("locations.json", serde_json::to_vec_pretty(&locations)?));
        let rows: Vec<GeologyRow<'_>> = geology
            .iter()
            .map(|(location_name, layer)| GeologyRow { location_name, layer })
            .collect();
        files.push(("geology.json", serde_json::to_vec_pretty(&rows)?));
        let sample_rows: Vec<SampleRow<'_>> = samples
            .iter()
            .map(|(location_name, sample)| SampleRow { location_name, sample })
            .collect();
        files.push(("samples.json", serde_json::to_vec_pretty(&sample_rows)?));
        let test_rows: Vec<LabTestRow<'_>> = lab_tests
            .iter()
            .map(|(location_name, sample_reference, test)| LabTestRow {
                location_name,
                sample_reference,
                test,
            })
            .collect();
        files.push(("laboratory.json", serde_json::to_vec_pretty(&test_rows)?));
        files.push(("atterberg_limits.json", serde_json::to_vec_pretty(&results)?));
    }

    tracing::debug!("Creating ZIP file with {} files", files.len());
    let zip_data = {
        let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
        for (name, data) in &files {
            zip.start_file::<_, ()>(*name, FileOptions::default())?;
            zip.write_all(data)?;
        }
        zip.finish()?.into_inner()
    };

    let archive_name = format!("{}_export.zip", file_stem(project_number));
    storage.write_file(&archive_name, &zip_data).await?;
    tracing::info!(
        "📦 Exported {} locations, {} samples and {} results for project {}",
        locations.len(),
        samples.len(),
        results.len(),
        project_number
    );
    Ok(storage.locate(&archive_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::LocalStorage;
    use crate::domain::model::{LocationFields, NewSample, ProjectFields, SampleFields};
    use std::io::Read;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_export_bundles_tables() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        let db = Database::in_memory().unwrap();
        let project = db
            .create_project(
                "Bypass",
                &ProjectFields {
                    number: Some("B-7".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        let loc = db
            .create_location(
                project,
                "TP01",
                &LocationFields {
                    location_type: Some("TP".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        db.create_sample(&NewSample {
            location_id: loc,
            reference: "D1".to_string(),
            sample_type: "D".to_string(),
            top_depth: 0.5,
            details: SampleFields::default(),
        })
        .unwrap();

        let path = export_project(&db, &storage, "B-7", &["csv".to_string()])
            .await
            .unwrap();
        assert!(path.ends_with("B-7_export.zip"));

        let file = std::fs::File::open(dir.path().join("B-7_export.zip")).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        assert_eq!(archive.len(), 5);
        let mut samples = String::new();
        archive
            .by_name("samples.csv")
            .unwrap()
            .read_to_string(&mut samples)
            .unwrap();
        assert!(samples.contains("TP01,D1,D,0.5"));
        assert!(archive.by_name("project.json").is_err());
    }

    #[tokio::test]
    async fn test_archive_name_matches_pipeline_file_stem() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        let db = Database::in_memory().unwrap();
        db.create_project(
            "Spur",
            &ProjectFields {
                number: Some("S 4/B".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        export_project(&db, &storage, "S 4/B", &[]).await.unwrap();
        assert_eq!(file_stem("S 4/B"), "S_4_B");
        assert!(dir.path().join("S_4_B_export.zip").is_file());
    }

    #[tokio::test]
    async fn test_export_unknown_project() {
        let dir = TempDir::new().unwrap();
        let db = Database::in_memory().unwrap();
        let err = export_project(&db, &LocalStorage::new(dir.path()), "nope", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, GeostorError::NoData { .. }));
    }
}
