//! CSV loaders for the AGS abbreviation dictionary and raw laboratory trials.

use crate::adapters::sqlite::abbreviations::upsert_abbreviation;
use crate::adapters::sqlite::trials::{insert_liquid_limit, insert_plastic_limit};
use crate::adapters::sqlite::Database;
use crate::domain::model::{AgsAbbreviation, LiquidLimitTrial, PlasticLimitTrial};
use crate::utils::error::{GeostorError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub skipped: usize,
}

fn open_csv(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    if !path.is_file() {
        return Err(GeostorError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("CSV file not found: {}", path.display()),
        )));
    }
    Ok(csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Loads an AGS `ABBR` export. Rows are upserted on (heading, code) inside a
/// single transaction.
pub fn import_ags_abbreviations(db: &Database, csv_path: impl AsRef<Path>) -> Result<ImportSummary> {
    let path = csv_path.as_ref();
    let mut reader = open_csv(path)?;

    let headers = reader.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
    let (heading_col, code_col) = match (column("ABBR_HDNG"), column("ABBR_CODE")) {
        (Some(h), Some(c)) => (h, c),
        _ => {
            return Err(GeostorError::validation(format!(
                "{} must have ABBR_HDNG and ABBR_CODE columns",
                path.display()
            )))
        }
    };
    let desc_col = column("ABBR_DESC");
    let list_col = column("ABBR_LIST");
    let rem_col = column("ABBR_REM");
    let fset_col = column("FILE_FSET");

    let mut summary = ImportSummary::default();
    let mut conn = db.lock();
    let tx = conn.transaction()?;

    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let field = |col: Option<usize>| non_empty(col.and_then(|c| record.get(c)));

        let (Some(heading), Some(code)) = (field(Some(heading_col)), field(Some(code_col))) else {
            tracing::warn!("⚠️ Skipping row {}: missing heading or code", index + 2);
            summary.skipped += 1;
            continue;
        };

        upsert_abbreviation(
            &tx,
            &AgsAbbreviation {
                id: 0,
                heading,
                code,
                description: field(desc_col),
                list: field(list_col),
                remarks: field(rem_col),
                file_set: field(fset_col),
            },
        )?;
        summary.inserted += 1;
    }

    tx.commit()?;
    tracing::info!(
        "📚 Imported {} abbreviations from {} ({} skipped)",
        summary.inserted,
        path.display(),
        summary.skipped
    );
    Ok(summary)
}

#[derive(Debug, Deserialize)]
struct TrialCsvRow {
    project_number: String,
    location_name: String,
    sample_reference: String,
    test: String,
    trial: i64,
    drops: Option<f64>,
    tare: f64,
    taremoist: f64,
    taredry: f64,
}

/// Bulk-loads LL and PL trials. Any bad row aborts the whole file.
pub fn import_trials(db: &Database, csv_path: impl AsRef<Path>) -> Result<ImportSummary> {
    let path = csv_path.as_ref();
    let mut reader = open_csv(path)?;

    let mut rows = Vec::new();
    for (index, row) in reader.deserialize::<TrialCsvRow>().enumerate() {
        rows.push((index + 2, row?));
    }

    // sample lookups need the connection, so resolve before the transaction
    let mut samples: HashMap<(String, String, String), i64> = HashMap::new();
    let mut resolved = Vec::with_capacity(rows.len());
    for (line, row) in rows {
        let key = (
            row.project_number.clone(),
            row.location_name.clone(),
            row.sample_reference.clone(),
        );
        let sample_id = match samples.get(&key) {
            Some(id) => *id,
            None => {
                let sample = db.find_sample(&key.0, &key.1, &key.2)?.ok_or_else(|| {
                    GeostorError::validation(format!(
                        "Row {}: sample {}/{}/{} not found",
                        line, key.0, key.1, key.2
                    ))
                })?;
                samples.insert(key, sample.id);
                sample.id
            }
        };
        resolved.push((line, row, sample_id));
    }

    let mut summary = ImportSummary::default();
    let mut conn = db.lock();
    let tx = conn.transaction()?;

    for (line, row, sample_id) in &resolved {
        let sample_id = *sample_id;
        let inserted = match row.test.to_ascii_uppercase().as_str() {
            "LL" => {
                let drops = row.drops.ok_or_else(|| {
                    GeostorError::validation(format!("Row {}: liquid limit trial needs drops", line))
                })?;
                insert_liquid_limit(
                    &tx,
                    sample_id,
                    &LiquidLimitTrial {
                        trial: row.trial,
                        drops,
                        tare: row.tare,
                        tare_moist: row.taremoist,
                        tare_dry: row.taredry,
                    },
                )
            }
            "PL" => insert_plastic_limit(
                &tx,
                sample_id,
                &PlasticLimitTrial {
                    trial: row.trial,
                    tare: row.tare,
                    tare_moist: row.taremoist,
                    tare_dry: row.taredry,
                },
            ),
            other => Err(GeostorError::validation(format!(
                "unknown test '{}', expected LL or PL",
                other
            ))),
        };
        inserted.map_err(|e| match e {
            GeostorError::ValidationError { message } => {
                GeostorError::validation(format!("Row {}: {}", line, message))
            }
            GeostorError::Conflict { message } => GeostorError::conflict(format!("Row {}: {}", line, message)),
            other => other,
        })?;
        summary.inserted += 1;
    }

    tx.commit()?;
    tracing::info!("🧪 Imported {} trials from {}", summary.inserted, path.display());
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{LocationFields, NewSample, ProjectFields, SampleFields};
    use std::io::Write;
    use tempfile::TempDir;

    fn write_csv(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_abbreviation_import_upserts_and_skips() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            "abbr.csv",
            "ABBR_HDNG,ABBR_CODE,ABBR_DESC,ABBR_LIST\n\
             LOCA_TYPE,BH,Borehole,ABBR_LIST_1\n\
             LOCA_TYPE,TP,Trial pit,\n\
             ,XX,No heading,\n\
             LOCA_TYPE,BH,Cable percussion borehole,\n",
        );
        let db = Database::in_memory().unwrap();
        let summary = import_ags_abbreviations(&db, &path).unwrap();

        assert_eq!(summary, ImportSummary { inserted: 3, skipped: 1 });
        assert_eq!(db.count_abbreviations().unwrap(), 2);
        assert_eq!(
            db.get_ags_code_description("LOCA_TYPE", "BH").unwrap().as_deref(),
            Some("Cable percussion borehole")
        );
    }

    #[test]
    fn test_missing_file_is_reported() {
        let db = Database::in_memory().unwrap();
        let err = import_ags_abbreviations(&db, "/nonexistent/abbr.csv").unwrap_err();
        assert!(err.to_string().contains("CSV file not found: /nonexistent/abbr.csv"));
    }

    #[test]
    fn test_trial_import_rolls_back_on_unknown_sample() {
        let dir = TempDir::new().unwrap();
        let db = Database::in_memory().unwrap();
        let project = db
            .create_project(
                "Quay",
                &ProjectFields {
                    number: Some("Q1".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        let loc = db.create_location(project, "BH01", &LocationFields::default()).unwrap();
        db.create_sample(&NewSample {
            location_id: loc,
            reference: "1".to_string(),
            sample_type: "U".to_string(),
            top_depth: 1.0,
            details: SampleFields::default(),
        })
        .unwrap();

        let good = write_csv(
            &dir,
            "good.csv",
            "project_number,location_name,sample_reference,test,trial,drops,tare,taremoist,taredry\n\
             Q1,BH01,1,LL,1,32,20.0,35.0,30.0\n\
             Q1,BH01,1,PL,1,,20.0,22.2,21.8\n",
        );
        assert_eq!(import_trials(&db, &good).unwrap().inserted, 2);
        assert_eq!(db.fetch_liquid_limit_rows("Q1").unwrap().len(), 1);

        let bad = write_csv(
            &dir,
            "bad.csv",
            "project_number,location_name,sample_reference,test,trial,drops,tare,taremoist,taredry\n\
             Q1,BH01,1,LL,2,25,20.0,35.0,30.0\n\
             Q1,BH09,1,LL,1,25,20.0,35.0,30.0\n",
        );
        let err = import_trials(&db, &bad).unwrap_err();
        assert!(err.to_string().contains("Row 3"));
        assert_eq!(db.fetch_liquid_limit_rows("Q1").unwrap().len(), 1);
    }
}
