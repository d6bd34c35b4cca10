use anyhow::Result;
use geostor::app::export::export_project;
use geostor::app::import::{import_ags_abbreviations, ImportSummary};
use geostor::domain::model::{GeologyLayer, LabTest, LocationFields, NewSample, ProjectFields, SampleFields};
use geostor::{Database, GeostorError, LocalStorage};
use std::io::Read;
use tempfile::TempDir;

#[test]
fn test_initialize_refuses_existing_file_without_force() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("geostor.db");

    let db = Database::initialize(&path, false)?;
    db.create_project("Old", &ProjectFields::default())?;
    drop(db);

    let err = Database::initialize(&path, false).unwrap_err();
    assert!(matches!(err, GeostorError::Conflict { .. }));

    let db = Database::initialize(&path, true)?;
    assert!(db.list_projects()?.is_empty());
    db.verify_schema()?;
    Ok(())
}

#[test]
fn test_ags_import_into_file_database() -> Result<()> {
    let dir = TempDir::new()?;
    let csv = dir.path().join("AGS_abbreviations.csv");
    std::fs::write(
        &csv,
        "ABBR_HDNG,ABBR_CODE,ABBR_DESC,ABBR_LIST,ABBR_REM,FILE_FSET\n\
         SAMP_TYPE,U,Undisturbed sample,ABBR_LIST_2,,\n\
         SAMP_TYPE,B,Bulk disturbed sample,ABBR_LIST_2,,\n\
         LOCA_TYPE,CP,Cable percussion,ABBR_LIST_1,,\n",
    )?;
    let db = Database::initialize(dir.path().join("geostor.db"), false)?;

    let summary = import_ags_abbreviations(&db, &csv)?;
    assert_eq!(summary, ImportSummary { inserted: 3, skipped: 0 });

    let samp_types = db.get_ags_codes_map("SAMP_TYPE")?;
    assert_eq!(samp_types.keys().collect::<Vec<_>>(), vec!["B", "U"]);
    assert_eq!(
        db.get_ags_code_description("LOCA_TYPE", "CP")?.as_deref(),
        Some("Cable percussion")
    );

    // re-importing the same file is idempotent
    import_ags_abbreviations(&db, &csv)?;
    assert_eq!(db.count_abbreviations()?, 3);
    Ok(())
}

#[tokio::test]
async fn test_project_export_contains_all_tables() -> Result<()> {
    let dir = TempDir::new()?;
    let db = Database::initialize(dir.path().join("geostor.db"), false)?;
    let project = db.create_project(
        "Rail cutting",
        &ProjectFields {
            number: Some("RC-3".to_string()),
            ..Default::default()
        },
    )?;
    let loc = db.create_location(project, "TP01", &LocationFields::default())?;
    db.create_geology(
        loc,
        &GeologyLayer {
            id: 0,
            location_id: loc,
            top_depth: 0.0,
            base_depth: 0.4,
            legend: Some("TOPSOIL".to_string()),
            description: Some("Soft brown sandy topsoil".to_string()),
            consistency: None,
            weathering: None,
            structure: None,
            remarks: None,
        },
    )?;
    let sample = db.create_sample(&NewSample {
        location_id: loc,
        reference: "B1".to_string(),
        sample_type: "B".to_string(),
        top_depth: 0.5,
        details: SampleFields::default(),
    })?;
    db.create_lab_test(
        sample,
        &LabTest {
            id: 0,
            sample_id: sample,
            test_type: "MC".to_string(),
            test_result: Some(18.5),
            test_unit: Some("%".to_string()),
            test_date: None,
            remarks: None,
        },
    )?;

    let storage = LocalStorage::new(dir.path().join("exports"));
    let formats = vec!["csv".to_string(), "json".to_string()];
    export_project(&db, &storage, "RC-3", &formats).await?;

    let file = std::fs::File::open(dir.path().join("exports/RC-3_export.zip"))?;
    let mut archive = zip::ZipArchive::new(file)?;
    for name in [
        "locations.csv",
        "samples.csv",
        "geology.csv",
        "laboratory.csv",
        "atterberg_limits.csv",
        "project.json",
        "locations.json",
        "samples.json",
        "geology.json",
        "laboratory.json",
        "atterberg_limits.json",
    ] {
        assert!(archive.by_name(name).is_ok(), "missing {}", name);
    }

    let mut lab = String::new();
    archive.by_name("laboratory.csv")?.read_to_string(&mut lab)?;
    assert!(lab.contains("TP01,B1,MC,18.5,%"));

    let mut lab_json = String::new();
    archive.by_name("laboratory.json")?.read_to_string(&mut lab_json)?;
    let lab_json: serde_json::Value = serde_json::from_str(&lab_json)?;
    assert_eq!(lab_json[0]["sample_reference"], "B1");
    assert_eq!(lab_json[0]["test_type"], "MC");

    let mut samples_json = String::new();
    archive.by_name("samples.json")?.read_to_string(&mut samples_json)?;
    let samples_json: serde_json::Value = serde_json::from_str(&samples_json)?;
    assert_eq!(samples_json[0]["location_name"], "TP01");
    assert_eq!(samples_json[0]["reference"], "B1");

    let mut geology = String::new();
    archive.by_name("geology.json")?.read_to_string(&mut geology)?;
    let geology: serde_json::Value = serde_json::from_str(&geology)?;
    assert_eq!(geology[0]["location_name"], "TP01");
    assert_eq!(geology[0]["legend"], "TOPSOIL");
    Ok(())
}
