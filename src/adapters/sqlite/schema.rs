use crate::utils::error::{GeostorError, Result};
use rusqlite::Connection;
use std::collections::HashSet;

pub(crate) const CREATE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS project (
    project_id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_number TEXT UNIQUE,
    project_name TEXT NOT NULL UNIQUE,
    project_location TEXT,
    project_client TEXT,
    project_contractor TEXT,
    project_engineer TEXT,
    project_comments TEXT,
    file_reference TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS location (
    location_id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER NOT NULL,
    location_name TEXT NOT NULL,
    location_type TEXT,
    location_status TEXT,
    location_easting REAL,
    location_northing REAL,
    location_epsg_code TEXT,
    location_grid_ref_system TEXT,
    location_ground_elevation REAL,
    location_remarks TEXT,
    location_final_depth REAL,
    location_start_date TEXT,
    location_end_date TEXT,
    location_purpose TEXT,
    location_termination_reason TEXT,
    location_lat REAL,
    location_lon REAL,
    location_method TEXT,
    location_sub_division TEXT,
    location_phase_grouping_code TEXT,
    file_reference TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (project_id, location_name),
    FOREIGN KEY (project_id) REFERENCES project(project_id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS sample (
    sample_id INTEGER PRIMARY KEY AUTOINCREMENT,
    location_id INTEGER NOT NULL,
    sample_top_depth REAL NOT NULL,
    sample_reference TEXT NOT NULL,
    sample_type TEXT NOT NULL,
    sample_base_depth REAL,
    sample_date_time TEXT,
    sample_blows INTEGER,
    sample_container TEXT,
    sample_diameter REAL,
    sample_water_depth REAL,
    sample_recovery_percent REAL,
    sample_method TEXT,
    sample_description TEXT,
    sample_remarks TEXT,
    sample_condition TEXT,
    sample_classification TEXT,
    sample_stratum_reference TEXT,
    file_reference TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (location_id, sample_reference),
    FOREIGN KEY (location_id) REFERENCES location(location_id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS geology (
    geology_id INTEGER PRIMARY KEY AUTOINCREMENT,
    location_id INTEGER NOT NULL,
    top_depth REAL NOT NULL,
    base_depth REAL NOT NULL,
    legend TEXT,
    description TEXT,
    consistency TEXT,
    weathering TEXT,
    structure TEXT,
    remarks TEXT,
    created_at TEXT NOT NULL,
    FOREIGN KEY (location_id) REFERENCES location(location_id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS laboratory (
    test_id INTEGER PRIMARY KEY AUTOINCREMENT,
    sample_id INTEGER NOT NULL,
    test_type TEXT NOT NULL,
    test_result REAL,
    test_unit TEXT,
    test_date TEXT,
    remarks TEXT,
    created_at TEXT NOT NULL,
    FOREIGN KEY (sample_id) REFERENCES sample(sample_id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS ags_abbreviations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    abbr_heading TEXT NOT NULL,
    abbr_code TEXT NOT NULL,
    abbr_description TEXT,
    abbr_list TEXT,
    abbr_remarks TEXT,
    abbr_file_set TEXT,
    UNIQUE (abbr_heading, abbr_code)
);

CREATE TABLE IF NOT EXISTS liquidlimit (
    ll_id INTEGER PRIMARY KEY AUTOINCREMENT,
    sample_id INTEGER NOT NULL,
    trial INTEGER NOT NULL,
    drops REAL NOT NULL,
    tare REAL NOT NULL,
    taremoist REAL NOT NULL,
    taredry REAL NOT NULL,
    is_active INTEGER DEFAULT 1,
    FOREIGN KEY (sample_id) REFERENCES sample(sample_id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS plasticlimit (
    pl_id INTEGER PRIMARY KEY AUTOINCREMENT,
    sample_id INTEGER NOT NULL,
    trial INTEGER NOT NULL,
    tare REAL NOT NULL,
    taremoist REAL NOT NULL,
    taredry REAL NOT NULL,
    is_active INTEGER DEFAULT 1,
    FOREIGN KEY (sample_id) REFERENCES sample(sample_id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS atterberglimits (
    atterberg_id INTEGER PRIMARY KEY AUTOINCREMENT,
    sample_id INTEGER NOT NULL,
    liquid_limit REAL,
    plastic_limit REAL,
    plasticity_index REAL,
    soil_description TEXT DEFAULT 'NP',
    date_calculated TEXT DEFAULT CURRENT_TIMESTAMP,
    is_active INTEGER DEFAULT 1,
    FOREIGN KEY (sample_id) REFERENCES sample(sample_id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_location_project ON location(project_id);
CREATE INDEX IF NOT EXISTS idx_sample_location ON sample(location_id);
CREATE INDEX IF NOT EXISTS idx_liquidlimit_sample ON liquidlimit(sample_id, is_active);
CREATE INDEX IF NOT EXISTS idx_plasticlimit_sample ON plasticlimit(sample_id, is_active);
CREATE INDEX IF NOT EXISTS idx_atterberg_sample ON atterberglimits(sample_id, is_active);
"#;

/// Child tables first so the drops succeed with foreign keys enabled.
pub(crate) const DROP_SCHEMA: &str = r#"
DROP TABLE IF EXISTS atterberglimits;
DROP TABLE IF EXISTS plasticlimit;
DROP TABLE IF EXISTS liquidlimit;
DROP TABLE IF EXISTS laboratory;
DROP TABLE IF EXISTS geology;
DROP TABLE IF EXISTS sample;
DROP TABLE IF EXISTS location;
DROP TABLE IF EXISTS project;
DROP TABLE IF EXISTS ags_abbreviations;
"#;

/// Tables and columns the Atterberg analysis reads or writes.
pub(crate) const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    (
        "liquidlimit",
        &["sample_id", "trial", "drops", "tare", "taremoist", "taredry", "is_active"],
    ),
    (
        "plasticlimit",
        &["sample_id", "trial", "tare", "taremoist", "taredry", "is_active"],
    ),
    ("project", &["project_id", "project_number"]),
    ("location", &["location_id", "project_id", "location_name"]),
    ("sample", &["sample_id", "location_id", "sample_reference"]),
    (
        "atterberglimits",
        &[
            "sample_id",
            "liquid_limit",
            "plastic_limit",
            "plasticity_index",
            "soil_description",
            "date_calculated",
            "is_active",
        ],
    ),
];

pub(crate) fn verify(conn: &Connection) -> Result<()> {
    let existing_tables: HashSet<String> = {
        let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        rows.collect::<rusqlite::Result<_>>()?
    };

    for (table, columns) in REQUIRED_COLUMNS {
        if !existing_tables.contains(*table) {
            return Err(GeostorError::SchemaError {
                message: format!("Required table '{}' not found in database", table),
            });
        }

        let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
        let existing_columns: HashSet<String> = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<rusqlite::Result<_>>()?;

        let mut missing: Vec<&str> = columns
            .iter()
            .copied()
            .filter(|c| !existing_columns.contains(*c))
            .collect();
        if !missing.is_empty() {
            missing.sort_unstable();
            return Err(GeostorError::SchemaError {
                message: format!(
                    "Table '{}' is missing required columns: {}",
                    table,
                    missing.join(", ")
                ),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(CREATE_SCHEMA).unwrap();
        conn
    }

    #[test]
    fn test_created_schema_verifies() {
        let conn = fresh();
        assert!(verify(&conn).is_ok());
    }

    #[test]
    fn test_missing_table_is_reported() {
        let conn = fresh();
        conn.execute_batch("DROP TABLE atterberglimits;").unwrap();
        let err = verify(&conn).unwrap_err();
        assert!(err.to_string().contains("'atterberglimits' not found"));
    }

    #[test]
    fn test_missing_columns_are_reported() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(CREATE_SCHEMA).unwrap();
        conn.execute_batch(
            "DROP TABLE plasticlimit;
             CREATE TABLE plasticlimit (pl_id INTEGER PRIMARY KEY, sample_id INTEGER, trial INTEGER);",
        )
        .unwrap();
        let err = verify(&conn).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("'plasticlimit' is missing required columns"));
        assert!(message.contains("taredry"));
    }

    #[test]
    fn test_drop_then_create_is_idempotent() {
        let conn = fresh();
        conn.execute_batch(DROP_SCHEMA).unwrap();
        conn.execute_batch(CREATE_SCHEMA).unwrap();
        conn.execute_batch(CREATE_SCHEMA).unwrap();
        assert!(verify(&conn).is_ok());
    }
}
