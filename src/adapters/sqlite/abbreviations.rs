use super::Database;
use crate::domain::model::AgsAbbreviation;
use crate::utils::error::{GeostorError, Result};
use crate::utils::validation::validate_non_empty_string;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;

/// Upserts one dictionary row. Shared by the CSV import transaction.
pub(crate) fn upsert_abbreviation(conn: &Connection, abbr: &AgsAbbreviation) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO ags_abbreviations
             (abbr_heading, abbr_code, abbr_description, abbr_list, abbr_remarks, abbr_file_set)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT (abbr_heading, abbr_code) DO UPDATE SET
             abbr_description = excluded.abbr_description,
             abbr_list = excluded.abbr_list,
             abbr_remarks = excluded.abbr_remarks,
             abbr_file_set = excluded.abbr_file_set",
        params![
            abbr.heading,
            abbr.code,
            abbr.description,
            abbr.list,
            abbr.remarks,
            abbr.file_set,
        ],
    )
}

impl Database {
    /// All codes under an AGS heading such as `LOCA_TYPE`, ordered by code.
    pub fn get_ags_codes(&self, heading: &str) -> Result<Vec<AgsAbbreviation>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, abbr_heading, abbr_code, abbr_description, abbr_list, abbr_remarks,
                    abbr_file_set
             FROM ags_abbreviations WHERE abbr_heading = ?1 ORDER BY abbr_code",
        )?;
        let codes = stmt
            .query_map(params![heading], |row| {
                Ok(AgsAbbreviation {
                    id: row.get(0)?,
                    heading: row.get(1)?,
                    code: row.get(2)?,
                    description: row.get(3)?,
                    list: row.get(4)?,
                    remarks: row.get(5)?,
                    file_set: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(codes)
    }

    pub fn get_ags_code_description(&self, heading: &str, code: &str) -> Result<Option<String>> {
        let conn = self.lock();
        let description: Option<Option<String>> = conn
            .query_row(
                "SELECT abbr_description FROM ags_abbreviations
                 WHERE abbr_heading = ?1 AND abbr_code = ?2",
                params![heading, code],
                |row| row.get(0),
            )
            .optional()?;
        Ok(description.flatten())
    }

    /// code -> description pairs for a heading.
    pub fn get_ags_codes_map(&self, heading: &str) -> Result<BTreeMap<String, String>> {
        Ok(self
            .get_ags_codes(heading)?
            .into_iter()
            .map(|a| (a.code, a.description.unwrap_or_default()))
            .collect())
    }

    /// Adds a user-defined code, marked with `abbr_list = 'custom'`.
    pub fn add_custom_abbreviation(&self, heading: &str, code: &str, description: Option<&str>) -> Result<i64> {
        validate_non_empty_string("Heading", heading)?;
        validate_non_empty_string("Code", code)?;
        let conn = self.lock();
        conn.execute(
            "INSERT INTO ags_abbreviations (abbr_heading, abbr_code, abbr_description, abbr_list)
             VALUES (?1, ?2, ?3, 'custom')",
            params![heading.trim(), code.trim(), description],
        )
        .map_err(|e| {
            GeostorError::from_constraint(
                e,
                format!("Code '{}' already exists under heading '{}'", code.trim(), heading.trim()),
            )
        })?;
        Ok(conn.last_insert_rowid())
    }

    pub fn count_abbreviations(&self) -> Result<i64> {
        let conn = self.lock();
        Ok(conn.query_row("SELECT COUNT(*) FROM ags_abbreviations", [], |row| row.get(0))?)
    }
}
