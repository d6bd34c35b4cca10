use super::Database;
use crate::domain::model::{NewSample, Sample, SampleFields, SampleUpdate};
use crate::utils::error::{GeostorError, Result};
use crate::utils::validation::{validate_depth_interval, validate_non_empty_string};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

const SAMPLE_COLUMNS: &str = "sample_id, location_id, sample_reference, sample_type, \
     sample_top_depth, sample_base_depth, sample_date_time, sample_blows, sample_container, \
     sample_diameter, sample_water_depth, sample_recovery_percent, sample_method, \
     sample_description, sample_remarks, sample_condition, sample_classification, \
     sample_stratum_reference, file_reference, created_at, updated_at";

fn sample_from_row(row: &Row<'_>) -> rusqlite::Result<Sample> {
    Ok(Sample {
        id: row.get(0)?,
        location_id: row.get(1)?,
        reference: row.get(2)?,
        sample_type: row.get(3)?,
        top_depth: row.get(4)?,
        details: SampleFields {
            base_depth: row.get(5)?,
            date_time: row.get(6)?,
            blows: row.get(7)?,
            container: row.get(8)?,
            diameter: row.get(9)?,
            water_depth: row.get(10)?,
            recovery_percent: row.get(11)?,
            method: row.get(12)?,
            description: row.get(13)?,
            remarks: row.get(14)?,
            condition: row.get(15)?,
            classification: row.get(16)?,
            stratum_reference: row.get(17)?,
            file_reference: row.get(18)?,
        },
        created_at: row.get(19)?,
        updated_at: row.get(20)?,
    })
}

fn validate_recovery(fields: &SampleFields) -> Result<()> {
    if let Some(recovery) = fields.recovery_percent {
        if !(0.0..=100.0).contains(&recovery) {
            return Err(GeostorError::validation(format!(
                "Recovery must be between 0 and 100 percent, got {}",
                recovery
            )));
        }
    }
    if let Some(blows) = fields.blows {
        if blows < 0 {
            return Err(GeostorError::validation("Blow count must not be negative"));
        }
    }
    Ok(())
}

impl Database {
    pub fn create_sample(&self, sample: &NewSample) -> Result<i64> {
        validate_non_empty_string("Sample reference", &sample.reference)?;
        validate_non_empty_string("Sample type", &sample.sample_type)?;
        validate_depth_interval(sample.top_depth, sample.details.base_depth)?;
        validate_recovery(&sample.details)?;

        let d = &sample.details;
        let now = Utc::now();
        let conn = self.lock();
        conn.execute(
            "INSERT INTO sample (location_id, sample_reference, sample_type, sample_top_depth,
                 sample_base_depth, sample_date_time, sample_blows, sample_container,
                 sample_diameter, sample_water_depth, sample_recovery_percent, sample_method,
                 sample_description, sample_remarks, sample_condition, sample_classification,
                 sample_stratum_reference, file_reference, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                 ?17, ?18, ?19, ?19)",
            params![
                sample.location_id,
                sample.reference.trim(),
                sample.sample_type.trim(),
                sample.top_depth,
                d.base_depth,
                d.date_time,
                d.blows,
                d.container,
                d.diameter,
                d.water_depth,
                d.recovery_percent,
                d.method,
                d.description,
                d.remarks,
                d.condition,
                d.classification,
                d.stratum_reference,
                d.file_reference,
                now,
            ],
        )
        .map_err(|e| {
            GeostorError::from_constraint(
                e,
                format!(
                    "Sample with reference '{}' already exists for this location",
                    sample.reference.trim()
                ),
            )
        })?;

        let id = conn.last_insert_rowid();
        tracing::debug!("Created sample {} ({}) at location {}", id, sample.reference, sample.location_id);
        Ok(id)
    }

    pub fn get_sample(&self, sample_id: i64) -> Result<Option<Sample>> {
        let conn = self.lock();
        let sample = conn
            .query_row(
                &format!("SELECT {} FROM sample WHERE sample_id = ?1", SAMPLE_COLUMNS),
                params![sample_id],
                sample_from_row,
            )
            .optional()?;
        Ok(sample)
    }

    /// Resolves a sample through its project number, location name and reference.
    pub fn find_sample(&self, project_number: &str, location_name: &str, reference: &str) -> Result<Option<Sample>> {
        let conn = self.lock();
        let columns = SAMPLE_COLUMNS
            .split(", ")
            .map(|c| format!("s.{}", c.trim()))
            .collect::<Vec<_>>()
            .join(", ");
        let sample = conn
            .query_row(
                &format!(
                    "SELECT {} FROM sample s
                     JOIN location loc ON s.location_id = loc.location_id
                     JOIN project pr ON loc.project_id = pr.project_id
                     WHERE pr.project_number = ?1 AND loc.location_name = ?2
                       AND s.sample_reference = ?3",
                    columns
                ),
                params![project_number, location_name, reference],
                sample_from_row,
            )
            .optional()?;
        Ok(sample)
    }

    /// Samples of a location ordered from the top of the hole down.
    pub fn list_samples(&self, location_id: i64) -> Result<Vec<Sample>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sample WHERE location_id = ?1 ORDER BY sample_top_depth, sample_reference",
            SAMPLE_COLUMNS
        ))?;
        let samples = stmt
            .query_map(params![location_id], sample_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(samples)
    }

    pub fn update_sample(&self, sample_id: i64, update: &SampleUpdate) -> Result<()> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let current = tx
            .query_row(
                &format!("SELECT {} FROM sample WHERE sample_id = ?1", SAMPLE_COLUMNS),
                params![sample_id],
                sample_from_row,
            )
            .optional()?
            .ok_or(GeostorError::NotFound {
                entity: "Sample",
                id: sample_id,
            })?;
        if let Some(reference) = &update.reference {
            validate_non_empty_string("Sample reference", reference)?;
        }
        if let Some(sample_type) = &update.sample_type {
            validate_non_empty_string("Sample type", sample_type)?;
        }
        // 以合併後的深度驗證
        let top = update.top_depth.unwrap_or(current.top_depth);
        let base = update.details.base_depth.or(current.details.base_depth);
        validate_depth_interval(top, base)?;
        validate_recovery(&update.details)?;

        let d = &update.details;
        tx.execute(
            "UPDATE sample SET
                sample_reference = COALESCE(?2, sample_reference),
                sample_type = COALESCE(?3, sample_type),
                sample_top_depth = COALESCE(?4, sample_top_depth),
                sample_base_depth = COALESCE(?5, sample_base_depth),
                sample_date_time = COALESCE(?6, sample_date_time),
                sample_blows = COALESCE(?7, sample_blows),
                sample_container = COALESCE(?8, sample_container),
                sample_diameter = COALESCE(?9, sample_diameter),
                sample_water_depth = COALESCE(?10, sample_water_depth),
                sample_recovery_percent = COALESCE(?11, sample_recovery_percent),
                sample_method = COALESCE(?12, sample_method),
                sample_description = COALESCE(?13, sample_description),
                sample_remarks = COALESCE(?14, sample_remarks),
                sample_condition = COALESCE(?15, sample_condition),
                sample_classification = COALESCE(?16, sample_classification),
                sample_stratum_reference = COALESCE(?17, sample_stratum_reference),
                file_reference = COALESCE(?18, file_reference),
                updated_at = ?19
             WHERE sample_id = ?1",
            params![
                sample_id,
                update.reference.as_deref().map(str::trim),
                update.sample_type.as_deref().map(str::trim),
                update.top_depth,
                d.base_depth,
                d.date_time,
                d.blows,
                d.container,
                d.diameter,
                d.water_depth,
                d.recovery_percent,
                d.method,
                d.description,
                d.remarks,
                d.condition,
                d.classification,
                d.stratum_reference,
                d.file_reference,
                Utc::now(),
            ],
        )
        .map_err(|e| {
            GeostorError::from_constraint(e, "A sample with this reference already exists for this location")
        })?;
        tx.commit()?;
        Ok(())
    }

    pub fn delete_sample(&self, sample_id: i64) -> Result<()> {
        let conn = self.lock();
        let changed = conn.execute("DELETE FROM sample WHERE sample_id = ?1", params![sample_id])?;
        if changed == 0 {
            return Err(GeostorError::NotFound {
                entity: "Sample",
                id: sample_id,
            });
        }
        tracing::info!("Deleted sample {}", sample_id);
        Ok(())
    }
}
