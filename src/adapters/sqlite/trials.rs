use super::Database;
use crate::domain::model::{
    AtterbergResult, LiquidLimitRow, LiquidLimitTrial, PlasticLimitRow, PlasticLimitTrial, SampleKey,
    StoredAtterbergResult,
};
use crate::utils::error::{GeostorError, Result};
use chrono::Utc;
use rusqlite::{params, Connection, Row};

fn check_weights(tare: f64, tare_moist: f64, tare_dry: f64) -> Result<()> {
    if ![tare, tare_moist, tare_dry].iter().all(|w| w.is_finite() && *w >= 0.0) {
        return Err(GeostorError::validation("Weights must be non-negative numbers"));
    }
    if tare_dry <= tare {
        return Err(GeostorError::validation(format!(
            "Dry weight with tare ({}) must exceed the tare ({})",
            tare_dry, tare
        )));
    }
    if tare_moist < tare_dry {
        return Err(GeostorError::validation(format!(
            "Moist weight with tare ({}) is below the dry weight ({})",
            tare_moist, tare_dry
        )));
    }
    Ok(())
}

pub(crate) fn insert_liquid_limit(conn: &Connection, sample_id: i64, t: &LiquidLimitTrial) -> Result<i64> {
    if !(t.drops.is_finite() && t.drops > 0.0) {
        return Err(GeostorError::validation(format!(
            "Drop count must be positive, got {}",
            t.drops
        )));
    }
    check_weights(t.tare, t.tare_moist, t.tare_dry)?;
    conn.execute(
        "INSERT INTO liquidlimit (sample_id, trial, drops, tare, taremoist, taredry, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)",
        params![sample_id, t.trial, t.drops, t.tare, t.tare_moist, t.tare_dry],
    )
    .map_err(|e| GeostorError::from_constraint(e, "Duplicate liquid limit trial"))?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn insert_plastic_limit(conn: &Connection, sample_id: i64, t: &PlasticLimitTrial) -> Result<i64> {
    check_weights(t.tare, t.tare_moist, t.tare_dry)?;
    conn.execute(
        "INSERT INTO plasticlimit (sample_id, trial, tare, taremoist, taredry, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, 1)",
        params![sample_id, t.trial, t.tare, t.tare_moist, t.tare_dry],
    )
    .map_err(|e| GeostorError::from_constraint(e, "Duplicate plastic limit trial"))?;
    Ok(conn.last_insert_rowid())
}

fn key_from_row(row: &Row<'_>) -> rusqlite::Result<SampleKey> {
    Ok(SampleKey {
        project_number: row.get(0)?,
        location_name: row.get(1)?,
        sample_id: row.get(2)?,
        sample_reference: row.get(3)?,
    })
}

impl Database {
    pub fn add_liquid_limit_trial(&self, sample_id: i64, trial: &LiquidLimitTrial) -> Result<i64> {
        insert_liquid_limit(&self.lock(), sample_id, trial)
    }

    pub fn add_plastic_limit_trial(&self, sample_id: i64, trial: &PlasticLimitTrial) -> Result<i64> {
        insert_plastic_limit(&self.lock(), sample_id, trial)
    }

    /// Retires every active trial of the sample; returns how many were touched.
    pub fn deactivate_trials(&self, sample_id: i64) -> Result<usize> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let ll = tx.execute(
            "UPDATE liquidlimit SET is_active = 0 WHERE sample_id = ?1 AND is_active = 1",
            params![sample_id],
        )?;
        let pl = tx.execute(
            "UPDATE plasticlimit SET is_active = 0 WHERE sample_id = ?1 AND is_active = 1",
            params![sample_id],
        )?;
        tx.commit()?;
        Ok(ll + pl)
    }

    /// Active liquid limit trials of a project, joined with their sample keys.
    pub fn fetch_liquid_limit_rows(&self, project_number: &str) -> Result<Vec<LiquidLimitRow>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT pr.project_number, loc.location_name, s.sample_id, s.sample_reference,
                    l.trial, l.drops, l.tare, l.taremoist, l.taredry
             FROM liquidlimit l
                 JOIN sample s ON l.sample_id = s.sample_id
                 JOIN location loc ON s.location_id = loc.location_id
                 JOIN project pr ON loc.project_id = pr.project_id
             WHERE pr.project_number = ?1 AND l.is_active = 1
             ORDER BY loc.location_name, s.sample_reference, l.trial, l.ll_id",
        )?;
        let rows = stmt
            .query_map(params![project_number], |row| {
                Ok(LiquidLimitRow {
                    key: key_from_row(row)?,
                    trial: LiquidLimitTrial {
                        trial: row.get(4)?,
                        drops: row.get(5)?,
                        tare: row.get(6)?,
                        tare_moist: row.get(7)?,
                        tare_dry: row.get(8)?,
                    },
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn fetch_plastic_limit_rows(&self, project_number: &str) -> Result<Vec<PlasticLimitRow>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT pr.project_number, loc.location_name, s.sample_id, s.sample_reference,
                    p.trial, p.tare, p.taremoist, p.taredry
             FROM plasticlimit p
                 JOIN sample s ON p.sample_id = s.sample_id
                 JOIN location loc ON s.location_id = loc.location_id
                 JOIN project pr ON loc.project_id = pr.project_id
             WHERE pr.project_number = ?1 AND p.is_active = 1
             ORDER BY loc.location_name, s.sample_reference, p.trial, p.pl_id",
        )?;
        let rows = stmt
            .query_map(params![project_number], |row| {
                Ok(PlasticLimitRow {
                    key: key_from_row(row)?,
                    trial: PlasticLimitTrial {
                        trial: row.get(4)?,
                        tare: row.get(5)?,
                        tare_moist: row.get(6)?,
                        tare_dry: row.get(7)?,
                    },
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Supersedes the active results of the affected samples with `results`,
    /// atomically.
    pub fn save_atterberg_results(&self, results: &[AtterbergResult]) -> Result<usize> {
        let now = Utc::now();
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        {
            let mut retire = tx.prepare(
                "UPDATE atterberglimits SET is_active = 0 WHERE sample_id = ?1 AND is_active = 1",
            )?;
            let mut insert = tx.prepare(
                "INSERT INTO atterberglimits
                     (sample_id, liquid_limit, plastic_limit, plasticity_index, soil_description,
                      date_calculated, is_active)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)",
            )?;
            for result in results {
                retire.execute(params![result.sample_id])?;
            }
            for result in results {
                insert.execute(params![
                    result.sample_id,
                    result.liquid_limit.map(|v| v as f64),
                    result.plastic_limit.map(|v| v as f64),
                    result.plasticity_index.map(|v| v as f64),
                    result.soil_description.code(),
                    now,
                ])?;
            }
        }
        tx.commit()?;
        tracing::debug!("Saved {} Atterberg results", results.len());
        Ok(results.len())
    }

    /// Active results of a project, ordered by location and sample.
    pub fn list_atterberg_results(&self, project_number: &str) -> Result<Vec<StoredAtterbergResult>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT a.atterberg_id, a.sample_id, loc.location_name, s.sample_reference,
                    a.liquid_limit, a.plastic_limit, a.plasticity_index, a.soil_description,
                    a.date_calculated
             FROM atterberglimits a
                 JOIN sample s ON a.sample_id = s.sample_id
                 JOIN location loc ON s.location_id = loc.location_id
                 JOIN project pr ON loc.project_id = pr.project_id
             WHERE pr.project_number = ?1 AND a.is_active = 1
             ORDER BY loc.location_name, s.sample_reference",
        )?;
        let rows = stmt
            .query_map(params![project_number], |row| {
                Ok(StoredAtterbergResult {
                    id: row.get(0)?,
                    sample_id: row.get(1)?,
                    location_name: row.get(2)?,
                    sample_reference: row.get(3)?,
                    liquid_limit: row.get(4)?,
                    plastic_limit: row.get(5)?,
                    plasticity_index: row.get(6)?,
                    soil_description: row
                        .get::<_, Option<String>>(7)?
                        .unwrap_or_else(|| "NP".to_string()),
                    date_calculated: row.get(8)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}
