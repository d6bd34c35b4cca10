use super::Database;
use crate::domain::model::{GeologyLayer, LabTest};
use crate::utils::error::{GeostorError, Result};
use crate::utils::validation::{validate_depth_interval, validate_non_empty_string};
use chrono::Utc;
use rusqlite::params;

impl Database {
    /// Records a logged stratum. `id` and `location_id` of `layer` are ignored
    /// in favour of the generated key and the given location.
    pub fn create_geology(&self, location_id: i64, layer: &GeologyLayer) -> Result<i64> {
        validate_depth_interval(layer.top_depth, Some(layer.base_depth))?;
        let conn = self.lock();
        conn.execute(
            "INSERT INTO geology (location_id, top_depth, base_depth, legend, description,
                 consistency, weathering, structure, remarks, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                location_id,
                layer.top_depth,
                layer.base_depth,
                layer.legend,
                layer.description,
                layer.consistency,
                layer.weathering,
                layer.structure,
                layer.remarks,
                Utc::now(),
            ],
        )
        .map_err(|e| GeostorError::from_constraint(e, "Duplicate geology record"))?;
        Ok(conn.last_insert_rowid())
    }

    pub fn list_geology(&self, location_id: i64) -> Result<Vec<GeologyLayer>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT geology_id, location_id, top_depth, base_depth, legend, description,
                    consistency, weathering, structure, remarks
             FROM geology WHERE location_id = ?1 ORDER BY top_depth",
        )?;
        let layers = stmt
            .query_map(params![location_id], |row| {
                Ok(GeologyLayer {
                    id: row.get(0)?,
                    location_id: row.get(1)?,
                    top_depth: row.get(2)?,
                    base_depth: row.get(3)?,
                    legend: row.get(4)?,
                    description: row.get(5)?,
                    consistency: row.get(6)?,
                    weathering: row.get(7)?,
                    structure: row.get(8)?,
                    remarks: row.get(9)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(layers)
    }

    pub fn create_lab_test(&self, sample_id: i64, test: &LabTest) -> Result<i64> {
        validate_non_empty_string("Test type", &test.test_type)?;
        let conn = self.lock();
        conn.execute(
            "INSERT INTO laboratory (sample_id, test_type, test_result, test_unit, test_date,
                 remarks, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                sample_id,
                test.test_type.trim(),
                test.test_result,
                test.test_unit,
                test.test_date,
                test.remarks,
                Utc::now(),
            ],
        )
        .map_err(|e| GeostorError::from_constraint(e, "Duplicate laboratory test"))?;
        Ok(conn.last_insert_rowid())
    }

    pub fn list_lab_tests(&self, sample_id: i64) -> Result<Vec<LabTest>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT test_id, sample_id, test_type, test_result, test_unit, test_date, remarks
             FROM laboratory WHERE sample_id = ?1 ORDER BY test_type, test_id",
        )?;
        let tests = stmt
            .query_map(params![sample_id], |row| {
                Ok(LabTest {
                    id: row.get(0)?,
                    sample_id: row.get(1)?,
                    test_type: row.get(2)?,
                    test_result: row.get(3)?,
                    test_unit: row.get(4)?,
                    test_date: row.get(5)?,
                    remarks: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{LocationFields, NewSample, ProjectFields, SampleFields};

    fn setup() -> (Database, i64, i64) {
        let db = Database::in_memory().unwrap();
        let p = db.create_project("Dock", &ProjectFields::default()).unwrap();
        let loc = db.create_location(p, "BH01", &LocationFields::default()).unwrap();
        let sample = db
            .create_sample(&NewSample {
                location_id: loc,
                reference: "1".to_string(),
                sample_type: "B".to_string(),
                top_depth: 1.0,
                details: SampleFields::default(),
            })
            .unwrap();
        (db, loc, sample)
    }

    fn layer(top: f64, base: f64, legend: &str) -> GeologyLayer {
        GeologyLayer {
            id: 0,
            location_id: 0,
            top_depth: top,
            base_depth: base,
            legend: Some(legend.to_string()),
            description: None,
            consistency: None,
            weathering: None,
            structure: None,
            remarks: None,
        }
    }

    #[test]
    fn test_geology_ordered_by_depth() {
        let (db, loc, _) = setup();
        db.create_geology(loc, &layer(1.2, 4.0, "CLAY")).unwrap();
        db.create_geology(loc, &layer(0.0, 1.2, "MADE GROUND")).unwrap();

        let layers = db.list_geology(loc).unwrap();
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0].legend.as_deref(), Some("MADE GROUND"));
        assert_eq!(layers[1].location_id, loc);

        assert!(db.create_geology(loc, &layer(3.0, 2.0, "SAND")).is_err());
    }

    #[test]
    fn test_lab_tests_ordered_by_type() {
        let (db, _, sample) = setup();
        let test = |kind: &str, result: f64| LabTest {
            id: 0,
            sample_id: 0,
            test_type: kind.to_string(),
            test_result: Some(result),
            test_unit: Some("%".to_string()),
            test_date: None,
            remarks: None,
        };
        db.create_lab_test(sample, &test("MC", 23.5)).unwrap();
        db.create_lab_test(sample, &test("DENS", 1.95)).unwrap();

        let tests = db.list_lab_tests(sample).unwrap();
        let kinds: Vec<&str> = tests.iter().map(|t| t.test_type.as_str()).collect();
        assert_eq!(kinds, vec!["DENS", "MC"]);
        assert!(db.create_lab_test(sample + 99, &test("MC", 1.0)).is_err());
    }
}
