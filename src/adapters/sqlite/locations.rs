use super::Database;
use crate::domain::model::{Location, LocationFields};
use crate::utils::error::{GeostorError, Result};
use crate::utils::validation::validate_non_empty_string;
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

const LOCATION_COLUMNS: &str = "location_id, project_id, location_name, location_type, \
     location_status, location_easting, location_northing, location_epsg_code, \
     location_grid_ref_system, location_ground_elevation, location_remarks, location_final_depth, \
     location_start_date, location_end_date, location_purpose, location_termination_reason, \
     location_lat, location_lon, location_method, location_sub_division, \
     location_phase_grouping_code, file_reference, created_at, updated_at";

fn location_from_row(row: &Row<'_>) -> rusqlite::Result<Location> {
    Ok(Location {
        id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        details: LocationFields {
            location_type: row.get(3)?,
            status: row.get(4)?,
            easting: row.get(5)?,
            northing: row.get(6)?,
            epsg_code: row.get(7)?,
            grid_ref_system: row.get(8)?,
            ground_elevation: row.get(9)?,
            remarks: row.get(10)?,
            final_depth: row.get(11)?,
            start_date: row.get(12)?,
            end_date: row.get(13)?,
            purpose: row.get(14)?,
            termination_reason: row.get(15)?,
            lat: row.get(16)?,
            lon: row.get(17)?,
            method: row.get(18)?,
            sub_division: row.get(19)?,
            phase_grouping_code: row.get(20)?,
            file_reference: row.get(21)?,
        },
        created_at: row.get(22)?,
        updated_at: row.get(23)?,
    })
}

fn validate_location_fields(fields: &LocationFields) -> Result<()> {
    if let Some(depth) = fields.final_depth {
        if depth < 0.0 {
            return Err(GeostorError::validation(format!(
                "Final depth must not be negative, got {}",
                depth
            )));
        }
    }
    if let Some(lat) = fields.lat {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(GeostorError::validation(format!("Latitude {} is out of range", lat)));
        }
    }
    if let Some(lon) = fields.lon {
        if !(-180.0..=180.0).contains(&lon) {
            return Err(GeostorError::validation(format!("Longitude {} is out of range", lon)));
        }
    }
    Ok(())
}

impl Database {
    pub fn create_location(&self, project_id: i64, name: &str, fields: &LocationFields) -> Result<i64> {
        validate_non_empty_string("Location name", name)?;
        validate_location_fields(fields)?;
        let now = Utc::now();
        let conn = self.lock();
        conn.execute(
            "INSERT INTO location (project_id, location_name, location_type, location_status,
                 location_easting, location_northing, location_epsg_code, location_grid_ref_system,
                 location_ground_elevation, location_remarks, location_final_depth,
                 location_start_date, location_end_date, location_purpose,
                 location_termination_reason, location_lat, location_lon, location_method,
                 location_sub_division, location_phase_grouping_code, file_reference,
                 created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                 ?17, ?18, ?19, ?20, ?21, ?22, ?22)",
            params![
                project_id,
                name.trim(),
                fields.location_type,
                fields.status,
                fields.easting,
                fields.northing,
                fields.epsg_code,
                fields.grid_ref_system,
                fields.ground_elevation,
                fields.remarks,
                fields.final_depth,
                fields.start_date,
                fields.end_date,
                fields.purpose,
                fields.termination_reason,
                fields.lat,
                fields.lon,
                fields.method,
                fields.sub_division,
                fields.phase_grouping_code,
                fields.file_reference,
                now,
            ],
        )
        .map_err(|e| {
            GeostorError::from_constraint(
                e,
                format!("Location with name '{}' already exists in this project", name.trim()),
            )
        })?;

        let id = conn.last_insert_rowid();
        tracing::debug!("Created location {} ({}) in project {}", id, name, project_id);
        Ok(id)
    }

    pub fn get_location(&self, location_id: i64) -> Result<Option<Location>> {
        let conn = self.lock();
        let location = conn
            .query_row(
                &format!("SELECT {} FROM location WHERE location_id = ?1", LOCATION_COLUMNS),
                params![location_id],
                location_from_row,
            )
            .optional()?;
        Ok(location)
    }

    pub fn find_location(&self, project_id: i64, name: &str) -> Result<Option<Location>> {
        let conn = self.lock();
        let location = conn
            .query_row(
                &format!(
                    "SELECT {} FROM location WHERE project_id = ?1 AND location_name = ?2",
                    LOCATION_COLUMNS
                ),
                params![project_id, name],
                location_from_row,
            )
            .optional()?;
        Ok(location)
    }

    /// All locations, or only those of `project_id`, ordered by name.
    pub fn list_locations(&self, project_id: Option<i64>) -> Result<Vec<Location>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM location
             WHERE ?1 IS NULL OR project_id = ?1
             ORDER BY location_name",
            LOCATION_COLUMNS
        ))?;
        let locations = stmt
            .query_map(params![project_id], location_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(locations)
    }

    pub fn update_location(&self, location_id: i64, name: Option<&str>, fields: &LocationFields) -> Result<()> {
        if let Some(name) = name {
            validate_non_empty_string("Location name", name)?;
        }
        validate_location_fields(fields)?;
        let conn = self.lock();
        let changed = conn
            .execute(
                "UPDATE location SET
                    location_name = COALESCE(?2, location_name),
                    location_type = COALESCE(?3, location_type),
                    location_status = COALESCE(?4, location_status),
                    location_easting = COALESCE(?5, location_easting),
                    location_northing = COALESCE(?6, location_northing),
                    location_epsg_code = COALESCE(?7, location_epsg_code),
                    location_grid_ref_system = COALESCE(?8, location_grid_ref_system),
                    location_ground_elevation = COALESCE(?9, location_ground_elevation),
                    location_remarks = COALESCE(?10, location_remarks),
                    location_final_depth = COALESCE(?11, location_final_depth),
                    location_start_date = COALESCE(?12, location_start_date),
                    location_end_date = COALESCE(?13, location_end_date),
                    location_purpose = COALESCE(?14, location_purpose),
                    location_termination_reason = COALESCE(?15, location_termination_reason),
                    location_lat = COALESCE(?16, location_lat),
                    location_lon = COALESCE(?17, location_lon),
                    location_method = COALESCE(?18, location_method),
                    location_sub_division = COALESCE(?19, location_sub_division),
                    location_phase_grouping_code = COALESCE(?20, location_phase_grouping_code),
                    file_reference = COALESCE(?21, file_reference),
                    updated_at = ?22
                 WHERE location_id = ?1",
                params![
                    location_id,
                    name.map(str::trim),
                    fields.location_type,
                    fields.status,
                    fields.easting,
                    fields.northing,
                    fields.epsg_code,
                    fields.grid_ref_system,
                    fields.ground_elevation,
                    fields.remarks,
                    fields.final_depth,
                    fields.start_date,
                    fields.end_date,
                    fields.purpose,
                    fields.termination_reason,
                    fields.lat,
                    fields.lon,
                    fields.method,
                    fields.sub_division,
                    fields.phase_grouping_code,
                    fields.file_reference,
                    Utc::now(),
                ],
            )
            .map_err(|e| {
                GeostorError::from_constraint(e, "A location with this name already exists in this project")
            })?;

        if changed == 0 {
            return Err(GeostorError::NotFound {
                entity: "Location",
                id: location_id,
            });
        }
        Ok(())
    }

    /// Removes the location together with its samples, geology and lab data.
    pub fn delete_location(&self, location_id: i64) -> Result<()> {
        let conn = self.lock();
        let changed = conn.execute("DELETE FROM location WHERE location_id = ?1", params![location_id])?;
        if changed == 0 {
            return Err(GeostorError::NotFound {
                entity: "Location",
                id: location_id,
            });
        }
        tracing::info!("Deleted location {}", location_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ProjectFields;

    fn project(db: &Database, name: &str) -> i64 {
        db.create_project(name, &ProjectFields::default()).unwrap()
    }

    fn borehole() -> LocationFields {
        LocationFields {
            location_type: Some("CP".to_string()),
            easting: Some(523_145.2),
            northing: Some(178_902.7),
            ground_elevation: Some(12.35),
            final_depth: Some(25.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_and_list_locations() {
        let db = Database::in_memory().unwrap();
        let p1 = project(&db, "North");
        let p2 = project(&db, "South");

        db.create_location(p1, "BH02", &borehole()).unwrap();
        db.create_location(p1, "BH01", &borehole()).unwrap();
        db.create_location(p2, "TP01", &LocationFields::default()).unwrap();

        let names: Vec<String> = db
            .list_locations(Some(p1))
            .unwrap()
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(names, vec!["BH01", "BH02"]);
        assert_eq!(db.list_locations(None).unwrap().len(), 3);

        let bh = db.find_location(p1, "BH01").unwrap().unwrap();
        assert_eq!(bh.details.location_type.as_deref(), Some("CP"));
        assert_eq!(bh.details.final_depth, Some(25.0));
    }

    #[test]
    fn test_location_names_unique_per_project() {
        let db = Database::in_memory().unwrap();
        let p1 = project(&db, "North");
        let p2 = project(&db, "South");

        db.create_location(p1, "BH01", &borehole()).unwrap();
        let err = db.create_location(p1, "BH01", &borehole()).unwrap_err();
        assert!(matches!(err, GeostorError::Conflict { .. }));
        assert!(db.create_location(p2, "BH01", &borehole()).is_ok());
    }

    #[test]
    fn test_location_requires_existing_project() {
        let db = Database::in_memory().unwrap();
        let err = db.create_location(42, "BH01", &borehole()).unwrap_err();
        assert!(matches!(err, GeostorError::ValidationError { .. }));
    }

    #[test]
    fn test_update_location_keeps_unset_fields() {
        let db = Database::in_memory().unwrap();
        let p = project(&db, "North");
        let id = db.create_location(p, "BH01", &borehole()).unwrap();

        let update = LocationFields {
            status: Some("FINAL".to_string()),
            ..Default::default()
        };
        db.update_location(id, Some("BH01A"), &update).unwrap();

        let loc = db.get_location(id).unwrap().unwrap();
        assert_eq!(loc.name, "BH01A");
        assert_eq!(loc.details.status.as_deref(), Some("FINAL"));
        assert_eq!(loc.details.easting, Some(523_145.2));
    }

    #[test]
    fn test_invalid_coordinates_rejected() {
        let db = Database::in_memory().unwrap();
        let p = project(&db, "North");
        let fields = LocationFields {
            lat: Some(123.0),
            ..Default::default()
        };
        assert!(db.create_location(p, "BH01", &fields).is_err());
    }

    #[test]
    fn test_delete_location() {
        let db = Database::in_memory().unwrap();
        let p = project(&db, "North");
        let id = db.create_location(p, "BH01", &borehole()).unwrap();
        db.delete_location(id).unwrap();
        assert!(db.get_location(id).unwrap().is_none());
        assert!(matches!(
            db.delete_location(id).unwrap_err(),
            GeostorError::NotFound { .. }
        ));
    }
}
