use super::Database;
use crate::domain::model::{Project, ProjectFields};
use crate::utils::error::{GeostorError, Result};
use crate::utils::validation::validate_non_empty_string;
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

const PROJECT_COLUMNS: &str = "project_id, project_number, project_name, project_location, \
     project_client, project_contractor, project_engineer, project_comments, file_reference, \
     created_at, updated_at";

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        number: row.get(1)?,
        name: row.get(2)?,
        location: row.get(3)?,
        client: row.get(4)?,
        contractor: row.get(5)?,
        engineer: row.get(6)?,
        comments: row.get(7)?,
        file_reference: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

impl Database {
    pub fn create_project(&self, name: &str, fields: &ProjectFields) -> Result<i64> {
        validate_non_empty_string("Project name", name)?;
        let now = Utc::now();
        let conn = self.lock();
        conn.execute(
            "INSERT INTO project (project_number, project_name, project_location, project_client,
                 project_contractor, project_engineer, project_comments, file_reference,
                 created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
            params![
                fields.number,
                name.trim(),
                fields.location,
                fields.client,
                fields.contractor,
                fields.engineer,
                fields.comments,
                fields.file_reference,
                now,
            ],
        )
        .map_err(|e| {
            let message = match &fields.number {
                Some(number) if e.to_string().contains("project.project_number") => {
                    format!("Project with number '{}' already exists", number)
                }
                _ => format!("Project with name '{}' already exists", name.trim()),
            };
            GeostorError::from_constraint(e, message)
        })?;

        let id = conn.last_insert_rowid();
        tracing::debug!("Created project {} ({})", id, name);
        Ok(id)
    }

    pub fn get_project(&self, project_id: i64) -> Result<Option<Project>> {
        let conn = self.lock();
        let project = conn
            .query_row(
                &format!("SELECT {} FROM project WHERE project_id = ?1", PROJECT_COLUMNS),
                params![project_id],
                project_from_row,
            )
            .optional()?;
        Ok(project)
    }

    pub fn get_project_by_number(&self, number: &str) -> Result<Option<Project>> {
        let conn = self.lock();
        let project = conn
            .query_row(
                &format!("SELECT {} FROM project WHERE project_number = ?1", PROJECT_COLUMNS),
                params![number],
                project_from_row,
            )
            .optional()?;
        Ok(project)
    }

    /// Looks a project up by number and fails if it does not exist.
    pub fn require_project_by_number(&self, number: &str) -> Result<Project> {
        self.get_project_by_number(number)?.ok_or_else(|| GeostorError::NoData {
            message: format!("No project with number '{}'", number),
        })
    }

    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM project ORDER BY project_name",
            PROJECT_COLUMNS
        ))?;
        let projects = stmt
            .query_map([], project_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(projects)
    }

    /// Case-insensitive substring match on project name or number.
    pub fn search_projects(&self, search_text: &str) -> Result<Vec<Project>> {
        let pattern = format!(
            "%{}%",
            search_text.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
        );
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM project
             WHERE project_name LIKE ?1 ESCAPE '\\' OR project_number LIKE ?1 ESCAPE '\\'
             ORDER BY project_name",
            PROJECT_COLUMNS
        ))?;
        let projects = stmt
            .query_map(params![pattern], project_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(projects)
    }

    pub fn update_project(&self, project_id: i64, fields: &ProjectFields) -> Result<()> {
        if let Some(name) = &fields.name {
            validate_non_empty_string("Project name", name)?;
        }
        let conn = self.lock();
        let changed = conn
            .execute(
                "UPDATE project SET
                    project_number = COALESCE(?2, project_number),
                    project_name = COALESCE(?3, project_name),
                    project_location = COALESCE(?4, project_location),
                    project_client = COALESCE(?5, project_client),
                    project_contractor = COALESCE(?6, project_contractor),
                    project_engineer = COALESCE(?7, project_engineer),
                    project_comments = COALESCE(?8, project_comments),
                    file_reference = COALESCE(?9, file_reference),
                    updated_at = ?10
                 WHERE project_id = ?1",
                params![
                    project_id,
                    fields.number,
                    fields.name.as_deref().map(str::trim),
                    fields.location,
                    fields.client,
                    fields.contractor,
                    fields.engineer,
                    fields.comments,
                    fields.file_reference,
                    Utc::now(),
                ],
            )
            .map_err(|e| {
                GeostorError::from_constraint(e, "A project with this name or number already exists")
            })?;

        if changed == 0 {
            return Err(GeostorError::NotFound {
                entity: "Project",
                id: project_id,
            });
        }
        Ok(())
    }

    /// Deletes the project and, through cascades, everything recorded under it.
    pub fn delete_project(&self, project_id: i64) -> Result<()> {
        let conn = self.lock();
        let changed = conn.execute("DELETE FROM project WHERE project_id = ?1", params![project_id])?;
        if changed == 0 {
            return Err(GeostorError::NotFound {
                entity: "Project",
                id: project_id,
            });
        }
        tracing::info!("Deleted project {}", project_id);
        Ok(())
    }
}
