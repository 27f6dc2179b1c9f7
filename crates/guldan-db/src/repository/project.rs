//! SurrealDB implementation of [`ProjectRepository`].

use chrono::{DateTime, Utc};
use guldan_core::error::GuldanResult;
use guldan_core::models::project::{CreateProject, Project};
use guldan_core::models::visibility::Visibility;
use guldan_core::repository::ProjectRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;
use uuid::Uuid;

use super::{Binds, TOMBSTONE, parse_uuid, parse_visibility};
use crate::error::DbError;

pub(crate) const CREATE_PROJECT: &str = "\
    CREATE type::record('project', $project_id) SET \
    parent_id = $parent_id, name = $name, name_key = $name, \
    qualified_name = $qualified_name, visibility = $visibility, \
    is_deleted = false";

pub(crate) const SET_PROJECT_VISIBILITY: &str = "\
    UPDATE type::record('project', $project_id) SET \
    visibility = $visibility, updated_at = time::now() \
    WHERE is_deleted = false";

pub(crate) fn create_binds(id: Uuid, input: &CreateProject) -> Binds {
    vec![
        ("project_id", id.to_string()),
        ("parent_id", input.parent_id.to_string()),
        ("name", input.name.clone()),
        ("qualified_name", input.qualified_name.clone()),
        ("visibility", input.visibility.as_str().to_string()),
    ]
}

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct ProjectRow {
    parent_id: String,
    name: String,
    qualified_name: String,
    visibility: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProjectRow {
    fn into_project(self, id: Uuid) -> Result<Project, DbError> {
        Ok(Project {
            id,
            parent_id: parse_uuid(&self.parent_id, "parent organization")?,
            name: self.name,
            qualified_name: self.qualified_name,
            visibility: parse_visibility(&self.visibility)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct ProjectRowWithId {
    record_id: String,
    parent_id: String,
    name: String,
    qualified_name: String,
    visibility: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProjectRowWithId {
    fn try_into_project(self) -> Result<Project, DbError> {
        let id = parse_uuid(&self.record_id, "project")?;
        ProjectRow {
            parent_id: self.parent_id,
            name: self.name,
            qualified_name: self.qualified_name,
            visibility: self.visibility,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_project(id)
    }
}

/// SurrealDB implementation of the Project store.
#[derive(Clone)]
pub struct SurrealProjectRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealProjectRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn select_many(&self, query: &'static str, binds: Binds) -> GuldanResult<Vec<Project>> {
        let mut builder = self.db.query(query);
        for bind in binds {
            builder = builder.bind(bind);
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<ProjectRowWithId> = result.take(0).map_err(DbError::from)?;
        let projects = rows
            .into_iter()
            .map(|row| row.try_into_project())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(projects)
    }
}

impl<C: Connection> ProjectRepository for SurrealProjectRepository<C> {
    async fn create(&self, input: CreateProject) -> GuldanResult<Project> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let mut builder = self.db.query(CREATE_PROJECT);
        for bind in create_binds(id, &input) {
            builder = builder.bind(bind);
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::classify(e, "project", &id_str))?;

        let rows: Vec<ProjectRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "project".into(),
            id: id_str,
        })?;

        info!(
            project_id = %id,
            qualified_name = %input.qualified_name,
            "Project created"
        );
        Ok(row.into_project(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> GuldanResult<Option<Project>> {
        let mut result = self
            .db
            .query("SELECT * FROM type::record('project', $project_id) WHERE is_deleted = false")
            .bind(("project_id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProjectRow> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.into_project(id)?)),
            None => Ok(None),
        }
    }

    async fn get_by_name(&self, parent_id: Uuid, name: &str) -> GuldanResult<Option<Project>> {
        let projects = self
            .select_many(
                "SELECT meta::id(id) AS record_id, * FROM project \
                 WHERE parent_id = $parent_id AND name_key = $name \
                 AND is_deleted = false",
                vec![
                    ("parent_id", parent_id.to_string()),
                    ("name", name.to_string()),
                ],
            )
            .await?;

        Ok(projects.into_iter().next())
    }

    async fn list_by_names(&self, qualified_names: &[String]) -> GuldanResult<Vec<Project>> {
        if qualified_names.is_empty() {
            return Ok(Vec::new());
        }

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM project \
                 WHERE qualified_name IN $names AND is_deleted = false \
                 ORDER BY created_at ASC",
            )
            .bind(("names", qualified_names.to_vec()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProjectRowWithId> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(|row| Ok(row.try_into_project()?))
            .collect()
    }

    async fn list_children(&self, org_id: Uuid) -> GuldanResult<Vec<Project>> {
        self.select_many(
            "SELECT meta::id(id) AS record_id, * FROM project \
             WHERE parent_id = $parent_id AND is_deleted = false \
             ORDER BY created_at ASC",
            vec![("parent_id", org_id.to_string())],
        )
        .await
    }

    async fn set_visibility(&self, id: Uuid, visibility: Visibility) -> GuldanResult<Project> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(SET_PROJECT_VISIBILITY)
            .bind(("project_id", id_str.clone()))
            .bind(("visibility", visibility.as_str().to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProjectRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "project".into(),
            id: id_str,
        })?;

        Ok(row.into_project(id)?)
    }

    async fn soft_delete(&self, id: Uuid) -> GuldanResult<()> {
        let query = format!(
            "UPDATE type::record('project', $project_id) SET \
             is_deleted = true, name_key = {TOMBSTONE}, updated_at = time::now() \
             WHERE is_deleted = false"
        );

        self.db
            .query(query)
            .bind(("project_id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        info!(project_id = %id, "Project soft-deleted");
        Ok(())
    }
}
