//! SurrealDB implementation of [`OrganizationRepository`].

use chrono::{DateTime, Utc};
use guldan_core::error::GuldanResult;
use guldan_core::models::organization::{CreateOrganization, Organization};
use guldan_core::models::visibility::Visibility;
use guldan_core::repository::OrganizationRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;
use uuid::Uuid;

use super::{Binds, TOMBSTONE, parse_uuid, parse_visibility};
use crate::error::DbError;

pub(crate) const CREATE_ORG: &str = "\
    CREATE type::record('org', $org_id) SET \
    name = $name, name_key = $name, visibility = $visibility, \
    is_deleted = false";

pub(crate) const SET_ORG_VISIBILITY: &str = "\
    UPDATE type::record('org', $org_id) SET \
    visibility = $visibility, updated_at = time::now() \
    WHERE is_deleted = false";

pub(crate) fn soft_delete_org() -> String {
    format!(
        "UPDATE type::record('org', $org_id) SET \
         is_deleted = true, name_key = {TOMBSTONE}, updated_at = time::now() \
         WHERE is_deleted = false"
    )
}

pub(crate) fn create_binds(id: Uuid, input: &CreateOrganization) -> Binds {
    vec![
        ("org_id", id.to_string()),
        ("name", input.name.clone()),
        ("visibility", input.visibility.as_str().to_string()),
    ]
}

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct OrganizationRow {
    name: String,
    visibility: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrganizationRow {
    fn into_organization(self, id: Uuid) -> Result<Organization, DbError> {
        Ok(Organization {
            id,
            name: self.name,
            visibility: parse_visibility(&self.visibility)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct OrganizationRowWithId {
    record_id: String,
    name: String,
    visibility: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrganizationRowWithId {
    fn try_into_organization(self) -> Result<Organization, DbError> {
        Ok(Organization {
            id: parse_uuid(&self.record_id, "organization")?,
            name: self.name,
            visibility: parse_visibility(&self.visibility)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Organization store.
#[derive(Clone)]
pub struct SurrealOrganizationRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealOrganizationRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> OrganizationRepository for SurrealOrganizationRepository<C> {
    async fn create(&self, input: CreateOrganization) -> GuldanResult<Organization> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let mut builder = self.db.query(CREATE_ORG);
        for bind in create_binds(id, &input) {
            builder = builder.bind(bind);
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::classify(e, "organization", &id_str))?;

        let rows: Vec<OrganizationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "organization".into(),
            id: id_str,
        })?;

        info!(org_id = %id, name = %input.name, "Organization created");
        Ok(row.into_organization(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> GuldanResult<Option<Organization>> {
        let mut result = self
            .db
            .query("SELECT * FROM type::record('org', $org_id) WHERE is_deleted = false")
            .bind(("org_id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OrganizationRow> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.into_organization(id)?)),
            None => Ok(None),
        }
    }

    async fn get_by_name(&self, name: &str) -> GuldanResult<Option<Organization>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM org \
                 WHERE name_key = $name AND is_deleted = false",
            )
            .bind(("name", name.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OrganizationRowWithId> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_organization()?)),
            None => Ok(None),
        }
    }

    async fn list_by_names(&self, names: &[String]) -> GuldanResult<Vec<Organization>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM org \
                 WHERE name_key IN $names AND is_deleted = false \
                 ORDER BY created_at ASC",
            )
            .bind(("names", names.to_vec()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OrganizationRowWithId> = result.take(0).map_err(DbError::from)?;
        let orgs = rows
            .into_iter()
            .map(|row| row.try_into_organization())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(orgs)
    }

    async fn set_visibility(&self, id: Uuid, visibility: Visibility) -> GuldanResult<Organization> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(SET_ORG_VISIBILITY)
            .bind(("org_id", id_str.clone()))
            .bind(("visibility", visibility.as_str().to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OrganizationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "organization".into(),
            id: id_str,
        })?;

        Ok(row.into_organization(id)?)
    }

    async fn soft_delete(&self, id: Uuid) -> GuldanResult<()> {
        self.db
            .query(soft_delete_org())
            .bind(("org_id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        info!(org_id = %id, "Organization soft-deleted");
        Ok(())
    }
}
