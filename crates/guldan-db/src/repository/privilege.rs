//! SurrealDB implementation of [`PrivilegeRepository`].
//!
//! Every grant carries an `active_key` derived from its logical key
//! `(user_hash, resource_type, resource_id)`. A unique index on that
//! column is what keeps a second active grant for the same key from ever
//! committing; soft deletion moves the key to a tombstone.

use chrono::{DateTime, Utc};
use guldan_core::error::GuldanResult;
use guldan_core::models::privilege::{
    CreateGrant, Grant, PrivilegeLevel, ResourceType, active_key,
};
use guldan_core::repository::PrivilegeRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::{debug, info};
use uuid::Uuid;

use super::{Binds, TOMBSTONE, execute_transaction, parse_uuid, parse_visibility};
use crate::error::DbError;

pub(crate) const CREATE_GRANT: &str = "\
    CREATE type::record('privilege', $grant_id) SET \
    resource_id = $resource_id, resource_name = $resource_name, \
    resource_type = $resource_type, \
    resource_visibility = $resource_visibility, \
    user_id = $user_id, user_hash = $user_hash, \
    privilege_type = $privilege_type, active_key = $active_key, \
    is_deleted = false";

pub(crate) const SET_GRANT_LEVEL: &str = "\
    UPDATE privilege SET \
    privilege_type = $privilege_type, updated_at = time::now() \
    WHERE active_key = $active_key AND is_deleted = false";

/// Subquery yielding the ids of the active grant for `$active_key`.
pub(crate) const ACTIVE_GRANT_IDS: &str = "\
    (SELECT VALUE id FROM privilege \
     WHERE active_key = $active_key AND is_deleted = false)";

const SELECT_GRANTS: &str = "SELECT meta::id(id) AS record_id, * FROM privilege";

pub(crate) fn soft_delete_by_key() -> String {
    format!(
        "UPDATE privilege SET is_deleted = true, active_key = {TOMBSTONE}, \
         updated_at = time::now() \
         WHERE active_key = $active_key AND is_deleted = false"
    )
}

pub(crate) fn soft_delete_by_resource() -> String {
    format!(
        "UPDATE privilege SET is_deleted = true, active_key = {TOMBSTONE}, \
         updated_at = time::now() \
         WHERE resource_id = $resource_id AND resource_type = $resource_type \
         AND is_deleted = false"
    )
}

pub(crate) fn create_binds(grant_id: Uuid, input: &CreateGrant) -> Binds {
    vec![
        ("grant_id", grant_id.to_string()),
        ("resource_id", input.resource_id.to_string()),
        ("resource_name", input.resource_name.clone()),
        ("resource_type", input.resource_type.as_str().to_string()),
        (
            "resource_visibility",
            input.resource_visibility.as_str().to_string(),
        ),
        ("user_id", input.user_id.to_string()),
        ("user_hash", input.user_hash.clone()),
        ("privilege_type", input.level.as_str().to_string()),
        (
            "active_key",
            active_key(&input.user_hash, input.resource_id, input.resource_type),
        ),
    ]
}

fn parse_resource_type(value: &str) -> Result<ResourceType, DbError> {
    ResourceType::parse(value)
        .ok_or_else(|| DbError::Decode(format!("unknown resource type: {value}")))
}

fn parse_level(value: &str) -> Result<PrivilegeLevel, DbError> {
    PrivilegeLevel::parse(value)
        .ok_or_else(|| DbError::Decode(format!("unknown privilege type: {value}")))
}

#[derive(Debug, SurrealValue)]
struct GrantRowWithId {
    record_id: String,
    resource_id: String,
    resource_name: String,
    resource_type: String,
    resource_visibility: String,
    user_id: String,
    user_hash: String,
    privilege_type: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl GrantRowWithId {
    fn try_into_grant(self) -> Result<Grant, DbError> {
        Ok(Grant {
            id: parse_uuid(&self.record_id, "privilege")?,
            resource_id: parse_uuid(&self.resource_id, "resource")?,
            resource_name: self.resource_name,
            resource_type: parse_resource_type(&self.resource_type)?,
            resource_visibility: parse_visibility(&self.resource_visibility)?,
            user_id: parse_uuid(&self.user_id, "user")?,
            user_hash: self.user_hash,
            level: parse_level(&self.privilege_type)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Privilege store.
#[derive(Clone)]
pub struct SurrealPrivilegeRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPrivilegeRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Active grants matching `filter`, which may end with `ORDER BY`.
    async fn select(&self, filter: &str, binds: Binds) -> GuldanResult<Vec<Grant>> {
        let query = format!("{SELECT_GRANTS} WHERE is_deleted = false AND {filter}");
        let mut builder = self.db.query(query);
        for bind in binds {
            builder = builder.bind(bind);
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<GrantRowWithId> = result.take(0).map_err(DbError::from)?;
        let grants = rows
            .into_iter()
            .map(|row| row.try_into_grant())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(grants)
    }

    /// Active grant by its precomputed key.
    pub(crate) async fn find_by_key(&self, key: String) -> GuldanResult<Option<Grant>> {
        let grants = self
            .select("active_key = $active_key", vec![("active_key", key)])
            .await?;
        Ok(grants.into_iter().next())
    }
}

impl<C: Connection> PrivilegeRepository for SurrealPrivilegeRepository<C> {
    async fn find(
        &self,
        user_hash: &str,
        resource_id: Uuid,
        resource_type: ResourceType,
    ) -> GuldanResult<Option<Grant>> {
        self.find_by_key(active_key(user_hash, resource_id, resource_type))
            .await
    }

    async fn find_by_name_prefix(&self, user_hash: &str, prefix: &str) -> GuldanResult<Vec<Grant>> {
        self.select(
            "user_hash = $user_hash \
             AND string::starts_with(resource_name, $prefix) \
             ORDER BY created_at ASC",
            vec![
                ("user_hash", user_hash.to_string()),
                ("prefix", prefix.to_string()),
            ],
        )
        .await
    }

    async fn find_all_for_resource(
        &self,
        resource_id: Uuid,
        resource_type: ResourceType,
    ) -> GuldanResult<Vec<Grant>> {
        self.select(
            "resource_id = $resource_id AND resource_type = $resource_type",
            vec![
                ("resource_id", resource_id.to_string()),
                ("resource_type", resource_type.as_str().to_string()),
            ],
        )
        .await
    }

    async fn find_all_for_user(
        &self,
        user_hash: &str,
        resource_types: &[ResourceType],
        levels: &[PrivilegeLevel],
    ) -> GuldanResult<Vec<Grant>> {
        if resource_types.is_empty() || levels.is_empty() {
            return Ok(Vec::new());
        }

        let types: Vec<String> = resource_types
            .iter()
            .map(|t| t.as_str().to_string())
            .collect();
        let levels: Vec<String> = levels.iter().map(|l| l.as_str().to_string()).collect();

        let mut result = self
            .db
            .query(format!(
                "{SELECT_GRANTS} WHERE user_hash = $user_hash \
                 AND resource_type IN $types AND privilege_type IN $levels \
                 AND is_deleted = false ORDER BY created_at ASC"
            ))
            .bind(("user_hash", user_hash.to_string()))
            .bind(("types", types))
            .bind(("levels", levels))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GrantRowWithId> = result.take(0).map_err(DbError::from)?;
        let grants = rows
            .into_iter()
            .map(|row| row.try_into_grant())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(grants)
    }

    async fn insert(&self, input: CreateGrant) -> GuldanResult<Grant> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let key = active_key(&input.user_hash, input.resource_id, input.resource_type);

        let mut builder = self.db.query(CREATE_GRANT);
        for bind in create_binds(id, &input) {
            builder = builder.bind(bind);
        }
        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::classify(e, "privilege", &id_str))?;

        info!(
            grant_id = %id,
            resource = %input.resource_name,
            level = input.level.as_str(),
            "Grant inserted"
        );

        self.find_by_key(key).await?.ok_or_else(|| {
            DbError::NotFound {
                entity: "privilege".into(),
                id: id_str,
            }
            .into()
        })
    }

    async fn insert_if_absent(&self, input: CreateGrant) -> GuldanResult<Grant> {
        let id = Uuid::new_v4();
        let key = active_key(&input.user_hash, input.resource_id, input.resource_type);

        let statement = format!("IF array::len({ACTIVE_GRANT_IDS}) = 0 {{ {CREATE_GRANT} }}");
        execute_transaction(
            &self.db,
            &[statement],
            create_binds(id, &input),
            "privilege",
            &key,
        )
        .await?;

        let grant = self.find_by_key(key.clone()).await?.ok_or_else(|| {
            DbError::NotFound {
                entity: "privilege".into(),
                id: key,
            }
        })?;

        debug!(
            grant_id = %grant.id,
            inserted = grant.id == id,
            "Grant ensured"
        );
        Ok(grant)
    }

    async fn update(
        &self,
        user_hash: &str,
        resource_id: Uuid,
        resource_type: ResourceType,
        level: PrivilegeLevel,
    ) -> GuldanResult<Grant> {
        let key = active_key(user_hash, resource_id, resource_type);

        let mut result = self
            .db
            .query(format!(
                "{SET_GRANT_LEVEL};\n\
                 {SELECT_GRANTS} WHERE active_key = $active_key AND is_deleted = false;"
            ))
            .bind(("privilege_type", level.as_str().to_string()))
            .bind(("active_key", key.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GrantRowWithId> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "privilege".into(),
            id: key,
        })?;

        Ok(row.try_into_grant()?)
    }

    async fn soft_delete(&self, resource_id: Uuid, resource_type: ResourceType) -> GuldanResult<()> {
        self.db
            .query(soft_delete_by_resource())
            .bind(("resource_id", resource_id.to_string()))
            .bind(("resource_type", resource_type.as_str().to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn soft_delete_for_user(
        &self,
        user_hash: &str,
        resource_id: Uuid,
        resource_type: ResourceType,
    ) -> GuldanResult<()> {
        self.db
            .query(soft_delete_by_key())
            .bind(("active_key", active_key(user_hash, resource_id, resource_type)))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(())
    }
}
