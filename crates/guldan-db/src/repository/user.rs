//! SurrealDB implementation of [`UserRepository`].

use chrono::{DateTime, Utc};
use guldan_core::error::GuldanResult;
use guldan_core::models::user::{CreateUser, User};
use guldan_core::repository::UserRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{TOMBSTONE, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct UserRow {
    name: String,
    user_hash: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self, id: Uuid) -> User {
        User {
            id,
            name: self.name,
            user_hash: self.user_hash,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, SurrealValue)]
struct UserRowWithId {
    record_id: String,
    name: String,
    user_hash: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRowWithId {
    fn try_into_user(self) -> Result<User, DbError> {
        Ok(User {
            id: parse_uuid(&self.record_id, "user")?,
            name: self.name,
            user_hash: self.user_hash,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the User store.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> GuldanResult<User> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('user', $id) SET \
                 name = $name, user_hash = $user_hash, hash_key = $user_hash, \
                 is_deleted = false",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("user_hash", input.user_hash))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::classify(e, "user", &id_str))?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.into_user(id))
    }

    async fn get_by_id(&self, id: Uuid) -> GuldanResult<Option<User>> {
        let mut result = self
            .db
            .query("SELECT * FROM type::record('user', $id) WHERE is_deleted = false")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.into_iter().next().map(|row| row.into_user(id)))
    }

    async fn get_by_hash(&self, user_hash: &str) -> GuldanResult<Option<User>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM user \
                 WHERE user_hash = $user_hash AND is_deleted = false",
            )
            .bind(("user_hash", user_hash.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_user()?)),
            None => Ok(None),
        }
    }

    async fn list_by_ids(&self, ids: &[Uuid]) -> GuldanResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = ids.iter().map(Uuid::to_string).collect();
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM user \
                 WHERE meta::id(id) IN $ids AND is_deleted = false",
            )
            .bind(("ids", ids))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;
        let users = rows
            .into_iter()
            .map(|row| row.try_into_user())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(users)
    }

    async fn soft_delete(&self, id: Uuid) -> GuldanResult<()> {
        self.db
            .query(format!(
                "UPDATE type::record('user', $id) SET \
                 is_deleted = true, hash_key = {TOMBSTONE}, updated_at = time::now() \
                 WHERE is_deleted = false"
            ))
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(())
    }
}
