//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode. UUIDs and enums are stored
//! as strings, enums with ASSERT constraints. Soft deletion sets
//! `is_deleted` and moves the row's uniqueness key (`name_key`, `hash_key`,
//! `active_key`) to a per-row tombstone so the index only ever constrains
//! active rows.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Users
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD name ON TABLE user TYPE string;
DEFINE FIELD user_hash ON TABLE user TYPE string;
DEFINE FIELD hash_key ON TABLE user TYPE string;
DEFINE FIELD is_deleted ON TABLE user TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE user TYPE datetime DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime DEFAULT time::now();
DEFINE INDEX idx_user_hash ON TABLE user COLUMNS user_hash;
DEFINE INDEX idx_user_hash_key ON TABLE user COLUMNS hash_key UNIQUE;

-- =======================================================================
-- Organizations
-- =======================================================================
DEFINE TABLE org SCHEMAFULL;
DEFINE FIELD name ON TABLE org TYPE string;
DEFINE FIELD name_key ON TABLE org TYPE string;
DEFINE FIELD visibility ON TABLE org TYPE string \
    ASSERT $value IN ['private', 'public'];
DEFINE FIELD is_deleted ON TABLE org TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE org TYPE datetime DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE org TYPE datetime DEFAULT time::now();
DEFINE INDEX idx_org_name_key ON TABLE org COLUMNS name_key UNIQUE;

-- =======================================================================
-- Projects (scoped to organization)
-- =======================================================================
DEFINE TABLE project SCHEMAFULL;
DEFINE FIELD parent_id ON TABLE project TYPE string;
DEFINE FIELD name ON TABLE project TYPE string;
DEFINE FIELD name_key ON TABLE project TYPE string;
DEFINE FIELD qualified_name ON TABLE project TYPE string;
DEFINE FIELD visibility ON TABLE project TYPE string \
    ASSERT $value IN ['private', 'public'];
DEFINE FIELD is_deleted ON TABLE project TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE project TYPE datetime DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE project TYPE datetime DEFAULT time::now();
DEFINE INDEX idx_project_parent_name_key ON TABLE project \
    COLUMNS parent_id, name_key UNIQUE;
DEFINE INDEX idx_project_qualified_name ON TABLE project \
    COLUMNS qualified_name;

-- =======================================================================
-- Privileges (grants)
-- =======================================================================
DEFINE TABLE privilege SCHEMAFULL;
DEFINE FIELD resource_id ON TABLE privilege TYPE string;
DEFINE FIELD resource_name ON TABLE privilege TYPE string;
DEFINE FIELD resource_type ON TABLE privilege TYPE string \
    ASSERT $value IN ['org', 'project', 'item'];
DEFINE FIELD resource_visibility ON TABLE privilege TYPE string \
    ASSERT $value IN ['private', 'public'];
DEFINE FIELD user_id ON TABLE privilege TYPE string;
DEFINE FIELD user_hash ON TABLE privilege TYPE string;
DEFINE FIELD privilege_type ON TABLE privilege TYPE string \
    ASSERT $value IN ['puller', 'viewer', 'modifier'];
DEFINE FIELD active_key ON TABLE privilege TYPE string;
DEFINE FIELD is_deleted ON TABLE privilege TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE privilege TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE privilege TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_privilege_active_key ON TABLE privilege \
    COLUMNS active_key UNIQUE;
DEFINE INDEX idx_privilege_user ON TABLE privilege COLUMNS user_hash;
DEFINE INDEX idx_privilege_resource ON TABLE privilege \
    COLUMNS resource_id, resource_type;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT version FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            db.query("CREATE _migration SET version = $version, name = $name")
                .bind(("version", migration.version))
                .bind(("name", migration.name))
                .await?
                .check()
                .map_err(|e| {
                    DbError::Migration(format!(
                        "Failed to record migration v{}: {}",
                        migration.version, e,
                    ))
                })?;

            info!(version = migration.version, "Migration applied");
        }
    }

    Ok(())
}
