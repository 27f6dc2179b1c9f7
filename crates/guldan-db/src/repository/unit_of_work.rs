//! Transactional composite writes.
//!
//! Each operation is rendered into a single `BEGIN TRANSACTION … COMMIT
//! TRANSACTION` script: existence checks and the authorization guard run
//! as `THROW`ing statements ahead of the writes, so either every write
//! commits or none does. Results are read back after commit by id.

use guldan_core::error::GuldanResult;
use guldan_core::models::organization::{CreateOrganization, Organization};
use guldan_core::models::privilege::{
    CreateGrant, Grant, PrivilegeLevel, ResourceType, active_key,
};
use guldan_core::models::project::{CreateProject, Project};
use guldan_core::models::user::User;
use guldan_core::models::visibility::Visibility;
use guldan_core::repository::{OrganizationRepository, ProjectRepository, UnitOfWork, WriteGuard};
use surrealdb::{Connection, Surreal};
use tracing::info;
use uuid::Uuid;

use super::organization::{self, CREATE_ORG, SET_ORG_VISIBILITY, SurrealOrganizationRepository};
use super::privilege::{
    self, ACTIVE_GRANT_IDS, CREATE_GRANT, SET_GRANT_LEVEL, SurrealPrivilegeRepository,
};
use super::project::{self, CREATE_PROJECT, SET_PROJECT_VISIBILITY, SurrealProjectRepository};
use super::{Binds, execute_transaction};
use crate::error::{DbError, GUARD_FAILED, MISSING};

fn entity_name(resource_type: ResourceType) -> &'static str {
    match resource_type {
        ResourceType::Org => "organization",
        ResourceType::Project => "project",
        ResourceType::Item => "item",
    }
}

/// Statements and parameters of one transaction.
#[derive(Default)]
struct Script {
    statements: Vec<String>,
    binds: Binds,
}

impl Script {
    fn statement(mut self, sql: impl Into<String>) -> Self {
        self.statements.push(sql.into());
        self
    }

    fn binds(mut self, binds: Binds) -> Self {
        self.binds.extend(binds);
        self
    }

    /// Aborts unless the active row `table:$param` exists.
    fn require(self, table: &'static str, param: &'static str, entity: &'static str) -> Self {
        self.statement(format!(
            "IF array::len((SELECT VALUE id FROM type::record('{table}', ${param}) \
             WHERE is_deleted = false)) = 0 {{ THROW '{MISSING}{entity}' }}"
        ))
    }

    /// Aborts unless `guard` still holds.
    fn guard(self, guard: &WriteGuard) -> Self {
        let modifier_grant = |param: &str| {
            format!(
                "array::len((SELECT VALUE id FROM privilege \
                 WHERE active_key = ${param} AND privilege_type = 'modifier' \
                 AND is_deleted = false)) = 0"
            )
        };

        match guard {
            WriteGuard::OrgModifier { user_hash, org_id } => self
                .statement(format!(
                    "IF {} {{ THROW '{GUARD_FAILED}' }}",
                    modifier_grant("guard_key")
                ))
                .binds(vec![(
                    "guard_key",
                    active_key(user_hash, *org_id, ResourceType::Org),
                )]),
            WriteGuard::OrgViewer { user_hash, org_id } => self
                .statement(format!(
                    "IF array::len((SELECT VALUE id FROM privilege \
                     WHERE active_key = $guard_key \
                     AND privilege_type IN ['viewer', 'modifier'] \
                     AND is_deleted = false)) = 0 {{ THROW '{GUARD_FAILED}' }}"
                ))
                .binds(vec![(
                    "guard_key",
                    active_key(user_hash, *org_id, ResourceType::Org),
                )]),
            WriteGuard::ProjectModifier {
                user_hash,
                project_id,
                org_id,
            } => self
                .statement(format!(
                    "IF array::len((SELECT VALUE id FROM privilege \
                     WHERE active_key = $guard_key AND is_deleted = false)) = 0 \
                     AND {} {{ THROW '{GUARD_FAILED}' }}",
                    modifier_grant("guard_parent_key")
                ))
                .binds(vec![
                    (
                        "guard_key",
                        active_key(user_hash, *project_id, ResourceType::Project),
                    ),
                    (
                        "guard_parent_key",
                        active_key(user_hash, *org_id, ResourceType::Org),
                    ),
                ]),
        }
    }
}

/// SurrealDB implementation of the unit of work.
#[derive(Clone)]
pub struct SurrealUnitOfWork<C: Connection> {
    db: Surreal<C>,
    organizations: SurrealOrganizationRepository<C>,
    projects: SurrealProjectRepository<C>,
    privileges: SurrealPrivilegeRepository<C>,
}

impl<C: Connection> SurrealUnitOfWork<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            organizations: SurrealOrganizationRepository::new(db.clone()),
            projects: SurrealProjectRepository::new(db.clone()),
            privileges: SurrealPrivilegeRepository::new(db.clone()),
            db,
        }
    }

    async fn run(&self, script: Script, entity: &str, subject: &str) -> Result<(), DbError> {
        execute_transaction(&self.db, &script.statements, script.binds, entity, subject).await
    }

    async fn read_organization(&self, id: Uuid) -> GuldanResult<Organization> {
        self.organizations.get_by_id(id).await?.ok_or_else(|| {
            DbError::NotFound {
                entity: "organization".into(),
                id: id.to_string(),
            }
            .into()
        })
    }

    async fn read_project(&self, id: Uuid) -> GuldanResult<Project> {
        self.projects.get_by_id(id).await?.ok_or_else(|| {
            DbError::NotFound {
                entity: "project".into(),
                id: id.to_string(),
            }
            .into()
        })
    }
}

impl<C: Connection> UnitOfWork for SurrealUnitOfWork<C> {
    async fn create_organization(
        &self,
        input: CreateOrganization,
        owner: &User,
    ) -> GuldanResult<Organization> {
        let org_id = Uuid::new_v4();
        let grant = CreateGrant {
            resource_id: org_id,
            resource_name: input.name.clone(),
            resource_type: ResourceType::Org,
            resource_visibility: input.visibility,
            user_id: owner.id,
            user_hash: owner.user_hash.clone(),
            level: PrivilegeLevel::Modifier,
        };

        let script = Script::default()
            .statement(CREATE_ORG)
            .binds(organization::create_binds(org_id, &input))
            .statement(CREATE_GRANT)
            .binds(privilege::create_binds(Uuid::new_v4(), &grant));
        self.run(script, "organization", &org_id.to_string())
            .await?;

        info!(
            org_id = %org_id,
            name = %input.name,
            owner = %owner.user_hash,
            "Organization created with owner grant"
        );
        self.read_organization(org_id).await
    }

    async fn update_organization(
        &self,
        guard: &WriteGuard,
        org_id: Uuid,
        visibility: Visibility,
    ) -> GuldanResult<Organization> {
        let org_id_str = org_id.to_string();
        let script = Script::default()
            .require("org", "org_id", "organization")
            .guard(guard)
            .statement(SET_ORG_VISIBILITY)
            .binds(vec![
                ("org_id", org_id_str.clone()),
                ("visibility", visibility.as_str().to_string()),
            ]);
        self.run(script, "organization", &org_id_str).await?;

        info!(org_id = %org_id, visibility = visibility.as_str(), "Organization updated");
        self.read_organization(org_id).await
    }

    async fn delete_organization(&self, guard: &WriteGuard, org_id: Uuid) -> GuldanResult<()> {
        let org_id_str = org_id.to_string();
        let script = Script::default()
            .require("org", "org_id", "organization")
            .guard(guard)
            .statement(organization::soft_delete_org())
            .statement(privilege::soft_delete_by_resource())
            .binds(vec![
                ("org_id", org_id_str.clone()),
                ("resource_id", org_id_str.clone()),
                ("resource_type", ResourceType::Org.as_str().to_string()),
            ]);
        self.run(script, "organization", &org_id_str).await?;

        info!(org_id = %org_id, "Organization and its grants soft-deleted");
        Ok(())
    }

    async fn create_project(
        &self,
        guard: &WriteGuard,
        input: CreateProject,
        owner: &User,
    ) -> GuldanResult<Project> {
        let project_id = Uuid::new_v4();
        let grant = CreateGrant {
            resource_id: project_id,
            resource_name: input.qualified_name.clone(),
            resource_type: ResourceType::Project,
            resource_visibility: input.visibility,
            user_id: owner.id,
            user_hash: owner.user_hash.clone(),
            level: PrivilegeLevel::Modifier,
        };

        let script = Script::default()
            .require("org", "parent_id", "organization")
            .guard(guard)
            .statement(CREATE_PROJECT)
            .binds(project::create_binds(project_id, &input))
            .statement(CREATE_GRANT)
            .binds(privilege::create_binds(Uuid::new_v4(), &grant));
        self.run(script, "project", &input.parent_id.to_string())
            .await?;

        info!(
            project_id = %project_id,
            qualified_name = %input.qualified_name,
            owner = %owner.user_hash,
            "Project created with owner grant"
        );
        self.read_project(project_id).await
    }

    async fn update_project(
        &self,
        guard: &WriteGuard,
        project_id: Uuid,
        visibility: Visibility,
    ) -> GuldanResult<Project> {
        let project_id_str = project_id.to_string();
        let script = Script::default()
            .require("project", "project_id", "project")
            .guard(guard)
            .statement(SET_PROJECT_VISIBILITY)
            .binds(vec![
                ("project_id", project_id_str.clone()),
                ("visibility", visibility.as_str().to_string()),
            ]);
        self.run(script, "project", &project_id_str).await?;

        info!(
            project_id = %project_id,
            visibility = visibility.as_str(),
            "Project updated"
        );
        self.read_project(project_id).await
    }

    async fn upsert_grant(&self, guard: &WriteGuard, input: CreateGrant) -> GuldanResult<Grant> {
        let key = active_key(&input.user_hash, input.resource_id, input.resource_type);
        let script = Script::default()
            .require(
                input.resource_type.as_str(),
                "resource_id",
                entity_name(input.resource_type),
            )
            .guard(guard)
            .statement(format!(
                "IF array::len({ACTIVE_GRANT_IDS}) > 0 {{ {SET_GRANT_LEVEL} }} \
                 ELSE {{ {CREATE_GRANT} }}"
            ))
            .binds(privilege::create_binds(Uuid::new_v4(), &input));
        self.run(script, "privilege", &input.resource_id.to_string())
            .await?;

        info!(
            user_hash = %input.user_hash,
            resource = %input.resource_name,
            level = input.level.as_str(),
            "Grant upserted"
        );
        self.privileges.find_by_key(key.clone()).await?.ok_or_else(|| {
            DbError::NotFound {
                entity: "privilege".into(),
                id: key,
            }
            .into()
        })
    }

    async fn revoke_grant(
        &self,
        guard: &WriteGuard,
        user_hash: &str,
        resource_id: Uuid,
        resource_type: ResourceType,
    ) -> GuldanResult<()> {
        let script = Script::default()
            .guard(guard)
            .statement(format!(
                "IF array::len({ACTIVE_GRANT_IDS}) = 0 {{ THROW '{MISSING}privilege' }}"
            ))
            .statement(privilege::soft_delete_by_key())
            .binds(vec![(
                "active_key",
                active_key(user_hash, resource_id, resource_type),
            )]);
        self.run(script, "privilege", &resource_id.to_string())
            .await?;

        info!(
            user_hash = %user_hash,
            resource_id = %resource_id,
            resource_type = resource_type.as_str(),
            "Grant revoked"
        );
        Ok(())
    }
}
