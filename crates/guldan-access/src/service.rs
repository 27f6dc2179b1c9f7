//! Resource lifecycle manager. Every organization, project and grant
//! write goes through here.

use std::collections::HashMap;

use guldan_core::error::{GuldanError, GuldanResult};
use guldan_core::models::organization::{CreateOrganization, Organization};
use guldan_core::models::privilege::{CreateGrant, Grant, PrivilegeLevel, ResourceType};
use guldan_core::models::project::{CreateProject, Project};
use guldan_core::models::user::User;
use guldan_core::models::visibility::Visibility;
use guldan_core::naming::{self, org_prefix, organization_of, qualified_name, strip_org_prefix};
use guldan_core::repository::{
    OrganizationRepository, PrivilegeRepository, ProjectRepository, Store, UnitOfWork,
    UserRepository, WriteGuard,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AccessConfig;
use crate::error::AccessError;
use crate::resolver::PrivilegeResolver;

/// Input for creating an organization.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrganizationInput {
    pub name: String,
    pub private: bool,
}

/// Input for creating a project.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProjectInput {
    pub org_id: Uuid,
    pub name: String,
    pub private: bool,
}

/// Input for granting a user a level on an organization.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizeInput {
    pub target_user_id: Uuid,
    /// `"puller"`, `"viewer"` or `"modifier"`.
    pub level: String,
}

/// How much of an organization the caller gets to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    Modifier,
    Viewer,
    Public,
}

/// A grant on the organization together with its holder's display name.
#[derive(Debug, Clone, Serialize)]
pub struct GrantHolder {
    pub grant_id: Uuid,
    pub user_id: Uuid,
    /// `None` when the holder's user row is gone.
    pub user_name: Option<String>,
    pub level: PrivilegeLevel,
}

/// Organization detail as seen by one user.
#[derive(Debug, Clone, Serialize)]
pub struct OrganizationView {
    pub organization: Organization,
    pub access: AccessMode,
    pub projects: Vec<Project>,
    /// Only filled in for modifiers.
    pub grants: Vec<GrantHolder>,
}

/// Access service.
///
/// Generic over the store bundle so that the access layer has no
/// dependency on the database crate.
pub struct AccessService<S: Store> {
    store: S,
    config: AccessConfig,
}

impl<S: Store> AccessService<S> {
    pub fn new(store: S, config: AccessConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    pub fn resolver(&self) -> PrivilegeResolver<'_, S::Privileges> {
        PrivilegeResolver::new(self.store.privileges())
    }

    async fn principal(&self, user_hash: &str) -> GuldanResult<User> {
        self.store
            .users()
            .get_by_hash(user_hash)
            .await?
            .ok_or_else(|| GuldanError::not_found("user", user_hash))
    }

    async fn organization(&self, org_id: Uuid) -> GuldanResult<Organization> {
        self.store
            .organizations()
            .get_by_id(org_id)
            .await?
            .ok_or_else(|| GuldanError::not_found("organization", org_id))
    }

    fn validate_name(&self, name: &str) -> Result<(), AccessError> {
        naming::validate_name(name, self.config.max_name_length)?;
        Ok(())
    }

    async fn require_modifier(&self, user: &User, org_id: Uuid) -> GuldanResult<WriteGuard> {
        if !self.resolver().can_modify(&user.user_hash, org_id).await? {
            warn!(user_hash = %user.user_hash, org_id = %org_id, "Modify denied");
            return Err(AccessError::NotModifier(org_id).into());
        }
        Ok(WriteGuard::OrgModifier {
            user_hash: user.user_hash.clone(),
            org_id,
        })
    }

    /// Creates an organization and grants the caller MODIFIER on it.
    pub async fn create_organization(
        &self,
        user_hash: &str,
        input: CreateOrganizationInput,
    ) -> GuldanResult<Organization> {
        let user = self.principal(user_hash).await?;
        self.validate_name(&input.name)?;

        if self
            .store
            .organizations()
            .get_by_name(&input.name)
            .await?
            .is_some()
        {
            return Err(GuldanError::AlreadyExists {
                entity: "organization".into(),
            });
        }

        // A concurrent create that passed the check above is stopped by
        // the unique name index inside the transaction.
        self.store
            .unit_of_work()
            .create_organization(
                CreateOrganization {
                    name: input.name,
                    visibility: Visibility::from_private(input.private),
                },
                &user,
            )
            .await
    }

    pub async fn update_organization(
        &self,
        user_hash: &str,
        org_id: Uuid,
        private: bool,
    ) -> GuldanResult<Organization> {
        let user = self.principal(user_hash).await?;
        self.organization(org_id).await?;
        let guard = self.require_modifier(&user, org_id).await?;

        self.store
            .unit_of_work()
            .update_organization(&guard, org_id, Visibility::from_private(private))
            .await
    }

    /// Soft-deletes the organization and the grants on it. Projects below
    /// it are left as they are.
    pub async fn delete_organization(&self, user_hash: &str, org_id: Uuid) -> GuldanResult<()> {
        let user = self.principal(user_hash).await?;
        self.organization(org_id).await?;
        let guard = self.require_modifier(&user, org_id).await?;

        self.store
            .unit_of_work()
            .delete_organization(&guard, org_id)
            .await
    }

    /// Creates a project under an organization the caller can view and
    /// grants the caller MODIFIER on it.
    pub async fn create_project(
        &self,
        user_hash: &str,
        input: CreateProjectInput,
    ) -> GuldanResult<Project> {
        let user = self.principal(user_hash).await?;
        let org = self.organization(input.org_id).await?;

        if !self
            .resolver()
            .can_create_project(&user.user_hash, org.id)
            .await?
        {
            warn!(user_hash = %user.user_hash, org_id = %org.id, "Project creation denied");
            return Err(AccessError::NotViewer(org.id).into());
        }

        self.validate_name(&input.name)?;
        if self
            .store
            .projects()
            .get_by_name(org.id, &input.name)
            .await?
            .is_some()
        {
            return Err(GuldanError::AlreadyExists {
                entity: "project".into(),
            });
        }

        let guard = WriteGuard::OrgViewer {
            user_hash: user.user_hash.clone(),
            org_id: org.id,
        };
        self.store
            .unit_of_work()
            .create_project(
                &guard,
                CreateProject {
                    parent_id: org.id,
                    qualified_name: qualified_name(&org.name, &input.name),
                    name: input.name,
                    visibility: Visibility::from_private(input.private),
                },
                &user,
            )
            .await
    }

    pub async fn update_project(
        &self,
        user_hash: &str,
        project_id: Uuid,
        private: bool,
    ) -> GuldanResult<Project> {
        let user = self.principal(user_hash).await?;
        let project = self
            .store
            .projects()
            .get_by_id(project_id)
            .await?
            .ok_or_else(|| GuldanError::not_found("project", project_id))?;

        if !self
            .resolver()
            .can_modify_project(&user.user_hash, project.id, project.parent_id)
            .await?
        {
            warn!(user_hash = %user.user_hash, project_id = %project.id, "Project modify denied");
            return Err(AccessError::NotProjectModifier(project.id).into());
        }

        let guard = WriteGuard::ProjectModifier {
            user_hash: user.user_hash.clone(),
            project_id: project.id,
            org_id: project.parent_id,
        };
        self.store
            .unit_of_work()
            .update_project(&guard, project.id, Visibility::from_private(private))
            .await
    }

    /// Sets the target user's level on the organization, creating the
    /// grant if they hold none.
    pub async fn authorize(
        &self,
        user_hash: &str,
        org_id: Uuid,
        input: AuthorizeInput,
    ) -> GuldanResult<Grant> {
        let user = self.principal(user_hash).await?;
        if input.target_user_id == user.id {
            return Err(AccessError::SelfAuthorization.into());
        }
        let level = PrivilegeLevel::parse(&input.level)
            .ok_or_else(|| AccessError::UnknownPrivilegeType(input.level.clone()))?;

        let org = self.organization(org_id).await?;
        let guard = self.require_modifier(&user, org.id).await?;

        let target = self
            .store
            .users()
            .get_by_id(input.target_user_id)
            .await?
            .ok_or_else(|| GuldanError::not_found("user", input.target_user_id))?;

        let grant = self
            .store
            .unit_of_work()
            .upsert_grant(
                &guard,
                CreateGrant {
                    resource_id: org.id,
                    resource_name: org.name,
                    resource_type: ResourceType::Org,
                    resource_visibility: org.visibility,
                    user_id: target.id,
                    user_hash: target.user_hash,
                    level,
                },
            )
            .await?;

        info!(
            granted_by = %user.user_hash,
            target = %grant.user_hash,
            org_id = %org_id,
            level = level.as_str(),
            "Organization access granted"
        );
        Ok(grant)
    }

    /// Removes the target user's grant on the organization.
    pub async fn revoke_authorize(
        &self,
        user_hash: &str,
        org_id: Uuid,
        target_user_id: Uuid,
    ) -> GuldanResult<()> {
        let user = self.principal(user_hash).await?;
        let target = self
            .store
            .users()
            .get_by_id(target_user_id)
            .await?
            .ok_or_else(|| GuldanError::not_found("user", target_user_id))?;
        let guard = self.require_modifier(&user, org_id).await?;

        if self
            .store
            .privileges()
            .find(&target.user_hash, org_id, ResourceType::Org)
            .await?
            .is_none()
        {
            return Err(AccessError::NoGrant(org_id).into());
        }

        let revoked = self
            .store
            .unit_of_work()
            .revoke_grant(&guard, &target.user_hash, org_id, ResourceType::Org)
            .await;
        match revoked {
            // Revoked concurrently after the check above.
            Err(GuldanError::NotFound { entity, .. }) if entity == "privilege" => {
                Err(AccessError::NoGrant(org_id).into())
            }
            other => other,
        }
    }

    /// Organizations the user holds a VIEWER or MODIFIER grant in, on the
    /// organization itself or on anything below it.
    pub async fn list_organizations(&self, user_hash: &str) -> GuldanResult<Vec<Organization>> {
        let user = self.principal(user_hash).await?;
        let grants = self
            .store
            .privileges()
            .find_all_for_user(
                &user.user_hash,
                &ResourceType::ALL,
                &[PrivilegeLevel::Viewer, PrivilegeLevel::Modifier],
            )
            .await?;

        let mut names: Vec<String> = Vec::new();
        for grant in &grants {
            let name = organization_of(&grant.resource_name);
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        debug!(user_hash, grants = grants.len(), orgs = names.len(), "Listing organizations");

        self.store.organizations().list_by_names(&names).await
    }

    /// Organization detail, filtered by what the user may see.
    ///
    /// Modifiers get every project and the grant list, viewers every
    /// project, everyone else the public projects plus the private ones
    /// they hold a project grant on.
    pub async fn describe_organization(
        &self,
        user_hash: &str,
        org_id: Uuid,
    ) -> GuldanResult<OrganizationView> {
        let user = self.principal(user_hash).await?;
        let organization = self.organization(org_id).await?;
        let resolver = self.resolver();

        if resolver.can_modify(&user.user_hash, org_id).await? {
            let projects = self.store.projects().list_children(org_id).await?;
            let grants = self.grant_holders(org_id).await?;
            return Ok(OrganizationView {
                organization,
                access: AccessMode::Modifier,
                projects,
                grants,
            });
        }

        if resolver.can_view(&user.user_hash, org_id).await? {
            let projects = self.store.projects().list_children(org_id).await?;
            return Ok(OrganizationView {
                organization,
                access: AccessMode::Viewer,
                projects,
                grants: Vec::new(),
            });
        }

        let granted = self
            .store
            .privileges()
            .find_by_name_prefix(&user.user_hash, &org_prefix(&organization.name))
            .await?;
        let granted: Vec<&str> = granted
            .iter()
            .filter(|g| g.resource_type == ResourceType::Project)
            .filter_map(|g| strip_org_prefix(&g.resource_name, &organization.name))
            .collect();

        let projects = self
            .store
            .projects()
            .list_children(org_id)
            .await?
            .into_iter()
            .filter(|p| p.visibility.is_public() || granted.contains(&p.name.as_str()))
            .collect();

        Ok(OrganizationView {
            organization,
            access: AccessMode::Public,
            projects,
            grants: Vec::new(),
        })
    }

    async fn grant_holders(&self, org_id: Uuid) -> GuldanResult<Vec<GrantHolder>> {
        let grants = self
            .store
            .privileges()
            .find_all_for_resource(org_id, ResourceType::Org)
            .await?;
        let ids: Vec<Uuid> = grants.iter().map(|g| g.user_id).collect();
        let names: HashMap<Uuid, String> = self
            .store
            .users()
            .list_by_ids(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u.name))
            .collect();

        Ok(grants
            .into_iter()
            .map(|g| GrantHolder {
                grant_id: g.id,
                user_id: g.user_id,
                user_name: names.get(&g.user_id).cloned(),
                level: g.level,
            })
            .collect())
    }
}
