//! Store trait definitions for data access abstraction.
//!
//! All store operations are async. Point lookups return `Ok(None)` when no
//! active row matches so callers can tell "not found" apart from a failed
//! lookup. Soft-deleted rows are invisible to every read.

use uuid::Uuid;

use crate::error::GuldanResult;
use crate::models::{
    organization::{CreateOrganization, Organization},
    privilege::{CreateGrant, Grant, PrivilegeLevel, ResourceType},
    project::{CreateProject, Project},
    user::{CreateUser, User},
    visibility::Visibility,
};

// ---------------------------------------------------------------------------
// Resource store
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = GuldanResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = GuldanResult<Option<User>>> + Send;
    fn get_by_hash(
        &self,
        user_hash: &str,
    ) -> impl Future<Output = GuldanResult<Option<User>>> + Send;
    /// Empty input yields an empty result without touching the store.
    fn list_by_ids(&self, ids: &[Uuid]) -> impl Future<Output = GuldanResult<Vec<User>>> + Send;
    fn soft_delete(&self, id: Uuid) -> impl Future<Output = GuldanResult<()>> + Send;
}

pub trait OrganizationRepository: Send + Sync {
    /// Fails with `AlreadyExists` when an active organization has the name.
    fn create(
        &self,
        input: CreateOrganization,
    ) -> impl Future<Output = GuldanResult<Organization>> + Send;
    fn get_by_id(
        &self,
        id: Uuid,
    ) -> impl Future<Output = GuldanResult<Option<Organization>>> + Send;
    fn get_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = GuldanResult<Option<Organization>>> + Send;
    /// Empty input yields an empty result without touching the store.
    fn list_by_names(
        &self,
        names: &[String],
    ) -> impl Future<Output = GuldanResult<Vec<Organization>>> + Send;
    fn set_visibility(
        &self,
        id: Uuid,
        visibility: Visibility,
    ) -> impl Future<Output = GuldanResult<Organization>> + Send;
    fn soft_delete(&self, id: Uuid) -> impl Future<Output = GuldanResult<()>> + Send;
}

pub trait ProjectRepository: Send + Sync {
    /// Fails with `AlreadyExists` when the parent already has an active
    /// project with the name.
    fn create(&self, input: CreateProject) -> impl Future<Output = GuldanResult<Project>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = GuldanResult<Option<Project>>> + Send;
    fn get_by_name(
        &self,
        parent_id: Uuid,
        name: &str,
    ) -> impl Future<Output = GuldanResult<Option<Project>>> + Send;
    /// Looks projects up by qualified name. Empty input yields an empty
    /// result without touching the store.
    fn list_by_names(
        &self,
        qualified_names: &[String],
    ) -> impl Future<Output = GuldanResult<Vec<Project>>> + Send;
    fn list_children(
        &self,
        org_id: Uuid,
    ) -> impl Future<Output = GuldanResult<Vec<Project>>> + Send;
    fn set_visibility(
        &self,
        id: Uuid,
        visibility: Visibility,
    ) -> impl Future<Output = GuldanResult<Project>> + Send;
    fn soft_delete(&self, id: Uuid) -> impl Future<Output = GuldanResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Privilege store
// ---------------------------------------------------------------------------

pub trait PrivilegeRepository: Send + Sync {
    fn find(
        &self,
        user_hash: &str,
        resource_id: Uuid,
        resource_type: ResourceType,
    ) -> impl Future<Output = GuldanResult<Option<Grant>>> + Send;

    /// Grants of `user_hash` whose resource name starts with `prefix`.
    /// The prefix is matched literally.
    fn find_by_name_prefix(
        &self,
        user_hash: &str,
        prefix: &str,
    ) -> impl Future<Output = GuldanResult<Vec<Grant>>> + Send;

    fn find_all_for_resource(
        &self,
        resource_id: Uuid,
        resource_type: ResourceType,
    ) -> impl Future<Output = GuldanResult<Vec<Grant>>> + Send;

    /// Either filter being empty yields an empty result without touching
    /// the store.
    fn find_all_for_user(
        &self,
        user_hash: &str,
        resource_types: &[ResourceType],
        levels: &[PrivilegeLevel],
    ) -> impl Future<Output = GuldanResult<Vec<Grant>>> + Send;

    /// Fails with `AlreadyExists` if an active grant has the same key.
    fn insert(&self, input: CreateGrant) -> impl Future<Output = GuldanResult<Grant>> + Send;

    /// Check-then-insert as one transaction. Returns the existing active
    /// grant unchanged when there is one.
    fn insert_if_absent(
        &self,
        input: CreateGrant,
    ) -> impl Future<Output = GuldanResult<Grant>> + Send;

    fn update(
        &self,
        user_hash: &str,
        resource_id: Uuid,
        resource_type: ResourceType,
        level: PrivilegeLevel,
    ) -> impl Future<Output = GuldanResult<Grant>> + Send;

    /// Soft-deletes every active grant on the resource.
    fn soft_delete(
        &self,
        resource_id: Uuid,
        resource_type: ResourceType,
    ) -> impl Future<Output = GuldanResult<()>> + Send;

    fn soft_delete_for_user(
        &self,
        user_hash: &str,
        resource_id: Uuid,
        resource_type: ResourceType,
    ) -> impl Future<Output = GuldanResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Unit of work
// ---------------------------------------------------------------------------

/// Authorization condition re-checked inside a write transaction.
///
/// The lifecycle manager resolves privileges before writing; the guard
/// makes the write fail with `PermissionDenied` if a concurrent revoke
/// landed in between.
#[derive(Debug, Clone)]
pub enum WriteGuard {
    /// Acting user holds a MODIFIER grant on the organization.
    OrgModifier { user_hash: String, org_id: Uuid },
    /// Acting user holds at least a VIEWER grant on the organization.
    OrgViewer { user_hash: String, org_id: Uuid },
    /// Acting user holds any project grant, or MODIFIER on its parent.
    ProjectModifier {
        user_hash: String,
        project_id: Uuid,
        org_id: Uuid,
    },
}

/// Composite writes that must commit or roll back as a whole.
pub trait UnitOfWork: Send + Sync {
    /// Inserts the organization and grants `owner` MODIFIER on it.
    fn create_organization(
        &self,
        input: CreateOrganization,
        owner: &User,
    ) -> impl Future<Output = GuldanResult<Organization>> + Send;

    fn update_organization(
        &self,
        guard: &WriteGuard,
        org_id: Uuid,
        visibility: Visibility,
    ) -> impl Future<Output = GuldanResult<Organization>> + Send;

    /// Soft-deletes the organization and every grant on it. Child projects
    /// are left untouched.
    fn delete_organization(
        &self,
        guard: &WriteGuard,
        org_id: Uuid,
    ) -> impl Future<Output = GuldanResult<()>> + Send;

    /// Inserts the project and grants `owner` MODIFIER on it.
    fn create_project(
        &self,
        guard: &WriteGuard,
        input: CreateProject,
        owner: &User,
    ) -> impl Future<Output = GuldanResult<Project>> + Send;

    fn update_project(
        &self,
        guard: &WriteGuard,
        project_id: Uuid,
        visibility: Visibility,
    ) -> impl Future<Output = GuldanResult<Project>> + Send;

    /// Updates the level of the active grant for the key, or inserts one.
    fn upsert_grant(
        &self,
        guard: &WriteGuard,
        input: CreateGrant,
    ) -> impl Future<Output = GuldanResult<Grant>> + Send;

    /// Fails with `NotFound` when no active grant exists for the key.
    fn revoke_grant(
        &self,
        guard: &WriteGuard,
        user_hash: &str,
        resource_id: Uuid,
        resource_type: ResourceType,
    ) -> impl Future<Output = GuldanResult<()>> + Send;
}

/// Explicitly constructed handle bundling every store the engine needs.
pub trait Store: Send + Sync {
    type Users: UserRepository;
    type Organizations: OrganizationRepository;
    type Projects: ProjectRepository;
    type Privileges: PrivilegeRepository;
    type Work: UnitOfWork;

    fn users(&self) -> &Self::Users;
    fn organizations(&self) -> &Self::Organizations;
    fn projects(&self) -> &Self::Projects;
    fn privileges(&self) -> &Self::Privileges;
    fn unit_of_work(&self) -> &Self::Work;
}
