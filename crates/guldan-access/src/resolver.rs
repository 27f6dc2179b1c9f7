//! Privilege resolution.
//!
//! Answers "may this user do X on this resource" from the active grants
//! alone. Absence of a grant resolves to "no"; a failed lookup is an
//! error, never a silent "no".

use guldan_core::error::GuldanResult;
use guldan_core::models::privilege::{PrivilegeLevel, ResourceType};
use guldan_core::models::project::Project;
use guldan_core::repository::PrivilegeRepository;
use tracing::debug;
use uuid::Uuid;

/// A user's grants on a project and on the organization above it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectLevels {
    /// Level of the user's own PROJECT grant.
    pub own: Option<PrivilegeLevel>,
    /// Level of the user's ORG grant on the parent organization.
    pub inherited: Option<PrivilegeLevel>,
}

impl ProjectLevels {
    /// The stronger of the two levels.
    pub fn effective(&self) -> Option<PrivilegeLevel> {
        self.own.max(self.inherited)
    }
}

/// Read-only view over a privilege store.
pub struct PrivilegeResolver<'a, P: PrivilegeRepository> {
    grants: &'a P,
}

impl<'a, P: PrivilegeRepository> PrivilegeResolver<'a, P> {
    pub fn new(grants: &'a P) -> Self {
        Self { grants }
    }

    pub async fn effective_org_level(
        &self,
        user_hash: &str,
        org_id: Uuid,
    ) -> GuldanResult<Option<PrivilegeLevel>> {
        let grant = self.grants.find(user_hash, org_id, ResourceType::Org).await?;
        Ok(grant.map(|g| g.level))
    }

    pub async fn project_levels(
        &self,
        user_hash: &str,
        project_id: Uuid,
        org_id: Uuid,
    ) -> GuldanResult<ProjectLevels> {
        let own = self
            .grants
            .find(user_hash, project_id, ResourceType::Project)
            .await?
            .map(|g| g.level);
        let inherited = self.effective_org_level(user_hash, org_id).await?;
        Ok(ProjectLevels { own, inherited })
    }

    pub async fn effective_project_level(
        &self,
        user_hash: &str,
        project: &Project,
    ) -> GuldanResult<Option<PrivilegeLevel>> {
        let levels = self
            .project_levels(user_hash, project.id, project.parent_id)
            .await?;
        Ok(levels.effective())
    }

    pub async fn can_modify(&self, user_hash: &str, org_id: Uuid) -> GuldanResult<bool> {
        let level = self.effective_org_level(user_hash, org_id).await?;
        let allowed = level.is_some_and(PrivilegeLevel::can_modify);
        debug!(user_hash, org_id = %org_id, allowed, "Resolved org modify");
        Ok(allowed)
    }

    pub async fn can_view(&self, user_hash: &str, org_id: Uuid) -> GuldanResult<bool> {
        let level = self.effective_org_level(user_hash, org_id).await?;
        let allowed = level.is_some_and(PrivilegeLevel::can_view);
        debug!(user_hash, org_id = %org_id, allowed, "Resolved org view");
        Ok(allowed)
    }

    /// Any active grant on the project authorizes modification, whatever
    /// its level. Without one, MODIFIER on the parent organization does.
    pub async fn can_modify_project(
        &self,
        user_hash: &str,
        project_id: Uuid,
        org_id: Uuid,
    ) -> GuldanResult<bool> {
        let levels = self.project_levels(user_hash, project_id, org_id).await?;
        let allowed =
            levels.own.is_some() || levels.inherited.is_some_and(PrivilegeLevel::can_modify);
        debug!(
            user_hash,
            project_id = %project_id,
            org_id = %org_id,
            allowed,
            "Resolved project modify"
        );
        Ok(allowed)
    }

    pub async fn can_create_project(&self, user_hash: &str, org_id: Uuid) -> GuldanResult<bool> {
        self.can_view(user_hash, org_id).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use guldan_core::error::GuldanError;
    use guldan_core::models::privilege::{CreateGrant, Grant};
    use guldan_core::models::visibility::Visibility;

    use super::*;

    /// In-memory grant list; `failing` makes every lookup error out.
    #[derive(Default)]
    struct StubGrants {
        grants: Vec<Grant>,
        failing: bool,
    }

    impl StubGrants {
        fn with(
            mut self,
            user_hash: &str,
            resource_id: Uuid,
            resource_type: ResourceType,
            level: PrivilegeLevel,
        ) -> Self {
            let now = Utc::now();
            self.grants.push(Grant {
                id: Uuid::new_v4(),
                resource_id,
                resource_name: "acme".into(),
                resource_type,
                resource_visibility: Visibility::Private,
                user_id: Uuid::new_v4(),
                user_hash: user_hash.into(),
                level,
                created_at: now,
                updated_at: now,
            });
            self
        }

        fn check(&self) -> GuldanResult<()> {
            if self.failing {
                return Err(GuldanError::StoreUnavailable("connection reset".into()));
            }
            Ok(())
        }
    }

    impl PrivilegeRepository for StubGrants {
        async fn find(
            &self,
            user_hash: &str,
            resource_id: Uuid,
            resource_type: ResourceType,
        ) -> GuldanResult<Option<Grant>> {
            self.check()?;
            Ok(self
                .grants
                .iter()
                .find(|g| {
                    g.user_hash == user_hash
                        && g.resource_id == resource_id
                        && g.resource_type == resource_type
                })
                .cloned())
        }

        async fn find_by_name_prefix(&self, _: &str, _: &str) -> GuldanResult<Vec<Grant>> {
            unimplemented!()
        }

        async fn find_all_for_resource(&self, _: Uuid, _: ResourceType) -> GuldanResult<Vec<Grant>> {
            unimplemented!()
        }

        async fn find_all_for_user(
            &self,
            _: &str,
            _: &[ResourceType],
            _: &[PrivilegeLevel],
        ) -> GuldanResult<Vec<Grant>> {
            unimplemented!()
        }

        async fn insert(&self, _: CreateGrant) -> GuldanResult<Grant> {
            unimplemented!()
        }

        async fn insert_if_absent(&self, _: CreateGrant) -> GuldanResult<Grant> {
            unimplemented!()
        }

        async fn update(
            &self,
            _: &str,
            _: Uuid,
            _: ResourceType,
            _: PrivilegeLevel,
        ) -> GuldanResult<Grant> {
            unimplemented!()
        }

        async fn soft_delete(&self, _: Uuid, _: ResourceType) -> GuldanResult<()> {
            unimplemented!()
        }

        async fn soft_delete_for_user(&self, _: &str, _: Uuid, _: ResourceType) -> GuldanResult<()> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn missing_grant_resolves_to_false() {
        let stub = StubGrants::default();
        let resolver = PrivilegeResolver::new(&stub);
        let org_id = Uuid::new_v4();

        assert!(!resolver.can_modify("alice", org_id).await.unwrap());
        assert!(!resolver.can_view("alice", org_id).await.unwrap());
        assert_eq!(resolver.effective_org_level("alice", org_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn store_failure_propagates() {
        let stub = StubGrants {
            failing: true,
            ..Default::default()
        };
        let resolver = PrivilegeResolver::new(&stub);
        let org_id = Uuid::new_v4();

        assert!(matches!(
            resolver.can_modify("alice", org_id).await,
            Err(GuldanError::StoreUnavailable(_))
        ));
        assert!(matches!(
            resolver.can_view("alice", org_id).await,
            Err(GuldanError::StoreUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn levels_are_ordered() {
        let org_id = Uuid::new_v4();
        let stub = StubGrants::default()
            .with("mod", org_id, ResourceType::Org, PrivilegeLevel::Modifier)
            .with("view", org_id, ResourceType::Org, PrivilegeLevel::Viewer)
            .with("pull", org_id, ResourceType::Org, PrivilegeLevel::Puller);
        let resolver = PrivilegeResolver::new(&stub);

        for user in ["mod", "view", "pull", "nobody"] {
            let modify = resolver.can_modify(user, org_id).await.unwrap();
            let view = resolver.can_view(user, org_id).await.unwrap();
            assert!(!modify || view, "{user} can modify but not view");
        }
        assert!(resolver.can_modify("mod", org_id).await.unwrap());
        assert!(!resolver.can_modify("view", org_id).await.unwrap());
        assert!(resolver.can_view("view", org_id).await.unwrap());
        assert!(!resolver.can_view("pull", org_id).await.unwrap());
        assert!(!resolver.can_create_project("pull", org_id).await.unwrap());
        assert!(resolver.can_create_project("view", org_id).await.unwrap());
    }

    #[tokio::test]
    async fn any_project_grant_allows_project_modify() {
        let org_id = Uuid::new_v4();
        let project_id = Uuid::new_v4();
        let stub = StubGrants::default()
            .with("puller", project_id, ResourceType::Project, PrivilegeLevel::Puller)
            .with("org-viewer", org_id, ResourceType::Org, PrivilegeLevel::Viewer)
            .with("org-mod", org_id, ResourceType::Org, PrivilegeLevel::Modifier);
        let resolver = PrivilegeResolver::new(&stub);

        assert!(resolver.can_modify_project("puller", project_id, org_id).await.unwrap());
        assert!(!resolver.can_modify_project("org-viewer", project_id, org_id).await.unwrap());
        assert!(resolver.can_modify_project("org-mod", project_id, org_id).await.unwrap());
    }

    #[tokio::test]
    async fn project_level_takes_the_stronger_grant() {
        let org_id = Uuid::new_v4();
        let project = Project {
            id: Uuid::new_v4(),
            parent_id: org_id,
            name: "web".into(),
            qualified_name: "acme.web".into(),
            visibility: Visibility::Private,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let stub = StubGrants::default()
            .with("alice", project.id, ResourceType::Project, PrivilegeLevel::Puller)
            .with("alice", org_id, ResourceType::Org, PrivilegeLevel::Viewer);
        let resolver = PrivilegeResolver::new(&stub);

        assert_eq!(
            resolver.effective_project_level("alice", &project).await.unwrap(),
            Some(PrivilegeLevel::Viewer)
        );
        assert_eq!(
            resolver.effective_project_level("bob", &project).await.unwrap(),
            None
        );
    }

    #[test]
    fn effective_of_nothing_is_none() {
        assert_eq!(ProjectLevels::default().effective(), None);
    }
}
