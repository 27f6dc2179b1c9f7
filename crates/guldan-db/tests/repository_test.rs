//! Integration tests for the resource and privilege stores using
//! in-memory SurrealDB.

use guldan_core::error::GuldanError;
use guldan_core::models::organization::CreateOrganization;
use guldan_core::models::privilege::{CreateGrant, PrivilegeLevel, ResourceType};
use guldan_core::models::project::CreateProject;
use guldan_core::models::user::{CreateUser, User};
use guldan_core::models::visibility::Visibility;
use guldan_core::repository::{
    OrganizationRepository, PrivilegeRepository, ProjectRepository, UserRepository,
};
use guldan_db::repository::{
    SurrealOrganizationRepository, SurrealPrivilegeRepository, SurrealProjectRepository,
    SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

/// Helper: spin up in-memory DB and run migrations.
async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    guldan_db::run_migrations(&db).await.unwrap();
    db
}

async fn create_user(db: &Surreal<Db>, name: &str) -> User {
    SurrealUserRepository::new(db.clone())
        .create(CreateUser {
            name: name.into(),
            user_hash: format!("hash-{name}"),
        })
        .await
        .unwrap()
}

fn org_grant(user: &User, org_id: Uuid, name: &str, level: PrivilegeLevel) -> CreateGrant {
    CreateGrant {
        resource_id: org_id,
        resource_name: name.into(),
        resource_type: ResourceType::Org,
        resource_visibility: Visibility::Private,
        user_id: user.id,
        user_hash: user.user_hash.clone(),
        level,
    }
}

// -----------------------------------------------------------------------
// Users
// -----------------------------------------------------------------------

#[tokio::test]
async fn user_lookup_by_hash() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db.clone());
    let alice = create_user(&db, "alice").await;

    let fetched = repo.get_by_hash("hash-alice").await.unwrap().unwrap();
    assert_eq!(fetched.id, alice.id);
    assert_eq!(fetched.name, "alice");
    assert!(repo.get_by_hash("hash-nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn list_users_by_ids() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db.clone());
    let alice = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;
    create_user(&db, "carol").await;

    let users = repo.list_by_ids(&[alice.id, bob.id]).await.unwrap();
    let mut names: Vec<_> = users.into_iter().map(|u| u.name).collect();
    names.sort();
    assert_eq!(names, vec!["alice", "bob"]);

    assert!(repo.list_by_ids(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn deleted_user_is_invisible() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db.clone());
    let alice = create_user(&db, "alice").await;

    repo.soft_delete(alice.id).await.unwrap();
    assert!(repo.get_by_id(alice.id).await.unwrap().is_none());
    assert!(repo.get_by_hash("hash-alice").await.unwrap().is_none());
}

#[tokio::test]
async fn soft_deleted_user_hash_can_be_reused() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db.clone());
    let alice = create_user(&db, "alice").await;

    let err = repo
        .create(CreateUser {
            name: "alice-again".into(),
            user_hash: "hash-alice".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, GuldanError::AlreadyExists { .. }), "{err:?}");

    repo.soft_delete(alice.id).await.unwrap();
    let again = create_user(&db, "alice").await;
    assert_ne!(again.id, alice.id);
    assert_eq!(repo.get_by_hash("hash-alice").await.unwrap().unwrap().id, again.id);
}

// -----------------------------------------------------------------------
// Organizations
// -----------------------------------------------------------------------

#[tokio::test]
async fn create_and_get_organization() {
    let db = setup().await;
    let repo = SurrealOrganizationRepository::new(db);

    let org = repo
        .create(CreateOrganization {
            name: "acme".into(),
            visibility: Visibility::Private,
        })
        .await
        .unwrap();
    assert_eq!(org.name, "acme");
    assert_eq!(org.visibility, Visibility::Private);

    let fetched = repo.get_by_id(org.id).await.unwrap().unwrap();
    assert_eq!(fetched.id, org.id);
    let by_name = repo.get_by_name("acme").await.unwrap().unwrap();
    assert_eq!(by_name.id, org.id);

    assert!(repo.get_by_id(Uuid::new_v4()).await.unwrap().is_none());
    assert!(repo.get_by_name("globex").await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_organization_name_is_rejected() {
    let db = setup().await;
    let repo = SurrealOrganizationRepository::new(db);
    let input = CreateOrganization {
        name: "acme".into(),
        visibility: Visibility::Public,
    };

    repo.create(input.clone()).await.unwrap();
    let err = repo.create(input).await.unwrap_err();
    assert!(matches!(err, GuldanError::AlreadyExists { .. }), "{err:?}");
}

#[tokio::test]
async fn names_resembling_internal_markers_still_report_duplicates() {
    let db = setup().await;
    let orgs = SurrealOrganizationRepository::new(db.clone());
    let projects = SurrealProjectRepository::new(db);

    for name in ["guldan:guard_failed", "guldan:missing:user", "conflict-co"] {
        let input = CreateOrganization {
            name: name.into(),
            visibility: Visibility::Private,
        };
        let org = orgs.create(input.clone()).await.unwrap();
        let err = orgs.create(input).await.unwrap_err();
        assert!(
            matches!(err, GuldanError::AlreadyExists { ref entity } if entity == "organization"),
            "{name}: {err:?}"
        );

        let project = CreateProject {
            parent_id: org.id,
            name: name.into(),
            qualified_name: format!("{name}.{name}"),
            visibility: Visibility::Private,
        };
        projects.create(project.clone()).await.unwrap();
        let err = projects.create(project).await.unwrap_err();
        assert!(
            matches!(err, GuldanError::AlreadyExists { ref entity } if entity == "project"),
            "{name}: {err:?}"
        );
    }
}

#[tokio::test]
async fn soft_deleted_name_can_be_reused() {
    let db = setup().await;
    let repo = SurrealOrganizationRepository::new(db);
    let input = CreateOrganization {
        name: "acme".into(),
        visibility: Visibility::Public,
    };

    let first = repo.create(input.clone()).await.unwrap();
    repo.soft_delete(first.id).await.unwrap();
    assert!(repo.get_by_id(first.id).await.unwrap().is_none());
    assert!(repo.get_by_name("acme").await.unwrap().is_none());

    let second = repo.create(input).await.unwrap();
    assert_ne!(second.id, first.id);
    assert_eq!(repo.get_by_name("acme").await.unwrap().unwrap().id, second.id);
}

#[tokio::test]
async fn set_visibility_on_missing_org_is_not_found() {
    let db = setup().await;
    let repo = SurrealOrganizationRepository::new(db);

    let err = repo
        .set_visibility(Uuid::new_v4(), Visibility::Public)
        .await
        .unwrap_err();
    assert!(matches!(err, GuldanError::NotFound { .. }), "{err:?}");
}

#[tokio::test]
async fn list_organizations_by_names() {
    let db = setup().await;
    let repo = SurrealOrganizationRepository::new(db);
    for name in ["acme", "globex", "initech"] {
        repo.create(CreateOrganization {
            name: name.into(),
            visibility: Visibility::Public,
        })
        .await
        .unwrap();
    }

    let orgs = repo
        .list_by_names(&["acme".into(), "initech".into(), "missing".into()])
        .await
        .unwrap();
    let mut names: Vec<_> = orgs.into_iter().map(|o| o.name).collect();
    names.sort();
    assert_eq!(names, vec!["acme", "initech"]);

    assert!(repo.list_by_names(&[]).await.unwrap().is_empty());
}

// -----------------------------------------------------------------------
// Projects
// -----------------------------------------------------------------------

#[tokio::test]
async fn project_names_are_scoped_by_parent() {
    let db = setup().await;
    let repo = SurrealProjectRepository::new(db);
    let acme = Uuid::new_v4();
    let globex = Uuid::new_v4();

    let web = repo
        .create(CreateProject {
            parent_id: acme,
            name: "web".into(),
            qualified_name: "acme.web".into(),
            visibility: Visibility::Private,
        })
        .await
        .unwrap();
    assert_eq!(web.qualified_name, "acme.web");

    // Same short name under another parent is fine.
    repo.create(CreateProject {
        parent_id: globex,
        name: "web".into(),
        qualified_name: "globex.web".into(),
        visibility: Visibility::Public,
    })
    .await
    .unwrap();

    let err = repo
        .create(CreateProject {
            parent_id: acme,
            name: "web".into(),
            qualified_name: "acme.web".into(),
            visibility: Visibility::Public,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, GuldanError::AlreadyExists { .. }), "{err:?}");

    let fetched = repo.get_by_name(acme, "web").await.unwrap().unwrap();
    assert_eq!(fetched.id, web.id);
    assert_eq!(repo.list_children(acme).await.unwrap().len(), 1);

    let by_qualified = repo
        .list_by_names(&["acme.web".into(), "globex.web".into()])
        .await
        .unwrap();
    assert_eq!(by_qualified.len(), 2);
    assert!(repo.list_by_names(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn project_visibility_update() {
    let db = setup().await;
    let repo = SurrealProjectRepository::new(db);
    let project = repo
        .create(CreateProject {
            parent_id: Uuid::new_v4(),
            name: "api".into(),
            qualified_name: "acme.api".into(),
            visibility: Visibility::Private,
        })
        .await
        .unwrap();

    let updated = repo
        .set_visibility(project.id, Visibility::Public)
        .await
        .unwrap();
    assert_eq!(updated.visibility, Visibility::Public);

    repo.soft_delete(project.id).await.unwrap();
    assert!(repo.get_by_id(project.id).await.unwrap().is_none());
}

// -----------------------------------------------------------------------
// Privileges
// -----------------------------------------------------------------------

#[tokio::test]
async fn second_active_grant_for_same_key_is_rejected() {
    let db = setup().await;
    let repo = SurrealPrivilegeRepository::new(db.clone());
    let alice = create_user(&db, "alice").await;
    let org_id = Uuid::new_v4();

    repo.insert(org_grant(&alice, org_id, "acme", PrivilegeLevel::Viewer))
        .await
        .unwrap();
    let err = repo
        .insert(org_grant(&alice, org_id, "acme", PrivilegeLevel::Modifier))
        .await
        .unwrap_err();
    assert!(matches!(err, GuldanError::AlreadyExists { .. }), "{err:?}");
}

#[tokio::test]
async fn insert_if_absent_keeps_existing_grant() {
    let db = setup().await;
    let repo = SurrealPrivilegeRepository::new(db.clone());
    let alice = create_user(&db, "alice").await;
    let org_id = Uuid::new_v4();

    let first = repo
        .insert_if_absent(org_grant(&alice, org_id, "acme", PrivilegeLevel::Viewer))
        .await
        .unwrap();
    let second = repo
        .insert_if_absent(org_grant(&alice, org_id, "acme", PrivilegeLevel::Modifier))
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.level, PrivilegeLevel::Viewer);
    assert_eq!(
        repo.find_all_for_resource(org_id, ResourceType::Org)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn update_changes_level_in_place() {
    let db = setup().await;
    let repo = SurrealPrivilegeRepository::new(db.clone());
    let alice = create_user(&db, "alice").await;
    let org_id = Uuid::new_v4();

    let grant = repo
        .insert(org_grant(&alice, org_id, "acme", PrivilegeLevel::Puller))
        .await
        .unwrap();
    let updated = repo
        .update(&alice.user_hash, org_id, ResourceType::Org, PrivilegeLevel::Modifier)
        .await
        .unwrap();
    assert_eq!(updated.id, grant.id);
    assert_eq!(updated.level, PrivilegeLevel::Modifier);

    let err = repo
        .update(&alice.user_hash, Uuid::new_v4(), ResourceType::Org, PrivilegeLevel::Viewer)
        .await
        .unwrap_err();
    assert!(matches!(err, GuldanError::NotFound { .. }), "{err:?}");
}

#[tokio::test]
async fn revoked_grant_can_be_granted_again() {
    let db = setup().await;
    let repo = SurrealPrivilegeRepository::new(db.clone());
    let alice = create_user(&db, "alice").await;
    let org_id = Uuid::new_v4();

    repo.insert(org_grant(&alice, org_id, "acme", PrivilegeLevel::Viewer))
        .await
        .unwrap();
    repo.soft_delete_for_user(&alice.user_hash, org_id, ResourceType::Org)
        .await
        .unwrap();
    assert!(repo
        .find(&alice.user_hash, org_id, ResourceType::Org)
        .await
        .unwrap()
        .is_none());

    repo.insert(org_grant(&alice, org_id, "acme", PrivilegeLevel::Modifier))
        .await
        .unwrap();
    let found = repo
        .find(&alice.user_hash, org_id, ResourceType::Org)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.level, PrivilegeLevel::Modifier);
}

#[tokio::test]
async fn soft_delete_removes_every_grant_on_resource() {
    let db = setup().await;
    let repo = SurrealPrivilegeRepository::new(db.clone());
    let alice = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;
    let org_id = Uuid::new_v4();

    for user in [&alice, &bob] {
        repo.insert(org_grant(user, org_id, "acme", PrivilegeLevel::Viewer))
            .await
            .unwrap();
    }
    repo.soft_delete(org_id, ResourceType::Org).await.unwrap();
    assert!(repo
        .find_all_for_resource(org_id, ResourceType::Org)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn prefix_lookup_is_literal() {
    let db = setup().await;
    let repo = SurrealPrivilegeRepository::new(db.clone());
    let alice = create_user(&db, "alice").await;

    for name in ["acme.web", "acme.api", "acmecorp.web", "a%me.web"] {
        repo.insert(CreateGrant {
            resource_id: Uuid::new_v4(),
            resource_name: name.into(),
            resource_type: ResourceType::Project,
            resource_visibility: Visibility::Private,
            user_id: alice.id,
            user_hash: alice.user_hash.clone(),
            level: PrivilegeLevel::Viewer,
        })
        .await
        .unwrap();
    }

    let mut names: Vec<_> = repo
        .find_by_name_prefix(&alice.user_hash, "acme.")
        .await
        .unwrap()
        .into_iter()
        .map(|g| g.resource_name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["acme.api", "acme.web"]);

    let wildcard = repo
        .find_by_name_prefix(&alice.user_hash, "a%")
        .await
        .unwrap();
    assert_eq!(wildcard.len(), 1);
    assert_eq!(wildcard[0].resource_name, "a%me.web");
}

#[tokio::test]
async fn find_all_for_user_filters_types_and_levels() {
    let db = setup().await;
    let repo = SurrealPrivilegeRepository::new(db.clone());
    let alice = create_user(&db, "alice").await;

    repo.insert(org_grant(&alice, Uuid::new_v4(), "acme", PrivilegeLevel::Modifier))
        .await
        .unwrap();
    repo.insert(org_grant(&alice, Uuid::new_v4(), "globex", PrivilegeLevel::Puller))
        .await
        .unwrap();

    let grants = repo
        .find_all_for_user(
            &alice.user_hash,
            &ResourceType::ALL,
            &[PrivilegeLevel::Viewer, PrivilegeLevel::Modifier],
        )
        .await
        .unwrap();
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].resource_name, "acme");

    assert!(repo
        .find_all_for_user(&alice.user_hash, &[], &[PrivilegeLevel::Viewer])
        .await
        .unwrap()
        .is_empty());
    assert!(repo
        .find_all_for_user(&alice.user_hash, &ResourceType::ALL, &[])
        .await
        .unwrap()
        .is_empty());
}
