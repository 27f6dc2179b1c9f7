//! The store bundle handed to the access service.

use guldan_core::repository::Store;
use surrealdb::{Connection, Surreal};

use super::{
    SurrealOrganizationRepository, SurrealPrivilegeRepository, SurrealProjectRepository,
    SurrealUnitOfWork, SurrealUserRepository,
};

/// Every SurrealDB store over one shared client.
#[derive(Clone)]
pub struct SurrealStore<C: Connection> {
    users: SurrealUserRepository<C>,
    organizations: SurrealOrganizationRepository<C>,
    projects: SurrealProjectRepository<C>,
    privileges: SurrealPrivilegeRepository<C>,
    unit_of_work: SurrealUnitOfWork<C>,
}

impl<C: Connection> SurrealStore<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            users: SurrealUserRepository::new(db.clone()),
            organizations: SurrealOrganizationRepository::new(db.clone()),
            projects: SurrealProjectRepository::new(db.clone()),
            privileges: SurrealPrivilegeRepository::new(db.clone()),
            unit_of_work: SurrealUnitOfWork::new(db),
        }
    }
}

impl<C: Connection> Store for SurrealStore<C> {
    type Users = SurrealUserRepository<C>;
    type Organizations = SurrealOrganizationRepository<C>;
    type Projects = SurrealProjectRepository<C>;
    type Privileges = SurrealPrivilegeRepository<C>;
    type Work = SurrealUnitOfWork<C>;

    fn users(&self) -> &Self::Users {
        &self.users
    }

    fn organizations(&self) -> &Self::Organizations {
        &self.organizations
    }

    fn projects(&self) -> &Self::Projects {
        &self.projects
    }

    fn privileges(&self) -> &Self::Privileges {
        &self.privileges
    }

    fn unit_of_work(&self) -> &Self::Work {
        &self.unit_of_work
    }
}
