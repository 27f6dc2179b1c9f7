//! SurrealDB store implementations.

mod organization;
mod privilege;
mod project;
mod store;
mod unit_of_work;
mod user;

pub use organization::SurrealOrganizationRepository;
pub use privilege::SurrealPrivilegeRepository;
pub use project::SurrealProjectRepository;
pub use store::SurrealStore;
pub use unit_of_work::SurrealUnitOfWork;
pub use user::SurrealUserRepository;

use guldan_core::models::visibility::Visibility;
use surrealdb::{Connection, Surreal};
use uuid::Uuid;

use crate::error::{DbError, classify_all};

/// Named string parameters bound to a statement.
pub(crate) type Binds = Vec<(&'static str, String)>;

/// SurrealQL expression that replaces a row's uniqueness key on soft
/// delete. Unique per row, so any number of deleted rows can coexist with
/// one active row holding the real key.
pub(crate) const TOMBSTONE: &str = "string::concat('~deleted:', meta::id(id))";

pub(crate) fn parse_uuid(value: &str, what: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::Decode(format!("invalid {what} UUID: {e}")))
}

pub(crate) fn parse_visibility(value: &str) -> Result<Visibility, DbError> {
    Visibility::parse(value).ok_or_else(|| DbError::Decode(format!("unknown visibility: {value}")))
}

pub(crate) fn render_transaction(statements: &[String]) -> String {
    let mut sql = String::from("BEGIN TRANSACTION;\n");
    for statement in statements {
        sql.push_str(statement);
        sql.push_str(";\n");
    }
    sql.push_str("COMMIT TRANSACTION;");
    sql
}

/// Runs `statements` inside one transaction.
///
/// `entity` names what a unique-index violation refers to; `subject` is
/// the id reported if a required row turns out to be missing.
pub(crate) async fn execute_transaction<C: Connection>(
    db: &Surreal<C>,
    statements: &[String],
    binds: Binds,
    entity: &str,
    subject: &str,
) -> Result<(), DbError> {
    let mut builder = db.query(render_transaction(statements));
    for bind in binds {
        builder = builder.bind(bind);
    }

    let mut response = builder
        .await
        .map_err(|e| DbError::classify(e, entity, subject))?;
    match classify_all(response.take_errors(), entity, subject) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
