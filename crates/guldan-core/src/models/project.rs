//! Project domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::visibility::Visibility;

/// A project scoped under exactly one organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub parent_id: Uuid,
    /// Short name, unique among the parent's active projects.
    pub name: String,
    /// `"<org>.<project>"`, fixed at creation. This is the resource name
    /// stored on grants and matched by prefix queries.
    pub qualified_name: String,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProject {
    pub parent_id: Uuid,
    pub name: String,
    pub qualified_name: String,
    pub visibility: Visibility,
}
