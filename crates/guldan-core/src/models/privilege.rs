//! Privilege (grant) domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::visibility::Visibility;

/// Kind of resource a grant points at.
///
/// `Item` is reserved: no entity or store backs it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Org,
    Project,
    Item,
}

impl ResourceType {
    pub const ALL: [ResourceType; 3] = [ResourceType::Org, ResourceType::Project, ResourceType::Item];

    /// Numeric wire code.
    pub fn code(self) -> u8 {
        match self {
            ResourceType::Org => 1,
            ResourceType::Project => 2,
            ResourceType::Item => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::Org => "org",
            ResourceType::Project => "project",
            ResourceType::Item => "item",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "org" => Some(ResourceType::Org),
            "project" => Some(ResourceType::Project),
            "item" => Some(ResourceType::Item),
            _ => None,
        }
    }
}

/// Ordered capability: `Puller < Viewer < Modifier`.
///
/// Modify implies view implies pull, so comparisons use the derived `Ord`.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "lowercase")]
pub enum PrivilegeLevel {
    Puller,
    Viewer,
    Modifier,
}

impl PrivilegeLevel {
    pub fn code(self) -> u8 {
        match self {
            PrivilegeLevel::Puller => 0,
            PrivilegeLevel::Viewer => 1,
            PrivilegeLevel::Modifier => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PrivilegeLevel::Puller => "puller",
            PrivilegeLevel::Viewer => "viewer",
            PrivilegeLevel::Modifier => "modifier",
        }
    }

    /// Parses the lowercase names accepted from callers.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "puller" => Some(PrivilegeLevel::Puller),
            "viewer" => Some(PrivilegeLevel::Viewer),
            "modifier" => Some(PrivilegeLevel::Modifier),
            _ => None,
        }
    }

    pub fn can_modify(self) -> bool {
        self >= PrivilegeLevel::Modifier
    }

    pub fn can_view(self) -> bool {
        self >= PrivilegeLevel::Viewer
    }
}

/// A persisted `(user, resource, level)` record.
///
/// Logically keyed by `(user_hash, resource_id, resource_type)`; at most
/// one active grant exists per key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grant {
    pub id: Uuid,
    pub resource_id: Uuid,
    /// `"<org>"` or `"<org>.<project>"`.
    pub resource_name: String,
    pub resource_type: ResourceType,
    /// Resource visibility at the time the grant was written.
    pub resource_visibility: Visibility,
    pub user_id: Uuid,
    pub user_hash: String,
    pub level: PrivilegeLevel,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGrant {
    pub resource_id: Uuid,
    pub resource_name: String,
    pub resource_type: ResourceType,
    pub resource_visibility: Visibility,
    pub user_id: Uuid,
    pub user_hash: String,
    pub level: PrivilegeLevel,
}

/// Key value that identifies the single active grant for a
/// `(user, resource)` pair.
pub fn active_key(user_hash: &str, resource_id: Uuid, resource_type: ResourceType) -> String {
    format!("{user_hash}|{}|{resource_id}", resource_type.as_str())
}
