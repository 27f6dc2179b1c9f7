//! Access service configuration.

use guldan_core::naming::MAX_RESOURCE_NAME_LENGTH;
use serde::Deserialize;

/// Configuration for the access service.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Exclusive upper bound on organization and project name length
    /// (default: 85).
    pub max_name_length: usize,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            max_name_length: MAX_RESOURCE_NAME_LENGTH,
        }
    }
}
