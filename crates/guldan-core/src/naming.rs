//! Hierarchical resource naming.
//!
//! An organization's resource name is its own name; a project's is
//! `"<org>.<project>"`. The dot is reserved as the separator, and the
//! qualified name is the join key for "grants below this organization"
//! queries.

use thiserror::Error;

/// Upper bound (exclusive) on organization and project name length.
pub const MAX_RESOURCE_NAME_LENGTH: usize = 85;

pub const SEPARATOR: char = '.';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("name must not be empty")]
    Empty,

    #[error("name is {len} characters, the limit is {max}")]
    TooLong { len: usize, max: usize },

    #[error("name must not contain the reserved separator '.'")]
    ReservedSeparator,
}

/// Checks a single name segment against `max_len` (exclusive).
pub fn validate_name(name: &str, max_len: usize) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    let len = name.chars().count();
    if len >= max_len {
        return Err(NameError::TooLong { len, max: max_len });
    }
    if name.contains(SEPARATOR) {
        return Err(NameError::ReservedSeparator);
    }
    Ok(())
}

pub fn qualified_name(org: &str, project: &str) -> String {
    format!("{org}{SEPARATOR}{project}")
}

/// Prefix shared by every resource name below `org`.
pub fn org_prefix(org: &str) -> String {
    format!("{org}{SEPARATOR}")
}

/// First segment of a resource name, i.e. the owning organization.
pub fn organization_of(resource_name: &str) -> &str {
    resource_name
        .split(SEPARATOR)
        .next()
        .unwrap_or(resource_name)
}

/// Returns the part of `resource_name` below `org`, if it lives there.
pub fn strip_org_prefix<'a>(resource_name: &'a str, org: &str) -> Option<&'a str> {
    resource_name
        .strip_prefix(org)
        .and_then(|rest| rest.strip_prefix(SEPARATOR))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_name_joins_with_dot() {
        assert_eq!(qualified_name("acme", "web"), "acme.web");
        assert_eq!(org_prefix("acme"), "acme.");
    }

    #[test]
    fn organization_of_takes_first_segment() {
        assert_eq!(organization_of("acme.web"), "acme");
        assert_eq!(organization_of("acme"), "acme");
    }

    #[test]
    fn strip_prefix_requires_separator() {
        assert_eq!(strip_org_prefix("acme.web", "acme"), Some("web"));
        assert_eq!(strip_org_prefix("acmecorp.web", "acme"), None);
        assert_eq!(strip_org_prefix("acme", "acme"), None);
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let accented = "é".repeat(60);
        assert_eq!(accented.len(), 120);
        assert_eq!(validate_name(&accented, MAX_RESOURCE_NAME_LENGTH), Ok(()));
        assert_eq!(
            validate_name(&"é".repeat(MAX_RESOURCE_NAME_LENGTH), MAX_RESOURCE_NAME_LENGTH),
            Err(NameError::TooLong {
                len: MAX_RESOURCE_NAME_LENGTH,
                max: MAX_RESOURCE_NAME_LENGTH,
            })
        );
    }

    #[test]
    fn validate_rejects_long_names() {
        let ok = "a".repeat(MAX_RESOURCE_NAME_LENGTH - 1);
        let too_long = "a".repeat(MAX_RESOURCE_NAME_LENGTH);
        assert_eq!(validate_name(&ok, MAX_RESOURCE_NAME_LENGTH), Ok(()));
        assert_eq!(
            validate_name(&too_long, MAX_RESOURCE_NAME_LENGTH),
            Err(NameError::TooLong {
                len: MAX_RESOURCE_NAME_LENGTH,
                max: MAX_RESOURCE_NAME_LENGTH
            })
        );
    }

    #[test]
    fn validate_rejects_empty_and_dotted_names() {
        assert_eq!(validate_name("", 85), Err(NameError::Empty));
        assert_eq!(
            validate_name("acme.web", 85),
            Err(NameError::ReservedSeparator)
        );
    }
}
