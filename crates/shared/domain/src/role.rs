//! Roles group permissions and are assigned to users of the same organization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::MAX_ROLE_NAME_LENGTH;
use crate::error::{DomainError, DomainResult};
use crate::permission::permissions;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Role {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Built-in roles cannot be edited or deleted.
    pub is_system: bool,
    pub permissions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    pub fn ensure_mutable(&self) -> DomainResult<()> {
        if self.is_system {
            return Err(DomainError::validation("System roles cannot be modified"));
        }
        Ok(())
    }
}

/// Compact role reference embedded in user payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RoleRef {
    pub id: Uuid,
    pub name: String,
}

pub fn validate_role_name(name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("Role name is required"));
    }
    if name.chars().count() > MAX_ROLE_NAME_LENGTH {
        return Err(DomainError::validation(format!(
            "Role name must be at most {} characters",
            MAX_ROLE_NAME_LENGTH
        )));
    }
    Ok(name.to_string())
}

/// Deduplicate permission codes and reject anything outside the catalogue.
pub fn normalize_permission_codes(codes: &[String]) -> DomainResult<Vec<String>> {
    let mut normalized: Vec<String> = Vec::with_capacity(codes.len());
    for code in codes {
        let code = code.trim();
        if !permissions::is_known(code) {
            return Err(DomainError::validation(format!(
                "Unknown permission '{}'",
                code
            )));
        }
        if !normalized.iter().any(|c| c == code) {
            normalized.push(code.to_string());
        }
    }
    normalized.sort();
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_name_rules() {
        assert_eq!(validate_role_name("  Accountant ").unwrap(), "Accountant");
        assert!(validate_role_name("").is_err());
        assert!(validate_role_name(&"r".repeat(101)).is_err());
    }

    #[test]
    fn permission_codes_are_deduplicated_and_sorted() {
        let codes = vec![
            "users.read".to_string(),
            "roles.read".to_string(),
            "users.read".to_string(),
        ];
        assert_eq!(
            normalize_permission_codes(&codes).unwrap(),
            vec!["roles.read".to_string(), "users.read".to_string()]
        );
    }

    #[test]
    fn resource_wildcard_can_be_granted() {
        let codes = vec!["users.*".to_string(), "users.read".to_string()];
        assert_eq!(
            normalize_permission_codes(&codes).unwrap(),
            vec!["users.*".to_string(), "users.read".to_string()]
        );
    }

    #[test]
    fn unknown_permission_is_rejected() {
        let codes = vec!["users.fly".to_string()];
        assert!(matches!(
            normalize_permission_codes(&codes),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn system_role_is_immutable() {
        let role = Role {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            name: "Super Admin".to_string(),
            description: None,
            is_system: true,
            permissions: vec!["*".to_string()],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(role.ensure_mutable().is_err());
    }
}
