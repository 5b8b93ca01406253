//! Organization (tenant) entity and its naming rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{
    MAX_ORGANIZATION_CODE_LENGTH, MAX_ORGANIZATION_NAME_LENGTH, MIN_ORGANIZATION_CODE_LENGTH,
    RESERVED_ORGANIZATION_NAME, SYSTEM_ORGANIZATION_ID,
};
use crate::error::{DomainError, DomainResult};

/// A tenant. Every role, user and system variable belongs to exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    /// The built-in organization hosting platform administrators.
    pub fn is_system(&self) -> bool {
        self.id == SYSTEM_ORGANIZATION_ID
    }
}

/// Validated input for a new organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrganization {
    pub name: String,
    pub code: String,
    pub description: Option<String>,
}

impl NewOrganization {
    pub fn new(name: &str, code: &str, description: Option<String>) -> DomainResult<Self> {
        Ok(Self {
            name: validate_organization_name(name)?,
            code: normalize_organization_code(code)?,
            description: description.filter(|d| !d.trim().is_empty()),
        })
    }
}

/// Partial update of an organization. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizationChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

impl OrganizationChanges {
    /// Validate the changes against the organization they apply to.
    pub fn validated_for(mut self, current: &Organization) -> DomainResult<Self> {
        if current.is_system() {
            if self.name.is_some() || self.is_active == Some(false) {
                return Err(DomainError::validation(
                    "The SYSTEM organization cannot be renamed or deactivated",
                ));
            }
            return Ok(self);
        }
        if let Some(name) = self.name.take() {
            self.name = Some(validate_organization_name(&name)?);
        }
        Ok(self)
    }
}

/// Trim and check an organization name. `SYSTEM` is reserved in any casing.
pub fn validate_organization_name(name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("Organization name is required"));
    }
    if name.chars().count() > MAX_ORGANIZATION_NAME_LENGTH {
        return Err(DomainError::validation(format!(
            "Organization name must be at most {} characters",
            MAX_ORGANIZATION_NAME_LENGTH
        )));
    }
    if name.eq_ignore_ascii_case(RESERVED_ORGANIZATION_NAME) {
        return Err(DomainError::validation(format!(
            "Organization name '{}' is reserved",
            RESERVED_ORGANIZATION_NAME
        )));
    }
    Ok(name.to_string())
}

/// Check an organization code and return its canonical upper-case form.
pub fn normalize_organization_code(code: &str) -> DomainResult<String> {
    let code = code.trim();
    let length = code.chars().count();
    if !(MIN_ORGANIZATION_CODE_LENGTH..=MAX_ORGANIZATION_CODE_LENGTH).contains(&length) {
        return Err(DomainError::validation(format!(
            "Organization code must be {} to {} characters",
            MIN_ORGANIZATION_CODE_LENGTH, MAX_ORGANIZATION_CODE_LENGTH
        )));
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(DomainError::validation(
            "Organization code may only contain letters, digits, '_' and '-'",
        ));
    }
    let code = code.to_ascii_uppercase();
    if code == RESERVED_ORGANIZATION_NAME {
        return Err(DomainError::validation(format!(
            "Organization code '{}' is reserved",
            RESERVED_ORGANIZATION_NAME
        )));
    }
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn organization(id: Uuid) -> Organization {
        Organization {
            id,
            name: "Acme".to_string(),
            code: "ACME".to_string(),
            description: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn rejects_reserved_name_in_any_casing() {
        for name in ["SYSTEM", "system", "  System  "] {
            assert!(validate_organization_name(name).is_err(), "{name}");
        }
        assert_eq!(validate_organization_name("  Systems Ltd ").unwrap(), "Systems Ltd");
    }

    #[test]
    fn rejects_empty_and_overlong_names() {
        assert!(validate_organization_name("   ").is_err());
        assert!(validate_organization_name(&"a".repeat(101)).is_err());
        assert!(validate_organization_name(&"a".repeat(100)).is_ok());
    }

    #[test]
    fn normalizes_codes() {
        assert_eq!(normalize_organization_code(" acme-eu ").unwrap(), "ACME-EU");
        assert!(normalize_organization_code("a").is_err());
        assert!(normalize_organization_code("has space").is_err());
        assert!(normalize_organization_code("system").is_err());
    }

    #[test]
    fn new_organization_drops_blank_description() {
        let org = NewOrganization::new("Acme", "acme", Some("  ".to_string())).unwrap();
        assert_eq!(org.code, "ACME");
        assert_eq!(org.description, None);
    }

    #[test]
    fn system_organization_cannot_be_renamed_or_deactivated() {
        let system = organization(SYSTEM_ORGANIZATION_ID);
        let rename = OrganizationChanges {
            name: Some("Other".to_string()),
            ..Default::default()
        };
        assert!(rename.validated_for(&system).is_err());

        let deactivate = OrganizationChanges {
            is_active: Some(false),
            ..Default::default()
        };
        assert!(deactivate.validated_for(&system).is_err());

        let describe = OrganizationChanges {
            description: Some("Platform operators".to_string()),
            ..Default::default()
        };
        assert!(describe.validated_for(&system).is_ok());
    }

    #[test]
    fn regular_organization_cannot_take_reserved_name() {
        let org = organization(Uuid::new_v4());
        let changes = OrganizationChanges {
            name: Some("system".to_string()),
            ..Default::default()
        };
        assert!(changes.validated_for(&org).is_err());
    }
}
