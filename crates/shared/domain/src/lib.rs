//! Domain layer - Core business entities and value objects.
//!
//! This crate contains pure domain logic with no infrastructure dependencies:
//! tenancy rules for organizations, users and roles, the permission model,
//! and the system variable subsystem including incremental document numbering.

pub mod constants;
pub mod error;
pub mod organization;
pub mod password;
pub mod permission;
pub mod role;
pub mod system_variable;
pub mod user;

pub use constants::*;
pub use error::{DomainError, DomainResult};
pub use organization::{
    normalize_organization_code, validate_organization_name, Organization, OrganizationChanges,
    NewOrganization,
};
pub use password::Password;
pub use permission::{permissions, Permission, PermissionSet};
pub use role::{normalize_permission_codes, validate_role_name, Role, RoleRef};
pub use system_variable::{
    expand_tokens, validate_value, validate_variable_key, GeneratedCode, GeneratedNumber,
    IncrementalConfig, IncrementalSettings, ResetFrequency, SystemVariable, SystemVariableGroup,
    ValidationRules, VariableType,
};
pub use user::{normalize_email, validate_user_name, User, UserResponse};
