//! Domain-level constants.
//!
//! These constants define business rules and validation requirements.

use uuid::Uuid;

// =============================================================================
// Tenancy
// =============================================================================

/// Well-known id of the built-in SYSTEM organization (seeded by migration)
pub const SYSTEM_ORGANIZATION_ID: Uuid = Uuid::from_u128(1);

/// Well-known id of the built-in Super Admin role (seeded by migration)
pub const SUPER_ADMIN_ROLE_ID: Uuid = Uuid::from_u128(2);

/// Organization name reserved for the built-in tenant
pub const RESERVED_ORGANIZATION_NAME: &str = "SYSTEM";

/// Maximum organization name length
pub const MAX_ORGANIZATION_NAME_LENGTH: usize = 100;

/// Organization code length bounds
pub const MIN_ORGANIZATION_CODE_LENGTH: usize = 2;
pub const MAX_ORGANIZATION_CODE_LENGTH: usize = 32;

/// Maximum role name length
pub const MAX_ROLE_NAME_LENGTH: usize = 100;

// =============================================================================
// Validation
// =============================================================================

/// Minimum password length requirement
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Minimum name length requirement
pub const MIN_NAME_LENGTH: usize = 1;

/// Maximum system variable key length
pub const MAX_VARIABLE_KEY_LENGTH: usize = 100;

// =============================================================================
// Incremental numbering
// =============================================================================

/// Largest zero-padding width accepted for generated codes
pub const MAX_PADDING: u32 = 20;

/// Default zero-padding width for new incremental variables
pub const DEFAULT_PADDING: u32 = 5;

/// Maximum prefix/suffix template length
pub const MAX_AFFIX_LENGTH: usize = 50;

/// Date tokens accepted in prefix and suffix templates
pub const TOKEN_YEAR_FULL: &str = "{YYYY}";
pub const TOKEN_YEAR_SHORT: &str = "{YY}";
pub const TOKEN_MONTH: &str = "{MM}";
pub const TOKEN_DAY: &str = "{DD}";
