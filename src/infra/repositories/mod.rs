//! Repository layer - Data access abstraction
//!
//! One trait per aggregate for the pooled connection, plus crate-visible
//! query functions that the Unit of Work reuses inside transactions.

mod base;
pub(crate) mod entities;
pub(crate) mod organization_repository;
pub(crate) mod role_repository;
pub(crate) mod system_variable_repository;
pub(crate) mod user_repository;

pub use organization_repository::{OrganizationRepository, OrganizationStore};
pub use role_repository::{RoleRepository, RoleStore};
pub use system_variable_repository::{
    GroupChanges, NewGroupRecord, NewVariableRecord, SystemVariableRepository, SystemVariableStore,
    VariableChanges,
};
pub use user_repository::{NewUserRecord, UserChanges, UserRepository, UserStore};

// Export mocks for tests (both unit and integration)
#[cfg(any(test, feature = "test-utils"))]
pub use organization_repository::MockOrganizationRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use role_repository::MockRoleRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use system_variable_repository::MockSystemVariableRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use user_repository::MockUserRepository;
