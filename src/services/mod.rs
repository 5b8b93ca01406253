//! Application services layer - Use cases and business logic.
//!
//! Services orchestrate domain rules and repositories. All of them reach the
//! database through the Unit of Work, and every tenant-scoped operation takes
//! the [`Caller`] it runs on behalf of.

mod auth_service;
pub mod container;
mod organization_service;
mod role_service;
mod system_variable_service;
mod user_service;

use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use domain::SYSTEM_ORGANIZATION_ID;

// Service Container
pub use container::{ServiceContainer, Services};

// Service traits and implementations
pub use auth_service::{AuthService, Authenticator, Claims, TokenResponse};
pub use organization_service::{OrganizationManager, OrganizationService};
pub use role_service::{RoleManager, RoleService};
pub use system_variable_service::{
    NewGroup, NewVariable, SystemVariableManager, SystemVariableService,
};
pub use user_service::{NewUser, UserManager, UserService, UserUpdate};

#[cfg(any(test, feature = "test-utils"))]
pub use auth_service::MockAuthService;
#[cfg(any(test, feature = "test-utils"))]
pub use container::MockServiceContainer;
#[cfg(any(test, feature = "test-utils"))]
pub use organization_service::MockOrganizationService;
#[cfg(any(test, feature = "test-utils"))]
pub use role_service::MockRoleService;
#[cfg(any(test, feature = "test-utils"))]
pub use system_variable_service::MockSystemVariableService;
#[cfg(any(test, feature = "test-utils"))]
pub use user_service::MockUserService;

/// The authenticated user a service call acts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    pub organization_id: Uuid,
}

impl Caller {
    pub fn new(user_id: Uuid, organization_id: Uuid) -> Self {
        Self {
            user_id,
            organization_id,
        }
    }

    /// Members of the SYSTEM organization administer every tenant.
    pub fn is_system(&self) -> bool {
        self.organization_id == SYSTEM_ORGANIZATION_ID
    }

    pub fn can_access(&self, organization_id: Uuid) -> bool {
        self.is_system() || self.organization_id == organization_id
    }

    /// Organization a request acts on: the requested one when the caller may
    /// reach it, otherwise the caller's own.
    pub fn scope(&self, requested: Option<Uuid>) -> AppResult<Uuid> {
        match requested {
            Some(id) if self.can_access(id) => Ok(id),
            Some(_) => Err(AppError::forbidden("access to another organization")),
            None => Ok(self.organization_id),
        }
    }

    /// Hide records of other tenants behind a not-found error.
    pub(crate) fn ensure_visible(&self, organization_id: Uuid, entity: &str) -> AppResult<()> {
        if self.can_access(organization_id) {
            Ok(())
        } else {
            Err(AppError::not_found(entity))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_caller_is_confined_to_own_organization() {
        let own = Uuid::new_v4();
        let caller = Caller::new(Uuid::new_v4(), own);

        assert!(!caller.is_system());
        assert_eq!(caller.scope(None).unwrap(), own);
        assert_eq!(caller.scope(Some(own)).unwrap(), own);
        assert!(matches!(
            caller.scope(Some(Uuid::new_v4())),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            caller.ensure_visible(Uuid::new_v4(), "Role"),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn system_caller_reaches_every_organization() {
        let caller = Caller::new(Uuid::new_v4(), SYSTEM_ORGANIZATION_ID);
        let other = Uuid::new_v4();

        assert!(caller.is_system());
        assert_eq!(caller.scope(Some(other)).unwrap(), other);
        assert!(caller.ensure_visible(other, "Role").is_ok());
    }
}
