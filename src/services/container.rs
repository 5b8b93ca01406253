//! Service Container - centralized service access.

use std::sync::Arc;

use super::{
    AuthService, Authenticator, OrganizationManager, OrganizationService, RoleManager, RoleService,
    SystemVariableManager, SystemVariableService, UserManager, UserService,
};
use crate::config::Config;
use crate::infra::{PermissionCache, Persistence};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Service container trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
pub trait ServiceContainer: Send + Sync {
    fn auth(&self) -> Arc<dyn AuthService>;

    fn organizations(&self) -> Arc<dyn OrganizationService>;

    fn roles(&self) -> Arc<dyn RoleService>;

    fn users(&self) -> Arc<dyn UserService>;

    fn system_variables(&self) -> Arc<dyn SystemVariableService>;
}

/// Concrete implementation of ServiceContainer
#[derive(Clone)]
pub struct Services {
    auth_service: Arc<dyn AuthService>,
    organization_service: Arc<dyn OrganizationService>,
    role_service: Arc<dyn RoleService>,
    user_service: Arc<dyn UserService>,
    system_variable_service: Arc<dyn SystemVariableService>,
}

impl Services {
    pub fn new(
        auth_service: Arc<dyn AuthService>,
        organization_service: Arc<dyn OrganizationService>,
        role_service: Arc<dyn RoleService>,
        user_service: Arc<dyn UserService>,
        system_variable_service: Arc<dyn SystemVariableService>,
    ) -> Self {
        Self {
            auth_service,
            organization_service,
            role_service,
            user_service,
            system_variable_service,
        }
    }

    /// Wire every service over one database connection and permission cache.
    pub fn from_connection(
        db: sea_orm::DatabaseConnection,
        cache: Arc<dyn PermissionCache>,
        config: Config,
    ) -> Self {
        let uow = Arc::new(Persistence::new(db));

        Self {
            auth_service: Arc::new(Authenticator::new(uow.clone(), cache.clone(), config)),
            organization_service: Arc::new(OrganizationManager::new(uow.clone())),
            role_service: Arc::new(RoleManager::new(uow.clone(), cache.clone())),
            user_service: Arc::new(UserManager::new(uow.clone(), cache)),
            system_variable_service: Arc::new(SystemVariableManager::new(uow)),
        }
    }
}

impl ServiceContainer for Services {
    fn auth(&self) -> Arc<dyn AuthService> {
        self.auth_service.clone()
    }

    fn organizations(&self) -> Arc<dyn OrganizationService> {
        self.organization_service.clone()
    }

    fn roles(&self) -> Arc<dyn RoleService> {
        self.role_service.clone()
    }

    fn users(&self) -> Arc<dyn UserService> {
        self.user_service.clone()
    }

    fn system_variables(&self) -> Arc<dyn SystemVariableService> {
        self.system_variable_service.clone()
    }
}
