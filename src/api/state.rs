//! Application state - Dependency injection container.
//!
//! Handlers see services and infrastructure only through traits, so a router
//! can be built over mocks in tests.

use std::sync::Arc;

use crate::config::Config;
use crate::infra::{Cache, Database, HealthProbe, PermissionCache, RateLimiter};
use crate::services::{
    AuthService, OrganizationService, RoleService, ServiceContainer, Services,
    SystemVariableService, UserService,
};

/// Application state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<dyn ServiceContainer>,
    /// Request counters for the rate limiting middleware
    pub rate_limiter: Arc<dyn RateLimiter>,
    /// Database connectivity check
    pub database: Arc<dyn HealthProbe>,
    /// Redis connectivity check
    pub cache: Arc<dyn HealthProbe>,
}

impl AppState {
    /// Wire the production services over a database and a Redis cache.
    pub fn from_config(database: Arc<Database>, cache: Arc<Cache>, config: Config) -> Self {
        let permission_cache: Arc<dyn PermissionCache> = cache.clone();
        let services = Services::from_connection(database.get_connection(), permission_cache, config);

        Self {
            services: Arc::new(services),
            rate_limiter: cache.clone(),
            database,
            cache,
        }
    }

    pub fn new(
        services: Arc<dyn ServiceContainer>,
        rate_limiter: Arc<dyn RateLimiter>,
        database: Arc<dyn HealthProbe>,
        cache: Arc<dyn HealthProbe>,
    ) -> Self {
        Self {
            services,
            rate_limiter,
            database,
            cache,
        }
    }

    pub fn auth(&self) -> Arc<dyn AuthService> {
        self.services.auth()
    }

    pub fn organizations(&self) -> Arc<dyn OrganizationService> {
        self.services.organizations()
    }

    pub fn roles(&self) -> Arc<dyn RoleService> {
        self.services.roles()
    }

    pub fn users(&self) -> Arc<dyn UserService> {
        self.services.users()
    }

    pub fn system_variables(&self) -> Arc<dyn SystemVariableService> {
        self.services.system_variables()
    }
}
