//! Infrastructure layer - External systems integration
//!
//! - Database connection, migrations and repositories (PostgreSQL)
//! - Redis cache for rate limiting and permission sets
//! - Health probes for both backing services
//! - Unit of Work for transaction management

pub mod cache;
pub mod db;
pub mod health;
pub mod repositories;
pub mod unit_of_work;

pub use cache::{Cache, PermissionCache, RateLimiter};
pub use db::{Database, Migrator};
pub use health::HealthProbe;
pub use repositories::{
    GroupChanges, NewGroupRecord, NewUserRecord, NewVariableRecord, OrganizationRepository,
    RoleRepository, SystemVariableRepository, UserChanges, UserRepository, VariableChanges,
};
pub use unit_of_work::{Persistence, TransactionContext, UnitOfWork};

#[cfg(any(test, feature = "test-utils"))]
pub use cache::{MockPermissionCache, MockRateLimiter};
#[cfg(any(test, feature = "test-utils"))]
pub use health::MockHealthProbe;
#[cfg(any(test, feature = "test-utils"))]
pub use repositories::{
    MockOrganizationRepository, MockRoleRepository, MockSystemVariableRepository, MockUserRepository,
};
