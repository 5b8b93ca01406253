//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use tenant_admin::errors::{AppError, AppResult};
use tenant_admin::infra::repositories::{
    MockOrganizationRepository, MockRoleRepository, MockSystemVariableRepository,
    MockUserRepository,
};
use tenant_admin::infra::{
    OrganizationRepository, RoleRepository, SystemVariableRepository, TransactionContext,
    UnitOfWork, UserRepository,
};
use domain::{
    IncrementalConfig, IncrementalSettings, Organization, Password, Role, RoleRef, SystemVariable,
    SystemVariableGroup, User, ValidationRules, VariableType,
};

pub const TEST_PASSWORD: &str = "SecurePass123!";

/// Test mock for UnitOfWork that wraps mocked repositories.
///
/// Transactions need a live database, so they fail like a broken connection.
#[derive(Default)]
pub struct TestUnitOfWork {
    pub organizations: MockOrganizationRepository,
    pub roles: MockRoleRepository,
    pub users: MockUserRepository,
    pub system_variables: MockSystemVariableRepository,
}

impl TestUnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(self) -> Arc<BuiltUnitOfWork> {
        Arc::new(BuiltUnitOfWork {
            organizations: Arc::new(self.organizations),
            roles: Arc::new(self.roles),
            users: Arc::new(self.users),
            system_variables: Arc::new(self.system_variables),
        })
    }
}

pub struct BuiltUnitOfWork {
    organizations: Arc<MockOrganizationRepository>,
    roles: Arc<MockRoleRepository>,
    users: Arc<MockUserRepository>,
    system_variables: Arc<MockSystemVariableRepository>,
}

#[async_trait]
impl UnitOfWork for BuiltUnitOfWork {
    fn organizations(&self) -> Arc<dyn OrganizationRepository> {
        self.organizations.clone()
    }

    fn roles(&self) -> Arc<dyn RoleRepository> {
        self.roles.clone()
    }

    fn users(&self) -> Arc<dyn UserRepository> {
        self.users.clone()
    }

    fn system_variables(&self) -> Arc<dyn SystemVariableRepository> {
        self.system_variables.clone()
    }

    async fn transaction<F, T>(&self, _f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> std::pin::Pin<
                Box<dyn std::future::Future<Output = AppResult<T>> + Send + 'a>,
            > + Send,
        T: Send,
    {
        Err(AppError::internal("Transactions not supported in test mock"))
    }
}

/// True when the call got as far as opening a transaction.
pub fn reached_transaction<T>(result: &AppResult<T>) -> bool {
    matches!(result, Err(AppError::Internal(msg)) if msg.contains("Transactions not supported"))
}

pub fn organization(id: Uuid) -> Organization {
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

pub fn user(id: Uuid, organization_id: Uuid) -> User {
    User {
        id,
        organization_id,
        email: "jane@acme.example".to_string(),
        password_hash: "hashed".to_string(),
        name: "Jane Doe".to_string(),
        is_active: true,
        roles: Vec::new(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
        deleted_at: None,
    }
}

/// A user whose password is [`TEST_PASSWORD`].
pub fn user_with_password(id: Uuid, organization_id: Uuid) -> User {
    let mut user = user(id, organization_id);
    user.password_hash = Password::new(TEST_PASSWORD)
        .expect("hash test password")
        .into_string();
    user
}

pub fn role(id: Uuid, organization_id: Uuid) -> Role {
    Role {
        id,
        organization_id,
        name: "Accountant".to_string(),
        description: None,
        is_system: false,
        permissions: vec!["system_variables.read".to_string()],
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn role_ref(role: &Role) -> RoleRef {
    RoleRef {
        id: role.id,
        name: role.name.clone(),
    }
}

pub fn group(id: Uuid, organization_id: Uuid) -> SystemVariableGroup {
    SystemVariableGroup {
        id,
        organization_id,
        name: "Sales documents".to_string(),
        description: None,
        sort_order: 0,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn variable(id: Uuid, organization_id: Uuid, data_type: VariableType) -> SystemVariable {
    SystemVariable {
        id,
        organization_id,
        group_id: None,
        key: "invoice.number".to_string(),
        name: "Invoice number".to_string(),
        description: None,
        data_type,
        validation: ValidationRules::default(),
        default_value: None,
        value: None,
        incremental: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// An incremental variable that issues `INV-0001` next.
pub fn numbering(id: Uuid, organization_id: Uuid) -> SystemVariable {
    let settings = IncrementalSettings {
        prefix: "INV-".to_string(),
        padding: 4,
        ..IncrementalSettings::default()
    };
    let mut variable = variable(id, organization_id, VariableType::Incremental);
    variable.incremental = Some(IncrementalConfig::new(settings, Utc::now()).expect("valid settings"));
    variable
}
