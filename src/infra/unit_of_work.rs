//! Unit of Work: repository access plus transaction management.
//!
//! Plain reads and single-row writes go through the pooled repositories.
//! Multi-statement workflows (role creation with grants, user creation with
//! assignments, code generation) run inside [`UnitOfWork::transaction`] and
//! reach the database through the `Tx*` repositories of [`TransactionContext`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    AccessMode, DatabaseConnection, DatabaseTransaction, IsolationLevel, TransactionTrait,
};
use std::sync::Arc;
use uuid::Uuid;

use super::repositories::{
    organization_repository, role_repository, system_variable_repository, user_repository,
    NewUserRecord, NewVariableRecord, OrganizationRepository, OrganizationStore, RoleRepository,
    RoleStore, SystemVariableRepository, SystemVariableStore, UserRepository, UserStore,
};
use crate::errors::{AppError, AppResult, OptionExt};
use domain::{GeneratedCode, GeneratedNumber, IncrementalConfig, Organization, Role, SystemVariable, User};

/// Unit of Work trait for dependency injection.
///
/// Not mockable directly because of the generic transaction methods; tests
/// implement it by hand around mocked repositories.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    fn organizations(&self) -> Arc<dyn OrganizationRepository>;

    fn roles(&self) -> Arc<dyn RoleRepository>;

    fn users(&self) -> Arc<dyn UserRepository>;

    fn system_variables(&self) -> Arc<dyn SystemVariableRepository>;

    /// Execute a closure within a ReadCommitted transaction.
    ///
    /// Committed when the closure succeeds, rolled back otherwise.
    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> std::pin::Pin<
                Box<dyn std::future::Future<Output = AppResult<T>> + Send + 'a>,
            > + Send,
        T: Send;
}

/// Repository access bound to one open transaction.
pub struct TransactionContext<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TransactionContext<'a> {
    fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    pub fn organizations(&self) -> TxOrganizationRepository<'_> {
        TxOrganizationRepository { txn: self.txn }
    }

    pub fn roles(&self) -> TxRoleRepository<'_> {
        TxRoleRepository { txn: self.txn }
    }

    pub fn users(&self) -> TxUserRepository<'_> {
        TxUserRepository { txn: self.txn }
    }

    pub fn system_variables(&self) -> TxSystemVariableRepository<'_> {
        TxSystemVariableRepository { txn: self.txn }
    }
}

/// Concrete implementation of UnitOfWork
pub struct Persistence {
    db: DatabaseConnection,
    organization_repo: Arc<OrganizationStore>,
    role_repo: Arc<RoleStore>,
    user_repo: Arc<UserStore>,
    system_variable_repo: Arc<SystemVariableStore>,
}

impl Persistence {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            organization_repo: Arc::new(OrganizationStore::new(db.clone())),
            role_repo: Arc::new(RoleStore::new(db.clone())),
            user_repo: Arc::new(UserStore::new(db.clone())),
            system_variable_repo: Arc::new(SystemVariableStore::new(db.clone())),
            db,
        }
    }

    async fn execute_transaction<F, T>(&self, isolation: IsolationLevel, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> std::pin::Pin<
                Box<dyn std::future::Future<Output = AppResult<T>> + Send + 'a>,
            > + Send,
        T: Send,
    {
        let txn = self
            .db
            .begin_with_config(Some(isolation), Some(AccessMode::ReadWrite))
            .await
            .map_err(AppError::from)?;

        let ctx = TransactionContext::new(&txn);

        match f(ctx).await {
            Ok(result) => {
                txn.commit().await.map_err(AppError::from)?;
                Ok(result)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!("Transaction rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }
}

#[async_trait]
impl UnitOfWork for Persistence {
    fn organizations(&self) -> Arc<dyn OrganizationRepository> {
        self.organization_repo.clone()
    }

    fn roles(&self) -> Arc<dyn RoleRepository> {
        self.role_repo.clone()
    }

    fn users(&self) -> Arc<dyn UserRepository> {
        self.user_repo.clone()
    }

    fn system_variables(&self) -> Arc<dyn SystemVariableRepository> {
        self.system_variable_repo.clone()
    }

    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> std::pin::Pin<
                Box<dyn std::future::Future<Output = AppResult<T>> + Send + 'a>,
            > + Send,
        T: Send,
    {
        self.execute_transaction(IsolationLevel::ReadCommitted, f).await
    }
}

pub struct TxOrganizationRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl TxOrganizationRepository<'_> {
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Organization>> {
        organization_repository::find_by_id(self.txn, id).await
    }

    pub async fn count_live_users(&self, id: Uuid) -> AppResult<u64> {
        organization_repository::count_live_users(self.txn, id).await
    }

    /// Hard delete; soft-deleted users of the organization go with it.
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        organization_repository::delete_with_deleted_users(self.txn, id).await
    }
}

pub struct TxRoleRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl TxRoleRepository<'_> {
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Role>> {
        role_repository::find_by_id(self.txn, id).await
    }

    /// Insert a role with its permission codes.
    pub async fn create(
        &self,
        organization_id: Uuid,
        name: String,
        description: Option<String>,
        permissions: &[String],
    ) -> AppResult<Role> {
        let model = role_repository::insert(self.txn, organization_id, name, description).await?;
        role_repository::replace_permissions(self.txn, model.id, permissions).await?;
        self.find_by_id(model.id).await?.ok_or_not_found("Role")
    }

    pub async fn replace_permissions(&self, id: Uuid, permissions: &[String]) -> AppResult<Role> {
        role_repository::replace_permissions(self.txn, id, permissions).await?;
        self.find_by_id(id).await?.ok_or_not_found("Role")
    }

    pub async fn user_ids_with_role(&self, id: Uuid) -> AppResult<Vec<Uuid>> {
        role_repository::user_ids_with_role(self.txn, id).await
    }
}

pub struct TxUserRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl TxUserRepository<'_> {
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        user_repository::find_by_id(self.txn, id, false).await
    }

    /// Insert a user with its role assignments.
    pub async fn create(&self, record: NewUserRecord, role_ids: &[Uuid]) -> AppResult<User> {
        let model = user_repository::insert(self.txn, record).await?;
        user_repository::replace_roles(self.txn, model.id, role_ids).await?;
        self.find_by_id(model.id).await?.ok_or_not_found("User")
    }

    pub async fn replace_roles(&self, id: Uuid, role_ids: &[Uuid]) -> AppResult<User> {
        user_repository::replace_roles(self.txn, id, role_ids).await?;
        self.find_by_id(id).await?.ok_or_not_found("User")
    }
}

pub struct TxSystemVariableRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl TxSystemVariableRepository<'_> {
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<SystemVariable>> {
        system_variable_repository::find_by_id(self.txn, id).await
    }

    /// Insert a definition plus, for incremental variables, its counter.
    pub async fn create(
        &self,
        record: NewVariableRecord,
        incremental: Option<&IncrementalConfig>,
    ) -> AppResult<SystemVariable> {
        let id = system_variable_repository::insert(self.txn, record, incremental).await?;
        self.find_by_id(id).await?.ok_or_not_found("System variable")
    }

    /// Counter state, locked until the transaction ends.
    pub async fn lock_incremental(&self, variable_id: Uuid) -> AppResult<Option<IncrementalConfig>> {
        system_variable_repository::lock_incremental(self.txn, variable_id).await
    }

    pub async fn save_incremental(&self, variable_id: Uuid, config: &IncrementalConfig) -> AppResult<()> {
        system_variable_repository::save_incremental(self.txn, variable_id, config).await
    }

    pub async fn record_code(
        &self,
        variable_id: Uuid,
        generated: &GeneratedNumber,
        generated_by: Option<Uuid>,
        at: DateTime<Utc>,
    ) -> AppResult<GeneratedCode> {
        system_variable_repository::record_code(self.txn, variable_id, generated, generated_by, at).await
    }
}
