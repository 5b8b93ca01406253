//! User service - accounts, soft deletion and role assignment.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use super::Caller;
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::{NewUserRecord, PermissionCache, UnitOfWork, UserChanges};
use crate::types::{Paginated, PaginationParams};
use domain::{normalize_email, validate_user_name, Password, User};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Input for a new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Target organization; defaults to the caller's.
    pub organization_id: Option<Uuid>,
    pub email: String,
    pub password: String,
    pub name: String,
    pub is_active: bool,
    pub role_ids: Vec<Uuid>,
}

/// Partial update of an account. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

/// By default, operations exclude soft-deleted users.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserService: Send + Sync {
    async fn list(
        &self,
        caller: Caller,
        organization_id: Option<Uuid>,
        params: PaginationParams,
        include_deleted: bool,
    ) -> AppResult<Paginated<User>>;

    async fn get(&self, caller: Caller, id: Uuid) -> AppResult<User>;

    async fn create(&self, caller: Caller, user: NewUser) -> AppResult<User>;

    async fn update(&self, caller: Caller, id: Uuid, update: UserUpdate) -> AppResult<User>;

    /// Soft delete user (sets deleted_at timestamp)
    async fn delete(&self, caller: Caller, id: Uuid) -> AppResult<()>;

    /// Restore a soft-deleted user
    async fn restore(&self, caller: Caller, id: Uuid) -> AppResult<User>;

    /// Replace the roles held by a user.
    async fn set_roles(&self, caller: Caller, id: Uuid, role_ids: Vec<Uuid>) -> AppResult<User>;
}

/// Concrete implementation of UserService using Unit of Work.
pub struct UserManager<U: UnitOfWork> {
    uow: Arc<U>,
    cache: Arc<dyn PermissionCache>,
}

impl<U: UnitOfWork> UserManager<U> {
    pub fn new(uow: Arc<U>, cache: Arc<dyn PermissionCache>) -> Self {
        Self { uow, cache }
    }

    async fn visible(&self, caller: Caller, id: Uuid) -> AppResult<User> {
        let user = self.uow.users().find_by_id(id).await?.ok_or_not_found("User")?;
        caller.ensure_visible(user.organization_id, "User")?;
        Ok(user)
    }

    /// Emails stay reserved by soft-deleted accounts.
    async fn ensure_email_free(&self, email: &str, except: Option<Uuid>) -> AppResult<()> {
        match self.uow.users().find_by_email_with_deleted(email).await? {
            Some(existing) if Some(existing.id) != except => Err(AppError::conflict("Email")),
            _ => Ok(()),
        }
    }

    /// Deduplicate `role_ids` and check they all belong to `organization_id`.
    async fn roles_of(&self, organization_id: Uuid, mut role_ids: Vec<Uuid>) -> AppResult<Vec<Uuid>> {
        role_ids.sort();
        role_ids.dedup();
        if role_ids.is_empty() {
            return Ok(role_ids);
        }

        let roles = self.uow.roles().find_many(role_ids.clone()).await?;
        if roles.len() != role_ids.len() {
            return Err(AppError::not_found("Role"));
        }
        if roles.iter().any(|r| r.organization_id != organization_id) {
            return Err(AppError::validation(
                "Roles must belong to the user's organization",
            ));
        }
        Ok(role_ids)
    }

    async fn forget_permissions(&self, user_id: Uuid) {
        if let Err(e) = self.cache.invalidate_permissions(&[user_id]).await {
            tracing::warn!(user_id = %user_id, error = %e, "Failed to invalidate cached permissions");
        }
    }
}

#[async_trait]
impl<U: UnitOfWork> UserService for UserManager<U> {
    async fn list(
        &self,
        caller: Caller,
        organization_id: Option<Uuid>,
        params: PaginationParams,
        include_deleted: bool,
    ) -> AppResult<Paginated<User>> {
        let organization_id = caller.scope(organization_id)?;
        let (items, total) = self
            .uow
            .users()
            .list(Some(organization_id), &params, include_deleted)
            .await?;
        Ok(Paginated::new(items, &params, total))
    }

    async fn get(&self, caller: Caller, id: Uuid) -> AppResult<User> {
        self.visible(caller, id).await
    }

    async fn create(&self, caller: Caller, user: NewUser) -> AppResult<User> {
        let organization_id = caller.scope(user.organization_id)?;
        self.uow
            .organizations()
            .find_by_id(organization_id)
            .await?
            .ok_or_not_found("Organization")?;

        let email = normalize_email(&user.email);
        let name = validate_user_name(&user.name)?;
        let password_hash = Password::new(&user.password)?.into_string();
        self.ensure_email_free(&email, None).await?;
        let role_ids = self.roles_of(organization_id, user.role_ids).await?;

        let record = NewUserRecord {
            organization_id,
            email,
            password_hash,
            name,
            is_active: user.is_active,
        };
        let created = self
            .uow
            .transaction(|ctx| Box::pin(async move { ctx.users().create(record, &role_ids).await }))
            .await?;

        tracing::info!(user_id = %created.id, organization_id = %organization_id, "User created");
        Ok(created)
    }

    async fn update(&self, caller: Caller, id: Uuid, update: UserUpdate) -> AppResult<User> {
        let current = self.visible(caller, id).await?;

        if update.is_active == Some(false) && id == caller.user_id {
            return Err(AppError::validation("You cannot deactivate your own account"));
        }

        let email = match update.email {
            Some(email) => {
                let email = normalize_email(&email);
                if email != current.email {
                    self.ensure_email_free(&email, Some(id)).await?;
                }
                Some(email)
            }
            None => None,
        };
        let changes = UserChanges {
            email,
            name: update.name.as_deref().map(validate_user_name).transpose()?,
            password_hash: update
                .password
                .as_deref()
                .map(|p| Password::new(p).map(Password::into_string))
                .transpose()?,
            is_active: update.is_active,
        };

        let updated = self.uow.users().update(id, changes).await?;
        if updated.is_active != current.is_active {
            self.forget_permissions(id).await;
        }
        Ok(updated)
    }

    async fn delete(&self, caller: Caller, id: Uuid) -> AppResult<()> {
        if id == caller.user_id {
            return Err(AppError::validation("You cannot delete your own account"));
        }
        self.visible(caller, id).await?;

        self.uow.users().soft_delete(id).await?;
        self.forget_permissions(id).await;
        tracing::info!(user_id = %id, "User soft deleted");
        Ok(())
    }

    async fn restore(&self, caller: Caller, id: Uuid) -> AppResult<User> {
        let user = self
            .uow
            .users()
            .find_by_id_with_deleted(id)
            .await?
            .ok_or_not_found("User")?;
        caller.ensure_visible(user.organization_id, "User")?;

        let restored = self.uow.users().restore(id).await?;
        self.forget_permissions(id).await;
        tracing::info!(user_id = %id, "User restored");
        Ok(restored)
    }

    async fn set_roles(&self, caller: Caller, id: Uuid, role_ids: Vec<Uuid>) -> AppResult<User> {
        let user = self.visible(caller, id).await?;
        let role_ids = self.roles_of(user.organization_id, role_ids).await?;

        let updated = self
            .uow
            .transaction(|ctx| Box::pin(async move { ctx.users().replace_roles(id, &role_ids).await }))
            .await?;

        self.forget_permissions(id).await;
        Ok(updated)
    }
}
