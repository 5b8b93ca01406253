//! Role service - roles, their permissions and the permission catalogue.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use super::Caller;
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::{PermissionCache, UnitOfWork};
use crate::types::{Paginated, PaginationParams};
use domain::{normalize_permission_codes, validate_role_name, Permission, Role};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait RoleService: Send + Sync {
    async fn list_permissions(&self) -> AppResult<Vec<Permission>>;

    async fn list(
        &self,
        caller: Caller,
        organization_id: Option<Uuid>,
        params: PaginationParams,
    ) -> AppResult<Paginated<Role>>;

    async fn get(&self, caller: Caller, id: Uuid) -> AppResult<Role>;

    async fn create(
        &self,
        caller: Caller,
        organization_id: Option<Uuid>,
        name: String,
        description: Option<String>,
        permissions: Vec<String>,
    ) -> AppResult<Role>;

    async fn update(
        &self,
        caller: Caller,
        id: Uuid,
        name: Option<String>,
        description: Option<String>,
    ) -> AppResult<Role>;

    /// Delete a role nobody holds.
    async fn delete(&self, caller: Caller, id: Uuid) -> AppResult<()>;

    /// Replace the permissions of a role.
    async fn set_permissions(&self, caller: Caller, id: Uuid, permissions: Vec<String>) -> AppResult<Role>;
}

pub struct RoleManager<U: UnitOfWork> {
    uow: Arc<U>,
    cache: Arc<dyn PermissionCache>,
}

impl<U: UnitOfWork> RoleManager<U> {
    pub fn new(uow: Arc<U>, cache: Arc<dyn PermissionCache>) -> Self {
        Self { uow, cache }
    }

    async fn visible(&self, caller: Caller, id: Uuid) -> AppResult<Role> {
        let role = self.uow.roles().find_by_id(id).await?.ok_or_not_found("Role")?;
        caller.ensure_visible(role.organization_id, "Role")?;
        Ok(role)
    }

    async fn mutable(&self, caller: Caller, id: Uuid) -> AppResult<Role> {
        let role = self.visible(caller, id).await?;
        role.ensure_mutable()?;
        Ok(role)
    }
}

#[async_trait]
impl<U: UnitOfWork> RoleService for RoleManager<U> {
    async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        self.uow.roles().list_permissions().await
    }

    async fn list(
        &self,
        caller: Caller,
        organization_id: Option<Uuid>,
        params: PaginationParams,
    ) -> AppResult<Paginated<Role>> {
        let organization_id = caller.scope(organization_id)?;
        let (items, total) = self.uow.roles().list(organization_id, &params).await?;
        Ok(Paginated::new(items, &params, total))
    }

    async fn get(&self, caller: Caller, id: Uuid) -> AppResult<Role> {
        self.visible(caller, id).await
    }

    async fn create(
        &self,
        caller: Caller,
        organization_id: Option<Uuid>,
        name: String,
        description: Option<String>,
        permissions: Vec<String>,
    ) -> AppResult<Role> {
        let organization_id = caller.scope(organization_id)?;
        self.uow
            .organizations()
            .find_by_id(organization_id)
            .await?
            .ok_or_not_found("Organization")?;

        let name = validate_role_name(&name)?;
        let permissions = normalize_permission_codes(&permissions)?;

        let role = self
            .uow
            .transaction(|ctx| {
                Box::pin(async move {
                    ctx.roles()
                        .create(organization_id, name, description, &permissions)
                        .await
                })
            })
            .await?;

        tracing::info!(role_id = %role.id, organization_id = %organization_id, "Role created");
        Ok(role)
    }

    async fn update(
        &self,
        caller: Caller,
        id: Uuid,
        name: Option<String>,
        description: Option<String>,
    ) -> AppResult<Role> {
        self.mutable(caller, id).await?;
        let name = name.as_deref().map(validate_role_name).transpose()?;
        self.uow.roles().update(id, name, description).await
    }

    async fn delete(&self, caller: Caller, id: Uuid) -> AppResult<()> {
        self.mutable(caller, id).await?;

        let holders = self.uow.roles().count_assignments(id).await?;
        if holders > 0 {
            return Err(AppError::validation(format!(
                "Role is assigned to {} user(s) and cannot be deleted",
                holders
            )));
        }

        self.uow.roles().delete(id).await?;
        tracing::info!(role_id = %id, "Role deleted");
        Ok(())
    }

    async fn set_permissions(&self, caller: Caller, id: Uuid, permissions: Vec<String>) -> AppResult<Role> {
        self.mutable(caller, id).await?;
        let permissions = normalize_permission_codes(&permissions)?;

        let (role, holders) = self
            .uow
            .transaction(|ctx| {
                Box::pin(async move {
                    let role = ctx.roles().replace_permissions(id, &permissions).await?;
                    let holders = ctx.roles().user_ids_with_role(id).await?;
                    Ok((role, holders))
                })
            })
            .await?;

        if let Err(e) = self.cache.invalidate_permissions(&holders).await {
            tracing::warn!(role_id = %id, error = %e, "Failed to invalidate cached permissions");
        }
        tracing::info!(role_id = %id, permissions = role.permissions.len(), "Role permissions replaced");
        Ok(role)
    }
}
