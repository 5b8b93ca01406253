//! Organization service - tenant lifecycle.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use super::Caller;
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::UnitOfWork;
use crate::types::{Paginated, PaginationParams};
use domain::{NewOrganization, Organization, OrganizationChanges};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait OrganizationService: Send + Sync {
    /// Every organization for SYSTEM members, only their own otherwise.
    async fn list(&self, caller: Caller, params: PaginationParams) -> AppResult<Paginated<Organization>>;

    async fn get(&self, caller: Caller, id: Uuid) -> AppResult<Organization>;

    async fn create(
        &self,
        caller: Caller,
        name: String,
        code: String,
        description: Option<String>,
    ) -> AppResult<Organization>;

    async fn update(&self, caller: Caller, id: Uuid, changes: OrganizationChanges) -> AppResult<Organization>;

    /// Remove an organization that has no remaining users.
    async fn delete(&self, caller: Caller, id: Uuid) -> AppResult<()>;
}

pub struct OrganizationManager<U: UnitOfWork> {
    uow: Arc<U>,
}

impl<U: UnitOfWork> OrganizationManager<U> {
    pub fn new(uow: Arc<U>) -> Self {
        Self { uow }
    }

    async fn visible(&self, caller: Caller, id: Uuid) -> AppResult<Organization> {
        caller.ensure_visible(id, "Organization")?;
        self.uow
            .organizations()
            .find_by_id(id)
            .await?
            .ok_or_not_found("Organization")
    }
}

#[async_trait]
impl<U: UnitOfWork> OrganizationService for OrganizationManager<U> {
    async fn list(&self, caller: Caller, params: PaginationParams) -> AppResult<Paginated<Organization>> {
        let only = (!caller.is_system()).then_some(caller.organization_id);
        let (items, total) = self.uow.organizations().list(&params, only).await?;
        Ok(Paginated::new(items, &params, total))
    }

    async fn get(&self, caller: Caller, id: Uuid) -> AppResult<Organization> {
        self.visible(caller, id).await
    }

    async fn create(
        &self,
        caller: Caller,
        name: String,
        code: String,
        description: Option<String>,
    ) -> AppResult<Organization> {
        if !caller.is_system() {
            return Err(AppError::forbidden("SYSTEM organization membership"));
        }
        let organization = NewOrganization::new(&name, &code, description)?;
        let created = self.uow.organizations().create(organization).await?;
        tracing::info!(organization_id = %created.id, code = %created.code, "Organization created");
        Ok(created)
    }

    async fn update(&self, caller: Caller, id: Uuid, changes: OrganizationChanges) -> AppResult<Organization> {
        let current = self.visible(caller, id).await?;
        let changes = changes.validated_for(&current)?;
        self.uow.organizations().update(id, changes).await
    }

    async fn delete(&self, caller: Caller, id: Uuid) -> AppResult<()> {
        if !caller.is_system() {
            return Err(AppError::forbidden("SYSTEM organization membership"));
        }
        let organization = self.visible(caller, id).await?;
        if organization.is_system() {
            return Err(AppError::validation("The SYSTEM organization cannot be deleted"));
        }

        self.uow
            .transaction(|ctx| {
                Box::pin(async move {
                    let users = ctx.organizations().count_live_users(id).await?;
                    if users > 0 {
                        return Err(AppError::validation(format!(
                            "Organization still has {} user(s); delete them first",
                            users
                        )));
                    }
                    ctx.organizations().delete(id).await
                })
            })
            .await?;

        tracing::info!(organization_id = %id, "Organization deleted");
        Ok(())
    }
}
