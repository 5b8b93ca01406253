//! Organization repository.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use super::base::{count, ensure_deleted, fetch_page, with_search};
use super::entities::organization::{self, ActiveModel, Entity as OrganizationEntity};
use super::entities::user;
use crate::errors::{AppResult, DbResultExt, OptionExt};
use crate::types::PaginationParams;
use domain::{NewOrganization, Organization, OrganizationChanges};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    /// Page through organizations, optionally restricted to one id.
    async fn list(
        &self,
        params: &PaginationParams,
        only: Option<Uuid>,
    ) -> AppResult<(Vec<Organization>, u64)>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Organization>>;

    async fn create(&self, organization: NewOrganization) -> AppResult<Organization>;

    async fn update(&self, id: Uuid, changes: OrganizationChanges) -> AppResult<Organization>;

    /// Users of the organization that are not soft deleted.
    async fn count_live_users(&self, id: Uuid) -> AppResult<u64>;
}

/// Concrete implementation of OrganizationRepository
pub struct OrganizationStore {
    db: DatabaseConnection,
}

impl OrganizationStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OrganizationRepository for OrganizationStore {
    async fn list(
        &self,
        params: &PaginationParams,
        only: Option<Uuid>,
    ) -> AppResult<(Vec<Organization>, u64)> {
        let mut select = OrganizationEntity::find().order_by_asc(organization::Column::Name);
        if let Some(id) = only {
            select = select.filter(organization::Column::Id.eq(id));
        }
        let select = with_search(
            select,
            &[organization::Column::Name, organization::Column::Code],
            params.search_term(),
        );

        let (models, total) = fetch_page(&self.db, select, params).await?;
        Ok((models.into_iter().map(Organization::from).collect(), total))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Organization>> {
        find_by_id(&self.db, id).await
    }

    async fn create(&self, organization: NewOrganization) -> AppResult<Organization> {
        let now = Utc::now();
        let active_model = ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(organization.name),
            code: Set(organization.code),
            description: Set(organization.description),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = active_model
            .insert(&self.db)
            .await
            .conflict_on_unique("Organization code")?;
        Ok(Organization::from(model))
    }

    async fn update(&self, id: Uuid, changes: OrganizationChanges) -> AppResult<Organization> {
        let model = OrganizationEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_not_found("Organization")?;

        let mut active: ActiveModel = model.into();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(description) = changes.description {
            active.description = Set(Some(description).filter(|d| !d.trim().is_empty()));
        }
        if let Some(is_active) = changes.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now());

        let model = active.update(&self.db).await?;
        Ok(Organization::from(model))
    }

    async fn count_live_users(&self, id: Uuid) -> AppResult<u64> {
        count_live_users(&self.db, id).await
    }
}

pub(crate) async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<Option<Organization>> {
    let model = OrganizationEntity::find_by_id(id).one(db).await?;
    Ok(model.map(Organization::from))
}

pub(crate) async fn count_live_users<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<u64> {
    count(
        db,
        user::Entity::find()
            .filter(user::Column::OrganizationId.eq(id))
            .filter(user::Column::DeletedAt.is_null()),
    )
    .await
}

/// Remove an organization together with its soft-deleted users.
///
/// Roles, groups and variables cascade at the database level.
pub(crate) async fn delete_with_deleted_users<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<()> {
    user::Entity::delete_many()
        .filter(user::Column::OrganizationId.eq(id))
        .filter(user::Column::DeletedAt.is_not_null())
        .exec(db)
        .await?;

    let result = OrganizationEntity::delete_by_id(id).exec(db).await?;
    ensure_deleted(result, "Organization")
}
