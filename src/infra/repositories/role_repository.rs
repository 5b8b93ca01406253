//! Role and permission repository.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use super::base::{count, ensure_deleted, fetch_page, with_search};
use super::entities::role::{self, ActiveModel, Entity as RoleEntity};
use super::entities::{permission, role_permission, user, user_role};
use crate::errors::{AppError, AppResult, DbResultExt, OptionExt};
use crate::types::PaginationParams;
use domain::{Permission, Role};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// The whole permission catalogue, ordered by code.
    async fn list_permissions(&self) -> AppResult<Vec<Permission>>;

    async fn list(&self, organization_id: Uuid, params: &PaginationParams) -> AppResult<(Vec<Role>, u64)>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Role>>;

    /// Roles among `ids`; unknown ids are skipped.
    async fn find_many(&self, ids: Vec<Uuid>) -> AppResult<Vec<Role>>;

    async fn update(&self, id: Uuid, name: Option<String>, description: Option<String>) -> AppResult<Role>;

    async fn delete(&self, id: Uuid) -> AppResult<()>;

    /// Number of users (deleted or not) holding the role.
    async fn count_assignments(&self, id: Uuid) -> AppResult<u64>;

    /// Users holding the role, for cache invalidation.
    async fn user_ids_with_role(&self, id: Uuid) -> AppResult<Vec<Uuid>>;

    /// Permission codes granted to a live, active user through all roles.
    async fn permission_codes_for_user(&self, user_id: Uuid) -> AppResult<Vec<String>>;
}

/// Concrete implementation of RoleRepository
pub struct RoleStore {
    db: DatabaseConnection,
}

impl RoleStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RoleRepository for RoleStore {
    async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        let models = permission::Entity::find()
            .order_by_asc(permission::Column::Code)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Permission::from).collect())
    }

    async fn list(&self, organization_id: Uuid, params: &PaginationParams) -> AppResult<(Vec<Role>, u64)> {
        let select = RoleEntity::find()
            .filter(role::Column::OrganizationId.eq(organization_id))
            .order_by_asc(role::Column::Name);
        let select = with_search(select, &[role::Column::Name], params.search_term());

        let (models, total) = fetch_page(&self.db, select, params).await?;
        Ok((with_permissions(&self.db, models).await?, total))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Role>> {
        find_by_id(&self.db, id).await
    }

    async fn find_many(&self, ids: Vec<Uuid>) -> AppResult<Vec<Role>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let models = RoleEntity::find()
            .filter(role::Column::Id.is_in(ids))
            .all(&self.db)
            .await?;
        with_permissions(&self.db, models).await
    }

    async fn update(&self, id: Uuid, name: Option<String>, description: Option<String>) -> AppResult<Role> {
        let model = RoleEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_not_found("Role")?;

        let mut active: ActiveModel = model.into();
        if let Some(name) = name {
            active.name = Set(name);
        }
        if let Some(description) = description {
            active.description = Set(Some(description).filter(|d| !d.trim().is_empty()));
        }
        active.updated_at = Set(Utc::now());

        active.update(&self.db).await.conflict_on_unique("Role name")?;
        find_by_id(&self.db, id).await?.ok_or_not_found("Role")
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = RoleEntity::delete_by_id(id).exec(&self.db).await?;
        ensure_deleted(result, "Role")
    }

    async fn count_assignments(&self, id: Uuid) -> AppResult<u64> {
        count(
            &self.db,
            user_role::Entity::find().filter(user_role::Column::RoleId.eq(id)),
        )
        .await
    }

    async fn user_ids_with_role(&self, id: Uuid) -> AppResult<Vec<Uuid>> {
        user_ids_with_role(&self.db, id).await
    }

    async fn permission_codes_for_user(&self, user_id: Uuid) -> AppResult<Vec<String>> {
        let live = user::Entity::find_by_id(user_id)
            .filter(user::Column::DeletedAt.is_null())
            .filter(user::Column::IsActive.eq(true))
            .one(&self.db)
            .await?;
        if live.is_none() {
            return Ok(Vec::new());
        }

        let role_ids: Vec<Uuid> = user_role::Entity::find()
            .filter(user_role::Column::UserId.eq(user_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|m| m.role_id)
            .collect();

        let mut codes: Vec<String> = permission_codes_by_role(&self.db, role_ids)
            .await?
            .into_values()
            .flatten()
            .collect();
        codes.sort();
        codes.dedup();
        Ok(codes)
    }
}

pub(crate) async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<Option<Role>> {
    match RoleEntity::find_by_id(id).one(db).await? {
        Some(model) => Ok(with_permissions(db, vec![model]).await?.pop()),
        None => Ok(None),
    }
}

pub(crate) async fn user_ids_with_role<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<Vec<Uuid>> {
    let rows = user_role::Entity::find()
        .filter(user_role::Column::RoleId.eq(id))
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|m| m.user_id).collect())
}

/// Insert a role row.
pub(crate) async fn insert<C: ConnectionTrait>(
    db: &C,
    organization_id: Uuid,
    name: String,
    description: Option<String>,
) -> AppResult<role::Model> {
    let now = Utc::now();
    let active_model = ActiveModel {
        id: Set(Uuid::new_v4()),
        organization_id: Set(organization_id),
        name: Set(name),
        description: Set(description.filter(|d| !d.trim().is_empty())),
        is_system: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
    };
    active_model.insert(db).await.conflict_on_unique("Role name")
}

/// Replace the permission set of a role with `codes`.
pub(crate) async fn replace_permissions<C: ConnectionTrait>(
    db: &C,
    role_id: Uuid,
    codes: &[String],
) -> AppResult<()> {
    role_permission::Entity::delete_many()
        .filter(role_permission::Column::RoleId.eq(role_id))
        .exec(db)
        .await?;

    if codes.is_empty() {
        return Ok(());
    }

    let permission_ids: Vec<Uuid> = permission::Entity::find()
        .filter(permission::Column::Code.is_in(codes.iter().cloned()))
        .all(db)
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect();
    if permission_ids.len() != codes.len() {
        return Err(AppError::validation("Unknown permission in request"));
    }

    let rows = permission_ids.into_iter().map(|permission_id| role_permission::ActiveModel {
        role_id: Set(role_id),
        permission_id: Set(permission_id),
    });
    role_permission::Entity::insert_many(rows).exec(db).await?;
    Ok(())
}

/// Load permission codes for `models` and assemble domain roles.
pub(crate) async fn with_permissions<C: ConnectionTrait>(db: &C, models: Vec<role::Model>) -> AppResult<Vec<Role>> {
    let ids = models.iter().map(|m| m.id).collect();
    let mut by_role = permission_codes_by_role(db, ids).await?;
    Ok(models
        .into_iter()
        .map(|model| {
            let mut codes = by_role.remove(&model.id).unwrap_or_default();
            codes.sort();
            model.into_role(codes)
        })
        .collect())
}

async fn permission_codes_by_role<C: ConnectionTrait>(
    db: &C,
    role_ids: Vec<Uuid>,
) -> AppResult<HashMap<Uuid, Vec<String>>> {
    if role_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let grants = role_permission::Entity::find()
        .filter(role_permission::Column::RoleId.is_in(role_ids))
        .all(db)
        .await?;
    if grants.is_empty() {
        return Ok(HashMap::new());
    }

    let codes: HashMap<Uuid, String> = permission::Entity::find()
        .filter(permission::Column::Id.is_in(grants.iter().map(|g| g.permission_id)))
        .select_only()
        .column(permission::Column::Id)
        .column(permission::Column::Code)
        .into_tuple::<(Uuid, String)>()
        .all(db)
        .await?
        .into_iter()
        .collect();

    let mut by_role: HashMap<Uuid, Vec<String>> = HashMap::new();
    for grant in grants {
        if let Some(code) = codes.get(&grant.permission_id) {
            by_role.entry(grant.role_id).or_default().push(code.clone());
        }
    }
    Ok(by_role)
}
