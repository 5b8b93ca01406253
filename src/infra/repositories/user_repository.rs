//! User repository implementation with soft delete support.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use super::base::{fetch_page, with_search};
use super::entities::user::{self, ActiveModel, Entity as UserEntity};
use super::entities::{role, user_role};
use crate::errors::{AppError, AppResult, DbResultExt, OptionExt};
use crate::types::PaginationParams;
use domain::{RoleRef, User};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Column values for a new user row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserRecord {
    pub organization_id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub is_active: bool,
}

/// Partial update of a user row. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password_hash: Option<String>,
    pub is_active: Option<bool>,
}

/// User repository trait for dependency injection.
///
/// By default, all query methods exclude soft-deleted records.
/// Use `*_with_deleted` variants to include them.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Page through users of an organization, or of all organizations when `None`.
    async fn list(
        &self,
        organization_id: Option<Uuid>,
        params: &PaginationParams,
        include_deleted: bool,
    ) -> AppResult<(Vec<User>, u64)>;

    /// Find live user by ID (excludes soft-deleted)
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Find user by ID including soft-deleted
    async fn find_by_id_with_deleted(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Find live user by email (excludes soft-deleted)
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Find user by email including soft-deleted
    async fn find_by_email_with_deleted(&self, email: &str) -> AppResult<Option<User>>;

    /// Update live user fields
    async fn update(&self, id: Uuid, changes: UserChanges) -> AppResult<User>;

    /// Soft delete user by ID (sets deleted_at timestamp)
    async fn soft_delete(&self, id: Uuid) -> AppResult<()>;

    /// Restore a soft-deleted user
    async fn restore(&self, id: Uuid) -> AppResult<User>;
}

/// Concrete implementation of UserRepository with soft delete
pub struct UserStore {
    db: DatabaseConnection,
}

impl UserStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for UserStore {
    async fn list(
        &self,
        organization_id: Option<Uuid>,
        params: &PaginationParams,
        include_deleted: bool,
    ) -> AppResult<(Vec<User>, u64)> {
        let mut select = UserEntity::find().order_by_asc(user::Column::Email);
        if let Some(organization_id) = organization_id {
            select = select.filter(user::Column::OrganizationId.eq(organization_id));
        }
        if !include_deleted {
            select = select.filter(user::Column::DeletedAt.is_null());
        }
        let select = with_search(
            select,
            &[user::Column::Email, user::Column::Name],
            params.search_term(),
        );

        let (models, total) = fetch_page(&self.db, select, params).await?;
        Ok((with_roles(&self.db, models).await?, total))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        find_by_id(&self.db, id, false).await
    }

    async fn find_by_id_with_deleted(&self, id: Uuid) -> AppResult<Option<User>> {
        find_by_id(&self.db, id, true).await
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let model = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .filter(user::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?;
        single_with_roles(&self.db, model).await
    }

    async fn find_by_email_with_deleted(&self, email: &str) -> AppResult<Option<User>> {
        let model = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?;
        single_with_roles(&self.db, model).await
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> AppResult<User> {
        let model = UserEntity::find_by_id(id)
            .filter(user::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?
            .ok_or_not_found("User")?;

        let mut active: ActiveModel = model.into();
        if let Some(email) = changes.email {
            active.email = Set(email);
        }
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(password_hash) = changes.password_hash {
            active.password_hash = Set(password_hash);
        }
        if let Some(is_active) = changes.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now());

        let model = active.update(&self.db).await.conflict_on_unique("Email")?;
        single_with_roles(&self.db, Some(model))
            .await?
            .ok_or_not_found("User")
    }

    async fn soft_delete(&self, id: Uuid) -> AppResult<()> {
        let model = UserEntity::find_by_id(id)
            .filter(user::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?
            .ok_or_not_found("User")?;

        let mut active: ActiveModel = model.into();
        let now = Utc::now();
        active.deleted_at = Set(Some(now));
        active.updated_at = Set(now);

        active.update(&self.db).await?;
        Ok(())
    }

    async fn restore(&self, id: Uuid) -> AppResult<User> {
        let model = UserEntity::find_by_id(id)
            .filter(user::Column::DeletedAt.is_not_null())
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::validation("User is not deleted or does not exist"))?;

        let mut active: ActiveModel = model.into();
        active.deleted_at = Set(None);
        active.updated_at = Set(Utc::now());

        let model = active.update(&self.db).await?;
        single_with_roles(&self.db, Some(model))
            .await?
            .ok_or_not_found("User")
    }
}

pub(crate) async fn find_by_id<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    include_deleted: bool,
) -> AppResult<Option<User>> {
    let mut select = UserEntity::find_by_id(id);
    if !include_deleted {
        select = select.filter(user::Column::DeletedAt.is_null());
    }
    let model = select.one(db).await?;
    single_with_roles(db, model).await
}

pub(crate) async fn insert<C: ConnectionTrait>(db: &C, record: NewUserRecord) -> AppResult<user::Model> {
    let now = Utc::now();
    let active_model = ActiveModel {
        id: Set(Uuid::new_v4()),
        organization_id: Set(record.organization_id),
        email: Set(record.email),
        password_hash: Set(record.password_hash),
        name: Set(record.name),
        is_active: Set(record.is_active),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    };

    active_model.insert(db).await.conflict_on_unique("Email")
}

/// Replace every role assignment of a user.
pub(crate) async fn replace_roles<C: ConnectionTrait>(db: &C, user_id: Uuid, role_ids: &[Uuid]) -> AppResult<()> {
    user_role::Entity::delete_many()
        .filter(user_role::Column::UserId.eq(user_id))
        .exec(db)
        .await?;

    if role_ids.is_empty() {
        return Ok(());
    }

    let rows = role_ids.iter().map(|role_id| user_role::ActiveModel {
        user_id: Set(user_id),
        role_id: Set(*role_id),
    });
    user_role::Entity::insert_many(rows).exec(db).await?;
    Ok(())
}

async fn single_with_roles<C: ConnectionTrait>(db: &C, model: Option<user::Model>) -> AppResult<Option<User>> {
    match model {
        Some(model) => Ok(with_roles(db, vec![model]).await?.pop()),
        None => Ok(None),
    }
}

/// Load role references for `models` and assemble domain users.
pub(crate) async fn with_roles<C: ConnectionTrait>(db: &C, models: Vec<user::Model>) -> AppResult<Vec<User>> {
    if models.is_empty() {
        return Ok(Vec::new());
    }

    let assignments = user_role::Entity::find()
        .filter(user_role::Column::UserId.is_in(models.iter().map(|m| m.id)))
        .all(db)
        .await?;

    let roles: HashMap<Uuid, String> = if assignments.is_empty() {
        HashMap::new()
    } else {
        role::Entity::find()
            .filter(role::Column::Id.is_in(assignments.iter().map(|a| a.role_id)))
            .all(db)
            .await?
            .into_iter()
            .map(|r| (r.id, r.name))
            .collect()
    };

    let mut by_user: HashMap<Uuid, Vec<RoleRef>> = HashMap::new();
    for assignment in assignments {
        if let Some(name) = roles.get(&assignment.role_id) {
            by_user.entry(assignment.user_id).or_default().push(RoleRef {
                id: assignment.role_id,
                name: name.clone(),
            });
        }
    }

    Ok(models
        .into_iter()
        .map(|model| {
            let mut refs = by_user.remove(&model.id).unwrap_or_default();
            refs.sort_by(|a, b| a.name.cmp(&b.name));
            model.into_user(refs)
        })
        .collect())
}
