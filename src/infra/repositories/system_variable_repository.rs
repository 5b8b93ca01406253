//! System variable repository: groups, definitions, values and the code ledger.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::OnConflict, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use super::base::{count, ensure_deleted, fetch_page, with_search};
use super::entities::system_variable::{self, Entity as VariableEntity};
use super::entities::{generated_code, incremental_config, system_variable_group, system_variable_value};
use crate::errors::{AppError, AppResult, DbResultExt, OptionExt};
use crate::types::PaginationParams;
use domain::{
    GeneratedCode, GeneratedNumber, IncrementalConfig, SystemVariable, SystemVariableGroup,
    ValidationRules, VariableType,
};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Column values for a new group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGroupRecord {
    pub organization_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub sort_order: Option<i32>,
}

/// Column values for a new variable definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVariableRecord {
    pub organization_id: Uuid,
    pub group_id: Option<Uuid>,
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub data_type: VariableType,
    pub rules: ValidationRules,
    pub default_value: Option<String>,
}

/// Partial update of a definition. `Some(None)` clears a nullable column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableChanges {
    pub group_id: Option<Option<Uuid>>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub rules: Option<ValidationRules>,
    pub default_value: Option<Option<String>>,
}

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait SystemVariableRepository: Send + Sync {
    async fn list_groups(&self, organization_id: Uuid) -> AppResult<Vec<SystemVariableGroup>>;

    async fn find_group(&self, id: Uuid) -> AppResult<Option<SystemVariableGroup>>;

    async fn create_group(&self, group: NewGroupRecord) -> AppResult<SystemVariableGroup>;

    async fn update_group(&self, id: Uuid, changes: GroupChanges) -> AppResult<SystemVariableGroup>;

    async fn delete_group(&self, id: Uuid) -> AppResult<()>;

    async fn count_variables_in_group(&self, group_id: Uuid) -> AppResult<u64>;

    async fn list(
        &self,
        organization_id: Uuid,
        group_id: Option<Uuid>,
        params: &PaginationParams,
    ) -> AppResult<(Vec<SystemVariable>, u64)>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<SystemVariable>>;

    async fn update(&self, id: Uuid, changes: VariableChanges) -> AppResult<SystemVariable>;

    async fn delete(&self, id: Uuid) -> AppResult<()>;

    /// Store `value`, or remove the stored value when `None`.
    async fn set_value(&self, id: Uuid, value: Option<String>, updated_by: Uuid) -> AppResult<()>;

    /// Issued codes, newest first.
    async fn list_codes(&self, variable_id: Uuid, params: &PaginationParams) -> AppResult<(Vec<GeneratedCode>, u64)>;
}

/// Concrete implementation of SystemVariableRepository
pub struct SystemVariableStore {
    db: DatabaseConnection,
}

impl SystemVariableStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SystemVariableRepository for SystemVariableStore {
    async fn list_groups(&self, organization_id: Uuid) -> AppResult<Vec<SystemVariableGroup>> {
        let models = system_variable_group::Entity::find()
            .filter(system_variable_group::Column::OrganizationId.eq(organization_id))
            .order_by_asc(system_variable_group::Column::SortOrder)
            .order_by_asc(system_variable_group::Column::Name)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(SystemVariableGroup::from).collect())
    }

    async fn find_group(&self, id: Uuid) -> AppResult<Option<SystemVariableGroup>> {
        let model = system_variable_group::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(SystemVariableGroup::from))
    }

    async fn create_group(&self, group: NewGroupRecord) -> AppResult<SystemVariableGroup> {
        let now = Utc::now();
        let active_model = system_variable_group::ActiveModel {
            id: Set(Uuid::new_v4()),
            organization_id: Set(group.organization_id),
            name: Set(group.name),
            description: Set(group.description),
            sort_order: Set(group.sort_order),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = active_model
            .insert(&self.db)
            .await
            .conflict_on_unique("Group name")?;
        Ok(SystemVariableGroup::from(model))
    }

    async fn update_group(&self, id: Uuid, changes: GroupChanges) -> AppResult<SystemVariableGroup> {
        let model = system_variable_group::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_not_found("Group")?;

        let mut active: system_variable_group::ActiveModel = model.into();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(description) = changes.description {
            active.description = Set(Some(description).filter(|d| !d.trim().is_empty()));
        }
        if let Some(sort_order) = changes.sort_order {
            active.sort_order = Set(sort_order);
        }
        active.updated_at = Set(Utc::now());

        let model = active
            .update(&self.db)
            .await
            .conflict_on_unique("Group name")?;
        Ok(SystemVariableGroup::from(model))
    }

    async fn delete_group(&self, id: Uuid) -> AppResult<()> {
        let result = system_variable_group::Entity::delete_by_id(id)
            .exec(&self.db)
            .await?;
        ensure_deleted(result, "Group")
    }

    async fn count_variables_in_group(&self, group_id: Uuid) -> AppResult<u64> {
        count(
            &self.db,
            VariableEntity::find().filter(system_variable::Column::GroupId.eq(group_id)),
        )
        .await
    }

    async fn list(
        &self,
        organization_id: Uuid,
        group_id: Option<Uuid>,
        params: &PaginationParams,
    ) -> AppResult<(Vec<SystemVariable>, u64)> {
        let mut select = VariableEntity::find()
            .filter(system_variable::Column::OrganizationId.eq(organization_id))
            .order_by_asc(system_variable::Column::Key);
        if let Some(group_id) = group_id {
            select = select.filter(system_variable::Column::GroupId.eq(group_id));
        }
        let select = with_search(
            select,
            &[system_variable::Column::Key, system_variable::Column::Name],
            params.search_term(),
        );

        let (models, total) = fetch_page(&self.db, select, params).await?;
        Ok((assemble(&self.db, models).await?, total))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<SystemVariable>> {
        find_by_id(&self.db, id).await
    }

    async fn update(&self, id: Uuid, changes: VariableChanges) -> AppResult<SystemVariable> {
        let model = VariableEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_not_found("System variable")?;

        let mut active: system_variable::ActiveModel = model.into();
        if let Some(group_id) = changes.group_id {
            active.group_id = Set(group_id);
        }
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(description) = changes.description {
            active.description = Set(Some(description).filter(|d| !d.trim().is_empty()));
        }
        if let Some(rules) = changes.rules {
            active.is_required = Set(rules.is_required);
            active.min_length = Set(rules.min_length.map(length_column));
            active.max_length = Set(rules.max_length.map(length_column));
            active.pattern = Set(rules.pattern.filter(|p| !p.is_empty()));
        }
        if let Some(default_value) = changes.default_value {
            active.default_value = Set(default_value);
        }
        active.updated_at = Set(Utc::now());

        active.update(&self.db).await?;
        find_by_id(&self.db, id)
            .await?
            .ok_or_not_found("System variable")
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = VariableEntity::delete_by_id(id).exec(&self.db).await?;
        ensure_deleted(result, "System variable")
    }

    async fn set_value(&self, id: Uuid, value: Option<String>, updated_by: Uuid) -> AppResult<()> {
        match value {
            Some(value) => upsert_value(&self.db, id, value, Some(updated_by), Utc::now()).await,
            None => {
                system_variable_value::Entity::delete_by_id(id)
                    .exec(&self.db)
                    .await?;
                Ok(())
            }
        }
    }

    async fn list_codes(&self, variable_id: Uuid, params: &PaginationParams) -> AppResult<(Vec<GeneratedCode>, u64)> {
        let select = generated_code::Entity::find()
            .filter(generated_code::Column::VariableId.eq(variable_id))
            .order_by_desc(generated_code::Column::GeneratedAt)
            .order_by_desc(generated_code::Column::Number);
        let select = with_search(select, &[generated_code::Column::Code], params.search_term());

        let (models, total) = fetch_page(&self.db, select, params).await?;
        Ok((models.into_iter().map(GeneratedCode::from).collect(), total))
    }
}

fn length_column(length: u32) -> i32 {
    i32::try_from(length).unwrap_or(i32::MAX)
}

pub(crate) async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<Option<SystemVariable>> {
    match VariableEntity::find_by_id(id).one(db).await? {
        Some(model) => Ok(assemble(db, vec![model]).await?.pop()),
        None => Ok(None),
    }
}

/// Insert a definition, plus its counter row for incremental variables.
pub(crate) async fn insert<C: ConnectionTrait>(
    db: &C,
    record: NewVariableRecord,
    incremental: Option<&IncrementalConfig>,
) -> AppResult<Uuid> {
    let now = Utc::now();
    let id = Uuid::new_v4();
    let active_model = system_variable::ActiveModel {
        id: Set(id),
        organization_id: Set(record.organization_id),
        group_id: Set(record.group_id),
        key: Set(record.key),
        name: Set(record.name),
        description: Set(record.description),
        data_type: Set(record.data_type.to_string()),
        is_required: Set(record.rules.is_required),
        min_length: Set(record.rules.min_length.map(length_column)),
        max_length: Set(record.rules.max_length.map(length_column)),
        pattern: Set(record.rules.pattern.filter(|p| !p.is_empty())),
        default_value: Set(record.default_value),
        created_at: Set(now),
        updated_at: Set(now),
    };
    active_model
        .insert(db)
        .await
        .conflict_on_unique("Variable key")?;

    if let Some(config) = incremental {
        incremental_config::active_model(id, config, now)
            .insert(db)
            .await?;
    }
    Ok(id)
}

/// Read the counter row under `SELECT ... FOR UPDATE`.
///
/// Concurrent generators for the same variable queue here until the holder
/// commits or rolls back.
pub(crate) async fn lock_incremental<C: ConnectionTrait>(
    db: &C,
    variable_id: Uuid,
) -> AppResult<Option<IncrementalConfig>> {
    let model = incremental_config::Entity::find_by_id(variable_id)
        .lock_exclusive()
        .one(db)
        .await?;
    model
        .map(IncrementalConfig::try_from)
        .transpose()
        .map_err(AppError::from)
}

pub(crate) async fn save_incremental<C: ConnectionTrait>(
    db: &C,
    variable_id: Uuid,
    config: &IncrementalConfig,
) -> AppResult<()> {
    incremental_config::active_model(variable_id, config, Utc::now())
        .update(db)
        .await?;
    Ok(())
}

/// Append an issued code to the ledger and make it the variable's value.
///
/// The ledger's unique index rejects a repeated code, failing the surrounding
/// transaction so the counter does not advance.
pub(crate) async fn record_code<C: ConnectionTrait>(
    db: &C,
    variable_id: Uuid,
    generated: &GeneratedNumber,
    generated_by: Option<Uuid>,
    at: DateTime<Utc>,
) -> AppResult<GeneratedCode> {
    let entry = generated_code::ActiveModel {
        id: Set(Uuid::new_v4()),
        variable_id: Set(variable_id),
        code: Set(generated.code.clone()),
        number: Set(generated.number),
        generated_by: Set(generated_by),
        generated_at: Set(at),
    };
    let model = entry.insert(db).await.map_err(|err| match err.sql_err() {
        Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => AppError::validation(format!(
            "Code '{}' was already issued for this variable; adjust the configuration",
            generated.code
        )),
        _ => AppError::Database(err),
    })?;

    upsert_value(db, variable_id, generated.code.clone(), generated_by, at).await?;
    Ok(GeneratedCode::from(model))
}

async fn upsert_value<C: ConnectionTrait>(
    db: &C,
    variable_id: Uuid,
    value: String,
    updated_by: Option<Uuid>,
    at: DateTime<Utc>,
) -> AppResult<()> {
    let row = system_variable_value::ActiveModel {
        variable_id: Set(variable_id),
        value: Set(value),
        updated_by: Set(updated_by),
        updated_at: Set(at),
    };
    system_variable_value::Entity::insert(row)
        .on_conflict(
            OnConflict::column(system_variable_value::Column::VariableId)
                .update_columns([
                    system_variable_value::Column::Value,
                    system_variable_value::Column::UpdatedBy,
                    system_variable_value::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec(db)
        .await?;
    Ok(())
}

/// Join definitions with their value and counter rows.
async fn assemble<C: ConnectionTrait>(db: &C, models: Vec<system_variable::Model>) -> AppResult<Vec<SystemVariable>> {
    if models.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();

    let mut values: HashMap<Uuid, String> = system_variable_value::Entity::find()
        .filter(system_variable_value::Column::VariableId.is_in(ids.clone()))
        .all(db)
        .await?
        .into_iter()
        .map(|v| (v.variable_id, v.value))
        .collect();

    let mut counters: HashMap<Uuid, incremental_config::Model> = incremental_config::Entity::find()
        .filter(incremental_config::Column::VariableId.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.variable_id, c))
        .collect();

    models
        .into_iter()
        .map(|model| {
            let incremental = counters
                .remove(&model.id)
                .map(IncrementalConfig::try_from)
                .transpose()?;
            let value = values.remove(&model.id);
            model.into_variable(value, incremental).map_err(AppError::from)
        })
        .collect()
}
