//! System variable service - typed per-organization settings and document numbering.
//!
//! Code generation runs in one transaction: the counter row is locked with
//! `SELECT ... FOR UPDATE`, advanced, written back and the issued code is
//! appended to the ledger. Concurrent generators for the same variable
//! serialize on the row lock, and a failure anywhere rolls the counter back.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::Caller;
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::{GroupChanges, NewGroupRecord, NewVariableRecord, UnitOfWork, VariableChanges};
use crate::types::{Paginated, PaginationParams};
use domain::{
    validate_value, validate_variable_key, GeneratedCode, GeneratedNumber, IncrementalConfig,
    IncrementalSettings, SystemVariable, SystemVariableGroup, ValidationRules, VariableType,
};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

const MAX_GROUP_NAME_LENGTH: usize = 100;

#[derive(Debug, Clone)]
pub struct NewGroup {
    pub organization_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i32,
}

#[derive(Debug, Clone)]
pub struct NewVariable {
    pub organization_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub data_type: VariableType,
    pub validation: ValidationRules,
    pub default_value: Option<String>,
    /// Numbering settings of an incremental variable; defaults when absent.
    pub incremental: Option<IncrementalSettings>,
}

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait SystemVariableService: Send + Sync {
    async fn list_groups(&self, caller: Caller, organization_id: Option<Uuid>) -> AppResult<Vec<SystemVariableGroup>>;

    async fn create_group(&self, caller: Caller, group: NewGroup) -> AppResult<SystemVariableGroup>;

    async fn update_group(&self, caller: Caller, id: Uuid, changes: GroupChanges) -> AppResult<SystemVariableGroup>;

    /// Delete a group no variable references.
    async fn delete_group(&self, caller: Caller, id: Uuid) -> AppResult<()>;

    async fn list(
        &self,
        caller: Caller,
        organization_id: Option<Uuid>,
        group_id: Option<Uuid>,
        params: PaginationParams,
    ) -> AppResult<Paginated<SystemVariable>>;

    async fn get(&self, caller: Caller, id: Uuid) -> AppResult<SystemVariable>;

    async fn create(&self, caller: Caller, variable: NewVariable) -> AppResult<SystemVariable>;

    /// Update a definition. The data type is fixed at creation.
    async fn update(&self, caller: Caller, id: Uuid, changes: VariableChanges) -> AppResult<SystemVariable>;

    async fn delete(&self, caller: Caller, id: Uuid) -> AppResult<()>;

    /// Validate and store a value; an empty optional value clears it.
    async fn set_value(&self, caller: Caller, id: Uuid, value: Option<String>) -> AppResult<SystemVariable>;

    async fn configure_incremental(
        &self,
        caller: Caller,
        id: Uuid,
        settings: IncrementalSettings,
    ) -> AppResult<SystemVariable>;

    /// The code the next generation would issue, without issuing it.
    async fn preview_next(&self, caller: Caller, id: Uuid) -> AppResult<GeneratedNumber>;

    /// Issue the next code.
    async fn generate(&self, caller: Caller, id: Uuid) -> AppResult<GeneratedCode>;

    async fn list_codes(&self, caller: Caller, id: Uuid, params: PaginationParams) -> AppResult<Paginated<GeneratedCode>>;
}

pub struct SystemVariableManager<U: UnitOfWork> {
    uow: Arc<U>,
}

impl<U: UnitOfWork> SystemVariableManager<U> {
    pub fn new(uow: Arc<U>) -> Self {
        Self { uow }
    }

    async fn visible(&self, caller: Caller, id: Uuid) -> AppResult<SystemVariable> {
        let variable = self
            .uow
            .system_variables()
            .find_by_id(id)
            .await?
            .ok_or_not_found("System variable")?;
        caller.ensure_visible(variable.organization_id, "System variable")?;
        Ok(variable)
    }

    async fn incremental(&self, caller: Caller, id: Uuid) -> AppResult<SystemVariable> {
        let variable = self.visible(caller, id).await?;
        if !variable.data_type.is_incremental() {
            return Err(AppError::validation(format!(
                "Variable '{}' is not incremental",
                variable.key
            )));
        }
        Ok(variable)
    }

    async fn visible_group(&self, caller: Caller, id: Uuid) -> AppResult<SystemVariableGroup> {
        let group = self
            .uow
            .system_variables()
            .find_group(id)
            .await?
            .ok_or_not_found("Group")?;
        caller.ensure_visible(group.organization_id, "Group")?;
        Ok(group)
    }

    /// A variable may only join a group of its own organization.
    async fn ensure_group_in(&self, organization_id: Uuid, group_id: Uuid) -> AppResult<()> {
        let group = self
            .uow
            .system_variables()
            .find_group(group_id)
            .await?
            .ok_or_not_found("Group")?;
        if group.organization_id != organization_id {
            return Err(AppError::not_found("Group"));
        }
        Ok(())
    }
}

fn validate_group_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Group name is required"));
    }
    if name.chars().count() > MAX_GROUP_NAME_LENGTH {
        return Err(AppError::validation(format!(
            "Group name must be at most {} characters",
            MAX_GROUP_NAME_LENGTH
        )));
    }
    Ok(name.to_string())
}

fn required_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Name is required"));
    }
    Ok(name.to_string())
}

/// Normalize a default value against the variable's type and rules.
fn normalized_default(
    data_type: VariableType,
    rules: &ValidationRules,
    default_value: Option<String>,
) -> AppResult<Option<String>> {
    match default_value {
        None => Ok(None),
        Some(_) if data_type.is_incremental() => Err(AppError::validation(
            "Incremental variables have no default value",
        )),
        Some(raw) => Ok(validate_value(data_type, rules, Some(raw.as_str()))?),
    }
}

#[async_trait]
impl<U: UnitOfWork> SystemVariableService for SystemVariableManager<U> {
    async fn list_groups(&self, caller: Caller, organization_id: Option<Uuid>) -> AppResult<Vec<SystemVariableGroup>> {
        let organization_id = caller.scope(organization_id)?;
        self.uow.system_variables().list_groups(organization_id).await
    }

    async fn create_group(&self, caller: Caller, group: NewGroup) -> AppResult<SystemVariableGroup> {
        let organization_id = caller.scope(group.organization_id)?;
        let record = NewGroupRecord {
            organization_id,
            name: validate_group_name(&group.name)?,
            description: group.description.filter(|d| !d.trim().is_empty()),
            sort_order: group.sort_order,
        };
        self.uow.system_variables().create_group(record).await
    }

    async fn update_group(&self, caller: Caller, id: Uuid, mut changes: GroupChanges) -> AppResult<SystemVariableGroup> {
        self.visible_group(caller, id).await?;
        changes.name = changes.name.as_deref().map(validate_group_name).transpose()?;
        self.uow.system_variables().update_group(id, changes).await
    }

    async fn delete_group(&self, caller: Caller, id: Uuid) -> AppResult<()> {
        self.visible_group(caller, id).await?;

        let members = self.uow.system_variables().count_variables_in_group(id).await?;
        if members > 0 {
            return Err(AppError::validation(format!(
                "Group still contains {} variable(s)",
                members
            )));
        }
        self.uow.system_variables().delete_group(id).await
    }

    async fn list(
        &self,
        caller: Caller,
        organization_id: Option<Uuid>,
        group_id: Option<Uuid>,
        params: PaginationParams,
    ) -> AppResult<Paginated<SystemVariable>> {
        let organization_id = caller.scope(organization_id)?;
        let (items, total) = self
            .uow
            .system_variables()
            .list(organization_id, group_id, &params)
            .await?;
        Ok(Paginated::new(items, &params, total))
    }

    async fn get(&self, caller: Caller, id: Uuid) -> AppResult<SystemVariable> {
        self.visible(caller, id).await
    }

    async fn create(&self, caller: Caller, variable: NewVariable) -> AppResult<SystemVariable> {
        let organization_id = caller.scope(variable.organization_id)?;
        if let Some(group_id) = variable.group_id {
            self.ensure_group_in(organization_id, group_id).await?;
        }

        let data_type = variable.data_type;
        variable.validation.validate()?;
        let incremental = match (data_type.is_incremental(), variable.incremental) {
            (true, settings) => Some(IncrementalConfig::new(settings.unwrap_or_default(), Utc::now())?),
            (false, None) => None,
            (false, Some(_)) => {
                return Err(AppError::validation(
                    "Numbering settings apply to incremental variables only",
                ))
            }
        };

        let record = NewVariableRecord {
            organization_id,
            group_id: variable.group_id,
            key: validate_variable_key(&variable.key)?,
            name: required_name(&variable.name)?,
            description: variable.description.filter(|d| !d.trim().is_empty()),
            data_type,
            default_value: normalized_default(data_type, &variable.validation, variable.default_value)?,
            rules: variable.validation,
        };

        let created = self
            .uow
            .transaction(|ctx| {
                Box::pin(async move {
                    ctx.system_variables()
                        .create(record, incremental.as_ref())
                        .await
                })
            })
            .await?;

        tracing::info!(
            variable_id = %created.id,
            key = %created.key,
            data_type = %created.data_type,
            "System variable created"
        );
        Ok(created)
    }

    async fn update(&self, caller: Caller, id: Uuid, mut changes: VariableChanges) -> AppResult<SystemVariable> {
        let current = self.visible(caller, id).await?;

        if let Some(Some(group_id)) = changes.group_id {
            self.ensure_group_in(current.organization_id, group_id).await?;
        }
        changes.name = changes.name.as_deref().map(required_name).transpose()?;

        let rules = match &changes.rules {
            Some(rules) => {
                rules.validate()?;
                rules.clone()
            }
            None => current.validation.clone(),
        };

        match changes.default_value.take() {
            Some(default_value) => {
                changes.default_value =
                    Some(normalized_default(current.data_type, &rules, default_value)?);
            }
            None if changes.rules.is_some() => {
                normalized_default(current.data_type, &rules, current.default_value.clone())?;
            }
            None => {}
        }

        if changes.rules.is_some() && !current.data_type.is_incremental() {
            if let Some(value) = current.value.as_deref() {
                validate_value(current.data_type, &rules, Some(value)).map_err(|e| {
                    AppError::validation(format!("Stored value violates the new rules: {}", e))
                })?;
            }
        }

        self.uow.system_variables().update(id, changes).await
    }

    async fn delete(&self, caller: Caller, id: Uuid) -> AppResult<()> {
        self.visible(caller, id).await?;
        self.uow.system_variables().delete(id).await?;
        tracing::info!(variable_id = %id, "System variable deleted");
        Ok(())
    }

    async fn set_value(&self, caller: Caller, id: Uuid, value: Option<String>) -> AppResult<SystemVariable> {
        let variable = self.visible(caller, id).await?;
        let normalized = validate_value(variable.data_type, &variable.validation, value.as_deref())?;

        let repo = self.uow.system_variables();
        repo.set_value(id, normalized, caller.user_id).await?;
        repo.find_by_id(id).await?.ok_or_not_found("System variable")
    }

    async fn configure_incremental(
        &self,
        caller: Caller,
        id: Uuid,
        settings: IncrementalSettings,
    ) -> AppResult<SystemVariable> {
        self.incremental(caller, id).await?;
        settings.validate()?;

        let updated = self
            .uow
            .transaction(|ctx| {
                Box::pin(async move {
                    let repo = ctx.system_variables();
                    let mut config = repo
                        .lock_incremental(id)
                        .await?
                        .ok_or_not_found("Incremental configuration")?;
                    // Read the clock only once the row lock is held.
                    config.reconfigure(settings, Utc::now())?;
                    repo.save_incremental(id, &config).await?;
                    repo.find_by_id(id).await?.ok_or_not_found("System variable")
                })
            })
            .await?;

        tracing::info!(variable_id = %id, "Incremental numbering reconfigured");
        Ok(updated)
    }

    async fn preview_next(&self, caller: Caller, id: Uuid) -> AppResult<GeneratedNumber> {
        let variable = self.incremental(caller, id).await?;
        let config = variable
            .incremental
            .ok_or_not_found("Incremental configuration")?;
        Ok(config.preview(Utc::now())?)
    }

    async fn generate(&self, caller: Caller, id: Uuid) -> AppResult<GeneratedCode> {
        self.incremental(caller, id).await?;
        let generated_by = caller.user_id;

        let issued = self
            .uow
            .transaction(|ctx| {
                Box::pin(async move {
                    let repo = ctx.system_variables();
                    let mut config = repo
                        .lock_incremental(id)
                        .await?
                        .ok_or_not_found("Incremental configuration")?;

                    // Read the clock only once the row lock is held.
                    let now = Utc::now();
                    let next = config.advance(now)?;
                    repo.save_incremental(id, &config).await?;
                    let issued = repo.record_code(id, &next, Some(generated_by), now).await?;
                    Ok((issued, next.reset))
                })
            })
            .await;

        match issued {
            Ok((issued, reset)) => {
                tracing::info!(
                    variable_id = %id,
                    code = %issued.code,
                    number = issued.number,
                    reset,
                    "Code generated"
                );
                Ok(issued)
            }
            Err(e) => {
                tracing::warn!(variable_id = %id, error = %e, "Code generation rolled back");
                Err(e)
            }
        }
    }

    async fn list_codes(&self, caller: Caller, id: Uuid, params: PaginationParams) -> AppResult<Paginated<GeneratedCode>> {
        self.visible(caller, id).await?;
        let (items, total) = self.uow.system_variables().list_codes(id, &params).await?;
        Ok(Paginated::new(items, &params, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incremental_variables_refuse_defaults() {
        let rules = ValidationRules::default();
        assert!(normalized_default(VariableType::Incremental, &rules, Some("INV-1".into())).is_err());
        assert_eq!(normalized_default(VariableType::Incremental, &rules, None).unwrap(), None);
    }

    #[test]
    fn defaults_are_normalized_like_values() {
        let rules = ValidationRules::default();
        assert_eq!(
            normalized_default(VariableType::Boolean, &rules, Some("YES".into())).unwrap(),
            Some("true".to_string())
        );
        assert!(normalized_default(VariableType::Number, &rules, Some("abc".into())).is_err());
    }

    #[test]
    fn group_names_are_trimmed_and_bounded() {
        assert_eq!(validate_group_name("  Billing ").unwrap(), "Billing");
        assert!(validate_group_name("   ").is_err());
        assert!(validate_group_name(&"g".repeat(MAX_GROUP_NAME_LENGTH + 1)).is_err());
    }
}
