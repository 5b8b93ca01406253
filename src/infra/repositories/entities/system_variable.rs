//! System variable definition entity.

use sea_orm::entity::prelude::*;

use domain::{DomainError, DomainResult, IncrementalConfig, SystemVariable, ValidationRules, VariableType};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "system_variables")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organization_id: Uuid,
    pub group_id: Option<Uuid>,
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub data_type: String,
    pub is_required: bool,
    pub min_length: Option<i32>,
    pub max_length: Option<i32>,
    pub pattern: Option<String>,
    pub default_value: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn data_type(&self) -> DomainResult<VariableType> {
        self.data_type.parse()
    }

    pub fn rules(&self) -> ValidationRules {
        ValidationRules {
            is_required: self.is_required,
            min_length: self.min_length.and_then(|n| u32::try_from(n).ok()),
            max_length: self.max_length.and_then(|n| u32::try_from(n).ok()),
            pattern: self.pattern.clone(),
        }
    }

    /// Assemble the domain variable from its definition, value and counter rows.
    pub fn into_variable(
        self,
        value: Option<String>,
        incremental: Option<IncrementalConfig>,
    ) -> DomainResult<SystemVariable> {
        let data_type = self.data_type().map_err(|_| {
            DomainError::internal(format!(
                "Stored variable {} has unknown type '{}'",
                self.id, self.data_type
            ))
        })?;
        let validation = self.rules();
        Ok(SystemVariable {
            id: self.id,
            organization_id: self.organization_id,
            group_id: self.group_id,
            key: self.key,
            name: self.name,
            description: self.description,
            data_type,
            validation,
            default_value: self.default_value,
            value,
            incremental,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
