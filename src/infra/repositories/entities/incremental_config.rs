//! Counter state of an incremental system variable.
//!
//! Generation locks this row with `SELECT ... FOR UPDATE`.

use sea_orm::entity::prelude::*;
use sea_orm::Set;

use domain::{DomainError, DomainResult, IncrementalConfig, IncrementalSettings};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "incremental_configs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub variable_id: Uuid,
    pub prefix: String,
    pub suffix: String,
    pub padding: i32,
    pub start_number: i64,
    pub current_number: i64,
    pub reset_frequency: String,
    pub last_reset_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for IncrementalConfig {
    type Error = DomainError;

    fn try_from(model: Model) -> DomainResult<Self> {
        let padding = u32::try_from(model.padding)
            .map_err(|_| DomainError::internal("Stored padding is negative"))?;
        Ok(IncrementalConfig {
            settings: IncrementalSettings {
                prefix: model.prefix,
                suffix: model.suffix,
                padding,
                start_number: model.start_number,
                reset_frequency: model.reset_frequency.parse()?,
            },
            current_number: model.current_number,
            last_reset_at: model.last_reset_at,
        })
    }
}

/// Full row for `variable_id` holding `config`.
pub fn active_model(variable_id: Uuid, config: &IncrementalConfig, now: DateTimeUtc) -> ActiveModel {
    ActiveModel {
        variable_id: Set(variable_id),
        prefix: Set(config.settings.prefix.clone()),
        suffix: Set(config.settings.suffix.clone()),
        padding: Set(config.settings.padding as i32),
        start_number: Set(config.settings.start_number),
        current_number: Set(config.current_number),
        reset_frequency: Set(config.settings.reset_frequency.to_string()),
        last_reset_at: Set(config.last_reset_at),
        updated_at: Set(now),
    }
}
