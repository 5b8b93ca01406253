//! Current value of a system variable. A missing row means "no value".

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "system_variable_values")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub variable_id: Uuid,
    pub value: String,
    pub updated_by: Option<Uuid>,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
