//! Ledger of issued incremental codes. `(variable_id, code)` is unique.

use sea_orm::entity::prelude::*;

use domain::GeneratedCode;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "generated_codes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub variable_id: Uuid,
    pub code: String,
    pub number: i64,
    pub generated_by: Option<Uuid>,
    pub generated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for GeneratedCode {
    fn from(model: Model) -> Self {
        GeneratedCode {
            id: model.id,
            variable_id: model.variable_id,
            code: model.code,
            number: model.number,
            generated_by: model.generated_by,
            generated_at: model.generated_at,
        }
    }
}
