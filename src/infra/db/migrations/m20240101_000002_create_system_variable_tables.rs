//! Migration: Create system variable tables and the generated code ledger.

use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_tenancy_tables::{Organizations, Users};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SystemVariableGroups::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SystemVariableGroups::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SystemVariableGroups::OrganizationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SystemVariableGroups::Name)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(ColumnDef::new(SystemVariableGroups::Description).text().null())
                    .col(
                        ColumnDef::new(SystemVariableGroups::SortOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SystemVariableGroups::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(SystemVariableGroups::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_system_variable_groups_organization")
                            .from(SystemVariableGroups::Table, SystemVariableGroups::OrganizationId)
                            .to(Organizations::Table, Organizations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_system_variable_groups_organization_name")
                    .table(SystemVariableGroups::Table)
                    .col(SystemVariableGroups::OrganizationId)
                    .col(SystemVariableGroups::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SystemVariables::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SystemVariables::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(SystemVariables::OrganizationId).uuid().not_null())
                    .col(ColumnDef::new(SystemVariables::GroupId).uuid().null())
                    .col(ColumnDef::new(SystemVariables::Key).string_len(100).not_null())
                    .col(ColumnDef::new(SystemVariables::Name).string_len(100).not_null())
                    .col(ColumnDef::new(SystemVariables::Description).text().null())
                    .col(ColumnDef::new(SystemVariables::DataType).string_len(20).not_null())
                    .col(
                        ColumnDef::new(SystemVariables::IsRequired)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(SystemVariables::MinLength).integer().null())
                    .col(ColumnDef::new(SystemVariables::MaxLength).integer().null())
                    .col(ColumnDef::new(SystemVariables::Pattern).text().null())
                    .col(ColumnDef::new(SystemVariables::DefaultValue).text().null())
                    .col(
                        ColumnDef::new(SystemVariables::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(SystemVariables::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_system_variables_organization")
                            .from(SystemVariables::Table, SystemVariables::OrganizationId)
                            .to(Organizations::Table, Organizations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_system_variables_group")
                            .from(SystemVariables::Table, SystemVariables::GroupId)
                            .to(SystemVariableGroups::Table, SystemVariableGroups::Id)
                            .on_delete(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_system_variables_organization_key")
                    .table(SystemVariables::Table)
                    .col(SystemVariables::OrganizationId)
                    .col(SystemVariables::Key)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SystemVariableValues::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SystemVariableValues::VariableId)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SystemVariableValues::Value).text().not_null())
                    .col(ColumnDef::new(SystemVariableValues::UpdatedBy).uuid().null())
                    .col(
                        ColumnDef::new(SystemVariableValues::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_system_variable_values_variable")
                            .from(SystemVariableValues::Table, SystemVariableValues::VariableId)
                            .to(SystemVariables::Table, SystemVariables::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_system_variable_values_user")
                            .from(SystemVariableValues::Table, SystemVariableValues::UpdatedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(IncrementalConfigs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IncrementalConfigs::VariableId)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(IncrementalConfigs::Prefix)
                            .string_len(50)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(IncrementalConfigs::Suffix)
                            .string_len(50)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(IncrementalConfigs::Padding)
                            .integer()
                            .not_null()
                            .check(Expr::col(IncrementalConfigs::Padding).between(0, 20)),
                    )
                    .col(
                        ColumnDef::new(IncrementalConfigs::StartNumber)
                            .big_integer()
                            .not_null()
                            .check(Expr::col(IncrementalConfigs::StartNumber).gte(0)),
                    )
                    .col(
                        ColumnDef::new(IncrementalConfigs::CurrentNumber)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IncrementalConfigs::ResetFrequency)
                            .string_len(10)
                            .not_null()
                            .default("never"),
                    )
                    .col(
                        ColumnDef::new(IncrementalConfigs::LastResetAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(IncrementalConfigs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_incremental_configs_variable")
                            .from(IncrementalConfigs::Table, IncrementalConfigs::VariableId)
                            .to(SystemVariables::Table, SystemVariables::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GeneratedCodes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(GeneratedCodes::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(GeneratedCodes::VariableId).uuid().not_null())
                    .col(ColumnDef::new(GeneratedCodes::Code).string_len(150).not_null())
                    .col(ColumnDef::new(GeneratedCodes::Number).big_integer().not_null())
                    .col(ColumnDef::new(GeneratedCodes::GeneratedBy).uuid().null())
                    .col(
                        ColumnDef::new(GeneratedCodes::GeneratedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_generated_codes_variable")
                            .from(GeneratedCodes::Table, GeneratedCodes::VariableId)
                            .to(SystemVariables::Table, SystemVariables::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_generated_codes_user")
                            .from(GeneratedCodes::Table, GeneratedCodes::GeneratedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Codes never repeat per variable, whatever the counter does.
        manager
            .create_index(
                Index::create()
                    .name("idx_generated_codes_variable_code")
                    .table(GeneratedCodes::Table)
                    .col(GeneratedCodes::VariableId)
                    .col(GeneratedCodes::Code)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_generated_codes_variable_generated_at")
                    .table(GeneratedCodes::Table)
                    .col(GeneratedCodes::VariableId)
                    .col(GeneratedCodes::GeneratedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GeneratedCodes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(IncrementalConfigs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SystemVariableValues::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SystemVariables::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SystemVariableGroups::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum SystemVariableGroups {
    Table,
    Id,
    OrganizationId,
    Name,
    Description,
    SortOrder,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum SystemVariables {
    Table,
    Id,
    OrganizationId,
    GroupId,
    Key,
    Name,
    Description,
    DataType,
    IsRequired,
    MinLength,
    MaxLength,
    Pattern,
    DefaultValue,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum SystemVariableValues {
    Table,
    VariableId,
    Value,
    UpdatedBy,
    UpdatedAt,
}

#[derive(Iden)]
enum IncrementalConfigs {
    Table,
    VariableId,
    Prefix,
    Suffix,
    Padding,
    StartNumber,
    CurrentNumber,
    ResetFrequency,
    LastResetAt,
    UpdatedAt,
}

#[derive(Iden)]
enum GeneratedCodes {
    Table,
    Id,
    VariableId,
    Code,
    Number,
    GeneratedBy,
    GeneratedAt,
}
