//! Migration: Seed the permission catalogue, the SYSTEM organization and
//! its Super Admin role.

use domain::{permissions, SUPER_ADMIN_ROLE_ID, SYSTEM_ORGANIZATION_ID};
use sea_orm_migration::prelude::*;
use uuid::Uuid;

#[derive(DeriveMigrationName)]
pub struct Migration;

const GRANT_SUPER_ADMIN_SQL: &str = r"
INSERT INTO role_permissions (role_id, permission_id)
SELECT '00000000-0000-0000-0000-000000000002'::uuid, id
FROM permissions
WHERE code = '*'
ON CONFLICT DO NOTHING;
";

const REVOKE_SEED_SQL: &str = r"
DELETE FROM role_permissions WHERE role_id = '00000000-0000-0000-0000-000000000002'::uuid;
DELETE FROM roles WHERE id = '00000000-0000-0000-0000-000000000002'::uuid;
DELETE FROM organizations WHERE id = '00000000-0000-0000-0000-000000000001'::uuid;
DELETE FROM permissions;
";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut catalogue = Query::insert();
        catalogue
            .into_table(Permissions::Table)
            .columns([Permissions::Id, Permissions::Code, Permissions::Description])
            .on_conflict(OnConflict::column(Permissions::Code).do_nothing().to_owned());
        for (code, description) in permissions::CATALOGUE {
            catalogue
                .values([Uuid::new_v4().into(), (*code).into(), (*description).into()])
                .map_err(seed_error)?;
        }
        manager.exec_stmt(catalogue).await?;

        let mut organization = Query::insert();
        organization
            .into_table(Organizations::Table)
            .columns([
                Organizations::Id,
                Organizations::Name,
                Organizations::Code,
                Organizations::Description,
            ])
            .values([
                SYSTEM_ORGANIZATION_ID.into(),
                "SYSTEM".into(),
                "SYSTEM".into(),
                "Platform administration".into(),
            ])
            .map_err(seed_error)?
            .on_conflict(OnConflict::column(Organizations::Id).do_nothing().to_owned());
        manager.exec_stmt(organization).await?;

        let mut role = Query::insert();
        role.into_table(Roles::Table)
            .columns([
                Roles::Id,
                Roles::OrganizationId,
                Roles::Name,
                Roles::Description,
                Roles::IsSystem,
            ])
            .values([
                SUPER_ADMIN_ROLE_ID.into(),
                SYSTEM_ORGANIZATION_ID.into(),
                "Super Admin".into(),
                "Full access to every organization".into(),
                true.into(),
            ])
            .map_err(seed_error)?
            .on_conflict(OnConflict::column(Roles::Id).do_nothing().to_owned());
        manager.exec_stmt(role).await?;

        manager
            .get_connection()
            .execute_unprepared(GRANT_SUPER_ADMIN_SQL)
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(REVOKE_SEED_SQL)
            .await?;
        Ok(())
    }
}

fn seed_error(err: sea_query::error::Error) -> DbErr {
    DbErr::Migration(format!("Invalid seed statement: {}", err))
}

#[derive(Iden)]
enum Permissions {
    Table,
    Id,
    Code,
    Description,
}

#[derive(Iden)]
enum Organizations {
    Table,
    Id,
    Name,
    Code,
    Description,
}

#[derive(Iden)]
enum Roles {
    Table,
    Id,
    OrganizationId,
    Name,
    Description,
    IsSystem,
}
