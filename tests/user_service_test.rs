//! Organization, role and user service tests.

mod common;

use std::sync::Arc;

use mockall::predicate::eq;
use uuid::Uuid;

use common::{organization, reached_transaction, role, user, TestUnitOfWork};
use domain::{OrganizationChanges, SYSTEM_ORGANIZATION_ID};
use tenant_admin::errors::AppError;
use tenant_admin::infra::MockPermissionCache;
use tenant_admin::services::{
    Caller, NewUser, OrganizationManager, OrganizationService, RoleManager, RoleService,
    UserManager, UserService, UserUpdate,
};
use tenant_admin::types::PaginationParams;

fn tenant() -> Caller {
    Caller::new(Uuid::new_v4(), Uuid::new_v4())
}

fn platform_admin() -> Caller {
    Caller::new(Uuid::new_v4(), SYSTEM_ORGANIZATION_ID)
}

fn quiet_cache() -> Arc<MockPermissionCache> {
    let mut cache = MockPermissionCache::new();
    cache.expect_invalidate_permissions().returning(|_| Ok(()));
    Arc::new(cache)
}

// =============================================================================
// Organizations
// =============================================================================

#[tokio::test]
async fn tenant_lists_only_its_own_organization() {
    let caller = tenant();
    let own = caller.organization_id;

    let mut uow = TestUnitOfWork::new();
    uow.organizations
        .expect_list()
        .withf(move |_, only| *only == Some(own))
        .returning(move |_, _| Ok((vec![organization(own)], 1)));

    let service = OrganizationManager::new(uow.build());
    let page = service.list(caller, PaginationParams::default()).await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.meta.total, 1);
}

#[tokio::test]
async fn platform_admin_lists_every_organization() {
    let mut uow = TestUnitOfWork::new();
    uow.organizations
        .expect_list()
        .withf(|_, only| only.is_none())
        .returning(|_, _| Ok((Vec::new(), 0)));

    let service = OrganizationManager::new(uow.build());
    assert!(service
        .list(platform_admin(), PaginationParams::default())
        .await
        .is_ok());
}

#[tokio::test]
async fn only_system_members_create_organizations() {
    let mut uow = TestUnitOfWork::new();
    uow.organizations.expect_create().never();

    let service = OrganizationManager::new(uow.build());
    let result = service
        .create(tenant(), "Globex".to_string(), "GLOBEX".to_string(), None)
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn organization_codes_are_normalized_on_create() {
    let mut uow = TestUnitOfWork::new();
    uow.organizations
        .expect_create()
        .withf(|new| new.code == "GLOBEX" && new.name == "Globex")
        .returning(|new| {
            let mut org = organization(Uuid::new_v4());
            org.code = new.code;
            org.name = new.name;
            Ok(org)
        });

    let service = OrganizationManager::new(uow.build());
    let created = service
        .create(platform_admin(), " Globex ".to_string(), "globex".to_string(), None)
        .await
        .unwrap();
    assert_eq!(created.code, "GLOBEX");
}

#[tokio::test]
async fn system_organization_cannot_be_deleted() {
    let mut uow = TestUnitOfWork::new();
    uow.organizations
        .expect_find_by_id()
        .with(eq(SYSTEM_ORGANIZATION_ID))
        .returning(|id| Ok(Some(organization(id))));

    let service = OrganizationManager::new(uow.build());
    let result = service.delete(platform_admin(), SYSTEM_ORGANIZATION_ID).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn system_organization_cannot_be_deactivated() {
    let mut uow = TestUnitOfWork::new();
    uow.organizations
        .expect_find_by_id()
        .returning(|id| Ok(Some(organization(id))));
    uow.organizations.expect_update().never();

    let service = OrganizationManager::new(uow.build());
    let changes = OrganizationChanges {
        is_active: Some(false),
        ..OrganizationChanges::default()
    };
    let result = service
        .update(platform_admin(), SYSTEM_ORGANIZATION_ID, changes)
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn other_tenants_are_not_found() {
    let mut uow = TestUnitOfWork::new();
    uow.organizations.expect_find_by_id().never();

    let service = OrganizationManager::new(uow.build());
    let result = service.get(tenant(), Uuid::new_v4()).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

// =============================================================================
// Roles
// =============================================================================

#[tokio::test]
async fn system_roles_are_immutable() {
    let caller = platform_admin();
    let role_id = Uuid::new_v4();

    let mut uow = TestUnitOfWork::new();
    uow.roles.expect_find_by_id().returning(|id| {
        let mut role = role(id, SYSTEM_ORGANIZATION_ID);
        role.is_system = true;
        Ok(Some(role))
    });
    uow.roles.expect_update().never();

    let service = RoleManager::new(uow.build(), quiet_cache());
    let result = service
        .update(caller, role_id, Some("Renamed".to_string()), None)
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn assigned_roles_cannot_be_deleted() {
    let caller = tenant();
    let org = caller.organization_id;

    let mut uow = TestUnitOfWork::new();
    uow.roles
        .expect_find_by_id()
        .returning(move |id| Ok(Some(role(id, org))));
    uow.roles.expect_count_assignments().returning(|_| Ok(3));
    uow.roles.expect_delete().never();

    let service = RoleManager::new(uow.build(), quiet_cache());
    let result = service.delete(caller, Uuid::new_v4()).await;
    assert!(matches!(result, Err(AppError::Validation(msg)) if msg.contains("3 user")));
}

#[tokio::test]
async fn roles_of_other_tenants_are_hidden() {
    let mut uow = TestUnitOfWork::new();
    uow.roles
        .expect_find_by_id()
        .returning(|id| Ok(Some(role(id, Uuid::new_v4()))));

    let service = RoleManager::new(uow.build(), quiet_cache());
    let result = service.get(tenant(), Uuid::new_v4()).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn unknown_permissions_are_rejected_before_writing() {
    let caller = tenant();

    let mut uow = TestUnitOfWork::new();
    uow.organizations
        .expect_find_by_id()
        .returning(|id| Ok(Some(organization(id))));

    let service = RoleManager::new(uow.build(), quiet_cache());
    let result = service
        .create(
            caller,
            None,
            "Auditor".to_string(),
            None,
            vec!["users.read".to_string(), "users.teleport".to_string()],
        )
        .await;
    assert!(matches!(result, Err(AppError::Validation(msg)) if msg.contains("users.teleport")));

    let mut uow = TestUnitOfWork::new();
    uow.organizations
        .expect_find_by_id()
        .returning(|id| Ok(Some(organization(id))));
    let service = RoleManager::new(uow.build(), quiet_cache());
    let result = service
        .create(caller, None, "Auditor".to_string(), None, vec!["users.read".to_string()])
        .await;
    assert!(reached_transaction(&result));
}

#[tokio::test]
async fn tenant_cannot_create_roles_elsewhere() {
    let service = RoleManager::new(TestUnitOfWork::new().build(), quiet_cache());
    let result = service
        .create(tenant(), Some(Uuid::new_v4()), "Auditor".to_string(), None, Vec::new())
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

// =============================================================================
// Users
// =============================================================================

#[tokio::test]
async fn users_cannot_delete_themselves() {
    let caller = tenant();

    let mut uow = TestUnitOfWork::new();
    uow.users.expect_soft_delete().never();

    let service = UserManager::new(uow.build(), quiet_cache());
    let result = service.delete(caller, caller.user_id).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn users_cannot_deactivate_themselves() {
    let caller = tenant();
    let org = caller.organization_id;

    let mut uow = TestUnitOfWork::new();
    uow.users
        .expect_find_by_id()
        .returning(move |id| Ok(Some(user(id, org))));
    uow.users.expect_update().never();

    let service = UserManager::new(uow.build(), quiet_cache());
    let update = UserUpdate {
        is_active: Some(false),
        ..UserUpdate::default()
    };
    let result = service.update(caller, caller.user_id, update).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn soft_delete_drops_cached_permissions() {
    let caller = tenant();
    let org = caller.organization_id;
    let target = Uuid::new_v4();

    let mut uow = TestUnitOfWork::new();
    uow.users
        .expect_find_by_id()
        .with(eq(target))
        .returning(move |id| Ok(Some(user(id, org))));
    uow.users
        .expect_soft_delete()
        .with(eq(target))
        .times(1)
        .returning(|_| Ok(()));

    let mut cache = MockPermissionCache::new();
    cache
        .expect_invalidate_permissions()
        .withf(move |ids| ids.len() == 1 && ids[0] == target)
        .times(1)
        .returning(|_| Ok(()));

    let service = UserManager::new(uow.build(), Arc::new(cache));
    service.delete(caller, target).await.unwrap();
}

#[tokio::test]
async fn emails_stay_reserved_by_deleted_accounts() {
    let caller = tenant();
    let org = caller.organization_id;

    let mut uow = TestUnitOfWork::new();
    uow.organizations
        .expect_find_by_id()
        .returning(|id| Ok(Some(organization(id))));
    uow.users.expect_find_by_email_with_deleted().returning(move |_| {
        let mut existing = user(Uuid::new_v4(), org);
        existing.deleted_at = Some(chrono::Utc::now());
        Ok(Some(existing))
    });

    let service = UserManager::new(uow.build(), quiet_cache());
    let new_user = NewUser {
        organization_id: None,
        email: "JANE@acme.example".to_string(),
        password: "SecurePass123!".to_string(),
        name: "Jane Doe".to_string(),
        is_active: true,
        role_ids: Vec::new(),
    };
    let result = service.create(caller, new_user).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn roles_must_belong_to_the_users_organization() {
    let caller = tenant();
    let org = caller.organization_id;
    let target = Uuid::new_v4();
    let foreign_role = Uuid::new_v4();

    let mut uow = TestUnitOfWork::new();
    uow.users
        .expect_find_by_id()
        .returning(move |id| Ok(Some(user(id, org))));
    uow.roles
        .expect_find_many()
        .returning(|ids| Ok(ids.into_iter().map(|id| role(id, Uuid::new_v4())).collect()));

    let service = UserManager::new(uow.build(), quiet_cache());
    let result = service.set_roles(caller, target, vec![foreign_role]).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn missing_roles_are_not_found() {
    let caller = tenant();
    let org = caller.organization_id;

    let mut uow = TestUnitOfWork::new();
    uow.users
        .expect_find_by_id()
        .returning(move |id| Ok(Some(user(id, org))));
    uow.roles.expect_find_many().returning(|_| Ok(Vec::new()));

    let service = UserManager::new(uow.build(), quiet_cache());
    let result = service
        .set_roles(caller, Uuid::new_v4(), vec![Uuid::new_v4(), Uuid::new_v4()])
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn restore_reaches_deleted_accounts() {
    let caller = tenant();
    let org = caller.organization_id;
    let target = Uuid::new_v4();

    let mut uow = TestUnitOfWork::new();
    uow.users.expect_find_by_id().never();
    uow.users
        .expect_find_by_id_with_deleted()
        .returning(move |id| {
            let mut deleted = user(id, org);
            deleted.deleted_at = Some(chrono::Utc::now());
            Ok(Some(deleted))
        });
    uow.users
        .expect_restore()
        .returning(move |id| Ok(user(id, org)));

    let service = UserManager::new(uow.build(), quiet_cache());
    let restored = service.restore(caller, target).await.unwrap();
    assert!(!restored.is_deleted());
}

#[tokio::test]
async fn listing_users_is_confined_to_the_tenant() {
    let caller = tenant();
    let own = caller.organization_id;

    let mut uow = TestUnitOfWork::new();
    uow.users
        .expect_list()
        .withf(move |org, _, include_deleted| *org == Some(own) && *include_deleted)
        .returning(|_, _, _| Ok((Vec::new(), 0)));

    let service = UserManager::new(uow.build(), quiet_cache());
    assert!(service
        .list(caller, None, PaginationParams::default(), true)
        .await
        .is_ok());

    let service = UserManager::new(TestUnitOfWork::new().build(), quiet_cache());
    let result = service
        .list(caller, Some(Uuid::new_v4()), PaginationParams::default(), false)
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}
