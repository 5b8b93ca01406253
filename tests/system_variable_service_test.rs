//! System variable service tests: typed values and document numbering.

mod common;

use mockall::predicate::eq;
use uuid::Uuid;

use common::{group, numbering, reached_transaction, variable, TestUnitOfWork};
use domain::{IncrementalSettings, ResetFrequency, ValidationRules, VariableType};
use tenant_admin::errors::AppError;
use tenant_admin::services::{
    Caller, NewGroup, NewVariable, SystemVariableManager, SystemVariableService,
};

fn tenant() -> Caller {
    Caller::new(Uuid::new_v4(), Uuid::new_v4())
}

fn new_variable(data_type: VariableType) -> NewVariable {
    NewVariable {
        organization_id: None,
        group_id: None,
        key: "invoice.number".to_string(),
        name: "Invoice number".to_string(),
        description: None,
        data_type,
        validation: ValidationRules::default(),
        default_value: None,
        incremental: None,
    }
}

// =============================================================================
// Values
// =============================================================================

#[tokio::test]
async fn values_are_normalized_and_attributed() {
    let caller = tenant();
    let org = caller.organization_id;
    let id = Uuid::new_v4();

    let mut uow = TestUnitOfWork::new();
    uow.system_variables
        .expect_find_by_id()
        .with(eq(id))
        .times(2)
        .returning(move |id| {
            let mut flag = variable(id, org, VariableType::Boolean);
            flag.value = Some("true".to_string());
            Ok(Some(flag))
        });
    uow.system_variables
        .expect_set_value()
        .withf(move |vid, value, updated_by| {
            *vid == id && value.as_deref() == Some("true") && *updated_by == caller.user_id
        })
        .times(1)
        .returning(|_, _, _| Ok(()));

    let service = SystemVariableManager::new(uow.build());
    let updated = service
        .set_value(caller, id, Some("Yes".to_string()))
        .await
        .unwrap();
    assert_eq!(updated.value.as_deref(), Some("true"));
}

#[tokio::test]
async fn malformed_values_are_rejected() {
    let caller = tenant();
    let org = caller.organization_id;

    let mut uow = TestUnitOfWork::new();
    uow.system_variables
        .expect_find_by_id()
        .returning(move |id| Ok(Some(variable(id, org, VariableType::Number))));
    uow.system_variables.expect_set_value().never();

    let service = SystemVariableManager::new(uow.build());
    let result = service
        .set_value(caller, Uuid::new_v4(), Some("twelve".to_string()))
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn incremental_values_cannot_be_set_directly() {
    let caller = tenant();
    let org = caller.organization_id;

    let mut uow = TestUnitOfWork::new();
    uow.system_variables
        .expect_find_by_id()
        .returning(move |id| Ok(Some(numbering(id, org))));
    uow.system_variables.expect_set_value().never();

    let service = SystemVariableManager::new(uow.build());
    let result = service
        .set_value(caller, Uuid::new_v4(), Some("INV-9999".to_string()))
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn variables_of_other_tenants_are_not_found() {
    let mut uow = TestUnitOfWork::new();
    uow.system_variables
        .expect_find_by_id()
        .returning(|id| Ok(Some(numbering(id, Uuid::new_v4()))));

    let service = SystemVariableManager::new(uow.build());
    let id = Uuid::new_v4();

    assert!(matches!(
        service.get(tenant(), id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        service.generate(tenant(), id).await,
        Err(AppError::NotFound(_))
    ));
}

// =============================================================================
// Definitions and groups
// =============================================================================

#[tokio::test]
async fn numbering_settings_require_an_incremental_variable() {
    let mut variable = new_variable(VariableType::Text);
    variable.incremental = Some(IncrementalSettings::default());

    let service = SystemVariableManager::new(TestUnitOfWork::new().build());
    let result = service.create(tenant(), variable).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn yearly_reset_needs_a_year_token() {
    let mut variable = new_variable(VariableType::Incremental);
    variable.incremental = Some(IncrementalSettings {
        prefix: "INV-".to_string(),
        reset_frequency: ResetFrequency::Yearly,
        ..IncrementalSettings::default()
    });

    let service = SystemVariableManager::new(TestUnitOfWork::new().build());
    let result = service.create(tenant(), variable).await;
    assert!(matches!(result, Err(AppError::Validation(msg)) if msg.contains("{YYYY}")));
}

#[tokio::test]
async fn valid_definition_is_created_in_a_transaction() {
    let mut variable = new_variable(VariableType::Incremental);
    variable.incremental = Some(IncrementalSettings {
        prefix: "INV-{YYYY}-".to_string(),
        reset_frequency: ResetFrequency::Yearly,
        ..IncrementalSettings::default()
    });

    let service = SystemVariableManager::new(TestUnitOfWork::new().build());
    let result = service.create(tenant(), variable).await;
    assert!(reached_transaction(&result));
}

#[tokio::test]
async fn groups_of_other_tenants_cannot_be_joined() {
    let caller = tenant();
    let mut variable = new_variable(VariableType::Text);
    variable.group_id = Some(Uuid::new_v4());

    let mut uow = TestUnitOfWork::new();
    uow.system_variables
        .expect_find_group()
        .returning(|id| Ok(Some(group(id, Uuid::new_v4()))));

    let service = SystemVariableManager::new(uow.build());
    let result = service.create(caller, variable).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn groups_with_variables_cannot_be_deleted() {
    let caller = tenant();
    let org = caller.organization_id;

    let mut uow = TestUnitOfWork::new();
    uow.system_variables
        .expect_find_group()
        .returning(move |id| Ok(Some(group(id, org))));
    uow.system_variables
        .expect_count_variables_in_group()
        .returning(|_| Ok(2));
    uow.system_variables.expect_delete_group().never();

    let service = SystemVariableManager::new(uow.build());
    let result = service.delete_group(caller, Uuid::new_v4()).await;
    assert!(matches!(result, Err(AppError::Validation(msg)) if msg.contains("2 variable")));
}

#[tokio::test]
async fn group_names_are_trimmed() {
    let caller = tenant();
    let org = caller.organization_id;

    let mut uow = TestUnitOfWork::new();
    uow.system_variables
        .expect_create_group()
        .withf(move |record| record.name == "Billing" && record.organization_id == org)
        .returning(|record| {
            let mut created = group(Uuid::new_v4(), record.organization_id);
            created.name = record.name;
            Ok(created)
        });

    let service = SystemVariableManager::new(uow.build());
    let created = service
        .create_group(
            caller,
            NewGroup {
                organization_id: None,
                name: "  Billing ".to_string(),
                description: None,
                sort_order: 1,
            },
        )
        .await
        .unwrap();
    assert_eq!(created.name, "Billing");
}

// =============================================================================
// Numbering
// =============================================================================

#[tokio::test]
async fn preview_shows_the_next_code_without_issuing_it() {
    let caller = tenant();
    let org = caller.organization_id;

    let mut uow = TestUnitOfWork::new();
    uow.system_variables
        .expect_find_by_id()
        .returning(move |id| Ok(Some(numbering(id, org))));

    let service = SystemVariableManager::new(uow.build());
    let next = service.preview_next(caller, Uuid::new_v4()).await.unwrap();
    assert_eq!(next.code, "INV-0001");
    assert_eq!(next.number, 1);
    assert!(!next.reset);
}

#[tokio::test]
async fn only_incremental_variables_generate_codes() {
    let caller = tenant();
    let org = caller.organization_id;

    let mut uow = TestUnitOfWork::new();
    uow.system_variables
        .expect_find_by_id()
        .returning(move |id| Ok(Some(variable(id, org, VariableType::Text))));

    let service = SystemVariableManager::new(uow.build());
    let id = Uuid::new_v4();
    assert!(matches!(
        service.generate(caller, id).await,
        Err(AppError::Validation(msg)) if msg.contains("not incremental")
    ));
    assert!(matches!(
        service.preview_next(caller, id).await,
        Err(AppError::Validation(_))
    ));
}

#[tokio::test]
async fn generation_runs_inside_a_transaction() {
    let caller = tenant();
    let org = caller.organization_id;

    let mut uow = TestUnitOfWork::new();
    uow.system_variables
        .expect_find_by_id()
        .returning(move |id| Ok(Some(numbering(id, org))));

    let service = SystemVariableManager::new(uow.build());
    let result = service.generate(caller, Uuid::new_v4()).await;
    assert!(reached_transaction(&result));
}

#[tokio::test]
async fn invalid_numbering_is_rejected_before_locking() {
    let caller = tenant();
    let org = caller.organization_id;

    let mut uow = TestUnitOfWork::new();
    uow.system_variables
        .expect_find_by_id()
        .returning(move |id| Ok(Some(numbering(id, org))));

    let service = SystemVariableManager::new(uow.build());
    let settings = IncrementalSettings {
        start_number: -5,
        ..IncrementalSettings::default()
    };
    let result = service
        .configure_incremental(caller, Uuid::new_v4(), settings)
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}
