//! System variable handlers: groups, definitions, values and document numbering.

use axum::{
    extract::{Extension, Path, Query, State},
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::{double_option, ScopeQuery};
use crate::api::extractors::ValidatedJson;
use crate::api::middleware::CurrentUser;
use crate::api::AppState;
use crate::errors::AppResult;
use crate::infra::{GroupChanges, VariableChanges};
use crate::services::{NewGroup, NewVariable};
use crate::types::{ApiResponse, Created, Paginated, PaginationParams};
use domain::{
    permissions, GeneratedCode, GeneratedNumber, IncrementalSettings, SystemVariable,
    SystemVariableGroup, ValidationRules, VariableType,
};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VariableListQuery {
    /// Organization to list; defaults to the caller's
    pub organization_id: Option<Uuid>,
    /// Only variables of this group
    pub group_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateGroupRequest {
    pub organization_id: Option<Uuid>,
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    #[schema(example = "Sales documents")]
    pub name: String,
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateGroupRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateVariableRequest {
    pub organization_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    /// Lower-case key, unique per organization
    #[validate(length(min = 1, max = 100, message = "Key must be 1 to 100 characters"))]
    #[schema(example = "invoice.number")]
    pub key: String,
    #[validate(length(min = 1, max = 200, message = "Name must be 1 to 200 characters"))]
    #[schema(example = "Invoice number")]
    pub name: String,
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
    pub data_type: VariableType,
    #[serde(default)]
    pub validation: ValidationRules,
    pub default_value: Option<String>,
    /// Numbering settings, incremental variables only
    pub incremental: Option<IncrementalSettings>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateVariableRequest {
    /// `null` moves the variable out of its group
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Uuid>, nullable)]
    pub group_id: Option<Option<Uuid>>,
    #[validate(length(min = 1, max = 200, message = "Name must be 1 to 200 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
    pub validation: Option<ValidationRules>,
    /// `null` removes the default value
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, nullable)]
    pub default_value: Option<Option<String>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SetValueRequest {
    /// New value; `null` or an empty string clears it
    #[schema(example = "EUR")]
    pub value: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ConfigureIncrementalRequest {
    #[serde(flatten)]
    pub settings: IncrementalSettings,
}

pub fn system_variable_routes() -> Router<AppState> {
    Router::new()
        .route("/groups", get(list_groups).post(create_group))
        .route("/groups/:id", put(update_group).delete(delete_group))
        .route("/", get(list_variables).post(create_variable))
        .route(
            "/:id",
            get(get_variable).put(update_variable).delete(delete_variable),
        )
        .route("/:id/value", put(set_value))
        .route("/:id/incremental", put(configure_incremental))
        .route("/:id/next", get(preview_next))
        .route("/:id/generate", post(generate_code))
        .route("/:id/codes", get(list_codes))
}

#[utoipa::path(
    get,
    path = "/api/admin/system-variables/groups",
    tag = "System Variables",
    security(("bearer_auth" = [])),
    params(ScopeQuery),
    responses(
        (status = 200, description = "Groups in sort order", body = [SystemVariableGroup]),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn list_groups(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Query(scope): Query<ScopeQuery>,
) -> AppResult<Json<ApiResponse<Vec<SystemVariableGroup>>>> {
    current_user.require(permissions::SYSTEM_VARIABLES_READ)?;
    let groups = state
        .system_variables()
        .list_groups(current_user.caller(), scope.organization_id)
        .await?;
    Ok(Json(ApiResponse::success(groups)))
}

#[utoipa::path(
    post,
    path = "/api/admin/system-variables/groups",
    tag = "System Variables",
    security(("bearer_auth" = [])),
    request_body = CreateGroupRequest,
    responses(
        (status = 201, description = "Group created", body = SystemVariableGroup),
        (status = 400, description = "Validation error or duplicate name")
    )
)]
pub async fn create_group(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateGroupRequest>,
) -> AppResult<Created<SystemVariableGroup>> {
    current_user.require(permissions::SYSTEM_VARIABLES_CREATE)?;
    let group = NewGroup {
        organization_id: payload.organization_id,
        name: payload.name,
        description: payload.description,
        sort_order: payload.sort_order,
    };
    let created = state
        .system_variables()
        .create_group(current_user.caller(), group)
        .await?;
    Ok(Created(created))
}

#[utoipa::path(
    put,
    path = "/api/admin/system-variables/groups/{id}",
    tag = "System Variables",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Group ID")),
    request_body = UpdateGroupRequest,
    responses(
        (status = 200, description = "Group updated", body = SystemVariableGroup),
        (status = 404, description = "Group not found")
    )
)]
pub async fn update_group(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateGroupRequest>,
) -> AppResult<Json<ApiResponse<SystemVariableGroup>>> {
    current_user.require(permissions::SYSTEM_VARIABLES_UPDATE)?;
    let changes = GroupChanges {
        name: payload.name,
        description: payload.description,
        sort_order: payload.sort_order,
    };
    let group = state
        .system_variables()
        .update_group(current_user.caller(), id, changes)
        .await?;
    Ok(Json(ApiResponse::success(group)))
}

#[utoipa::path(
    delete,
    path = "/api/admin/system-variables/groups/{id}",
    tag = "System Variables",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Group ID")),
    responses(
        (status = 200, description = "Group deleted"),
        (status = 400, description = "Group still has variables"),
        (status = 404, description = "Group not found")
    )
)]
pub async fn delete_group(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    current_user.require(permissions::SYSTEM_VARIABLES_DELETE)?;
    state
        .system_variables()
        .delete_group(current_user.caller(), id)
        .await?;
    Ok(Json(ApiResponse::message("Group deleted")))
}

#[utoipa::path(
    get,
    path = "/api/admin/system-variables",
    tag = "System Variables",
    security(("bearer_auth" = [])),
    params(PaginationParams, VariableListQuery),
    responses(
        (status = 200, description = "Page of variables", body = [SystemVariable]),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn list_variables(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
    Query(filter): Query<VariableListQuery>,
) -> AppResult<Json<ApiResponse<Paginated<SystemVariable>>>> {
    current_user.require(permissions::SYSTEM_VARIABLES_READ)?;
    let page = state
        .system_variables()
        .list(
            current_user.caller(),
            filter.organization_id,
            filter.group_id,
            params,
        )
        .await?;
    Ok(Json(ApiResponse::success(page)))
}

#[utoipa::path(
    post,
    path = "/api/admin/system-variables",
    tag = "System Variables",
    security(("bearer_auth" = [])),
    request_body = CreateVariableRequest,
    responses(
        (status = 201, description = "Variable created", body = SystemVariable),
        (status = 400, description = "Validation error or duplicate key")
    )
)]
pub async fn create_variable(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateVariableRequest>,
) -> AppResult<Created<SystemVariable>> {
    current_user.require(permissions::SYSTEM_VARIABLES_CREATE)?;
    let variable = NewVariable {
        organization_id: payload.organization_id,
        group_id: payload.group_id,
        key: payload.key,
        name: payload.name,
        description: payload.description,
        data_type: payload.data_type,
        validation: payload.validation,
        default_value: payload.default_value,
        incremental: payload.incremental,
    };
    let created = state
        .system_variables()
        .create(current_user.caller(), variable)
        .await?;
    Ok(Created(created))
}

#[utoipa::path(
    get,
    path = "/api/admin/system-variables/{id}",
    tag = "System Variables",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Variable ID")),
    responses(
        (status = 200, description = "Variable with its value", body = SystemVariable),
        (status = 404, description = "Variable not found")
    )
)]
pub async fn get_variable(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<SystemVariable>>> {
    current_user.require(permissions::SYSTEM_VARIABLES_READ)?;
    let variable = state.system_variables().get(current_user.caller(), id).await?;
    Ok(Json(ApiResponse::success(variable)))
}

#[utoipa::path(
    put,
    path = "/api/admin/system-variables/{id}",
    tag = "System Variables",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Variable ID")),
    request_body = UpdateVariableRequest,
    responses(
        (status = 200, description = "Variable updated", body = SystemVariable),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Variable not found")
    )
)]
pub async fn update_variable(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateVariableRequest>,
) -> AppResult<Json<ApiResponse<SystemVariable>>> {
    current_user.require(permissions::SYSTEM_VARIABLES_UPDATE)?;
    let changes = VariableChanges {
        group_id: payload.group_id,
        name: payload.name,
        description: payload.description,
        rules: payload.validation,
        default_value: payload.default_value,
    };
    let variable = state
        .system_variables()
        .update(current_user.caller(), id, changes)
        .await?;
    Ok(Json(ApiResponse::success(variable)))
}

#[utoipa::path(
    delete,
    path = "/api/admin/system-variables/{id}",
    tag = "System Variables",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Variable ID")),
    responses(
        (status = 200, description = "Variable deleted"),
        (status = 404, description = "Variable not found")
    )
)]
pub async fn delete_variable(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    current_user.require(permissions::SYSTEM_VARIABLES_DELETE)?;
    state
        .system_variables()
        .delete(current_user.caller(), id)
        .await?;
    Ok(Json(ApiResponse::message("System variable deleted")))
}

/// Validate and store a variable's value
#[utoipa::path(
    put,
    path = "/api/admin/system-variables/{id}/value",
    tag = "System Variables",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Variable ID")),
    request_body = SetValueRequest,
    responses(
        (status = 200, description = "Value stored", body = SystemVariable),
        (status = 400, description = "Value rejected by the variable's type or rules"),
        (status = 404, description = "Variable not found")
    )
)]
pub async fn set_value(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<SetValueRequest>,
) -> AppResult<Json<ApiResponse<SystemVariable>>> {
    current_user.require(permissions::SYSTEM_VARIABLES_SET_VALUE)?;
    let variable = state
        .system_variables()
        .set_value(current_user.caller(), id, payload.value)
        .await?;
    Ok(Json(ApiResponse::success(variable)))
}

/// Change the numbering settings of an incremental variable
#[utoipa::path(
    put,
    path = "/api/admin/system-variables/{id}/incremental",
    tag = "System Variables",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Variable ID")),
    request_body = ConfigureIncrementalRequest,
    responses(
        (status = 200, description = "Settings applied", body = SystemVariable),
        (status = 400, description = "Invalid settings or not incremental"),
        (status = 404, description = "Variable not found")
    )
)]
pub async fn configure_incremental(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<ConfigureIncrementalRequest>,
) -> AppResult<Json<ApiResponse<SystemVariable>>> {
    current_user.require(permissions::SYSTEM_VARIABLES_CONFIGURE)?;
    let variable = state
        .system_variables()
        .configure_incremental(current_user.caller(), id, payload.settings)
        .await?;
    Ok(Json(ApiResponse::success(variable)))
}

/// The code the next generation would issue
#[utoipa::path(
    get,
    path = "/api/admin/system-variables/{id}/next",
    tag = "System Variables",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Variable ID")),
    responses(
        (status = 200, description = "Preview, nothing is issued", body = GeneratedNumber),
        (status = 400, description = "Not incremental"),
        (status = 404, description = "Variable not found")
    )
)]
pub async fn preview_next(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<GeneratedNumber>>> {
    current_user.require(permissions::SYSTEM_VARIABLES_READ)?;
    let next = state
        .system_variables()
        .preview_next(current_user.caller(), id)
        .await?;
    Ok(Json(ApiResponse::success(next)))
}

/// Issue the next code of an incremental variable
#[utoipa::path(
    post,
    path = "/api/admin/system-variables/{id}/generate",
    tag = "System Variables",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Variable ID")),
    responses(
        (status = 201, description = "Code issued", body = GeneratedCode),
        (status = 400, description = "Not incremental or code already issued"),
        (status = 404, description = "Variable not found")
    )
)]
pub async fn generate_code(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Created<GeneratedCode>> {
    current_user.require(permissions::SYSTEM_VARIABLES_GENERATE)?;
    let code = state
        .system_variables()
        .generate(current_user.caller(), id)
        .await?;
    Ok(Created(code))
}

/// Codes issued by a variable, newest first
#[utoipa::path(
    get,
    path = "/api/admin/system-variables/{id}/codes",
    tag = "System Variables",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Variable ID"), PaginationParams),
    responses(
        (status = 200, description = "Page of issued codes", body = [GeneratedCode]),
        (status = 404, description = "Variable not found")
    )
)]
pub async fn list_codes(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<GeneratedCode>>>> {
    current_user.require(permissions::SYSTEM_VARIABLES_READ)?;
    let page = state
        .system_variables()
        .list_codes(current_user.caller(), id, params)
        .await?;
    Ok(Json(ApiResponse::success(page)))
}
