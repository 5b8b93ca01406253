//! Role and permission catalogue handlers.

use axum::{
    extract::{Extension, Path, Query, State},
    response::Json,
    routing::{get, put},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::ScopeQuery;
use crate::api::extractors::ValidatedJson;
use crate::api::middleware::CurrentUser;
use crate::api::AppState;
use crate::errors::AppResult;
use crate::types::{ApiResponse, Created, Paginated, PaginationParams};
use domain::{permissions, Permission, Role};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateRoleRequest {
    /// Owning organization; defaults to the caller's
    pub organization_id: Option<Uuid>,
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    #[schema(example = "Accountant")]
    pub name: String,
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
    /// Permission strings granted by the role
    #[serde(default)]
    #[schema(example = json!(["system_variables.read", "system_variables.generate"]))]
    pub permissions: Vec<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateRoleRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: Option<String>,
    /// An empty string clears the description
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SetPermissionsRequest {
    /// The complete new permission list
    pub permissions: Vec<String>,
}

pub fn permission_routes() -> Router<AppState> {
    Router::new().route("/", get(list_permissions))
}

pub fn role_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_roles).post(create_role))
        .route("/:id", get(get_role).put(update_role).delete(delete_role))
        .route("/:id/permissions", put(set_role_permissions))
}

/// The grantable permission catalogue
#[utoipa::path(
    get,
    path = "/api/admin/permissions",
    tag = "Roles",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Permission catalogue", body = [Permission]),
        (status = 403, description = "Missing roles.read")
    )
)]
pub async fn list_permissions(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<Permission>>>> {
    current_user.require(permissions::ROLES_READ)?;
    let catalogue = state.roles().list_permissions().await?;
    Ok(Json(ApiResponse::success(catalogue)))
}

#[utoipa::path(
    get,
    path = "/api/admin/roles",
    tag = "Roles",
    security(("bearer_auth" = [])),
    params(PaginationParams, ScopeQuery),
    responses(
        (status = 200, description = "Page of roles", body = [Role]),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn list_roles(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
    Query(scope): Query<ScopeQuery>,
) -> AppResult<Json<ApiResponse<Paginated<Role>>>> {
    current_user.require(permissions::ROLES_READ)?;
    let page = state
        .roles()
        .list(current_user.caller(), scope.organization_id, params)
        .await?;
    Ok(Json(ApiResponse::success(page)))
}

#[utoipa::path(
    post,
    path = "/api/admin/roles",
    tag = "Roles",
    security(("bearer_auth" = [])),
    request_body = CreateRoleRequest,
    responses(
        (status = 201, description = "Role created", body = Role),
        (status = 400, description = "Validation error, unknown permission or duplicate name"),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn create_role(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateRoleRequest>,
) -> AppResult<Created<Role>> {
    current_user.require(permissions::ROLES_CREATE)?;
    let role = state
        .roles()
        .create(
            current_user.caller(),
            payload.organization_id,
            payload.name,
            payload.description,
            payload.permissions,
        )
        .await?;
    Ok(Created(role))
}

#[utoipa::path(
    get,
    path = "/api/admin/roles/{id}",
    tag = "Roles",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Role with its permissions", body = Role),
        (status = 404, description = "Role not found")
    )
)]
pub async fn get_role(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Role>>> {
    current_user.require(permissions::ROLES_READ)?;
    let role = state.roles().get(current_user.caller(), id).await?;
    Ok(Json(ApiResponse::success(role)))
}

#[utoipa::path(
    put,
    path = "/api/admin/roles/{id}",
    tag = "Roles",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Role ID")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = Role),
        (status = 400, description = "System role or validation error"),
        (status = 404, description = "Role not found")
    )
)]
pub async fn update_role(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateRoleRequest>,
) -> AppResult<Json<ApiResponse<Role>>> {
    current_user.require(permissions::ROLES_UPDATE)?;
    let role = state
        .roles()
        .update(current_user.caller(), id, payload.name, payload.description)
        .await?;
    Ok(Json(ApiResponse::success(role)))
}

#[utoipa::path(
    delete,
    path = "/api/admin/roles/{id}",
    tag = "Roles",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Role deleted"),
        (status = 400, description = "System role or still assigned"),
        (status = 404, description = "Role not found")
    )
)]
pub async fn delete_role(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    current_user.require(permissions::ROLES_DELETE)?;
    state.roles().delete(current_user.caller(), id).await?;
    Ok(Json(ApiResponse::message("Role deleted")))
}

/// Replace the permissions of a role
#[utoipa::path(
    put,
    path = "/api/admin/roles/{id}/permissions",
    tag = "Roles",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Role ID")),
    request_body = SetPermissionsRequest,
    responses(
        (status = 200, description = "Permissions replaced", body = Role),
        (status = 400, description = "System role or unknown permission"),
        (status = 404, description = "Role not found")
    )
)]
pub async fn set_role_permissions(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<SetPermissionsRequest>,
) -> AppResult<Json<ApiResponse<Role>>> {
    current_user.require(permissions::ROLES_UPDATE)?;
    let role = state
        .roles()
        .set_permissions(current_user.caller(), id, payload.permissions)
        .await?;
    Ok(Json(ApiResponse::success(role)))
}
