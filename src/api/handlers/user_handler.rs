//! User handlers.

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

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::CurrentUser;
use crate::api::AppState;
use crate::errors::AppResult;
use crate::services::{NewUser, UserUpdate};
use crate::types::{ApiResponse, Created, Paginated, PaginationParams};
use domain::{permissions, UserResponse};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserListQuery {
    /// Organization to list; defaults to the caller's
    pub organization_id: Option<Uuid>,
    /// Include soft-deleted users
    #[serde(default)]
    pub include_deleted: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    /// Owning organization; defaults to the caller's
    pub organization_id: Option<Uuid>,
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "jane@acme.example")]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    #[schema(example = "SecurePass123!", min_length = 8)]
    pub password: String,
    #[validate(length(min = 1, message = "Name is required"))]
    #[schema(example = "Jane Doe")]
    pub name: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Roles of the user's organization to assign
    #[serde(default)]
    pub role_ids: Vec<Uuid>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SetRolesRequest {
    /// The complete new role list
    pub role_ids: Vec<Uuid>,
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
        .route("/:id/restore", post(restore_user))
        .route("/:id/roles", put(set_user_roles))
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(PaginationParams, UserListQuery),
    responses(
        (status = 200, description = "Page of users", body = [UserResponse]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn list_users(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
    Query(filter): Query<UserListQuery>,
) -> AppResult<Json<ApiResponse<Paginated<UserResponse>>>> {
    current_user.require(permissions::USERS_READ)?;
    let page = state
        .users()
        .list(
            current_user.caller(),
            filter.organization_id,
            params,
            filter.include_deleted,
        )
        .await?;
    Ok(Json(ApiResponse::success(page.map(UserResponse::from))))
}

#[utoipa::path(
    post,
    path = "/api/admin/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Validation error or email taken"),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn create_user(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateUserRequest>,
) -> AppResult<Created<UserResponse>> {
    current_user.require(permissions::USERS_CREATE)?;
    let user = NewUser {
        organization_id: payload.organization_id,
        email: payload.email,
        password: payload.password,
        name: payload.name,
        is_active: payload.is_active,
        role_ids: payload.role_ids,
    };
    let created = state.users().create(current_user.caller(), user).await?;
    Ok(Created(UserResponse::from(created)))
}

#[utoipa::path(
    get,
    path = "/api/admin/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User profile", body = UserResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    current_user.require(permissions::USERS_READ)?;
    let user = state.users().get(current_user.caller(), id).await?;
    Ok(Json(ApiResponse::success(UserResponse::from(user))))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Validation error or email taken"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateUserRequest>,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    current_user.require(permissions::USERS_UPDATE)?;
    let update = UserUpdate {
        email: payload.email,
        password: payload.password,
        name: payload.name,
        is_active: payload.is_active,
    };
    let user = state.users().update(current_user.caller(), id, update).await?;
    Ok(Json(ApiResponse::success(UserResponse::from(user))))
}

/// Soft delete a user
#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 400, description = "Cannot delete yourself"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    current_user.require(permissions::USERS_DELETE)?;
    state.users().delete(current_user.caller(), id).await?;
    Ok(Json(ApiResponse::message("User deleted")))
}

/// Restore a soft-deleted user
#[utoipa::path(
    post,
    path = "/api/admin/users/{id}/restore",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User restored", body = UserResponse),
        (status = 400, description = "User is not deleted"),
        (status = 404, description = "User not found")
    )
)]
pub async fn restore_user(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    current_user.require(permissions::USERS_DELETE)?;
    let user = state.users().restore(current_user.caller(), id).await?;
    Ok(Json(ApiResponse::success(UserResponse::from(user))))
}

/// Replace the roles of a user
#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/roles",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = SetRolesRequest,
    responses(
        (status = 200, description = "Roles replaced", body = UserResponse),
        (status = 400, description = "Role from another organization"),
        (status = 404, description = "User or role not found")
    )
)]
pub async fn set_user_roles(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<SetRolesRequest>,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    current_user.require(permissions::USERS_UPDATE)?;
    let user = state
        .users()
        .set_roles(current_user.caller(), id, payload.role_ids)
        .await?;
    Ok(Json(ApiResponse::success(UserResponse::from(user))))
}
