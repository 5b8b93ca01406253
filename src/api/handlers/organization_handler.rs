//! Organization handlers.

use axum::{
    extract::{Extension, Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::CurrentUser;
use crate::api::AppState;
use crate::errors::AppResult;
use crate::types::{ApiResponse, Created, Paginated, PaginationParams};
use domain::{permissions, Organization, OrganizationChanges};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateOrganizationRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    #[schema(example = "Acme Corporation")]
    pub name: String,
    /// Short unique code, stored upper-case
    #[validate(length(min = 2, max = 32, message = "Code must be 2 to 32 characters"))]
    #[schema(example = "ACME")]
    pub code: String,
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateOrganizationRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: Option<String>,
    /// An empty string clears the description
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

pub fn organization_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_organizations).post(create_organization))
        .route(
            "/:id",
            get(get_organization)
                .put(update_organization)
                .delete(delete_organization),
        )
}

/// List organizations visible to the caller
#[utoipa::path(
    get,
    path = "/api/admin/organizations",
    tag = "Organizations",
    security(("bearer_auth" = [])),
    params(PaginationParams),
    responses(
        (status = 200, description = "Page of organizations", body = [Organization]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Missing organizations.read")
    )
)]
pub async fn list_organizations(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<Organization>>>> {
    current_user.require(permissions::ORGANIZATIONS_READ)?;
    let page = state.organizations().list(current_user.caller(), params).await?;
    Ok(Json(ApiResponse::success(page)))
}

/// Create an organization (SYSTEM members only)
#[utoipa::path(
    post,
    path = "/api/admin/organizations",
    tag = "Organizations",
    security(("bearer_auth" = [])),
    request_body = CreateOrganizationRequest,
    responses(
        (status = 201, description = "Organization created", body = Organization),
        (status = 400, description = "Validation error or duplicate code"),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn create_organization(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateOrganizationRequest>,
) -> AppResult<Created<Organization>> {
    current_user.require(permissions::ORGANIZATIONS_CREATE)?;
    let organization = state
        .organizations()
        .create(
            current_user.caller(),
            payload.name,
            payload.code,
            payload.description,
        )
        .await?;
    Ok(Created(organization))
}

#[utoipa::path(
    get,
    path = "/api/admin/organizations/{id}",
    tag = "Organizations",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Organization ID")),
    responses(
        (status = 200, description = "Organization", body = Organization),
        (status = 404, description = "Organization not found")
    )
)]
pub async fn get_organization(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Organization>>> {
    current_user.require(permissions::ORGANIZATIONS_READ)?;
    let organization = state.organizations().get(current_user.caller(), id).await?;
    Ok(Json(ApiResponse::success(organization)))
}

#[utoipa::path(
    put,
    path = "/api/admin/organizations/{id}",
    tag = "Organizations",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Organization ID")),
    request_body = UpdateOrganizationRequest,
    responses(
        (status = 200, description = "Organization updated", body = Organization),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Organization not found")
    )
)]
pub async fn update_organization(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateOrganizationRequest>,
) -> AppResult<Json<ApiResponse<Organization>>> {
    current_user.require(permissions::ORGANIZATIONS_UPDATE)?;
    let changes = OrganizationChanges {
        name: payload.name,
        description: payload.description,
        is_active: payload.is_active,
    };
    let organization = state
        .organizations()
        .update(current_user.caller(), id, changes)
        .await?;
    Ok(Json(ApiResponse::success(organization)))
}

/// Delete an organization without users (SYSTEM members only)
#[utoipa::path(
    delete,
    path = "/api/admin/organizations/{id}",
    tag = "Organizations",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Organization ID")),
    responses(
        (status = 200, description = "Organization deleted"),
        (status = 400, description = "SYSTEM organization or users remain"),
        (status = 404, description = "Organization not found")
    )
)]
pub async fn delete_organization(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    current_user.require(permissions::ORGANIZATIONS_DELETE)?;
    state.organizations().delete(current_user.caller(), id).await?;
    Ok(Json(ApiResponse::message("Organization deleted")))
}
