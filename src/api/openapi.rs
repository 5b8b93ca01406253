//! OpenAPI documentation configuration.
//!
//! Provides Swagger UI for API exploration and testing.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::handlers::{
    auth_handler, organization_handler, role_handler, system_variable_handler, user_handler,
};
use crate::services::TokenResponse;
use crate::types::PaginationMeta;
use domain::{
    GeneratedCode, GeneratedNumber, IncrementalConfig, IncrementalSettings, Organization,
    Permission, ResetFrequency, Role, RoleRef, SystemVariable, SystemVariableGroup, UserResponse,
    ValidationRules, VariableType,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tenant Admin API",
        version = "0.1.0",
        description = "Multi-tenant administration: organizations, users, roles and system variables with document numbering",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    paths(
        auth_handler::login,
        auth_handler::me,
        organization_handler::list_organizations,
        organization_handler::create_organization,
        organization_handler::get_organization,
        organization_handler::update_organization,
        organization_handler::delete_organization,
        role_handler::list_permissions,
        role_handler::list_roles,
        role_handler::create_role,
        role_handler::get_role,
        role_handler::update_role,
        role_handler::delete_role,
        role_handler::set_role_permissions,
        user_handler::list_users,
        user_handler::create_user,
        user_handler::get_user,
        user_handler::update_user,
        user_handler::delete_user,
        user_handler::restore_user,
        user_handler::set_user_roles,
        system_variable_handler::list_groups,
        system_variable_handler::create_group,
        system_variable_handler::update_group,
        system_variable_handler::delete_group,
        system_variable_handler::list_variables,
        system_variable_handler::create_variable,
        system_variable_handler::get_variable,
        system_variable_handler::update_variable,
        system_variable_handler::delete_variable,
        system_variable_handler::set_value,
        system_variable_handler::configure_incremental,
        system_variable_handler::preview_next,
        system_variable_handler::generate_code,
        system_variable_handler::list_codes,
    ),
    components(
        schemas(
            // Domain types
            Organization,
            Permission,
            Role,
            RoleRef,
            UserResponse,
            SystemVariableGroup,
            SystemVariable,
            VariableType,
            ValidationRules,
            IncrementalSettings,
            IncrementalConfig,
            ResetFrequency,
            GeneratedNumber,
            GeneratedCode,
            PaginationMeta,
            TokenResponse,
            // Request types
            auth_handler::LoginRequest,
            auth_handler::MeResponse,
            organization_handler::CreateOrganizationRequest,
            organization_handler::UpdateOrganizationRequest,
            role_handler::CreateRoleRequest,
            role_handler::UpdateRoleRequest,
            role_handler::SetPermissionsRequest,
            user_handler::CreateUserRequest,
            user_handler::UpdateUserRequest,
            user_handler::SetRolesRequest,
            system_variable_handler::CreateGroupRequest,
            system_variable_handler::UpdateGroupRequest,
            system_variable_handler::CreateVariableRequest,
            system_variable_handler::UpdateVariableRequest,
            system_variable_handler::SetValueRequest,
            system_variable_handler::ConfigureIncrementalRequest,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Sign-in and the current user"),
        (name = "Organizations", description = "Tenant management"),
        (name = "Roles", description = "Roles and the permission catalogue"),
        (name = "Users", description = "User accounts and role assignment"),
        (name = "System Variables", description = "Typed settings and incremental document numbering")
    )
)]
pub struct ApiDoc;

/// Security scheme modifier for JWT Bearer authentication
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT token obtained from /api/admin/auth/login"))
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_numbering_routes_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/api/admin/system-variables/{id}/generate"));
        assert!(paths.contains_key("/api/admin/system-variables/{id}/next"));
        assert!(paths.contains_key("/api/admin/auth/login"));

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
