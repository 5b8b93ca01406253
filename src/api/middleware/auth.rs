//! JWT authentication middleware.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::api::AppState;
use crate::config::BEARER_TOKEN_PREFIX;
use crate::errors::{AppError, AppResult};
use crate::services::Caller;
use domain::PermissionSet;

/// Authenticated user extracted from JWT token
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub email: String,
    pub permissions: PermissionSet,
}

impl CurrentUser {
    pub fn caller(&self) -> Caller {
        Caller::new(self.id, self.organization_id)
    }

    /// Fail with `Forbidden` unless the user holds `permission`.
    pub fn require(&self, permission: &str) -> AppResult<()> {
        if self.permissions.allows(permission) {
            Ok(())
        } else {
            tracing::debug!(user_id = %self.id, permission, "Permission denied");
            Err(AppError::forbidden(permission))
        }
    }
}

/// JWT authentication middleware.
///
/// Validates the bearer token, resolves the user's permission set and
/// injects the [`CurrentUser`] into the request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let token = auth_header
        .strip_prefix(BEARER_TOKEN_PREFIX)
        .ok_or(AppError::Unauthorized)?;

    let auth = state.auth();
    let claims = auth.verify_token(token)?;
    let permissions = auth.permissions_for(claims.sub).await?;

    let current_user = CurrentUser {
        id: claims.sub,
        organization_id: claims.org,
        email: claims.email,
        permissions,
    };

    request.extensions_mut().insert(current_user);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::permissions;

    fn user_with(codes: &[&str]) -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            email: "admin@example.com".to_string(),
            permissions: PermissionSet::new(codes.iter().copied()),
        }
    }

    #[test]
    fn require_checks_the_permission_set() {
        let user = user_with(&[permissions::USERS_READ]);
        assert!(user.require(permissions::USERS_READ).is_ok());

        let err = user.require(permissions::USERS_DELETE).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(ref p) if p == permissions::USERS_DELETE));
    }

    #[test]
    fn wildcard_grants_everything() {
        let user = user_with(&[permissions::ALL]);
        assert!(user.require(permissions::SYSTEM_VARIABLES_GENERATE).is_ok());
    }
}
