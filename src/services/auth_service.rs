//! Authentication service - sign-in, token verification and permission lookup.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::{Config, SECONDS_PER_HOUR, TOKEN_TYPE_BEARER};
use crate::errors::{AppError, AppResult};
use crate::infra::{PermissionCache, UnitOfWork};
use domain::{normalize_email, Password, PermissionSet, User};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// JWT claims payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    /// Organization of the user at sign-in.
    pub org: Uuid,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

/// Token response returned after successful authentication
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    /// JWT access token
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub access_token: String,
    /// Token type (always "Bearer")
    #[schema(example = "Bearer")]
    pub token_type: String,
    /// Token expiration time in seconds
    #[schema(example = 86400)]
    pub expires_in: i64,
}

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Check credentials and issue a bearer token.
    async fn login(&self, email: String, password: String) -> AppResult<TokenResponse>;

    /// Verify JWT token and extract claims
    fn verify_token(&self, token: &str) -> AppResult<Claims>;

    /// Effective permission set of a user, served from cache when possible.
    async fn permissions_for(&self, user_id: Uuid) -> AppResult<PermissionSet>;

    /// The signed-in user, or `Unauthorized` once they are deleted or deactivated.
    async fn current_user(&self, user_id: Uuid) -> AppResult<User>;
}

fn generate_token(user: &User, config: &Config) -> AppResult<TokenResponse> {
    let now = Utc::now();
    let expires_at = now + Duration::hours(config.jwt_expiration_hours);

    let claims = Claims {
        sub: user.id,
        org: user.organization_id,
        email: user.email.clone(),
        exp: expires_at.timestamp(),
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret_bytes()),
    )?;

    Ok(TokenResponse {
        access_token: token,
        token_type: TOKEN_TYPE_BEARER.to_string(),
        expires_in: config.jwt_expiration_hours * SECONDS_PER_HOUR,
    })
}

fn verify_token_internal(token: &str, config: &Config) -> AppResult<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

/// Concrete implementation of AuthService using Unit of Work.
pub struct Authenticator<U: UnitOfWork> {
    uow: Arc<U>,
    cache: Arc<dyn PermissionCache>,
    config: Config,
}

impl<U: UnitOfWork> Authenticator<U> {
    pub fn new(uow: Arc<U>, cache: Arc<dyn PermissionCache>, config: Config) -> Self {
        Self { uow, cache, config }
    }
}

#[async_trait]
impl<U: UnitOfWork> AuthService for Authenticator<U> {
    async fn login(&self, email: String, password: String) -> AppResult<TokenResponse> {
        let user = self.uow.users().find_by_email(&normalize_email(&email)).await?;

        // Verify against a throwaway hash when the user is unknown so response
        // time does not reveal which emails exist.
        let stored = match &user {
            Some(user) => Password::from_hash(user.password_hash.clone()),
            None => Password::unmatchable(),
        };
        let password_valid = stored.verify(&password);

        let user = match user {
            Some(user) if password_valid && user.can_sign_in() => user,
            _ => return Err(AppError::InvalidCredentials),
        };

        let organization = self
            .uow
            .organizations()
            .find_by_id(user.organization_id)
            .await?;
        if !organization.is_some_and(|o| o.is_active) {
            tracing::info!(user_id = %user.id, "Sign-in refused for inactive organization");
            return Err(AppError::InvalidCredentials);
        }

        tracing::info!(user_id = %user.id, "User signed in");
        generate_token(&user, &self.config)
    }

    fn verify_token(&self, token: &str) -> AppResult<Claims> {
        verify_token_internal(token, &self.config)
    }

    async fn permissions_for(&self, user_id: Uuid) -> AppResult<PermissionSet> {
        match self.cache.get_permissions(user_id).await {
            Ok(Some(cached)) => return Ok(cached),
            Ok(None) => {}
            Err(e) => tracing::warn!(user_id = %user_id, error = %e, "Permission cache unavailable"),
        }

        let codes = self.uow.roles().permission_codes_for_user(user_id).await?;
        let permissions = PermissionSet::new(codes);

        if let Err(e) = self
            .cache
            .set_permissions(user_id, &permissions, self.config.permission_cache_ttl_seconds)
            .await
        {
            tracing::warn!(user_id = %user_id, error = %e, "Failed to cache permissions");
        }
        Ok(permissions)
    }

    async fn current_user(&self, user_id: Uuid) -> AppResult<User> {
        match self.uow.users().find_by_id(user_id).await? {
            Some(user) if user.can_sign_in() => Ok(user),
            _ => Err(AppError::Unauthorized),
        }
    }
}
