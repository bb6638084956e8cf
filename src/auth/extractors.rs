use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use crate::{
    auth::{jwt::JwtKeys, repo_types::User},
    error::AppError,
    state::AppState,
};

const INVALID_CREDENTIALS: &str = "Could not validate credentials";

/// Authenticated caller, typed by capability at authentication time.
#[derive(Debug, Clone)]
pub enum Principal {
    Customer(User),
    Admin(User),
}

/// Proof that the caller holds the admin capability.
#[derive(Debug, Clone)]
pub struct Admin(User);

impl Principal {
    pub fn from_user(user: User) -> Self {
        if user.is_admin {
            Principal::Admin(user)
        } else {
            Principal::Customer(user)
        }
    }

    pub fn user(&self) -> &User {
        match self {
            Principal::Customer(u) | Principal::Admin(u) => u,
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.user().id
    }

    pub fn require_admin(&self) -> Result<Admin, AppError> {
        match self {
            Principal::Admin(u) => Ok(Admin(u.clone())),
            Principal::Customer(u) => {
                warn!(user_id = %u.id, "admin access denied");
                Err(AppError::Forbidden("Admin access required".into()))
            }
        }
    }
}

impl Admin {
    pub fn user(&self) -> &User {
        &self.0
    }
}

/// Resolves the bearer token to the owning user.
pub struct AuthUser(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let unauthorized = || AppError::Unauthorized(INVALID_CREDENTIALS.into());

        // Expect "Bearer <token>"
        let token = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer ").or_else(|| h.strip_prefix("bearer ")))
            .ok_or_else(unauthorized)?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token.trim()).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            unauthorized()
        })?;

        let user = state
            .users
            .find_by_email(&claims.sub)
            .await?
            .ok_or_else(|| {
                warn!(sub = %claims.sub, "token subject no longer exists");
                unauthorized()
            })?;

        Ok(AuthUser(Principal::from_user(user)))
    }
}

/// Like [`AuthUser`] but rejects non-admin callers with 403.
pub struct AdminUser(pub Admin);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(principal) = AuthUser::from_request_parts(parts, state).await?;
        Ok(AdminUser(principal.require_admin()?))
    }
}
