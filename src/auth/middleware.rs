// Access gate: token extraction and role checks for protected routes

use axum::{
    async_trait,
    body::Body,
    extract::{FromRef, FromRequestParts, State},
    http::{header, request::Parts, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::{cookie::session_token_from_cookies, error::AuthError, models::Role};
use crate::AppState;

/// Authenticated caller, resolved from a bearer token or the session cookie
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

/// Pull the session token from `Authorization: Bearer` or the `token` cookie
pub fn extract_token(headers: &HeaderMap) -> Result<String, AuthError> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        let value = value.to_str().map_err(|_| AuthError::InvalidToken)?.trim();
        let token = value
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidToken)?
            .trim();
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        return Ok(token.to_string());
    }

    session_token_from_cookies(headers).ok_or(AuthError::MissingToken)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Already resolved by RequireRole
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>() {
            return Ok(user.clone());
        }

        let state = AppState::from_ref(state);
        let token = extract_token(&parts.headers)?;
        let claims = state.auth_service.verify_token(&token)?;

        Ok(AuthenticatedUser { user_id: claims.sub })
    }
}

/// Authorization middleware that requires a specific role
///
/// The role is read from the store rather than the token so that a role
/// change takes effect on the next request.
#[derive(Debug, Clone)]
pub struct RequireRole {
    required_role: Role,
}

impl RequireRole {
    /// Create a new RequireRole middleware with the specified role requirement
    pub fn new(required_role: Role) -> Self {
        Self { required_role }
    }

    /// Create a middleware that requires Admin role
    pub fn admin() -> Self {
        Self::new(Role::Admin)
    }

    /// Validate the caller's token and role, then run the inner handler
    pub async fn middleware(
        self,
        state: AppState,
        mut request: Request<Body>,
        next: Next,
    ) -> Result<Response, AuthError> {
        let endpoint = request.uri().path().to_string();

        let token = extract_token(request.headers()).map_err(|e| {
            warn!("Rejected request to {}: {}", endpoint, e);
            e
        })?;
        let claims = state.auth_service.verify_token(&token)?;

        let user = state
            .auth_service
            .authorize(claims.sub, self.required_role)
            .await
            .map_err(|e| {
                warn!(
                    "Authorization failed: user_id={}, required_role={}, endpoint={}: {}",
                    claims.sub, self.required_role, endpoint, e
                );
                e
            })?;

        debug!(
            "Authorization successful: user_id={}, role={}, endpoint={}",
            user.id, user.role, endpoint
        );
        request
            .extensions_mut()
            .insert(AuthenticatedUser { user_id: user.id });
        Ok(next.run(request).await)
    }
}

/// `from_fn_with_state` entry point for admin-only routes
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    RequireRole::admin().middleware(state, request, next).await
}
