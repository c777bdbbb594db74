// HTTP handlers for authentication endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header::SET_COOKIE, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::debug;

use crate::auth::{
    cookie::SessionCookie,
    error::AuthError,
    middleware::AuthenticatedUser,
    models::{DataResponse, LoginRequest, RegisterRequest, SessionResponse, UserResponse},
    service::IssuedSession,
};
use crate::AppState;

/// Attach the cookie and body of an issued session
fn session_response(session: IssuedSession) -> Result<Response, AuthError> {
    cookie_response(&session.cookie, Json(session.body))
}

fn cookie_response(cookie: &SessionCookie, body: impl IntoResponse) -> Result<Response, AuthError> {
    let cookie = cookie.to_header_value()?;
    Ok((StatusCode::OK, [(SET_COOKIE, cookie)], body).into_response())
}

/// Register a new user
/// POST /auth/register
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User registered and session issued", body = SessionResponse),
        (status = 400, description = "Registration failed")
    ),
    tag = "User"
)]
pub async fn register_handler(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Response, AuthError> {
    let session = match payload {
        Ok(Json(request)) => state.auth_service.register(request).await,
        Err(rejection) => Err(AuthError::RegistrationRejected(rejection.body_text())),
    }
    .map_err(AuthError::into_registration_failure)?;
    session_response(session)
}

/// Log in with email and password
/// POST /auth/login
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in and session issued", body = SessionResponse),
        (status = 400, description = "Missing fields or unknown email"),
        (status = 401, description = "Wrong password or unexpected fault")
    ),
    tag = "User"
)]
pub async fn login_handler(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, AuthError> {
    let Json(request) = payload.map_err(login_rejection)?;

    let session = state
        .auth_service
        .login(&request)
        .await
        .map_err(AuthError::into_login_failure)?;
    session_response(session)
}

/// A body that parsed but carried the wrong field types is malformed; a
/// missing, empty or unparseable body carries no credentials at all
fn login_rejection(rejection: JsonRejection) -> AuthError {
    match rejection {
        JsonRejection::JsonDataError(e) => AuthError::MalformedLogin(e.body_text()),
        other => {
            debug!("Login body rejected: {}", other.body_text());
            AuthError::MissingCredentials
        }
    }
}

/// Clear the session cookie
/// GET /auth/logout
#[utoipa::path(
    get,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Cookie cleared")
    ),
    tag = "User"
)]
pub async fn logout_handler(State(state): State<AppState>) -> Result<Response, AuthError> {
    let cookie = state.auth_service.logout_cookie();
    cookie_response(&cookie, Json(DataResponse::ok(json!({}))))
}

/// Get current user information (protected endpoint)
/// GET /auth/me
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "My user profile", body = UserResponse),
        (status = 401, description = "Not authorized"),
        (status = 404, description = "User no longer exists")
    ),
    security(("bearerAuth" = [])),
    tag = "User"
)]
pub async fn me_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<DataResponse<UserResponse>>, AuthError> {
    debug!("Fetching profile for user {}", user.user_id);
    let user = state.auth_service.current_user(user.user_id).await?;
    Ok(Json(DataResponse::ok(user.into())))
}

/// Get user by ID (admin only)
/// GET /auth/{id}
#[utoipa::path(
    get,
    path = "/auth/{id}",
    params(
        ("id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User information retrieved successfully", body = UserResponse),
        (status = 401, description = "Not authorized"),
        (status = 403, description = "Forbidden - Admin access only"),
        (status = 404, description = "User not found"),
        (status = 500, description = "Some server error")
    ),
    security(("bearerAuth" = [])),
    tag = "User"
)]
pub async fn get_user_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<UserResponse>>, AuthError> {
    debug!("Admin lookup of user {}", id);
    let user = state.auth_service.find_user(&id).await?;
    Ok(Json(DataResponse::ok(user.into())))
}
