// Authentication and authorization error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::auth::models::Role;

pub const MISSING_CREDENTIALS_MSG: &str = "Please provide an email and password";
pub const INVALID_CREDENTIALS_MSG: &str = "Invalid credentials";
pub const MALFORMED_LOGIN_MSG: &str = "Email and password must be strings";
pub const LOGIN_FAULT_MSG: &str = "Unable to verify credentials";
pub const NOT_AUTHORIZED_MSG: &str = "Not authorized to access this route";
pub const LOOKUP_FAULT_MSG: &str = "Cannot find User";

/// Authentication and authorization error types
///
/// The `Display` text is for server-side logs only; clients receive the
/// terse message produced by `IntoResponse`.
#[derive(Debug, Error)]
pub enum AuthError {
    // Registration
    /// Any registration failure; the caller only learns that it failed
    #[error("registration rejected: {0}")]
    RegistrationRejected(String),

    /// Email already taken, raised by the user store
    #[error("email already exists")]
    EmailAlreadyExists,

    // Login
    #[error("missing email or password")]
    MissingCredentials,

    #[error("login body could not be parsed: {0}")]
    MalformedLogin(String),

    #[error("no user registered with that email")]
    UnknownEmail,

    #[error("password does not match")]
    PasswordMismatch,

    /// Unexpected fault while checking credentials
    #[error("login failed: {0}")]
    LoginFault(String),

    // Access gate
    #[error("missing authentication token")]
    MissingToken,

    #[error("invalid token")]
    InvalidToken,

    #[error("token has expired")]
    ExpiredToken,

    /// Token is valid but its subject no longer exists
    #[error("token subject no longer exists")]
    UnknownSubject,

    #[error("insufficient permissions: required role '{required}', user has role '{actual}'")]
    InsufficientPermissions { required: Role, actual: Role },

    // Lookup
    #[error("no user with the id of {0}")]
    UserNotFound(String),

    // Internal
    #[error("database error: {0}")]
    DatabaseError(String),

    #[error("password hashing error: {0}")]
    PasswordHashError(String),

    #[error("token generation error: {0}")]
    TokenGenerationError(String),

    #[error("invalid response header: {0}")]
    HeaderError(String),
}

/// Failure envelope: `success` is always false, at most one of the
/// message fields is present
#[derive(Debug, Serialize)]
pub struct FailureBody {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FailureBody {
    fn bare() -> Self {
        Self { success: false, msg: None, message: None }
    }

    fn msg(text: impl Into<String>) -> Self {
        Self { success: false, msg: Some(text.into()), message: None }
    }

    fn message(text: impl Into<String>) -> Self {
        Self { success: false, msg: None, message: Some(text.into()) }
    }
}

impl AuthError {
    /// Collapse any error raised during registration into the opaque
    /// registration failure. The cause is kept for the log line written
    /// by `into_response`.
    pub fn into_registration_failure(self) -> Self {
        match self {
            AuthError::RegistrationRejected(_) => self,
            other => AuthError::RegistrationRejected(other.to_string()),
        }
    }

    /// Map faults raised while checking credentials to a login fault,
    /// leaving the deliberate credential outcomes untouched
    pub fn into_login_failure(self) -> Self {
        match self {
            AuthError::MissingCredentials
            | AuthError::MalformedLogin(_)
            | AuthError::UnknownEmail
            | AuthError::PasswordMismatch
            | AuthError::LoginFault(_) => self,
            other => AuthError::LoginFault(other.to_string()),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::RegistrationRejected(_) => StatusCode::BAD_REQUEST,
            AuthError::EmailAlreadyExists => StatusCode::BAD_REQUEST,
            AuthError::MissingCredentials => StatusCode::BAD_REQUEST,
            AuthError::MalformedLogin(_) => StatusCode::BAD_REQUEST,
            AuthError::UnknownEmail => StatusCode::BAD_REQUEST,
            AuthError::PasswordMismatch => StatusCode::UNAUTHORIZED,
            AuthError::LoginFault(_) => StatusCode::UNAUTHORIZED,
            AuthError::MissingToken => StatusCode::UNAUTHORIZED,
            AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::ExpiredToken => StatusCode::UNAUTHORIZED,
            AuthError::UnknownSubject => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientPermissions { .. } => StatusCode::FORBIDDEN,
            AuthError::UserNotFound(_) => StatusCode::NOT_FOUND,
            AuthError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::PasswordHashError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::TokenGenerationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::HeaderError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Build the client-facing body. Never includes internal detail.
    pub fn failure_body(&self) -> FailureBody {
        match self {
            AuthError::RegistrationRejected(_) | AuthError::EmailAlreadyExists => FailureBody::bare(),
            AuthError::MissingCredentials => FailureBody::msg(MISSING_CREDENTIALS_MSG),
            AuthError::MalformedLogin(_) => FailureBody::msg(MALFORMED_LOGIN_MSG),
            AuthError::UnknownEmail | AuthError::PasswordMismatch => {
                FailureBody::msg(INVALID_CREDENTIALS_MSG)
            }
            AuthError::LoginFault(_) => FailureBody::msg(LOGIN_FAULT_MSG),
            AuthError::MissingToken
            | AuthError::InvalidToken
            | AuthError::ExpiredToken
            | AuthError::UnknownSubject => FailureBody::message(NOT_AUTHORIZED_MSG),
            AuthError::InsufficientPermissions { actual, .. } => FailureBody::message(format!(
                "User role {} is not authorized to access this route",
                actual
            )),
            AuthError::UserNotFound(id) => {
                FailureBody::message(format!("No user with the id of {}", id))
            }
            AuthError::DatabaseError(_) => FailureBody::message(LOOKUP_FAULT_MSG),
            AuthError::PasswordHashError(_)
            | AuthError::TokenGenerationError(_)
            | AuthError::HeaderError(_) => FailureBody::message("Internal server error"),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!("Auth internal error: {}", self);
        } else {
            match &self {
                AuthError::RegistrationRejected(detail) => warn!("Registration failed: {}", detail),
                AuthError::LoginFault(detail) => error!("Unexpected login fault: {}", detail),
                AuthError::MalformedLogin(detail) => warn!("Malformed login body: {}", detail),
                AuthError::MissingToken
                | AuthError::InvalidToken
                | AuthError::ExpiredToken
                | AuthError::UnknownSubject
                | AuthError::InsufficientPermissions { .. } => warn!("Access denied: {}", self),
                _ => {}
            }
        }

        (status, Json(self.failure_body())).into_response()
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(error: sqlx::Error) -> Self {
        // Unique constraint on users.email
        if let sqlx::Error::Database(db_err) = &error {
            if db_err.is_unique_violation() {
                return AuthError::EmailAlreadyExists;
            }
        }
        AuthError::DatabaseError(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Shared buffer the fmt subscriber writes into
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    /// Render an error into a response and return what was logged
    fn logged_output(err: AuthError) -> (StatusCode, String) {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let response = tracing::subscriber::with_default(subscriber, || err.into_response());
        (response.status(), buffer.contents())
    }

    #[test]
    fn test_credential_failures_share_wording() {
        let unknown = serde_json::to_value(AuthError::UnknownEmail.failure_body()).unwrap();
        let mismatch = serde_json::to_value(AuthError::PasswordMismatch.failure_body()).unwrap();

        assert_eq!(unknown, mismatch);
        assert_eq!(unknown["msg"], INVALID_CREDENTIALS_MSG);
        assert_eq!(AuthError::UnknownEmail.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::PasswordMismatch.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_registration_failure_has_no_detail() {
        let err = AuthError::DatabaseError("duplicate key value violates users_email_key".into())
            .into_registration_failure();
        let body = serde_json::to_value(err.failure_body()).unwrap();

        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({ "success": false }));
    }

    #[test]
    fn test_registration_failures_are_logged_with_cause() {
        let (status, logs) = logged_output(AuthError::RegistrationRejected(
            "password: length must be at least 6".into(),
        ));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(logs.contains("Registration failed"), "{}", logs);
        assert!(logs.contains("password: length must be at least 6"), "{}", logs);

        let (status, logs) = logged_output(AuthError::EmailAlreadyExists.into_registration_failure());
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(logs.contains("email already exists"), "{}", logs);
    }

    #[test]
    fn test_login_failure_preserves_credential_outcomes() {
        assert!(matches!(
            AuthError::PasswordMismatch.into_login_failure(),
            AuthError::PasswordMismatch
        ));
        let fault = AuthError::DatabaseError("connection reset".into()).into_login_failure();
        assert!(matches!(fault, AuthError::LoginFault(_)));
        assert_eq!(fault.status_code(), StatusCode::UNAUTHORIZED);
        let body = serde_json::to_value(fault.failure_body()).unwrap();
        assert_eq!(body["msg"], LOGIN_FAULT_MSG);
    }

    #[test]
    fn test_internal_errors_do_not_leak_detail() {
        let err = AuthError::DatabaseError("password authentication failed for user postgres".into());
        let body = serde_json::to_value(err.failure_body()).unwrap();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], LOOKUP_FAULT_MSG);
        assert!(!body.to_string().contains("postgres"));
    }

    #[test]
    fn test_insufficient_permissions_is_forbidden() {
        let err = AuthError::InsufficientPermissions { required: Role::Admin, actual: Role::User };
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        let body = serde_json::to_value(err.failure_body()).unwrap();
        assert_eq!(body["message"], "User role user is not authorized to access this route");
    }
}
