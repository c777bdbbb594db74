// Authentication service - business logic layer

use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{
    cookie::SessionCookie,
    error::AuthError,
    models::{LoginRequest, NewUser, RegisterRequest, Role, SessionResponse, User},
    password::PasswordService,
    repository::UserStore,
    token::{Claims, TokenService},
};
use crate::config::AuthConfig;

/// A session ready to be written to the response: JSON body plus cookie
#[derive(Debug)]
pub struct IssuedSession {
    pub body: SessionResponse,
    pub cookie: SessionCookie,
}

/// Authentication service coordinating the store, password and token services
pub struct AuthService {
    store: Arc<dyn UserStore>,
    token_service: TokenService,
    config: AuthConfig,
}

impl AuthService {
    /// Create a new AuthService
    pub fn new(store: Arc<dyn UserStore>, config: AuthConfig) -> Self {
        Self {
            store,
            token_service: TokenService::new(&config),
            config,
        }
    }

    /// Register a new user and open a session for them
    pub async fn register(&self, request: RegisterRequest) -> Result<IssuedSession, AuthError> {
        request
            .validate()
            .map_err(|e| AuthError::RegistrationRejected(e.to_string()))?;

        let password_hash = PasswordService::hash_password_blocking(request.password).await?;
        let user = self
            .store
            .create_user(NewUser {
                name: request.name,
                email: request.email,
                tel: request.tel,
                password_hash,
                role: request.role.unwrap_or_default(),
            })
            .await?;

        info!("Registered user {} with role {}", user.id, user.role);
        self.issue_session(&user)
    }

    /// Check credentials and open a session
    pub async fn login(&self, request: &LoginRequest) -> Result<IssuedSession, AuthError> {
        let (email, password) = request.credentials().ok_or(AuthError::MissingCredentials)?;

        let user = self
            .store
            .find_by_email(email)
            .await?
            .ok_or(AuthError::UnknownEmail)?;

        let matches = PasswordService::verify_password_blocking(
            password.to_string(),
            user.password_hash.clone(),
        )
        .await?;
        if !matches {
            debug!("Password mismatch for user {}", user.id);
            return Err(AuthError::PasswordMismatch);
        }

        info!("User {} logged in", user.id);
        self.issue_session(&user)
    }

    /// Sign a token for a verified user and build the matching cookie
    pub fn issue_session(&self, user: &User) -> Result<IssuedSession, AuthError> {
        let token = self.token_service.generate_token(user.id)?;
        let expires = Utc::now() + Duration::days(self.config.cookie_expire_days());
        let cookie = SessionCookie::session(&token, expires, self.config.cookie_secure());

        Ok(IssuedSession {
            body: SessionResponse {
                success: true,
                id: user.id,
                name: user.name.clone(),
                email: user.email.clone(),
                role: user.role,
                token,
            },
            cookie,
        })
    }

    /// Cookie written by logout. The token itself stays valid until it expires.
    pub fn logout_cookie(&self) -> SessionCookie {
        SessionCookie::cleared(Utc::now(), self.config.cookie_secure())
    }

    /// Validate a presented token
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        self.token_service.validate_token(token)
    }

    /// Load the user a token was issued to
    pub async fn current_user(&self, user_id: Uuid) -> Result<User, AuthError> {
        self.store
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::UserNotFound(user_id.to_string()))
    }

    /// Look up a user by a raw path id. Ids that cannot be parsed cannot
    /// name a stored user and are reported as not found.
    pub async fn find_user(&self, raw_id: &str) -> Result<User, AuthError> {
        let id = Uuid::parse_str(raw_id).map_err(|e| {
            debug!("Unparseable user id '{}': {}", raw_id, e);
            AuthError::UserNotFound(raw_id.to_string())
        })?;
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AuthError::UserNotFound(raw_id.to_string()))
    }

    /// Ensure the token's subject still exists and holds the required role
    pub async fn authorize(&self, user_id: Uuid, required: Role) -> Result<User, AuthError> {
        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UnknownSubject)?;

        if user.role != required {
            return Err(AuthError::InsufficientPermissions {
                required,
                actual: user.role,
            });
        }
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repository::memory::InMemoryUserStore;
    use crate::config::MAX_EXPIRE_DAYS;

    fn service_with(store: Arc<InMemoryUserStore>) -> AuthService {
        AuthService::new(store, AuthConfig::new("service_test_secret"))
    }

    fn register_request(email: &str, role: Option<Role>) -> RegisterRequest {
        RegisterRequest {
            name: "Jane".to_string(),
            email: email.to_string(),
            tel: "0812345678".to_string(),
            password: "secret1".to_string(),
            role,
        }
    }

    fn login_request(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        }
    }

    #[tokio::test]
    async fn test_register_stores_hash_and_issues_session() {
        let store = Arc::new(InMemoryUserStore::new());
        let service = service_with(store.clone());

        let session = service.register(register_request("jane@example.com", None)).await.unwrap();
        let stored = store.find_by_email("jane@example.com").await.unwrap().unwrap();

        assert_eq!(session.body.id, stored.id);
        assert_eq!(session.body.role, Role::User);
        assert_ne!(stored.password_hash, "secret1");
        assert_eq!(session.cookie.value(), session.body.token);
        assert_eq!(service.verify_token(&session.body.token).unwrap().sub, stored.id);
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_input_without_writing() {
        let store = Arc::new(InMemoryUserStore::new());
        let service = service_with(store.clone());

        let result = service.register(register_request("nope", None)).await;
        assert!(matches!(result, Err(AuthError::RegistrationRejected(_))));
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_register_duplicate_email_fails() {
        let store = Arc::new(InMemoryUserStore::new());
        let service = service_with(store);

        service.register(register_request("dup@example.com", None)).await.unwrap();
        let result = service.register(register_request("DUP@example.com", None)).await;
        assert!(matches!(result, Err(AuthError::EmailAlreadyExists)));
    }

    #[tokio::test]
    async fn test_login_outcomes() {
        let store = Arc::new(InMemoryUserStore::new());
        let service = service_with(store);
        service.register(register_request("jane@example.com", None)).await.unwrap();

        assert!(service.login(&login_request("jane@example.com", "secret1")).await.is_ok());
        assert!(matches!(
            service.login(&login_request("jane@example.com", "wrong!")).await,
            Err(AuthError::PasswordMismatch)
        ));
        assert!(matches!(
            service.login(&login_request("ghost@example.com", "secret1")).await,
            Err(AuthError::UnknownEmail)
        ));
        assert!(matches!(
            service.login(&LoginRequest { email: None, password: None }).await,
            Err(AuthError::MissingCredentials)
        ));
    }

    #[tokio::test]
    async fn test_cookie_expiry_follows_config() {
        let store = Arc::new(InMemoryUserStore::new());
        let service = AuthService::new(
            store,
            AuthConfig::new("service_test_secret").with_cookie_expire_days(3),
        );
        let before = Utc::now();
        let session = service.register(register_request("c@example.com", None)).await.unwrap();

        let delta = session.cookie.expires() - before;
        assert!(delta >= Duration::days(3));
        assert!(delta < Duration::days(3) + Duration::minutes(1));
    }

    #[tokio::test]
    async fn test_oversized_cookie_expiry_still_issues_session() {
        let store = Arc::new(InMemoryUserStore::new());
        let service = AuthService::new(
            store,
            AuthConfig::new("service_test_secret").with_cookie_expire_days(100_000_000),
        );
        let before = Utc::now();
        let session = service.register(register_request("far@example.com", None)).await.unwrap();

        let delta = session.cookie.expires() - before;
        assert!(delta >= Duration::days(MAX_EXPIRE_DAYS));
        assert!(delta < Duration::days(MAX_EXPIRE_DAYS) + Duration::minutes(1));
        assert!(session.cookie.to_header_value().is_ok());
    }

    #[tokio::test]
    async fn test_authorize_checks_role_and_existence() {
        let store = Arc::new(InMemoryUserStore::new());
        let service = service_with(store.clone());
        let admin = service
            .register(register_request("admin@example.com", Some(Role::Admin)))
            .await
            .unwrap();
        let user = service.register(register_request("user@example.com", None)).await.unwrap();

        assert!(service.authorize(admin.body.id, Role::Admin).await.is_ok());
        assert!(matches!(
            service.authorize(user.body.id, Role::Admin).await,
            Err(AuthError::InsufficientPermissions { required: Role::Admin, actual: Role::User })
        ));

        store.remove(admin.body.id).await;
        assert!(matches!(
            service.authorize(admin.body.id, Role::Admin).await,
            Err(AuthError::UnknownSubject)
        ));
    }

    #[tokio::test]
    async fn test_find_user_with_unparseable_id_is_not_found() {
        let service = service_with(Arc::new(InMemoryUserStore::new()));
        assert!(matches!(
            service.find_user("64e1f0c2a1b2c3d4e5f60718").await,
            Err(AuthError::UserNotFound(_))
        ));
    }
}
