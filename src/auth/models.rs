// Authentication data models and DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// User role, stored as lowercase text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored role text that is neither "user" nor "admin"
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(UnknownRole(value)),
        }
    }
}

/// User database model
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub tel: String,
    pub password_hash: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Fields required to insert a user; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub tel: String,
    pub password_hash: String,
    pub role: Role,
}

/// User response model (excludes password_hash)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[schema(example = "Jane Doe")]
    pub name: String,
    #[schema(example = "jane@example.com")]
    pub email: String,
    #[schema(example = "+1 555 0100")]
    pub tel: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            tel: user.tel,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// Registration request DTO
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 50))]
    #[schema(example = "Jane Doe")]
    pub name: String,
    #[validate(email)]
    #[schema(example = "jane@example.com")]
    pub email: String,
    #[validate(custom = "crate::validation::validate_telephone")]
    #[schema(example = "+1 555 0100")]
    pub tel: String,
    #[validate(length(min = 6))]
    #[schema(example = "s3cret!")]
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

/// Login request DTO
///
/// Both fields are optional at the schema level so that an absent field is
/// reported as missing credentials rather than a malformed body.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    #[schema(example = "jane@example.com")]
    pub email: Option<String>,
    #[serde(default)]
    #[schema(example = "s3cret!")]
    pub password: Option<String>,
}

impl LoginRequest {
    /// Returns the credentials when both are present and non-empty
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let email = self.email.as_deref().filter(|e| !e.is_empty())?;
        let password = self.password.as_deref().filter(|p| !p.is_empty())?;
        Some((email, password))
    }
}

/// Body returned by register and login
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    pub success: bool,
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub token: String,
}

/// Success envelope carrying a `data` payload
#[derive(Debug, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_text() {
        assert_eq!(Role::try_from("admin".to_string()), Ok(Role::Admin));
        assert_eq!(Role::try_from("user".to_string()), Ok(Role::User));
        assert!(Role::try_from("root".to_string()).is_err());
        assert_eq!(Role::default(), Role::User);
    }

    #[test]
    fn test_user_response_hides_password_hash() {
        let user = User {
            id: Uuid::new_v4(),
            name: "Jane".to_string(),
            email: "jane@example.com".to_string(),
            tel: "0812345678".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            role: Role::User,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(UserResponse::from(user.clone())).unwrap();
        assert_eq!(json["_id"], user.id.to_string());
        assert_eq!(json["role"], "user");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("password_hash").is_none());
        assert!(json.get("password").is_none());
    }

    #[test]
    fn test_login_credentials_require_both_fields() {
        let full = LoginRequest {
            email: Some("a@b.com".to_string()),
            password: Some("pw".to_string()),
        };
        assert_eq!(full.credentials(), Some(("a@b.com", "pw")));

        let empty_password = LoginRequest {
            email: Some("a@b.com".to_string()),
            password: Some(String::new()),
        };
        assert!(empty_password.credentials().is_none());

        let missing_email = LoginRequest { email: None, password: Some("pw".to_string()) };
        assert!(missing_email.credentials().is_none());
    }

    #[test]
    fn test_register_request_validation() {
        let valid = RegisterRequest {
            name: "Jane".to_string(),
            email: "jane@example.com".to_string(),
            tel: "081-234-5678".to_string(),
            password: "secret1".to_string(),
            role: None,
        };
        assert!(valid.validate().is_ok());

        let bad_email = RegisterRequest { email: "not-an-email".to_string(), ..valid_clone(&valid) };
        assert!(bad_email.validate().is_err());

        let short_password = RegisterRequest { password: "123".to_string(), ..valid_clone(&valid) };
        assert!(short_password.validate().is_err());
    }

    fn valid_clone(request: &RegisterRequest) -> RegisterRequest {
        RegisterRequest {
            name: request.name.clone(),
            email: request.email.clone(),
            tel: request.tel.clone(),
            password: request.password.clone(),
            role: request.role,
        }
    }
}
