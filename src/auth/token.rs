// JWT token generation and validation service

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::error::AuthError;
use crate::config::AuthConfig;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
}

/// Token service for JWT operations
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    header: Header,
    validation: Validation,
    token_duration: i64, // in seconds
}

impl TokenService {
    /// Create a TokenService from the auth configuration
    pub fn new(config: &AuthConfig) -> Self {
        let algorithm = config.jwt_algorithm();
        let secret = config.jwt_secret().as_bytes();

        let mut validation = Validation::new(algorithm);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            header: Header::new(algorithm),
            validation,
            token_duration: config.token_expire_days() * SECONDS_PER_DAY,
        }
    }

    /// Lifetime of issued tokens
    pub fn token_lifetime(&self) -> Duration {
        Duration::seconds(self.token_duration)
    }

    /// Generate a signed session token for a user
    pub fn generate_token(&self, user_id: Uuid) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id,
            iat: now,
            exp: now + self.token_duration,
        };

        encode(&self.header, &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenGenerationError(e.to_string()))
    }

    /// Validate a token's signature and expiry
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidToken,
            })
    }
}
