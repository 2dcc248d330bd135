use std::sync::Arc;

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::domain::models::user::{User, UserRole};
use crate::error::AppError;
use crate::server::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
    pub email: String,
    pub role: UserRole,
}

#[derive(Debug)]
pub struct AuthResult {
    pub access_token: String,
    pub expires_in: u64,
    pub user: User,
}

pub struct AuthService {
    state: Arc<AppState>,
}

impl AuthService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResult, AppError> {
        let user = self
            .state
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(|| AppError::Auth("Invalid email or password".to_string()))?;

        let is_valid = self.verify_password(password, &user.password_hash)?;
        if !is_valid {
            return Err(AppError::Auth("Invalid email or password".to_string()));
        }

        self.generate_token(user)
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, AppError> {
        let secret = self.state.config.auth.jwt_secret.as_bytes();
        let validation = Validation::new(Algorithm::HS256);

        let token_data = decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)
            .map_err(|_| AppError::Auth("Invalid token".to_string()))?;

        Ok(token_data.claims)
    }

    fn generate_token(&self, user: User) -> Result<AuthResult, AppError> {
        let expiry_hours = self.state.config.auth.token_expiry_hours;
        let secret = self.state.config.auth.jwt_secret.as_bytes();

        let now = Utc::now();
        let exp = now
            .checked_add_signed(Duration::hours(expiry_hours as i64))
            .ok_or_else(|| AppError::Internal("Token expiry out of range".to_string()))?
            .timestamp() as usize;

        let claims = Claims {
            sub: user.id.to_string(),
            exp,
            iat: now.timestamp() as usize,
            email: user.email.clone(),
            role: user.role,
        };

        let access_token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret),
        )
        .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))?;

        Ok(AuthResult {
            access_token,
            expires_in: expiry_hours * 3600,
            user,
        })
    }

    pub fn hash_password(&self, password: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;

        Ok(hash.to_string())
    }

    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AppError> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| AppError::Internal(format!("Stored password hash is invalid: {}", e)))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_round_trip_keeps_the_role() {
        let secret = b"test-secret";
        let claims = Claims {
            sub: uuid::Uuid::new_v4().to_string(),
            exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
            iat: Utc::now().timestamp() as usize,
            email: "admin@example.com".to_string(),
            role: UserRole::Admin,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap();

        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(secret),
            &Validation::new(Algorithm::HS256),
        )
        .unwrap();

        assert_eq!(decoded.claims.role, UserRole::Admin);
        assert_eq!(decoded.claims.email, "admin@example.com");
    }
}
