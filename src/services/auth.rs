//! Authentication service: registration, login and session tokens

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{Role, User, UserClaims},
    repository::Repository,
};

/// Same message for unknown username and wrong password
const INVALID_CREDENTIALS: &str = "Invalid username or password";

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Register a new user and return its id
    pub async fn register(&self, username: &str, password: &str, role: Option<&str>) -> AppResult<i32> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AppError::Validation("Username and password are required".to_string()));
        }

        let role = match role {
            Some(role) => role.parse::<Role>().map_err(AppError::Validation)?,
            None => Role::User,
        };

        if self.repository.users.username_exists(username).await? {
            return Err(AppError::Conflict("Username already exists".to_string()));
        }

        let password_hash = hash_password(password)?;
        let user_id = self.repository.users.create(username, &password_hash, role).await?;

        tracing::info!(user_id, username, %role, "User registered");
        Ok(user_id)
    }

    /// Authenticate by username and password, returning a session token and the user
    pub async fn login(&self, username: &str, password: &str) -> AppResult<(String, User)> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AppError::Validation("Username and password are required".to_string()));
        }

        let user = match self.repository.users.get_by_username(username).await? {
            Some(user) => user,
            None => {
                tracing::debug!(username, "Login failed: unknown username");
                return Err(AppError::Authentication(INVALID_CREDENTIALS.to_string()));
            }
        };

        if !verify_password(password, &user.password_hash)? {
            tracing::debug!(user_id = user.id, "Login failed: wrong password");
            return Err(AppError::Authentication(INVALID_CREDENTIALS.to_string()));
        }

        let token = self.create_token(&user)?;
        tracing::info!(user_id = user.id, "User logged in");

        Ok((token, user))
    }

    /// Create a session token for `user`
    pub fn create_token(&self, user: &User) -> AppResult<String> {
        let ttl = self.config.jwt_expiration_hours as i64 * 3600;
        UserClaims::for_user(user, ttl)
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Validate a session token and return its claims
    pub fn verify_token(&self, token: &str) -> AppResult<UserClaims> {
        UserClaims::from_token(token, &self.config.jwt_secret).map_err(|e| {
            use jsonwebtoken::errors::ErrorKind;
            let message = match e.kind() {
                ErrorKind::ExpiredSignature => "Session token expired",
                _ => "Invalid session token",
            };
            AppError::Authentication(message.to_string())
        })
    }
}

/// Hash a password using Argon2 with a random salt
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Check a password against a stored Argon2 hash
pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
