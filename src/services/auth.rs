//! Password login and JWT issuance

use std::sync::Arc;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{NewUser, Permission, User, UserClaims},
    repository::CatalogStore,
};

/// Username of the account seeded from `auth.bootstrap_admin_password`
pub const BOOTSTRAP_ADMIN: &str = "admin";

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn CatalogStore>,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(store: Arc<dyn CatalogStore>, config: AuthConfig) -> Self {
        Self { store, config }
    }

    /// Authenticate by username and password, returning a bearer token
    pub async fn login(&self, username: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .store
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid username or password".to_string()))?;

        if !verify_password(&user, password)? {
            return Err(AppError::Authentication(
                "Invalid username or password".to_string(),
            ));
        }

        let token = self.create_token_for_user(&user)?;
        tracing::info!("User {} logged in", user.username);
        Ok((token, user))
    }

    /// Create JWT token for a user
    pub fn create_token_for_user(&self, user: &User) -> AppResult<String> {
        UserClaims::for_user(user, self.config.jwt_expiration_hours)
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Decode and check a bearer token
    pub fn verify_token(&self, token: &str) -> AppResult<UserClaims> {
        UserClaims::from_token(token, &self.config.jwt_secret)
            .map_err(|_| AppError::Authentication("Invalid or expired token".to_string()))
    }

    /// Create a user with a hashed password
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        permissions: Vec<Permission>,
    ) -> AppResult<User> {
        let user = NewUser {
            username: username.to_string(),
            password_hash: hash_password(password)?,
            first_name: String::new(),
            last_name: String::new(),
            permissions,
        };
        self.store.create_user(&user).await
    }

    /// Seed the administrator account when a bootstrap password is configured
    pub async fn ensure_bootstrap_admin(&self) -> AppResult<()> {
        let Some(password) = self.config.bootstrap_admin_password.as_deref() else {
            return Ok(());
        };

        if self.store.find_user_by_username(BOOTSTRAP_ADMIN).await?.is_some() {
            tracing::debug!("Bootstrap admin already exists");
            return Ok(());
        }

        self.register(BOOTSTRAP_ADMIN, password, Permission::ALL.to_vec())
            .await?;
        tracing::info!("Created bootstrap admin account '{}'", BOOTSTRAP_ADMIN);
        Ok(())
    }
}

/// Verify user password
fn verify_password(user: &User, password: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::memory::MemoryStore;

    fn service(store: Arc<MemoryStore>, bootstrap: Option<&str>) -> AuthService {
        AuthService::new(
            store,
            AuthConfig {
                bootstrap_admin_password: bootstrap.map(str::to_string),
                ..AuthConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn test_login_issues_verifiable_token() {
        let auth = service(Arc::new(MemoryStore::new()), None);
        auth.register("librarian", "s3cret", vec![Permission::CanMarkReturned])
            .await
            .unwrap();

        let (token, user) = auth.login("librarian", "s3cret").await.unwrap();
        assert_eq!(user.username, "librarian");

        let claims = auth.verify_token(&token).unwrap();
        assert_eq!(claims.user_id, user.id);
        assert!(claims.has_permission(Permission::CanMarkReturned));
    }

    #[tokio::test]
    async fn test_login_rejects_bad_credentials() {
        let auth = service(Arc::new(MemoryStore::new()), None);
        auth.register("patron", "right", vec![]).await.unwrap();

        assert!(matches!(
            auth.login("patron", "wrong").await,
            Err(AppError::Authentication(_))
        ));
        assert!(matches!(
            auth.login("nobody", "right").await,
            Err(AppError::Authentication(_))
        ));
        assert!(matches!(
            auth.verify_token("not-a-token"),
            Err(AppError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn test_bootstrap_admin_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let auth = service(store.clone(), Some("admin-pass"));

        auth.ensure_bootstrap_admin().await.unwrap();
        auth.ensure_bootstrap_admin().await.unwrap();

        let admin = store.find_user_by_username(BOOTSTRAP_ADMIN).await.unwrap().unwrap();
        assert_eq!(admin.permissions, Permission::ALL.to_vec());
        assert!(auth.login(BOOTSTRAP_ADMIN, "admin-pass").await.is_ok());
    }

    #[tokio::test]
    async fn test_no_bootstrap_without_password() {
        let store = Arc::new(MemoryStore::new());
        service(store.clone(), None).ensure_bootstrap_admin().await.unwrap();
        assert!(store.find_user_by_username(BOOTSTRAP_ADMIN).await.unwrap().is_none());
    }
}
