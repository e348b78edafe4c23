//! User service.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use recipedia_common::{AppError, AppResult, IdGenerator};
use recipedia_db::{entities::user, repositories::UserRepository};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

use crate::services::media::MediaService;

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    media: MediaService,
    id_gen: IdGenerator,
}

/// Input for registering a new user.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserInput {
    #[validate(email)]
    #[validate(length(max = 254))]
    pub email: String,

    #[validate(length(min = 1, max = 150))]
    pub username: String,

    #[validate(length(min = 1, max = 150))]
    pub first_name: String,

    #[validate(length(min = 1, max = 150))]
    pub last_name: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

/// A page of users.
#[derive(Debug)]
pub struct UserPage {
    /// Total number of users.
    pub count: u64,
    /// The requested page, ordered by username.
    pub users: Vec<user::Model>,
}

/// Usernames are restricted to letters, digits and `@ . + - _`.
fn validate_username(username: &str) -> AppResult<()> {
    let valid = username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'));

    if valid {
        Ok(())
    } else {
        Err(AppError::Validation(
            "username: may contain only letters, digits and @/./+/-/_".to_string(),
        ))
    }
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub fn new(user_repo: UserRepository, media: MediaService) -> Self {
        Self {
            user_repo,
            media,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a new user.
    pub async fn register(&self, input: CreateUserInput) -> AppResult<user::Model> {
        input.validate()?;
        validate_username(&input.username)?;

        // Check-then-insert for the friendly message; the unique
        // indexes still back this under concurrent registration
        if self
            .user_repo
            .find_by_username(&input.username)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "A user with this username already exists".to_string(),
            ));
        }
        if self.user_repo.find_by_email(&input.email).await?.is_some() {
            return Err(AppError::Conflict(
                "A user with this email already exists".to_string(),
            ));
        }

        let password_hash = hash_password(&input.password)?;
        let user_id = self.id_gen.generate();
        let token = self.id_gen.generate_token();

        let model = user::ActiveModel {
            id: Set(user_id),
            username: Set(input.username),
            email: Set(input.email),
            first_name: Set(input.first_name),
            last_name: Set(input.last_name),
            avatar_url: Set(None),
            password_hash: Set(password_hash),
            token: Set(Some(token)),
            created_at: Set(chrono::Utc::now().into()),
            updated_at: Set(None),
        };

        self.user_repo.create(model).await
    }

    /// Get a user by ID.
    pub async fn get(&self, id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(id).await
    }

    /// List users ordered by username (paginated).
    pub async fn list(&self, limit: u64, offset: u64) -> AppResult<UserPage> {
        let count = self.user_repo.count().await?;
        let users = self.user_repo.list(limit, offset).await?;
        Ok(UserPage { count, users })
    }

    /// Authenticate a user by token.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        self.user_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Authenticate a user by email and password, returning an access
    /// token.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<String> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AppError::Unauthorized);
        }

        if let Some(token) = user.token.clone() {
            return Ok(token);
        }

        // A previous logout cleared the token; mint a fresh one
        let token = self.id_gen.generate_token();
        let mut active: user::ActiveModel = user.into();
        active.token = Set(Some(token.clone()));
        active.updated_at = Set(Some(chrono::Utc::now().into()));
        self.user_repo.update(active).await?;

        Ok(token)
    }

    /// Invalidate a user's access token.
    pub async fn logout(&self, user_id: &str) -> AppResult<()> {
        let user = self.user_repo.get_by_id(user_id).await?;

        let mut active: user::ActiveModel = user.into();
        active.token = Set(None);
        active.updated_at = Set(Some(chrono::Utc::now().into()));
        self.user_repo.update(active).await?;

        Ok(())
    }

    /// Store a new avatar from a base64 data URI.
    pub async fn set_avatar(&self, user_id: &str, data_uri: &str) -> AppResult<user::Model> {
        let user = self.user_repo.get_by_id(user_id).await?;
        let avatar_url = self.media.store_data_uri(user_id, data_uri).await?;

        let mut active: user::ActiveModel = user.into();
        active.avatar_url = Set(Some(avatar_url));
        active.updated_at = Set(Some(chrono::Utc::now().into()));
        self.user_repo.update(active).await
    }

    /// Remove the user's avatar.
    pub async fn delete_avatar(&self, user_id: &str) -> AppResult<user::Model> {
        let user = self.user_repo.get_by_id(user_id).await?;

        if let Some(ref url) = user.avatar_url
            && let Err(e) = self.media.delete_by_url(url).await
        {
            tracing::warn!(error = %e, user_id = %user.id, "Failed to delete stored avatar");
        }

        let mut active: user::ActiveModel = user.into();
        active.avatar_url = Set(None);
        active.updated_at = Set(Some(chrono::Utc::now().into()));
        self.user_repo.update(active).await
    }
}

/// Hash a password with Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against an Argon2 hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Invalid password hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use recipedia_common::LocalStorage;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn create_media() -> MediaService {
        MediaService::new(
            Arc::new(LocalStorage::new(
                std::env::temp_dir(),
                "/media".to_string(),
            )),
            "https://example.com".to_string(),
        )
    }

    fn create_test_user(id: &str, username: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            avatar_url: None,
            password_hash: hash_password("correct horse").unwrap(),
            token: Some("token123".to_string()),
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn service_with(db: MockDatabase) -> UserService {
        UserService::new(
            UserRepository::new(Arc::new(db.into_connection())),
            create_media(),
        )
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("alice.smith_01@+-").is_ok());
        assert!(validate_username("bad name").is_err());
        assert!(validate_username("bad/name").is_err());
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("secret password").unwrap();
        assert!(verify_password("secret password", &hash).unwrap());
        assert!(!verify_password("wrong password", &hash).unwrap());
    }

    #[tokio::test]
    async fn test_register_rejects_short_password() {
        let service = service_with(MockDatabase::new(DatabaseBackend::Postgres));

        let result = service
            .register(CreateUserInput {
                email: "alice@example.com".to_string(),
                username: "alice".to_string(),
                first_name: "Alice".to_string(),
                last_name: "Smith".to_string(),
                password: "short".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_register_rejects_taken_username() {
        let existing = create_test_user("u1", "alice");
        let service = service_with(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[existing]]),
        );

        let result = service
            .register(CreateUserInput {
                email: "other@example.com".to_string(),
                username: "alice".to_string(),
                first_name: "Alice".to_string(),
                last_name: "Smith".to_string(),
                password: "long enough password".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_login_wrong_password_is_unauthorized() {
        let existing = create_test_user("u1", "alice");
        let service = service_with(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[existing]]),
        );

        let result = service.login("alice@example.com", "wrong password").await;

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_login_returns_existing_token() {
        let existing = create_test_user("u1", "alice");
        let service = service_with(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[existing]]),
        );

        let token = service
            .login("alice@example.com", "correct horse")
            .await
            .unwrap();

        assert_eq!(token, "token123");
    }

    #[tokio::test]
    async fn test_authenticate_by_unknown_token() {
        let service = service_with(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()]),
        );

        let result = service.authenticate_by_token("nope").await;

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }
}
