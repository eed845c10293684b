use crate::error::{AppError, Result};
use crate::models::{CreateUser, User};
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

/// One normalization rule for usernames, applied at registration and at every
/// lookup: trimmed and lowercased.
pub fn normalize_username(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[derive(Clone)]
pub struct UserService {
    db: SqlitePool,
}

impl UserService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn create(&self, input: CreateUser) -> Result<User> {
        let username = normalize_username(&input.username);
        if username.is_empty() {
            return Err(AppError::Validation("Username must not be empty".to_string()));
        }
        let email = input.email.trim().to_lowercase();
        if email.is_empty() {
            return Err(AppError::Validation("Email must not be empty".to_string()));
        }

        let existing: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = ? OR email = ?)")
                .bind(&username)
                .bind(&email)
                .fetch_one(&self.db)
                .await?;

        if existing {
            return Err(AppError::Conflict(
                "Username or email already exists".to_string(),
            ));
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(input.password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {}", e)))?
            .to_string();

        let now = Utc::now();
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, display_name, email, password_hash, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id, username, display_name, email, password_hash, avatar_url, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&username)
        .bind(input.display_name.trim())
        .bind(&email)
        .bind(&password_hash)
        .bind(now)
        .bind(now)
        .fetch_one(&self.db)
        .await?;

        Ok(user)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, display_name, email, password_hash, avatar_url, created_at, updated_at
            FROM users WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        Ok(user)
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, display_name, email, password_hash, avatar_url, created_at, updated_at
            FROM users WHERE username = ?
            "#,
        )
        .bind(normalize_username(username))
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    pub async fn verify_credentials(&self, username: &str, password: &str) -> Result<User> {
        let user = self
            .find_by_username(username)
            .await?
            .ok_or(AppError::NotAuthenticated)?;

        let parsed_hash = PasswordHash::new(&user.password_hash)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid password hash: {}", e)))?;

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| AppError::NotAuthenticated)?;

        Ok(user)
    }
}
