//! User accounts in SQLite

use shared_types::{Role, User};
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub enabled: bool,
}

impl UserRow {
    pub fn to_user(&self) -> User {
        let role = self.role.parse().unwrap_or_else(|_| {
            tracing::warn!(user_id = self.id, role = %self.role, "Unknown role, treating as USER");
            Role::User
        });
        User {
            id: self.id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            role,
            enabled: self.enabled,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Clone)]
pub struct UserStore {
    db: SqlitePool,
}

impl UserStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Emails are compared case-insensitively
    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserRow>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT id, first_name, last_name, email, password_hash, role, enabled
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.db)
        .await
    }

    pub async fn create(&self, user: NewUser) -> Result<User, sqlx::Error> {
        let email = normalize_email(&user.email);
        let result = sqlx::query(
            r#"
            INSERT INTO users (first_name, last_name, email, password_hash, role, enabled)
            VALUES (?, ?, ?, ?, ?, 1)
            "#,
        )
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .execute(&self.db)
        .await?;

        Ok(User {
            id: result.last_insert_rowid(),
            first_name: user.first_name,
            last_name: user.last_name,
            email,
            role: user.role,
            enabled: true,
        })
    }

    pub async fn set_enabled(&self, id: i64, enabled: bool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET enabled = ? WHERE id = ?")
            .bind(enabled)
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// True when a database error is a UNIQUE constraint violation
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}
