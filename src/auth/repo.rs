use sqlx::AnyPool;

use crate::auth::repo_types::User;
use crate::db::{last_insert_id, now_unix};

const USER_COLUMNS: &str = "id, username, email, password_hash, created_at";

impl User {
    /// Find a user by exact username.
    pub async fn find_by_username(db: &AnyPool, username: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?"))
            .bind(username)
            .fetch_optional(db)
            .await
    }

    /// Find a user by email (emails are stored lower-cased).
    pub async fn find_by_email(db: &AnyPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
            .bind(email.to_lowercase())
            .fetch_optional(db)
            .await
    }

    pub async fn find_by_id(db: &AnyPool, id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Username first, then email when the identifier looks like one.
    pub async fn find_by_login(db: &AnyPool, identifier: &str) -> Result<Option<User>, sqlx::Error> {
        if let Some(user) = Self::find_by_username(db, identifier).await? {
            return Ok(Some(user));
        }
        if identifier.contains('@') {
            return Self::find_by_email(db, identifier).await;
        }
        Ok(None)
    }

    /// Create a new user with an already hashed password. Nothing is kept
    /// unless the new id could be read back.
    pub async fn create(
        db: &AnyPool,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, sqlx::Error> {
        let created_at = now_unix();
        let mut tx = db.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO users (username, email, password_hash, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(created_at)
        .execute(&mut *tx)
        .await?;
        let id = last_insert_id(&mut tx).await?;
        tx.commit().await?;

        Ok(User {
            id,
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at,
        })
    }

    pub async fn count(db: &AnyPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(db)
            .await
    }
}
