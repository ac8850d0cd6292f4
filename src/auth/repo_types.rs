use sqlx::FromRow;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,                    // auto-increment id
    pub username: String,           // unique
    pub email: String,              // unique, stored lower-cased
    pub password_hash: String,      // Argon2 PHC string, never serialized
    pub created_at: i64,            // unix seconds
}
