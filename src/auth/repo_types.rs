use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String, // trimmed + lowercased
    #[serde(skip_serializing)]
    pub password: Option<String>, // PBKDF2 salt||key, None for OAuth-only accounts
    pub name: Option<String>,
    pub image: Option<String>,
    pub email_verified: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

/// Fields supplied when inserting a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password: Option<String>,
    pub name: Option<String>,
    pub image: Option<String>,
}
