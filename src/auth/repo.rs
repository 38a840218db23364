use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,

    #[error("user store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Persistence for user accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find a user by normalized (lowercased) email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Insert a user. Fails with [`StoreError::DuplicateEmail`] if the email is taken.
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;

    /// Set `email_verified` unless already set. Returns the updated row.
    async fn mark_email_verified(
        &self,
        id: Uuid,
        at: OffsetDateTime,
    ) -> Result<Option<User>, StoreError>;

    /// Round trip to the backing store.
    async fn ping(&self) -> Result<(), StoreError>;

    async fn close(&self);
}

const USER_COLUMNS: &str = "id, email, password, name, image, email_verified, created_at";

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { db })
    }

    /// Run embedded migrations. A failure is logged and startup continues.
    pub async fn migrate(&self) {
        match sqlx::migrate!("./migrations").run(&self.db).await {
            Ok(()) => info!("migrations applied"),
            Err(e) => warn!(error = %e, "migration failed; continuing"),
        }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, email, password, name, image)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.password)
        .bind(&user.name)
        .bind(&user.image)
        .fetch_one(&self.db)
        .await;

        match row {
            Ok(u) => Ok(u),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::DuplicateEmail)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn mark_email_verified(
        &self,
        id: Uuid,
        at: OffsetDateTime,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET email_verified = COALESCE(email_verified, $2)
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(at)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }

    async fn close(&self) {
        self.db.close().await;
    }
}
