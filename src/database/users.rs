use async_trait::async_trait;
use sqlx::PgPool;

use crate::database::manager::{Database, DatabaseError};
use crate::database::models::{NewUser, User};

const USER_COLUMNS: &str = "user_id, email, name, birth_date, gender, image, version, platform, \
     firebase_uid, is_onboarded, created_at::varchar AS created_at";

/// Storage operations needed to resolve the signed-in user
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;

    /// Insert a user. Returns `None` when a user with the same email already
    /// exists; uniqueness is enforced by the store, not by the caller.
    async fn insert_user(&self, user: NewUser) -> Result<Option<User>, DatabaseError>;
}

/// Outcome of [`find_or_create_user`]
#[derive(Debug, Clone, PartialEq)]
pub enum UserLookup {
    Found(User),
    Inserted(User),
}

impl UserLookup {
    pub fn into_user(self) -> User {
        match self {
            UserLookup::Found(user) | UserLookup::Inserted(user) => user,
        }
    }

    pub fn was_inserted(&self) -> bool {
        matches!(self, UserLookup::Inserted(_))
    }
}

/// Upsert-by-email: return the existing user or create one from `new_user`.
///
/// Two concurrent first sign-ins for the same email both miss the lookup; the
/// store lets exactly one insert through and the loser re-reads the winner's row.
pub async fn find_or_create_user(
    store: &dyn UserStore,
    new_user: NewUser,
) -> Result<UserLookup, DatabaseError> {
    if let Some(user) = store.find_user_by_email(&new_user.email).await? {
        return Ok(UserLookup::Found(user));
    }

    let email = new_user.email.clone();
    match store.insert_user(new_user).await? {
        Some(user) => {
            tracing::info!("Created user {} for {}", user.user_id, user.email);
            Ok(UserLookup::Inserted(user))
        }
        None => {
            tracing::debug!("Concurrent insert for {}, loading existing row", email);
            store
                .find_user_by_email(&email)
                .await?
                .map(UserLookup::Found)
                .ok_or_else(|| DatabaseError::QuerySingle(format!("user {} not found after conflict", email)))
        }
    }
}

/// PostgreSQL-backed user store
#[derive(Clone, Debug)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
        }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let query = format!("SELECT {} FROM users WHERE email = $1 LIMIT 1", USER_COLUMNS);

        let user = sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn insert_user(&self, user: NewUser) -> Result<Option<User>, DatabaseError> {
        let query = format!(
            "INSERT INTO users (email, name, image, version, platform, firebase_uid) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (email) DO NOTHING \
             RETURNING {}",
            USER_COLUMNS
        );

        let inserted = sqlx::query_as::<_, User>(&query)
            .bind(&user.email)
            .bind(&user.name)
            .bind(&user.image)
            .bind(&user.version)
            .bind(&user.platform)
            .bind(&user.firebase_uid)
            .fetch_optional(&self.pool)
            .await?;

        Ok(inserted)
    }
}
