use async_trait::async_trait;
use sqlx::PgPool;

use crate::auth::repo_types::User;

/// Credential store: users keyed by email.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    /// Returns false when the email is already taken.
    async fn insert(&self, user: &User) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    /// Find a user by email.
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, full_name, address, phone, is_admin, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn insert(&self, user: &User) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, full_name, address, phone, is_admin, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(&user.address)
        .bind(&user.phone)
        .bind(user.is_admin)
        .bind(user.created_at)
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected() == 1)
    }
}
