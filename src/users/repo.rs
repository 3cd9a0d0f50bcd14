use std::collections::BTreeMap;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::RwLock;

use crate::users::repo_types::User;

/// Storage port for user records.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// All users, ordered by id.
    async fn find_all(&self) -> anyhow::Result<Vec<User>>;
    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>>;
    /// Insert when `user.id` is `None` (the store assigns the id), otherwise
    /// write the record under its id.
    async fn save(&self, user: User) -> anyhow::Result<User>;
    /// Removing an unknown id is a no-op.
    async fn delete_by_id(&self, id: i64) -> anyhow::Result<()>;
}

const USER_COLUMNS: &str = "id, username, normalized_username, email, normalized_email, \
                            first_name, last_name, password_hash, registration_time";

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_all(&self) -> anyhow::Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id"
        ))
        .fetch_all(&self.db)
        .await
        .context("list users")?;
        Ok(users)
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    async fn save(&self, user: User) -> anyhow::Result<User> {
        let saved = match user.id {
            None => sqlx::query_as::<_, User>(&format!(
                r#"
                INSERT INTO users (username, normalized_username, email, normalized_email,
                                   first_name, last_name, password_hash, registration_time)
                VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, now()))
                RETURNING {USER_COLUMNS}
                "#
            ))
            .bind(&user.username)
            .bind(&user.normalized_username)
            .bind(&user.email)
            .bind(&user.normalized_email)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.password_hash)
            .bind(user.registration_time)
            .fetch_one(&self.db)
            .await
            .context("insert user")?,
            Some(id) => sqlx::query_as::<_, User>(&format!(
                r#"
                INSERT INTO users (id, username, normalized_username, email, normalized_email,
                                   first_name, last_name, password_hash, registration_time)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, COALESCE($9, now()))
                ON CONFLICT (id) DO UPDATE SET
                    username = EXCLUDED.username,
                    normalized_username = EXCLUDED.normalized_username,
                    email = EXCLUDED.email,
                    normalized_email = EXCLUDED.normalized_email,
                    first_name = EXCLUDED.first_name,
                    last_name = EXCLUDED.last_name,
                    password_hash = EXCLUDED.password_hash,
                    registration_time = EXCLUDED.registration_time
                RETURNING {USER_COLUMNS}
                "#
            ))
            .bind(id)
            .bind(&user.username)
            .bind(&user.normalized_username)
            .bind(&user.email)
            .bind(&user.normalized_email)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.password_hash)
            .bind(user.registration_time)
            .fetch_one(&self.db)
            .await
            .context("update user")?,
        };
        Ok(saved)
    }

    async fn delete_by_id(&self, id: i64) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete user")?;
        Ok(())
    }
}

/// Process-local store, used when no database is configured and in tests.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    inner: RwLock<InMemoryUsers>,
}

#[derive(Debug, Default)]
struct InMemoryUsers {
    users: BTreeMap<i64, User>,
    last_id: i64,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_all(&self) -> anyhow::Result<Vec<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().cloned().collect())
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(&id).cloned())
    }

    async fn save(&self, mut user: User) -> anyhow::Result<User> {
        let mut inner = self.inner.write().await;
        let id = match user.id {
            Some(id) => {
                inner.last_id = inner.last_id.max(id);
                id
            }
            None => {
                inner.last_id += 1;
                inner.last_id
            }
        };
        user.id = Some(id);
        if user.registration_time.is_none() {
            user.registration_time = Some(time::OffsetDateTime::now_utc());
        }
        inner.users.insert(id, user.clone());
        Ok(user)
    }

    async fn delete_by_id(&self, id: i64) -> anyhow::Result<()> {
        self.inner.write().await.users.remove(&id);
        Ok(())
    }
}
