use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::User;
use crate::password_reset::challenge::Challenge;

/// Account lookups and challenge persistence the reset flow depends on.
#[async_trait]
pub trait ResetStore: Send + Sync {
    /// First account registered with `email`.
    async fn find_account(&self, email: &str) -> anyhow::Result<Option<User>>;

    /// Marks every unused challenge of the user as used and stores a fresh one, as one unit.
    async fn issue_challenge(
        &self,
        user_id: Uuid,
        code: &str,
        created_at: OffsetDateTime,
    ) -> anyhow::Result<Challenge>;

    async fn find_unused_challenge(
        &self,
        user_id: Uuid,
        code: &str,
    ) -> anyhow::Result<Option<Challenge>>;

    /// Flips `used`; false when someone else consumed it first.
    async fn consume_challenge(&self, challenge_id: Uuid) -> anyhow::Result<bool>;

    async fn set_password_hash(&self, user_id: Uuid, password_hash: &str) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct PgResetStore {
    db: PgPool,
}

impl PgResetStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ResetStore for PgResetStore {
    async fn find_account(&self, email: &str) -> anyhow::Result<Option<User>> {
        User::find_by_email(&self.db, email).await
    }

    async fn issue_challenge(
        &self,
        user_id: Uuid,
        code: &str,
        created_at: OffsetDateTime,
    ) -> anyhow::Result<Challenge> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        // serialize concurrent issues for the same user
        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await
            .context("lock user")?;

        sqlx::query(
            r#"
            UPDATE password_reset_challenges
               SET used = TRUE
             WHERE user_id = $1 AND used = FALSE
            "#,
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .context("invalidate challenges")?;

        let challenge = sqlx::query_as::<_, Challenge>(
            r#"
            INSERT INTO password_reset_challenges (id, user_id, code, created_at, used)
            VALUES ($1, $2, $3, $4, FALSE)
            RETURNING id, user_id, code, created_at, used
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(code)
        .bind(created_at)
        .fetch_one(&mut *tx)
        .await
        .context("insert challenge")?;

        tx.commit().await.context("commit tx")?;
        Ok(challenge)
    }

    async fn find_unused_challenge(
        &self,
        user_id: Uuid,
        code: &str,
    ) -> anyhow::Result<Option<Challenge>> {
        let challenge = sqlx::query_as::<_, Challenge>(
            r#"
            SELECT id, user_id, code, created_at, used
              FROM password_reset_challenges
             WHERE user_id = $1 AND code = $2 AND used = FALSE
             ORDER BY created_at DESC
             LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(code)
        .fetch_optional(&self.db)
        .await
        .context("find challenge")?;
        Ok(challenge)
    }

    async fn consume_challenge(&self, challenge_id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query(
            "UPDATE password_reset_challenges SET used = TRUE WHERE id = $1 AND used = FALSE",
        )
        .bind(challenge_id)
        .execute(&self.db)
        .await
        .context("consume challenge")?;
        Ok(res.rows_affected() == 1)
    }

    async fn set_password_hash(&self, user_id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        User::update_password_hash(&self.db, user_id, password_hash).await
    }
}
