use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::ApiError;
use crate::rewards::RewardPoints;

const REWARD_COLUMNS: &str =
    "id, user_id, order_id, points_earned, claimed, claimed_at, created_at, expiration_date";

/// Repository for reward-point grants
#[derive(Clone)]
pub struct RewardsRepository {
    pool: PgPool,
}

impl RewardsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn exists_for_order(conn: &mut PgConnection, order_id: Uuid) -> Result<bool, ApiError> {
        let exists: Option<bool> =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM reward_points WHERE order_id = $1)")
                .bind(order_id)
                .fetch_one(conn)
                .await?;

        Ok(exists.unwrap_or(false))
    }

    /// Insert an unclaimed grant; the order_id UNIQUE constraint rejects a second one
    pub async fn insert(
        conn: &mut PgConnection,
        user_id: Uuid,
        order_id: Uuid,
        points: i64,
        created_at: DateTime<Utc>,
        expiration_date: DateTime<Utc>,
    ) -> Result<RewardPoints, sqlx::Error> {
        sqlx::query_as::<_, RewardPoints>(&format!(
            r#"
            INSERT INTO reward_points (user_id, order_id, points_earned, created_at, expiration_date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            REWARD_COLUMNS
        ))
        .bind(user_id)
        .bind(order_id)
        .bind(points)
        .bind(created_at)
        .bind(expiration_date)
        .fetch_one(conn)
        .await
    }

    /// Lock the requested grants for claiming
    pub async fn lock_many(conn: &mut PgConnection, reward_ids: &[Uuid]) -> Result<Vec<RewardPoints>, ApiError> {
        let rewards = sqlx::query_as::<_, RewardPoints>(&format!(
            "SELECT {} FROM reward_points WHERE id = ANY($1) ORDER BY id FOR UPDATE",
            REWARD_COLUMNS
        ))
        .bind(reward_ids)
        .fetch_all(conn)
        .await?;

        Ok(rewards)
    }

    pub async fn mark_claimed(
        conn: &mut PgConnection,
        reward_ids: &[Uuid],
        claimed_at: DateTime<Utc>,
    ) -> Result<u64, ApiError> {
        let result = sqlx::query(
            "UPDATE reward_points SET claimed = TRUE, claimed_at = $1 WHERE id = ANY($2) AND claimed = FALSE",
        )
        .bind(claimed_at)
        .bind(reward_ids)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// All grants for a user, newest first
    pub async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<RewardPoints>, ApiError> {
        let rewards = sqlx::query_as::<_, RewardPoints>(&format!(
            "SELECT {} FROM reward_points WHERE user_id = $1 ORDER BY created_at DESC, id",
            REWARD_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rewards)
    }
}
