use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::loyalty::LoyaltyTier;

/// Points granted for one delivered order
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RewardPoints {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_id: Uuid,
    pub points_earned: i64,
    pub claimed: bool,
    pub claimed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub expiration_date: DateTime<Utc>,
}

impl RewardPoints {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration_date < now
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClaimPointsRequest {
    pub user_id: Uuid,
    #[validate(length(min = 1, message = "At least one reward must be claimed"))]
    pub reward_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClaimPointsResponse {
    pub points_claimed: i64,
    pub total_points_after_claim: i64,
    pub new_tier: LoyaltyTier,
}

/// A user's loyalty standing and grant history
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserRewardsSummary {
    pub user_id: Uuid,
    pub total_points: i64,
    pub unclaimed_points: i64,
    pub claimed_points: i64,
    pub current_tier: LoyaltyTier,
    pub earning_rate: Decimal,
    pub points_to_next_tier: i64,
    pub rewards: Vec<RewardPoints>,
}
