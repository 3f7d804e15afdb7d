use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::db::is_unique_violation;
use crate::error::ApiError;
use crate::loyalty::LoyaltyLedger;
use crate::orders::{OrderStatus, OrdersRepository};
use crate::rewards::{
    ClaimPointsRequest, ClaimPointsResponse, RewardPoints, RewardsRepository, UserRewardsSummary,
};
use crate::users::UsersRepository;

const MSG_ALREADY_GENERATED: &str = "Points already generated for this order";

/// Turns delivered orders into reward grants and lets users claim them
#[derive(Clone)]
pub struct RewardService {
    repo: RewardsRepository,
    ledger: Arc<LoyaltyLedger>,
}

impl RewardService {
    pub fn new(repo: RewardsRepository, ledger: Arc<LoyaltyLedger>) -> Self {
        Self { repo, ledger }
    }

    pub fn ledger(&self) -> &LoyaltyLedger {
        &self.ledger
    }

    /// Create the reward grant for a delivered order
    ///
    /// # Errors
    /// - `NotFound` if the order or its user does not exist
    /// - `InvalidState` if the order is not delivered or was placed by a guest
    /// - `Conflict` if the order already has a grant
    pub async fn generate_points_for_order(&self, order_id: Uuid) -> Result<RewardPoints, ApiError> {
        let mut tx = self.repo.pool().begin().await?;

        let order = OrdersRepository::lock_by_id(&mut *tx, order_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Order", order_id))?;

        if order.status != OrderStatus::Delivered {
            return Err(ApiError::InvalidState(format!(
                "Points can only be generated for delivered orders (order is {})",
                order.status
            )));
        }
        let user_id = order
            .user_id
            .ok_or_else(|| ApiError::InvalidState("Guest orders do not earn points".to_string()))?;

        if RewardsRepository::exists_for_order(&mut *tx, order_id).await? {
            return Err(ApiError::conflict(MSG_ALREADY_GENERATED));
        }

        let user = UsersRepository::require_active(&mut *tx, user_id).await?;
        let tier = self.ledger.tier_for(user.loyalty_points);
        let points = self.ledger.points_for(order.final_amount, tier);
        let now = Utc::now();

        let reward = RewardsRepository::insert(
            &mut *tx,
            user_id,
            order_id,
            points,
            now,
            self.ledger.expiration_from(now),
        )
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::conflict(MSG_ALREADY_GENERATED)
            } else {
                e.into()
            }
        })?;

        tx.commit().await?;

        tracing::info!(
            "Generated {} points ({} tier) for order {} of user {}",
            points,
            tier,
            order_id,
            user_id
        );
        Ok(reward)
    }

    /// Generate grants for every delivered order of a user that lacks one
    ///
    /// A failure on one order is logged and the batch moves on.
    pub async fn process_user_orders(&self, user_id: Uuid) -> Result<Vec<RewardPoints>, ApiError> {
        UsersRepository::require_active(self.repo.pool(), user_id).await?;

        let order_ids = OrdersRepository::delivered_without_reward(self.repo.pool(), user_id).await?;
        let mut generated = Vec::with_capacity(order_ids.len());

        for order_id in order_ids {
            match self.generate_points_for_order(order_id).await {
                Ok(reward) => generated.push(reward),
                Err(e) => tracing::warn!("Skipping reward generation for order {}: {}", order_id, e),
            }
        }

        tracing::info!("Processed rewards for user {}: {} grants created", user_id, generated.len());
        Ok(generated)
    }

    /// Claim unexpired grants into the user's spendable balance
    ///
    /// All grants are claimed together or not at all.
    pub async fn claim_points(&self, request: ClaimPointsRequest) -> Result<ClaimPointsResponse, ApiError> {
        request.validate()?;

        let mut seen = HashSet::with_capacity(request.reward_ids.len());
        for id in &request.reward_ids {
            if !seen.insert(*id) {
                return Err(ApiError::InvalidArgument(format!("Duplicate reward id: {}", id)));
            }
        }

        let mut tx = self.repo.pool().begin().await?;
        let user = UsersRepository::lock_active(&mut *tx, request.user_id).await?;
        let rewards = RewardsRepository::lock_many(&mut *tx, &request.reward_ids).await?;
        let now = Utc::now();

        let mut points_claimed: i64 = 0;
        for id in &request.reward_ids {
            let reward = rewards
                .iter()
                .find(|r| r.id == *id)
                .ok_or_else(|| ApiError::not_found("Reward", id))?;

            if reward.user_id != user.id {
                return Err(ApiError::InvalidArgument(format!(
                    "Reward {} does not belong to user {}",
                    id, user.id
                )));
            }
            if reward.claimed {
                return Err(ApiError::conflict(format!("Reward {} has already been claimed", id)));
            }
            if reward.is_expired(now) {
                return Err(ApiError::InvalidArgument(format!("Reward {} has expired", id)));
            }
            points_claimed = points_claimed
                .checked_add(reward.points_earned)
                .ok_or_else(|| ApiError::InternalError("Claimed points overflow".to_string()))?;
        }

        let marked = RewardsRepository::mark_claimed(&mut *tx, &request.reward_ids, now).await?;
        if marked != request.reward_ids.len() as u64 {
            return Err(ApiError::conflict("Rewards were claimed concurrently"));
        }

        let total = UsersRepository::add_loyalty_points(&mut *tx, user.id, points_claimed).await?;
        tx.commit().await?;

        let new_tier = self.ledger.tier_for(total);
        tracing::info!(
            "User {} claimed {} points, balance {} ({})",
            user.id,
            points_claimed,
            total,
            new_tier
        );

        Ok(ClaimPointsResponse {
            points_claimed,
            total_points_after_claim: total,
            new_tier,
        })
    }

    pub async fn get_user_rewards(&self, user_id: Uuid) -> Result<UserRewardsSummary, ApiError> {
        let user = UsersRepository::require_active(self.repo.pool(), user_id).await?;
        let rewards = self.repo.find_by_user(user_id).await?;
        let now = Utc::now();

        let unclaimed_points = rewards
            .iter()
            .filter(|r| !r.claimed && !r.is_expired(now))
            .map(|r| r.points_earned)
            .sum();
        let claimed_points = rewards.iter().filter(|r| r.claimed).map(|r| r.points_earned).sum();
        let tier = self.ledger.tier_for(user.loyalty_points);

        Ok(UserRewardsSummary {
            user_id,
            total_points: user.loyalty_points,
            unclaimed_points,
            claimed_points,
            current_tier: tier,
            earning_rate: self.ledger.rate(tier),
            points_to_next_tier: self.ledger.points_to_next_tier(user.loyalty_points),
            rewards,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loyalty::{LoyaltyConfig, LoyaltyTier};
    use crate::test_support;
    use rust_decimal_macros::dec;
    use sqlx::PgPool;

    fn service(pool: &PgPool) -> RewardService {
        let ledger = LoyaltyLedger::new(LoyaltyConfig::default()).unwrap();
        RewardService::new(RewardsRepository::new(pool.clone()), Arc::new(ledger))
    }

    #[tokio::test]
    async fn test_silver_user_earns_two_percent() {
        let Some(pool) = test_support::test_pool().await else { return };
        let user = test_support::create_user(&pool, 1200).await;
        let order = test_support::create_order(&pool, Some(user), dec!(500.00), OrderStatus::Delivered).await;

        let reward = service(&pool).generate_points_for_order(order).await.unwrap();
        assert_eq!(reward.points_earned, 10);
        assert!(!reward.claimed);
        assert!(reward.expiration_date > reward.created_at);
    }

    #[tokio::test]
    async fn test_duplicate_grant_is_conflict() {
        let Some(pool) = test_support::test_pool().await else { return };
        let rewards = service(&pool);
        let user = test_support::create_user(&pool, 0).await;
        let order = test_support::create_order(&pool, Some(user), dec!(120.00), OrderStatus::Delivered).await;

        rewards.generate_points_for_order(order).await.unwrap();
        let err = rewards.generate_points_for_order(order).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_undelivered_and_guest_orders_rejected() {
        let Some(pool) = test_support::test_pool().await else { return };
        let rewards = service(&pool);
        let user = test_support::create_user(&pool, 0).await;

        let pending = test_support::create_order(&pool, Some(user), dec!(50.00), OrderStatus::Pending).await;
        assert!(matches!(
            rewards.generate_points_for_order(pending).await.unwrap_err(),
            ApiError::InvalidState(_)
        ));

        let guest = test_support::create_order(&pool, None, dec!(50.00), OrderStatus::Delivered).await;
        assert!(matches!(
            rewards.generate_points_for_order(guest).await.unwrap_err(),
            ApiError::InvalidState(_)
        ));

        assert!(matches!(
            rewards.generate_points_for_order(Uuid::new_v4()).await.unwrap_err(),
            ApiError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_process_then_claim() {
        let Some(pool) = test_support::test_pool().await else { return };
        let rewards = service(&pool);
        let user = test_support::create_user(&pool, 950).await;
        test_support::create_order(&pool, Some(user), dec!(1000.00), OrderStatus::Delivered).await;
        test_support::create_order(&pool, Some(user), dec!(500.00), OrderStatus::Delivered).await;
        test_support::create_order(&pool, Some(user), dec!(999.00), OrderStatus::Shipped).await;

        let generated = rewards.process_user_orders(user).await.unwrap();
        assert_eq!(generated.len(), 2);
        assert!(rewards.process_user_orders(user).await.unwrap().is_empty());

        let ids: Vec<Uuid> = generated.iter().map(|r| r.id).collect();
        let claimed = rewards
            .claim_points(ClaimPointsRequest { user_id: user, reward_ids: ids.clone() })
            .await
            .unwrap();
        // BRONZE rate: 10 + 5 points
        assert_eq!(claimed.points_claimed, 15);
        assert_eq!(claimed.total_points_after_claim, 965);
        assert_eq!(claimed.new_tier, LoyaltyTier::Bronze);

        let err = rewards
            .claim_points(ClaimPointsRequest { user_id: user, reward_ids: ids })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict { .. }));

        let summary = rewards.get_user_rewards(user).await.unwrap();
        assert_eq!(summary.total_points, 965);
        assert_eq!(summary.claimed_points, 15);
        assert_eq!(summary.unclaimed_points, 0);
        assert_eq!(summary.points_to_next_tier, 35);
        assert_eq!(summary.earning_rate, dec!(0.01));
    }

    #[tokio::test]
    async fn test_claim_rejects_foreign_and_duplicate_ids() {
        let Some(pool) = test_support::test_pool().await else { return };
        let rewards = service(&pool);
        let owner = test_support::create_user(&pool, 0).await;
        let other = test_support::create_user(&pool, 0).await;
        let order = test_support::create_order(&pool, Some(owner), dec!(300.00), OrderStatus::Delivered).await;
        let reward = rewards.generate_points_for_order(order).await.unwrap();

        let err = rewards
            .claim_points(ClaimPointsRequest { user_id: other, reward_ids: vec![reward.id] })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)));

        let err = rewards
            .claim_points(ClaimPointsRequest { user_id: owner, reward_ids: vec![reward.id, reward.id] })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)));

        let err = rewards
            .claim_points(ClaimPointsRequest { user_id: owner, reward_ids: vec![Uuid::new_v4()] })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_expired_grant_cannot_be_claimed() {
        let Some(pool) = test_support::test_pool().await else { return };
        let rewards = service(&pool);
        let user = test_support::create_user(&pool, 0).await;
        let order = test_support::create_order(&pool, Some(user), dec!(300.00), OrderStatus::Delivered).await;
        let reward = rewards.generate_points_for_order(order).await.unwrap();
        sqlx::query("UPDATE reward_points SET expiration_date = NOW() - INTERVAL '1 day' WHERE id = $1")
            .bind(reward.id)
            .execute(&pool)
            .await
            .unwrap();

        let err = rewards
            .claim_points(ClaimPointsRequest { user_id: user, reward_ids: vec![reward.id] })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)));
        assert_eq!(rewards.get_user_rewards(user).await.unwrap().unclaimed_points, 0);
    }
}
