// HTTP handlers for reward-point settlement

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::ApiError;
use crate::rewards::{ClaimPointsRequest, ClaimPointsResponse, RewardPoints, UserRewardsSummary};
use crate::AppState;

/// Handler for POST /api/rewards/orders/{order_id}
#[utoipa::path(
    post,
    path = "/api/rewards/orders/{order_id}",
    params(("order_id" = Uuid, Path, description = "Delivered order to settle")),
    responses(
        (status = 201, description = "Points generated", body = RewardPoints),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order not delivered or already settled")
    ),
    tag = "rewards"
)]
pub async fn generate_points_handler(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<(StatusCode, Json<RewardPoints>), ApiError> {
    let reward = state.reward_service.generate_points_for_order(order_id).await?;
    Ok((StatusCode::CREATED, Json(reward)))
}

/// Handler for POST /api/rewards/process/{user_id}
pub async fn process_user_orders_handler(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<RewardPoints>>, ApiError> {
    let rewards = state.reward_service.process_user_orders(user_id).await?;
    Ok(Json(rewards))
}

/// Handler for POST /api/rewards/claim
#[utoipa::path(
    post,
    path = "/api/rewards/claim",
    request_body = ClaimPointsRequest,
    responses(
        (status = 200, description = "Points claimed", body = ClaimPointsResponse),
        (status = 400, description = "Expired, foreign or duplicate reward ids"),
        (status = 409, description = "Reward already claimed")
    ),
    tag = "rewards"
)]
pub async fn claim_points_handler(
    State(state): State<AppState>,
    Json(request): Json<ClaimPointsRequest>,
) -> Result<Json<ClaimPointsResponse>, ApiError> {
    let response = state.reward_service.claim_points(request).await?;
    Ok(Json(response))
}

/// Handler for GET /api/rewards/user/{user_id}
#[utoipa::path(
    get,
    path = "/api/rewards/user/{user_id}",
    params(("user_id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Reward summary", body = UserRewardsSummary),
        (status = 404, description = "User not found")
    ),
    tag = "rewards"
)]
pub async fn get_user_rewards_handler(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserRewardsSummary>, ApiError> {
    let summary = state.reward_service.get_user_rewards(user_id).await?;
    Ok(Json(summary))
}
