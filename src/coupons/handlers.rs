// HTTP handlers for coupon endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::coupons::{
    Coupon, CouponListQuery, CouponUsage, CouponValidationResponse, CreateCouponRequest,
    UpdateCouponRequest, ValidateCouponRequest,
};
use crate::error::ApiError;
use crate::AppState;

/// Handler for POST /api/coupons/validate and POST /api/discounts/verify
/// Read-only preview: never counts a redemption
#[utoipa::path(
    post,
    path = "/api/coupons/validate",
    request_body = ValidateCouponRequest,
    responses(
        (status = 200, description = "Coupon verdict", body = CouponValidationResponse),
        (status = 400, description = "Malformed request")
    ),
    tag = "coupons"
)]
pub async fn validate_coupon_handler(
    State(state): State<AppState>,
    Json(request): Json<ValidateCouponRequest>,
) -> Result<Json<CouponValidationResponse>, ApiError> {
    let verdict = state.coupon_service.validate_coupon(request).await?;
    Ok(Json(verdict))
}

/// Handler for POST /api/coupons
#[utoipa::path(
    post,
    path = "/api/coupons",
    request_body = CreateCouponRequest,
    responses(
        (status = 201, description = "Coupon created", body = Coupon),
        (status = 400, description = "Invalid coupon terms"),
        (status = 409, description = "Code already exists")
    ),
    tag = "coupons"
)]
pub async fn create_coupon_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateCouponRequest>,
) -> Result<(StatusCode, Json<Coupon>), ApiError> {
    tracing::debug!("Creating coupon {}", request.code);
    let coupon = state.coupon_service.create_coupon(request).await?;
    Ok((StatusCode::CREATED, Json(coupon)))
}

/// Handler for GET /api/coupons
pub async fn list_coupons_handler(
    State(state): State<AppState>,
    Query(query): Query<CouponListQuery>,
) -> Result<Json<Vec<Coupon>>, ApiError> {
    let coupons = state.coupon_service.list_coupons(query).await?;
    Ok(Json(coupons))
}

/// Handler for GET /api/coupons/{coupon_id}
pub async fn get_coupon_handler(
    State(state): State<AppState>,
    Path(coupon_id): Path<Uuid>,
) -> Result<Json<Coupon>, ApiError> {
    let coupon = state.coupon_service.get_coupon(coupon_id).await?;
    Ok(Json(coupon))
}

/// Handler for GET /api/coupons/code/{code}
pub async fn get_coupon_by_code_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Coupon>, ApiError> {
    let coupon = state.coupon_service.get_coupon_by_code(&code).await?;
    Ok(Json(coupon))
}

/// Handler for PUT /api/coupons/{coupon_id}
pub async fn update_coupon_handler(
    State(state): State<AppState>,
    Path(coupon_id): Path<Uuid>,
    Json(request): Json<UpdateCouponRequest>,
) -> Result<Json<Coupon>, ApiError> {
    let coupon = state.coupon_service.update_coupon(coupon_id, request).await?;
    Ok(Json(coupon))
}

/// Handler for DELETE /api/coupons/{coupon_id}
pub async fn delete_coupon_handler(
    State(state): State<AppState>,
    Path(coupon_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.coupon_service.delete_coupon(coupon_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for GET /api/coupons/{coupon_id}/usages
pub async fn coupon_usages_handler(
    State(state): State<AppState>,
    Path(coupon_id): Path<Uuid>,
) -> Result<Json<Vec<CouponUsage>>, ApiError> {
    let usages = state.coupon_service.usages_for_coupon(coupon_id).await?;
    Ok(Json(usages))
}

/// Handler for GET /api/coupons/usages/user/{user_id}
pub async fn user_coupon_usages_handler(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<CouponUsage>>, ApiError> {
    let usages = state.coupon_service.usages_for_user(user_id).await?;
    Ok(Json(usages))
}
