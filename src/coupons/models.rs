use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::catalog::models::validate_positive_amount;

/// How a coupon's `discount_value` is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    Percentage,
    FixedAmount,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: Uuid,
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub minimum_order_amount: Option<Decimal>,
    pub maximum_discount_amount: Option<Decimal>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub max_uses: Option<i32>,
    pub max_uses_per_user: Option<i32>,
    pub current_uses: i32,
    pub is_active: bool,
    pub category_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Coupon {
    pub fn is_scoped(&self) -> bool {
        self.category_id.is_some() || self.product_id.is_some()
    }
}

/// One successful redemption of a coupon by a user on an order
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CouponUsage {
    pub id: Uuid,
    pub coupon_id: Uuid,
    pub coupon_code: String,
    pub user_id: Uuid,
    pub order_id: Uuid,
    pub discount_amount: Decimal,
    pub used_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCouponRequest {
    #[validate(length(min = 3, max = 50, message = "Coupon code must be 3-50 characters"))]
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    #[validate(custom = "validate_positive_amount")]
    pub discount_value: Decimal,
    pub minimum_order_amount: Option<Decimal>,
    pub maximum_discount_amount: Option<Decimal>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[validate(range(min = 1, message = "Max uses must be at least 1"))]
    pub max_uses: Option<i32>,
    #[validate(range(min = 1, message = "Max uses per user must be at least 1"))]
    pub max_uses_per_user: Option<i32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub category_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
}

fn default_true() -> bool {
    true
}

/// Partial update; omitted fields keep their current value
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCouponRequest {
    pub description: Option<String>,
    pub discount_type: Option<DiscountType>,
    #[validate(custom = "validate_positive_amount")]
    pub discount_value: Option<Decimal>,
    pub minimum_order_amount: Option<Decimal>,
    pub maximum_discount_amount: Option<Decimal>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[validate(range(min = 1, message = "Max uses must be at least 1"))]
    pub max_uses: Option<i32>,
    #[validate(range(min = 1, message = "Max uses per user must be at least 1"))]
    pub max_uses_per_user: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCouponRequest {
    #[validate(length(min = 1, message = "Coupon code is required"))]
    pub code: String,
    #[validate(custom = "validate_non_negative_amount")]
    pub order_amount: Decimal,
    pub user_id: Uuid,
}

fn validate_non_negative_amount(amount: &Decimal) -> Result<(), validator::ValidationError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        let mut error = validator::ValidationError::new("non_negative_amount");
        error.message = Some("Order amount cannot be negative".into());
        return Err(error);
    }
    Ok(())
}

/// Verdict returned by the read-only coupon preview
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CouponValidationResponse {
    pub valid: bool,
    pub message: String,
    pub discount_amount: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CouponListQuery {
    /// Only coupons with `is_active = true`
    pub active: Option<bool>,
    /// Only coupons currently redeemable (active, in window, under the global cap)
    pub valid: Option<bool>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}
