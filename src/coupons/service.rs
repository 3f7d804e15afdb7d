use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgConnection;
use uuid::Uuid;
use validator::Validate;

use crate::catalog::CatalogRepository;
use crate::coupons::{
    evaluator, Coupon, CouponEvaluator, CouponListQuery, CouponUsage, CouponValidationResponse,
    CouponsRepository, CreateCouponRequest, DiscountType, ScopedLine, UpdateCouponRequest,
    ValidateCouponRequest,
};
use crate::db::is_unique_violation;
use crate::error::ApiError;
use crate::query::Pagination;

/// A coupon accepted during checkout, waiting to be recorded
#[derive(Debug, Clone)]
pub struct AppliedCoupon {
    pub coupon_id: Uuid,
    pub code: String,
    pub discount_amount: Decimal,
}

/// Coupon administration, read-only preview and checkout redemption
#[derive(Clone)]
pub struct CouponService {
    repo: CouponsRepository,
    catalog_repo: CatalogRepository,
}

impl CouponService {
    pub fn new(repo: CouponsRepository, catalog_repo: CatalogRepository) -> Self {
        Self { repo, catalog_repo }
    }

    pub async fn create_coupon(&self, mut request: CreateCouponRequest) -> Result<Coupon, ApiError> {
        request.validate()?;
        request.code = request.code.trim().to_string();

        check_terms(
            request.discount_type,
            request.discount_value,
            request.minimum_order_amount,
            request.maximum_discount_amount,
            request.start_date,
            request.end_date,
        )?;

        if let Some(product_id) = request.product_id {
            if self.catalog_repo.get_product(product_id).await?.is_none() {
                return Err(ApiError::not_found("Product", product_id));
            }
        }
        if let Some(category_id) = request.category_id {
            if !self.catalog_repo.category_exists(category_id).await? {
                return Err(ApiError::not_found("Category", category_id));
            }
        }

        let coupon = self.repo.create(&request).await.map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::conflict(format!("Coupon with code '{}' already exists", request.code))
            } else {
                e.into()
            }
        })?;

        tracing::info!("Created coupon {} ({})", coupon.code, coupon.id);
        Ok(coupon)
    }

    pub async fn get_coupon(&self, coupon_id: Uuid) -> Result<Coupon, ApiError> {
        self.repo
            .find_by_id(coupon_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Coupon", coupon_id))
    }

    pub async fn get_coupon_by_code(&self, code: &str) -> Result<Coupon, ApiError> {
        CouponsRepository::find_by_code(self.repo.pool(), code.trim())
            .await?
            .ok_or_else(|| ApiError::not_found("Coupon", code))
    }

    pub async fn list_coupons(&self, query: CouponListQuery) -> Result<Vec<Coupon>, ApiError> {
        let pagination = Pagination::from_params(query.page, query.limit)?;
        let valid_at = query.valid.unwrap_or(false).then(Utc::now);
        self.repo
            .list(query.active.unwrap_or(false), valid_at, pagination)
            .await
    }

    pub async fn update_coupon(
        &self,
        coupon_id: Uuid,
        request: UpdateCouponRequest,
    ) -> Result<Coupon, ApiError> {
        request.validate()?;
        let mut coupon = self.get_coupon(coupon_id).await?;

        if let Some(description) = request.description {
            coupon.description = Some(description);
        }
        if let Some(discount_type) = request.discount_type {
            coupon.discount_type = discount_type;
        }
        if let Some(value) = request.discount_value {
            coupon.discount_value = value;
        }
        if request.minimum_order_amount.is_some() {
            coupon.minimum_order_amount = request.minimum_order_amount;
        }
        if request.maximum_discount_amount.is_some() {
            coupon.maximum_discount_amount = request.maximum_discount_amount;
        }
        if let Some(start) = request.start_date {
            coupon.start_date = start;
        }
        if let Some(end) = request.end_date {
            coupon.end_date = end;
        }
        if let Some(max_uses) = request.max_uses {
            if max_uses < coupon.current_uses {
                return Err(ApiError::ValidationError(format!(
                    "Max uses cannot be lower than current uses ({})",
                    coupon.current_uses
                )));
            }
            coupon.max_uses = Some(max_uses);
        }
        if request.max_uses_per_user.is_some() {
            coupon.max_uses_per_user = request.max_uses_per_user;
        }
        if let Some(active) = request.is_active {
            coupon.is_active = active;
        }

        check_terms(
            coupon.discount_type,
            coupon.discount_value,
            coupon.minimum_order_amount,
            coupon.maximum_discount_amount,
            coupon.start_date,
            coupon.end_date,
        )?;

        let updated = self.repo.update(&coupon).await?;
        tracing::info!("Updated coupon {}", updated.code);
        Ok(updated)
    }

    /// Delete a coupon; redeemed coupons are deactivated to keep their history
    pub async fn delete_coupon(&self, coupon_id: Uuid) -> Result<(), ApiError> {
        if self.repo.has_usages(coupon_id).await? {
            self.repo.deactivate(coupon_id).await?;
            tracing::info!("Coupon {} has redemptions, deactivated instead of deleted", coupon_id);
            return Ok(());
        }

        if !self.repo.delete(coupon_id).await? {
            return Err(ApiError::not_found("Coupon", coupon_id));
        }
        tracing::info!("Deleted coupon {}", coupon_id);
        Ok(())
    }

    /// Read-only preview of a coupon against an order amount
    pub async fn validate_coupon(
        &self,
        request: ValidateCouponRequest,
    ) -> Result<CouponValidationResponse, ApiError> {
        request.validate()?;
        let code = request.code.trim();

        let coupon = CouponsRepository::find_by_code(self.repo.pool(), code).await?;
        let prior_uses = match &coupon {
            Some(c) if c.max_uses_per_user.is_some() => {
                CouponsRepository::count_user_usages(self.repo.pool(), c.id, request.user_id).await?
            }
            _ => 0,
        };

        let evaluation =
            CouponEvaluator::evaluate(coupon.as_ref(), request.order_amount, prior_uses, Utc::now());
        tracing::debug!("Coupon {} preview: {}", code, evaluation.message);

        Ok(CouponValidationResponse {
            valid: evaluation.valid,
            message: evaluation.message,
            discount_amount: evaluation.discount_amount,
        })
    }

    pub async fn usages_for_coupon(&self, coupon_id: Uuid) -> Result<Vec<CouponUsage>, ApiError> {
        self.get_coupon(coupon_id).await?;
        self.repo.usages_by_coupon(coupon_id).await
    }

    pub async fn usages_for_user(&self, user_id: Uuid) -> Result<Vec<CouponUsage>, ApiError> {
        self.repo.usages_by_user(user_id).await
    }

    /// Evaluate a coupon inside the checkout transaction
    ///
    /// The coupon row stays locked until the transaction ends. Any rejection
    /// surfaces as a validation error carrying the evaluator's message.
    pub async fn evaluate_for_checkout(
        conn: &mut PgConnection,
        code: &str,
        order_amount: Decimal,
        user_id: Uuid,
        lines: &[ScopedLine],
        now: DateTime<Utc>,
    ) -> Result<AppliedCoupon, ApiError> {
        let coupon = CouponsRepository::lock_by_code(&mut *conn, code).await?;
        let prior_uses = match &coupon {
            Some(c) => CouponsRepository::count_user_usages(&mut *conn, c.id, user_id).await?,
            None => 0,
        };

        let evaluation = CouponEvaluator::evaluate(coupon.as_ref(), order_amount, prior_uses, now);
        let coupon = match coupon {
            Some(c) if evaluation.valid => c,
            _ => return Err(ApiError::ValidationError(evaluation.message)),
        };

        if !CouponEvaluator::applies_to(&coupon, lines) {
            return Err(ApiError::ValidationError(evaluator::MSG_NOT_APPLICABLE.to_string()));
        }

        Ok(AppliedCoupon {
            coupon_id: coupon.id,
            code: coupon.code,
            discount_amount: evaluation.discount_amount,
        })
    }

    /// Count the redemption and record who used it on which order
    pub async fn record_redemption(
        conn: &mut PgConnection,
        applied: &AppliedCoupon,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<(), ApiError> {
        if !CouponsRepository::increment_usage(&mut *conn, applied.coupon_id).await? {
            return Err(ApiError::ValidationError(evaluator::MSG_MAX_USES.to_string()));
        }
        CouponsRepository::insert_usage(conn, applied.coupon_id, user_id, order_id, applied.discount_amount).await?;

        tracing::info!("Coupon {} redeemed on order {}", applied.code, order_id);
        Ok(())
    }
}

fn check_terms(
    discount_type: DiscountType,
    value: Decimal,
    minimum_order_amount: Option<Decimal>,
    maximum_discount_amount: Option<Decimal>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<(), ApiError> {
    if value <= Decimal::ZERO {
        return Err(ApiError::ValidationError("Discount value must be positive".to_string()));
    }
    if discount_type == DiscountType::Percentage && value > Decimal::ONE_HUNDRED {
        return Err(ApiError::ValidationError(
            "Percentage discount cannot exceed 100".to_string(),
        ));
    }
    if minimum_order_amount.is_some_and(|m| m < Decimal::ZERO) {
        return Err(ApiError::ValidationError(
            "Minimum order amount cannot be negative".to_string(),
        ));
    }
    if maximum_discount_amount.is_some_and(|m| m <= Decimal::ZERO) {
        return Err(ApiError::ValidationError(
            "Maximum discount amount must be positive".to_string(),
        ));
    }
    if start >= end {
        return Err(ApiError::ValidationError(
            "Coupon start date must be before end date".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    #[test]
    fn test_terms_reject_percentage_over_100() {
        let now = Utc::now();
        let err = check_terms(DiscountType::Percentage, dec!(120), None, None, now, now + Duration::days(1))
            .unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(_)));
        assert!(check_terms(DiscountType::FixedAmount, dec!(120), None, None, now, now + Duration::days(1)).is_ok());
    }

    #[test]
    fn test_terms_reject_inverted_window() {
        let now = Utc::now();
        assert!(check_terms(DiscountType::FixedAmount, dec!(5), None, None, now, now).is_err());
        assert!(check_terms(DiscountType::FixedAmount, dec!(5), Some(dec!(-1)), None, now, now + Duration::days(1)).is_err());
        assert!(check_terms(DiscountType::FixedAmount, dec!(5), None, Some(dec!(0)), now, now + Duration::days(1)).is_err());
    }

    fn service(pool: &sqlx::PgPool) -> CouponService {
        CouponService::new(CouponsRepository::new(pool.clone()), CatalogRepository::new(pool.clone()))
    }

    #[tokio::test]
    async fn test_exhausted_coupon_preview_reports_max_uses() {
        let Some(pool) = test_support::test_pool().await else { return };
        let coupons = service(&pool);
        let user = test_support::create_user(&pool, 0).await;
        let coupon = test_support::create_coupon(&pool, DiscountType::FixedAmount, dec!(5), Some(1)).await;
        sqlx::query("UPDATE coupons SET current_uses = 1 WHERE id = $1")
            .bind(coupon.id)
            .execute(&pool)
            .await
            .unwrap();

        let verdict = coupons
            .validate_coupon(ValidateCouponRequest {
                code: coupon.code.clone(),
                order_amount: dec!(50.00),
                user_id: user,
            })
            .await
            .unwrap();
        assert!(!verdict.valid);
        assert!(verdict.message.contains("maximum uses"));
    }

    #[tokio::test]
    async fn test_preview_has_no_side_effects() {
        let Some(pool) = test_support::test_pool().await else { return };
        let coupons = service(&pool);
        let user = test_support::create_user(&pool, 0).await;
        let coupon = test_support::create_coupon(&pool, DiscountType::Percentage, dec!(10), Some(5)).await;

        for _ in 0..3 {
            let verdict = coupons
                .validate_coupon(ValidateCouponRequest {
                    code: coupon.code.clone(),
                    order_amount: dec!(80.00),
                    user_id: user,
                })
                .await
                .unwrap();
            assert!(verdict.valid);
            assert_eq!(verdict.discount_amount, dec!(8.00));
        }

        let reloaded = coupons.get_coupon(coupon.id).await.unwrap();
        assert_eq!(reloaded.current_uses, 0);
    }

    #[tokio::test]
    async fn test_unknown_code_is_invalid_not_error() {
        let Some(pool) = test_support::test_pool().await else { return };
        let verdict = service(&pool)
            .validate_coupon(ValidateCouponRequest {
                code: format!("NOPE-{}", Uuid::new_v4()),
                order_amount: dec!(10.00),
                user_id: Uuid::new_v4(),
            })
            .await
            .unwrap();
        assert!(!verdict.valid);
        assert_eq!(verdict.message, evaluator::MSG_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_duplicate_code_is_conflict() {
        let Some(pool) = test_support::test_pool().await else { return };
        let coupon = test_support::create_coupon(&pool, DiscountType::FixedAmount, dec!(5), None).await;
        let now = Utc::now();

        let err = service(&pool)
            .create_coupon(CreateCouponRequest {
                code: coupon.code.clone(),
                description: None,
                discount_type: DiscountType::FixedAmount,
                discount_value: dec!(3),
                minimum_order_amount: None,
                maximum_discount_amount: None,
                start_date: now,
                end_date: now + Duration::days(1),
                max_uses: None,
                max_uses_per_user: None,
                is_active: true,
                category_id: None,
                product_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_update_cannot_drop_cap_below_current_uses() {
        let Some(pool) = test_support::test_pool().await else { return };
        let coupon = test_support::create_coupon(&pool, DiscountType::FixedAmount, dec!(5), Some(10)).await;
        sqlx::query("UPDATE coupons SET current_uses = 4 WHERE id = $1")
            .bind(coupon.id)
            .execute(&pool)
            .await
            .unwrap();

        let err = service(&pool)
            .update_coupon(
                coupon.id,
                UpdateCouponRequest {
                    max_uses: Some(3),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(_)));
    }
}
