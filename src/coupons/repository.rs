use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgExecutor, PgPool};
use uuid::Uuid;

use crate::coupons::{Coupon, CouponUsage, CreateCouponRequest};
use crate::error::ApiError;
use crate::query::Pagination;

const COUPON_COLUMNS: &str = r#"id, code, description, discount_type, discount_value, minimum_order_amount,
    maximum_discount_amount, start_date, end_date, max_uses, max_uses_per_user, current_uses,
    is_active, category_id, product_id, created_at, updated_at"#;

const USAGE_SELECT: &str = r#"
    SELECT u.id, u.coupon_id, c.code AS coupon_code, u.user_id, u.order_id, u.discount_amount, u.used_at
    FROM coupon_usages u
    JOIN coupons c ON c.id = u.coupon_id
"#;

/// Repository for coupons and their redemption records
#[derive(Clone)]
pub struct CouponsRepository {
    pool: PgPool,
}

impl CouponsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn create(&self, request: &CreateCouponRequest) -> Result<Coupon, sqlx::Error> {
        sqlx::query_as::<_, Coupon>(&format!(
            r#"
            INSERT INTO coupons (
                code, description, discount_type, discount_value, minimum_order_amount,
                maximum_discount_amount, start_date, end_date, max_uses, max_uses_per_user,
                is_active, category_id, product_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {}
            "#,
            COUPON_COLUMNS
        ))
        .bind(&request.code)
        .bind(&request.description)
        .bind(request.discount_type)
        .bind(request.discount_value)
        .bind(request.minimum_order_amount)
        .bind(request.maximum_discount_amount)
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(request.max_uses)
        .bind(request.max_uses_per_user)
        .bind(request.is_active)
        .bind(request.category_id)
        .bind(request.product_id)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn find_by_id(&self, coupon_id: Uuid) -> Result<Option<Coupon>, ApiError> {
        let coupon = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {} FROM coupons WHERE id = $1",
            COUPON_COLUMNS
        ))
        .bind(coupon_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(coupon)
    }

    pub async fn find_by_code<'e, E>(executor: E, code: &str) -> Result<Option<Coupon>, ApiError>
    where
        E: PgExecutor<'e>,
    {
        let coupon = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {} FROM coupons WHERE code = $1",
            COUPON_COLUMNS
        ))
        .bind(code)
        .fetch_optional(executor)
        .await?;

        Ok(coupon)
    }

    /// Lock the coupon row for the rest of the checkout transaction
    ///
    /// Serializes concurrent redemptions of the same code, so the per-user
    /// usage count read afterwards cannot go stale before the usage insert.
    pub async fn lock_by_code(conn: &mut PgConnection, code: &str) -> Result<Option<Coupon>, ApiError> {
        let coupon = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {} FROM coupons WHERE code = $1 FOR UPDATE",
            COUPON_COLUMNS
        ))
        .bind(code)
        .fetch_optional(conn)
        .await?;

        Ok(coupon)
    }

    pub async fn list(
        &self,
        active_only: bool,
        valid_at: Option<DateTime<Utc>>,
        pagination: Pagination,
    ) -> Result<Vec<Coupon>, ApiError> {
        let coupons = sqlx::query_as::<_, Coupon>(&format!(
            r#"
            SELECT {}
            FROM coupons
            WHERE ($1 = FALSE OR is_active = TRUE)
              AND ($2::timestamptz IS NULL OR (
                    is_active = TRUE
                    AND start_date <= $2 AND end_date >= $2
                    AND (max_uses IS NULL OR current_uses < max_uses)))
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
            COUPON_COLUMNS
        ))
        .bind(active_only)
        .bind(valid_at)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(coupons)
    }

    pub async fn update(&self, coupon: &Coupon) -> Result<Coupon, ApiError> {
        let updated = sqlx::query_as::<_, Coupon>(&format!(
            r#"
            UPDATE coupons
            SET description = $1,
                discount_type = $2,
                discount_value = $3,
                minimum_order_amount = $4,
                maximum_discount_amount = $5,
                start_date = $6,
                end_date = $7,
                max_uses = $8,
                max_uses_per_user = $9,
                is_active = $10,
                updated_at = NOW()
            WHERE id = $11
            RETURNING {}
            "#,
            COUPON_COLUMNS
        ))
        .bind(&coupon.description)
        .bind(coupon.discount_type)
        .bind(coupon.discount_value)
        .bind(coupon.minimum_order_amount)
        .bind(coupon.maximum_discount_amount)
        .bind(coupon.start_date)
        .bind(coupon.end_date)
        .bind(coupon.max_uses)
        .bind(coupon.max_uses_per_user)
        .bind(coupon.is_active)
        .bind(coupon.id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Coupon", coupon.id))?;

        Ok(updated)
    }

    pub async fn delete(&self, coupon_id: Uuid) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM coupons WHERE id = $1")
            .bind(coupon_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn deactivate(&self, coupon_id: Uuid) -> Result<bool, ApiError> {
        let result = sqlx::query("UPDATE coupons SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
            .bind(coupon_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn has_usages(&self, coupon_id: Uuid) -> Result<bool, ApiError> {
        let exists: Option<bool> = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM coupon_usages WHERE coupon_id = $1)")
            .bind(coupon_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists.unwrap_or(false))
    }

    pub async fn count_user_usages<'e, E>(executor: E, coupon_id: Uuid, user_id: Uuid) -> Result<i64, ApiError>
    where
        E: PgExecutor<'e>,
    {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM coupon_usages WHERE coupon_id = $1 AND user_id = $2",
        )
        .bind(coupon_id)
        .bind(user_id)
        .fetch_one(executor)
        .await?;

        Ok(count)
    }

    /// Conditionally bump the global usage counter
    ///
    /// Returns false when the cap was already reached, leaving the row untouched.
    pub async fn increment_usage(conn: &mut PgConnection, coupon_id: Uuid) -> Result<bool, ApiError> {
        let result = sqlx::query(
            r#"
            UPDATE coupons
            SET current_uses = current_uses + 1, updated_at = NOW()
            WHERE id = $1 AND (max_uses IS NULL OR current_uses < max_uses)
            "#,
        )
        .bind(coupon_id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn insert_usage(
        conn: &mut PgConnection,
        coupon_id: Uuid,
        user_id: Uuid,
        order_id: Uuid,
        discount_amount: Decimal,
    ) -> Result<(), ApiError> {
        sqlx::query(
            r#"
            INSERT INTO coupon_usages (coupon_id, user_id, order_id, discount_amount)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(coupon_id)
        .bind(user_id)
        .bind(order_id)
        .bind(discount_amount)
        .execute(conn)
        .await?;

        Ok(())
    }

    pub async fn usages_by_coupon(&self, coupon_id: Uuid) -> Result<Vec<CouponUsage>, ApiError> {
        let usages = sqlx::query_as::<_, CouponUsage>(&format!(
            "{} WHERE u.coupon_id = $1 ORDER BY u.used_at DESC",
            USAGE_SELECT
        ))
        .bind(coupon_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(usages)
    }

    pub async fn usages_by_user(&self, user_id: Uuid) -> Result<Vec<CouponUsage>, ApiError> {
        let usages = sqlx::query_as::<_, CouponUsage>(&format!(
            "{} WHERE u.user_id = $1 ORDER BY u.used_at DESC",
            USAGE_SELECT
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(usages)
    }
}
