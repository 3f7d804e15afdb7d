use rust_decimal::Decimal;
use sqlx::{PgConnection, PgExecutor, PgPool};
use uuid::Uuid;

use crate::error::ApiError;
use crate::orders::{Order, OrderItem, OrderStatus, PricedLine};
use crate::query::Pagination;

const ORDER_COLUMNS: &str = "id, user_id, status, total_amount, discount_amount, final_amount, \
     coupon_id, coupon_code, payment_method, payment_id, shipping_address_id, created_at, updated_at";
const ITEM_COLUMNS: &str = "id, order_id, product_id, product_name, quantity, price_at_purchase";

/// Values persisted for a new order header
#[derive(Debug, Clone)]
pub struct NewOrder<'a> {
    pub user_id: Uuid,
    pub total_amount: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
    pub coupon_id: Option<Uuid>,
    pub coupon_code: Option<&'a str>,
    pub payment_method: &'a str,
    pub payment_id: Option<&'a str>,
    pub shipping_address_id: Uuid,
}

/// Repository for orders and their line snapshots
#[derive(Clone)]
pub struct OrdersRepository {
    pool: PgPool,
}

impl OrdersRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert the order header in PENDING status
    pub async fn insert_order(conn: &mut PgConnection, order: &NewOrder<'_>) -> Result<Order, ApiError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            INSERT INTO orders
                (user_id, status, total_amount, discount_amount, final_amount, coupon_id,
                 coupon_code, payment_method, payment_id, shipping_address_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(order.user_id)
        .bind(OrderStatus::Pending)
        .bind(order.total_amount)
        .bind(order.discount_amount)
        .bind(order.final_amount)
        .bind(order.coupon_id)
        .bind(order.coupon_code)
        .bind(order.payment_method)
        .bind(order.payment_id)
        .bind(order.shipping_address_id)
        .fetch_one(conn)
        .await?;

        Ok(order)
    }

    pub async fn insert_item(
        conn: &mut PgConnection,
        order_id: Uuid,
        line: &PricedLine,
        position: i32,
    ) -> Result<OrderItem, ApiError> {
        let item = sqlx::query_as::<_, OrderItem>(&format!(
            r#"
            INSERT INTO order_items (order_id, product_id, product_name, quantity, price_at_purchase, position)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            ITEM_COLUMNS
        ))
        .bind(order_id)
        .bind(line.product_id)
        .bind(&line.product_name)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(position)
        .fetch_one(conn)
        .await?;

        Ok(item)
    }

    pub async fn find_by_id<'e, E>(executor: E, order_id: Uuid) -> Result<Option<Order>, ApiError>
    where
        E: PgExecutor<'e>,
    {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM orders WHERE id = $1",
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(executor)
        .await?;

        Ok(order)
    }

    /// Lock an order row for a status change or settlement
    pub async fn lock_by_id(conn: &mut PgConnection, order_id: Uuid) -> Result<Option<Order>, ApiError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM orders WHERE id = $1 FOR UPDATE",
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(conn)
        .await?;

        Ok(order)
    }

    /// Line items in the order they were requested
    pub async fn items_for_order<'e, E>(executor: E, order_id: Uuid) -> Result<Vec<OrderItem>, ApiError>
    where
        E: PgExecutor<'e>,
    {
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {} FROM order_items WHERE order_id = $1 ORDER BY position",
            ITEM_COLUMNS
        ))
        .bind(order_id)
        .fetch_all(executor)
        .await?;

        Ok(items)
    }

    /// A user's orders, newest first
    pub async fn find_by_user(&self, user_id: Uuid, pagination: Pagination) -> Result<Vec<Order>, ApiError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            r#"
            SELECT {}
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC, id
            LIMIT $2 OFFSET $3
            "#,
            ORDER_COLUMNS
        ))
        .bind(user_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// All orders, optionally filtered by status, newest first
    pub async fn list(
        &self,
        status: Option<OrderStatus>,
        pagination: Pagination,
    ) -> Result<Vec<Order>, ApiError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            r#"
            SELECT {}
            FROM orders
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY created_at DESC, id
            LIMIT $2 OFFSET $3
            "#,
            ORDER_COLUMNS
        ))
        .bind(status)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    pub async fn update_status(
        conn: &mut PgConnection,
        order_id: Uuid,
        status: OrderStatus,
    ) -> Result<Order, ApiError> {
        sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE orders
            SET status = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(status)
        .bind(order_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| ApiError::not_found("Order", order_id))
    }

    pub async fn update_payment_id(&self, order_id: Uuid, payment_id: &str) -> Result<Option<Order>, ApiError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE orders
            SET payment_id = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(payment_id)
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// Ids of a user's delivered orders that have no reward grant yet
    pub async fn delivered_without_reward<'e, E>(executor: E, user_id: Uuid) -> Result<Vec<Uuid>, ApiError>
    where
        E: PgExecutor<'e>,
    {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT o.id
            FROM orders o
            LEFT JOIN reward_points r ON r.order_id = o.id
            WHERE o.user_id = $1 AND o.status = $2 AND r.id IS NULL
            ORDER BY o.created_at
            "#,
        )
        .bind(user_id)
        .bind(OrderStatus::Delivered)
        .fetch_all(executor)
        .await?;

        Ok(ids)
    }
}
