use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgExecutor, PgPool};
use uuid::Uuid;

use crate::catalog::{
    Category, CreateCategoryRequest, CreateProductRequest, InventoryChangeType, InventoryLog,
    Product, ProductDiscount, StockAlert, StockLevel,
};
use crate::error::ApiError;
use crate::query::Pagination;

const PRODUCT_COLUMNS: &str = "id, name, description, price, sku, stock_quantity, low_stock_threshold, category_id, active, created_at";
const DISCOUNT_COLUMNS: &str = "id, product_id, discount_price, start_date, end_date, active, created_at";
const LOG_COLUMNS: &str = "id, product_id, old_quantity, new_quantity, change_type, changed_by, created_at";
const ALERT_COLUMNS: &str = "id, product_id, current_stock, low_stock_threshold, created_at";

/// Repository for products, categories and product discounts
#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_category(&self, request: &CreateCategoryRequest) -> Result<Category, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name, description)
            VALUES ($1, $2)
            RETURNING id, name, description, created_at
            "#,
        )
        .bind(&request.name)
        .bind(&request.description)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn category_exists(&self, category_id: Uuid) -> Result<bool, ApiError> {
        let exists: Option<bool> = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)")
            .bind(category_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists.unwrap_or(false))
    }

    pub async fn create_product(
        conn: &mut PgConnection,
        request: &CreateProductRequest,
    ) -> Result<Product, sqlx::Error> {
        sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products (name, description, price, sku, stock_quantity, low_stock_threshold, category_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(&request.name)
        .bind(&request.description)
        .bind(request.price)
        .bind(&request.sku)
        .bind(request.stock_quantity)
        .bind(request.low_stock_threshold)
        .bind(request.category_id)
        .fetch_one(conn)
        .await
    }

    pub async fn find_product<'e, E>(executor: E, product_id: Uuid) -> Result<Option<Product>, ApiError>
    where
        E: PgExecutor<'e>,
    {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products WHERE id = $1",
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .fetch_optional(executor)
        .await?;

        Ok(product)
    }

    pub async fn get_product(&self, product_id: Uuid) -> Result<Option<Product>, ApiError> {
        Self::find_product(&self.pool, product_id).await
    }

    /// Archive instead of delete; archived products cannot be ordered
    pub async fn archive_product(&self, product_id: Uuid) -> Result<Option<Product>, ApiError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "UPDATE products SET active = FALSE WHERE id = $1 RETURNING {}",
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Atomically take `quantity` units out of stock
    ///
    /// The decrement only applies while enough stock remains, so concurrent
    /// checkouts can never drive the quantity below zero. Returns `None` when
    /// the product cannot cover the request. A successful reservation is
    /// logged as a sale.
    pub async fn reserve_stock(
        conn: &mut PgConnection,
        product_id: Uuid,
        quantity: i32,
        changed_by: Option<Uuid>,
    ) -> Result<Option<StockLevel>, ApiError> {
        let level = sqlx::query_as::<_, StockLevel>(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity - $1
            WHERE id = $2 AND active = TRUE AND stock_quantity >= $1
            RETURNING stock_quantity, low_stock_threshold
            "#,
        )
        .bind(quantity)
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(level) = level {
            let old_quantity = level.stock_quantity + quantity;
            Self::record_stock_change(conn, product_id, old_quantity, level, InventoryChangeType::Sale, changed_by)
                .await?;
        }
        Ok(level)
    }

    /// Put `quantity` units back on the shelf
    pub async fn restock(
        conn: &mut PgConnection,
        product_id: Uuid,
        quantity: i32,
        changed_by: Option<Uuid>,
    ) -> Result<StockLevel, ApiError> {
        let level = sqlx::query_as::<_, StockLevel>(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity + $1
            WHERE id = $2
            RETURNING stock_quantity, low_stock_threshold
            "#,
        )
        .bind(quantity)
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", product_id))?;

        let old_quantity = level.stock_quantity - quantity;
        Self::record_stock_change(conn, product_id, old_quantity, level, InventoryChangeType::Restock, changed_by)
            .await?;
        Ok(level)
    }

    /// Apply a signed manual correction; `None` if it would go below zero
    pub async fn adjust_stock(
        conn: &mut PgConnection,
        product_id: Uuid,
        change: i32,
        changed_by: Option<Uuid>,
    ) -> Result<Option<StockLevel>, ApiError> {
        let level = sqlx::query_as::<_, StockLevel>(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity + $1
            WHERE id = $2 AND stock_quantity + $1 >= 0
            RETURNING stock_quantity, low_stock_threshold
            "#,
        )
        .bind(change)
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(level) = level {
            let change_type = if change > 0 {
                InventoryChangeType::Restock
            } else {
                InventoryChangeType::Adjustment
            };
            let old_quantity = level.stock_quantity - change;
            Self::record_stock_change(conn, product_id, old_quantity, level, change_type, changed_by).await?;
        }
        Ok(level)
    }

    /// Append to the inventory history and raise an alert when the new level is low
    pub async fn record_stock_change(
        conn: &mut PgConnection,
        product_id: Uuid,
        old_quantity: i32,
        level: StockLevel,
        change_type: InventoryChangeType,
        changed_by: Option<Uuid>,
    ) -> Result<(), ApiError> {
        sqlx::query(
            r#"
            INSERT INTO inventory_logs (product_id, old_quantity, new_quantity, change_type, changed_by)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(product_id)
        .bind(old_quantity)
        .bind(level.stock_quantity)
        .bind(change_type)
        .bind(changed_by)
        .execute(&mut *conn)
        .await?;

        if level.is_low() {
            sqlx::query(
                "INSERT INTO stock_alerts (product_id, current_stock, low_stock_threshold) VALUES ($1, $2, $3)",
            )
            .bind(product_id)
            .bind(level.stock_quantity)
            .bind(level.low_stock_threshold)
            .execute(conn)
            .await?;
        }
        Ok(())
    }

    /// Newest first
    pub async fn inventory_logs(
        &self,
        product_id: Uuid,
        pagination: Pagination,
    ) -> Result<Vec<InventoryLog>, ApiError> {
        let logs = sqlx::query_as::<_, InventoryLog>(&format!(
            r#"
            SELECT {}
            FROM inventory_logs
            WHERE product_id = $1
            ORDER BY created_at DESC, id
            LIMIT $2 OFFSET $3
            "#,
            LOG_COLUMNS
        ))
        .bind(product_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(logs)
    }

    pub async fn stock_alerts(
        &self,
        product_id: Uuid,
        pagination: Pagination,
    ) -> Result<Vec<StockAlert>, ApiError> {
        let alerts = sqlx::query_as::<_, StockAlert>(&format!(
            r#"
            SELECT {}
            FROM stock_alerts
            WHERE product_id = $1
            ORDER BY created_at DESC, id
            LIMIT $2 OFFSET $3
            "#,
            ALERT_COLUMNS
        ))
        .bind(product_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(alerts)
    }

    /// Discount price in effect for `product_id` at `at`, if any
    pub async fn active_discount_price<'e, E>(
        executor: E,
        product_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<Decimal>, ApiError>
    where
        E: PgExecutor<'e>,
    {
        let price = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT discount_price
            FROM product_discounts
            WHERE product_id = $1 AND active = TRUE AND start_date <= $2 AND end_date >= $2
            ORDER BY start_date DESC
            LIMIT 1
            "#,
        )
        .bind(product_id)
        .bind(at)
        .fetch_optional(executor)
        .await?;

        Ok(price)
    }

    pub async fn has_overlapping_discount(
        conn: &mut PgConnection,
        product_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<bool, ApiError> {
        let overlaps: Option<bool> = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM product_discounts
                WHERE product_id = $1 AND active = TRUE AND start_date <= $3 AND end_date >= $2
            )
            "#,
        )
        .bind(product_id)
        .bind(start)
        .bind(end)
        .fetch_one(conn)
        .await?;

        Ok(overlaps.unwrap_or(false))
    }

    pub async fn insert_discount(
        conn: &mut PgConnection,
        product_id: Uuid,
        discount_price: Decimal,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<ProductDiscount, ApiError> {
        let discount = sqlx::query_as::<_, ProductDiscount>(&format!(
            r#"
            INSERT INTO product_discounts (product_id, discount_price, start_date, end_date)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            DISCOUNT_COLUMNS
        ))
        .bind(product_id)
        .bind(discount_price)
        .bind(start)
        .bind(end)
        .fetch_one(conn)
        .await?;

        Ok(discount)
    }

    /// Lock a product row so discount windows for it are checked serially
    pub async fn lock_product(conn: &mut PgConnection, product_id: Uuid) -> Result<Option<Product>, ApiError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products WHERE id = $1 FOR UPDATE",
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .fetch_optional(conn)
        .await?;

        Ok(product)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
