// Fixtures for database-backed tests
//
// Tests that need Postgres call `test_pool()` and return early when
// TEST_DATABASE_URL is not set.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use crate::catalog::Product;
use crate::coupons::{Coupon, DiscountType};
use crate::orders::OrderStatus;

pub async fn test_pool() -> Option<PgPool> {
    let url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("TEST_DATABASE_URL not set, skipping database test");
            return None;
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .expect("Failed to connect to test database");
    crate::db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    Some(pool)
}

fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4().simple())
}

pub async fn create_user(pool: &PgPool, loyalty_points: i64) -> Uuid {
    sqlx::query_scalar(
        "INSERT INTO users (email, full_name, loyalty_points) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(format!("{}@example.com", unique("buyer")))
    .bind("Test Buyer")
    .bind(loyalty_points)
    .fetch_one(pool)
    .await
    .expect("Failed to create user")
}

pub async fn create_address(pool: &PgPool, user_id: Uuid) -> Uuid {
    sqlx::query_scalar(
        r#"
        INSERT INTO customer_addresses (user_id, full_name, address_line1, city, state, zip_code, country)
        VALUES ($1, 'Test Buyer', '1 Main St', 'Springfield', 'IL', '62701', 'US')
        RETURNING id
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .expect("Failed to create address")
}

pub async fn create_product(pool: &PgPool, price: Decimal, stock: i32) -> Product {
    sqlx::query_as::<_, Product>(
        r#"
        INSERT INTO products (name, price, sku, stock_quantity)
        VALUES ($1, $2, $3, $4)
        RETURNING id, name, description, price, sku, stock_quantity, low_stock_threshold,
                  category_id, active, created_at
        "#,
    )
    .bind(unique("Product"))
    .bind(price)
    .bind(unique("SKU"))
    .bind(stock)
    .fetch_one(pool)
    .await
    .expect("Failed to create product")
}

/// Active coupon valid from an hour ago until tomorrow
pub async fn create_coupon(
    pool: &PgPool,
    discount_type: DiscountType,
    discount_value: Decimal,
    max_uses: Option<i32>,
) -> Coupon {
    let now = Utc::now();
    sqlx::query_as::<_, Coupon>(
        r#"
        INSERT INTO coupons (code, discount_type, discount_value, start_date, end_date, max_uses)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, code, description, discount_type, discount_value, minimum_order_amount,
                  maximum_discount_amount, start_date, end_date, max_uses, max_uses_per_user,
                  current_uses, is_active, category_id, product_id, created_at, updated_at
        "#,
    )
    .bind(unique("CODE").to_uppercase())
    .bind(discount_type)
    .bind(discount_value)
    .bind(now - Duration::hours(1))
    .bind(now + Duration::days(1))
    .bind(max_uses)
    .fetch_one(pool)
    .await
    .expect("Failed to create coupon")
}

/// Order header with no items, for settlement tests
pub async fn create_order(
    pool: &PgPool,
    user_id: Option<Uuid>,
    final_amount: Decimal,
    status: OrderStatus,
) -> Uuid {
    let address_owner = match user_id {
        Some(id) => id,
        None => create_user(pool, 0).await,
    };
    let address_id = create_address(pool, address_owner).await;

    sqlx::query_scalar(
        r#"
        INSERT INTO orders (user_id, status, total_amount, discount_amount, final_amount, payment_method, shipping_address_id)
        VALUES ($1, $2, $3, 0, $3, 'CARD', $4)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(status)
    .bind(final_amount)
    .bind(address_id)
    .fetch_one(pool)
    .await
    .expect("Failed to create order")
}
