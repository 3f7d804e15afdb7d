use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Catalog product; `stock_quantity` only moves through checkout and cancellation
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub sku: String,
    pub stock_quantity: i32,
    pub low_stock_threshold: i32,
    pub category_id: Option<Uuid>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductDiscount {
    pub id: Uuid,
    pub product_id: Uuid,
    pub discount_price: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Result of a successful stock reservation
#[derive(Debug, Clone, Copy, FromRow)]
pub struct StockLevel {
    pub stock_quantity: i32,
    pub low_stock_threshold: i32,
}

impl StockLevel {
    pub fn is_low(&self) -> bool {
        self.stock_quantity <= self.low_stock_threshold
    }
}

/// Why a product's stock moved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "UPPERCASE")]
pub enum InventoryChangeType {
    Restock,
    Sale,
    Adjustment,
}

/// One stock movement, written in the same transaction as the change
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryLog {
    pub id: Uuid,
    pub product_id: Uuid,
    pub old_quantity: i32,
    pub new_quantity: i32,
    pub change_type: InventoryChangeType,
    pub changed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockAlert {
    pub id: Uuid,
    pub product_id: Uuid,
    pub current_stock: i32,
    pub low_stock_threshold: i32,
    pub created_at: DateTime<Utc>,
}

pub(crate) fn validate_positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount <= Decimal::ZERO {
        let mut error = ValidationError::new("positive_amount");
        error.message = Some("Amount must be greater than zero".into());
        return Err(error);
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100, message = "Category name must be 1-100 characters"))]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200, message = "Product name must be 1-200 characters"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(custom = "validate_positive_amount")]
    pub price: Decimal,
    #[validate(length(min = 1, max = 64, message = "SKU must be 1-64 characters"))]
    pub sku: String,
    #[validate(range(min = 0, message = "Stock quantity cannot be negative"))]
    pub stock_quantity: i32,
    #[validate(range(min = 0, message = "Low stock threshold cannot be negative"))]
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i32,
    pub category_id: Option<Uuid>,
}

fn default_low_stock_threshold() -> i32 {
    5
}

fn validate_nonzero_change(change: i32) -> Result<(), ValidationError> {
    if change == 0 {
        let mut error = ValidationError::new("nonzero_change");
        error.message = Some("Quantity change cannot be zero".into());
        return Err(error);
    }
    Ok(())
}

/// Manual stock correction; positive values restock, negative values write stock off
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockUpdateRequest {
    #[validate(custom = "validate_nonzero_change")]
    pub quantity_change: i32,
    pub changed_by: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductDiscountRequest {
    #[validate(custom = "validate_positive_amount")]
    pub discount_price: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}
