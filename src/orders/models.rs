use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::users::ShippingAddressRequest;

/// Order status enum representing the lifecycle of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Domain model representing an order in the database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
    pub coupon_id: Option<Uuid>,
    pub coupon_code: Option<String>,
    pub payment_method: String,
    pub payment_id: Option<String>,
    pub shipping_address_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Immutable line snapshot: the price actually charged at checkout
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub price_at_purchase: Decimal,
}

/// A priced line built in memory before the order is persisted
#[derive(Debug, Clone)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub product_name: String,
    pub category_id: Option<Uuid>,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// Request DTO for one line of a checkout
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

/// Request DTO for placing an order
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub user_id: Uuid,
    #[validate(length(min = 1, message = "Order must contain at least one item"))]
    #[validate]
    pub items: Vec<OrderItemRequest>,
    pub address_id: Option<Uuid>,
    #[validate]
    pub shipping_address: Option<ShippingAddressRequest>,
    #[validate(length(min = 1, message = "Payment method is required"))]
    pub payment_method: String,
    pub payment_id: Option<String>,
    #[serde(alias = "discountCode")]
    pub coupon_code: Option<String>,
}

/// Request DTO for updating order status
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

/// Request DTO for attaching a payment reference
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentRequest {
    #[validate(length(min = 1, max = 255, message = "Payment id must be 1-255 characters"))]
    pub payment_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Response DTO for order with items
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order_id: Uuid,
    pub user_id: Option<Uuid>,
    pub user_email: String,
    pub items: Vec<OrderItemResponse>,
    pub total_amount: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
    pub coupon_code: Option<String>,
    pub status: OrderStatus,
    pub payment_method: String,
    pub payment_id: Option<String>,
    pub shipping_address_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Response DTO for order item
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub price: Decimal,
    pub subtotal: Decimal,
}

impl From<OrderItem> for OrderItemResponse {
    fn from(item: OrderItem) -> Self {
        Self {
            subtotal: crate::orders::PriceCalculator::calculate_subtotal(item.quantity, item.price_at_purchase),
            product_id: item.product_id,
            product_name: item.product_name,
            quantity: item.quantity,
            price: item.price_at_purchase,
        }
    }
}

pub const GUEST_EMAIL: &str = "Guest User";

impl OrderResponse {
    pub fn from_parts(order: Order, items: Vec<OrderItem>, user_email: Option<String>) -> Self {
        Self {
            order_id: order.id,
            user_id: order.user_id,
            user_email: user_email.unwrap_or_else(|| GUEST_EMAIL.to_string()),
            items: items.into_iter().map(OrderItemResponse::from).collect(),
            total_amount: order.total_amount,
            discount_amount: order.discount_amount,
            final_amount: order.final_amount,
            coupon_code: order.coupon_code,
            status: order.status,
            payment_method: order.payment_method,
            payment_id: order.payment_id,
            shipping_address_id: order.shipping_address_id,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_status_wire_format() {
        assert_eq!(serde_json::to_string(&OrderStatus::Delivered).unwrap(), "\"DELIVERED\"");
        let parsed: UpdateStatusRequest = serde_json::from_value(json!({"status": "SHIPPED"})).unwrap();
        assert_eq!(parsed.status, OrderStatus::Shipped);
        assert!(serde_json::from_value::<UpdateStatusRequest>(json!({"status": "LOST"})).is_err());
    }

    #[test]
    fn test_new_orders_default_to_pending() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
        assert!(!OrderStatus::default().is_terminal());
    }

    #[test]
    fn test_discount_code_alias() {
        let request: CreateOrderRequest = serde_json::from_value(json!({
            "userId": Uuid::new_v4(),
            "items": [{"productId": Uuid::new_v4(), "quantity": 3}],
            "addressId": Uuid::new_v4(),
            "paymentMethod": "CARD",
            "discountCode": "SAVE10"
        }))
        .unwrap();
        assert_eq!(request.coupon_code.as_deref(), Some("SAVE10"));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_nested_item_validation() {
        let request: CreateOrderRequest = serde_json::from_value(json!({
            "userId": Uuid::new_v4(),
            "items": [{"productId": Uuid::new_v4(), "quantity": 0}],
            "addressId": Uuid::new_v4(),
            "paymentMethod": "CARD"
        }))
        .unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_empty_order_rejected() {
        let request: CreateOrderRequest = serde_json::from_value(json!({
            "userId": Uuid::new_v4(),
            "items": [],
            "addressId": Uuid::new_v4(),
            "paymentMethod": "CARD"
        }))
        .unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_guest_projection() {
        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            user_id: None,
            status: OrderStatus::Pending,
            total_amount: dec!(300.00),
            discount_amount: dec!(30.00),
            final_amount: dec!(270.00),
            coupon_id: None,
            coupon_code: Some("SAVE10".to_string()),
            payment_method: "CARD".to_string(),
            payment_id: None,
            shipping_address_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        };
        let item = OrderItem {
            id: Uuid::new_v4(),
            order_id: order.id,
            product_id: Uuid::new_v4(),
            product_name: "Desk Lamp".to_string(),
            quantity: 3,
            price_at_purchase: dec!(100.00),
        };

        let response = OrderResponse::from_parts(order, vec![item], None);
        assert_eq!(response.user_email, GUEST_EMAIL);
        assert_eq!(response.items[0].subtotal, dec!(300.00));
        assert_eq!(response.final_amount, dec!(270.00));
    }
}
