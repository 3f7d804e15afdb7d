// HTTP handlers for order endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::ApiError;
use crate::orders::{
    CreateOrderRequest, OrderListQuery, OrderResponse, UpdatePaymentRequest, UpdateStatusRequest,
};
use crate::query::PageParams;
use crate::AppState;

/// Handler for POST /api/orders
/// Places an order: reserves stock, applies the coupon and persists it
#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Order placed", body = OrderResponse),
        (status = 400, description = "Invalid request, insufficient stock or invalid coupon"),
        (status = 404, description = "User, product or address not found")
    ),
    tag = "orders"
)]
pub async fn create_order_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.order_service.create_order(request).await?;
    Ok(Json(order))
}

/// Handler for GET /api/orders/{order_id}
#[utoipa::path(
    get,
    path = "/api/orders/{order_id}",
    params(("order_id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order not found")
    ),
    tag = "orders"
)]
pub async fn get_order_handler(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.order_service.get_order(order_id).await?;
    Ok(Json(order))
}

/// Handler for GET /api/orders/user/{user_id}
pub async fn list_user_orders_handler(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<PageParams>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.order_service.list_user_orders(user_id, params).await?;
    Ok(Json(orders))
}

/// Handler for GET /api/orders
pub async fn list_orders_handler(
    State(state): State<AppState>,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.order_service.list_orders(query).await?;
    Ok(Json(orders))
}

/// Handler for PUT /api/orders/{order_id}/status
#[utoipa::path(
    put,
    path = "/api/orders/{order_id}/status",
    params(("order_id" = Uuid, Path, description = "Order id")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = OrderResponse),
        (status = 400, description = "Transition not allowed"),
        (status = 404, description = "Order not found")
    ),
    tag = "orders"
)]
pub async fn update_order_status_handler(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .order_service
        .update_order_status(order_id, request.status)
        .await?;
    Ok(Json(order))
}

/// Handler for PATCH /api/orders/{order_id}/payment
pub async fn update_payment_handler(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(request): Json<UpdatePaymentRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.order_service.update_payment(order_id, request).await?;
    Ok(Json(order))
}

/// Handler for DELETE /api/orders/{order_id}
#[utoipa::path(
    delete,
    path = "/api/orders/{order_id}",
    params(("order_id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 204, description = "Order cancelled and stock restored"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order already shipped, delivered or cancelled")
    ),
    tag = "orders"
)]
pub async fn cancel_order_handler(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.order_service.cancel_order(order_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
