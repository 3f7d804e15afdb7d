// HTTP handlers for catalog administration

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::catalog::{
    Category, CreateCategoryRequest, CreateProductDiscountRequest, CreateProductRequest,
    InventoryLog, Product, ProductDiscount, StockAlert, StockUpdateRequest,
};
use crate::error::ApiError;
use crate::query::PageParams;
use crate::AppState;

/// Handler for POST /api/categories
#[utoipa::path(
    post,
    path = "/api/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 409, description = "Category name already exists")
    ),
    tag = "catalog"
)]
pub async fn create_category_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let category = state.catalog_service.create_category(request).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// Handler for POST /api/products
#[utoipa::path(
    post,
    path = "/api/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = Product),
        (status = 400, description = "Invalid product data"),
        (status = 409, description = "SKU already exists")
    ),
    tag = "catalog"
)]
pub async fn create_product_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    tracing::debug!("Creating product with SKU {}", request.sku);
    let product = state.catalog_service.create_product(request).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Handler for GET /api/products/{product_id}
#[utoipa::path(
    get,
    path = "/api/products/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product found", body = Product),
        (status = 404, description = "Product not found")
    ),
    tag = "catalog"
)]
pub async fn get_product_handler(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Product>, ApiError> {
    let product = state.catalog_service.get_product(product_id).await?;
    Ok(Json(product))
}

/// Handler for DELETE /api/products/{product_id}
/// Archives the product; it stays referenced by historical orders
#[utoipa::path(
    delete,
    path = "/api/products/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 204, description = "Product archived"),
        (status = 404, description = "Product not found")
    ),
    tag = "catalog"
)]
pub async fn archive_product_handler(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.catalog_service.archive_product(product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for POST /api/products/{product_id}/discounts
#[utoipa::path(
    post,
    path = "/api/products/{product_id}/discounts",
    params(("product_id" = Uuid, Path, description = "Product ID")),
    request_body = CreateProductDiscountRequest,
    responses(
        (status = 201, description = "Discount scheduled", body = ProductDiscount),
        (status = 400, description = "Invalid discount"),
        (status = 409, description = "Overlapping discount")
    ),
    tag = "catalog"
)]
pub async fn create_product_discount_handler(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(request): Json<CreateProductDiscountRequest>,
) -> Result<(StatusCode, Json<ProductDiscount>), ApiError> {
    let discount = state
        .catalog_service
        .create_discount(product_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(discount)))
}

/// Handler for POST /api/products/{product_id}/stock
#[utoipa::path(
    post,
    path = "/api/products/{product_id}/stock",
    params(("product_id" = Uuid, Path, description = "Product ID")),
    request_body = StockUpdateRequest,
    responses(
        (status = 200, description = "Stock updated", body = Product),
        (status = 400, description = "Zero change or stock would go below zero"),
        (status = 404, description = "Product or user not found")
    ),
    tag = "catalog"
)]
pub async fn update_stock_handler(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(request): Json<StockUpdateRequest>,
) -> Result<Json<Product>, ApiError> {
    let product = state.catalog_service.update_stock(product_id, request).await?;
    Ok(Json(product))
}

/// Handler for GET /api/products/{product_id}/inventory-logs
#[utoipa::path(
    get,
    path = "/api/products/{product_id}/inventory-logs",
    params(
        ("product_id" = Uuid, Path, description = "Product ID"),
        ("page" = Option<u32>, Query, description = "Page number, from 1"),
        ("limit" = Option<u32>, Query, description = "Page size, at most 100")
    ),
    responses(
        (status = 200, description = "Stock movements, newest first", body = [InventoryLog]),
        (status = 404, description = "Product not found")
    ),
    tag = "catalog"
)]
pub async fn inventory_logs_handler(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(params): Query<PageParams>,
) -> Result<Json<Vec<InventoryLog>>, ApiError> {
    let logs = state.catalog_service.inventory_logs(product_id, params).await?;
    Ok(Json(logs))
}

/// Handler for GET /api/products/{product_id}/stock-alerts
pub async fn stock_alerts_handler(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(params): Query<PageParams>,
) -> Result<Json<Vec<StockAlert>>, ApiError> {
    let alerts = state.catalog_service.stock_alerts(product_id, params).await?;
    Ok(Json(alerts))
}
