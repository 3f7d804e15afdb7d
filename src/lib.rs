pub mod catalog;
pub mod config;
pub mod coupons;
pub mod db;
pub mod error;
pub mod loyalty;
pub mod notifications;
pub mod orders;
pub mod query;
pub mod rewards;
pub mod users;

use std::sync::Arc;

use axum::{
    routing::{get, patch, post, put},
    Router,
};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use catalog::{CatalogRepository, CatalogService};
use coupons::{CouponService, CouponsRepository};
use loyalty::LoyaltyLedger;
use notifications::OrderNotifier;
use orders::{OrderService, OrdersRepository};
use rewards::{RewardService, RewardsRepository};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        orders::create_order_handler,
        orders::get_order_handler,
        orders::update_order_status_handler,
        orders::cancel_order_handler,
        rewards::generate_points_handler,
        rewards::claim_points_handler,
        rewards::get_user_rewards_handler,
        coupons::validate_coupon_handler,
        coupons::create_coupon_handler,
        catalog::create_category_handler,
        catalog::create_product_handler,
        catalog::get_product_handler,
        catalog::archive_product_handler,
        catalog::create_product_discount_handler,
        catalog::update_stock_handler,
        catalog::inventory_logs_handler,
    ),
    components(
        schemas(
            orders::OrderStatus,
            orders::OrderItemRequest,
            orders::CreateOrderRequest,
            orders::UpdateStatusRequest,
            orders::UpdatePaymentRequest,
            orders::OrderResponse,
            orders::OrderItemResponse,
            users::ShippingAddressRequest,
            rewards::RewardPoints,
            rewards::ClaimPointsRequest,
            rewards::ClaimPointsResponse,
            rewards::UserRewardsSummary,
            loyalty::LoyaltyTier,
            coupons::DiscountType,
            coupons::Coupon,
            coupons::CouponUsage,
            coupons::CreateCouponRequest,
            coupons::UpdateCouponRequest,
            coupons::ValidateCouponRequest,
            coupons::CouponValidationResponse,
            catalog::Category,
            catalog::Product,
            catalog::ProductDiscount,
            catalog::CreateCategoryRequest,
            catalog::CreateProductRequest,
            catalog::CreateProductDiscountRequest,
            catalog::InventoryChangeType,
            catalog::InventoryLog,
            catalog::StockAlert,
            catalog::StockUpdateRequest,
        )
    ),
    tags(
        (name = "orders", description = "Checkout and order lifecycle"),
        (name = "rewards", description = "Reward-point settlement and claims"),
        (name = "coupons", description = "Coupon administration and validation"),
        (name = "catalog", description = "Products, categories, product discounts and inventory history")
    ),
    info(
        title = "Shop API",
        version = "1.0.0",
        description = "Order checkout, coupons and loyalty settlement"
    )
)]
pub struct ApiDoc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub catalog_service: CatalogService,
    pub coupon_service: CouponService,
    pub order_service: OrderService,
    pub reward_service: RewardService,
}

impl AppState {
    pub fn new(db: PgPool, ledger: LoyaltyLedger, notifier: Arc<dyn OrderNotifier>) -> Self {
        let catalog_repo = CatalogRepository::new(db.clone());
        let reward_service = RewardService::new(RewardsRepository::new(db.clone()), Arc::new(ledger));

        Self {
            catalog_service: CatalogService::new(catalog_repo.clone()),
            coupon_service: CouponService::new(CouponsRepository::new(db.clone()), catalog_repo),
            order_service: OrderService::with_settlement(
                OrdersRepository::new(db.clone()),
                notifier,
                reward_service.clone(),
            ),
            reward_service,
        }
    }
}

/// Creates and configures the application router
/// Maps all API endpoints to their handlers and adds CORS and request tracing
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Orders
        .route(
            "/api/orders",
            post(orders::create_order_handler).get(orders::list_orders_handler),
        )
        .route(
            "/api/orders/:order_id",
            get(orders::get_order_handler).delete(orders::cancel_order_handler),
        )
        .route("/api/orders/user/:user_id", get(orders::list_user_orders_handler))
        .route("/api/orders/:order_id/status", put(orders::update_order_status_handler))
        .route("/api/orders/:order_id/payment", patch(orders::update_payment_handler))
        // Rewards
        .route("/api/rewards/orders/:order_id", post(rewards::generate_points_handler))
        .route("/api/rewards/process/:user_id", post(rewards::process_user_orders_handler))
        .route("/api/rewards/claim", post(rewards::claim_points_handler))
        .route("/api/rewards/user/:user_id", get(rewards::get_user_rewards_handler))
        // Coupons
        .route("/api/coupons/validate", post(coupons::validate_coupon_handler))
        .route("/api/discounts/verify", post(coupons::validate_coupon_handler))
        .route(
            "/api/coupons",
            post(coupons::create_coupon_handler).get(coupons::list_coupons_handler),
        )
        .route(
            "/api/coupons/:coupon_id",
            get(coupons::get_coupon_handler)
                .put(coupons::update_coupon_handler)
                .delete(coupons::delete_coupon_handler),
        )
        .route("/api/coupons/code/:code", get(coupons::get_coupon_by_code_handler))
        .route("/api/coupons/:coupon_id/usages", get(coupons::coupon_usages_handler))
        .route("/api/coupons/usages/user/:user_id", get(coupons::user_coupon_usages_handler))
        // Catalog
        .route("/api/categories", post(catalog::create_category_handler))
        .route("/api/products", post(catalog::create_product_handler))
        .route(
            "/api/products/:product_id",
            get(catalog::get_product_handler).delete(catalog::archive_product_handler),
        )
        .route(
            "/api/products/:product_id/discounts",
            post(catalog::create_product_discount_handler),
        )
        .route("/api/products/:product_id/stock", post(catalog::update_stock_handler))
        .route(
            "/api/products/:product_id/inventory-logs",
            get(catalog::inventory_logs_handler),
        )
        .route("/api/products/:product_id/stock-alerts", get(catalog::stock_alerts_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod test_support;
