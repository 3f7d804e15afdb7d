use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::catalog::CatalogRepository;
use crate::coupons::{CouponService, ScopedLine};
use crate::error::ApiError;
use crate::notifications::{spawn_confirmation, OrderConfirmation, OrderNotifier};
use crate::orders::{
    CreateOrderRequest, NewOrder, Order, OrderListQuery, OrderResponse, OrderStatus, OrdersRepository,
    PriceCalculator, PricedLine, StatusMachine, UpdatePaymentRequest,
};
use crate::query::{PageParams, Pagination};
use crate::rewards::RewardService;
use crate::users::{AddressRepository, UsersRepository};

/// Checkout orchestration and the order lifecycle
#[derive(Clone)]
pub struct OrderService {
    repo: OrdersRepository,
    notifier: Arc<dyn OrderNotifier>,
    settlement: Option<RewardService>,
}

impl OrderService {
    pub fn new(repo: OrdersRepository, notifier: Arc<dyn OrderNotifier>) -> Self {
        Self {
            repo,
            notifier,
            settlement: None,
        }
    }

    /// Create an OrderService that settles reward points when orders are delivered
    pub fn with_settlement(
        repo: OrdersRepository,
        notifier: Arc<dyn OrderNotifier>,
        settlement: RewardService,
    ) -> Self {
        Self {
            repo,
            notifier,
            settlement: Some(settlement),
        }
    }

    fn pool(&self) -> &PgPool {
        self.repo.pool()
    }

    /// Place an order
    ///
    /// # Steps
    /// All of these run in one transaction; any failure rolls everything back.
    /// 1. Resolve the active user
    /// 2. Resolve or create the shipping address
    /// 3. Price each line and reserve its stock
    /// 4. Evaluate the coupon, if one was supplied
    /// 5. Persist the order, its items and the coupon redemption
    ///
    /// The confirmation is sent after commit and never fails the checkout.
    pub async fn create_order(&self, request: CreateOrderRequest) -> Result<OrderResponse, ApiError> {
        request.validate()?;
        let lines = PriceCalculator::merge_lines(&request.items).map_err(ApiError::InvalidArgument)?;
        let now = Utc::now();

        let mut tx = self.pool().begin().await?;

        let user = UsersRepository::require_active(&mut *tx, request.user_id).await?;
        let shipping_address_id = Self::resolve_address(&mut *tx, user.id, &request).await?;
        let priced = Self::reserve_lines(&mut *tx, user.id, &lines, now).await?;

        let subtotals: Vec<Decimal> = priced
            .iter()
            .map(|line| PriceCalculator::calculate_subtotal(line.quantity, line.unit_price))
            .collect();
        let total = PriceCalculator::calculate_total(&subtotals);

        let coupon_code = request
            .coupon_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty());

        let mut applied = None;
        if let Some(code) = coupon_code {
            let scope: Vec<ScopedLine> = priced
                .iter()
                .map(|line| ScopedLine {
                    product_id: line.product_id,
                    category_id: line.category_id,
                })
                .collect();
            applied = Some(
                CouponService::evaluate_for_checkout(&mut *tx, code, total, user.id, &scope, now).await?,
            );
        }

        let requested_discount = applied.as_ref().map_or(Decimal::ZERO, |a| a.discount_amount);
        let (discount_amount, final_amount) = PriceCalculator::apply_discount(total, requested_discount);

        let order = OrdersRepository::insert_order(
            &mut *tx,
            &NewOrder {
                user_id: user.id,
                total_amount: total,
                discount_amount,
                final_amount,
                coupon_id: applied.as_ref().map(|a| a.coupon_id),
                coupon_code: applied.as_ref().map(|a| a.code.as_str()),
                payment_method: request.payment_method.trim(),
                payment_id: request.payment_id.as_deref(),
                shipping_address_id,
            },
        )
        .await?;

        let mut items = Vec::with_capacity(priced.len());
        for (position, line) in priced.iter().enumerate() {
            items.push(OrdersRepository::insert_item(&mut *tx, order.id, line, position as i32).await?);
        }

        if let Some(mut applied) = applied {
            applied.discount_amount = discount_amount;
            CouponService::record_redemption(&mut *tx, &applied, user.id, order.id).await?;
        }

        tx.commit().await?;

        tracing::info!(
            "Order {} placed by user {}: total {}, discount {}, final {}",
            order.id,
            user.id,
            total,
            discount_amount,
            final_amount
        );

        spawn_confirmation(
            self.notifier.clone(),
            OrderConfirmation {
                order_id: order.id,
                recipient: user.email.clone(),
                final_amount,
                item_count: items.len(),
                created_at: order.created_at,
            },
        );

        Ok(OrderResponse::from_parts(order, items, Some(user.email)))
    }

    async fn resolve_address(
        conn: &mut PgConnection,
        user_id: Uuid,
        request: &CreateOrderRequest,
    ) -> Result<Uuid, ApiError> {
        match (request.address_id, &request.shipping_address) {
            (Some(address_id), _) => {
                let address = AddressRepository::find_by_id(&mut *conn, address_id)
                    .await?
                    .ok_or_else(|| ApiError::not_found("Address", address_id))?;
                if address.user_id != user_id {
                    return Err(ApiError::InvalidArgument(
                        "Address does not belong to user".to_string(),
                    ));
                }
                Ok(address.id)
            }
            (None, Some(inline)) => Ok(AddressRepository::create_inline(conn, user_id, inline).await?.id),
            (None, None) => Err(ApiError::InvalidArgument(
                "Either addressId or shippingAddress is required".to_string(),
            )),
        }
    }

    /// Price every line and take its quantity out of stock
    ///
    /// Products are reserved in id order so concurrent checkouts lock rows in
    /// the same sequence; the result keeps the request order.
    async fn reserve_lines(
        conn: &mut PgConnection,
        user_id: Uuid,
        lines: &[(Uuid, i32)],
        now: chrono::DateTime<Utc>,
    ) -> Result<Vec<PricedLine>, ApiError> {
        let mut reservation_order: Vec<usize> = (0..lines.len()).collect();
        reservation_order.sort_by_key(|&i| lines[i].0);

        let mut priced: Vec<Option<PricedLine>> = vec![None; lines.len()];
        for index in reservation_order {
            let (product_id, quantity) = lines[index];

            let product = CatalogRepository::find_product(&mut *conn, product_id)
                .await?
                .filter(|p| p.active)
                .ok_or_else(|| ApiError::not_found("Product", product_id))?;

            let unit_price = CatalogRepository::active_discount_price(&mut *conn, product_id, now)
                .await?
                .unwrap_or(product.price);

            let level = CatalogRepository::reserve_stock(&mut *conn, product_id, quantity, Some(user_id))
                .await?
                .ok_or_else(|| ApiError::insufficient_stock(&product.name))?;
            if level.is_low() {
                tracing::warn!(
                    "Product {} ({}) is low on stock: {} left",
                    product.name,
                    product.id,
                    level.stock_quantity
                );
            }

            priced[index] = Some(PricedLine {
                product_id,
                product_name: product.name,
                category_id: product.category_id,
                quantity,
                unit_price,
            });
        }

        Ok(priced.into_iter().flatten().collect())
    }

    async fn to_response(&self, order: Order) -> Result<OrderResponse, ApiError> {
        let items = OrdersRepository::items_for_order(self.pool(), order.id).await?;
        let email = match order.user_id {
            Some(user_id) => UsersRepository::email_of(self.pool(), user_id).await?,
            None => None,
        };
        Ok(OrderResponse::from_parts(order, items, email))
    }

    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderResponse, ApiError> {
        let order = OrdersRepository::find_by_id(self.pool(), order_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Order", order_id))?;
        self.to_response(order).await
    }

    pub async fn list_user_orders(
        &self,
        user_id: Uuid,
        params: PageParams,
    ) -> Result<Vec<OrderResponse>, ApiError> {
        let pagination = Pagination::try_from(params)?;
        UsersRepository::require_active(self.pool(), user_id).await?;

        let orders = self.repo.find_by_user(user_id, pagination).await?;
        let mut responses = Vec::with_capacity(orders.len());
        for order in orders {
            responses.push(self.to_response(order).await?);
        }
        Ok(responses)
    }

    pub async fn list_orders(&self, query: OrderListQuery) -> Result<Vec<OrderResponse>, ApiError> {
        let pagination = Pagination::from_params(query.page, query.limit)?;
        let orders = self.repo.list(query.status, pagination).await?;

        let mut responses = Vec::with_capacity(orders.len());
        for order in orders {
            responses.push(self.to_response(order).await?);
        }
        Ok(responses)
    }

    /// Move an order through its lifecycle
    ///
    /// Setting the current status again is a no-op. CANCELLED restocks every
    /// line; DELIVERED triggers reward settlement when enabled.
    pub async fn update_order_status(
        &self,
        order_id: Uuid,
        status: OrderStatus,
    ) -> Result<OrderResponse, ApiError> {
        let mut tx = self.pool().begin().await?;
        let order = OrdersRepository::lock_by_id(&mut *tx, order_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Order", order_id))?;

        if order.status == status {
            tx.commit().await?;
            return self.to_response(order).await;
        }

        StatusMachine::transition(order.status, status).map_err(ApiError::ValidationError)?;

        let updated = if status == OrderStatus::Cancelled {
            Self::cancel_locked(&mut *tx, &order).await?
        } else {
            OrdersRepository::update_status(&mut *tx, order_id, status).await?
        };
        tx.commit().await?;

        tracing::info!("Order {} moved from {} to {}", order_id, order.status, updated.status);

        if updated.status == OrderStatus::Delivered {
            self.settle_delivered(order_id).await;
        }

        self.to_response(updated).await
    }

    /// Cancel a pending or processing order and put its stock back
    pub async fn cancel_order(&self, order_id: Uuid) -> Result<(), ApiError> {
        let mut tx = self.pool().begin().await?;
        let order = OrdersRepository::lock_by_id(&mut *tx, order_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Order", order_id))?;

        Self::cancel_locked(&mut *tx, &order).await?;
        tx.commit().await?;

        tracing::info!("Order {} cancelled", order_id);
        Ok(())
    }

    async fn cancel_locked(conn: &mut PgConnection, order: &Order) -> Result<Order, ApiError> {
        if !StatusMachine::can_cancel(order.status) {
            return Err(ApiError::InvalidState(
                "Only pending or processing orders can be cancelled".to_string(),
            ));
        }

        // Ascending product id, the same lock order checkout uses
        let mut items = OrdersRepository::items_for_order(&mut *conn, order.id).await?;
        items.sort_by_key(|item| item.product_id);
        for item in &items {
            CatalogRepository::restock(&mut *conn, item.product_id, item.quantity, order.user_id).await?;
        }

        OrdersRepository::update_status(conn, order.id, OrderStatus::Cancelled).await
    }

    async fn settle_delivered(&self, order_id: Uuid) {
        let Some(settlement) = &self.settlement else {
            return;
        };
        if !settlement.ledger().auto_settle_on_delivery() {
            return;
        }

        match settlement.generate_points_for_order(order_id).await {
            Ok(reward) => tracing::info!(
                "Settled {} points for delivered order {}",
                reward.points_earned,
                order_id
            ),
            Err(e) => tracing::warn!("Automatic settlement failed for order {}: {}", order_id, e),
        }
    }

    pub async fn update_payment(
        &self,
        order_id: Uuid,
        request: UpdatePaymentRequest,
    ) -> Result<OrderResponse, ApiError> {
        request.validate()?;
        let order = self
            .repo
            .update_payment_id(order_id, request.payment_id.trim())
            .await?
            .ok_or_else(|| ApiError::not_found("Order", order_id))?;

        tracing::info!("Payment reference attached to order {}", order_id);
        self.to_response(order).await
    }
}
