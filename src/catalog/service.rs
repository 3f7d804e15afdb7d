use uuid::Uuid;
use validator::Validate;

use crate::catalog::{
    CatalogRepository, Category, CreateCategoryRequest, CreateProductDiscountRequest,
    CreateProductRequest, InventoryChangeType, InventoryLog, Product, ProductDiscount, StockAlert,
    StockLevel, StockUpdateRequest,
};
use crate::db::is_unique_violation;
use crate::error::ApiError;
use crate::query::{PageParams, Pagination};
use crate::users::UsersRepository;

/// Catalog administration: categories, products, product discounts
#[derive(Clone)]
pub struct CatalogService {
    repo: CatalogRepository,
}

impl CatalogService {
    pub fn new(repo: CatalogRepository) -> Self {
        Self { repo }
    }

    pub async fn create_category(&self, request: CreateCategoryRequest) -> Result<Category, ApiError> {
        request.validate()?;

        self.repo.create_category(&request).await.map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::conflict(format!("Category '{}' already exists", request.name))
            } else {
                e.into()
            }
        })
    }

    pub async fn create_product(&self, request: CreateProductRequest) -> Result<Product, ApiError> {
        request.validate()?;

        if let Some(category_id) = request.category_id {
            if !self.repo.category_exists(category_id).await? {
                return Err(ApiError::not_found("Category", category_id));
            }
        }

        let mut tx = self.repo.pool().begin().await?;

        let product = CatalogRepository::create_product(&mut *tx, &request)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ApiError::conflict(format!("Product with SKU '{}' already exists", request.sku))
                } else {
                    e.into()
                }
            })?;

        // Opening stock counts as the first restock
        if product.stock_quantity > 0 {
            let level = StockLevel {
                stock_quantity: product.stock_quantity,
                low_stock_threshold: product.low_stock_threshold,
            };
            CatalogRepository::record_stock_change(&mut *tx, product.id, 0, level, InventoryChangeType::Restock, None)
                .await?;
        }

        tx.commit().await?;

        tracing::info!("Created product {} ({})", product.id, product.sku);
        Ok(product)
    }

    /// Manually correct a product's stock level
    ///
    /// Increases are logged as restocks, decreases as adjustments. The
    /// level can never drop below zero.
    pub async fn update_stock(
        &self,
        product_id: Uuid,
        request: StockUpdateRequest,
    ) -> Result<Product, ApiError> {
        request.validate()?;

        let mut tx = self.repo.pool().begin().await?;

        let product = CatalogRepository::lock_product(&mut *tx, product_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Product", product_id))?;
        if let Some(user_id) = request.changed_by {
            UsersRepository::require_active(&mut *tx, user_id).await?;
        }

        let level = CatalogRepository::adjust_stock(&mut *tx, product_id, request.quantity_change, request.changed_by)
            .await?
            .ok_or_else(|| {
                ApiError::InvalidArgument(format!(
                    "Cannot reduce stock below zero: {} in stock, change of {}",
                    product.stock_quantity, request.quantity_change
                ))
            })?;

        tx.commit().await?;

        if level.is_low() {
            tracing::warn!(
                "Product {} ({}) is low on stock: {} left",
                product.name,
                product_id,
                level.stock_quantity
            );
        }
        tracing::info!(
            "Stock of product {} changed from {} to {}",
            product_id,
            product.stock_quantity,
            level.stock_quantity
        );

        Ok(Product {
            stock_quantity: level.stock_quantity,
            ..product
        })
    }

    pub async fn inventory_logs(
        &self,
        product_id: Uuid,
        params: PageParams,
    ) -> Result<Vec<InventoryLog>, ApiError> {
        let pagination = Pagination::try_from(params)?;
        self.get_product(product_id).await?;
        self.repo.inventory_logs(product_id, pagination).await
    }

    pub async fn stock_alerts(
        &self,
        product_id: Uuid,
        params: PageParams,
    ) -> Result<Vec<StockAlert>, ApiError> {
        let pagination = Pagination::try_from(params)?;
        self.get_product(product_id).await?;
        self.repo.stock_alerts(product_id, pagination).await
    }

    pub async fn get_product(&self, product_id: Uuid) -> Result<Product, ApiError> {
        self.repo
            .get_product(product_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Product", product_id))
    }

    pub async fn archive_product(&self, product_id: Uuid) -> Result<Product, ApiError> {
        let product = self
            .repo
            .archive_product(product_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Product", product_id))?;

        tracing::info!("Archived product {}", product_id);
        Ok(product)
    }

    /// Schedule a discounted price for a product
    ///
    /// The discount price must undercut the list price, the window must be
    /// well-formed and must not overlap another active discount.
    pub async fn create_discount(
        &self,
        product_id: Uuid,
        request: CreateProductDiscountRequest,
    ) -> Result<ProductDiscount, ApiError> {
        request.validate()?;

        if request.start_date >= request.end_date {
            return Err(ApiError::ValidationError(
                "Discount start date must be before end date".to_string(),
            ));
        }

        let mut tx = self.repo.pool().begin().await?;

        let product = CatalogRepository::lock_product(&mut *tx, product_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Product", product_id))?;

        if request.discount_price >= product.price {
            return Err(ApiError::ValidationError(format!(
                "Discount price must be lower than the product price of {}",
                product.price
            )));
        }

        if CatalogRepository::has_overlapping_discount(&mut *tx, product_id, request.start_date, request.end_date).await? {
            return Err(ApiError::conflict(
                "Product already has an active discount overlapping this period",
            ));
        }

        let discount = CatalogRepository::insert_discount(
            &mut *tx,
            product_id,
            request.discount_price,
            request.start_date,
            request.end_date,
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            "Scheduled discount {} for product {} at {}",
            discount.id,
            product_id,
            discount.discount_price
        );
        Ok(discount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_discount_must_undercut_list_price() {
        let Some(pool) = test_support::test_pool().await else { return };
        let service = CatalogService::new(CatalogRepository::new(pool.clone()));
        let product = test_support::create_product(&pool, dec!(20.00), 5).await;

        let err = service
            .create_discount(
                product.id,
                CreateProductDiscountRequest {
                    discount_price: dec!(25.00),
                    start_date: Utc::now(),
                    end_date: Utc::now() + Duration::days(3),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_overlapping_discounts_rejected() {
        let Some(pool) = test_support::test_pool().await else { return };
        let service = CatalogService::new(CatalogRepository::new(pool.clone()));
        let product = test_support::create_product(&pool, dec!(20.00), 5).await;
        let now = Utc::now();

        service
            .create_discount(
                product.id,
                CreateProductDiscountRequest {
                    discount_price: dec!(15.00),
                    start_date: now,
                    end_date: now + Duration::days(7),
                },
            )
            .await
            .unwrap();

        let err = service
            .create_discount(
                product.id,
                CreateProductDiscountRequest {
                    discount_price: dec!(12.00),
                    start_date: now + Duration::days(3),
                    end_date: now + Duration::days(10),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_sku_is_conflict() {
        let Some(pool) = test_support::test_pool().await else { return };
        let service = CatalogService::new(CatalogRepository::new(pool.clone()));
        let product = test_support::create_product(&pool, dec!(9.99), 1).await;

        let err = service
            .create_product(CreateProductRequest {
                name: "Copy".to_string(),
                description: None,
                price: dec!(9.99),
                sku: product.sku.clone(),
                stock_quantity: 1,
                low_stock_threshold: 0,
                category_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_archived_product_cannot_be_reserved() {
        let Some(pool) = test_support::test_pool().await else { return };
        let service = CatalogService::new(CatalogRepository::new(pool.clone()));
        let product = test_support::create_product(&pool, dec!(5.00), 10).await;

        let archived = service.archive_product(product.id).await.unwrap();
        assert!(!archived.active);

        let mut conn = pool.acquire().await.unwrap();
        let reserved = CatalogRepository::reserve_stock(&mut *conn, product.id, 1, None).await.unwrap();
        assert!(reserved.is_none());
    }

    fn new_product(stock_quantity: i32, low_stock_threshold: i32) -> CreateProductRequest {
        CreateProductRequest {
            name: "Desk Lamp".to_string(),
            description: None,
            price: dec!(40.00),
            sku: format!("LAMP-{}", Uuid::new_v4()),
            stock_quantity,
            low_stock_threshold,
            category_id: None,
        }
    }

    #[tokio::test]
    async fn test_opening_stock_is_logged_as_restock() {
        let Some(pool) = test_support::test_pool().await else { return };
        let service = CatalogService::new(CatalogRepository::new(pool.clone()));

        let product = service.create_product(new_product(12, 3)).await.unwrap();

        let logs = service.inventory_logs(product.id, PageParams::default()).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].change_type, InventoryChangeType::Restock);
        assert_eq!((logs[0].old_quantity, logs[0].new_quantity), (0, 12));
        assert!(service.stock_alerts(product.id, PageParams::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reservation_and_restock_are_logged() {
        let Some(pool) = test_support::test_pool().await else { return };
        let service = CatalogService::new(CatalogRepository::new(pool.clone()));
        let product = test_support::create_product(&pool, dec!(8.00), 10).await;
        let user = test_support::create_user(&pool, 0).await;

        let mut tx = pool.begin().await.unwrap();
        CatalogRepository::reserve_stock(&mut *tx, product.id, 4, Some(user)).await.unwrap().unwrap();
        CatalogRepository::restock(&mut *tx, product.id, 1, Some(user)).await.unwrap();
        tx.commit().await.unwrap();

        let logs = service.inventory_logs(product.id, PageParams::default()).await.unwrap();
        assert_eq!(logs.len(), 2);
        let sale = logs.iter().find(|l| l.change_type == InventoryChangeType::Sale).unwrap();
        assert_eq!((sale.old_quantity, sale.new_quantity), (10, 6));
        assert_eq!(sale.changed_by, Some(user));
        let restock = logs.iter().find(|l| l.change_type == InventoryChangeType::Restock).unwrap();
        assert_eq!((restock.old_quantity, restock.new_quantity), (6, 7));
    }

    #[tokio::test]
    async fn test_rolled_back_reservation_leaves_no_history() {
        let Some(pool) = test_support::test_pool().await else { return };
        let service = CatalogService::new(CatalogRepository::new(pool.clone()));
        let product = test_support::create_product(&pool, dec!(8.00), 10).await;

        let mut tx = pool.begin().await.unwrap();
        CatalogRepository::reserve_stock(&mut *tx, product.id, 9, None).await.unwrap().unwrap();
        tx.rollback().await.unwrap();

        assert!(service.inventory_logs(product.id, PageParams::default()).await.unwrap().is_empty());
        assert!(service.stock_alerts(product.id, PageParams::default()).await.unwrap().is_empty());
        assert_eq!(service.get_product(product.id).await.unwrap().stock_quantity, 10);
    }

    #[tokio::test]
    async fn test_low_stock_raises_alert() {
        let Some(pool) = test_support::test_pool().await else { return };
        let service = CatalogService::new(CatalogRepository::new(pool.clone()));
        let product = service.create_product(new_product(8, 3)).await.unwrap();

        let updated = service
            .update_stock(product.id, StockUpdateRequest { quantity_change: -5, changed_by: None })
            .await
            .unwrap();
        assert_eq!(updated.stock_quantity, 3);

        let alerts = service.stock_alerts(product.id, PageParams::default()).await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].current_stock, 3);
        assert_eq!(alerts[0].low_stock_threshold, 3);

        let logs = service.inventory_logs(product.id, PageParams::default()).await.unwrap();
        assert_eq!(logs[0].change_type, InventoryChangeType::Adjustment);
        assert_eq!((logs[0].old_quantity, logs[0].new_quantity), (8, 3));
    }

    #[tokio::test]
    async fn test_stock_cannot_go_negative() {
        let Some(pool) = test_support::test_pool().await else { return };
        let service = CatalogService::new(CatalogRepository::new(pool.clone()));
        let product = test_support::create_product(&pool, dec!(3.00), 2).await;

        let err = service
            .update_stock(product.id, StockUpdateRequest { quantity_change: -3, changed_by: None })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)));
        assert_eq!(service.get_product(product.id).await.unwrap().stock_quantity, 2);
        assert!(service.inventory_logs(product.id, PageParams::default()).await.unwrap().is_empty());

        let err = service
            .update_stock(product.id, StockUpdateRequest { quantity_change: 0, changed_by: None })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::RequestValidation(_)));
    }

    #[tokio::test]
    async fn test_history_of_unknown_product_is_not_found() {
        let Some(pool) = test_support::test_pool().await else { return };
        let service = CatalogService::new(CatalogRepository::new(pool.clone()));

        let err = service
            .inventory_logs(Uuid::new_v4(), PageParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound { .. }));
    }
}
