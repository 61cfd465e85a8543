// src/catalog/store.rs
// CatalogStore: facade delegating to focused per-aggregate operation structs.

use sqlx::SqlitePool;

use crate::catalog::categories::CategoryOperations;
use crate::catalog::clients::ClientOperations;
use crate::catalog::models::{Category, Client, NewClient, NewOrderLine, Order, OrderWithItems, Product};
use crate::catalog::orders::OrderOperations;
use crate::catalog::products::ProductOperations;
use crate::error::AppResult;

pub struct CatalogStore {
    pub pool: SqlitePool,
    products: ProductOperations,
    categories: CategoryOperations,
    clients: ClientOperations,
    orders: OrderOperations,
}

impl CatalogStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            products: ProductOperations::new(pool.clone()),
            categories: CategoryOperations::new(pool.clone()),
            clients: ClientOperations::new(pool.clone()),
            orders: OrderOperations::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn find_product(&self, sku: &str) -> AppResult<Option<Product>> {
        self.products.find_by_sku(sku).await
    }

    pub async fn find_products(&self, skus: &[String]) -> AppResult<Vec<Product>> {
        self.products.find_many(skus).await
    }

    pub async fn product_price(&self, sku: &str) -> AppResult<rust_decimal::Decimal> {
        self.products.current_price(sku).await
    }

    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        self.categories.list_all().await
    }

    pub async fn find_category_by_name(&self, name: &str) -> AppResult<Option<Category>> {
        self.categories.find_by_name(name).await
    }

    pub async fn find_client_by_email(&self, email: &str) -> AppResult<Option<Client>> {
        self.clients.find_by_email(email).await
    }

    pub async fn find_client_by_id(&self, id: &str) -> AppResult<Option<Client>> {
        self.clients.find_by_id(id).await
    }

    pub async fn get_or_create_client(&self, draft: &NewClient) -> AppResult<Client> {
        self.clients.get_or_create(draft).await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn commit_order(
        &self,
        client_id: &str,
        chat_id: i64,
        customer_name: &str,
        customer_email: &str,
        shipping_address: &str,
        lines: &[NewOrderLine],
    ) -> AppResult<Order> {
        self.orders
            .commit_order(client_id, chat_id, customer_name, customer_email, shipping_address, lines)
            .await
    }

    pub async fn load_order_with_items(&self, order_id: &str) -> AppResult<OrderWithItems> {
        self.orders.load_order_with_items(order_id).await
    }

    pub async fn set_invoice_url(&self, order_id: &str, url: &str) -> AppResult<()> {
        self.orders.set_invoice_url(order_id, url).await
    }

    pub async fn record_invoice_failure(&self, order_id: &str, reason: &str) -> AppResult<()> {
        self.orders.record_invoice_failure(order_id, reason).await
    }
}
