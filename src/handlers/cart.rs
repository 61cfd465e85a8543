// src/handlers/cart.rs
// CartHandler: mutates and reads the per-chat cart in SessionStore (spec 4.6).

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::catalog::store::CatalogStore;
use crate::error::{AppError, AppResult};
use crate::llm::ProductRef;
use crate::session::{CartItem, ChatId, SessionStore};

const PRESENTATION_LIMIT: usize = 20;

pub struct CartView {
    pub lines: Vec<CartItem>,
    pub truncated_count: usize,
    pub total: Decimal,
}

pub struct CartHandler {
    catalog: Arc<CatalogStore>,
    sessions: Arc<dyn SessionStore>,
}

impl CartHandler {
    pub fn new(catalog: Arc<CatalogStore>, sessions: Arc<dyn SessionStore>) -> Self {
        Self { catalog, sessions }
    }

    /// spec 4.6 `add`: resolves SKU as in 4.5, validates it exists, fetches
    /// the current price, and merges quantities on a repeated SKU.
    pub async fn add(&self, chat_id: ChatId, product_ref: &ProductRef, qty: i64) -> AppResult<Vec<CartItem>> {
        if qty < 1 {
            return Err(AppError::invariant("quantity must be >= 1"));
        }

        let sku = self.resolve_sku(chat_id, product_ref).await?;
        let price = self.catalog.product_price(&sku).await?;

        let mut cart = self.sessions.get_cart(chat_id).await?;
        match cart.iter_mut().find(|item| item.sku == sku) {
            Some(existing) => existing.quantity += qty,
            None => cart.push(CartItem { sku, quantity: qty, unit_price: price }),
        }

        self.sessions.set_cart(chat_id, cart.clone()).await?;
        Ok(cart)
    }

    /// spec 4.6 `update`: sets the line to exactly `qty`; `qty == 0` is
    /// equivalent to `remove`.
    pub async fn update(&self, chat_id: ChatId, product_ref: &ProductRef, qty: i64) -> AppResult<Vec<CartItem>> {
        if qty == 0 {
            return self.remove(chat_id, product_ref).await;
        }
        if qty < 0 {
            return Err(AppError::invariant("quantity must be >= 0"));
        }

        let sku = self.resolve_sku(chat_id, product_ref).await?;
        let mut cart = self.sessions.get_cart(chat_id).await?;

        match cart.iter_mut().find(|item| item.sku == sku) {
            Some(existing) => existing.quantity = qty,
            None => {
                let price = self.catalog.product_price(&sku).await?;
                cart.push(CartItem { sku, quantity: qty, unit_price: price });
            }
        }

        self.sessions.set_cart(chat_id, cart.clone()).await?;
        Ok(cart)
    }

    /// spec 4.6 `remove`: no-op if the line is absent.
    pub async fn remove(&self, chat_id: ChatId, product_ref: &ProductRef) -> AppResult<Vec<CartItem>> {
        let sku = self.resolve_sku(chat_id, product_ref).await?;
        let mut cart = self.sessions.get_cart(chat_id).await?;
        cart.retain(|item| item.sku != sku);
        self.sessions.set_cart(chat_id, cart.clone()).await?;
        Ok(cart)
    }

    /// spec 4.6 `view`.
    pub async fn view(&self, chat_id: ChatId) -> AppResult<CartView> {
        let cart = self.sessions.get_cart(chat_id).await?;
        let total = cart.iter().map(CartItem::line_total).sum();

        let truncated_count = cart.len().saturating_sub(PRESENTATION_LIMIT);
        let lines = cart.into_iter().take(PRESENTATION_LIMIT).collect();

        Ok(CartView { lines, truncated_count, total })
    }

    /// spec 4.6 `clear`.
    pub async fn clear(&self, chat_id: ChatId) -> AppResult<()> {
        self.sessions.clear_cart(chat_id).await
    }

    async fn resolve_sku(&self, chat_id: ChatId, product_ref: &ProductRef) -> AppResult<String> {
        match product_ref {
            ProductRef::Sku(sku) => {
                self.catalog
                    .find_product(sku)
                    .await?
                    .ok_or_else(|| AppError::not_found(format!("no encuentro el SKU {}", sku)))?;
                Ok(sku.clone())
            }
            ProductRef::Position(position) => {
                let recent = self.sessions.get_recent_products(chat_id).await?;
                let index = usize::try_from(*position - 1).ok();
                match index.and_then(|i| recent.get(i)) {
                    Some(sku) => Ok(sku.clone()),
                    None => Err(AppError::not_found(format!(
                        "No veo el elemento {} en la última lista.",
                        position
                    ))),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use crate::session::InMemorySessionStore;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_catalog() -> Arc<CatalogStore> {
        let pool = SqlitePoolOptions::new().connect(":memory:").await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        sqlx::query("INSERT INTO products (sku, name, description, brand, price, specs_json) VALUES (?, 'Taladro', '', 'Bosch', '45.00', '{}')")
            .bind("SKU00010")
            .execute(&pool)
            .await
            .unwrap();
        Arc::new(CatalogStore::new(pool))
    }

    #[tokio::test]
    async fn add_merges_quantities_on_repeated_sku() {
        let catalog = test_catalog().await;
        let sessions = Arc::new(InMemorySessionStore::new());
        let handler = CartHandler::new(catalog, sessions.clone());

        handler.add(1, &ProductRef::Sku("SKU00010".into()), 2).await.unwrap();
        let cart = handler.add(1, &ProductRef::Sku("SKU00010".into()), 3).await.unwrap();

        assert_eq!(cart.len(), 1);
        assert_eq!(cart[0].quantity, 5);
        assert_eq!(cart[0].unit_price, dec!(45.00));
    }

    #[tokio::test]
    async fn update_to_zero_removes_the_line() {
        let catalog = test_catalog().await;
        let sessions = Arc::new(InMemorySessionStore::new());
        let handler = CartHandler::new(catalog, sessions.clone());

        handler.add(1, &ProductRef::Sku("SKU00010".into()), 2).await.unwrap();
        let cart = handler.update(1, &ProductRef::Sku("SKU00010".into()), 0).await.unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn view_recomputes_total_from_lines() {
        let catalog = test_catalog().await;
        let sessions = Arc::new(InMemorySessionStore::new());
        let handler = CartHandler::new(catalog, sessions.clone());

        handler.add(1, &ProductRef::Sku("SKU00010".into()), 2).await.unwrap();
        let view = handler.view(1).await.unwrap();
        assert_eq!(view.total, dec!(90.00));
    }

    #[tokio::test]
    async fn remove_on_absent_line_is_a_no_op() {
        let catalog = test_catalog().await;
        let sessions = Arc::new(InMemorySessionStore::new());
        let handler = CartHandler::new(catalog, sessions.clone());

        let cart = handler.remove(1, &ProductRef::Sku("SKU99999".into())).await.unwrap();
        assert!(cart.is_empty());
    }
}
