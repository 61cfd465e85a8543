// src/catalog/products.rs
// Product and category lookups (spec 3, 4.5).

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::catalog::models::Product;
use crate::error::{AppError, AppResult};

pub struct ProductOperations {
    pool: SqlitePool,
}

impl ProductOperations {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_sku(&self, sku: &str) -> AppResult<Option<Product>> {
        let row = sqlx::query(
            r#"
            SELECT sku, name, description, brand, price, category_id, specs_json
            FROM products
            WHERE sku = ?
            "#,
        )
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(self.row_to_product(&row).await?))
    }

    /// Resolve a batch of SKUs in list order, silently dropping any SKU the
    /// vector index returned that no longer has a catalog row (spec 9:
    /// "catalog <-> vector consistency is eventually consistent").
    pub async fn find_many(&self, skus: &[String]) -> AppResult<Vec<Product>> {
        let mut found = Vec::with_capacity(skus.len());
        for sku in skus {
            match self.find_by_sku(sku).await {
                Ok(Some(product)) => found.push(product),
                Ok(None) => {
                    debug!(sku = %sku, "SKU returned by vector index but missing from catalog, dropping");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(found)
    }

    pub async fn current_price(&self, sku: &str) -> AppResult<Decimal> {
        let product = self
            .find_by_sku(sku)
            .await?
            .ok_or_else(|| AppError::not_found(format!("no encuentro el SKU {}", sku)))?;
        Ok(product.price)
    }

    async fn row_to_product(&self, row: &sqlx::sqlite::SqliteRow) -> AppResult<Product> {
        let sku: String = row.get("sku");
        let price_str: String = row.get("price");
        let price = Decimal::from_str(&price_str)
            .map_err(|e| AppError::invariant(format!("malformed price for {}: {}", sku, e)))?;
        let specs_json: String = row.get("specs_json");
        let specs: HashMap<String, String> = serde_json::from_str(&specs_json).unwrap_or_default();

        let image_rows = sqlx::query(
            r#"
            SELECT images.url
            FROM product_images
            JOIN images ON images.id = product_images.image_id
            WHERE product_images.product_sku = ?
            ORDER BY product_images.position ASC
            "#,
        )
        .bind(&sku)
        .fetch_all(&self.pool)
        .await?;

        let image_urls = image_rows
            .into_iter()
            .map(|r| r.get::<String, _>("url"))
            .collect();

        Ok(Product {
            sku,
            name: row.get("name"),
            description: row.get("description"),
            brand: row.get("brand"),
            price,
            category_id: row.get("category_id"),
            specs,
            image_urls,
        })
    }
}
