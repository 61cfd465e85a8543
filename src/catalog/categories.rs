// src/catalog/categories.rs
// Category listing, used by ProductHandler to resolve category-name filters (spec 4.5).

use sqlx::{Row, SqlitePool};

use crate::catalog::models::Category;
use crate::error::AppResult;

pub struct CategoryOperations {
    pool: SqlitePool,
}

impl CategoryOperations {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list_all(&self) -> AppResult<Vec<Category>> {
        let rows = sqlx::query("SELECT id, name, parent_id FROM categories ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| Category {
                id: row.get("id"),
                name: row.get("name"),
                parent_id: row.get("parent_id"),
            })
            .collect())
    }

    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<Category>> {
        let row = sqlx::query("SELECT id, name, parent_id FROM categories WHERE name = ? COLLATE NOCASE")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| Category {
            id: row.get("id"),
            name: row.get("name"),
            parent_id: row.get("parent_id"),
        }))
    }
}
