// src/catalog/orders.rs
// Order commit, invoice bookkeeping and audit trail (spec 4.7, 4.9).

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Row, SqlitePool};

use crate::catalog::models::{NewOrderLine, Order, OrderItemDetail, OrderWithItems};
use crate::error::{AppError, AppResult};

pub struct OrderOperations {
    pool: SqlitePool,
}

impl OrderOperations {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Atomically commit a checkout: allocate an order id, insert the order
    /// row as `pending`, and insert one line per cart item. Either all of
    /// this lands or none of it does; on failure the caller's in-memory cart
    /// and checkout state are left untouched so the customer can retry
    /// (spec 4.7 commit procedure, spec 9 atomicity invariant).
    pub async fn commit_order(
        &self,
        client_id: &str,
        chat_id: i64,
        customer_name: &str,
        customer_email: &str,
        shipping_address: &str,
        lines: &[NewOrderLine],
    ) -> AppResult<Order> {
        if lines.is_empty() {
            return Err(AppError::invariant("cannot commit an order with no lines"));
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO id_sequences (name, value) VALUES ('order', 1)
            ON CONFLICT(name) DO UPDATE SET value = value + 1
            "#,
        )
        .execute(&mut *tx)
        .await?;
        let seq_row = sqlx::query("SELECT value FROM id_sequences WHERE name = 'order'")
            .fetch_one(&mut *tx)
            .await?;
        let seq: i64 = seq_row.get("value");
        let order_id = format!("ORD{:05}", seq);

        let total: Decimal = lines
            .iter()
            .map(|l| l.unit_price * Decimal::from(l.quantity))
            .sum();

        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, client_id, chat_id, customer_name, customer_email,
                shipping_address, total_amount, status, invoice_url,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, 'pending', NULL, ?, ?)
            "#,
        )
        .bind(&order_id)
        .bind(client_id)
        .bind(chat_id)
        .bind(customer_name)
        .bind(customer_email)
        .bind(shipping_address)
        .bind(total.to_string())
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        for line in lines {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, product_sku, quantity, unit_price)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(&order_id)
            .bind(&line.product_sku)
            .bind(line.quantity)
            .bind(line.unit_price.to_string())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(Order {
            id: order_id,
            client_id: Some(client_id.to_string()),
            chat_id,
            customer_name: customer_name.to_string(),
            customer_email: customer_email.to_string(),
            shipping_address: shipping_address.to_string(),
            total_amount: total,
            status: "pending".to_string(),
            invoice_url: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Single eagerly-joined read used by the invoice dispatcher so it never
    /// re-enters the orchestrator's session state (spec 4.9 step 2).
    pub async fn load_order_with_items(&self, order_id: &str) -> AppResult<OrderWithItems> {
        let order_row = sqlx::query(
            r#"
            SELECT id, client_id, chat_id, customer_name, customer_email,
                   shipping_address, total_amount, status, invoice_url,
                   created_at, updated_at
            FROM orders
            WHERE id = ?
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found(format!("order {} not found", order_id)))?;

        let order = Self::row_to_order(order_row)?;

        let item_rows = sqlx::query(
            r#"
            SELECT order_items.product_sku, order_items.quantity, order_items.unit_price,
                   products.name AS product_name
            FROM order_items
            LEFT JOIN products ON products.sku = order_items.product_sku
            WHERE order_items.order_id = ?
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        let mut items = Vec::with_capacity(item_rows.len());
        for row in item_rows {
            let unit_price_str: String = row.get("unit_price");
            let unit_price = Decimal::from_str(&unit_price_str)
                .map_err(|e| AppError::invariant(format!("malformed unit_price: {}", e)))?;
            let quantity: i64 = row.get("quantity");
            let product_name: Option<String> = row.get("product_name");

            items.push(OrderItemDetail {
                product_sku: row.get("product_sku"),
                product_name: product_name.unwrap_or_else(|| "(producto descontinuado)".to_string()),
                quantity,
                unit_price,
                line_total: unit_price * Decimal::from(quantity),
            });
        }

        Ok(OrderWithItems { order, items })
    }

    /// Updates only `invoice_url`; `status` never moves past `pending` at
    /// the core level (spec 1 non-goals: "order-status lifecycle beyond
    /// `pending`", spec 3: "An order is append-only ... except the invoice
    /// URL").
    pub async fn set_invoice_url(&self, order_id: &str, url: &str) -> AppResult<()> {
        let now = Utc::now();
        sqlx::query(
            r#"
            UPDATE orders SET invoice_url = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(url)
        .bind(now.to_rfc3339())
        .bind(order_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Record an invoice delivery failure without touching order status; the
    /// order stays `pending` and committed regardless of invoicing outcome
    /// (spec 4.9 step 5).
    pub async fn record_invoice_failure(&self, order_id: &str, reason: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (order_id, event, detail, created_at)
            VALUES (?, 'invoice_failed', ?, ?)
            "#,
        )
        .bind(order_id)
        .bind(reason)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn row_to_order(row: sqlx::sqlite::SqliteRow) -> AppResult<Order> {
        let total_str: String = row.get("total_amount");
        let total_amount = Decimal::from_str(&total_str)
            .map_err(|e| AppError::invariant(format!("malformed total_amount: {}", e)))?;
        let created_at: String = row.get("created_at");
        let updated_at: String = row.get("updated_at");

        Ok(Order {
            id: row.get("id"),
            client_id: row.get("client_id"),
            chat_id: row.get("chat_id"),
            customer_name: row.get("customer_name"),
            customer_email: row.get("customer_email"),
            shipping_address: row.get("shipping_address"),
            total_amount,
            status: row.get("status"),
            invoice_url: row.get("invoice_url"),
            created_at: parse_dt(&created_at),
            updated_at: parse_dt(&updated_at),
        })
    }
}

fn parse_dt(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
