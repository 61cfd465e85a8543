// src/catalog/models.rs
// Core catalog/order data model (spec 3).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type Money = Decimal;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub sku: String,
    pub name: String,
    pub description: String,
    pub brand: String,
    pub price: Money,
    pub category_id: Option<i64>,
    pub specs: HashMap<String, String>,
    pub image_urls: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
}

/// Draft data collected for a new client during checkout (spec 4.7).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewClient {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub client_id: Option<String>,
    pub chat_id: i64,
    pub customer_name: String,
    pub customer_email: String,
    pub shipping_address: String,
    pub total_amount: Money,
    pub status: String,
    pub invoice_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub order_id: String,
    pub product_sku: String,
    pub quantity: i64,
    pub unit_price: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItemDetail>,
}

/// An order item enriched with the product's (possibly since-changed) name,
/// for invoice rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemDetail {
    pub product_sku: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
}

/// A cart line queued for checkout commit (spec 3 CartItem, carried through
/// to OrderItem).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderLine {
    pub product_sku: String,
    pub quantity: i64,
    pub unit_price: Money,
}
