// src/orchestrator/transport.rs
// ChatTransport: outbound messaging abstraction (spec 6 "Outbound chat
// messages"). The webhook handler constructs one concrete impl and hands it
// to the Orchestrator; swapping chat providers never touches handler logic.

use async_trait::async_trait;

use crate::llm::{ClassifyResult, Entities, Intent};
use crate::session::ChatId;

/// One inline button attached to a message. `callback_data` round-trips
/// back as `callback_query.data` on tap and is dispatched as if typed
/// (spec 6): `detail:<SKU>` or `add:<SKU>:<qty>`.
#[derive(Debug, Clone)]
pub struct InlineButton {
    pub label: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn detail(sku: &str) -> Self {
        Self { label: "Ver detalles".to_string(), callback_data: format!("detail:{}", sku) }
    }

    pub fn add(sku: &str, qty: i64) -> Self {
        Self { label: format!("Agregar x{}", qty), callback_data: format!("add:{}:{}", sku, qty) }
    }
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_text(&self, chat_id: ChatId, markdown_text: &str, inline_buttons: Option<Vec<InlineButton>>) -> anyhow::Result<()>;
    async fn send_photo(&self, chat_id: ChatId, url: &str, caption: Option<&str>) -> anyhow::Result<()>;
}

/// Parses a callback payload of the form `detail:<SKU>` or `add:<SKU>:<qty>`
/// directly into a classification, bypassing the analyzer entirely — the
/// button already encodes an unambiguous intent (spec 6).
pub fn parse_callback(data: &str) -> Option<ClassifyResult> {
    let mut parts = data.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("detail"), Some(sku), None) if !sku.is_empty() => Some(ClassifyResult {
            intent: Intent::ProductDetail,
            entities: Entities { sku: Some(sku.to_uppercase()), ..Default::default() },
            confidence: 1.0,
        }),
        (Some("add"), Some(sku), Some(qty)) => qty.parse::<i64>().ok().map(|qty| ClassifyResult {
            intent: Intent::AddToCart,
            entities: Entities { sku: Some(sku.to_uppercase()), quantity: Some(qty.max(1)), ..Default::default() },
            confidence: 1.0,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_detail_callback() {
        let result = parse_callback("detail:SKU00010").unwrap();
        assert_eq!(result.intent, Intent::ProductDetail);
        assert_eq!(result.entities.sku.as_deref(), Some("SKU00010"));
    }

    #[test]
    fn parses_add_callback() {
        let result = parse_callback("add:SKU00010:2").unwrap();
        assert_eq!(result.intent, Intent::AddToCart);
        assert_eq!(result.entities.quantity, Some(2));
    }

    #[test]
    fn rejects_malformed_callback() {
        assert!(parse_callback("unknown").is_none());
    }
}
