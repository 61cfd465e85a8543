// src/analyzer/fallback.rs
// Regex-based keyword fingerprinting, used when the LLM is unavailable or
// returns malformed output (spec 4.3 "Fallback policy", spec 4.4 step 3).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::llm::{ClassifyResult, Entities, Intent};

static SKU_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?i)[A-Z]{2,6}\d{3,8}$").unwrap());

static GREETING_WORDS: &[&str] = &["hola", "buenas", "buenos dias", "buenos días", "hey", "hi"];
static HELP_WORDS: &[&str] = &["ayuda", "help", "que puedes hacer", "qué puedes hacer"];
static CART_VIEW_WORDS: &[&str] = &["ver carrito", "mi carrito", "que tengo en el carrito"];
static CART_CLEAR_WORDS: &[&str] = &["vaciar carrito", "vacia el carrito", "vaciar el carrito"];
static CHECKOUT_WORDS: &[&str] = &["finalizar compra", "quiero comprar", "hacer el pedido", "checkout"];

/// Route obvious commands without the LLM; everything else becomes a
/// `product_search` over the raw text, per spec 4.3's "Fallback policy".
pub fn classify(text: &str) -> ClassifyResult {
    let normalized = text.trim().to_lowercase();

    if normalized.is_empty() {
        return unknown();
    }

    if SKU_PATTERN.is_match(text.trim()) {
        return ClassifyResult {
            intent: Intent::ProductDetail,
            entities: Entities {
                sku: Some(text.trim().to_uppercase()),
                ..Default::default()
            },
            confidence: 0.9,
        };
    }

    if contains_any(&normalized, GREETING_WORDS) {
        return certain(Intent::Greeting);
    }
    if contains_any(&normalized, HELP_WORDS) {
        return certain(Intent::Help);
    }
    if contains_any(&normalized, CART_CLEAR_WORDS) {
        return certain(Intent::ClearCart);
    }
    if contains_any(&normalized, CART_VIEW_WORDS) {
        return certain(Intent::ViewCart);
    }
    if contains_any(&normalized, CHECKOUT_WORDS) {
        return certain(Intent::CheckoutStart);
    }

    ClassifyResult {
        intent: Intent::ProductSearch,
        entities: Entities {
            keywords: Some(text.trim().to_string()),
            ..Default::default()
        },
        confidence: 0.4,
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

fn certain(intent: Intent) -> ClassifyResult {
    ClassifyResult {
        intent,
        entities: Entities::default(),
        confidence: 0.95,
    }
}

fn unknown() -> ClassifyResult {
    ClassifyResult {
        intent: Intent::Unknown,
        entities: Entities::default(),
        confidence: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_sku_routes_to_product_detail() {
        let result = classify("sku00010");
        assert_eq!(result.intent, Intent::ProductDetail);
        assert_eq!(result.entities.sku.as_deref(), Some("SKU00010"));
    }

    #[test]
    fn cutting_metal_query_routes_to_product_search() {
        let result = classify("busco algo para cortar metal");
        assert_eq!(result.intent, Intent::ProductSearch);
        assert_eq!(result.entities.keywords.as_deref(), Some("busco algo para cortar metal"));
    }

    #[test]
    fn greeting_is_recognized() {
        assert_eq!(classify("hola!").intent, Intent::Greeting);
    }
}
