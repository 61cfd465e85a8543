// src/analyzer/mod.rs
// AIAnalyzer: produces a validated (intent, entities) tuple from a chat
// message and the recent-context window (spec 2, 4.4).

pub mod fallback;
pub mod slash;

use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::llm::{ArcIntentClassifier, ClassifyResult, Message};
use crate::llm::prompts::MESSAGE_ANALYZER_V1;

pub struct AIAnalyzer {
    classifier: ArcIntentClassifier,
    /// Confidence below which a short message gets a clarifying question
    /// instead of being acted on (spec 4.3 "Confidence policy").
    pub min_confidence: f32,
}

/// A product shown in the last listing, used to build positional context
/// for the classifier prompt (spec 4.4 step 2).
pub struct RecentProduct<'a> {
    pub sku: &'a str,
    pub name: &'a str,
}

impl AIAnalyzer {
    pub fn new(classifier: ArcIntentClassifier, min_confidence: f32) -> Self {
        Self { classifier, min_confidence }
    }

    pub async fn analyze(
        &self,
        text: &str,
        history: &[Message],
        recent_products: &[RecentProduct<'_>],
    ) -> ClassifyResult {
        if let Some(cmd) = slash::parse(text) {
            return ClassifyResult { intent: cmd.intent, entities: normalize(cmd.entities), confidence: 1.0 };
        }

        let user_turn = build_user_turn(text, recent_products);
        let mut messages: Vec<Message> = history.to_vec();
        messages.push(Message::user(user_turn));

        match self.classify_with_retry(&messages).await {
            Some(mut result) => {
                result.entities = normalize(result.entities);
                result
            }
            None => {
                warn!("LLM classification unavailable, falling back to keyword fingerprinting");
                let mut result = fallback::classify(text);
                result.entities = normalize(result.entities);
                result
            }
        }
    }

    /// Whether the orchestrator should ask a clarifying question instead of
    /// acting on `result` (spec 4.3).
    pub fn needs_clarification(&self, result: &ClassifyResult, text: &str) -> bool {
        result.confidence < self.min_confidence && text.trim().split_whitespace().count() <= 3
    }

    async fn classify_with_retry(&self, messages: &[Message]) -> Option<ClassifyResult> {
        match self.classifier.classify(messages, MESSAGE_ANALYZER_V1).await {
            Ok(result) => return Some(result),
            Err(e) => warn!("classification attempt 1 failed: {}", e),
        }

        let jitter_ms = rand::rng().random_range(100..400);
        tokio::time::sleep(Duration::from_millis(jitter_ms)).await;

        match self.classifier.classify(messages, MESSAGE_ANALYZER_V1).await {
            Ok(result) => Some(result),
            Err(e) => {
                warn!("classification attempt 2 failed: {}", e);
                None
            }
        }
    }
}

fn build_user_turn(text: &str, recent_products: &[RecentProduct<'_>]) -> String {
    if recent_products.is_empty() {
        return text.to_string();
    }

    let mut listing = String::from("\n\nÚltima lista mostrada (para referencias posicionales):\n");
    for (i, product) in recent_products.iter().enumerate() {
        listing.push_str(&format!("{}. {} ({})\n", i + 1, product.name, product.sku));
    }

    format!("{}{}", text, listing)
}

/// Coerce numeric fields, clamp quantity >= 1, uppercase SKU (spec 4.4 step 5).
fn normalize(mut entities: crate::llm::Entities) -> crate::llm::Entities {
    entities.sku = entities.sku.map(|s| s.trim().to_uppercase());
    entities.quantity = entities.quantity.map(|q| q.max(1));
    entities
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ClassifyResult, Entities, IntentClassifier};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct AlwaysFails;

    #[async_trait]
    impl IntentClassifier for AlwaysFails {
        async fn classify(&self, _messages: &[Message], _system: &str) -> anyhow::Result<ClassifyResult> {
            Err(anyhow::anyhow!("simulated transport error"))
        }
    }

    #[tokio::test]
    async fn llm_outage_falls_back_to_slash_command() {
        let analyzer = AIAnalyzer::new(Arc::new(AlwaysFails), 0.5);
        let result = analyzer.analyze("/agregar SKU00010 1", &[], &[]).await;
        assert_eq!(result.intent, crate::llm::Intent::AddToCart);
        assert_eq!(result.entities.sku.as_deref(), Some("SKU00010"));
    }

    #[tokio::test]
    async fn llm_outage_falls_back_to_keyword_product_search() {
        let analyzer = AIAnalyzer::new(Arc::new(AlwaysFails), 0.5);
        let result = analyzer.analyze("busco algo para cortar metal", &[], &[]).await;
        assert_eq!(result.intent, crate::llm::Intent::ProductSearch);
    }

    struct FixedResult(ClassifyResult);

    #[async_trait]
    impl IntentClassifier for FixedResult {
        async fn classify(&self, _messages: &[Message], _system: &str) -> anyhow::Result<ClassifyResult> {
            Ok(ClassifyResult {
                intent: self.0.intent,
                entities: self.0.entities.clone(),
                confidence: self.0.confidence,
            })
        }
    }

    #[tokio::test]
    async fn entities_are_normalized() {
        let analyzer = AIAnalyzer::new(
            Arc::new(FixedResult(ClassifyResult {
                intent: crate::llm::Intent::AddToCart,
                entities: Entities { sku: Some("sku00010".into()), quantity: Some(-3), ..Default::default() },
                confidence: 0.95,
            })),
            0.5,
        );
        let result = analyzer.analyze("agrega ese", &[], &[]).await;
        assert_eq!(result.entities.sku.as_deref(), Some("SKU00010"));
        assert_eq!(result.entities.quantity, Some(1));
    }

    #[test]
    fn short_low_confidence_messages_need_clarification() {
        let analyzer = AIAnalyzer::new(Arc::new(AlwaysFails), 0.5);
        let result = ClassifyResult { intent: crate::llm::Intent::Unknown, entities: Entities::default(), confidence: 0.2 };
        assert!(analyzer.needs_clarification(&result, "eso"));
        assert!(!analyzer.needs_clarification(&result, "eso tambien por favor gracias"));
    }
}
