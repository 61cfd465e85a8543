// src/llm/mod.rs
// LLMClient contract: intent/entity classification and text embeddings
// (spec 2, 4.3), plus the thin embedding cache wrapper (spec 2
// EmbeddingService).

pub mod embedding_service;
pub mod json_extract;
pub mod prompts;
pub mod provider;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One turn of the last-N-turns window handed to the classifier (spec 4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".into(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".into(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".into(), content: content.into() }
    }
}

/// Closed set of intents recognized by the analyzer (spec 4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    ProductSearch,
    ProductDetail,
    AddToCart,
    UpdateQuantity,
    RemoveFromCart,
    ViewCart,
    ClearCart,
    CheckoutStart,
    CheckoutAnswer,
    TechnicalQuestion,
    Greeting,
    Help,
    Unknown,
}

impl Intent {
    /// Intents that are treated as an interruption of an in-progress
    /// checkout dialog (spec 4.7 "Interruption policy").
    pub fn is_checkout_interruption(&self) -> bool {
        matches!(
            self,
            Intent::ProductSearch | Intent::ProductDetail | Intent::TechnicalQuestion | Intent::ViewCart
        )
    }
}

/// A SKU-or-position reference, used across product/cart intents (spec 4.3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductRef {
    Sku(String),
    Position(i64),
}

/// Entities extracted alongside the intent. Not every field applies to
/// every intent; unused fields stay `None` (spec 4.3 "Entities per intent").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Entities {
    pub keywords: Option<String>,
    pub sku: Option<String>,
    pub position: Option<i64>,
    pub quantity: Option<i64>,
    pub value: Option<String>,
    pub question: Option<String>,
}

impl Entities {
    /// Tie-break rule: if both `sku` and `position` are present, `sku`
    /// wins (spec 4.4).
    pub fn product_ref(&self) -> Option<ProductRef> {
        if let Some(sku) = &self.sku {
            return Some(ProductRef::Sku(sku.clone()));
        }
        self.position.map(ProductRef::Position)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyResult {
    pub intent: Intent,
    pub entities: Entities,
    pub confidence: f32,
}

#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, messages: &[Message], system_prompt: &str) -> anyhow::Result<ClassifyResult>;
}

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
    fn dimensions(&self) -> usize;
}

/// Free-text completion grounded in a supplied context, used only by
/// `ProductHandler::answer_technical` (spec 4.5) — distinct from
/// `IntentClassifier` because its output isn't an (intent, entities) tuple.
#[async_trait]
pub trait GroundedAnswerer: Send + Sync {
    async fn answer(&self, system_prompt: &str, question: &str) -> anyhow::Result<String>;
}

pub type ArcIntentClassifier = Arc<dyn IntentClassifier>;
pub type ArcEmbeddingProvider = Arc<dyn EmbeddingProvider>;
pub type ArcGroundedAnswerer = Arc<dyn GroundedAnswerer>;
