// src/llm/provider.rs
// HTTP-backed LLMClient: a chat-completion endpoint for classification
// (JSON mode) and an embeddings endpoint, both OpenAI-compatible (spec 4.3,
// 6 "LLM provider"). Grounded in the teacher's `OpenAIEmbeddingProvider`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

use crate::llm::json_extract::extract_json_from_response;
use crate::llm::{ClassifyResult, EmbeddingProvider, Entities, GroundedAnswerer, Intent, IntentClassifier, Message};

pub struct HttpLlmClient {
    api_key: String,
    base_url: String,
    classify_model: String,
    embedding_model: String,
    embedding_dim: usize,
    client: reqwest::Client,
}

impl HttpLlmClient {
    pub fn new(
        api_key: String,
        base_url: String,
        classify_model: String,
        embedding_model: String,
        embedding_dim: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            api_key,
            base_url,
            classify_model,
            embedding_model,
            embedding_dim,
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("failed to build reqwest client"),
        }
    }
}

#[derive(Deserialize)]
struct ParsedClassification {
    intent: String,
    entities: Entities,
    confidence: f32,
}

fn parse_intent(raw: &str) -> Intent {
    match raw {
        "product_search" => Intent::ProductSearch,
        "product_detail" => Intent::ProductDetail,
        "add_to_cart" => Intent::AddToCart,
        "update_quantity" => Intent::UpdateQuantity,
        "remove_from_cart" => Intent::RemoveFromCart,
        "view_cart" => Intent::ViewCart,
        "clear_cart" => Intent::ClearCart,
        "checkout_start" => Intent::CheckoutStart,
        "checkout_answer" => Intent::CheckoutAnswer,
        "technical_question" => Intent::TechnicalQuestion,
        "greeting" => Intent::Greeting,
        "help" => Intent::Help,
        _ => Intent::Unknown,
    }
}

#[async_trait]
impl IntentClassifier for HttpLlmClient {
    async fn classify(&self, messages: &[Message], system_prompt: &str) -> anyhow::Result<ClassifyResult> {
        let payload = json!({
            "model": self.classify_model,
            "response_format": {"type": "json_object"},
            "messages": std::iter::once(json!({"role": "system", "content": system_prompt}))
                .chain(messages.iter().map(|m| json!({"role": m.role, "content": m.content})))
                .collect::<Vec<_>>(),
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;

        let body: serde_json::Value = response.json().await?;
        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("chat-completion response had no message content"))?;

        let json_str = extract_json_from_response(content)?;
        let parsed: ParsedClassification = serde_json::from_str(&json_str)
            .map_err(|e| anyhow::anyhow!("malformed classification JSON: {}", e))?;

        debug!(intent = %parsed.intent, confidence = parsed.confidence, "classified message");

        Ok(ClassifyResult {
            intent: parse_intent(&parsed.intent),
            entities: parsed.entities,
            confidence: parsed.confidence,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for HttpLlmClient {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.embedding_model,
                "input": text,
                "dimensions": self.embedding_dim,
            }))
            .send()
            .await?
            .error_for_status()?;

        let body: serde_json::Value = response.json().await?;
        let embedding = body["data"][0]["embedding"]
            .as_array()
            .ok_or_else(|| anyhow::anyhow!("embedding response missing data[0].embedding"))?
            .iter()
            .filter_map(|v| v.as_f64().map(|f| f as f32))
            .collect::<Vec<_>>();

        if embedding.len() != self.embedding_dim {
            warn!(
                expected = self.embedding_dim,
                got = embedding.len(),
                "embedding provider returned unexpected dimension"
            );
        }

        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.embedding_dim
    }
}

#[async_trait]
impl GroundedAnswerer for HttpLlmClient {
    async fn answer(&self, system_prompt: &str, question: &str) -> anyhow::Result<String> {
        let payload = json!({
            "model": self.classify_model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": question},
            ],
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;

        let body: serde_json::Value = response.json().await?;
        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("chat-completion response had no message content"))?;

        Ok(content.trim().to_string())
    }
}
