// src/config/llm.rs
// LLM provider and embedding configuration

use serde::{Deserialize, Serialize};

use super::helpers::{env_or, env_parsed, require_env};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub classify_model: String,
    pub embedding_model: String,
    pub embedding_dim: usize,
    pub request_timeout_secs: u64,
    /// Confidence below which the orchestrator asks a clarifying question
    /// instead of acting, for short messages (spec 4.3).
    pub min_confidence: f32,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: require_env("LLM_API_KEY"),
            base_url: env_or("LLM_BASE_URL", "https://api.openai.com/v1"),
            classify_model: env_or("LLM_CLASSIFY_MODEL", "gpt-4o-mini"),
            embedding_model: env_or("LLM_EMBEDDING_MODEL", "text-embedding-3-small"),
            embedding_dim: env_parsed("LLM_EMBEDDING_DIM", 1536),
            request_timeout_secs: env_parsed("LLM_TIMEOUT_SECS", 10),
            min_confidence: env_parsed("LLM_MIN_CONFIDENCE", 0.5),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorConfig {
    pub url: String,
    pub collection: String,
    pub dimension: u64,
    pub top_k: usize,
    pub score_threshold: f32,
}

impl VectorConfig {
    pub fn from_env() -> Self {
        Self {
            url: env_or("QDRANT_URL", "http://localhost:6334"),
            collection: env_or("QDRANT_COLLECTION", "storefront_products"),
            dimension: env_parsed("QDRANT_DIMENSION", 1536),
            top_k: env_parsed("PRODUCT_SEARCH_TOP_K", 5),
            score_threshold: env_parsed("PRODUCT_SEARCH_SCORE_THRESHOLD", 0.6),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: String,
    pub smtp_password: String,
    pub from_address: String,
}

impl EmailConfig {
    pub fn from_env() -> Self {
        Self {
            smtp_host: env_or("SMTP_HOST", "localhost"),
            smtp_port: env_parsed("SMTP_PORT", 587),
            smtp_user: env_or("SMTP_USER", ""),
            smtp_password: env_or("SMTP_PASSWORD", ""),
            from_address: env_or("INVOICE_FROM_ADDRESS", "ventas@example.com"),
        }
    }
}
