// src/config/mod.rs
// Central configuration for the storefront concierge backend

pub mod helpers;
pub mod llm;
pub mod server;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

/// Main configuration structure - composes all domain configs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: server::ServerConfig,
    pub database: server::DatabaseConfig,
    pub logging: server::LoggingConfig,
    pub webhook: server::WebhookConfig,
    pub llm: llm::LlmConfig,
    pub vector: llm::VectorConfig,
    pub email: llm::EmailConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            server: server::ServerConfig::from_env(),
            database: server::DatabaseConfig::from_env(),
            logging: server::LoggingConfig::from_env(),
            webhook: server::WebhookConfig::from_env(),
            llm: llm::LlmConfig::from_env(),
            vector: llm::VectorConfig::from_env(),
            email: llm::EmailConfig::from_env(),
        }
    }

    pub fn bind_address(&self) -> String {
        self.server.bind_address()
    }
}
