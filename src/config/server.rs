// src/config/server.rs
// Server, database, and logging configuration

use serde::{Deserialize, Serialize};

use super::helpers::{env_or, env_parsed, require_env};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Per-request deadline applied to the whole orchestrator call (spec 5).
    pub request_deadline_secs: u64,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            host: env_or("HOST", "0.0.0.0"),
            port: env_parsed("PORT", 8080),
            request_deadline_secs: env_parsed("REQUEST_DEADLINE_SECS", 30),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn from_env() -> Self {
        Self {
            url: env_or("DATABASE_URL", "sqlite://data/storefront.db"),
            max_connections: env_parsed("SQLITE_MAX_CONNECTIONS", 10),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self {
            level: env_or("LOG_LEVEL", "info"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub shared_secret: String,
    pub bot_token: String,
}

impl WebhookConfig {
    pub fn from_env() -> Self {
        Self {
            shared_secret: require_env("WEBHOOK_SHARED_SECRET"),
            bot_token: env_or("CHAT_BOT_TOKEN", ""),
        }
    }
}
