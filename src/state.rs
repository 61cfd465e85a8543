// src/state.rs
// Application state shared across HTTP handlers.

use std::sync::Arc;

use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::info;

use crate::analyzer::AIAnalyzer;
use crate::catalog::store::CatalogStore;
use crate::config::CONFIG;
use crate::handlers::{CartHandler, CheckoutHandler, ProductHandler};
use crate::invoice::InvoiceDispatcher;
use crate::llm::embedding_service::EmbeddingService;
use crate::llm::provider::HttpLlmClient;
use crate::orchestrator::http_transport::HttpChatTransport;
use crate::orchestrator::transport::ChatTransport;
use crate::orchestrator::Orchestrator;
use crate::session::{InMemorySessionStore, SessionStore};
use crate::vector::{QdrantProductIndex, VectorIndex};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub vector_index: Arc<dyn VectorIndex>,
    pub orchestrator: Arc<Orchestrator>,
    pub invoices: InvoiceDispatcher,
}

impl AppState {
    pub async fn new() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(CONFIG.database.max_connections)
            .connect(&CONFIG.database.url)
            .await?;

        info!("running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;

        let catalog = Arc::new(CatalogStore::new(pool));

        let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());

        info!(url = %CONFIG.vector.url, "connecting to vector index");
        let vector_index: Arc<dyn VectorIndex> = Arc::new(
            QdrantProductIndex::new(&CONFIG.vector.url, &CONFIG.vector.collection, CONFIG.vector.dimension).await?,
        );

        let llm_client = Arc::new(HttpLlmClient::new(
            CONFIG.llm.api_key.clone(),
            CONFIG.llm.base_url.clone(),
            CONFIG.llm.classify_model.clone(),
            CONFIG.llm.embedding_model.clone(),
            CONFIG.llm.embedding_dim,
            std::time::Duration::from_secs(CONFIG.llm.request_timeout_secs),
        ));

        let embeddings = Arc::new(EmbeddingService::new(llm_client.clone()));
        let analyzer = AIAnalyzer::new(llm_client.clone(), CONFIG.llm.min_confidence);

        let product = ProductHandler::new(catalog.clone(), vector_index.clone(), embeddings, sessions.clone(), llm_client);
        let cart = CartHandler::new(catalog.clone(), sessions.clone());

        info!("starting invoice dispatcher");
        let invoices = InvoiceDispatcher::spawn(catalog.clone(), &CONFIG.email)?;

        let checkout = CheckoutHandler::new(catalog.clone(), sessions.clone(), Arc::new(invoices.clone()));

        let transport: Arc<dyn ChatTransport> = Arc::new(HttpChatTransport::new(&CONFIG.webhook.bot_token));

        let orchestrator = Arc::new(Orchestrator::new(
            catalog.clone(),
            sessions.clone(),
            analyzer,
            product,
            cart,
            checkout,
            transport,
        ));

        info!("application state initialized");

        Ok(Self { catalog, sessions, vector_index, orchestrator, invoices })
    }
}
