// src/handlers/product.rs
// ProductHandler: resolves queries to product lists via VectorIndex +
// CatalogStore, and resolves positional references against the session's
// recent-products list (spec 4.5).

use std::sync::Arc;

use tracing::debug;

use crate::catalog::store::CatalogStore;
use crate::catalog::models::Product;
use crate::error::{AppError, AppResult};
use crate::llm::embedding_service::ArcEmbeddingService;
use crate::llm::{ArcGroundedAnswerer, ProductRef};
use crate::llm::prompts::TECHNICAL_ANSWER_V1;
use crate::session::{ChatId, SessionStore};
use crate::vector::VectorIndex;

const K_SHOWN: usize = 3;
const K_MAIN: usize = 5;
const SCORE_THRESHOLD: f32 = 0.6;
const RELATED_TOP_K: usize = 5;
const RELATED_SCORE_THRESHOLD: f32 = 0.45;

pub struct ShownProduct {
    pub position: usize,
    pub product: Product,
}

pub struct ShownList {
    pub items: Vec<ShownProduct>,
    /// `true` when this came from the lowered-threshold related fallback
    /// rather than a direct hit (spec 4.5 `related_fallback`).
    pub is_related_fallback: bool,
}

pub struct Detail {
    pub product: Product,
}

pub struct ProductHandler {
    catalog: Arc<CatalogStore>,
    vector_index: Arc<dyn VectorIndex>,
    embeddings: ArcEmbeddingService,
    sessions: Arc<dyn SessionStore>,
    answerer: ArcGroundedAnswerer,
}

impl ProductHandler {
    pub fn new(
        catalog: Arc<CatalogStore>,
        vector_index: Arc<dyn VectorIndex>,
        embeddings: ArcEmbeddingService,
        sessions: Arc<dyn SessionStore>,
        answerer: ArcGroundedAnswerer,
    ) -> Self {
        Self { catalog, vector_index, embeddings, sessions, answerer }
    }

    /// spec 4.5 `search`.
    pub async fn search(&self, chat_id: ChatId, keywords: &str) -> AppResult<ShownList> {
        let shown = self.run_search(chat_id, keywords, K_MAIN, SCORE_THRESHOLD).await?;
        if !shown.items.is_empty() {
            return Ok(shown);
        }
        self.related_fallback(chat_id, keywords).await
    }

    /// spec 4.5 `related_fallback`: lowered threshold, wider top_k. Returns
    /// an empty `ShownList` (the "no matches" sentinel) if still nothing.
    pub async fn related_fallback(&self, chat_id: ChatId, keywords: &str) -> AppResult<ShownList> {
        let mut shown = self.run_search(chat_id, keywords, RELATED_TOP_K, RELATED_SCORE_THRESHOLD).await?;
        shown.is_related_fallback = true;
        Ok(shown)
    }

    async fn run_search(&self, chat_id: ChatId, keywords: &str, top_k: usize, threshold: f32) -> AppResult<ShownList> {
        let vector = self
            .embeddings
            .embed(keywords)
            .await
            .map_err(|e| AppError::transient(format!("embedding failed: {}", e)))?;

        let hits = self.vector_index.search(&vector, top_k, threshold).await?;
        let skus: Vec<String> = hits.into_iter().map(|h| h.sku).collect();

        let products = self.catalog.find_products(&skus).await?;

        // Recent-products list holds every resolved SKU (up to K_MAIN), in
        // search-result order, even though only K_SHOWN are presented
        // (spec 4.5: "truncate to K_shown... store full ordered list... as
        // recent_products").
        let ordered_skus: Vec<String> = products.iter().map(|p| p.sku.clone()).collect();
        self.sessions.set_recent_products(chat_id, ordered_skus).await?;

        let items = products
            .into_iter()
            .take(K_SHOWN)
            .enumerate()
            .map(|(i, product)| ShownProduct { position: i + 1, product })
            .collect();

        Ok(ShownList { items, is_related_fallback: false })
    }

    /// spec 4.5 `detail`.
    pub async fn detail(&self, chat_id: ChatId, product_ref: &ProductRef) -> AppResult<Detail> {
        let sku = self.resolve_sku(chat_id, product_ref).await?;
        let product = self
            .catalog
            .find_product(&sku)
            .await?
            .ok_or_else(|| AppError::not_found(format!("no encuentro el producto {}", sku)))?;
        Ok(Detail { product })
    }

    /// spec 4.5 `answer_technical`.
    pub async fn answer_technical(&self, chat_id: ChatId, product_ref: &ProductRef, question: &str) -> AppResult<String> {
        let sku = self.resolve_sku(chat_id, product_ref).await?;
        let product = self
            .catalog
            .find_product(&sku)
            .await?
            .ok_or_else(|| AppError::not_found(format!("no encuentro el producto {}", sku)))?;

        let specs: String = product
            .specs
            .iter()
            .map(|(k, v)| format!("- {}: {}", k, v))
            .collect::<Vec<_>>()
            .join("\n");

        let grounding = format!(
            "Producto: {}\nDescripción: {}\nEspecificaciones:\n{}\n\nPregunta: {}",
            product.name, product.description, specs, question
        );

        match self.answerer.answer(TECHNICAL_ANSWER_V1, &grounding).await {
            Ok(answer) => Ok(answer),
            Err(e) => {
                debug!(sku = %sku, error = %e, "grounded technical answer failed, using default reply");
                Ok(default_uncertain_answer())
            }
        }
    }

    async fn resolve_sku(&self, chat_id: ChatId, product_ref: &ProductRef) -> AppResult<String> {
        match product_ref {
            ProductRef::Sku(sku) => Ok(sku.clone()),
            ProductRef::Position(position) => {
                let recent = self.sessions.get_recent_products(chat_id).await?;
                let index = usize::try_from(*position - 1).ok();
                match index.and_then(|i| recent.get(i)) {
                    Some(sku) => Ok(sku.clone()),
                    None => Err(AppError::not_found(format!(
                        "No veo el elemento {} en la última lista.",
                        position
                    ))),
                }
            }
        }
    }
}

fn default_uncertain_answer() -> String {
    "No puedo confirmar eso con la ficha técnica, por favor contacta a ventas.".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn k_shown_truncates_a_wider_k_main_list() {
        assert!(K_SHOWN < K_MAIN);
    }
}
