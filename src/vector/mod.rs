// src/vector/mod.rs
// VectorIndex: fixed-dimension embedding search over product records (spec
// 2, 4.2), a single-collection specialization of the teacher's
// QdrantMultiStore.

use anyhow::Context;
use async_trait::async_trait;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, ScoredPoint, SearchPointsBuilder,
    UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};

/// Payload carried alongside each point (spec 3 VectorPoint, spec 6
/// "Vector collection").
#[derive(Debug, Clone, Default)]
pub struct ProductPayload {
    pub name: String,
    pub brand: String,
    pub category: String,
    pub marketing_text: String,
}

#[derive(Debug, Clone)]
pub struct ScoredSku {
    pub sku: String,
    pub score: f32,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn upsert(&self, sku: &str, vector: Vec<f32>, payload: ProductPayload) -> AppResult<()>;

    /// Results sorted descending by cosine similarity, already filtered to
    /// `score_threshold` (spec 4.2).
    async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
        score_threshold: f32,
    ) -> AppResult<Vec<ScoredSku>>;

    async fn health_check(&self) -> bool;
}

pub struct QdrantProductIndex {
    client: Qdrant,
    collection: String,
}

impl QdrantProductIndex {
    pub async fn new(url: &str, collection: &str, dimension: u64) -> anyhow::Result<Self> {
        let client = Qdrant::from_url(url)
            .skip_compatibility_check()
            .build()
            .context("failed to connect to Qdrant")?;

        let store = Self {
            client,
            collection: collection.to_string(),
        };
        store.ensure_collection(dimension).await?;
        Ok(store)
    }

    async fn ensure_collection(&self, dimension: u64) -> anyhow::Result<()> {
        let exists = self.client.collection_exists(&self.collection).await?;
        if exists {
            return Ok(());
        }

        info!(collection = %self.collection, "creating Qdrant collection");
        match self
            .client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(VectorParamsBuilder::new(dimension, Distance::Cosine)),
            )
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.to_string().contains("already exists") => {
                debug!(collection = %self.collection, "collection created by another process, ignoring");
                Ok(())
            }
            Err(e) => Err(e).context("failed to create collection"),
        }
    }

    fn point_id(sku: &str) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        sku.hash(&mut hasher);
        hasher.finish()
    }
}

#[async_trait]
impl VectorIndex for QdrantProductIndex {
    async fn upsert(&self, sku: &str, vector: Vec<f32>, payload: ProductPayload) -> AppResult<()> {
        let mut point_payload: HashMap<String, QdrantValue> = HashMap::new();
        point_payload.insert("sku".to_string(), sku.to_string().into());
        point_payload.insert("name".to_string(), payload.name.into());
        point_payload.insert("brand".to_string(), payload.brand.into());
        point_payload.insert("category".to_string(), payload.category.into());
        point_payload.insert("marketing_text".to_string(), payload.marketing_text.into());

        let point = PointStruct::new(Self::point_id(sku), vector, point_payload);

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, vec![point]).wait(true))
            .await
            .map_err(|e| AppError::transient(format!("qdrant upsert failed: {}", e)))?;

        Ok(())
    }

    async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
        score_threshold: f32,
    ) -> AppResult<Vec<ScoredSku>> {
        let results = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, vector.to_vec(), top_k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(|e| AppError::transient(format!("qdrant search failed: {}", e)))?;

        Ok(results
            .result
            .into_iter()
            .filter(|p| p.score >= score_threshold)
            .filter_map(point_to_scored_sku)
            .collect())
    }

    async fn health_check(&self) -> bool {
        match self.client.collection_exists(&self.collection).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!("qdrant health check failed: {}", e);
                false
            }
        }
    }
}

fn point_to_scored_sku(point: ScoredPoint) -> Option<ScoredSku> {
    let sku = point
        .payload
        .get("sku")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    match sku {
        Some(sku) => Some(ScoredSku {
            sku,
            score: point.score,
        }),
        None => {
            warn!("qdrant point with no sku payload, dropping");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_id_is_stable_for_the_same_sku() {
        assert_eq!(
            QdrantProductIndex::point_id("SKU00010"),
            QdrantProductIndex::point_id("SKU00010")
        );
        assert_ne!(
            QdrantProductIndex::point_id("SKU00010"),
            QdrantProductIndex::point_id("SKU00011")
        );
    }
}
