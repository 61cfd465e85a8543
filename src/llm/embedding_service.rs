// src/llm/embedding_service.rs
// EmbeddingService: thin wrapper producing a vector for arbitrary text via
// the LLMClient, caching per query hash (spec 2).

use std::sync::Arc;

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::llm::ArcEmbeddingProvider;

pub struct EmbeddingService {
    provider: ArcEmbeddingProvider,
    cache: DashMap<[u8; 32], Vec<f32>>,
}

impl EmbeddingService {
    pub fn new(provider: ArcEmbeddingProvider) -> Self {
        Self {
            provider,
            cache: DashMap::new(),
        }
    }

    fn hash_query(text: &str) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(text.trim().to_lowercase().as_bytes());
        hasher.finalize().into()
    }

    pub async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let key = Self::hash_query(text);
        if let Some(cached) = self.cache.get(&key) {
            debug!("embedding cache hit");
            return Ok(cached.clone());
        }

        let vector = self.provider.embed(text).await?;
        self.cache.insert(key, vector.clone());
        Ok(vector)
    }

    pub fn dimensions(&self) -> usize {
        self.provider.dimensions()
    }
}

pub type ArcEmbeddingService = Arc<EmbeddingService>;

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl crate::llm::EmbeddingProvider for CountingProvider {
        async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![text.len() as f32])
        }

        fn dimensions(&self) -> usize {
            1
        }
    }

    #[tokio::test]
    async fn repeated_queries_hit_the_cache() {
        let provider = Arc::new(CountingProvider { calls: AtomicUsize::new(0) });
        let service = EmbeddingService::new(provider.clone());

        service.embed("taladros").await.unwrap();
        service.embed("taladros").await.unwrap();
        service.embed("Taladros").await.unwrap(); // case-insensitive hash

        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        service.embed("martillos").await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }
}
