// src/session/store.rs
// SessionStore: fast key/value interface over cart, conversation context and
// idempotency markers, namespaced per chat id (spec 4.1).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::session::models::{CartItem, ChatId, CheckoutDraft, CheckoutState, ConversationContext};

const SEEN_UPDATE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get_cart(&self, chat_id: ChatId) -> AppResult<Vec<CartItem>>;
    async fn set_cart(&self, chat_id: ChatId, cart: Vec<CartItem>) -> AppResult<()>;
    async fn clear_cart(&self, chat_id: ChatId) -> AppResult<()>;

    async fn set_recent_products(&self, chat_id: ChatId, skus: Vec<String>) -> AppResult<()>;
    async fn get_recent_products(&self, chat_id: ChatId) -> AppResult<Vec<String>>;

    async fn get_checkout_state(&self, chat_id: ChatId) -> AppResult<(CheckoutState, CheckoutDraft)>;
    async fn set_checkout_state(
        &self,
        chat_id: ChatId,
        state: CheckoutState,
        draft: CheckoutDraft,
    ) -> AppResult<()>;
    async fn clear_checkout_state(&self, chat_id: ChatId) -> AppResult<()>;

    /// Returns true iff `update_id` had not been seen before (spec 4.1,
    /// idempotency window >= 24h).
    async fn mark_update_seen(&self, update_id: i64) -> AppResult<bool>;

    /// Acquire the per-chat-id lock that serializes orchestrator dispatch
    /// for this chat (spec 5). Held for the duration of one update's
    /// handling, including any LLM calls made within it.
    async fn lock_chat(&self, chat_id: ChatId) -> OwnedMutexGuard<()>;
}

/// In-process stand-in for "a fast key/value store" (spec 2 SessionStore).
/// Swapping in Redis later only changes this impl, not callers, since the
/// trait above is the only thing handlers depend on.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<ChatId, ConversationContext>>,
    carts: RwLock<HashMap<ChatId, Vec<CartItem>>>,
    chat_locks: DashMap<ChatId, Arc<Mutex<()>>>,
    seen_updates: RwLock<HashMap<i64, Instant>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sweep_seen_updates(map: &mut HashMap<i64, Instant>) {
        let now = Instant::now();
        map.retain(|_, seen_at| now.duration_since(*seen_at) < SEEN_UPDATE_TTL);
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_cart(&self, chat_id: ChatId) -> AppResult<Vec<CartItem>> {
        let carts = self.carts.read().await;
        Ok(carts.get(&chat_id).cloned().unwrap_or_default())
    }

    async fn set_cart(&self, chat_id: ChatId, cart: Vec<CartItem>) -> AppResult<()> {
        let mut carts = self.carts.write().await;
        carts.insert(chat_id, cart);
        Ok(())
    }

    async fn clear_cart(&self, chat_id: ChatId) -> AppResult<()> {
        let mut carts = self.carts.write().await;
        carts.remove(&chat_id);
        Ok(())
    }

    async fn set_recent_products(&self, chat_id: ChatId, skus: Vec<String>) -> AppResult<()> {
        let mut sessions = self.sessions.write().await;
        sessions.entry(chat_id).or_default().recent_products = skus;
        Ok(())
    }

    async fn get_recent_products(&self, chat_id: ChatId) -> AppResult<Vec<String>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(&chat_id)
            .map(|ctx| ctx.recent_products.clone())
            .unwrap_or_default())
    }

    async fn get_checkout_state(&self, chat_id: ChatId) -> AppResult<(CheckoutState, CheckoutDraft)> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(&chat_id)
            .map(|ctx| (ctx.checkout_state, ctx.draft.clone()))
            .unwrap_or_default())
    }

    async fn set_checkout_state(
        &self,
        chat_id: ChatId,
        state: CheckoutState,
        draft: CheckoutDraft,
    ) -> AppResult<()> {
        let mut sessions = self.sessions.write().await;
        let ctx = sessions.entry(chat_id).or_default();
        ctx.checkout_state = state;
        ctx.draft = draft;
        Ok(())
    }

    async fn clear_checkout_state(&self, chat_id: ChatId) -> AppResult<()> {
        let mut sessions = self.sessions.write().await;
        let ctx = sessions.entry(chat_id).or_default();
        ctx.checkout_state = CheckoutState::None;
        ctx.draft = CheckoutDraft::default();
        Ok(())
    }

    async fn mark_update_seen(&self, update_id: i64) -> AppResult<bool> {
        let mut seen = self.seen_updates.write().await;
        Self::sweep_seen_updates(&mut seen);

        if seen.contains_key(&update_id) {
            debug!(update_id, "duplicate webhook update, dropping");
            return Ok(false);
        }

        seen.insert(update_id, Instant::now());
        Ok(true)
    }

    async fn lock_chat(&self, chat_id: ChatId) -> OwnedMutexGuard<()> {
        let mutex = self
            .chat_locks
            .entry(chat_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }
}

/// `SessionUnavailable` is only ever produced by a remote-backed
/// implementation of this trait (e.g. a Redis client); the in-memory store
/// above cannot fail. Kept here so callers have one place to reference the
/// error variant's construction (spec 4.1 "Failure").
pub fn unavailable(detail: impl Into<String>) -> AppError {
    AppError::SessionUnavailable(detail.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn cart_roundtrips_through_the_store() {
        let store = InMemorySessionStore::new();
        assert!(store.get_cart(1).await.unwrap().is_empty());

        let cart = vec![CartItem {
            sku: "SKU00010".into(),
            quantity: 2,
            unit_price: dec!(45.00),
        }];
        store.set_cart(1, cart.clone()).await.unwrap();
        assert_eq!(store.get_cart(1).await.unwrap(), cart);

        store.clear_cart(1).await.unwrap();
        assert!(store.get_cart(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn recent_products_are_replaced_atomically() {
        let store = InMemorySessionStore::new();
        store
            .set_recent_products(7, vec!["A".into(), "B".into(), "C".into()])
            .await
            .unwrap();
        assert_eq!(
            store.get_recent_products(7).await.unwrap(),
            vec!["A".to_string(), "B".to_string(), "C".to_string()]
        );

        store.set_recent_products(7, vec!["D".into()]).await.unwrap();
        assert_eq!(store.get_recent_products(7).await.unwrap(), vec!["D".to_string()]);
    }

    #[tokio::test]
    async fn duplicate_update_ids_are_dropped() {
        let store = InMemorySessionStore::new();
        assert!(store.mark_update_seen(42).await.unwrap());
        assert!(!store.mark_update_seen(42).await.unwrap());
        assert!(store.mark_update_seen(43).await.unwrap());
    }

    #[tokio::test]
    async fn checkout_state_is_preserved_across_interruption() {
        let store = InMemorySessionStore::new();
        let mut draft = CheckoutDraft::default();
        draft.address = "1 Main St".into();
        store
            .set_checkout_state(5, CheckoutState::AskAddress, draft.clone())
            .await
            .unwrap();

        // simulate an interruption that doesn't touch checkout state
        let (state, read_draft) = store.get_checkout_state(5).await.unwrap();
        assert_eq!(state, CheckoutState::AskAddress);
        assert_eq!(read_draft.address, "1 Main St");
    }

    #[tokio::test]
    async fn per_chat_lock_serializes_access() {
        let store = Arc::new(InMemorySessionStore::new());
        let guard = store.lock_chat(1).await;
        let store2 = store.clone();
        let handle = tokio::spawn(async move {
            let _g = store2.lock_chat(1).await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished());
        drop(guard);
        handle.await.unwrap();
    }
}
