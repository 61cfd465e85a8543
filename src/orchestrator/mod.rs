// src/orchestrator/mod.rs
// Orchestrator: receives inbound updates, dispatches by intent, manages
// in-progress checkout state, and composes the outbound reply (spec 4.8).

pub mod http_transport;
pub mod reply;
pub mod transport;

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::catalog::store::CatalogStore;
use crate::analyzer::{AIAnalyzer, RecentProduct};
use crate::handlers::checkout::{self, AnswerOutcome, CheckoutHandler};
use crate::handlers::{CartHandler, ProductHandler};
use crate::llm::{ClassifyResult, Intent, ProductRef};
use crate::session::{ChatId, CheckoutState, SessionStore};

use self::transport::{parse_callback, ChatTransport, InlineButton};

/// A single inbound update, already stripped of transport-specific framing
/// (spec 6 "Inbound webhook").
#[derive(Debug, Clone)]
pub struct InboundUpdate {
    pub update_id: i64,
    pub chat_id: ChatId,
    pub text: Option<String>,
    pub callback_data: Option<String>,
}

pub struct Orchestrator {
    catalog: Arc<CatalogStore>,
    sessions: Arc<dyn SessionStore>,
    analyzer: AIAnalyzer,
    product: ProductHandler,
    cart: CartHandler,
    checkout: CheckoutHandler,
    transport: Arc<dyn ChatTransport>,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        catalog: Arc<CatalogStore>,
        sessions: Arc<dyn SessionStore>,
        analyzer: AIAnalyzer,
        product: ProductHandler,
        cart: CartHandler,
        checkout: CheckoutHandler,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        Self { catalog, sessions, analyzer, product, cart, checkout, transport }
    }

    /// Entry point for one inbound update (spec 4.8). Never propagates an
    /// error to the caller: any failure is logged and replied to the user
    /// with a generic message, per the orchestrator's error policy.
    pub async fn handle_update(&self, update: InboundUpdate) {
        let chat_id = update.chat_id;

        match self.sessions.mark_update_seen(update.update_id).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(update_id = update.update_id, "duplicate update, dropping");
                return;
            }
            Err(e) => {
                warn!(chat_id, error = %e, "session store unavailable, cannot verify idempotency");
                self.send(chat_id, &e.user_message(), None).await;
                return;
            }
        }

        let _guard = self.sessions.lock_chat(chat_id).await;

        if let Err(e) = self.route(chat_id, &update).await {
            error!(chat_id, update_id = update.update_id, error = %e, "unhandled error processing update");
            self.send(chat_id, &e.user_message(), None).await;
        }
    }

    async fn route(&self, chat_id: ChatId, update: &InboundUpdate) -> crate::error::AppResult<()> {
        // Button taps carry an unambiguous pre-classified intent and skip
        // the analyzer entirely.
        if let Some(data) = &update.callback_data {
            let classified = parse_callback(data)
                .ok_or_else(|| crate::error::AppError::SchemaViolation(format!("unrecognized callback payload: {}", data)))?;
            return self.dispatch_fresh(chat_id, "", classified).await;
        }

        let text = match &update.text {
            Some(t) if !t.trim().is_empty() => t.as_str(),
            _ => return Ok(()),
        };

        let recent_skus = self.sessions.get_recent_products(chat_id).await?;
        let recent_products = self.catalog.find_products(&recent_skus).await?;
        let recent: Vec<RecentProduct> =
            recent_products.iter().map(|p| RecentProduct { sku: &p.sku, name: &p.name }).collect();

        let classified = self.analyzer.analyze(text, &[], &recent).await;

        let (checkout_state, draft) = self.sessions.get_checkout_state(chat_id).await?;

        if checkout_state.is_active() {
            if checkout_state.allows_interruption() && classified.intent.is_checkout_interruption() {
                self.dispatch_fresh(chat_id, text, classified).await?;
                let reminder = format!(
                    "_Continuamos con tu pedido — {}_",
                    checkout::prompt_for_state(checkout_state, &draft)
                );
                self.send(chat_id, &reminder, None).await;
                return Ok(());
            }

            return self.handle_checkout_answer(chat_id, text).await;
        }

        self.dispatch_fresh(chat_id, text, classified).await
    }

    async fn handle_checkout_answer(&self, chat_id: ChatId, text: &str) -> crate::error::AppResult<()> {
        let outcome = self.checkout.handle_answer(chat_id, text).await?;
        match outcome {
            AnswerOutcome::Prompt(p) | AnswerOutcome::Invalid(p) => self.send(chat_id, &p, None).await,
            AnswerOutcome::Committed(order) => {
                let text = format!(
                    "¡Gracias! Tu pedido *{}* fue confirmado por un total de {:.2}. Te enviaremos la factura por correo en unos minutos.",
                    order.id, order.total_amount
                );
                self.send(chat_id, &text, None).await;
            }
            AnswerOutcome::CommitFailed(msg) => self.send(chat_id, &msg, None).await,
            AnswerOutcome::Cancelled => {
                self.send(chat_id, "Compra cancelada. Tu carrito sigue disponible si quieres continuar después.", None).await
            }
        }
        Ok(())
    }

    async fn dispatch_fresh(&self, chat_id: ChatId, text: &str, classified: ClassifyResult) -> crate::error::AppResult<()> {
        if self.analyzer.needs_clarification(&classified, text) {
            self.send(chat_id, "No estoy seguro de entender. ¿Puedes darme más detalles?", None).await;
            return Ok(());
        }

        match classified.intent {
            Intent::Greeting => self.send(chat_id, reply::WELCOME_TEXT, None).await,
            Intent::Help => self.send(chat_id, reply::HELP_TEXT, None).await,

            Intent::ProductSearch => {
                let keywords = classified.entities.keywords.as_deref().unwrap_or(text);
                let shown = self.product.search(chat_id, keywords).await?;
                let (text, buttons) = reply::format_shown_list(&shown);
                self.send(chat_id, &text, Some(buttons)).await;
            }

            Intent::ProductDetail => {
                let Some(product_ref) = classified.entities.product_ref() else {
                    self.send(chat_id, "¿De cuál producto? Dime el SKU o su número en la última lista.", None).await;
                    return Ok(());
                };
                let detail = self.product.detail(chat_id, &product_ref).await?;
                let (text, buttons) = reply::format_detail(&detail);
                match detail.product.image_urls.first() {
                    Some(url) => self.send_photo(chat_id, url, &text).await,
                    None => self.send(chat_id, &text, Some(buttons)).await,
                }
            }

            Intent::TechnicalQuestion => {
                let Some(product_ref) = classified.entities.product_ref() else {
                    self.send(chat_id, "¿Sobre cuál producto es tu pregunta?", None).await;
                    return Ok(());
                };
                let question = classified.entities.question.as_deref().unwrap_or(text);
                let answer = self.product.answer_technical(chat_id, &product_ref, question).await?;
                self.send(chat_id, &answer, None).await;
            }

            Intent::AddToCart => {
                let Some(product_ref) = classified.entities.product_ref() else {
                    self.send(chat_id, "¿Cuál producto quieres agregar? Dime el SKU o su número en la última lista.", None).await;
                    return Ok(());
                };
                let qty = classified.entities.quantity.unwrap_or(1);
                let cart = self.cart.add(chat_id, &product_ref, qty).await?;
                self.send(chat_id, &cart_summary("Agregado.", &cart), None).await;
            }

            Intent::UpdateQuantity => {
                let Some(product_ref) = classified.entities.product_ref() else {
                    self.send(chat_id, "¿Cuál producto quieres actualizar?", None).await;
                    return Ok(());
                };
                let qty = classified.entities.quantity.unwrap_or(1);
                let cart = self.cart.update(chat_id, &product_ref, qty).await?;
                self.send(chat_id, &cart_summary("Actualizado.", &cart), None).await;
            }

            Intent::RemoveFromCart => {
                let Some(product_ref) = classified.entities.product_ref() else {
                    self.send(chat_id, "¿Cuál producto quieres quitar?", None).await;
                    return Ok(());
                };
                let cart = self.cart.remove(chat_id, &product_ref).await?;
                self.send(chat_id, &cart_summary("Quitado.", &cart), None).await;
            }

            Intent::ViewCart => {
                let view = self.cart.view(chat_id).await?;
                self.send(chat_id, &reply::format_cart_view(&view), None).await;
            }

            Intent::ClearCart => {
                self.cart.clear(chat_id).await?;
                self.send(chat_id, "Tu carrito fue vaciado.", None).await;
            }

            Intent::CheckoutStart => {
                let prompt = self.checkout.start(chat_id).await?;
                self.send(chat_id, &prompt, None).await;
            }

            Intent::CheckoutAnswer | Intent::Unknown => {
                self.send(chat_id, "No estoy seguro de cómo ayudarte con eso. Usa /help para ver lo que puedo hacer.", None).await;
            }
        }

        Ok(())
    }

    async fn send(&self, chat_id: ChatId, text: &str, buttons: Option<Vec<InlineButton>>) {
        if let Err(e) = self.transport.send_text(chat_id, text, buttons).await {
            error!(chat_id, error = %e, "failed to deliver reply to chat transport");
        }
    }

    async fn send_photo(&self, chat_id: ChatId, url: &str, caption: &str) {
        if let Err(e) = self.transport.send_photo(chat_id, url, Some(caption)).await {
            error!(chat_id, error = %e, "failed to deliver photo to chat transport");
        }
    }
}

fn cart_summary(prefix: &str, cart: &[crate::session::CartItem]) -> String {
    if cart.is_empty() {
        return format!("{} Tu carrito está vacío.", prefix);
    }
    let total: rust_decimal::Decimal = cart.iter().map(crate::session::CartItem::line_total).sum();
    format!("{} Tu carrito tiene {} línea(s), total {:.2}.", prefix, cart.len(), total)
}
