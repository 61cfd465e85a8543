// src/handlers/checkout.rs
// CheckoutHandler: the state machine that collects shipping/customer data,
// materializes a cart into an Order, and schedules invoice delivery (spec
// 4.7).

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{error, info};

use crate::catalog::models::{NewClient, NewOrderLine, Order};
use crate::catalog::store::CatalogStore;
use crate::error::{AppError, AppResult};
use crate::invoice::InvoiceDispatcher;
use crate::session::{CheckoutDraft, CheckoutState, ChatId, SessionStore};

/// Permissive RFC 5321-ish email check (spec 4.7 "Validation").
static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

pub enum AnswerOutcome {
    /// Advance to a new state; text is the next prompt to send.
    Prompt(String),
    /// Stay in the current state; text is a validation error plus the
    /// re-sent prompt (spec 4.7 "Validation").
    Invalid(String),
    Committed(Order),
    /// Commit failed; cart and checkout state are preserved for retry
    /// (spec 4.7 commit step 6, spec 9 atomicity invariant).
    CommitFailed(String),
    /// User declined at `ask_confirm`; cart stays intact.
    Cancelled,
}

pub struct CheckoutHandler {
    catalog: Arc<CatalogStore>,
    sessions: Arc<dyn SessionStore>,
    invoices: Arc<InvoiceDispatcher>,
}

impl CheckoutHandler {
    pub fn new(catalog: Arc<CatalogStore>, sessions: Arc<dyn SessionStore>, invoices: Arc<InvoiceDispatcher>) -> Self {
        Self { catalog, sessions, invoices }
    }

    /// spec 4.7: `none` -> `ask_returning` on `checkout_start`, requires a
    /// non-empty cart.
    pub async fn start(&self, chat_id: ChatId) -> AppResult<String> {
        let cart = self.sessions.get_cart(chat_id).await?;
        if cart.is_empty() {
            return Err(AppError::not_found("Tu carrito está vacío, agrega productos antes de finalizar la compra."));
        }

        self.sessions
            .set_checkout_state(chat_id, CheckoutState::AskReturning, CheckoutDraft::default())
            .await?;

        Ok("¿Eres un cliente que ya nos ha comprado antes? (sí/no)".to_string())
    }

    /// spec 4.7 checkout dialog transition table.
    pub async fn handle_answer(&self, chat_id: ChatId, text: &str) -> AppResult<AnswerOutcome> {
        let (state, mut draft) = self.sessions.get_checkout_state(chat_id).await?;
        let answer = text.trim();

        match state {
            CheckoutState::None => Err(AppError::invariant("handle_answer called with no active checkout")),

            CheckoutState::AskReturning => {
                if is_affirmative(answer) {
                    draft.returning = true;
                    self.advance(chat_id, CheckoutState::AskEmail, draft).await?;
                    Ok(AnswerOutcome::Prompt("¿Cuál es tu correo electrónico?".to_string()))
                } else if is_negative(answer) {
                    draft.returning = false;
                    self.advance(chat_id, CheckoutState::AskEmail, draft).await?;
                    Ok(AnswerOutcome::Prompt("¿Cuál es tu correo electrónico?".to_string()))
                } else {
                    Ok(AnswerOutcome::Invalid("Responde sí o no: ¿eres un cliente que ya nos ha comprado antes?".to_string()))
                }
            }

            CheckoutState::AskEmail => {
                if !EMAIL_PATTERN.is_match(answer) {
                    return Ok(AnswerOutcome::Invalid("Ese correo no parece válido, intenta de nuevo.".to_string()));
                }
                draft.email = answer.to_string();

                if draft.returning {
                    match self.catalog.find_client_by_email(answer).await? {
                        Some(client) => {
                            draft.name = client.name;
                            draft.address = client.address;
                            draft.phone = client.phone;
                            self.advance(chat_id, CheckoutState::AskConfirm, draft.clone()).await?;
                            Ok(AnswerOutcome::Prompt(confirm_prompt(&draft)))
                        }
                        None => {
                            // Not found: fall back to collecting as a new customer
                            // without re-asking for the email (spec 4.7 table).
                            draft.returning = false;
                            self.advance(chat_id, CheckoutState::AskName, draft).await?;
                            Ok(AnswerOutcome::Prompt(
                                "No encontré tu correo en nuestros registros, continuemos como cliente nuevo. ¿Cuál es tu nombre?".to_string(),
                            ))
                        }
                    }
                } else {
                    self.advance(chat_id, CheckoutState::AskName, draft).await?;
                    Ok(AnswerOutcome::Prompt("¿Cuál es tu nombre?".to_string()))
                }
            }

            CheckoutState::AskName => {
                if answer.is_empty() {
                    return Ok(AnswerOutcome::Invalid("El nombre no puede estar vacío, intenta de nuevo.".to_string()));
                }
                draft.name = answer.to_string();
                self.advance(chat_id, CheckoutState::AskCompany, draft).await?;
                Ok(AnswerOutcome::Prompt("¿Cuál es el nombre de tu empresa? (responde \"ninguna\" si no aplica)".to_string()))
            }

            CheckoutState::AskCompany => {
                draft.company = if answer.eq_ignore_ascii_case("ninguna") || answer.eq_ignore_ascii_case("none") {
                    String::new()
                } else {
                    answer.to_string()
                };
                self.advance(chat_id, CheckoutState::AskAddress, draft).await?;
                Ok(AnswerOutcome::Prompt("¿Cuál es la dirección de envío?".to_string()))
            }

            CheckoutState::AskAddress => {
                if answer.is_empty() {
                    return Ok(AnswerOutcome::Invalid("La dirección no puede estar vacía, intenta de nuevo.".to_string()));
                }
                draft.address = answer.to_string();
                self.advance(chat_id, CheckoutState::AskPhone, draft).await?;
                Ok(AnswerOutcome::Prompt("¿Cuál es tu número de teléfono?".to_string()))
            }

            CheckoutState::AskPhone => {
                if answer.is_empty() {
                    return Ok(AnswerOutcome::Invalid("El teléfono no puede estar vacío, intenta de nuevo.".to_string()));
                }
                draft.phone = answer.to_string();
                self.advance(chat_id, CheckoutState::AskConfirm, draft.clone()).await?;
                Ok(AnswerOutcome::Prompt(confirm_prompt(&draft)))
            }

            CheckoutState::AskConfirm => {
                if is_affirmative(answer) {
                    self.commit(chat_id, draft).await
                } else if answer.eq_ignore_ascii_case("edit") || answer.eq_ignore_ascii_case("editar") {
                    self.advance(chat_id, CheckoutState::AskEmail, draft).await?;
                    Ok(AnswerOutcome::Prompt("¿Cuál es tu correo electrónico?".to_string()))
                } else if is_negative(answer) {
                    self.sessions.clear_checkout_state(chat_id).await?;
                    Ok(AnswerOutcome::Cancelled)
                } else {
                    Ok(AnswerOutcome::Invalid("Responde \"sí\" para confirmar, \"editar\" para corregir datos, o \"no\" para cancelar.".to_string()))
                }
            }
        }
    }

    /// spec 4.7 commit procedure. Transactional at the catalog layer; on
    /// failure the cart and checkout state are untouched so the user can
    /// retry (spec 9 atomicity invariant).
    async fn commit(&self, chat_id: ChatId, draft: CheckoutDraft) -> AppResult<AnswerOutcome> {
        let cart = self.sessions.get_cart(chat_id).await?;
        if cart.is_empty() {
            return Ok(AnswerOutcome::CommitFailed("Tu carrito está vacío.".to_string()));
        }

        let new_client = NewClient {
            name: draft.name.clone(),
            email: draft.email.clone(),
            phone: draft.phone.clone(),
            address: draft.address.clone(),
        };

        let client = match self.catalog.get_or_create_client(&new_client).await {
            Ok(client) => client,
            Err(e) => {
                error!(chat_id, error = %e, "failed to resolve/create client during checkout");
                return Ok(AnswerOutcome::CommitFailed(
                    "No pudimos procesar tu pedido, por favor intenta de nuevo.".to_string(),
                ));
            }
        };

        let lines: Vec<NewOrderLine> = cart
            .iter()
            .map(|item| NewOrderLine { product_sku: item.sku.clone(), quantity: item.quantity, unit_price: item.unit_price })
            .collect();

        let customer_name = if draft.company.is_empty() {
            draft.name.clone()
        } else {
            format!("{} ({})", draft.name, draft.company)
        };

        let order = match self
            .catalog
            .commit_order(&client.id, chat_id, &customer_name, &draft.email, &draft.address, &lines)
            .await
        {
            Ok(order) => order,
            Err(e) => {
                error!(chat_id, error = %e, "order commit failed");
                return Ok(AnswerOutcome::CommitFailed(
                    "No pudimos procesar tu pedido, por favor intenta de nuevo.".to_string(),
                ));
            }
        };

        // Last step of commit: clear cart and checkout state (spec 9
        // "at-most-once per cart" invariant).
        self.sessions.clear_cart(chat_id).await?;
        self.sessions.clear_checkout_state(chat_id).await?;

        self.invoices.enqueue(order.id.clone());
        info!(order_id = %order.id, chat_id, "checkout committed, invoice enqueued");

        Ok(AnswerOutcome::Committed(order))
    }

    async fn advance(&self, chat_id: ChatId, state: CheckoutState, draft: CheckoutDraft) -> AppResult<()> {
        self.sessions.set_checkout_state(chat_id, state, draft).await
    }
}

/// The question currently pending for `state`, used by the orchestrator to
/// re-surface the checkout prompt after an interruption is handled (spec
/// 4.7 "Interruption policy").
pub fn prompt_for_state(state: CheckoutState, draft: &CheckoutDraft) -> String {
    match state {
        CheckoutState::None => String::new(),
        CheckoutState::AskReturning => "¿eres un cliente que ya nos ha comprado antes?".to_string(),
        CheckoutState::AskEmail => "dime tu correo electrónico".to_string(),
        CheckoutState::AskName => "dime tu nombre".to_string(),
        CheckoutState::AskCompany => "dime el nombre de tu empresa (o \"ninguna\")".to_string(),
        CheckoutState::AskAddress => "dime la dirección de envío".to_string(),
        CheckoutState::AskPhone => "dime tu número de teléfono".to_string(),
        CheckoutState::AskConfirm => confirm_prompt(draft),
    }
}

fn confirm_prompt(draft: &CheckoutDraft) -> String {
    format!(
        "Por favor confirma tus datos:\nNombre: {}\nEmpresa: {}\nCorreo: {}\nDirección: {}\nTeléfono: {}\n\n¿Confirmas? (sí / editar / no)",
        draft.name,
        if draft.company.is_empty() { "-" } else { &draft.company },
        draft.email,
        draft.address,
        draft.phone,
    )
}

fn is_affirmative(text: &str) -> bool {
    matches!(text.to_lowercase().as_str(), "si" | "sí" | "yes" | "s" | "y")
}

fn is_negative(text: &str) -> bool {
    matches!(text.to_lowercase().as_str(), "no" | "n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_pattern_accepts_common_addresses() {
        assert!(EMAIL_PATTERN.is_match("buyer@example.com"));
        assert!(!EMAIL_PATTERN.is_match("not-an-email"));
    }

    #[test]
    fn affirmative_and_negative_recognize_spanish_and_english() {
        assert!(is_affirmative("sí"));
        assert!(is_affirmative("Si"));
        assert!(is_affirmative("yes"));
        assert!(is_negative("no"));
        assert!(!is_affirmative("tal vez"));
    }
}
