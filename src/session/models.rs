// src/session/models.rs
// Session-scoped types: cart lines and conversation context (spec 3).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type ChatId = i64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    pub sku: String,
    pub quantity: i64,
    pub unit_price: Decimal,
}

impl CartItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Checkout dialog state. Kept to the closed set named in spec 3; the
/// `ask_email_lookup` transitional step from the spec 4.7 table is modeled
/// as `AskEmail` with `CheckoutDraft.returning` set, rather than as its own
/// variant (see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutState {
    None,
    AskReturning,
    AskEmail,
    AskName,
    AskCompany,
    AskAddress,
    AskPhone,
    AskConfirm,
}

impl Default for CheckoutState {
    fn default() -> Self {
        Self::None
    }
}

impl CheckoutState {
    pub fn is_active(&self) -> bool {
        !matches!(self, CheckoutState::None)
    }

    /// Whether a product/cart message should be allowed to interrupt this
    /// state (spec 4.7 "Interruption policy": "while in any state != none
    /// or ask_confirm"). At `ask_confirm` the next message is the
    /// yes/edit/no answer, not an interruption.
    pub fn allows_interruption(&self) -> bool {
        !matches!(self, CheckoutState::None | CheckoutState::AskConfirm)
    }
}

/// Partial customer data collected across the checkout dialog. Survives
/// interruption (spec 3 invariant: "the draft must not be lost").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutDraft {
    pub returning: bool,
    pub email: String,
    pub name: String,
    pub company: String,
    pub address: String,
    pub phone: String,
    /// The last interrupting prompt, echoed back when the reminder in spec
    /// 4.7 "Interruption policy" is appended to a reply.
    pub last_interruption_prompt: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationContext {
    pub recent_products: Vec<String>,
    pub checkout_state: CheckoutState,
    pub draft: CheckoutDraft,
}
