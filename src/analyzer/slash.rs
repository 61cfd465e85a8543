// src/analyzer/slash.rs
// Slash-command grammar (spec 4.4 step 1, spec 6 "Slash-command surface").
// Recognized up front so a well-formed command never costs an LLM call.

use crate::llm::{Entities, Intent};

pub struct SlashCommand {
    pub intent: Intent,
    pub entities: Entities,
}

/// Parse a leading slash command. Returns `None` if `text` isn't one of
/// the seven recognized commands, so the caller falls through to the
/// analyzer's normal LLM path.
pub fn parse(text: &str) -> Option<SlashCommand> {
    let text = text.trim();
    if !text.starts_with('/') {
        return None;
    }

    let mut parts = text.splitn(3, char::is_whitespace);
    let command = parts.next().unwrap_or("");
    let rest: Vec<&str> = parts.flat_map(str::split_whitespace).collect();

    match command {
        "/start" => Some(SlashCommand { intent: Intent::Greeting, entities: Entities::default() }),
        "/help" => Some(SlashCommand { intent: Intent::Help, entities: Entities::default() }),
        "/ver_carrito" => Some(SlashCommand { intent: Intent::ViewCart, entities: Entities::default() }),
        "/vaciar_carrito" => Some(SlashCommand { intent: Intent::ClearCart, entities: Entities::default() }),
        "/finalizar_compra" => Some(SlashCommand { intent: Intent::CheckoutStart, entities: Entities::default() }),
        "/agregar" => {
            let sku = rest.first().map(|s| s.to_uppercase());
            let quantity = rest.get(1).and_then(|q| q.parse::<i64>().ok()).map(|q| q.max(1));
            Some(SlashCommand {
                intent: Intent::AddToCart,
                entities: Entities { sku, quantity, ..Default::default() },
            })
        }
        "/eliminar" => {
            let sku = rest.first().map(|s| s.to_uppercase());
            Some(SlashCommand {
                intent: Intent::RemoveFromCart,
                entities: Entities { sku, ..Default::default() },
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_agregar_with_quantity() {
        let cmd = parse("/agregar SKU00010 2").unwrap();
        assert_eq!(cmd.intent, Intent::AddToCart);
        assert_eq!(cmd.entities.sku.as_deref(), Some("SKU00010"));
        assert_eq!(cmd.entities.quantity, Some(2));
    }

    #[test]
    fn parses_agregar_without_quantity() {
        let cmd = parse("/agregar sku00010").unwrap();
        assert_eq!(cmd.entities.sku.as_deref(), Some("SKU00010"));
        assert_eq!(cmd.entities.quantity, None);
    }

    #[test]
    fn parses_simple_commands() {
        assert_eq!(parse("/ver_carrito").unwrap().intent, Intent::ViewCart);
        assert_eq!(parse("/vaciar_carrito").unwrap().intent, Intent::ClearCart);
        assert_eq!(parse("/finalizar_compra").unwrap().intent, Intent::CheckoutStart);
    }

    #[test]
    fn non_slash_text_is_not_a_command() {
        assert!(parse("busco taladros").is_none());
    }

    #[test]
    fn unrecognized_slash_command_falls_through() {
        assert!(parse("/unknown_thing").is_none());
    }
}
