// src/orchestrator/reply.rs
// Formats handler results into the markdown text sent back to the chat
// transport (spec 4.5, 4.6).

use crate::handlers::cart::CartView;
use crate::handlers::product::{Detail, ShownList};
use crate::orchestrator::transport::InlineButton;

pub const WELCOME_TEXT: &str =
    "¡Hola! Soy el asistente de ventas. Cuéntame qué buscas, por ejemplo \"busco taladros\", o usa /help para ver los comandos.";

pub const HELP_TEXT: &str = "Comandos disponibles:\n\
/agregar <SKU> [cantidad] — agrega un producto al carrito\n\
/eliminar <SKU> — quita un producto del carrito\n\
/ver_carrito — muestra tu carrito\n\
/vaciar_carrito — vacía tu carrito\n\
/finalizar_compra — inicia el proceso de compra\n\
\n\
También puedes escribirme en lenguaje natural, por ejemplo \"busco taladros\" o \"¿cuánto pesa el SKU00010?\".";

pub const NO_MATCHES_TEXT: &str =
    "No encontré productos que coincidan con tu búsqueda. Intenta con otras palabras.";

pub fn format_shown_list(shown: &ShownList) -> (String, Vec<InlineButton>) {
    if shown.items.is_empty() {
        return (NO_MATCHES_TEXT.to_string(), Vec::new());
    }

    let mut text = if shown.is_related_fallback {
        String::from("No encontré una coincidencia exacta, pero esto podría interesarte:\n\n")
    } else {
        String::from("Esto encontré para ti:\n\n")
    };

    let mut buttons = Vec::new();
    for shown_product in &shown.items {
        let p = &shown_product.product;
        text.push_str(&format!(
            "{}. *{}* ({}) — {} — {:.2}\n{}\n\n",
            shown_product.position, p.name, p.brand, p.sku, p.price, short_description(&p.description)
        ));
        buttons.push(InlineButton::detail(&p.sku));
    }

    (text.trim_end().to_string(), buttons)
}

pub fn format_detail(detail: &Detail) -> (String, Vec<InlineButton>) {
    let p = &detail.product;
    let mut text = format!("*{}* ({})\n{}\n\nPrecio: {:.2}\n", p.name, p.sku, p.description, p.price);

    if !p.specs.is_empty() {
        text.push_str("\nEspecificaciones:\n");
        for (k, v) in &p.specs {
            text.push_str(&format!("- {}: {}\n", k, v));
        }
    }

    let buttons = vec![InlineButton::add(&p.sku, 1)];
    (text.trim_end().to_string(), buttons)
}

pub fn format_cart_view(view: &CartView) -> String {
    if view.lines.is_empty() {
        return "Tu carrito está vacío.".to_string();
    }

    let mut text = String::from("Tu carrito:\n\n");
    for line in &view.lines {
        text.push_str(&format!("- {} x{} — {:.2}\n", line.sku, line.quantity, line.line_total()));
    }
    if view.truncated_count > 0 {
        text.push_str(&format!("…y {} más\n", view.truncated_count));
    }
    text.push_str(&format!("\nTotal: {:.2}", view.total));
    text
}

fn short_description(description: &str) -> String {
    const MAX_CHARS: usize = 120;
    if description.chars().count() <= MAX_CHARS {
        return description.to_string();
    }
    let truncated: String = description.chars().take(MAX_CHARS).collect();
    format!("{}…", truncated.trim_end())
}
