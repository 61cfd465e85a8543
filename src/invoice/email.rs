// src/invoice/email.rs
// SMTP delivery of the rendered invoice (spec 4.9 step 4).

use lettre::message::header::ContentType;
use lettre::message::{Attachment, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::catalog::models::OrderWithItems;
use crate::config::llm::EmailConfig;
use crate::error::{AppError, AppResult};

pub struct InvoiceMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl InvoiceMailer {
    pub fn new(config: &EmailConfig) -> AppResult<Self> {
        let transport = if config.smtp_user.is_empty() {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
                .port(config.smtp_port)
                .build()
        } else {
            let creds = Credentials::new(config.smtp_user.clone(), config.smtp_password.clone());
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                .map_err(|e| AppError::invariant(format!("invalid smtp host: {}", e)))?
                .port(config.smtp_port)
                .credentials(creds)
                .build()
        };

        Ok(Self { transport, from_address: config.from_address.clone() })
    }

    pub async fn send_invoice(&self, order: &OrderWithItems, pdf_bytes: Vec<u8>) -> AppResult<()> {
        let attachment = Attachment::new(format!("factura-{}.pdf", order.order.id))
            .body(pdf_bytes, ContentType::parse("application/pdf").unwrap());

        let body = format!(
            "Hola {},\n\nGracias por tu compra. Adjuntamos la factura de tu pedido {}.\n\nTotal: {:.2}\n\nSaludos.",
            order.order.customer_name, order.order.id, order.order.total_amount
        );

        let email = Message::builder()
            .from(self.from_address.parse().map_err(|e| AppError::invariant(format!("invalid from address: {}", e)))?)
            .to(order
                .order
                .customer_email
                .parse()
                .map_err(|e| AppError::invariant(format!("invalid customer email: {}", e)))?)
            .subject(format!("Factura de tu pedido {}", order.order.id))
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(body))
                    .singlepart(attachment),
            )
            .map_err(|e| AppError::invariant(format!("failed to build invoice email: {}", e)))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| AppError::PermanentUpstream(format!("smtp send failed: {}", e)))?;

        Ok(())
    }
}
