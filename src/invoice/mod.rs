// src/invoice/mod.rs
// InvoiceDispatcher: renders and emails the invoice for a committed order,
// off the request path, with its own retry/backoff (spec 4.9).

pub mod email;
pub mod pdf;

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Jitter, Quota, RateLimiter};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::catalog::store::CatalogStore;
use crate::config::llm::EmailConfig;
use crate::invoice::email::InvoiceMailer;

/// Attempts are spaced to fit within a roughly 5-minute envelope (spec 4.9
/// "at most 3 attempts, total backoff window under 5 minutes").
const RETRY_DELAYS: [Duration; 2] = [Duration::from_secs(15), Duration::from_secs(90)];
const MAX_ATTEMPTS: u32 = 3;

/// Schedules invoice generation and delivery. Cloning is cheap; the sender
/// half of the queue is the only thing callers hold.
#[derive(Clone)]
pub struct InvoiceDispatcher {
    queue: mpsc::UnboundedSender<String>,
}

impl InvoiceDispatcher {
    /// Spawns the background worker. `catalog` must be backed by its own
    /// pool handle, independent from any request-scoped connection, so a
    /// slow or failed webhook request can never stall invoice delivery
    /// (spec 5, spec 9 design note).
    pub fn spawn(catalog: Arc<CatalogStore>, email_config: &EmailConfig) -> anyhow::Result<Self> {
        let mailer = Arc::new(InvoiceMailer::new(email_config)?);
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(run_worker(rx, catalog, mailer));

        Ok(Self { queue: tx })
    }

    /// Enqueue an order for invoicing. Never blocks; drops are only
    /// possible if the worker task has already terminated, which is logged
    /// loudly rather than silently swallowed.
    pub fn enqueue(&self, order_id: String) {
        if let Err(e) = self.queue.send(order_id.clone()) {
            error!(order_id, error = %e, "invoice worker channel closed, order will never be invoiced automatically");
        }
    }
}

async fn run_worker(mut rx: mpsc::UnboundedReceiver<String>, catalog: Arc<CatalogStore>, mailer: Arc<InvoiceMailer>) {
    info!("invoice dispatcher started");

    // Caps outbound mail to a sane rate regardless of how fast checkouts
    // commit, so a burst of orders doesn't hammer the SMTP relay.
    let limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock> =
        RateLimiter::direct(Quota::per_minute(NonZeroU32::new(30).unwrap()));
    let jitter = Jitter::new(Duration::from_millis(10), Duration::from_millis(100));

    while let Some(order_id) = rx.recv().await {
        limiter.until_ready_with_jitter(jitter).await;
        process_one(&catalog, &mailer, &order_id).await;
    }

    info!("invoice dispatcher stopped: channel closed");
}

async fn process_one(catalog: &Arc<CatalogStore>, mailer: &Arc<InvoiceMailer>, order_id: &str) {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match try_invoice(catalog, mailer, order_id).await {
            Ok(()) => {
                info!(order_id, attempt, "invoice delivered");
                return;
            }
            Err(e) if attempt < MAX_ATTEMPTS => {
                warn!(order_id, attempt, error = %e, "invoice attempt failed, retrying");
                tokio::time::sleep(RETRY_DELAYS[(attempt - 1) as usize]).await;
            }
            Err(e) => {
                error!(order_id, attempt, error = %e, "invoice delivery failed permanently, order remains committed");
                if let Err(record_err) = catalog.record_invoice_failure(order_id, &e.to_string()).await {
                    error!(order_id, error = %record_err, "failed to record invoice failure in audit log");
                }
                return;
            }
        }
    }
}

async fn try_invoice(catalog: &Arc<CatalogStore>, mailer: &Arc<InvoiceMailer>, order_id: &str) -> anyhow::Result<()> {
    let order = catalog.load_order_with_items(order_id).await?;
    let pdf_bytes = pdf::render_invoice(&order)?;
    mailer.send_invoice(&order, pdf_bytes).await?;
    catalog.set_invoice_url(order_id, &format!("invoice://{}", order_id)).await?;
    Ok(())
}
