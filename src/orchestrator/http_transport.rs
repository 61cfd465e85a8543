// src/orchestrator/http_transport.rs
// A concrete ChatTransport talking to a Telegram-compatible bot API over
// HTTP. The wire format of the chat platform itself is explicitly out of
// scope; this is the minimal implementation needed so the Orchestrator has
// somewhere real to send replies, grounded in the same reqwest-client
// pattern as `HttpLlmClient` (spec 6 "Outbound chat messages").

use async_trait::async_trait;
use serde_json::json;
use tracing::warn;

use crate::orchestrator::transport::{ChatTransport, InlineButton};
use crate::session::ChatId;

pub struct HttpChatTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpChatTransport {
    pub fn new(bot_token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: format!("https://api.telegram.org/bot{}", bot_token),
        }
    }

    fn inline_keyboard(buttons: &[InlineButton]) -> serde_json::Value {
        let rows: Vec<_> = buttons
            .iter()
            .map(|b| vec![json!({"text": b.label, "callback_data": b.callback_data})])
            .collect();
        json!({ "inline_keyboard": rows })
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn send_text(&self, chat_id: ChatId, markdown_text: &str, inline_buttons: Option<Vec<InlineButton>>) -> anyhow::Result<()> {
        let mut payload = json!({
            "chat_id": chat_id,
            "text": markdown_text,
            "parse_mode": "Markdown",
        });

        if let Some(buttons) = &inline_buttons {
            if !buttons.is_empty() {
                payload["reply_markup"] = Self::inline_keyboard(buttons);
            }
        }

        let response = self.client.post(format!("{}/sendMessage", self.base_url)).json(&payload).send().await?;

        if let Err(e) = response.error_for_status_ref() {
            warn!(chat_id, error = %e, "chat transport rejected sendMessage");
            return Err(e.into());
        }
        Ok(())
    }

    async fn send_photo(&self, chat_id: ChatId, url: &str, caption: Option<&str>) -> anyhow::Result<()> {
        let payload = json!({
            "chat_id": chat_id,
            "photo": url,
            "caption": caption,
        });

        let response = self.client.post(format!("{}/sendPhoto", self.base_url)).json(&payload).send().await?;

        if let Err(e) = response.error_for_status_ref() {
            warn!(chat_id, error = %e, "chat transport rejected sendPhoto");
            return Err(e.into());
        }
        Ok(())
    }
}
