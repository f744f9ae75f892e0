//! Telegram channel: long-polls the Bot API for updates.
//!
//! Native Rust Telegram Bot API implementation. Text messages and inline
//! keyboard presses (`callback_query`) become [`IncomingEvent`]s; replies go
//! out through `sendMessage` / `editMessageText` with inline keyboards.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::channels::{Channel, EventStream, IncomingEvent, InlineButton, OutgoingMessage};
use crate::error::ChannelError;

/// Maximum message length for Telegram's sendMessage API.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Long-poll timeout passed to getUpdates, in seconds.
const POLL_TIMEOUT_SECS: u64 = 30;

/// Telegram channel. Connects to the Bot API via long-polling.
pub struct TelegramChannel {
    bot_token: SecretString,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: SecretString) -> Self {
        Self {
            bot_token,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        api_url(&self.bot_token, method)
    }

    /// POST a JSON body, retrying once without `parse_mode` if Telegram
    /// rejects the Markdown.
    async fn post_with_markdown_fallback(
        &self,
        method: &str,
        mut body: serde_json::Value,
    ) -> Result<(), ChannelError> {
        let resp = self
            .client
            .post(self.api_url(method))
            .json(&body)
            .send()
            .await
            .map_err(|e| send_failed(e.to_string()))?;

        if resp.status().is_success() {
            return Ok(());
        }

        let first_status = resp.status();
        let first_err = resp.text().await.unwrap_or_default();
        if is_not_modified(&first_err) {
            return Ok(());
        }
        if body.get("parse_mode").is_none() {
            return Err(send_failed(format!(
                "{method} failed ({first_status}): {first_err}"
            )));
        }

        tracing::warn!(
            status = ?first_status,
            method,
            "Telegram call with Markdown failed; retrying without parse_mode"
        );

        if let Some(obj) = body.as_object_mut() {
            obj.remove("parse_mode");
        }
        let plain_resp = self
            .client
            .post(self.api_url(method))
            .json(&body)
            .send()
            .await
            .map_err(|e| send_failed(e.to_string()))?;

        if !plain_resp.status().is_success() {
            let plain_err = plain_resp.text().await.unwrap_or_default();
            if is_not_modified(&plain_err) {
                return Ok(());
            }
            return Err(send_failed(format!(
                "{method} failed (markdown: {first_status}, plain: {plain_err})"
            )));
        }

        Ok(())
    }
}

// ── Channel trait implementation ────────────────────────────────────

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<EventStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let url = self.api_url("getUpdates");
        let client = self.client.clone();

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!("Telegram channel listening for updates...");

            loop {
                let body = serde_json::json!({
                    "offset": offset,
                    "timeout": POLL_TIMEOUT_SECS,
                    "allowed_updates": ["message", "callback_query"]
                });

                let resp = match client.post(&url).json(&body).send().await {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let data: serde_json::Value = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Telegram parse error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                if data.get("ok").and_then(serde_json::Value::as_bool) == Some(false) {
                    tracing::warn!(
                        description = data
                            .get("description")
                            .and_then(serde_json::Value::as_str)
                            .unwrap_or("unknown"),
                        "Telegram getUpdates returned an error"
                    );
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    continue;
                }

                let Some(results) = data.get("result").and_then(serde_json::Value::as_array)
                else {
                    continue;
                };

                for update in results {
                    // Advance offset past this update
                    if let Some(uid) = update.get("update_id").and_then(serde_json::Value::as_i64)
                    {
                        offset = uid + 1;
                    }

                    let Some(event) = parse_update(update) else {
                        continue;
                    };

                    if tx.send(event).is_err() {
                        tracing::info!("Telegram listener channel closed");
                        return;
                    }
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn send(&self, chat_id: i64, message: OutgoingMessage) -> Result<(), ChannelError> {
        let chunks = split_message(&message.text, TELEGRAM_MAX_MESSAGE_LENGTH);
        let last = chunks.len().saturating_sub(1);

        for (i, chunk) in chunks.iter().enumerate() {
            let mut body = serde_json::json!({
                "chat_id": chat_id,
                "text": chunk,
            });
            if let Some(mode) = message.parse_mode {
                body["parse_mode"] = serde_json::json!(mode.as_str());
            }
            if i == 0 {
                if let Some(reply_to) = message.reply_to {
                    body["reply_to_message_id"] = serde_json::json!(reply_to);
                }
            }
            if i == last && !message.buttons.is_empty() {
                body["reply_markup"] = inline_keyboard(&message.buttons);
            }

            self.post_with_markdown_fallback("sendMessage", body).await?;
        }
        Ok(())
    }

    async fn edit(
        &self,
        chat_id: i64,
        message_id: i64,
        message: OutgoingMessage,
    ) -> Result<(), ChannelError> {
        let mut body = serde_json::json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": message.text,
        });
        if let Some(mode) = message.parse_mode {
            body["parse_mode"] = serde_json::json!(mode.as_str());
        }
        if !message.buttons.is_empty() {
            body["reply_markup"] = inline_keyboard(&message.buttons);
        }

        self.post_with_markdown_fallback("editMessageText", body)
            .await
    }

    async fn answer_selection(&self, selection_id: &str) -> Result<(), ChannelError> {
        let resp = self
            .client
            .post(self.api_url("answerCallbackQuery"))
            .json(&serde_json::json!({ "callback_query_id": selection_id }))
            .send()
            .await
            .map_err(|e| send_failed(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err = resp.text().await.unwrap_or_default();
            return Err(send_failed(format!(
                "answerCallbackQuery failed ({status}): {err}"
            )));
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: format!("getMe returned {}", resp.status()),
            })
        }
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        tracing::info!("Telegram channel shutting down");
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn api_url(token: &SecretString, method: &str) -> String {
    format!("https://api.telegram.org/bot{}/{method}", token.expose_secret())
}

fn send_failed(reason: String) -> ChannelError {
    ChannelError::SendFailed {
        name: "telegram".into(),
        reason,
    }
}

/// Telegram answers 400 when an edit would leave the message unchanged.
fn is_not_modified(error_body: &str) -> bool {
    error_body.contains("message is not modified")
}

/// Map a single `getUpdates` entry to an event.
///
/// Returns `None` for update types the bot does not handle (edited messages,
/// stickers, photos without captions, and so on).
fn parse_update(update: &serde_json::Value) -> Option<IncomingEvent> {
    if let Some(query) = update.get("callback_query") {
        let id = query.get("id").and_then(serde_json::Value::as_str)?;
        let from = query.get("from")?;
        let user_id = from.get("id").and_then(serde_json::Value::as_i64)?;
        let message = query.get("message");
        let chat_id = message
            .and_then(|m| m.get("chat"))
            .and_then(|c| c.get("id"))
            .and_then(serde_json::Value::as_i64)
            .unwrap_or(user_id);
        let message_id = message
            .and_then(|m| m.get("message_id"))
            .and_then(serde_json::Value::as_i64);
        let tag = query
            .get("data")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();

        let mut event = IncomingEvent::selection("telegram", user_id, chat_id, id, tag, message_id);
        if let Some(name) = display_name(from) {
            event = event.with_user_name(name);
        }
        return Some(event);
    }

    let message = update.get("message")?;
    let text = message.get("text").and_then(serde_json::Value::as_str)?;
    let from = message.get("from")?;
    let user_id = from.get("id").and_then(serde_json::Value::as_i64)?;
    let chat_id = message
        .get("chat")
        .and_then(|c| c.get("id"))
        .and_then(serde_json::Value::as_i64)?;
    let message_id = message
        .get("message_id")
        .and_then(serde_json::Value::as_i64)
        .unwrap_or_default();

    let mut event = IncomingEvent::text("telegram", user_id, chat_id, message_id, text);
    if let Some(name) = display_name(from) {
        event = event.with_user_name(name);
    }
    Some(event)
}

fn display_name(from: &serde_json::Value) -> Option<&str> {
    from.get("first_name")
        .and_then(serde_json::Value::as_str)
        .or_else(|| from.get("username").and_then(serde_json::Value::as_str))
}

/// Render buttons as an inline keyboard, one button per row.
fn inline_keyboard(buttons: &[InlineButton]) -> serde_json::Value {
    let rows: Vec<serde_json::Value> = buttons
        .iter()
        .map(|button| match button {
            InlineButton::Callback { label, tag } => {
                serde_json::json!([{ "text": label, "callback_data": tag }])
            }
            InlineButton::Url { label, url } => {
                serde_json::json!([{ "text": label, "url": url }])
            }
        })
        .collect();
    serde_json::json!({ "inline_keyboard": rows })
}

/// Split a message into chunks that fit Telegram's character limit.
/// Tries to split on newlines, then spaces, then hard-cuts.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        // Largest char boundary that fits
        let mut boundary = max_len;
        while !remaining.is_char_boundary(boundary) {
            boundary -= 1;
        }

        // Find a good split point
        let chunk = &remaining[..boundary];
        let split_at = chunk
            .rfind('\n')
            .or_else(|| chunk.rfind(' '))
            .unwrap_or(boundary);

        // Don't split at position 0 (infinite loop guard)
        let split_at = if split_at == 0 { boundary } else { split_at };

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    chunks
}

// ── Tests ───────────────────────────────────────────────────────────
