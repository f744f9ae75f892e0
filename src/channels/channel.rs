//! Channel trait and the event/message types that cross it.

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;

use crate::error::ChannelError;

/// Stream of inbound events produced by a started channel.
pub type EventStream = Pin<Box<dyn Stream<Item = IncomingEvent> + Send>>;

/// What the user did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// A button press carrying a fixed tag.
    Selection {
        /// Transport id used to acknowledge the press.
        id: String,
        tag: String,
        /// Message the button was attached to, if still known.
        message_id: Option<i64>,
    },
    /// A free-text message.
    Text { message_id: i64, text: String },
}

/// An inbound event from a channel.
#[derive(Debug, Clone)]
pub struct IncomingEvent {
    pub channel: String,
    pub user_id: i64,
    pub chat_id: i64,
    pub user_name: Option<String>,
    pub kind: EventKind,
    pub received_at: DateTime<Utc>,
}

impl IncomingEvent {
    pub fn text(channel: &str, user_id: i64, chat_id: i64, message_id: i64, text: &str) -> Self {
        Self {
            channel: channel.to_string(),
            user_id,
            chat_id,
            user_name: None,
            kind: EventKind::Text {
                message_id,
                text: text.to_string(),
            },
            received_at: Utc::now(),
        }
    }

    pub fn selection(
        channel: &str,
        user_id: i64,
        chat_id: i64,
        id: &str,
        tag: &str,
        message_id: Option<i64>,
    ) -> Self {
        Self {
            channel: channel.to_string(),
            user_id,
            chat_id,
            user_name: None,
            kind: EventKind::Selection {
                id: id.to_string(),
                tag: tag.to_string(),
                message_id,
            },
            received_at: Utc::now(),
        }
    }

    pub fn with_user_name(mut self, name: &str) -> Self {
        self.user_name = Some(name.to_string());
        self
    }
}

/// Text formatting mode for outgoing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Markdown,
}

impl ParseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "Markdown",
        }
    }
}

/// A labeled action attached below a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineButton {
    /// Sends a selection event with `tag` back to the bot.
    Callback { label: String, tag: String },
    /// Opens a URL in the client.
    Url { label: String, url: String },
}

impl InlineButton {
    pub fn callback(label: &str, tag: &str) -> Self {
        Self::Callback {
            label: label.to_string(),
            tag: tag.to_string(),
        }
    }

    pub fn url(label: &str, url: &str) -> Self {
        Self::Url {
            label: label.to_string(),
            url: url.to_string(),
        }
    }
}

/// An outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub text: String,
    /// Rendered one button per row.
    pub buttons: Vec<InlineButton>,
    pub parse_mode: Option<ParseMode>,
    /// Message to thread the reply under.
    pub reply_to: Option<i64>,
}

impl OutgoingMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            text: content.into(),
            buttons: Vec::new(),
            parse_mode: None,
            reply_to: None,
        }
    }

    pub fn markdown(content: impl Into<String>) -> Self {
        Self {
            parse_mode: Some(ParseMode::Markdown),
            ..Self::text(content)
        }
    }

    pub fn with_buttons(mut self, buttons: Vec<InlineButton>) -> Self {
        self.buttons = buttons;
        self
    }

    pub fn reply_to(mut self, message_id: i64) -> Self {
        self.reply_to = Some(message_id);
        self
    }
}

/// A bidirectional messaging transport.
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    /// Start receiving events.
    async fn start(&self) -> Result<EventStream, ChannelError>;

    /// Send a new message to a chat.
    async fn send(&self, chat_id: i64, message: OutgoingMessage) -> Result<(), ChannelError>;

    /// Replace the content of a previously sent message.
    async fn edit(
        &self,
        chat_id: i64,
        message_id: i64,
        message: OutgoingMessage,
    ) -> Result<(), ChannelError>;

    /// Acknowledge a selection so the client stops its loading indicator.
    async fn answer_selection(&self, selection_id: &str) -> Result<(), ChannelError>;

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}
