//! Kosher Bot: Telegram assistant for Jewish tradition questions and roots search.

pub mod bot;
pub mod channels;
pub mod config;
pub mod error;
pub mod handlers;
pub mod llm;
pub mod phone;
pub mod safety;
pub mod store;
