//! Question pass-through: one user question, one completion, one answer.

use std::sync::Arc;
use std::time::Duration;

use crate::bot::state::{StateGuard, StateKey};
use crate::bot::BotDeps;
use crate::channels::OutgoingMessage;
use crate::error::{ChannelError, HandlerError, LlmError};
use crate::handlers::texts;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::safety::sanitize_question;

/// Persona the completion provider answers as.
pub const SYSTEM_PERSONA: &str =
    "Ты мудрый раввин, который помогает с вопросами о еврейских традициях.";

pub const MAX_ANSWER_TOKENS: u32 = 1000;
pub const ANSWER_TEMPERATURE: f32 = 0.7;

/// Wrap a sanitized question in the fixed prompt template.
pub fn build_prompt(question: &str) -> String {
    format!(
        "Пользователь спрашивает о соблюдении еврейских законов: {question}. \
         Объясните подробно как правильно соблюдать."
    )
}

/// Persona, optional prior assistant context, then the templated question.
pub fn build_messages(question: &str, context: Option<&str>) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(SYSTEM_PERSONA)];
    if let Some(context) = context.filter(|c| !c.trim().is_empty()) {
        messages.push(ChatMessage::assistant(context));
    }
    messages.push(ChatMessage::user(build_prompt(question)));
    messages
}

/// Ask the provider, bounded by `timeout` even if the provider ignores it.
pub async fn generate_answer(
    llm: &Arc<dyn LlmProvider>,
    question: &str,
    context: Option<&str>,
    timeout: Duration,
) -> Result<String, HandlerError> {
    let request = CompletionRequest::new(build_messages(question, context))
        .with_max_tokens(MAX_ANSWER_TOKENS)
        .with_temperature(ANSWER_TEMPERATURE)
        .with_timeout(timeout);

    let response = tokio::time::timeout(timeout, llm.complete(request))
        .await
        .map_err(|_| LlmError::Timeout {
            provider: llm.model_name().to_string(),
            after: timeout,
        })??;

    tracing::debug!(
        model = llm.model_name(),
        input_tokens = response.input_tokens,
        output_tokens = response.output_tokens,
        finish_reason = ?response.finish_reason,
        "Completion received"
    );
    Ok(response.content)
}

/// Handle free text from a user in the question dialog.
///
/// The dialog ends here whatever happens.
pub async fn process_question(
    deps: &BotDeps,
    key: StateKey,
    text: &str,
) -> Result<(), ChannelError> {
    let guard = StateGuard::new(deps.states.clone(), key);

    let reply = match sanitize_question(text) {
        Err(e) => {
            tracing::debug!(user_id = key.user_id, error = %e, "Question rejected");
            OutgoingMessage::markdown(texts::QUESTION_LENGTH_ERROR)
        }
        Ok(question) => {
            match generate_answer(&deps.llm, &question, None, deps.provider_timeout).await {
                Ok(answer) => OutgoingMessage::markdown(texts::answer(&answer)),
                Err(e) => {
                    tracing::error!(user_id = key.user_id, error = %e, "Question answering failed");
                    OutgoingMessage::text(texts::PROVIDER_APOLOGY)
                }
            }
        }
    };

    guard.release().await;
    deps.channel.send(key.chat_id, reply).await
}
