//! Roots-search form: "Name Phone" in, one stored submission per user out.

use crate::bot::state::StateKey;
use crate::bot::BotDeps;
use crate::channels::OutgoingMessage;
use crate::error::{ChannelError, HandlerError};
use crate::handlers::texts;
use crate::safety::{sanitize_name, split_roots_input};
use crate::store::{InsertOutcome, RootsSubmission};

/// Result of a well-formed submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootsOutcome {
    Saved { name: String, phone: String },
    AlreadySubmitted,
}

/// Validate and store a submission line for `user_id`.
///
/// Never overwrites an existing row: an earlier submission, or one that
/// wins a concurrent race, both yield [`RootsOutcome::AlreadySubmitted`].
pub async fn submit(
    deps: &BotDeps,
    user_id: i64,
    raw: &str,
) -> Result<RootsOutcome, HandlerError> {
    let candidate = split_roots_input(raw)?;
    let name = sanitize_name(&candidate.name)?;
    if !deps.phone.is_valid(&candidate.phone) {
        return Err(HandlerError::InvalidPhone(candidate.phone));
    }

    if deps.store.get_submission(user_id).await?.is_some() {
        return Ok(RootsOutcome::AlreadySubmitted);
    }

    let submission = RootsSubmission::new(user_id, &name, &candidate.phone);
    match deps.store.insert_submission(&submission).await? {
        InsertOutcome::Inserted => Ok(RootsOutcome::Saved {
            name,
            phone: candidate.phone,
        }),
        InsertOutcome::Duplicate => Ok(RootsOutcome::AlreadySubmitted),
    }
}

/// Handle free text from a user in the roots dialog.
///
/// Validation failures keep the dialog open so the user can resend; every
/// other outcome ends it.
pub async fn process_roots(
    deps: &BotDeps,
    key: StateKey,
    message_id: i64,
    text: &str,
) -> Result<(), ChannelError> {
    let reply = match submit(deps, key.user_id, text).await {
        Ok(RootsOutcome::Saved { name, phone }) => {
            tracing::info!(user_id = key.user_id, "Roots submission saved");
            deps.states.clear(key).await;
            texts::roots_saved(&name, &phone)
        }
        Ok(RootsOutcome::AlreadySubmitted) => {
            tracing::info!(user_id = key.user_id, "Roots submission already on file");
            deps.states.clear(key).await;
            texts::ROOTS_ALREADY_SUBMITTED.to_string()
        }
        Err(e) if e.is_retryable_input() => {
            tracing::debug!(user_id = key.user_id, error = %e, "Roots input rejected");
            rejection_text(&e).to_string()
        }
        Err(e) => {
            tracing::error!(user_id = key.user_id, error = %e, "Roots submission failed");
            deps.states.clear(key).await;
            texts::ROOTS_SAVE_ERROR.to_string()
        }
    };

    let message = OutgoingMessage::markdown(reply).reply_to(message_id);
    deps.channel.send(key.chat_id, message).await
}

fn rejection_text(error: &HandlerError) -> &'static str {
    match error {
        HandlerError::InvalidName => texts::ROOTS_INVALID_NAME,
        HandlerError::InvalidPhone(_) => texts::ROOTS_INVALID_PHONE,
        _ => texts::ROOTS_FORMAT_ERROR,
    }
}
