//! Main bot loop: pull events off the channel, route them, run handlers.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::bot::router::{Command, Route, route};
use crate::bot::state::{StateKey, StateRegister};
use crate::channels::{Channel, EventKind, IncomingEvent};
use crate::config::ContentConfig;
use crate::error::Error;
use crate::handlers::{menu, question, roots};
use crate::llm::LlmProvider;
use crate::phone::PhoneValidator;
use crate::store::SubmissionStore;

/// Core dependencies shared by every handler.
pub struct BotDeps {
    pub channel: Arc<dyn Channel>,
    pub states: Arc<StateRegister>,
    pub store: Arc<dyn SubmissionStore>,
    pub llm: Arc<dyn LlmProvider>,
    pub phone: Arc<dyn PhoneValidator>,
    pub content: ContentConfig,
    pub provider_timeout: Duration,
}

/// The bot: a channel, its dependencies, and a bounded worker pool.
pub struct Bot {
    deps: Arc<BotDeps>,
    max_workers: usize,
}

impl Bot {
    pub fn new(deps: BotDeps, max_workers: usize) -> Self {
        Self {
            deps: Arc::new(deps),
            max_workers: max_workers.max(1),
        }
    }

    pub fn deps(&self) -> &Arc<BotDeps> {
        &self.deps
    }

    /// Handle one event to completion on the current task.
    pub async fn dispatch(&self, event: IncomingEvent) {
        dispatch(&self.deps, event).await;
    }

    /// Run until Ctrl+C or the event stream ends, then drain in-flight work.
    pub async fn run(self) -> Result<(), Error> {
        let mut events = self.deps.channel.start().await?;
        let permits = Arc::new(Semaphore::new(self.max_workers));
        let mut in_flight = JoinSet::new();

        tracing::info!(
            channel = self.deps.channel.name(),
            max_workers = self.max_workers,
            "Bot ready and listening"
        );

        loop {
            let permit = tokio::select! {
                biased;
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl+C received, shutting down...");
                    break;
                }
                permit = permits.clone().acquire_owned() => match permit {
                    Ok(p) => p,
                    Err(_) => break,
                },
            };

            let event = tokio::select! {
                biased;
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl+C received, shutting down...");
                    break;
                }
                event = events.next() => match event {
                    Some(e) => e,
                    None => {
                        tracing::info!("Event stream ended, shutting down...");
                        break;
                    }
                },
            };

            let deps = Arc::clone(&self.deps);
            in_flight.spawn(async move {
                let _permit = permit;
                dispatch(&deps, event).await;
            });

            while let Some(finished) = in_flight.try_join_next() {
                log_join(finished);
            }
        }

        if !in_flight.is_empty() {
            tracing::info!(pending = in_flight.len(), "Draining in-flight handlers");
        }
        while let Some(finished) = in_flight.join_next().await {
            log_join(finished);
        }

        self.deps.channel.shutdown().await?;
        tracing::info!("Bot stopped");
        Ok(())
    }
}

fn log_join(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        tracing::error!(error = %e, "Handler task panicked");
    }
}

/// Route one event and run its handler. Never fails: handler errors are
/// recovered inside the handlers and transport errors are logged here.
pub async fn dispatch(deps: &BotDeps, event: IncomingEvent) {
    let key = StateKey::new(event.user_id, event.chat_id);

    if let EventKind::Selection { id, .. } = &event.kind
        && let Err(e) = deps.channel.answer_selection(id).await
    {
        tracing::warn!(user_id = key.user_id, error = %e, "Failed to acknowledge selection");
    }

    let state = deps.states.get(key).await;
    let route = route(&event.kind, state);
    tracing::debug!(
        user_id = key.user_id,
        chat_id = key.chat_id,
        channel = %event.channel,
        state = ?state,
        route = ?route,
        "Dispatching event"
    );

    let result = match (route, &event.kind) {
        (Route::Command(Command::Start), _) => menu::start(deps, key).await,
        (Route::Command(Command::Help), _) => menu::help(deps, key.chat_id).await,
        (Route::Selection(tag), EventKind::Selection { message_id, .. }) => {
            menu::select(deps, key, tag, *message_id).await
        }
        (Route::UnknownSelection(tag), _) => {
            tracing::warn!(user_id = key.user_id, tag = %tag, "Unknown selection tag");
            Ok(())
        }
        (Route::RootsSubmission, EventKind::Text { message_id, text }) => {
            roots::process_roots(deps, key, *message_id, text).await
        }
        (Route::Question, EventKind::Text { text, .. }) => {
            question::process_question(deps, key, text).await
        }
        (Route::Navigation, _) => menu::navigation(deps, key).await,
        (route, _) => {
            tracing::warn!(route = ?route, "Route does not match event kind");
            Ok(())
        }
    };

    if let Err(e) = result {
        tracing::error!(
            user_id = key.user_id,
            chat_id = key.chat_id,
            error = %e,
            "Failed to deliver reply"
        );
    }
}
