//! In-process fakes for handler and dispatcher tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::bot::state::StateRegister;
use crate::bot::BotDeps;
use crate::channels::{Channel, EventStream, IncomingEvent, OutgoingMessage};
use crate::config::ContentConfig;
use crate::error::{ChannelError, LlmError};
use crate::llm::{CompletionRequest, CompletionResponse, FinishReason, LlmProvider, Role};
use crate::phone::RussianPhoneValidator;
use crate::store::LibSqlBackend;
use crate::store::libsql_backend::DEFAULT_OP_TIMEOUT;

/// One recorded outbound call.
#[derive(Debug, Clone)]
pub enum Sent {
    New {
        chat_id: i64,
        message: OutgoingMessage,
    },
    Edit {
        chat_id: i64,
        message_id: i64,
        message: OutgoingMessage,
    },
}

impl Sent {
    pub fn chat_id(&self) -> i64 {
        match self {
            Sent::New { chat_id, .. } | Sent::Edit { chat_id, .. } => *chat_id,
        }
    }

    pub fn message(&self) -> &OutgoingMessage {
        match self {
            Sent::New { message, .. } | Sent::Edit { message, .. } => message,
        }
    }
}

/// Channel that records everything and replays a fixed list of events.
#[derive(Default)]
pub struct RecordingChannel {
    sent: Mutex<Vec<Sent>>,
    answered: Mutex<Vec<String>>,
    events: Mutex<Vec<IncomingEvent>>,
    fail_edits: AtomicBool,
    fail_sends: AtomicBool,
    shut_down: AtomicBool,
    send_delay: Mutex<Option<Duration>>,
    sending: AtomicUsize,
    peak_sending: AtomicUsize,
}

impl RecordingChannel {
    pub fn with_events(events: Vec<IncomingEvent>) -> Self {
        Self {
            events: Mutex::new(events),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last_message(&self) -> OutgoingMessage {
        self.sent
            .lock()
            .unwrap()
            .last()
            .expect("nothing was sent")
            .message()
            .clone()
    }

    pub fn last_text(&self) -> String {
        self.last_message().text
    }

    pub fn answered(&self) -> Vec<String> {
        self.answered.lock().unwrap().clone()
    }

    pub fn was_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    pub fn fail_edits(&self) {
        self.fail_edits.store(true, Ordering::SeqCst);
    }

    pub fn fail_sends(&self) {
        self.fail_sends.store(true, Ordering::SeqCst);
    }

    /// Make every `send` take `delay`, tracking how many overlap.
    pub fn slow_sends(&self, delay: Duration) {
        *self.send_delay.lock().unwrap() = Some(delay);
    }

    /// Highest number of `send` calls seen in flight at once.
    pub fn peak_concurrent_sends(&self) -> usize {
        self.peak_sending.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Channel for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    async fn start(&self) -> Result<EventStream, ChannelError> {
        let events = std::mem::take(&mut *self.events.lock().unwrap());
        Ok(Box::pin(futures::stream::iter(events)))
    }

    async fn send(&self, chat_id: i64, message: OutgoingMessage) -> Result<(), ChannelError> {
        let delay = *self.send_delay.lock().unwrap();
        if let Some(delay) = delay {
            let now = self.sending.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_sending.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            self.sending.fetch_sub(1, Ordering::SeqCst);
        }
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(ChannelError::SendFailed {
                name: "recording".into(),
                reason: "send disabled".into(),
            });
        }
        self.sent.lock().unwrap().push(Sent::New { chat_id, message });
        Ok(())
    }

    async fn edit(
        &self,
        chat_id: i64,
        message_id: i64,
        message: OutgoingMessage,
    ) -> Result<(), ChannelError> {
        if self.fail_edits.load(Ordering::SeqCst) {
            return Err(ChannelError::SendFailed {
                name: "recording".into(),
                reason: "message can't be edited".into(),
            });
        }
        self.sent.lock().unwrap().push(Sent::Edit {
            chat_id,
            message_id,
            message,
        });
        Ok(())
    }

    async fn answer_selection(&self, selection_id: &str) -> Result<(), ChannelError> {
        self.answered.lock().unwrap().push(selection_id.to_string());
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        self.shut_down.store(true, Ordering::SeqCst);
        Ok(())
    }
}

fn response(content: String) -> CompletionResponse {
    CompletionResponse {
        content,
        input_tokens: 0,
        output_tokens: 0,
        finish_reason: FinishReason::Stop,
        response_id: None,
    }
}

/// Answers with the last user message.
pub struct EchoLlm;

#[async_trait]
impl LlmProvider for EchoLlm {
    fn model_name(&self) -> &str {
        "echo"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let last_user = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Ok(response(last_user))
    }
}

/// Always fails at the transport level.
pub struct FailingLlm;

#[async_trait]
impl LlmProvider for FailingLlm {
    fn model_name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        Err(LlmError::RequestFailed {
            provider: "failing".into(),
            reason: "connection refused".into(),
        })
    }
}

/// Never answers within any reasonable timeout.
pub struct SlowLlm;

#[async_trait]
impl LlmProvider for SlowLlm {
    fn model_name(&self) -> &str {
        "slow"
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(response("too late".into()))
    }
}

/// Records requests and answers with a fixed string.
#[derive(Default)]
pub struct RecordingLlm {
    requests: Mutex<Vec<CompletionRequest>>,
}

impl RecordingLlm {
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl LlmProvider for RecordingLlm {
    fn model_name(&self) -> &str {
        "recording"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.lock().unwrap().push(request);
        Ok(response("Соблюдайте заповеди.".into()))
    }
}

/// Fully wired dependencies over an in-memory store and a recording channel.
pub struct TestBot {
    pub deps: BotDeps,
    pub channel: Arc<RecordingChannel>,
    pub store: Arc<LibSqlBackend>,
}

impl TestBot {
    pub async fn new() -> Self {
        Self::build(Arc::new(EchoLlm), DEFAULT_OP_TIMEOUT, RecordingChannel::default()).await
    }

    pub async fn with_llm(llm: Arc<dyn LlmProvider>) -> Self {
        Self::build(llm, DEFAULT_OP_TIMEOUT, RecordingChannel::default()).await
    }

    pub async fn with_store_timeout(op_timeout: Duration) -> Self {
        Self::build(Arc::new(EchoLlm), op_timeout, RecordingChannel::default()).await
    }

    pub async fn with_events(events: Vec<IncomingEvent>) -> Self {
        Self::build(
            Arc::new(EchoLlm),
            DEFAULT_OP_TIMEOUT,
            RecordingChannel::with_events(events),
        )
        .await
    }

    async fn build(
        llm: Arc<dyn LlmProvider>,
        op_timeout: Duration,
        channel: RecordingChannel,
    ) -> Self {
        let store = Arc::new(
            LibSqlBackend::new_memory()
                .await
                .unwrap()
                .with_op_timeout(op_timeout),
        );
        let channel = Arc::new(channel);
        let deps = BotDeps {
            channel: channel.clone(),
            states: Arc::new(StateRegister::new()),
            store: store.clone(),
            llm,
            phone: Arc::new(RussianPhoneValidator::new()),
            content: ContentConfig::default(),
            provider_timeout: Duration::from_secs(5),
        };
        Self {
            deps,
            channel,
            store,
        }
    }

    pub fn set_provider_timeout(&mut self, timeout: Duration) {
        self.deps.provider_timeout = timeout;
    }
}
