//! The message orchestrator.
//!
//! One exchange runs, under the conversation's lock:
//! 1. Record the user turn
//! 2. Load the full history
//! 3. Prepend the system instruction
//! 4. Ask the completion service for a reply
//! 5. Record the reply and hand it back
//!
//! Store outages degrade the exchange instead of failing it. A failed
//! completion yields the configured failure message, which is returned to
//! the caller but never written to history.

use crate::config::OrchestratorConfig;
use crate::locks::ConversationLocks;
use rootcause::Report;
use std::sync::Arc;
use tracing::{Instrument, error, info, info_span, warn};
use visage_ai::{CompletionBackend, CompletionRequest, build_prompt};
use visage_core::{ConversationId, ExchangeId};
use visage_history::{HistoryError, HistoryStore, Message, MessageRole};

/// How an exchange ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// The model answered and the answer was recorded.
    Answered,
    /// The completion service failed; the text is the failure message.
    CompletionFailed,
}

/// The text to send back to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// The exchange that produced this reply.
    pub exchange_id: ExchangeId,
    /// Reply text.
    pub text: String,
    /// How the exchange ended.
    pub outcome: ReplyOutcome,
}

impl Reply {
    /// Returns true if the text came from the model.
    #[must_use]
    pub fn is_answered(&self) -> bool {
        self.outcome == ReplyOutcome::Answered
    }
}

/// Sequences history and completion calls for incoming messages.
pub struct Orchestrator {
    store: Arc<dyn HistoryStore>,
    backend: Arc<dyn CompletionBackend>,
    config: OrchestratorConfig,
    locks: ConversationLocks,
}

impl Orchestrator {
    /// Creates an orchestrator.
    pub fn new(
        store: Arc<dyn HistoryStore>,
        backend: Arc<dyn CompletionBackend>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            backend,
            config,
            locks: ConversationLocks::new(),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Answers one user message and returns just the reply text.
    pub async fn converse(&self, conversation_id: ConversationId, text: &str) -> String {
        self.process(conversation_id, text).await.text
    }

    /// Forgets the whole conversation.
    ///
    /// # Errors
    ///
    /// Returns the store error if the history could not be deleted.
    pub async fn reset(
        &self,
        conversation_id: ConversationId,
    ) -> Result<u64, Report<HistoryError>> {
        let _guard = self.locks.lock(conversation_id).await;
        match self.store.delete_all(conversation_id).await {
            Ok(removed) => {
                info!(%conversation_id, removed, "conversation history reset");
                Ok(removed)
            }
            Err(e) => {
                warn!(%conversation_id, operation = "reset", error = %e, "failed to reset history");
                Err(e)
            }
        }
    }

    /// Runs one exchange for `user_text`.
    ///
    /// Never fails: every error path is logged and mapped to a reply.
    pub async fn process(&self, conversation_id: ConversationId, user_text: &str) -> Reply {
        let exchange_id = ExchangeId::new();
        let span = info_span!("exchange", %conversation_id, %exchange_id);

        async move {
            let _guard = self.locks.lock(conversation_id).await;
            let history = self.record_and_load(conversation_id, user_text).await;

            let prompt = build_prompt(&self.config.system_instruction, &history);
            let mut request =
                CompletionRequest::new(prompt).with_max_tokens(self.config.max_tokens);
            if let Some(temperature) = self.config.temperature {
                request = request.with_temperature(temperature);
            }

            match self.backend.complete(&request).await {
                Ok(response) => {
                    if let Err(e) = self
                        .store
                        .append(conversation_id, MessageRole::Assistant, &response.content)
                        .await
                    {
                        warn!(
                            operation = "append_assistant",
                            error = %e,
                            "reply not recorded; history is incomplete"
                        );
                    }
                    info!(
                        history_len = history.len(),
                        output_tokens = response.usage.output_tokens,
                        "exchange answered"
                    );
                    Reply {
                        exchange_id,
                        text: response.content,
                        outcome: ReplyOutcome::Answered,
                    }
                }
                Err(e) => {
                    error!(model = self.backend.model(), error = %e, "completion failed");
                    Reply {
                        exchange_id,
                        text: self.config.failure_message.clone(),
                        outcome: ReplyOutcome::CompletionFailed,
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Records the user turn and returns the history to prompt with.
    ///
    /// If the history cannot be read, the exchange continues as if the
    /// conversation were new. The current question always ends the
    /// returned history, even when it could not be recorded.
    async fn record_and_load(
        &self,
        conversation_id: ConversationId,
        user_text: &str,
    ) -> Vec<Message> {
        let recorded = match self
            .store
            .append(conversation_id, MessageRole::User, user_text)
            .await
        {
            Ok(message) => Some(message),
            Err(e) => {
                warn!(
                    operation = "append_user",
                    error = %e,
                    "user message not recorded; history may be lost"
                );
                None
            }
        };

        let mut history = match self.store.get_all(conversation_id).await {
            Ok(history) => history,
            Err(e) => {
                warn!(
                    operation = "get_all",
                    error = %e,
                    "history unavailable; answering without context"
                );
                Vec::new()
            }
        };

        match recorded {
            None => history.push(Message::unsaved(conversation_id, MessageRole::User, user_text)),
            Some(turn) if history.is_empty() => history.push(turn),
            Some(_) => {}
        }
        history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_FAILURE_MESSAGE;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use visage_ai::{CompletionResponse, LlmError, TokenUsage};
    use visage_history::InMemoryHistoryStore;

    const PERSONA: &str = "You are a virtual makeup artist.";

    /// Completion backend answering from a script.
    struct StubBackend {
        answer: Result<String, LlmError>,
        delay: Duration,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl StubBackend {
        fn replying(text: &str) -> Self {
            Self {
                answer: Ok(text.to_string()),
                delay: Duration::ZERO,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn failing(error: LlmError) -> Self {
            Self {
                answer: Err(error),
                delay: Duration::ZERO,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionBackend for StubBackend {
        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> Result<CompletionResponse, Report<LlmError>> {
            self.requests.lock().unwrap().push(request.clone());
            tokio::time::sleep(self.delay).await;
            match &self.answer {
                Ok(text) => Ok(CompletionResponse {
                    content: text.clone(),
                    model: "stub".to_string(),
                    usage: TokenUsage::default(),
                    finish_reason: Some("stop".to_string()),
                }),
                Err(e) => Err(e.clone().into()),
            }
        }

        fn model(&self) -> &str {
            "stub"
        }
    }

    /// History store whose reads or writes can be switched off.
    #[derive(Default)]
    struct FlakyStore {
        inner: InMemoryHistoryStore,
        reads_fail: bool,
        writes_fail: bool,
    }

    fn unavailable(operation: &'static str) -> Report<HistoryError> {
        HistoryError::StoreUnavailable {
            operation,
            reason: "connection refused".to_string(),
        }
        .into()
    }

    #[async_trait]
    impl HistoryStore for FlakyStore {
        async fn init(&self) -> Result<(), Report<HistoryError>> {
            Ok(())
        }

        async fn append(
            &self,
            conversation_id: ConversationId,
            role: MessageRole,
            content: &str,
        ) -> Result<Message, Report<HistoryError>> {
            if self.writes_fail {
                return Err(unavailable("append"));
            }
            self.inner.append(conversation_id, role, content).await
        }

        async fn get_all(
            &self,
            conversation_id: ConversationId,
        ) -> Result<Vec<Message>, Report<HistoryError>> {
            if self.reads_fail {
                return Err(unavailable("get_all"));
            }
            self.inner.get_all(conversation_id).await
        }

        async fn delete_all(
            &self,
            conversation_id: ConversationId,
        ) -> Result<u64, Report<HistoryError>> {
            if self.writes_fail {
                return Err(unavailable("delete_all"));
            }
            self.inner.delete_all(conversation_id).await
        }
    }

    fn orchestrator(
        store: Arc<dyn HistoryStore>,
        backend: Arc<StubBackend>,
    ) -> Orchestrator {
        Orchestrator::new(
            store,
            backend,
            OrchestratorConfig::default().with_system_instruction(PERSONA),
        )
    }

    fn turns(history: &[Message]) -> Vec<(MessageRole, &str)> {
        history
            .iter()
            .map(|m| (m.role, m.content.as_str()))
            .collect()
    }

    #[tokio::test]
    async fn answer_is_recorded_after_question() {
        let store = Arc::new(InMemoryHistoryStore::new());
        let backend = Arc::new(StubBackend::replying("Use a color-correcting concealer."));
        let orchestrator = orchestrator(store.clone(), backend.clone());
        let id = ConversationId::new(42);

        let reply = orchestrator.process(id, "What helps dark circles?").await;

        assert!(reply.is_answered());
        assert_eq!(reply.text, "Use a color-correcting concealer.");
        let history = store.get_all(id).await.unwrap();
        assert_eq!(
            turns(&history),
            [
                (MessageRole::User, "What helps dark circles?"),
                (MessageRole::Assistant, "Use a color-correcting concealer."),
            ]
        );

        orchestrator.reset(id).await.unwrap();
        assert!(store.get_all(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn prompt_carries_instruction_and_full_history() {
        let store = Arc::new(InMemoryHistoryStore::new());
        let backend = Arc::new(StubBackend::replying("ok"));
        let orchestrator = orchestrator(store.clone(), backend.clone());
        let id = ConversationId::new(1);

        orchestrator.process(id, "first").await;
        orchestrator.process(id, "second").await;

        let requests = backend.requests();
        assert_eq!(requests.len(), 2);

        let last = &requests[1];
        assert_eq!(last.max_tokens, 1500);
        let roles: Vec<_> = last.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            [
                MessageRole::System,
                MessageRole::User,
                MessageRole::Assistant,
                MessageRole::User,
            ]
        );
        assert_eq!(last.messages[0].content, PERSONA);
        assert_eq!(last.messages[3].content, "second");
    }

    #[tokio::test]
    async fn failed_completion_is_not_recorded() {
        let store = Arc::new(InMemoryHistoryStore::new());
        let backend = Arc::new(StubBackend::failing(LlmError::MissingCredential {
            provider: "router.huggingface.co".to_string(),
        }));
        let orchestrator = orchestrator(store.clone(), backend);
        let id = ConversationId::new(5);

        let reply = orchestrator.process(id, "hello").await;

        assert_eq!(reply.outcome, ReplyOutcome::CompletionFailed);
        assert_eq!(reply.text, DEFAULT_FAILURE_MESSAGE);
        let history = store.get_all(id).await.unwrap();
        assert_eq!(turns(&history), [(MessageRole::User, "hello")]);
        assert!(history.iter().all(|m| m.content != DEFAULT_FAILURE_MESSAGE));
    }

    #[tokio::test]
    async fn failures_never_reach_later_prompts() {
        let store = Arc::new(InMemoryHistoryStore::new());
        let failing = Arc::new(StubBackend::failing(LlmError::Timeout));
        orchestrator(store.clone(), failing)
            .process(ConversationId::new(6), "first try")
            .await;

        let backend = Arc::new(StubBackend::replying("answer"));
        orchestrator(store.clone(), backend.clone())
            .process(ConversationId::new(6), "second try")
            .await;

        let prompt = &backend.requests()[0].messages;
        assert!(prompt.iter().all(|m| m.role != MessageRole::Assistant));
        assert_eq!(prompt.len(), 3);
    }

    #[tokio::test]
    async fn conversations_do_not_share_history() {
        let store = Arc::new(InMemoryHistoryStore::new());
        let backend = Arc::new(StubBackend::replying("ok"));
        let orchestrator = orchestrator(store.clone(), backend.clone());

        orchestrator.process(ConversationId::new(1), "from one").await;
        orchestrator.process(ConversationId::new(2), "from two").await;

        let second_prompt = &backend.requests()[1].messages;
        assert_eq!(second_prompt.len(), 2);
        assert_eq!(second_prompt[1].content, "from two");
    }

    #[tokio::test]
    async fn unreadable_history_still_answers_the_question() {
        let store = Arc::new(FlakyStore {
            reads_fail: true,
            ..FlakyStore::default()
        });
        let backend = Arc::new(StubBackend::replying("answer"));
        let orchestrator = orchestrator(store.clone(), backend.clone());

        let reply = orchestrator.process(ConversationId::new(3), "question").await;

        assert!(reply.is_answered());
        let prompt = &backend.requests()[0].messages;
        assert_eq!(prompt.len(), 2);
        assert_eq!(prompt[1].content, "question");
    }

    #[tokio::test]
    async fn unwritable_history_still_answers_the_question() {
        let store = Arc::new(FlakyStore {
            writes_fail: true,
            ..FlakyStore::default()
        });
        let backend = Arc::new(StubBackend::replying("answer"));
        let orchestrator = orchestrator(store.clone(), backend.clone());

        let text = orchestrator.converse(ConversationId::new(4), "question").await;

        assert_eq!(text, "answer");
        assert_eq!(backend.requests()[0].messages[1].content, "question");
        assert!(store.inner.get_all(ConversationId::new(4)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unrecorded_question_follows_existing_history() {
        let inner = InMemoryHistoryStore::new();
        let id = ConversationId::new(77);
        inner.append(id, MessageRole::User, "old question").await.unwrap();
        inner.append(id, MessageRole::Assistant, "old answer").await.unwrap();
        let store = Arc::new(FlakyStore {
            inner,
            writes_fail: true,
            ..FlakyStore::default()
        });
        let backend = Arc::new(StubBackend::replying("new answer"));
        let orchestrator = orchestrator(store.clone(), backend.clone());

        let reply = orchestrator.process(id, "new question").await;

        assert!(reply.is_answered());
        let prompt: Vec<_> = backend.requests()[0]
            .messages
            .iter()
            .map(|m| (m.role, m.content.clone()))
            .collect();
        assert_eq!(
            prompt,
            [
                (MessageRole::System, PERSONA.to_string()),
                (MessageRole::User, "old question".to_string()),
                (MessageRole::Assistant, "old answer".to_string()),
                (MessageRole::User, "new question".to_string()),
            ]
        );
        assert_eq!(store.inner.get_all(id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn configured_temperature_is_sent() {
        let store = Arc::new(InMemoryHistoryStore::new());
        let backend = Arc::new(StubBackend::replying("ok"));
        let orchestrator = Orchestrator::new(
            store,
            backend.clone(),
            OrchestratorConfig::default().with_temperature(Some(0.3)),
        );

        orchestrator.process(ConversationId::new(11), "hi").await;

        assert_eq!(backend.requests()[0].temperature, Some(0.3));
    }

    #[tokio::test]
    async fn reset_reports_store_failure() {
        let store = Arc::new(FlakyStore {
            writes_fail: true,
            ..FlakyStore::default()
        });
        let orchestrator = orchestrator(store, Arc::new(StubBackend::replying("x")));

        assert!(orchestrator.reset(ConversationId::new(8)).await.is_err());
    }

    #[tokio::test]
    async fn reset_of_unknown_conversation_succeeds() {
        let store = Arc::new(InMemoryHistoryStore::new());
        let orchestrator = orchestrator(store, Arc::new(StubBackend::replying("x")));

        assert_eq!(orchestrator.reset(ConversationId::new(9)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn concurrent_messages_in_one_conversation_are_serialized() {
        let store = Arc::new(InMemoryHistoryStore::new());
        let backend =
            Arc::new(StubBackend::replying("reply").with_delay(Duration::from_millis(20)));
        let orchestrator = orchestrator(store.clone(), backend.clone());
        let id = ConversationId::new(10);

        tokio::join!(
            orchestrator.process(id, "first"),
            orchestrator.process(id, "second"),
        );

        let history = store.get_all(id).await.unwrap();
        let roles: Vec<_> = history.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            [
                MessageRole::User,
                MessageRole::Assistant,
                MessageRole::User,
                MessageRole::Assistant,
            ]
        );

        let sizes: Vec<_> = backend
            .requests()
            .iter()
            .map(|r| r.messages.len())
            .collect();
        assert_eq!(sizes, [2, 4]);
    }
}
