//! In-process consultation agent.
//!
//! Serves one consultation domain behind the [`AgentClient`] port. Each turn
//! works on a copy of the stored state: signals and extraction are read,
//! the transition policy decides, the reply is rendered, and only then is
//! the state written back. A turn that fails leaves the stored state as it
//! was.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

use crate::domain::conversation::{
    ConversationState, DomainKind, FieldParser, GenerationStyle, NegativeSignal, TransitionPolicy,
    TurnAction, TurnInput, TurnRole,
};
use crate::domain::foundation::{Confidence, ConversationId};
use crate::domain::routing::AgentType;
use crate::domain::workflow::{AgentRequest, AgentResponse};
use crate::ports::{AIProvider, AgentClient, AgentError, MessageStore, SenderType, SessionStore};

use super::extraction::InformationExtractor;
use super::replies::ReplyWriter;
use super::signals::SignalAnalyzer;

/// Reply to a general comment on a draft.
pub const FEEDBACK_ACKNOWLEDGEMENT: &str =
    "피드백 감사합니다! 어떤 부분을 어떻게 바꾸면 좋을지 조금 더 구체적으로 말씀해주세요.";

/// Reply once a draft is approved.
pub const CONTENT_COMPLETED: &str = "컨텐츠 제작이 완료되었습니다!";

const DEFAULT_IDLE_MINUTES: i64 = 60;

/// Multi-turn specialist for one [`DomainKind`].
pub struct ConsultationAgent<P: ?Sized + AIProvider> {
    domain: DomainKind,
    states: Arc<dyn SessionStore<ConversationState>>,
    messages: Arc<dyn MessageStore>,
    extractor: InformationExtractor<P>,
    signals: SignalAnalyzer<P>,
    replies: ReplyWriter<P>,
    idle_minutes: i64,
}

impl<P: ?Sized + AIProvider + 'static> ConsultationAgent<P> {
    pub fn new(
        domain: DomainKind,
        ai_provider: Arc<P>,
        states: Arc<dyn SessionStore<ConversationState>>,
        messages: Arc<dyn MessageStore>,
    ) -> Self {
        let parser = FieldParser::new(domain.config());
        Self {
            domain,
            states,
            messages,
            extractor: InformationExtractor::new(Arc::clone(&ai_provider), parser.clone()),
            signals: SignalAnalyzer::new(Arc::clone(&ai_provider), parser),
            replies: ReplyWriter::new(ai_provider),
            idle_minutes: DEFAULT_IDLE_MINUTES,
        }
    }

    /// State older than this is discarded on the next turn.
    pub fn with_idle_minutes(mut self, minutes: i64) -> Self {
        self.idle_minutes = minutes;
        self
    }

    pub fn domain(&self) -> DomainKind {
        self.domain
    }

    /// Stored state for a conversation, if any.
    pub async fn state(&self, conversation_id: &ConversationId) -> Option<ConversationState> {
        self.states.get(conversation_id).await
    }

    async fn load_state(&self, request: &AgentRequest) -> ConversationState {
        let fresh = || {
            ConversationState::new(request.conversation_id, request.user_id.clone(), self.domain)
        };
        match self.states.get(&request.conversation_id).await {
            Some(state) if state.domain() != self.domain => {
                tracing::warn!(
                    conversation_id = %request.conversation_id,
                    domain = %self.domain,
                    stored = %state.domain(),
                    "stored consultation belongs to another domain; starting over"
                );
                fresh()
            }
            Some(state) if !state.is_expired(self.idle_minutes) => state,
            Some(_) => {
                tracing::info!(
                    conversation_id = %request.conversation_id,
                    domain = %self.domain,
                    "consultation expired; starting over"
                );
                fresh()
            }
            None => {
                tracing::info!(
                    conversation_id = %request.conversation_id,
                    domain = %self.domain,
                    "consultation started"
                );
                fresh()
            }
        }
    }

    /// Reads every signal for the turn concurrently.
    async fn read_turn(&self, state: &ConversationState, request: &AgentRequest) -> TurnInput {
        let user_id = &request.user_id;
        let conversation_id = request.conversation_id;
        let message = request.message.as_str();
        let config = state.config();
        let drafting = state.content_session().is_some();
        let context = state.context_summary();

        let intent = async {
            if !config.analyze_intent {
                None
            } else if drafting {
                // An unreadable intent must not look like a topic shift.
                self.signals
                    .classify_intent(user_id, conversation_id, message, &context)
                    .await
                    .map_err(|e| {
                        tracing::warn!(conversation_id = %conversation_id, error = %e, "intent analysis failed");
                    })
                    .ok()
            } else {
                Some(
                    self.signals
                        .analyze_intent(user_id, conversation_id, message, &context)
                        .await,
                )
            }
        };
        let negative = async {
            if drafting {
                NegativeSignal::neutral()
            } else if config.analyze_intent {
                self.signals
                    .detect_negative_response(user_id, conversation_id, message)
                    .await
            } else {
                NegativeSignal::from_keywords(message).unwrap_or_else(NegativeSignal::neutral)
            }
        };
        let feedback = async {
            match state.content_session() {
                Some(session) => Some(
                    self.signals
                        .classify_feedback(
                            user_id,
                            conversation_id,
                            message,
                            session.last_content.as_deref(),
                        )
                        .await,
                ),
                None => None,
            }
        };
        let extraction = self.extractor.extract(user_id, conversation_id, message);

        let (intent, negative, feedback, extraction) =
            tokio::join!(intent, negative, feedback, extraction);

        TurnInput {
            message: message.to_string(),
            extraction,
            negative,
            intent,
            feedback,
        }
    }

    async fn render(
        &self,
        state: &mut ConversationState,
        action: &TurnAction,
        message: &str,
    ) -> Result<String, AgentError> {
        let agent = AgentType::from(self.domain);
        let mut action = action;
        while let TurnAction::TopicShift { from, to, then } = action {
            tracing::info!(
                conversation_id = %state.conversation_id(),
                from = %from,
                to = %to,
                "topic shift closed the content session"
            );
            action = then.as_ref();
        }

        match action {
            TurnAction::AskQuestion { question, .. } => Ok(question.to_string()),
            TurnAction::AdvanceStage { from, to } => {
                tracing::info!(
                    conversation_id = %state.conversation_id(),
                    from = %from,
                    to = %to,
                    "stage advanced"
                );
                Ok(state.next_question().text.to_string())
            }
            TurnAction::ProvideSuggestions { informed } => {
                Ok(self.replies.suggestions(state, *informed, message).await)
            }
            TurnAction::BeginGeneration { stage } => {
                let output = match state.config().generation {
                    GenerationStyle::Drafting => self.replies.draft(state, message).await,
                    GenerationStyle::Report => self.replies.analysis(state, message).await,
                }
                .map_err(|e| {
                    tracing::error!(
                        conversation_id = %state.conversation_id(),
                        stage = %stage,
                        error = %e,
                        "generation failed"
                    );
                    AgentError::generation(agent, e.to_string())
                })?;
                state.record_generation(output.as_str());
                Ok(output)
            }
            TurnAction::ContinueContent { feedback } if feedback.wants_new_draft() => {
                let draft = self
                    .replies
                    .revise(state, *feedback, message)
                    .await
                    .map_err(|e| AgentError::generation(agent, e.to_string()))?;
                state.record_generation(draft.as_str());
                Ok(draft)
            }
            TurnAction::ContinueContent { .. } => Ok(FEEDBACK_ACKNOWLEDGEMENT.to_string()),
            TurnAction::CompleteContent => Ok(CONTENT_COMPLETED.to_string()),
            TurnAction::Closing | TurnAction::TopicShift { .. } => {
                Ok(state.config().closing_message.to_string())
            }
        }
    }

    fn persist_messages(&self, conversation_id: ConversationId, user_message: String, reply: String) {
        let store = Arc::clone(&self.messages);
        let agent = AgentType::from(self.domain);
        tokio::spawn(async move {
            let saved = match store
                .save_message(conversation_id, &user_message, SenderType::User, None)
                .await
            {
                Ok(()) => {
                    store
                        .save_message(conversation_id, &reply, SenderType::Agent, Some(agent))
                        .await
                }
                Err(e) => Err(e),
            };
            if let Err(e) = saved {
                tracing::warn!(conversation_id = %conversation_id, error = %e, "failed to persist messages");
            }
        });
    }
}

#[async_trait]
impl<P: ?Sized + AIProvider + 'static> AgentClient for ConsultationAgent<P> {
    fn agent_type(&self) -> AgentType {
        AgentType::from(self.domain)
    }

    async fn process(&self, request: AgentRequest) -> Result<AgentResponse, AgentError> {
        let started = Instant::now();
        let conversation_id = request.conversation_id;

        let mut state = self.load_state(&request).await;
        state.add_message(TurnRole::User, request.message.as_str());

        let input = self.read_turn(&state, &request).await;
        let action = TransitionPolicy::decide(&mut state, &input);
        tracing::debug!(
            conversation_id = %conversation_id,
            domain = %self.domain,
            action = action.name(),
            stage = %state.stage(),
            "turn decided"
        );

        let reply = self.render(&mut state, &action, &request.message).await?;

        state.add_message(TurnRole::Assistant, reply.as_str());
        state.touch();
        let progress = state.progress();
        self.states.put(conversation_id, state).await;
        self.persist_messages(conversation_id, request.message, reply.clone());

        let mut response = AgentResponse::new(self.agent_type(), reply)
            .with_confidence(Confidence::new(0.85))
            .with_metadata("stage", json!(progress.stage.name()))
            .with_metadata("action", json!(action.name()))
            .with_metadata("completion_rate", json!(progress.completion_rate))
            .with_metadata("progress", serde_json::to_value(&progress).unwrap_or_default());
        response.processing_time = started.elapsed().as_secs_f64();
        Ok(response)
    }

    async fn health_check(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::{MockAIProvider, MockError};
    use crate::adapters::storage::{InMemoryMessageStore, InMemorySessionStore};
    use crate::application::purpose;
    use crate::domain::conversation::{customer_service, marketing, ConversationMode};
    use crate::domain::foundation::UserId;
    use std::time::Duration;

    struct Fixture {
        provider: MockAIProvider,
        states: Arc<InMemorySessionStore<ConversationState>>,
        messages: Arc<InMemoryMessageStore>,
    }

    impl Fixture {
        fn new(provider: MockAIProvider) -> Self {
            Self {
                provider,
                states: Arc::new(InMemorySessionStore::new(100, Duration::from_secs(3600))),
                messages: Arc::new(InMemoryMessageStore::new()),
            }
        }

        fn agent(&self, domain: DomainKind) -> ConsultationAgent<MockAIProvider> {
            ConsultationAgent::new(
                domain,
                Arc::new(self.provider.clone()),
                self.states.clone(),
                self.messages.clone(),
            )
        }
    }

    fn request(conversation_id: ConversationId, message: &str) -> AgentRequest {
        AgentRequest::new(UserId::new("user-1").unwrap(), conversation_id, message)
    }

    #[tokio::test]
    async fn state_from_another_domain_is_not_continued() {
        let provider = MockAIProvider::new()
            .with_purpose_response(purpose::EXTRACTION, r#"{"business_type": "카페"}"#);
        let fixture = Fixture::new(provider);
        let marketing_agent = fixture.agent(DomainKind::Marketing);
        let service_agent = fixture.agent(DomainKind::CustomerService);
        let id = ConversationId::new();

        let first = marketing_agent
            .process(request(id, "저는 카페를 운영해요"))
            .await
            .unwrap();
        assert_eq!(first.metadata["stage"], marketing::GOAL);

        let second = service_agent
            .process(request(id, "고객 리뷰 불만이 많아요"))
            .await
            .unwrap();

        assert_eq!(second.agent_type, AgentType::CustomerService);
        assert_ne!(second.metadata["stage"], marketing::GOAL);
        let state = service_agent.state(&id).await.unwrap();
        assert_eq!(state.domain(), DomainKind::CustomerService);
        assert!(state.get_info("business_type").is_none());
    }

    mod marketing_flow {
        use super::*;

        #[tokio::test]
        async fn first_turn_asks_for_the_business_type() {
            let fixture = Fixture::new(MockAIProvider::new());
            let agent = fixture.agent(DomainKind::Marketing);
            let id = ConversationId::new();

            let response = agent.process(request(id, "마케팅 도와주세요")).await.unwrap();

            assert_eq!(response.agent_type, AgentType::Marketing);
            assert_eq!(response.metadata["action"], "ask_question");
            let state = agent.state(&id).await.unwrap();
            assert_eq!(state.history_len(), 2);
            assert!(state.stage().is(marketing::INITIAL));
        }

        #[tokio::test]
        async fn extracted_business_type_advances_the_stage() {
            let provider = MockAIProvider::new()
                .with_purpose_response(purpose::EXTRACTION, r#"{"business_type": "카페"}"#)
                .with_purpose_response(
                    purpose::INTENT,
                    r#"{"intent": {"primary": "정보_요청", "confidence": 0.8}}"#,
                )
                .with_purpose_response(purpose::NEGATIVE, r#"{"is_negative": false}"#);
            let fixture = Fixture::new(provider);
            let agent = fixture.agent(DomainKind::Marketing);
            let id = ConversationId::new();

            let response = agent.process(request(id, "카페를 운영하고 있어요")).await.unwrap();

            assert_eq!(response.metadata["action"], "advance_stage");
            assert_eq!(response.metadata["stage"], marketing::GOAL);
            let state = agent.state(&id).await.unwrap();
            assert_eq!(state.get_info("business_type"), Some("카페"));
        }

        #[tokio::test]
        async fn repeated_refusals_switch_to_suggestions() {
            let provider = MockAIProvider::new()
                .with_purpose_response(purpose::SUGGESTIONS, "추천 전략입니다");
            let fixture = Fixture::new(provider.clone());
            let agent = fixture.agent(DomainKind::Marketing);
            let id = ConversationId::new();

            agent.process(request(id, "모르겠어요")).await.unwrap();
            let response = agent.process(request(id, "알아서 해주세요")).await.unwrap();

            assert_eq!(response.metadata["action"], "provide_suggestions");
            assert_eq!(response.response, "추천 전략입니다");
            let state = agent.state(&id).await.unwrap();
            assert_eq!(state.mode(), ConversationMode::Suggesting);
            assert_eq!(provider.calls_for(purpose::NEGATIVE), 0);
        }

        #[tokio::test]
        async fn failed_draft_leaves_state_untouched() {
            let provider = MockAIProvider::new()
                .with_purpose_response(
                    purpose::EXTRACTION,
                    r#"{"business_type": "카페", "product": "커피", "main_goal": "매출 증대", "target_audience": "20대", "channels": "인스타그램"}"#,
                )
                .with_purpose_response(
                    purpose::INTENT,
                    r#"{"intent": {"primary": "콘텐츠_생성", "confidence": 0.9}}"#,
                )
                .with_purpose_response(purpose::NEGATIVE, r#"{"is_negative": false}"#)
                .with_purpose_error(
                    purpose::CONTENT,
                    MockError::Unavailable {
                        message: "overloaded".to_string(),
                    },
                );
            let fixture = Fixture::new(provider);
            let agent = fixture.agent(DomainKind::Marketing);
            let id = ConversationId::new();

            let err = agent
                .process(request(id, "인스타그램 홍보 글 만들어줘"))
                .await
                .unwrap_err();

            assert!(matches!(err, AgentError::Generation { agent: AgentType::Marketing, .. }));
            assert!(agent.state(&id).await.is_none());
        }

        #[tokio::test]
        async fn content_request_opens_a_session_and_approval_completes_it() {
            let provider = MockAIProvider::new()
                .with_purpose_response(
                    purpose::EXTRACTION,
                    r#"{"business_type": "카페", "product": "커피", "main_goal": "매출 증대", "target_audience": "20대", "channels": "인스타그램"}"#,
                )
                .with_purpose_response(
                    purpose::INTENT,
                    r#"{"intent": {"primary": "콘텐츠_생성", "confidence": 0.9}}"#,
                )
                .with_purpose_response(
                    purpose::INTENT,
                    r#"{"intent": {"primary": "피드백", "confidence": 0.9}}"#,
                )
                .with_purpose_response(purpose::NEGATIVE, r#"{"is_negative": false}"#)
                .with_purpose_response(purpose::CONTENT, "☕ 오늘의 라떼");
            let fixture = Fixture::new(provider);
            let agent = fixture.agent(DomainKind::Marketing);
            let id = ConversationId::new();

            let first = agent
                .process(request(id, "인스타그램 홍보 글 만들어줘"))
                .await
                .unwrap();
            assert_eq!(first.response, "☕ 오늘의 라떼");
            assert_eq!(first.metadata["stage"], marketing::CONTENT_CREATION);

            let second = agent.process(request(id, "완벽해요, 확정할게요")).await.unwrap();
            assert_eq!(second.response, CONTENT_COMPLETED);
            let state = agent.state(&id).await.unwrap();
            assert!(state.content_session().is_none());
            assert_eq!(state.content_history().len(), 1);
            assert!(state.stage().is(marketing::COMPLETED));
        }
    }

    mod customer_service_flow {
        use super::*;

        #[tokio::test]
        async fn complete_information_triggers_the_report() {
            let provider = MockAIProvider::new()
                .with_purpose_response(
                    purpose::EXTRACTION,
                    r#"{"business_type": "온라인 쇼핑몰", "desired_outcome": "재구매율 향상", "customer_issue": "배송 지연 불만"}"#,
                )
                .with_purpose_response(purpose::ANALYSIS, "분석 보고서");
            let fixture = Fixture::new(provider.clone());
            let agent = fixture.agent(DomainKind::CustomerService);
            let id = ConversationId::new();

            let response = agent
                .process(request(id, "쇼핑몰인데 배송 지연 불만이 많아 재구매율을 높이고 싶어요"))
                .await
                .unwrap();

            assert_eq!(response.response, "분석 보고서");
            assert_eq!(response.agent_type, AgentType::CustomerService);
            assert_eq!(provider.calls_for(purpose::INTENT), 0);
            let state = agent.state(&id).await.unwrap();
            assert!(state.stage().is(customer_service::COMPLETED));

            let closing = agent.process(request(id, "감사합니다")).await.unwrap();
            assert_eq!(closing.metadata["action"], "closing");
            assert_eq!(closing.response, DomainKind::CustomerService.config().closing_message);
        }
    }

    #[tokio::test]
    async fn messages_are_persisted_in_the_background() {
        let fixture = Fixture::new(MockAIProvider::new());
        let agent = fixture.agent(DomainKind::CustomerService);
        let id = ConversationId::new();

        agent.process(request(id, "안녕하세요")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let history = fixture.messages.get_history(id, 10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].sender_type, SenderType::User);
        assert_eq!(history[1].agent_type, Some(AgentType::CustomerService));
    }

    #[tokio::test]
    async fn failing_message_store_does_not_fail_the_turn() {
        let fixture = Fixture::new(MockAIProvider::new());
        fixture.messages.fail_saves(true);
        let agent = fixture.agent(DomainKind::Marketing);

        let result = agent.process(request(ConversationId::new(), "안녕하세요")).await;
        assert!(result.is_ok());
    }
}
