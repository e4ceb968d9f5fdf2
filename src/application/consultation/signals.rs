//! Turn signal analysis: intent, refusal and draft feedback.
//!
//! Keyword shortcuts run first and skip the model call. Every model failure
//! degrades to the neutral default for that signal.

use std::sync::Arc;

use crate::application::purpose;
use crate::domain::conversation::{
    ExtractionFailure, FeedbackKind, FieldParser, IntentAnalysis, NegativeSignal,
};
use crate::domain::foundation::{ConversationId, UserId};
use crate::ports::{AIProvider, CompletionRequest, MessageRole, RequestMetadata};

use super::prompts;

const SIGNAL_MAX_TOKENS: u32 = 300;

/// Classifies the per-turn signals for one consultation domain.
pub struct SignalAnalyzer<P: ?Sized + AIProvider> {
    ai_provider: Arc<P>,
    parser: FieldParser,
}

impl<P: ?Sized + AIProvider> SignalAnalyzer<P> {
    pub fn new(ai_provider: Arc<P>, parser: FieldParser) -> Self {
        Self { ai_provider, parser }
    }

    /// Intent classification; errors are returned to the caller.
    pub async fn classify_intent(
        &self,
        user_id: &UserId,
        conversation_id: ConversationId,
        message: &str,
        context: &str,
    ) -> Result<IntentAnalysis, ExtractionFailure> {
        let system = prompts::intent(self.parser.config(), context);
        let raw = self
            .ask(user_id, conversation_id, purpose::INTENT, system, message)
            .await?;
        IntentAnalysis::parse(&raw, &self.parser)
    }

    /// Intent classification with the general-question fallback.
    pub async fn analyze_intent(
        &self,
        user_id: &UserId,
        conversation_id: ConversationId,
        message: &str,
        context: &str,
    ) -> IntentAnalysis {
        self.classify_intent(user_id, conversation_id, message, context)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(conversation_id = %conversation_id, error = %e, "intent analysis failed");
                IntentAnalysis::fallback()
            })
    }

    pub async fn detect_negative_response(
        &self,
        user_id: &UserId,
        conversation_id: ConversationId,
        message: &str,
    ) -> NegativeSignal {
        if let Some(signal) = NegativeSignal::from_keywords(message) {
            tracing::debug!(conversation_id = %conversation_id, kind = ?signal.kind, "negative keyword matched");
            return signal;
        }
        let result = match self
            .ask(user_id, conversation_id, purpose::NEGATIVE, prompts::negative(), message)
            .await
        {
            Ok(raw) => NegativeSignal::parse(&raw, &self.parser),
            Err(e) => Err(e),
        };
        result.unwrap_or_else(|e| {
            tracing::warn!(conversation_id = %conversation_id, error = %e, "negative response detection failed");
            NegativeSignal::neutral()
        })
    }

    pub async fn classify_feedback(
        &self,
        user_id: &UserId,
        conversation_id: ConversationId,
        message: &str,
        last_draft: Option<&str>,
    ) -> FeedbackKind {
        if let Some(kind) = FeedbackKind::from_keywords(message) {
            return kind;
        }
        let result = match self
            .ask(
                user_id,
                conversation_id,
                purpose::FEEDBACK,
                prompts::feedback(last_draft),
                message,
            )
            .await
        {
            Ok(raw) => FeedbackKind::parse(&raw, &self.parser),
            Err(e) => Err(e),
        };
        result.unwrap_or_else(|e| {
            tracing::warn!(conversation_id = %conversation_id, error = %e, "feedback classification failed");
            FeedbackKind::Feedback
        })
    }

    async fn ask(
        &self,
        user_id: &UserId,
        conversation_id: ConversationId,
        purpose: &'static str,
        system: String,
        message: &str,
    ) -> Result<String, ExtractionFailure> {
        let request = CompletionRequest::new(RequestMetadata::new(
            user_id.clone(),
            conversation_id,
            purpose,
        ))
        .with_system_prompt(system)
        .with_message(MessageRole::User, message)
        .with_max_tokens(SIGNAL_MAX_TOKENS)
        .with_temperature(0.1)
        .expecting_json();

        self.ai_provider
            .complete(request)
            .await
            .map(|response| response.content)
            .map_err(|e| ExtractionFailure::provider(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::{MockAIProvider, MockError};
    use crate::domain::conversation::{DomainKind, Intent, NegativeKind};

    fn analyzer(provider: &MockAIProvider) -> SignalAnalyzer<MockAIProvider> {
        SignalAnalyzer::new(
            Arc::new(provider.clone()),
            FieldParser::new(DomainKind::Marketing.config()),
        )
    }

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    mod intent {
        use super::*;

        #[tokio::test]
        async fn parses_intent_and_fields() {
            let provider = MockAIProvider::new().with_purpose_response(
                purpose::INTENT,
                r#"{"intent": {"primary": "콘텐츠_생성", "confidence": 0.9}, "extracted_info": {"channels": "인스타그램"}}"#,
            );
            let analysis = analyzer(&provider)
                .analyze_intent(&user(), ConversationId::new(), "인스타 게시물 만들어줘", "")
                .await;

            assert_eq!(analysis.intent, Intent::ContentCreation);
            assert_eq!(analysis.extracted.get("channels"), Some("인스타그램"));
        }

        #[tokio::test]
        async fn failure_falls_back_to_general_question() {
            let provider = MockAIProvider::new().with_purpose_error(
                purpose::INTENT,
                MockError::Timeout { timeout_secs: 30 },
            );
            let analysis = analyzer(&provider)
                .analyze_intent(&user(), ConversationId::new(), "안녕", "")
                .await;
            assert_eq!(analysis, IntentAnalysis::fallback());
        }

        #[tokio::test]
        async fn classify_exposes_the_error() {
            let provider = MockAIProvider::new().with_purpose_response(purpose::INTENT, "no json here");
            let result = analyzer(&provider)
                .classify_intent(&user(), ConversationId::new(), "안녕", "")
                .await;
            assert!(result.is_err());
        }
    }

    mod negative {
        use super::*;

        #[tokio::test]
        async fn keyword_skips_model() {
            let provider = MockAIProvider::new();
            let signal = analyzer(&provider)
                .detect_negative_response(&user(), ConversationId::new(), "잘 모르겠어요")
                .await;

            assert!(signal.is_negative);
            assert_eq!(signal.kind, NegativeKind::NoKnowledge);
            assert_eq!(provider.call_count(), 0);
        }

        #[tokio::test]
        async fn model_decides_without_keyword() {
            let provider = MockAIProvider::new().with_purpose_response(
                purpose::NEGATIVE,
                r#"{"is_negative": true, "type": "rejection", "confidence": 0.8}"#,
            );
            let signal = analyzer(&provider)
                .detect_negative_response(&user(), ConversationId::new(), "그건 말하기 싫어요")
                .await;

            assert!(signal.is_negative);
            assert_eq!(signal.kind, NegativeKind::Rejection);
            assert_eq!(provider.calls_for(purpose::NEGATIVE), 1);
        }

        #[tokio::test]
        async fn failure_is_not_negative() {
            let provider = MockAIProvider::new().with_purpose_error(
                purpose::NEGATIVE,
                MockError::Network {
                    message: "reset".to_string(),
                },
            );
            let signal = analyzer(&provider)
                .detect_negative_response(&user(), ConversationId::new(), "카페입니다")
                .await;
            assert_eq!(signal, NegativeSignal::neutral());
        }
    }

    mod feedback {
        use super::*;

        #[tokio::test]
        async fn approval_keyword_skips_model() {
            let provider = MockAIProvider::new();
            let kind = analyzer(&provider)
                .classify_feedback(&user(), ConversationId::new(), "완벽해요 이대로 할게요", Some("초안"))
                .await;
            assert_eq!(kind, FeedbackKind::Approval);
            assert_eq!(provider.call_count(), 0);
        }

        #[tokio::test]
        async fn model_classifies_modification() {
            let provider = MockAIProvider::new()
                .with_purpose_response(purpose::FEEDBACK, r#"{"request_type": "modify"}"#);
            let kind = analyzer(&provider)
                .classify_feedback(&user(), ConversationId::new(), "톤을 더 밝게", Some("초안"))
                .await;
            assert_eq!(kind, FeedbackKind::Modify);
        }

        #[tokio::test]
        async fn failure_defaults_to_feedback() {
            let provider = MockAIProvider::new().with_purpose_error(
                purpose::FEEDBACK,
                MockError::AuthenticationFailed,
            );
            let kind = analyzer(&provider)
                .classify_feedback(&user(), ConversationId::new(), "음", None)
                .await;
            assert_eq!(kind, FeedbackKind::Feedback);
        }
    }
}
