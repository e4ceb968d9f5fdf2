//! Model-written replies: suggestions, drafts and reports.

use std::sync::Arc;

use crate::application::purpose;
use crate::domain::conversation::{ConversationState, FeedbackKind};
use crate::ports::{AIError, AIProvider, CompletionRequest, MessageRole, RequestMetadata};

use super::prompts;

/// Suggestion reply when the model is unavailable and enough is known.
pub const INFORMED_SUGGESTION_FALLBACK: &str =
    "지금까지의 정보를 바탕으로 맞춤형 전략을 추천해드리겠습니다!";

/// Suggestion reply when the model is unavailable and little is known.
pub const MINIMAL_SUGGESTION_FALLBACK: &str =
    "부담 갖지 않으셔도 괜찮아요! 어떤 업종에도 적용할 수 있는 기본 전략부터 추천해드릴게요.";

const SUGGESTION_MAX_TOKENS: u32 = 800;
const GENERATION_MAX_TOKENS: u32 = 1500;

/// Writes the free-form parts of a consultation reply.
pub struct ReplyWriter<P: ?Sized + AIProvider> {
    ai_provider: Arc<P>,
}

impl<P: ?Sized + AIProvider> ReplyWriter<P> {
    pub fn new(ai_provider: Arc<P>) -> Self {
        Self { ai_provider }
    }

    /// Never fails; falls back to a fixed line.
    pub async fn suggestions(&self, state: &ConversationState, informed: bool, message: &str) -> String {
        let result = self
            .write(
                state,
                purpose::SUGGESTIONS,
                prompts::suggestions(state, informed),
                message,
                SUGGESTION_MAX_TOKENS,
            )
            .await;
        match result {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    conversation_id = %state.conversation_id(),
                    error = %e,
                    "suggestion generation failed; using fallback"
                );
                if informed {
                    INFORMED_SUGGESTION_FALLBACK.to_string()
                } else {
                    MINIMAL_SUGGESTION_FALLBACK.to_string()
                }
            }
        }
    }

    /// First draft for the open content session.
    pub async fn draft(&self, state: &ConversationState, message: &str) -> Result<String, AIError> {
        let session = state
            .content_session()
            .ok_or_else(|| AIError::InvalidRequest("no open content session".to_string()))?;
        self.write(
            state,
            purpose::CONTENT,
            prompts::draft(state, session),
            message,
            GENERATION_MAX_TOKENS,
        )
        .await
    }

    pub async fn revise(
        &self,
        state: &ConversationState,
        feedback: FeedbackKind,
        message: &str,
    ) -> Result<String, AIError> {
        let session = state
            .content_session()
            .ok_or_else(|| AIError::InvalidRequest("no open content session".to_string()))?;
        self.write(
            state,
            purpose::CONTENT,
            prompts::revision(state, session, feedback),
            message,
            GENERATION_MAX_TOKENS,
        )
        .await
    }

    pub async fn analysis(&self, state: &ConversationState, message: &str) -> Result<String, AIError> {
        self.write(
            state,
            purpose::ANALYSIS,
            prompts::analysis(state),
            message,
            GENERATION_MAX_TOKENS,
        )
        .await
    }

    async fn write(
        &self,
        state: &ConversationState,
        purpose: &'static str,
        system: String,
        message: &str,
        max_tokens: u32,
    ) -> Result<String, AIError> {
        let request = CompletionRequest::new(RequestMetadata::new(
            state.user_id().clone(),
            state.conversation_id(),
            purpose,
        ))
        .with_system_prompt(system)
        .with_message(MessageRole::User, message)
        .with_max_tokens(max_tokens)
        .with_temperature(0.7);

        let response = self.ai_provider.complete(request).await?;
        let text = response.content.trim();
        if text.is_empty() {
            return Err(AIError::parse("empty completion"));
        }
        Ok(text.to_string())
    }
}
