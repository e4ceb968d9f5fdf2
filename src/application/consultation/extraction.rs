//! Information extractor.
//!
//! One model call per turn that pulls the domain's fields out of the user's
//! free text. A failed call or unusable output yields
//! [`ExtractionResult::Failed`], which the policy treats as "nothing new".

use std::sync::Arc;

use crate::domain::conversation::{ExtractionFailure, ExtractionResult, FieldParser};
use crate::domain::foundation::{ConversationId, UserId};
use crate::ports::{AIProvider, CompletionRequest, MessageRole, RequestMetadata};

use super::prompts;
use crate::application::purpose;

const EXTRACTION_MAX_TOKENS: u32 = 500;

/// Extracts structured fields for one consultation domain.
pub struct InformationExtractor<P: ?Sized + AIProvider> {
    ai_provider: Arc<P>,
    parser: FieldParser,
}

impl<P: ?Sized + AIProvider> InformationExtractor<P> {
    pub fn new(ai_provider: Arc<P>, parser: FieldParser) -> Self {
        Self { ai_provider, parser }
    }

    /// Single attempt; never errors.
    pub async fn extract(
        &self,
        user_id: &UserId,
        conversation_id: ConversationId,
        message: &str,
    ) -> ExtractionResult {
        let mut request = CompletionRequest::new(RequestMetadata::new(
            user_id.clone(),
            conversation_id,
            purpose::EXTRACTION,
        ))
        .with_system_prompt(prompts::extraction(self.parser.config()))
        .with_message(MessageRole::User, message)
        .with_max_tokens(EXTRACTION_MAX_TOKENS)
        .with_temperature(0.1);
        // Providers without a JSON mode still get the JSON-only prompt.
        if self.ai_provider.provider_info().supports_json_output {
            request = request.expecting_json();
        }

        let result = match self.ai_provider.complete(request).await {
            Ok(response) => self.parser.parse(&response.content),
            Err(e) => ExtractionResult::Failed(ExtractionFailure::provider(e.to_string())),
        };

        match &result {
            ExtractionResult::Ok(fields) => {
                tracing::debug!(
                    conversation_id = %conversation_id,
                    fields = fields.len(),
                    "extracted fields"
                );
            }
            ExtractionResult::Failed(failure) => {
                tracing::warn!(
                    conversation_id = %conversation_id,
                    error = %failure,
                    "information extraction failed"
                );
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::{MockAIProvider, MockError};
    use crate::domain::conversation::DomainKind;
    use crate::ports::ProviderInfo;

    fn extractor(provider: MockAIProvider) -> InformationExtractor<MockAIProvider> {
        InformationExtractor::new(
            Arc::new(provider),
            FieldParser::new(DomainKind::Marketing.config()),
        )
    }

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    #[tokio::test]
    async fn keeps_known_fields_from_fenced_json() {
        let provider = MockAIProvider::new().with_purpose_response(
            purpose::EXTRACTION,
            "```json\n{\"business_type\": \"카페\", \"favorite_color\": \"blue\", \"budget\": null}\n```",
        );
        let result = extractor(provider)
            .extract(&user(), ConversationId::new(), "카페를 운영해요")
            .await;

        let fields = result.fields();
        assert_eq!(fields.get("business_type"), Some("카페"));
        assert!(!fields.contains("favorite_color"));
        assert!(!fields.contains("budget"));
    }

    #[tokio::test]
    async fn provider_error_yields_failure() {
        let provider = MockAIProvider::new().with_purpose_error(
            purpose::EXTRACTION,
            MockError::Unavailable {
                message: "down".to_string(),
            },
        );
        let result = extractor(provider)
            .extract(&user(), ConversationId::new(), "안녕하세요")
            .await;

        assert!(matches!(result.failure(), Some(ExtractionFailure::Provider(_))));
        assert!(result.fields().is_empty());
    }

    #[tokio::test]
    async fn prose_output_yields_failure() {
        let provider = MockAIProvider::new().with_purpose_response(purpose::EXTRACTION, "잘 모르겠습니다");
        let result = extractor(provider)
            .extract(&user(), ConversationId::new(), "안녕하세요")
            .await;
        assert_eq!(result.failure(), Some(&ExtractionFailure::NoJson));
    }

    #[tokio::test]
    async fn requests_json_with_field_list() {
        let provider = MockAIProvider::new();
        let extractor = extractor(provider.clone());
        extractor.extract(&user(), ConversationId::new(), "카페").await;

        let call = &provider.get_calls()[0];
        assert!(call.json_output);
        assert_eq!(call.metadata.purpose, purpose::EXTRACTION);
        assert!(call.system_prompt.as_deref().unwrap().contains("target_audience"));
    }

    #[tokio::test]
    async fn plain_text_provider_gets_no_json_mode() {
        let provider = MockAIProvider::new()
            .with_provider_info(ProviderInfo::new("local", "plain-model", 8_000));
        let extractor = extractor(provider.clone());
        extractor.extract(&user(), ConversationId::new(), "카페").await;

        let call = &provider.get_calls()[0];
        assert!(!call.json_output);
        assert!(call.system_prompt.as_deref().unwrap().contains("business_type"));
    }
}
