//! Request/response bodies for the HTTP API.
//!
//! Turn envelopes (`UnifiedRequest`, `UnifiedResponse`) and reports are
//! serialized as-is from the domain; only the management endpoints have
//! bodies of their own.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::ConversationId;
use crate::domain::workflow::HistoryEntry;

/// Body of `PUT /routing/context-mode`.
#[derive(Debug, Clone, Deserialize)]
pub struct ContextModeRequest {
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextModeResponse {
    pub context_routing_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub conversation_id: ConversationId,
    pub count: usize,
    pub entries: Vec<HistoryEntry>,
}

impl HistoryResponse {
    pub fn new(conversation_id: ConversationId, entries: Vec<HistoryEntry>) -> Self {
        Self {
            conversation_id,
            count: entries.len(),
            entries,
        }
    }
}

/// Result of clearing history or resetting routing context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationCommandResponse {
    pub conversation_id: ConversationId,
    /// False when there was nothing to remove.
    pub changed: bool,
    pub message: String,
}

/// Error body for rejected requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: "BAD_REQUEST".to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn validation(message: impl Into<String>, details: serde_json::Value) -> Self {
        Self {
            code: "VALIDATION_FAILED".to_string(),
            message: message.into(),
            details: Some(details),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::routing::AgentType;

    #[test]
    fn history_response_counts_entries() {
        let response = HistoryResponse::new(
            ConversationId::new(),
            vec![
                HistoryEntry::user("안녕하세요"),
                HistoryEntry::assistant(AgentType::Marketing, "반갑습니다"),
            ],
        );
        assert_eq!(response.count, 2);
    }

    #[test]
    fn error_response_omits_missing_details() {
        let json = serde_json::to_value(ErrorResponse::bad_request("Invalid conversation ID")).unwrap();
        assert_eq!(json["code"], "BAD_REQUEST");
        assert!(json.get("details").is_none());
    }
}
