//! Per-turn signals read from a user message.
//!
//! Intent, refusal and draft feedback are classified by a model elsewhere;
//! this module owns the vocabularies, the keyword shortcuts that skip the
//! model call, the typed parsing of its JSON, and the safe defaults used
//! when classification fails.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::extractor::{parse_json_object, ExtractedFields, ExtractionFailure, FieldParser};
use crate::domain::foundation::Confidence;

/// What the user is trying to do this turn (marketing consultation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intent {
    #[serde(rename = "정보_요청")]
    InformationRequest,
    #[serde(rename = "목표_설정")]
    GoalSetting,
    #[serde(rename = "타겟_분석")]
    TargetAnalysis,
    #[serde(rename = "전략_기획")]
    StrategyPlanning,
    #[serde(rename = "콘텐츠_생성")]
    ContentCreation,
    #[serde(rename = "피드백")]
    Feedback,
    #[serde(rename = "수정")]
    Revision,
    #[serde(rename = "일반_질문")]
    GeneralQuestion,
}

impl Intent {
    pub const ALL: [Intent; 8] = [
        Intent::InformationRequest,
        Intent::GoalSetting,
        Intent::TargetAnalysis,
        Intent::StrategyPlanning,
        Intent::ContentCreation,
        Intent::Feedback,
        Intent::Revision,
        Intent::GeneralQuestion,
    ];

    /// The Korean label used in prompts and model output.
    pub fn label(&self) -> &'static str {
        match self {
            Intent::InformationRequest => "정보_요청",
            Intent::GoalSetting => "목표_설정",
            Intent::TargetAnalysis => "타겟_분석",
            Intent::StrategyPlanning => "전략_기획",
            Intent::ContentCreation => "콘텐츠_생성",
            Intent::Feedback => "피드백",
            Intent::Revision => "수정",
            Intent::GeneralQuestion => "일반_질문",
        }
    }

    pub fn from_label(label: &str) -> Option<Intent> {
        let label = label.trim();
        Intent::ALL.into_iter().find(|i| i.label() == label)
    }

    /// True for intents that belong inside an open content session.
    /// Anything else while drafting is a topic shift.
    pub fn stays_in_content_session(&self) -> bool {
        matches!(
            self,
            Intent::ContentCreation | Intent::Feedback | Intent::Revision
        )
    }
}

/// Classified intent plus any fields the classifier pulled out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntentAnalysis {
    pub intent: Intent,
    pub confidence: Confidence,
    pub extracted: ExtractedFields,
}

impl IntentAnalysis {
    /// Used whenever classification fails.
    pub fn fallback() -> Self {
        Self {
            intent: Intent::GeneralQuestion,
            confidence: Confidence::FALLBACK,
            extracted: ExtractedFields::new(),
        }
    }

    /// Parses `{"intent": {"primary", "confidence"}, "extracted_info": {...}}`.
    ///
    /// A flat `"intent": "label"` is accepted as well. Unknown labels become
    /// a general question.
    pub fn parse(raw: &str, fields: &FieldParser) -> Result<Self, ExtractionFailure> {
        let map = parse_json_object(fields.sanitizer(), raw)?;

        let (label, confidence) = match map.get("intent") {
            Some(Value::Object(intent)) => (
                intent.get("primary").and_then(Value::as_str),
                intent.get("confidence").and_then(Value::as_f64),
            ),
            Some(Value::String(label)) => (
                Some(label.as_str()),
                map.get("confidence").and_then(Value::as_f64),
            ),
            _ => (None, None),
        };

        let extracted = match map.get("extracted_info") {
            Some(Value::Object(info)) => fields.fields_from_map(info),
            _ => ExtractedFields::new(),
        };

        Ok(Self {
            intent: label
                .and_then(Intent::from_label)
                .unwrap_or(Intent::GeneralQuestion),
            confidence: confidence
                .map(|c| Confidence::new(c as f32))
                .unwrap_or(Confidence::FALLBACK),
            extracted,
        })
    }
}

/// Flavour of a refusal or deflection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegativeKind {
    NoKnowledge,
    RequestSuggestion,
    Indifferent,
    Rejection,
    Neutral,
}

/// Whether the user declined to answer this turn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NegativeSignal {
    pub is_negative: bool,
    pub kind: NegativeKind,
    pub confidence: Confidence,
}

const NEGATIVE_KEYWORDS: [(&str, NegativeKind); 8] = [
    ("모르겠", NegativeKind::NoKnowledge),
    ("몰라", NegativeKind::NoKnowledge),
    ("알아서", NegativeKind::RequestSuggestion),
    ("추천해", NegativeKind::RequestSuggestion),
    ("니가 알려줘", NegativeKind::RequestSuggestion),
    ("상관없", NegativeKind::Indifferent),
    ("아무거나", NegativeKind::Indifferent),
    ("글쎄", NegativeKind::NoKnowledge),
];

impl NegativeSignal {
    /// Not negative; also the failure default.
    pub fn neutral() -> Self {
        Self {
            is_negative: false,
            kind: NegativeKind::Neutral,
            confidence: Confidence::ZERO,
        }
    }

    pub fn negative(kind: NegativeKind) -> Self {
        Self {
            is_negative: true,
            kind,
            confidence: Confidence::CERTAIN,
        }
    }

    /// Keyword shortcut; `None` means the model should decide.
    pub fn from_keywords(message: &str) -> Option<Self> {
        let compact: String = message.split_whitespace().collect::<Vec<_>>().join(" ");
        NEGATIVE_KEYWORDS
            .iter()
            .find(|(keyword, _)| compact.contains(keyword))
            .map(|(_, kind)| Self::negative(*kind))
    }

    /// Parses `{"is_negative": bool, "type": kind, "confidence": f}`.
    pub fn parse(raw: &str, fields: &FieldParser) -> Result<Self, ExtractionFailure> {
        let map = parse_json_object(fields.sanitizer(), raw)?;
        let is_negative = map
            .get("is_negative")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let kind = enum_field(&map, "type").unwrap_or(if is_negative {
            NegativeKind::NoKnowledge
        } else {
            NegativeKind::Neutral
        });
        let confidence = map
            .get("confidence")
            .and_then(Value::as_f64)
            .map(|c| Confidence::new(c as f32))
            .unwrap_or(Confidence::FALLBACK);
        Ok(Self {
            is_negative,
            kind,
            confidence,
        })
    }
}

/// What the user wants done with the current draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    Modify,
    Regenerate,
    NewContent,
    Approval,
    /// General comment; also the failure default.
    Feedback,
}

const APPROVAL_KEYWORDS: [&str; 5] = ["좋아요", "마음에 들어", "완벽", "확정", "이대로"];
const REGENERATE_KEYWORDS: [&str; 2] = ["다시", "새로"];

impl FeedbackKind {
    /// Keyword shortcut; `None` means the model should decide.
    pub fn from_keywords(message: &str) -> Option<Self> {
        if APPROVAL_KEYWORDS.iter().any(|k| message.contains(k)) {
            Some(FeedbackKind::Approval)
        } else if REGENERATE_KEYWORDS.iter().any(|k| message.contains(k)) {
            Some(FeedbackKind::Regenerate)
        } else {
            None
        }
    }

    /// Parses `{"request_type": kind, ...}`.
    pub fn parse(raw: &str, fields: &FieldParser) -> Result<Self, ExtractionFailure> {
        let map = parse_json_object(fields.sanitizer(), raw)?;
        Ok(enum_field(&map, "request_type").unwrap_or(FeedbackKind::Feedback))
    }

    /// True when a new draft should be produced. A general comment only
    /// asks the user to be more specific.
    pub fn wants_new_draft(&self) -> bool {
        matches!(
            self,
            FeedbackKind::Modify | FeedbackKind::Regenerate | FeedbackKind::NewContent
        )
    }
}

fn enum_field<T: for<'de> Deserialize<'de>>(map: &Map<String, Value>, key: &str) -> Option<T> {
    map.get(key)
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
}
