//! Conversation domain module.
//!
//! Per-domain consultation state machines: the static stage tables, the
//! state each consultation carries, the typed parsing of model output, and
//! the transition policy that ties them together once per turn.

mod extractor;
mod policy;
mod signals;
mod stage_map;
mod state;

pub use extractor::{
    locate_json_object, parse_json_object, ExtractedFields, ExtractionFailure, ExtractionResult,
    FieldParser, ResponseSanitizer, SanitizationError, MAX_FIELD_CHARS, MAX_RESPONSE_LENGTH,
};
pub use policy::{TransitionPolicy, TurnAction, TurnInput};
pub use signals::{FeedbackKind, Intent, IntentAnalysis, NegativeKind, NegativeSignal};
pub use stage_map::{
    customer_service, marketing, CompletionRule, DomainConfig, DomainKind, FieldSpec,
    GenerationStyle, Regression, Requirement, Shortcut, Stage, StageKind, StageSpec,
    CLOSING_QUESTION,
};
pub(crate) use state::preview;
pub use state::{
    CollectedValue, ContentSession, ConversationMode, ConversationProgress, ConversationState,
    EngagementLevel, InfoSource, NextQuestion, StageTransitionError, SuggestedAction, TurnRecord,
    TurnRole, MAX_TURN_HISTORY,
};
