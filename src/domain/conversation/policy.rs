//! Stage transition policy.
//!
//! Runs once per turn after the signals and extraction are in. It mutates
//! the state (fields, counters, stage, content session) and returns the one
//! action the reply should carry out. It does no I/O, so the same state and
//! input always give the same result.

use serde::Serialize;

use super::extractor::{ExtractedFields, ExtractionResult};
use super::signals::{FeedbackKind, Intent, IntentAnalysis, NegativeSignal};
use super::stage_map::{GenerationStyle, Stage, StageKind};
use super::state::{ConversationState, InfoSource};

/// Everything learned about the user's message this turn.
#[derive(Debug, Clone)]
pub struct TurnInput {
    pub message: String,
    pub extraction: ExtractionResult,
    pub negative: NegativeSignal,
    /// Present only for domains that classify intent.
    pub intent: Option<IntentAnalysis>,
    /// Present only while a content session is open.
    pub feedback: Option<FeedbackKind>,
}

impl TurnInput {
    /// Input with no signals: nothing extracted, not negative.
    pub fn plain(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            extraction: ExtractionResult::Ok(ExtractedFields::new()),
            negative: NegativeSignal::neutral(),
            intent: None,
            feedback: None,
        }
    }

    fn intent(&self) -> Option<Intent> {
        self.intent.as_ref().map(|a| a.intent)
    }

    /// Extractor output, topped up with fields the intent classifier found.
    fn fields(&self) -> ExtractedFields {
        let mut fields = self.extraction.fields();
        if let Some(analysis) = &self.intent {
            fields.merge_missing(&analysis.extracted);
        }
        fields
    }
}

/// The single thing the reply must do this turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TurnAction {
    /// Stay in the stage and ask for the next unanswered field.
    AskQuestion {
        field: Option<&'static str>,
        question: &'static str,
    },
    /// Stop asking; give advice from what is known.
    ProvideSuggestions { informed: bool },
    /// Moved forward into another gathering stage.
    AdvanceStage { from: Stage, to: Stage },
    /// Produce the first draft or the report for `stage`.
    BeginGeneration { stage: Stage },
    /// Revise the current draft.
    ContinueContent { feedback: FeedbackKind },
    /// The draft was approved and the session archived.
    CompleteContent,
    /// Left a content session for an unrelated topic, then handled the turn.
    TopicShift {
        from: Stage,
        to: Stage,
        then: Box<TurnAction>,
    },
    /// The consultation is over.
    Closing,
}

impl TurnAction {
    /// Short name for logs and response metadata.
    pub fn name(&self) -> &'static str {
        match self {
            TurnAction::AskQuestion { .. } => "ask_question",
            TurnAction::ProvideSuggestions { .. } => "provide_suggestions",
            TurnAction::AdvanceStage { .. } => "advance_stage",
            TurnAction::BeginGeneration { .. } => "begin_generation",
            TurnAction::ContinueContent { .. } => "continue_content",
            TurnAction::CompleteContent => "complete_content",
            TurnAction::TopicShift { .. } => "topic_shift",
            TurnAction::Closing => "closing",
        }
    }
}

/// Per-turn decision function shared by every consultation domain.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransitionPolicy;

impl TransitionPolicy {
    pub fn decide(state: &mut ConversationState, input: &TurnInput) -> TurnAction {
        let fields = input.fields();

        if state.content_session().is_some() {
            let shifted = input
                .intent()
                .map_or(false, |intent| !intent.stays_in_content_session());
            if shifted {
                let from = state.stage();
                match state.regress_for_topic_shift() {
                    Ok(to) => {
                        let then = Self::decide_after_shift(state, input, &fields);
                        return TurnAction::TopicShift {
                            from,
                            to,
                            then: Box::new(then),
                        };
                    }
                    Err(_) => state.end_content_session(),
                }
            } else {
                return Self::decide_content(state, input);
            }
        }

        Self::decide_main(state, input, &fields)
    }

    fn decide_content(state: &mut ConversationState, input: &TurnInput) -> TurnAction {
        let feedback = input.feedback.unwrap_or(FeedbackKind::Feedback);
        if feedback == FeedbackKind::Approval {
            state.end_content_session();
            // Approval finishes the consultation; the stage after drafting is terminal.
            let _ = state.advance_stage();
            return TurnAction::CompleteContent;
        }
        state.record_content_feedback(input.message.as_str());
        TurnAction::ContinueContent { feedback }
    }

    /// Records the turn's negative signal and merges its fields. Returns
    /// suggestions when the refusal streak says to stop asking.
    fn absorb(
        state: &mut ConversationState,
        input: &TurnInput,
        fields: &ExtractedFields,
    ) -> Option<TurnAction> {
        if input.negative.is_negative {
            state.record_negative_response(input.message.as_str());
            if state.should_switch_to_suggestion_mode() {
                return Some(Self::suggest(state));
            }
        } else {
            state.reset_negative_responses();
        }

        for (key, value) in fields.iter() {
            let source = if input.message.contains(value) {
                InfoSource::UserStated
            } else {
                InfoSource::LlmInferred
            };
            state.add_collected_info(key, value, source);
        }
        None
    }

    /// The regressed stage holds for the rest of the turn.
    fn decide_after_shift(
        state: &mut ConversationState,
        input: &TurnInput,
        fields: &ExtractedFields,
    ) -> TurnAction {
        if let Some(action) = Self::absorb(state, input, fields) {
            return action;
        }
        if state.should_avoid_questions() {
            return Self::suggest(state);
        }
        Self::ask(state)
    }

    fn decide_main(
        state: &mut ConversationState,
        input: &TurnInput,
        fields: &ExtractedFields,
    ) -> TurnAction {
        let config = state.config();

        if let Some(action) = Self::absorb(state, input, fields) {
            return action;
        }

        if config.generation == GenerationStyle::Drafting
            && input.intent() == Some(Intent::ContentCreation)
            && state.has_sufficient_context_for_content()
            && state.has_info("channels")
        {
            if let Some(stage) = Self::generation_stage(state) {
                if state.stage() == stage || state.advance_to(stage).is_ok() {
                    state.start_content_session(input.message.as_str());
                    return TurnAction::BeginGeneration { stage };
                }
            }
        }

        let stage = state.stage();
        match stage.kind() {
            StageKind::Terminal => return TurnAction::Closing,
            StageKind::Generation => {
                if config.generation == GenerationStyle::Drafting {
                    state.start_content_session(input.message.as_str());
                }
                return TurnAction::BeginGeneration { stage };
            }
            StageKind::Gathering => {}
        }

        if state.should_avoid_questions() {
            return Self::suggest(state);
        }

        if let Some(target) = state.readiness_target() {
            let drafting_next = target.kind() == StageKind::Generation
                && config.generation == GenerationStyle::Drafting;
            if drafting_next {
                return Self::suggest(state);
            }
            if state.advance_to(target).is_ok() {
                return match target.kind() {
                    StageKind::Generation => TurnAction::BeginGeneration { stage: target },
                    StageKind::Terminal => TurnAction::Closing,
                    StageKind::Gathering => TurnAction::AdvanceStage {
                        from: stage,
                        to: target,
                    },
                };
            }
        }

        Self::ask(state)
    }

    fn ask(state: &mut ConversationState) -> TurnAction {
        state.switch_to_questioning_mode();
        let next = state.next_question();
        TurnAction::AskQuestion {
            field: next.field,
            question: next.text,
        }
    }

    fn suggest(state: &mut ConversationState) -> TurnAction {
        state.switch_to_suggestion_mode();
        TurnAction::ProvideSuggestions {
            informed: state.has_sufficient_info_for_suggestions(),
        }
    }

    fn generation_stage(state: &ConversationState) -> Option<Stage> {
        let config = state.config();
        config
            .stages
            .iter()
            .find(|s| s.kind == StageKind::Generation)
            .and_then(|s| config.stage(s.name))
    }
}
