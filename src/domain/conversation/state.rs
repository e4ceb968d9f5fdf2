//! Per-domain consultation state.
//!
//! One `ConversationState` exists per `(domain, conversation)` pair. It holds
//! what has been collected, where the consultation is in its stage list,
//! the fatigue counters that decide when to stop asking questions, a bounded
//! turn history, and the optional content-drafting sub-session.

use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use thiserror::Error;

use crate::domain::foundation::{ConversationId, StateMachine, Timestamp, UserId};

use super::stage_map::{
    CompletionRule, DomainConfig, DomainKind, Requirement, Stage, StageKind, CLOSING_QUESTION,
};

/// Maximum turn records kept per consultation.
pub const MAX_TURN_HISTORY: usize = 15;

/// Fields whose collection marks a topic as covered.
const TOPIC_FIELDS: [&str; 4] = ["business_type", "product", "main_goal", "target_audience"];

/// Errors raised by invalid stage moves.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StageTransitionError {
    #[error("stage '{0}' is terminal")]
    Terminal(&'static str),

    #[error("cannot move from '{from}' to '{to}'")]
    NotAllowed {
        from: &'static str,
        to: &'static str,
    },

    #[error("no topic-shift regression configured from '{0}'")]
    NoRegression(&'static str),
}

/// Where a collected value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InfoSource {
    UserStated,
    LlmInferred,
}

/// A collected field value with provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectedValue {
    pub value: String,
    pub source: InfoSource,
    pub collected_at: Timestamp,
    /// User-turn depth at which the value was recorded.
    pub turn: u32,
}

/// How eager the user currently is to answer questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementLevel {
    Low,
    Medium,
    High,
}

/// What the consultation is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationMode {
    Questioning,
    Suggesting,
    ContentCreation,
}

/// Speaker of a turn record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One entry of the bounded consultation history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnRecord {
    pub role: TurnRole,
    pub content: String,
    pub timestamp: Timestamp,
    pub stage: Stage,
}

/// An in-progress content drafting sub-dialogue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentSession {
    pub initial_request: String,
    pub created_at: Timestamp,
    pub iteration_count: u32,
    pub last_content: Option<String>,
    pub last_feedback: Option<String>,
    /// Snapshot of collected info when the session started.
    pub context_info: BTreeMap<String, String>,
}

/// Next action hint derived from the counters and completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    ProvideSuggestions,
    CreateContent,
    AdvanceStage,
    GatherInfo,
}

/// The question to ask next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextQuestion {
    /// Field being asked for; `None` for the closing prompt.
    pub field: Option<&'static str>,
    pub text: &'static str,
}

/// Read-only snapshot of consultation progress.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationProgress {
    pub domain: DomainKind,
    pub stage: Stage,
    pub mode: ConversationMode,
    pub depth: u32,
    pub completion_rate: f32,
    pub information_complete: bool,
    pub engagement_level: EngagementLevel,
    pub question_fatigue: u32,
    pub negative_responses: u32,
    pub topics_covered: Vec<String>,
    pub missing_fields: Vec<&'static str>,
    pub ready_for_next_stage: bool,
    pub suggested_next_action: SuggestedAction,
}

/// Multi-turn consultation state for one specialist domain.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationState {
    conversation_id: ConversationId,
    user_id: UserId,
    domain: DomainKind,
    stage: Stage,
    mode: ConversationMode,
    collected_info: BTreeMap<String, CollectedValue>,
    topics_covered: Vec<String>,
    negative_response_count: u32,
    last_negative_response: Option<String>,
    question_fatigue_level: u32,
    engagement_level: EngagementLevel,
    suggestion_attempts: u32,
    depth: u32,
    history: VecDeque<TurnRecord>,
    content_session: Option<ContentSession>,
    content_history: Vec<ContentSession>,
    last_generation: Option<String>,
    created_at: Timestamp,
    last_activity: Timestamp,
}

impl ConversationState {
    /// Creates a fresh consultation in the domain's initial stage.
    pub fn new(conversation_id: ConversationId, user_id: UserId, domain: DomainKind) -> Self {
        let now = Timestamp::now();
        Self {
            conversation_id,
            user_id,
            domain,
            stage: domain.config().initial_stage(),
            mode: ConversationMode::Questioning,
            collected_info: BTreeMap::new(),
            topics_covered: Vec::new(),
            negative_response_count: 0,
            last_negative_response: None,
            question_fatigue_level: 0,
            engagement_level: EngagementLevel::High,
            suggestion_attempts: 0,
            depth: 0,
            history: VecDeque::new(),
            content_session: None,
            content_history: Vec::new(),
            last_generation: None,
            created_at: now,
            last_activity: now,
        }
    }

    // ─────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────

    pub fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn domain(&self) -> DomainKind {
        self.domain
    }

    /// Static tables for this state's domain.
    pub fn config(&self) -> &'static DomainConfig {
        self.domain.config()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn mode(&self) -> ConversationMode {
        self.mode
    }

    pub fn collected_info(&self) -> &BTreeMap<String, CollectedValue> {
        &self.collected_info
    }

    pub fn topics_covered(&self) -> &[String] {
        &self.topics_covered
    }

    pub fn negative_response_count(&self) -> u32 {
        self.negative_response_count
    }

    pub fn last_negative_response(&self) -> Option<&str> {
        self.last_negative_response.as_deref()
    }

    pub fn question_fatigue_level(&self) -> u32 {
        self.question_fatigue_level
    }

    pub fn engagement_level(&self) -> EngagementLevel {
        self.engagement_level
    }

    pub fn suggestion_attempts(&self) -> u32 {
        self.suggestion_attempts
    }

    /// Number of user turns seen so far.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn history(&self) -> impl Iterator<Item = &TurnRecord> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn content_session(&self) -> Option<&ContentSession> {
        self.content_session.as_ref()
    }

    pub fn content_history(&self) -> &[ContentSession] {
        &self.content_history
    }

    /// Most recent analysis or draft produced by a generation stage.
    pub fn last_generation(&self) -> Option<&str> {
        self.last_generation.as_deref()
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn last_activity(&self) -> Timestamp {
        self.last_activity
    }

    // ─────────────────────────────────────────────────────────────────
    // History
    // ─────────────────────────────────────────────────────────────────

    /// Appends a turn record, evicting the oldest beyond the bound.
    pub fn add_message(&mut self, role: TurnRole, content: impl Into<String>) {
        self.history.push_back(TurnRecord {
            role,
            content: content.into(),
            timestamp: Timestamp::now(),
            stage: self.stage,
        });
        while self.history.len() > MAX_TURN_HISTORY {
            self.history.pop_front();
        }
        if role == TurnRole::User {
            self.depth += 1;
        }
        self.touch();
    }

    /// Marks the state as active now.
    pub fn touch(&mut self) {
        self.last_activity = Timestamp::now();
    }

    /// Returns true if the state has been idle longer than `idle_minutes`.
    pub fn is_expired(&self, idle_minutes: i64) -> bool {
        self.last_activity.is_older_than_minutes(idle_minutes)
    }

    // ─────────────────────────────────────────────────────────────────
    // Collected information
    // ─────────────────────────────────────────────────────────────────

    /// Stores a field value, overwriting any previous one.
    ///
    /// Unknown keys and blank values are ignored. Returns true if stored.
    pub fn add_collected_info(
        &mut self,
        key: &str,
        value: impl Into<String>,
        source: InfoSource,
    ) -> bool {
        let value = value.into();
        let value = value.trim();
        if value.is_empty() || !self.config().is_known_field(key) {
            return false;
        }
        self.collected_info.insert(
            key.to_string(),
            CollectedValue {
                value: value.to_string(),
                source,
                collected_at: Timestamp::now(),
                turn: self.depth,
            },
        );
        if TOPIC_FIELDS.iter().any(|t| *t == key) && !self.topics_covered.iter().any(|t| t == key) {
            self.topics_covered.push(key.to_string());
        }
        true
    }

    /// Returns the collected value for a field, if non-empty.
    pub fn get_info(&self, key: &str) -> Option<&str> {
        self.collected_info
            .get(key)
            .map(|v| v.value.as_str())
            .filter(|v| !v.is_empty())
    }

    pub fn has_info(&self, key: &str) -> bool {
        self.get_info(key).is_some()
    }

    /// Names of populated fields, alphabetically.
    pub fn filled_fields(&self) -> Vec<&str> {
        self.collected_info
            .iter()
            .filter(|(_, v)| !v.value.is_empty())
            .map(|(k, _)| k.as_str())
            .collect()
    }

    /// Number of populated fields.
    pub fn filled_count(&self) -> usize {
        self.filled_fields().len()
    }

    /// Tracked fields still unset, in global priority order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let config = self.config();
        config
            .fields
            .iter()
            .map(|f| f.name)
            .filter(|name| config.tracked_fields.contains(name) && !self.has_info(name))
            .collect()
    }

    /// Weighted share of tracked fields that are populated.
    pub fn completion_rate(&self) -> f32 {
        let config = self.config();
        let (filled, total) = config
            .tracked_fields
            .iter()
            .filter_map(|name| config.field(name))
            .fold((0.0_f32, 0.0_f32), |(filled, total), field| {
                let got = if self.has_info(field.name) { field.weight } else { 0.0 };
                (filled + got, total + field.weight)
            });
        if total <= 0.0 {
            0.0
        } else {
            filled / total
        }
    }

    /// Applies the domain's completion rule.
    pub fn is_information_complete(&self) -> bool {
        match &self.config().completion {
            CompletionRule::EssentialPlusMinimum {
                essential,
                min_total,
            } => essential.iter().all(|f| self.has_info(f)) && self.filled_count() >= *min_total,
            CompletionRule::WeightedFraction { min_rate } => self.completion_rate() >= *min_rate,
        }
    }

    /// Evaluates a stage requirement against collected info.
    pub fn satisfies(&self, requirement: &Requirement) -> bool {
        match requirement {
            Requirement::Always => true,
            Requirement::AllOf(fields) => fields.iter().all(|f| self.has_info(f)),
            Requirement::AnyOf(fields) => fields.iter().any(|f| self.has_info(f)),
            Requirement::MinFilled(n) => self.filled_count() >= *n,
            Requirement::Complete => self.is_information_complete(),
            Requirement::Either(a, b) => self.satisfies(a) || self.satisfies(b),
        }
    }

    /// Picks the first unanswered field: current stage priorities first,
    /// then the domain's global order.
    pub fn next_question(&self) -> NextQuestion {
        let config = self.config();
        let stage_first = self.stage.spec().priority_fields.iter().copied();
        let global = config.fields.iter().map(|f| f.name);
        stage_first
            .chain(global)
            .filter(|name| config.tracked_fields.contains(name) || self.stage_prioritises(name))
            .find(|name| !self.has_info(name))
            .and_then(|name| config.field(name))
            .map(|field| NextQuestion {
                field: Some(field.name),
                text: field.question,
            })
            .unwrap_or(NextQuestion {
                field: None,
                text: CLOSING_QUESTION,
            })
    }

    fn stage_prioritises(&self, name: &str) -> bool {
        self.stage.spec().priority_fields.iter().any(|f| *f == name)
    }

    /// Whether enough is known to give unprompted suggestions.
    pub fn has_sufficient_info_for_suggestions(&self) -> bool {
        ["business_type", "product", "main_goal"]
            .iter()
            .any(|f| self.has_info(f))
            || self.filled_count() > 1
    }

    /// Whether enough is known to start drafting content.
    pub fn has_sufficient_context_for_content(&self) -> bool {
        self.has_info("business_type") || self.has_info("product") || self.completion_rate() > 0.3
    }

    // ─────────────────────────────────────────────────────────────────
    // Fatigue and engagement
    // ─────────────────────────────────────────────────────────────────

    pub fn increase_question_fatigue(&mut self) {
        self.question_fatigue_level += 1;
        self.recompute_engagement();
    }

    pub fn reset_question_fatigue(&mut self) {
        self.question_fatigue_level = 0;
        self.recompute_engagement();
    }

    /// Records a refusal or deflection.
    pub fn record_negative_response(&mut self, response: impl Into<String>) {
        self.negative_response_count += 1;
        self.last_negative_response = Some(response.into());
        self.increase_question_fatigue();
    }

    /// Clears the negative streak after a cooperative answer.
    pub fn reset_negative_responses(&mut self) {
        self.negative_response_count = 0;
        self.last_negative_response = None;
        self.recompute_engagement();
    }

    // Engagement is the lower of the fatigue step (3, 5) and the negative step (1, 2).
    fn recompute_engagement(&mut self) {
        let from_fatigue = match self.question_fatigue_level {
            0..=2 => EngagementLevel::High,
            3..=4 => EngagementLevel::Medium,
            _ => EngagementLevel::Low,
        };
        let from_negatives = match self.negative_response_count {
            0 => EngagementLevel::High,
            1 => EngagementLevel::Medium,
            _ => EngagementLevel::Low,
        };
        self.engagement_level = from_fatigue.min(from_negatives);
    }

    pub fn should_avoid_questions(&self) -> bool {
        self.question_fatigue_level >= 3
            || self.negative_response_count >= 2
            || self.engagement_level == EngagementLevel::Low
    }

    pub fn should_switch_to_suggestion_mode(&self) -> bool {
        self.negative_response_count >= 2
            || self.engagement_level == EngagementLevel::Low
            || self.question_fatigue_level >= self.config().suggestion_fatigue_threshold
    }

    pub fn switch_to_suggestion_mode(&mut self) {
        self.mode = ConversationMode::Suggesting;
        self.suggestion_attempts += 1;
    }

    pub fn switch_to_questioning_mode(&mut self) {
        self.mode = ConversationMode::Questioning;
    }

    // ─────────────────────────────────────────────────────────────────
    // Stages
    // ─────────────────────────────────────────────────────────────────

    /// Whether the current stage's requirement holds.
    pub fn is_ready_for_next_stage(&self) -> bool {
        self.satisfies(&self.stage.spec().ready_when)
    }

    /// Stage the policy would move to if ready: the shortcut target when
    /// its predicate holds, otherwise the following stage.
    pub fn readiness_target(&self) -> Option<Stage> {
        let spec = self.stage.spec();
        if let Some(shortcut) = &spec.shortcut {
            if self.satisfies(&shortcut.when) {
                return self.config().stage(shortcut.to);
            }
        }
        if self.is_ready_for_next_stage() {
            self.stage.next()
        } else {
            None
        }
    }

    /// Moves one stage forward.
    pub fn advance_stage(&mut self) -> Result<Stage, StageTransitionError> {
        let next = self
            .stage
            .next()
            .ok_or(StageTransitionError::Terminal(self.stage.name()))?;
        self.advance_to(next)
    }

    /// Moves forward to `target`, resetting fatigue for the new stage.
    pub fn advance_to(&mut self, target: Stage) -> Result<Stage, StageTransitionError> {
        if self.stage.is_terminal() {
            return Err(StageTransitionError::Terminal(self.stage.name()));
        }
        if target <= self.stage || self.stage.transition_to(target).is_err() {
            return Err(StageTransitionError::NotAllowed {
                from: self.stage.name(),
                to: target.name(),
            });
        }
        self.stage = target;
        self.reset_question_fatigue();
        self.reset_negative_responses();
        if target.kind() == StageKind::Gathering {
            self.mode = ConversationMode::Questioning;
        }
        Ok(target)
    }

    /// Takes the domain's single backward move after a topic shift.
    ///
    /// Ends any content session without archiving its progress and
    /// resumes questioning.
    pub fn regress_for_topic_shift(&mut self) -> Result<Stage, StageTransitionError> {
        let regression = self
            .config()
            .regression
            .as_ref()
            .filter(|r| self.stage.is(r.from))
            .ok_or(StageTransitionError::NoRegression(self.stage.name()))?;
        let target = self
            .config()
            .stage(regression.to)
            .ok_or(StageTransitionError::NoRegression(self.stage.name()))?;
        self.stage = self
            .stage
            .transition_to(target)
            .map_err(|_| StageTransitionError::NotAllowed {
                from: self.stage.name(),
                to: target.name(),
            })?;
        self.content_session = None;
        self.mode = ConversationMode::Questioning;
        Ok(target)
    }

    /// Commits the output of a generation stage.
    ///
    /// Drafts go into the open content session. A one-shot report is stored
    /// and the conversation moves past the generation stage.
    pub fn record_generation(&mut self, output: impl Into<String>) {
        let output = output.into();
        if self.content_session.is_some() {
            self.update_content_session(output.clone(), None);
        } else if self.stage.kind() == StageKind::Generation {
            // Generation stages are never last, so this cannot hit a terminal stage.
            let _ = self.advance_stage();
        }
        self.last_generation = Some(output);
    }

    // ─────────────────────────────────────────────────────────────────
    // Content sessions
    // ─────────────────────────────────────────────────────────────────

    /// Opens a drafting sub-session seeded with the collected info.
    pub fn start_content_session(&mut self, initial_request: impl Into<String>) {
        let context_info = self
            .collected_info
            .iter()
            .map(|(k, v)| (k.clone(), v.value.clone()))
            .collect();
        self.content_session = Some(ContentSession {
            initial_request: initial_request.into(),
            created_at: Timestamp::now(),
            iteration_count: 0,
            last_content: None,
            last_feedback: None,
            context_info,
        });
        self.mode = ConversationMode::ContentCreation;
    }

    /// Stores a new draft and the feedback that produced it.
    pub fn update_content_session(&mut self, draft: impl Into<String>, feedback: Option<String>) {
        if let Some(session) = self.content_session.as_mut() {
            session.last_content = Some(draft.into());
            session.iteration_count += 1;
            if feedback.is_some() {
                session.last_feedback = feedback;
            }
        }
    }

    /// Notes the user's latest comment on the current draft.
    pub fn record_content_feedback(&mut self, feedback: impl Into<String>) {
        if let Some(session) = self.content_session.as_mut() {
            session.last_feedback = Some(feedback.into());
        }
    }

    /// Archives the current session and switches to suggesting.
    pub fn end_content_session(&mut self) {
        if let Some(session) = self.content_session.take() {
            self.content_history.push(session);
            self.mode = ConversationMode::Suggesting;
        }
    }

    /// True while a drafting session is open in a generation stage.
    pub fn is_in_content_creation(&self) -> bool {
        self.content_session.is_some() && self.stage.kind() == StageKind::Generation
    }

    // ─────────────────────────────────────────────────────────────────
    // Summaries
    // ─────────────────────────────────────────────────────────────────

    pub fn suggested_next_action(&self) -> SuggestedAction {
        if self.should_avoid_questions() {
            SuggestedAction::ProvideSuggestions
        } else if self.is_information_complete() && self.stage.kind() != StageKind::Terminal {
            SuggestedAction::CreateContent
        } else if self.is_ready_for_next_stage() {
            SuggestedAction::AdvanceStage
        } else {
            SuggestedAction::GatherInfo
        }
    }

    pub fn progress(&self) -> ConversationProgress {
        ConversationProgress {
            domain: self.domain,
            stage: self.stage,
            mode: self.mode,
            depth: self.depth,
            completion_rate: self.completion_rate(),
            information_complete: self.is_information_complete(),
            engagement_level: self.engagement_level,
            question_fatigue: self.question_fatigue_level,
            negative_responses: self.negative_response_count,
            topics_covered: self.topics_covered.clone(),
            missing_fields: self.missing_fields(),
            ready_for_next_stage: self.is_ready_for_next_stage(),
            suggested_next_action: self.suggested_next_action(),
        }
    }

    /// Compact text block describing the consultation so far, for prompts.
    pub fn context_summary(&self) -> String {
        let mut lines = vec![
            format!("단계: {} | 모드: {:?}", self.stage, self.mode),
            format!(
                "진행도: {:.0}% | 깊이: {}",
                self.completion_rate() * 100.0,
                self.depth
            ),
            format!(
                "참여도: {:?} | 피로도: {}",
                self.engagement_level, self.question_fatigue_level
            ),
        ];
        if !self.collected_info.is_empty() {
            let known: Vec<String> = self
                .collected_info
                .iter()
                .map(|(k, v)| format!("{}={}", k, v.value))
                .collect();
            lines.push(format!("수집 정보: {}", known.join(", ")));
        }
        let recent: Vec<&TurnRecord> = self.history.iter().rev().take(5).collect();
        if !recent.is_empty() {
            lines.push("최근 대화:".to_string());
            for turn in recent.into_iter().rev() {
                let speaker = match turn.role {
                    TurnRole::User => "사용자",
                    TurnRole::Assistant => "AI",
                };
                lines.push(format!("- {}: {}", speaker, preview(&turn.content, 80)));
            }
        }
        lines.join("\n")
    }
}

/// Truncates on a character boundary, appending "..." when cut.
pub(crate) fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
