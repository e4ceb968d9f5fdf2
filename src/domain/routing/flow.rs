//! Router-level conversation continuity.
//!
//! A `ConversationFlow` remembers which agent answered the last turns of one
//! conversation and what it said, so the router can tell a follow-up from a
//! new task.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::VecDeque;

use super::agent::AgentType;
use crate::domain::conversation::preview;
use crate::domain::foundation::{Confidence, Timestamp};

/// Default number of interactions a flow keeps.
pub const DEFAULT_FLOW_HISTORY: usize = 10;

/// Confidence assigned to an action-template match.
const ACTION_MATCH_CONFIDENCE: f32 = 0.8;

static REFERENCE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\b(그거|그것|이거|이것|위의|앞의|해당|저거|저것)\s*(기반|바탕|토대|참고|활용)*",
        r"\b(이전|방금|앞서)\s*(만든|작성한|생성한)*",
        r"\b(그|이|저)\s*(계획|기획|문서|결과|내용)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static ACTION_PATTERNS: Lazy<Vec<(AgentType, Vec<Regex>)>> = Lazy::new(|| {
    let compile = |patterns: &[&str]| {
        patterns
            .iter()
            .map(|p| Regex::new(&format!("(?i){}", p)).unwrap())
            .collect::<Vec<_>>()
    };
    vec![
        (
            AgentType::Marketing,
            compile(&[
                r"마케팅.*?(제작|만들|생성|작성)",
                r"(광고|홍보|컨텐츠|콘텐츠).*?(만들|제작|생성|작성)",
                r"(카피|문구|슬로건).*?(만들|제작|생성|작성)",
                r"(SNS|블로그|소셜미디어).*?(컨텐츠|콘텐츠|포스팅)",
            ]),
        ),
        (
            AgentType::CustomerService,
            compile(&[
                r"(고객|서비스|상담).*?(응답|답변|매뉴얼|가이드)",
                r"(FAQ|질문|문의).*?(만들|작성|정리)",
                r"(고객지원|고객응대).*?(시나리오|스크립트)",
            ]),
        ),
        (
            AgentType::TaskAutomation,
            compile(&[
                r"(자동화|워크플로우|프로세스).*?(만들|구성|설계)",
                r"(업무|작업).*?(자동화|효율화|시스템화)",
                r"(스케줄|일정).*?(관리|자동화)",
            ]),
        ),
        (
            AgentType::MentalHealth,
            compile(&[
                r"(상담|치료|힐링).*?(계획|프로그램|가이드)",
                r"(스트레스|우울|불안).*?(관리|해결|대처)",
                r"(정신건강|멘탈헬스).*?(프로그램|상담)",
            ]),
        ),
    ]
});

static FOLLOW_UP_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^(네|응|좋아|감사|고마워|알겠어)",
        r"^(더|또|추가로|그리고).*?(알려|설명|말해)",
        r"^(자세히|구체적으로|더).*?(설명|알려)",
        r"^(이해했어|알겠어|좋아)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Back-reference and action-template signals found in one message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceAnalysis {
    /// The message points at earlier output ("그거", "위의", ...).
    pub has_reference: bool,
    /// Agent whose action template the message matches.
    pub target_agent: Option<AgentType>,
    pub confidence: Confidence,
}

impl ReferenceAnalysis {
    /// Both signals present with enough confidence to override routing.
    pub fn override_target(&self, min_confidence: f32) -> Option<AgentType> {
        if self.has_reference && self.confidence.value() > min_confidence {
            self.target_agent
        } else {
            None
        }
    }
}

/// One completed routed turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowInteraction {
    pub timestamp: Timestamp,
    pub user_message: String,
    pub agent_type: AgentType,
    pub agent_response: String,
    pub routing_reasoning: String,
}

/// Continuity record for one conversation.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationFlow {
    current_agent: Option<AgentType>,
    previous_agent: Option<AgentType>,
    last_agent_output: Option<String>,
    history: VecDeque<FlowInteraction>,
    history_limit: usize,
}

impl Default for ConversationFlow {
    fn default() -> Self {
        Self::new(DEFAULT_FLOW_HISTORY)
    }
}

impl ConversationFlow {
    pub fn new(history_limit: usize) -> Self {
        Self {
            current_agent: None,
            previous_agent: None,
            last_agent_output: None,
            history: VecDeque::new(),
            history_limit: history_limit.max(1),
        }
    }

    /// Agent chosen for the most recently completed turn.
    pub fn current_agent(&self) -> Option<AgentType> {
        self.current_agent
    }

    pub fn previous_agent(&self) -> Option<AgentType> {
        self.previous_agent
    }

    pub fn last_agent_output(&self) -> Option<&str> {
        self.last_agent_output.as_deref()
    }

    pub fn interactions(&self) -> impl Iterator<Item = &FlowInteraction> {
        self.history.iter()
    }

    pub fn interaction_count(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Records a completed turn and shifts the current agent.
    pub fn add_interaction(
        &mut self,
        user_message: impl Into<String>,
        agent_type: AgentType,
        agent_response: impl Into<String>,
        routing_reasoning: impl Into<String>,
    ) {
        let agent_response = agent_response.into();
        self.previous_agent = self.current_agent;
        self.current_agent = Some(agent_type);
        self.last_agent_output = Some(agent_response.clone());
        self.history.push_back(FlowInteraction {
            timestamp: Timestamp::now(),
            user_message: user_message.into(),
            agent_type,
            agent_response,
            routing_reasoning: routing_reasoning.into(),
        });
        while self.history.len() > self.history_limit {
            self.history.pop_front();
        }
    }

    /// Detects back-references and action templates in `message`.
    pub fn analyze_reference_intent(&self, message: &str) -> ReferenceAnalysis {
        let has_reference = REFERENCE_PATTERNS.iter().any(|re| re.is_match(message));
        let target_agent = ACTION_PATTERNS
            .iter()
            .find(|(_, patterns)| patterns.iter().any(|re| re.is_match(message)))
            .map(|(agent, _)| *agent);
        ReferenceAnalysis {
            has_reference,
            target_agent,
            confidence: if target_agent.is_some() {
                Confidence::new(ACTION_MATCH_CONFIDENCE)
            } else {
                Confidence::ZERO
            },
        }
    }

    /// True for brief acknowledgements and "tell me more" follow-ups,
    /// provided an agent already answered.
    pub fn should_continue_with_current_agent(&self, message: &str) -> bool {
        if self.current_agent.is_none() || self.last_agent_output.is_none() {
            return false;
        }
        let message = message.trim();
        FOLLOW_UP_PATTERNS.iter().any(|re| re.is_match(message))
    }

    /// "agent: message..." for the last `turns` interactions.
    pub fn context_summary(&self, turns: usize) -> String {
        if self.history.is_empty() {
            return "새로운 대화".to_string();
        }
        let skip = self.history.len().saturating_sub(turns);
        self.history
            .iter()
            .skip(skip)
            .map(|i| format!("{}: {}", i.agent_type, preview(&i.user_message, 50)))
            .collect::<Vec<_>>()
            .join(" → ")
    }

    /// Truncated copy of the last agent output, or "없음".
    pub fn previous_output_preview(&self, max_chars: usize) -> String {
        match &self.last_agent_output {
            Some(output) => preview(output, max_chars),
            None => "없음".to_string(),
        }
    }

    /// Distinct agents seen in the kept history, in first-use order.
    pub fn agents_used(&self) -> Vec<AgentType> {
        let mut agents = Vec::new();
        for interaction in &self.history {
            if !agents.contains(&interaction.agent_type) {
                agents.push(interaction.agent_type);
            }
        }
        agents
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flow_with(agent: AgentType) -> ConversationFlow {
        let mut flow = ConversationFlow::default();
        flow.add_interaction("사업계획서 써줘", agent, "사업계획서 초안입니다", "초기 라우팅");
        flow
    }

    mod references {
        use super::*;

        #[test]
        fn detects_reference_and_marketing_action() {
            let flow = flow_with(AgentType::BusinessPlanning);
            let analysis = flow.analyze_reference_intent("그거 기반으로 마케팅 컨텐츠 만들어줘");
            assert!(analysis.has_reference);
            assert_eq!(analysis.target_agent, Some(AgentType::Marketing));
            assert_eq!(analysis.override_target(0.7), Some(AgentType::Marketing));
        }

        #[test]
        fn action_without_reference_does_not_override() {
            let flow = flow_with(AgentType::BusinessPlanning);
            let analysis = flow.analyze_reference_intent("인스타 홍보 문구 만들어줘");
            assert!(!analysis.has_reference);
            assert_eq!(analysis.target_agent, Some(AgentType::Marketing));
            assert_eq!(analysis.override_target(0.7), None);
        }

        #[test]
        fn reference_without_action_has_no_target() {
            let flow = flow_with(AgentType::Marketing);
            let analysis = flow.analyze_reference_intent("이 계획 괜찮은가요?");
            assert!(analysis.has_reference);
            assert_eq!(analysis.target_agent, None);
            assert_eq!(analysis.confidence, Confidence::ZERO);
        }

        #[test]
        fn matches_customer_service_and_automation_templates() {
            let flow = ConversationFlow::default();
            assert_eq!(
                flow.analyze_reference_intent("이걸로 고객 응답 매뉴얼 작성해줘")
                    .target_agent,
                Some(AgentType::CustomerService)
            );
            assert_eq!(
                flow.analyze_reference_intent("업무 자동화 방법 알려줘").target_agent,
                Some(AgentType::TaskAutomation)
            );
        }

        #[test]
        fn action_patterns_ignore_case() {
            let flow = ConversationFlow::default();
            assert_eq!(
                flow.analyze_reference_intent("sns 콘텐츠 아이디어").target_agent,
                Some(AgentType::Marketing)
            );
        }
    }

    mod continuation {
        use super::*;

        #[test]
        fn follow_ups_continue_only_with_a_current_agent() {
            assert!(!ConversationFlow::default().should_continue_with_current_agent("네 좋아요"));
            let flow = flow_with(AgentType::Marketing);
            assert!(flow.should_continue_with_current_agent("네 좋아요"));
            assert!(flow.should_continue_with_current_agent("더 자세히 설명해줘"));
            assert!(flow.should_continue_with_current_agent("  감사합니다"));
            assert!(!flow.should_continue_with_current_agent("고객 불만 대응 방법은?"));
        }
    }

    mod history {
        use super::*;

        #[test]
        fn keeps_last_interactions_and_tracks_agents() {
            let mut flow = ConversationFlow::new(3);
            for (i, agent) in [
                AgentType::BusinessPlanning,
                AgentType::Marketing,
                AgentType::Marketing,
                AgentType::CustomerService,
            ]
            .into_iter()
            .enumerate()
            {
                flow.add_interaction(format!("질문 {}", i), agent, "답변", "이유");
            }
            assert_eq!(flow.interaction_count(), 3);
            assert_eq!(flow.current_agent(), Some(AgentType::CustomerService));
            assert_eq!(flow.previous_agent(), Some(AgentType::Marketing));
            assert_eq!(
                flow.agents_used(),
                vec![AgentType::Marketing, AgentType::CustomerService]
            );
        }

        #[test]
        fn context_summary_joins_recent_turns() {
            let mut flow = ConversationFlow::default();
            assert_eq!(flow.context_summary(3), "새로운 대화");
            flow.add_interaction("첫 질문", AgentType::BusinessPlanning, "a", "r");
            flow.add_interaction("둘째 질문", AgentType::Marketing, "b", "r");
            assert_eq!(
                flow.context_summary(3),
                "business_planning: 첫 질문 → marketing: 둘째 질문"
            );
            assert_eq!(flow.context_summary(1), "marketing: 둘째 질문");
        }

        #[test]
        fn previous_output_is_truncated() {
            let mut flow = ConversationFlow::default();
            assert_eq!(flow.previous_output_preview(5), "없음");
            flow.add_interaction("q", AgentType::Marketing, "가나다라마바사", "r");
            assert_eq!(flow.previous_output_preview(3), "가나다...");
        }
    }
}
