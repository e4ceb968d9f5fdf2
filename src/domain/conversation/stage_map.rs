//! Static stage, field and requirement tables per consultation domain.
//!
//! Every specialist domain is described by one [`DomainConfig`]: an ordered
//! list of stages, the fields that can be collected, the predicate that
//! decides when a stage is done, and the priority order in which missing
//! fields are asked for. The transition policy is written once against this
//! shape; domains differ only in data.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{StateMachine, ValidationError};

/// Prompt used when every tracked field has already been answered.
pub const CLOSING_QUESTION: &str = "추가로 알려주실 내용이 있다면 말씀해주세요.";

/// Consultation domains with their own multi-turn state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainKind {
    Marketing,
    CustomerService,
}

impl DomainKind {
    /// Returns the static configuration for this domain.
    pub fn config(&self) -> &'static DomainConfig {
        match self {
            DomainKind::Marketing => &MARKETING,
            DomainKind::CustomerService => &CUSTOMER_SERVICE,
        }
    }

    /// Returns the snake_case identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            DomainKind::Marketing => "marketing",
            DomainKind::CustomerService => "customer_service",
        }
    }
}

impl fmt::Display for DomainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DomainKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "marketing" => Ok(DomainKind::Marketing),
            "customer_service" => Ok(DomainKind::CustomerService),
            other => Err(ValidationError::invalid_format(
                "domain",
                format!("unknown consultation domain '{}'", other),
            )),
        }
    }
}

/// A field that can be collected from the user.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Stable key used in `collected_info` and extractor output.
    pub name: &'static str,
    /// Question asked when this field is the next one missing.
    pub question: &'static str,
    /// Short description shown to the extractor model.
    pub description: &'static str,
    /// Relative weight in the completion rate.
    pub weight: f32,
}

/// What a stage is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Ask questions until the stage requirement holds.
    Gathering,
    /// Produce an analysis or a content draft from what was collected.
    Generation,
    /// Nothing left to do.
    Terminal,
}

/// Predicate over collected fields that gates leaving a stage.
#[derive(Debug, Clone)]
pub enum Requirement {
    Always,
    AllOf(Vec<&'static str>),
    AnyOf(Vec<&'static str>),
    MinFilled(usize),
    /// The domain's completion rule holds.
    Complete,
    Either(Box<Requirement>, Box<Requirement>),
}

/// Forward jump taken instead of the next stage when `when` holds.
#[derive(Debug, Clone)]
pub struct Shortcut {
    pub when: Requirement,
    pub to: &'static str,
}

/// One named stage in a domain's ordered list.
#[derive(Debug, Clone)]
pub struct StageSpec {
    pub name: &'static str,
    pub kind: StageKind,
    pub ready_when: Requirement,
    pub shortcut: Option<Shortcut>,
    /// Fields asked first while in this stage, in order.
    pub priority_fields: Vec<&'static str>,
}

/// Domain-level definition of "enough information".
#[derive(Debug, Clone)]
pub enum CompletionRule {
    /// All essential fields present and at least `min_total` fields filled.
    EssentialPlusMinimum {
        essential: Vec<&'static str>,
        min_total: usize,
    },
    /// Weighted completion rate over tracked fields reaches `min_rate`.
    WeightedFraction { min_rate: f32 },
}

/// How a domain's generation stage is entered and left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStyle {
    /// Entered only on an explicit content request; drafts iterate inside a
    /// content session until approved.
    Drafting,
    /// Entered as soon as the previous stage is ready; produced once, then
    /// the conversation moves to the following stage.
    Report,
}

/// The single backward move a domain allows.
#[derive(Debug, Clone)]
pub struct Regression {
    pub from: &'static str,
    pub to: &'static str,
}

/// Full static description of one consultation domain.
#[derive(Debug, Clone)]
pub struct DomainConfig {
    pub kind: DomainKind,
    pub stages: Vec<StageSpec>,
    /// All known fields; order is the global question priority.
    pub fields: Vec<FieldSpec>,
    /// Fields counted by the completion rate.
    pub tracked_fields: Vec<&'static str>,
    pub completion: CompletionRule,
    pub regression: Option<Regression>,
    /// Fatigue level at which the policy stops asking questions.
    pub suggestion_fatigue_threshold: u32,
    /// Whether per-turn intent classification runs for this domain.
    pub analyze_intent: bool,
    pub generation: GenerationStyle,
    /// Reply once the terminal stage is reached.
    pub closing_message: &'static str,
}

impl DomainConfig {
    /// Looks up a stage by name.
    pub fn stage(&self, name: &str) -> Option<Stage> {
        self.stages
            .iter()
            .position(|s| s.name == name)
            .map(|index| Stage {
                domain: self.kind,
                index,
            })
    }

    /// The stage every new conversation starts in.
    pub fn initial_stage(&self) -> Stage {
        Stage {
            domain: self.kind,
            index: 0,
        }
    }

    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns true if `name` is a field this domain collects.
    pub fn is_known_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Checks that every name referenced by the tables resolves.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.stages.is_empty() {
            return Err(ValidationError::empty_field("stages"));
        }
        let check_field = |name: &str| {
            if self.is_known_field(name) {
                Ok(())
            } else {
                Err(ValidationError::invalid_format(
                    "field",
                    format!("{} references unknown field '{}'", self.kind, name),
                ))
            }
        };
        let check_stage = |name: &str| {
            self.stage(name).map(|_| ()).ok_or_else(|| {
                ValidationError::invalid_format(
                    "stage",
                    format!("{} references unknown stage '{}'", self.kind, name),
                )
            })
        };

        for name in &self.tracked_fields {
            check_field(name)?;
        }
        for stage in &self.stages {
            for name in &stage.priority_fields {
                check_field(name)?;
            }
            check_requirement(&stage.ready_when, &check_field)?;
            if let Some(shortcut) = &stage.shortcut {
                check_requirement(&shortcut.when, &check_field)?;
                check_stage(shortcut.to)?;
            }
        }
        if let CompletionRule::EssentialPlusMinimum { essential, .. } = &self.completion {
            for name in essential {
                check_field(name)?;
            }
        }
        if let Some(regression) = &self.regression {
            let from = self.stage(regression.from);
            let to = self.stage(regression.to);
            match (from, to) {
                (Some(from), Some(to)) if to.index < from.index => {}
                _ => {
                    return Err(ValidationError::invalid_format(
                        "regression",
                        format!("{} regression must point to an earlier stage", self.kind),
                    ))
                }
            }
        }
        Ok(())
    }
}

fn check_requirement(
    requirement: &Requirement,
    check_field: &dyn Fn(&str) -> Result<(), ValidationError>,
) -> Result<(), ValidationError> {
    match requirement {
        Requirement::AllOf(fields) | Requirement::AnyOf(fields) => {
            fields.iter().try_for_each(|f| check_field(f))
        }
        Requirement::Either(a, b) => {
            check_requirement(a, check_field)?;
            check_requirement(b, check_field)
        }
        Requirement::Always | Requirement::MinFilled(_) | Requirement::Complete => Ok(()),
    }
}

/// A position in a domain's stage list.
///
/// Ordering follows the configured stage order, so "forward" is simply
/// a larger index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Stage {
    domain: DomainKind,
    index: usize,
}

impl Stage {
    /// Returns the stage name from the domain table.
    pub fn name(&self) -> &'static str {
        self.spec().name
    }

    /// Returns the full stage definition.
    pub fn spec(&self) -> &'static StageSpec {
        // Stages are only constructed from their own config, so the index is in range.
        &self.domain.config().stages[self.index]
    }

    pub fn domain(&self) -> DomainKind {
        self.domain
    }

    /// Position in the ordered stage list.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn kind(&self) -> StageKind {
        self.spec().kind
    }

    /// The following stage, if any.
    pub fn next(&self) -> Option<Stage> {
        let next = self.index + 1;
        (next < self.domain.config().stages.len()).then_some(Stage {
            domain: self.domain,
            index: next,
        })
    }

    /// Returns true if this stage is `name`.
    pub fn is(&self, name: &str) -> bool {
        self.name() == name
    }
}

impl StateMachine for Stage {
    fn can_transition_to(&self, target: &Self) -> bool {
        if target.domain != self.domain {
            return false;
        }
        if target.index > self.index {
            return self.kind() != StageKind::Terminal;
        }
        match &self.domain.config().regression {
            Some(regression) => self.is(regression.from) && target.is(regression.to),
            None => false,
        }
    }

    fn valid_transitions(&self) -> Vec<Self> {
        let config = self.domain.config();
        let mut targets = Vec::new();
        if let Some(regression) = &config.regression {
            if self.is(regression.from) {
                targets.extend(config.stage(regression.to));
            }
        }
        if self.kind() != StageKind::Terminal {
            targets.extend((self.index + 1..config.stages.len()).map(|index| Stage {
                domain: self.domain,
                index,
            }));
        }
        targets
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Stage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Marketing
// ════════════════════════════════════════════════════════════════════════════════

pub mod marketing {
    //! Stage names for the marketing consultation.
    pub const INITIAL: &str = "initial";
    pub const GOAL: &str = "goal";
    pub const TARGET: &str = "target";
    pub const STRATEGY: &str = "strategy";
    pub const EXECUTION: &str = "execution";
    pub const CONTENT_CREATION: &str = "content_creation";
    pub const COMPLETED: &str = "completed";
}

static MARKETING: Lazy<DomainConfig> = Lazy::new(|| {
    use marketing::*;
    DomainConfig {
        kind: DomainKind::Marketing,
        stages: vec![
            StageSpec {
                name: INITIAL,
                kind: StageKind::Gathering,
                ready_when: Requirement::AllOf(vec!["business_type"]),
                shortcut: None,
                priority_fields: vec!["business_type"],
            },
            StageSpec {
                name: GOAL,
                kind: StageKind::Gathering,
                ready_when: Requirement::AllOf(vec!["main_goal"]),
                shortcut: None,
                priority_fields: vec!["main_goal", "business_type", "product"],
            },
            StageSpec {
                name: TARGET,
                kind: StageKind::Gathering,
                ready_when: Requirement::AllOf(vec!["target_audience"]),
                shortcut: None,
                priority_fields: vec!["target_audience", "product"],
            },
            StageSpec {
                name: STRATEGY,
                kind: StageKind::Gathering,
                ready_when: Requirement::AnyOf(vec!["budget", "channels"]),
                shortcut: None,
                priority_fields: vec!["budget", "channels"],
            },
            StageSpec {
                name: EXECUTION,
                kind: StageKind::Gathering,
                ready_when: Requirement::Always,
                shortcut: None,
                priority_fields: vec!["channels", "budget"],
            },
            StageSpec {
                name: CONTENT_CREATION,
                kind: StageKind::Generation,
                ready_when: Requirement::Always,
                shortcut: None,
                priority_fields: vec!["product", "target_audience"],
            },
            StageSpec {
                name: COMPLETED,
                kind: StageKind::Terminal,
                ready_when: Requirement::Always,
                shortcut: None,
                priority_fields: vec![],
            },
        ],
        fields: vec![
            FieldSpec {
                name: "business_type",
                question: "어떤 업종의 비즈니스를 운영하고 계신가요?",
                description: "업종 (예: 카페, 온라인 쇼핑몰, 뷰티샵)",
                weight: 1.5,
            },
            FieldSpec {
                name: "main_goal",
                question: "이번 마케팅으로 가장 이루고 싶은 목표는 무엇인가요?",
                description: "마케팅 목표 (예: 신규 고객 유치, 매출 증대, 브랜드 인지도)",
                weight: 1.25,
            },
            FieldSpec {
                name: "product",
                question: "주력으로 알리고 싶은 제품이나 서비스는 무엇인가요?",
                description: "홍보할 제품 또는 서비스",
                weight: 1.0,
            },
            FieldSpec {
                name: "target_audience",
                question: "주요 고객층은 어떻게 되나요? (연령대, 성별, 관심사 등)",
                description: "타겟 고객층",
                weight: 1.0,
            },
            FieldSpec {
                name: "budget",
                question: "마케팅에 사용할 수 있는 예산은 어느 정도인가요?",
                description: "마케팅 예산",
                weight: 0.75,
            },
            FieldSpec {
                name: "channels",
                question: "주로 활용하고 싶은 채널은 어디인가요? (인스타그램, 블로그 등)",
                description: "마케팅 채널 (예: 인스타그램, 블로그, 유튜브)",
                weight: 0.75,
            },
            FieldSpec {
                name: "pain_points",
                question: "현재 마케팅에서 가장 어려운 점은 무엇인가요?",
                description: "현재 겪고 있는 마케팅 문제",
                weight: 0.0,
            },
        ],
        tracked_fields: vec![
            "business_type",
            "product",
            "main_goal",
            "target_audience",
            "budget",
            "channels",
        ],
        completion: CompletionRule::WeightedFraction { min_rate: 0.6 },
        regression: Some(Regression {
            from: CONTENT_CREATION,
            to: STRATEGY,
        }),
        suggestion_fatigue_threshold: 4,
        analyze_intent: true,
        generation: GenerationStyle::Drafting,
        closing_message: "마케팅 상담이 완료되었습니다. 새로운 주제가 있으시면 언제든 말씀해주세요!",
    }
});

// ════════════════════════════════════════════════════════════════════════════════
// Customer service
// ════════════════════════════════════════════════════════════════════════════════

pub mod customer_service {
    //! Stage names for the customer service consultation.
    pub const INITIAL: &str = "initial";
    pub const INFORMATION_GATHERING: &str = "information_gathering";
    pub const ANALYSIS: &str = "analysis";
    pub const COMPLETED: &str = "completed";
}

static CUSTOMER_SERVICE: Lazy<DomainConfig> = Lazy::new(|| {
    use customer_service::*;
    let field = |name, question, description| FieldSpec {
        name,
        question,
        description,
        weight: 1.0,
    };
    let fields = vec![
        field("business_type", "어떤 업종/사업을 운영하고 계신가요?", "업종 또는 사업 종류"),
        field("desired_outcome", "어떤 결과를 원하시나요?", "원하는 결과"),
        field(
            "customer_issue",
            "현재 어떤 고객 관련 문제나 이슈가 있으신가요?",
            "고객 관련 문제 또는 이슈",
        ),
        field(
            "current_situation",
            "현재 상황을 자세히 설명해주실 수 있나요?",
            "현재 상황",
        ),
        field("customer_segment", "주요 고객층은 어떻게 되나요?", "주요 고객층"),
        field(
            "urgency_level",
            "이 문제의 긴급도는 어느 정도인가요?",
            "긴급도 (높음/보통/낮음)",
        ),
        field(
            "available_resources",
            "현재 활용 가능한 자원(인력, 시스템 등)은 어떻게 되나요?",
            "활용 가능한 인력, 시스템 등 자원",
        ),
        field(
            "previous_attempts",
            "이전에 시도해본 해결 방법이 있나요?",
            "이전에 시도한 해결 방법",
        ),
        field(
            "customer_data",
            "고객 데이터나 피드백이 있다면 알려주세요",
            "보유한 고객 데이터나 피드백",
        ),
        field(
            "communication_channel",
            "주로 어떤 채널로 고객과 소통하시나요?",
            "고객 소통 채널",
        ),
        field("timeline", "언제까지 해결하고 싶으신가요?", "해결 희망 시점"),
        field("budget", "예산 범위가 있다면 알려주세요", "예산 범위"),
    ];
    let tracked_fields = fields.iter().map(|f| f.name).collect();

    DomainConfig {
        kind: DomainKind::CustomerService,
        stages: vec![
            StageSpec {
                name: INITIAL,
                kind: StageKind::Gathering,
                ready_when: Requirement::Always,
                shortcut: Some(Shortcut {
                    when: Requirement::Complete,
                    to: ANALYSIS,
                }),
                priority_fields: vec![],
            },
            StageSpec {
                name: INFORMATION_GATHERING,
                kind: StageKind::Gathering,
                ready_when: Requirement::Either(
                    Box::new(Requirement::Complete),
                    Box::new(Requirement::MinFilled(3)),
                ),
                shortcut: None,
                priority_fields: vec![],
            },
            StageSpec {
                name: ANALYSIS,
                kind: StageKind::Generation,
                ready_when: Requirement::Always,
                shortcut: None,
                priority_fields: vec![],
            },
            StageSpec {
                name: COMPLETED,
                kind: StageKind::Terminal,
                ready_when: Requirement::Always,
                shortcut: None,
                priority_fields: vec![],
            },
        ],
        fields,
        tracked_fields,
        completion: CompletionRule::EssentialPlusMinimum {
            essential: vec!["business_type", "desired_outcome"],
            min_total: 3,
        },
        regression: None,
        suggestion_fatigue_threshold: 4,
        analyze_intent: false,
        generation: GenerationStyle::Report,
        closing_message: "상담이 완료되었습니다. 새로운 질문이 있으시면 언제든 말씀해주세요!",
    }
});

#[cfg(test)]
mod tests {
    use super::*;

    mod tables {
        use super::*;

        #[test]
        fn builtin_domains_validate() {
            DomainKind::Marketing.config().validate().unwrap();
            DomainKind::CustomerService.config().validate().unwrap();
        }

        #[test]
        fn marketing_stage_order_matches_consultation_flow() {
            let names: Vec<_> = DomainKind::Marketing
                .config()
                .stages
                .iter()
                .map(|s| s.name)
                .collect();
            assert_eq!(
                names,
                vec![
                    "initial",
                    "goal",
                    "target",
                    "strategy",
                    "execution",
                    "content_creation",
                    "completed"
                ]
            );
        }

        #[test]
        fn customer_service_questions_follow_priority_order() {
            let config = DomainKind::CustomerService.config();
            assert_eq!(config.fields[0].name, "business_type");
            assert_eq!(config.fields[1].name, "desired_outcome");
            assert_eq!(config.fields.len(), 12);
            assert_eq!(config.tracked_fields.len(), 12);
        }

        #[test]
        fn only_marketing_allows_regression() {
            let regression = DomainKind::Marketing.config().regression.as_ref().unwrap();
            assert_eq!(regression.from, marketing::CONTENT_CREATION);
            assert_eq!(regression.to, marketing::STRATEGY);
            assert!(DomainKind::CustomerService.config().regression.is_none());
        }

        #[test]
        fn validation_rejects_unknown_field_reference() {
            let mut config = DomainKind::Marketing.config().clone();
            config.stages[0].priority_fields.push("favorite_color");
            assert!(config.validate().is_err());
        }

        #[test]
        fn validation_rejects_forward_regression() {
            let mut config = DomainKind::Marketing.config().clone();
            config.regression = Some(Regression {
                from: marketing::GOAL,
                to: marketing::STRATEGY,
            });
            assert!(config.validate().is_err());
        }
    }

    mod stage {
        use super::*;

        #[test]
        fn initial_stage_is_first() {
            let stage = DomainKind::Marketing.config().initial_stage();
            assert_eq!(stage.name(), "initial");
            assert_eq!(stage.index(), 0);
        }

        #[test]
        fn next_walks_the_list_and_stops_at_the_end() {
            let config = DomainKind::CustomerService.config();
            let mut stage = config.initial_stage();
            let mut seen = vec![stage.name()];
            while let Some(next) = stage.next() {
                seen.push(next.name());
                stage = next;
            }
            assert_eq!(
                seen,
                vec!["initial", "information_gathering", "analysis", "completed"]
            );
            assert_eq!(stage.kind(), StageKind::Terminal);
        }

        #[test]
        fn stages_order_by_position() {
            let config = DomainKind::Marketing.config();
            let goal = config.stage(marketing::GOAL).unwrap();
            let strategy = config.stage(marketing::STRATEGY).unwrap();
            assert!(goal < strategy);
        }

        #[test]
        fn forward_jumps_are_allowed() {
            let config = DomainKind::CustomerService.config();
            let initial = config.initial_stage();
            let analysis = config.stage(customer_service::ANALYSIS).unwrap();
            assert!(initial.can_transition_to(&analysis));
            assert_eq!(initial.transition_to(analysis), Ok(analysis));
        }

        #[test]
        fn only_the_configured_regression_goes_backwards() {
            let config = DomainKind::Marketing.config();
            let content = config.stage(marketing::CONTENT_CREATION).unwrap();
            let strategy = config.stage(marketing::STRATEGY).unwrap();
            let goal = config.stage(marketing::GOAL).unwrap();
            assert!(content.can_transition_to(&strategy));
            assert!(!content.can_transition_to(&goal));
            assert!(!strategy.can_transition_to(&goal));
        }

        #[test]
        fn completed_is_terminal() {
            let completed = DomainKind::Marketing
                .config()
                .stage(marketing::COMPLETED)
                .unwrap();
            assert!(completed.is_terminal());
        }

        #[test]
        fn valid_transitions_agree_with_can_transition_to() {
            for domain in [DomainKind::Marketing, DomainKind::CustomerService] {
                let config = domain.config();
                for spec in &config.stages {
                    let stage = config.stage(spec.name).unwrap();
                    for target in stage.valid_transitions() {
                        assert!(stage.can_transition_to(&target), "{} -> {}", stage, target);
                    }
                }
            }
        }

        #[test]
        fn stages_of_different_domains_never_connect() {
            let marketing = DomainKind::Marketing.config().initial_stage();
            let service = DomainKind::CustomerService.config().stage("analysis").unwrap();
            assert!(!marketing.can_transition_to(&service));
        }

        #[test]
        fn serializes_as_name() {
            let stage = DomainKind::Marketing
                .config()
                .stage(marketing::CONTENT_CREATION)
                .unwrap();
            assert_eq!(serde_json::to_string(&stage).unwrap(), "\"content_creation\"");
        }
    }

    mod domain_kind {
        use super::*;

        #[test]
        fn parses_case_insensitively() {
            assert_eq!("Marketing".parse::<DomainKind>().unwrap(), DomainKind::Marketing);
            assert_eq!(
                " customer_service ".parse::<DomainKind>().unwrap(),
                DomainKind::CustomerService
            );
            assert!("finance".parse::<DomainKind>().is_err());
        }
    }
}
