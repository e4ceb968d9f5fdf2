//! Specialist agent identities.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::conversation::DomainKind;
use crate::domain::foundation::ValidationError;

/// The specialist services a turn can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    BusinessPlanning,
    CustomerService,
    Marketing,
    MentalHealth,
    TaskAutomation,
    Unknown,
}

impl AgentType {
    /// Agents a router may choose, in prompt order.
    pub fn routable() -> [AgentType; 5] {
        [
            AgentType::BusinessPlanning,
            AgentType::Marketing,
            AgentType::CustomerService,
            AgentType::TaskAutomation,
            AgentType::MentalHealth,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::BusinessPlanning => "business_planning",
            AgentType::CustomerService => "customer_service",
            AgentType::Marketing => "marketing",
            AgentType::MentalHealth => "mental_health",
            AgentType::TaskAutomation => "task_automation",
            AgentType::Unknown => "unknown",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AgentType::BusinessPlanning => "Business Planning Agent",
            AgentType::CustomerService => "Customer Service Agent",
            AgentType::Marketing => "Marketing Agent",
            AgentType::MentalHealth => "Mental Health Agent",
            AgentType::TaskAutomation => "Task Automation Agent",
            AgentType::Unknown => "Unknown Agent",
        }
    }

    /// One-line domain description used in routing prompts.
    pub fn description(&self) -> &'static str {
        match self {
            AgentType::BusinessPlanning => "사업 계획, 창업 아이디어, 비즈니스 전략 수립",
            AgentType::Marketing => "마케팅 전략, 광고 컨텐츠, 홍보 자료 제작",
            AgentType::CustomerService => "고객 서비스, 상담, 지원 시스템 구축",
            AgentType::TaskAutomation => "업무 자동화, 워크플로우, 프로세스 개선",
            AgentType::MentalHealth => "정신건강, 스트레스 관리, 심리 상담",
            AgentType::Unknown => "분류되지 않은 요청",
        }
    }

    /// Terms that suggest this agent when they appear in a message.
    pub fn default_keywords(&self) -> &'static [&'static str] {
        match self {
            AgentType::BusinessPlanning => &[
                "사업", "창업", "비즈니스", "사업계획", "사업모델", "린캔버스", "시장조사",
                "경쟁분석", "투자", "펀딩", "자금조달", "MVP", "아이디어 검증", "리스크",
                "성장전략", "사업자등록", "재무계획",
            ],
            AgentType::CustomerService => &[
                "고객", "서비스", "상담", "문의", "불만", "피드백", "리뷰", "고객만족",
                "고객유지", "고객분석", "CRM", "CS", "A/S", "커뮤니티", "개인정보", "세그먼트",
                "맞춤", "응대",
            ],
            AgentType::Marketing => &[
                "마케팅", "광고", "홍보", "브랜딩", "SNS", "소셜미디어", "콘텐츠", "블로그",
                "유튜브", "인스타그램", "페이스북", "SEO", "검색", "노출", "전환", "퍼포먼스",
                "ROI", "ROAS", "인플루언서", "바이럴", "캠페인", "브랜드",
            ],
            AgentType::MentalHealth => &[
                "스트레스", "우울", "불안", "심리", "멘탈", "정신", "치료", "힐링", "마음",
                "감정", "기분", "번아웃", "PHQ-9", "심리검사", "휴식", "회복",
            ],
            AgentType::TaskAutomation => &[
                "자동화", "업무", "태스크", "일정", "스케줄", "캘린더", "알림", "생산성",
                "효율", "워크플로우", "이메일", "발송", "예약", "리마인더", "최적화",
            ],
            AgentType::Unknown => &[],
        }
    }

    /// Consultation domain served in-process for this agent, if any.
    pub fn consultation_domain(&self) -> Option<DomainKind> {
        match self {
            AgentType::Marketing => Some(DomainKind::Marketing),
            AgentType::CustomerService => Some(DomainKind::CustomerService),
            _ => None,
        }
    }
}

impl From<DomainKind> for AgentType {
    fn from(domain: DomainKind) -> Self {
        match domain {
            DomainKind::Marketing => AgentType::Marketing,
            DomainKind::CustomerService => AgentType::CustomerService,
        }
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentType {
    type Err = ValidationError;

    /// Case-insensitive; tolerates brackets, quotes and trailing punctuation
    /// the way models tend to decorate the value.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned: String = s
            .trim()
            .trim_matches(|c: char| !c.is_alphanumeric() && c != '_')
            .to_lowercase()
            .replace([' ', '-'], "_");
        match cleaned.as_str() {
            "business_planning" => Ok(AgentType::BusinessPlanning),
            "customer_service" => Ok(AgentType::CustomerService),
            "marketing" => Ok(AgentType::Marketing),
            "mental_health" => Ok(AgentType::MentalHealth),
            "task_automation" => Ok(AgentType::TaskAutomation),
            "unknown" => Ok(AgentType::Unknown),
            _ => Err(ValidationError::invalid_format(
                "agent_type",
                format!("unknown agent '{}'", s.trim()),
            )),
        }
    }
}

/// Urgency attached to a routing decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routable_excludes_unknown() {
        assert!(!AgentType::routable().contains(&AgentType::Unknown));
        assert_eq!(AgentType::routable().len(), 5);
    }

    #[test]
    fn parses_decorated_model_output() {
        assert_eq!("[marketing]".parse::<AgentType>().unwrap(), AgentType::Marketing);
        assert_eq!(
            " Customer_Service. ".parse::<AgentType>().unwrap(),
            AgentType::CustomerService
        );
        assert_eq!(
            "\"task automation\"".parse::<AgentType>().unwrap(),
            AgentType::TaskAutomation
        );
        assert!("finance".parse::<AgentType>().is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        assert_eq!(
            serde_json::to_string(&AgentType::MentalHealth).unwrap(),
            "\"mental_health\""
        );
        let agent: AgentType = serde_json::from_str("\"business_planning\"").unwrap();
        assert_eq!(agent, AgentType::BusinessPlanning);
    }

    #[test]
    fn only_marketing_and_customer_service_have_consultations() {
        assert_eq!(
            AgentType::Marketing.consultation_domain(),
            Some(DomainKind::Marketing)
        );
        assert_eq!(AgentType::BusinessPlanning.consultation_domain(), None);
    }

    #[test]
    fn priority_defaults_to_medium() {
        assert_eq!(Priority::default(), Priority::Medium);
    }
}
