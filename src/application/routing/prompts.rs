//! Routing classifier prompts.

use crate::domain::routing::AgentType;

fn agent_catalogue() -> String {
    AgentType::routable()
        .iter()
        .enumerate()
        .map(|(i, agent)| format!("{}. {}: {}", i + 1, agent, agent.description()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// First-turn classifier.
pub fn initial() -> String {
    format!(
        "당신은 사용자의 의도를 정확히 파악하여 적절한 전문 에이전트를 선택하는 라우터입니다.\n\n\
         사용 가능한 에이전트들:\n{}\n\n\
         사용자의 핵심 의도를 파악하여 가장 적합한 에이전트를 선택하세요.\n\n\
         출력 형식:\n\
         AGENT: [에이전트명]\n\
         CONFIDENCE: [0.0-1.0]\n\
         REASONING: [선택 이유를 한 문장으로]",
        agent_catalogue()
    )
}

/// Continuity-aware classifier for later turns.
pub fn context(summary: &str, current_agent: Option<AgentType>, previous_output: &str) -> String {
    let agents: Vec<&str> = AgentType::routable().iter().map(AgentType::as_str).collect();
    format!(
        "당신은 대화의 흐름을 분석하여 적절한 에이전트를 선택하는 전문가입니다.\n\n\
         이전 대화 컨텍스트:\n{}\n\n\
         현재 에이전트: {}\n\
         이전 에이전트 출력: {}\n\n\
         판단 기준:\n\
         1. 사용자가 이전 결과물을 참조하고 있는가? (\"그거\", \"이것\", \"위의\" 등)\n\
         2. 새로운 작업을 요청하는가?\n\
         3. 이전 결과를 다른 형태로 가공하려는가?\n\
         4. 단순히 추가 설명을 원하는가?\n\n\
         사용 가능한 에이전트: {}\n\n\
         출력 형식:\n\
         REFERENCE_DETECTED: [yes/no]\n\
         NEW_TASK: [yes/no]\n\
         AGENT: [에이전트명]\n\
         CONFIDENCE: [0.0-1.0]\n\
         REASONING: [분석과 선택 이유]",
        summary,
        current_agent.map_or("none", |a| a.as_str()),
        previous_output,
        agents.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_lists_every_routable_agent() {
        let prompt = initial();
        for agent in AgentType::routable() {
            assert!(prompt.contains(agent.as_str()));
        }
        assert!(!prompt.contains("unknown"));
    }

    #[test]
    fn context_names_missing_agent_as_none() {
        let prompt = context("새로운 대화", None, "없음");
        assert!(prompt.contains("현재 에이전트: none"));
    }
}
