//! System prompts for the consultation model calls.

use crate::domain::conversation::{ContentSession, ConversationState, DomainConfig, FeedbackKind, Intent};

/// Lists the domain's fields and asks for a JSON object of the known ones.
pub fn extraction(config: &DomainConfig) -> String {
    let fields: Vec<String> = config
        .fields
        .iter()
        .map(|f| format!("- {}: {}", f.name, f.description))
        .collect();
    format!(
        "사용자 메시지에서 다음 정보를 추출하세요.\n{}\n\n\
         확실하게 알 수 있는 필드만 포함한 JSON 객체 하나만 반환하세요. \
         알 수 없는 필드는 생략하고, 설명이나 다른 텍스트는 붙이지 마세요.",
        fields.join("\n")
    )
}

pub fn intent(config: &DomainConfig, context: &str) -> String {
    let labels: Vec<&str> = Intent::ALL.iter().map(Intent::label).collect();
    let fields: Vec<&str> = config.fields.iter().map(|f| f.name).collect();
    format!(
        "사용자 메시지의 의도를 분석하세요.\n\
         가능한 의도: {}\n\
         추출 가능한 정보: {}\n\n\
         현재 상담 상황:\n{}\n\n\
         다음 형식의 JSON만 반환하세요:\n\
         {{\"intent\": {{\"primary\": \"의도\", \"confidence\": 0.0}}, \"extracted_info\": {{}}}}",
        labels.join(", "),
        fields.join(", "),
        context
    )
}

pub fn negative() -> String {
    "사용자가 질문에 답하기를 거부하거나 회피하는지 판단하세요.\n\
     유형: no_knowledge, request_suggestion, indifferent, rejection, neutral\n\n\
     다음 형식의 JSON만 반환하세요:\n\
     {\"is_negative\": false, \"type\": \"neutral\", \"confidence\": 0.0}"
        .to_string()
}

pub fn feedback(last_draft: Option<&str>) -> String {
    format!(
        "사용자가 현재 초안에 대해 무엇을 원하는지 분류하세요.\n\
         현재 초안:\n{}\n\n\
         유형: modify, regenerate, new_content, approval, feedback\n\
         다음 형식의 JSON만 반환하세요: {{\"request_type\": \"feedback\"}}",
        last_draft.unwrap_or("(없음)")
    )
}

pub fn suggestions(state: &ConversationState, informed: bool) -> String {
    let depth = if informed {
        "지금까지 수집한 정보를 활용해 구체적이고 실행 가능한 제안을 3가지 이내로 하세요."
    } else {
        "정보가 부족하므로 업종에 관계없이 적용할 수 있는 기본 제안을 하고, 도움이 될 정보 한 가지를 가볍게 물어보세요."
    };
    format!(
        "당신은 {} 전문 컨설턴트입니다. 사용자가 질문에 답하기 어려워합니다.\n\
         더 이상 캐묻지 말고 제안 위주로 답하세요. {}\n\n상담 현황:\n{}",
        state.domain(),
        depth,
        state.context_summary()
    )
}

pub fn draft(state: &ConversationState, session: &ContentSession) -> String {
    format!(
        "당신은 마케팅 콘텐츠 작가입니다. 아래 정보로 바로 게시할 수 있는 콘텐츠 초안을 작성하세요.\n\n\
         요청: {}\n상담 현황:\n{}",
        session.initial_request,
        state.context_summary()
    )
}

pub fn revision(state: &ConversationState, session: &ContentSession, feedback: FeedbackKind) -> String {
    let instruction = match feedback {
        FeedbackKind::Regenerate | FeedbackKind::NewContent => "같은 정보로 완전히 새로운 초안을 작성하세요.",
        _ => "사용자의 피드백을 반영해 기존 초안을 수정하세요.",
    };
    format!(
        "당신은 마케팅 콘텐츠 작가입니다. {}\n\n\
         기존 초안:\n{}\n\n피드백: {}\n\n상담 현황:\n{}",
        instruction,
        session.last_content.as_deref().unwrap_or("(없음)"),
        session.last_feedback.as_deref().unwrap_or("(없음)"),
        state.context_summary()
    )
}

pub fn analysis(state: &ConversationState) -> String {
    format!(
        "당신은 고객 관리 전문 컨설턴트입니다. 수집한 정보를 바탕으로 \
         현재 상황 진단, 핵심 문제, 단계별 개선 방안을 담은 분석 보고서를 작성하세요.\n\n\
         상담 현황:\n{}",
        state.context_summary()
    )
}
