//! Strict parsing of the router's constrained `KEY: value` output.

use std::collections::HashMap;
use thiserror::Error;

use super::agent::AgentType;
use crate::domain::foundation::Confidence;

/// Why classifier output could not be turned into a decision.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoutingParseError {
    #[error("missing {0} line")]
    MissingKey(&'static str),

    #[error("unknown agent '{0}'")]
    UnknownAgent(String),

    #[error("invalid confidence '{0}'")]
    InvalidConfidence(String),

    #[error("invalid yes/no value for {key}: '{value}'")]
    InvalidFlag { key: &'static str, value: String },
}

/// Parsed first-turn classification.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingVerdict {
    pub agent: AgentType,
    pub confidence: Confidence,
    pub reasoning: String,
}

/// Parsed context-aware classification.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextVerdict {
    pub reference_detected: bool,
    pub new_task: bool,
    pub verdict: RoutingVerdict,
}

impl ContextVerdict {
    /// A reference that is not a new task stays with the current agent.
    pub fn keeps_current_agent(&self) -> bool {
        self.reference_detected && !self.new_task
    }
}

// Upper-cased key to trimmed value; later lines win.
fn key_values(text: &str) -> HashMap<String, String> {
    text.lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| {
            let key = key
                .trim()
                .trim_matches(|c: char| c == '*' || c == '-' || c == '#')
                .trim()
                .to_uppercase();
            (key, value.trim().to_string())
        })
        .collect()
}

fn parse_flag(fields: &HashMap<String, String>, key: &'static str) -> Result<bool, RoutingParseError> {
    let Some(value) = fields.get(key) else {
        return Ok(false);
    };
    // "yes - 이전 결과물 참조" style annotations follow the flag.
    let flag = value
        .split(|c: char| c.is_whitespace() || c == '-' || c == '(')
        .next()
        .unwrap_or_default()
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();
    match flag.as_str() {
        "yes" | "y" | "true" | "예" => Ok(true),
        "no" | "n" | "false" | "아니오" => Ok(false),
        _ => Err(RoutingParseError::InvalidFlag {
            key,
            value: value.clone(),
        }),
    }
}

fn parse_verdict(
    fields: &HashMap<String, String>,
    default_reasoning: &str,
) -> Result<RoutingVerdict, RoutingParseError> {
    let raw_agent = fields
        .get("AGENT")
        .ok_or(RoutingParseError::MissingKey("AGENT"))?;
    let agent = raw_agent
        .parse::<AgentType>()
        .ok()
        .filter(|a| *a != AgentType::Unknown)
        .ok_or_else(|| RoutingParseError::UnknownAgent(raw_agent.clone()))?;

    let confidence = match fields.get("CONFIDENCE") {
        None => Confidence::FALLBACK,
        Some(raw) => {
            let number = raw
                .trim_matches(|c: char| !(c.is_ascii_digit() || c == '.'))
                .parse::<f32>()
                .map_err(|_| RoutingParseError::InvalidConfidence(raw.clone()))?;
            Confidence::new(number)
        }
    };

    let reasoning = fields
        .get("REASONING")
        .filter(|r| !r.is_empty())
        .cloned()
        .unwrap_or_else(|| default_reasoning.to_string());

    Ok(RoutingVerdict {
        agent,
        confidence,
        reasoning,
    })
}

/// Parses `AGENT:`, `CONFIDENCE:`, `REASONING:` lines.
///
/// AGENT must name a routable agent. A missing CONFIDENCE means 0.5; a
/// present but non-numeric one is an error.
pub fn parse_routing_output(text: &str) -> Result<RoutingVerdict, RoutingParseError> {
    parse_verdict(&key_values(text), "LLM 기반 라우팅")
}

/// Parses the context router's output, which adds `REFERENCE_DETECTED:`
/// and `NEW_TASK:` yes/no lines (absent means no).
pub fn parse_context_output(text: &str) -> Result<ContextVerdict, RoutingParseError> {
    let fields = key_values(text);
    Ok(ContextVerdict {
        reference_detected: parse_flag(&fields, "REFERENCE_DETECTED")?,
        new_task: parse_flag(&fields, "NEW_TASK")?,
        verdict: parse_verdict(&fields, "컨텍스트 기반 라우팅")?,
    })
}
