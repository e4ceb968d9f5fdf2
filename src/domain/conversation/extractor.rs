//! Response sanitization and structured field extraction.
//!
//! Model output is untrusted text. Everything here turns it into either a
//! typed set of known fields or a typed failure; nothing panics and nothing
//! partially applies.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

use super::stage_map::DomainConfig;

/// Maximum allowed response length (100KB).
pub const MAX_RESPONSE_LENGTH: usize = 100_000;

/// Maximum characters kept for a single extracted value.
pub const MAX_FIELD_CHARS: usize = 500;

/// Errors that can occur during sanitization.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SanitizationError {
    #[error("Response too long: {actual} bytes exceeds maximum of {max} bytes")]
    TooLong { max: usize, actual: usize },
}

/// Why a model response yielded no fields.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionFailure {
    #[error("model call failed: {0}")]
    Provider(String),

    #[error("sanitization failed: {0}")]
    Sanitization(#[from] SanitizationError),

    #[error("no JSON object found in model output")]
    NoJson,

    #[error("JSON parse error: {0}")]
    InvalidJson(String),

    #[error("expected a JSON object")]
    NotAnObject,
}

impl ExtractionFailure {
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider(message.into())
    }
}

/// Strips control characters and prompt-injection markers from model text.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseSanitizer;

impl ResponseSanitizer {
    pub fn new() -> Self {
        Self
    }

    pub fn sanitize(&self, response: &str) -> Result<String, SanitizationError> {
        if response.len() > MAX_RESPONSE_LENGTH {
            return Err(SanitizationError::TooLong {
                max: MAX_RESPONSE_LENGTH,
                actual: response.len(),
            });
        }

        let cleaned: String = response
            .chars()
            .filter(|c| !c.is_control() || matches!(c, '\n' | '\t' | '\r'))
            .collect();

        Ok(self.strip_injection_markers(&cleaned))
    }

    fn strip_injection_markers(&self, s: &str) -> String {
        let patterns = [
            "```system",
            "```assistant",
            "[INST]",
            "[/INST]",
            "<|system|>",
            "<|assistant|>",
            "<|user|>",
            "<|im_start|>",
            "<|im_end|>",
            "<<SYS>>",
            "<</SYS>>",
        ];

        let mut result = s.to_string();
        for pattern in patterns {
            result = result.replace(pattern, "");
        }
        result
    }
}

/// Locates the JSON object inside model prose.
///
/// Fenced code blocks win; otherwise the first balanced `{...}` is taken.
pub fn locate_json_object(text: &str) -> Option<&str> {
    let trimmed = text.trim();

    for fence in ["```json", "```JSON", "```"] {
        if let Some(start) = trimmed.find(fence) {
            let body_start = start + fence.len();
            if let Some(len) = trimmed[body_start..].find("```") {
                let body = trimmed[body_start..body_start + len].trim();
                if body.starts_with('{') {
                    return Some(body);
                }
            }
        }
    }

    let start = trimmed.find('{')?;
    balanced_object(&trimmed[start..])
}

// Scans by char_indices so multi-byte text before the closing brace slices correctly.
fn balanced_object(s: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            _ if in_string => {}
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&s[..i + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Sanitizes model output and parses the embedded JSON object.
pub fn parse_json_object(
    sanitizer: &ResponseSanitizer,
    raw: &str,
) -> Result<Map<String, Value>, ExtractionFailure> {
    let sanitized = sanitizer.sanitize(raw)?;
    let json = locate_json_object(&sanitized).ok_or(ExtractionFailure::NoJson)?;
    match serde_json::from_str::<Value>(json) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ExtractionFailure::NotAnObject),
        Err(e) => Err(ExtractionFailure::InvalidJson(e.to_string())),
    }
}

/// Fields the model was confident about. Absent means "not determined".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExtractedFields(BTreeMap<String, String>);

impl ExtractedFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Adds entries from `other` that are not already present.
    pub fn merge_missing(&mut self, other: &ExtractedFields) {
        for (k, v) in &other.0 {
            self.0.entry(k.clone()).or_insert_with(|| v.clone());
        }
    }
}

impl FromIterator<(String, String)> for ExtractedFields {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Outcome of one extraction attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionResult {
    Ok(ExtractedFields),
    Failed(ExtractionFailure),
}

impl ExtractionResult {
    /// Fields to apply; a failure applies nothing.
    pub fn fields(&self) -> ExtractedFields {
        match self {
            ExtractionResult::Ok(fields) => fields.clone(),
            ExtractionResult::Failed(_) => ExtractedFields::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ExtractionResult::Ok(_))
    }

    pub fn failure(&self) -> Option<&ExtractionFailure> {
        match self {
            ExtractionResult::Failed(failure) => Some(failure),
            ExtractionResult::Ok(_) => None,
        }
    }
}

impl From<Result<ExtractedFields, ExtractionFailure>> for ExtractionResult {
    fn from(result: Result<ExtractedFields, ExtractionFailure>) -> Self {
        match result {
            Ok(fields) => ExtractionResult::Ok(fields),
            Err(failure) => ExtractionResult::Failed(failure),
        }
    }
}

/// Turns model JSON into [`ExtractedFields`] for one domain's schema.
#[derive(Debug, Clone)]
pub struct FieldParser {
    config: &'static DomainConfig,
    sanitizer: ResponseSanitizer,
}

impl FieldParser {
    pub fn new(config: &'static DomainConfig) -> Self {
        Self {
            config,
            sanitizer: ResponseSanitizer::new(),
        }
    }

    pub fn config(&self) -> &'static DomainConfig {
        self.config
    }

    pub fn sanitizer(&self) -> &ResponseSanitizer {
        &self.sanitizer
    }

    /// Parses a raw model response into known fields.
    pub fn parse(&self, raw: &str) -> ExtractionResult {
        parse_json_object(&self.sanitizer, raw)
            .map(|map| self.fields_from_map(&map))
            .into()
    }

    /// Keeps known field names with non-empty values.
    ///
    /// Numbers, booleans and arrays are stringified; nulls, empty strings
    /// and placeholder values are dropped.
    pub fn fields_from_map(&self, map: &Map<String, Value>) -> ExtractedFields {
        map.iter()
            .filter(|(key, _)| self.config.is_known_field(key))
            .filter_map(|(key, value)| normalize_value(value).map(|v| (key.clone(), v)))
            .collect()
    }
}

fn normalize_value(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null | Value::Object(_) => return None,
        Value::String(s) => strip_html_tags(s),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(normalize_value)
            .collect::<Vec<_>>()
            .join(", "),
    };
    let text = text.trim();
    if text.is_empty() || is_placeholder(text) {
        return None;
    }
    Some(text.chars().take(MAX_FIELD_CHARS).collect())
}

fn is_placeholder(text: &str) -> bool {
    matches!(
        text.to_lowercase().as_str(),
        "null" | "none" | "n/a" | "unknown" | "없음" | "모름" | "알 수 없음"
    )
}

fn strip_html_tags(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }
    result
}
