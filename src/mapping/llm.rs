//! LLM-backed mapping with rule-based fallback.

use super::prompt::{build_mapping_prompt, MAPPING_SYSTEM_PROMPT};
use super::rules::RuleBasedMapper;
use super::MappingStrategy;
use crate::error::{Error, Result};
use crate::model::{
    ContentMapping, ContentMappingPlan, DocumentStructure, MappingSource, Placeholder,
    PlaceholderKind, Transformation,
};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;

/// Prefix of the warning added when the LLM path falls back to the rules.
pub const FALLBACK_WARNING: &str = "LLM mapping failed, using rule-based mapping";

/// Confidence assumed when the model does not report one.
const DEFAULT_CONFIDENCE: f64 = 0.8;

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)\s*```").unwrap());

/// A chat request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmRequest {
    /// System message
    pub system_prompt: String,
    /// User message
    pub user_prompt: String,
}

impl LlmRequest {
    /// The mapping request for these placeholders and blocks.
    pub fn for_mapping(placeholders: &[Placeholder], doc: &DocumentStructure) -> Self {
        Self {
            system_prompt: MAPPING_SYSTEM_PROMPT.to_string(),
            user_prompt: build_mapping_prompt(placeholders, doc),
        }
    }
}

/// Sends a request to a language model and returns the raw answer text.
#[async_trait]
pub trait LlmTransport: Send + Sync {
    /// Complete one request.
    async fn complete(&self, request: &LlmRequest) -> Result<String>;
}

#[async_trait]
impl<T: LlmTransport + ?Sized> LlmTransport for Box<T> {
    async fn complete(&self, request: &LlmRequest) -> Result<String> {
        (**self).complete(request).await
    }
}

/// Mapping strategy asking a language model.
///
/// Every failure (transport error, timeout, unparseable answer) yields
/// the rule-based plan with [`FALLBACK_WARNING`] appended. There is no retry.
pub struct LlmMapper<T> {
    transport: T,
    timeout: Duration,
    fallback: RuleBasedMapper,
}

impl<T: LlmTransport> LlmMapper<T> {
    /// Create a mapper over a transport.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            timeout: DEFAULT_TIMEOUT,
            fallback: RuleBasedMapper::new(),
        }
    }

    /// Set the timeout for one request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Ask the model and validate its plan, without fallback.
    pub async fn request_plan(
        &self,
        placeholders: &[Placeholder],
        doc: &DocumentStructure,
    ) -> Result<ContentMappingPlan> {
        let request = LlmRequest::for_mapping(placeholders, doc);
        let answer = tokio::time::timeout(self.timeout, self.transport.complete(&request))
            .await
            .map_err(|_| Error::LlmTimeout(self.timeout))??;

        let value = extract_json(&answer)
            .ok_or_else(|| Error::Llm("response contains no JSON object".to_string()))?;
        let raw: RawPlan = serde_json::from_value(value)?;
        Ok(validate(raw, placeholders, doc.block_count()))
    }
}

#[async_trait]
impl<T: LlmTransport> MappingStrategy for LlmMapper<T> {
    fn name(&self) -> &str {
        "llm"
    }

    async fn create_mapping_plan(
        &self,
        placeholders: &[Placeholder],
        doc: &DocumentStructure,
    ) -> ContentMappingPlan {
        match self.request_plan(placeholders, doc).await {
            Ok(plan) => plan,
            Err(e) => {
                log::warn!("{}: {}", FALLBACK_WARNING, e);
                let mut plan = self.fallback.map(placeholders, doc);
                plan.source = MappingSource::RuleBasedFallback;
                plan.warnings.push(format!("{}: {}", FALLBACK_WARNING, e));
                plan
            }
        }
    }
}

impl<T> std::fmt::Debug for LlmMapper<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmMapper")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Pull a JSON object out of a model answer.
///
/// Tried in order: the whole text, the first fenced code block, the first
/// balanced `{...}` span that parses.
pub fn extract_json(text: &str) -> Option<Value> {
    let objects = |candidate: &str| {
        serde_json::from_str::<Value>(candidate.trim())
            .ok()
            .filter(Value::is_object)
    };

    if let Some(value) = objects(text) {
        return Some(value);
    }
    if let Some(value) = JSON_FENCE
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| objects(m.as_str()))
    {
        return Some(value);
    }

    text.char_indices()
        .filter(|&(_, c)| c == '{')
        .filter_map(|(start, _)| balanced_end(&text[start..]).map(|end| &text[start..start + end]))
        .find_map(objects)
}

/// Byte length of the balanced object starting at `text[0] == '{'`.
fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

#[derive(Debug, Deserialize)]
struct RawPlan {
    mappings: Vec<RawMapping>,
    #[serde(default)]
    unmapped_content: Vec<i64>,
    #[serde(default)]
    warnings: Vec<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawMapping {
    placeholder_id: String,
    #[serde(default)]
    content_block_indices: Vec<i64>,
    #[serde(default)]
    transformation: Option<String>,
}

/// Turn the model's answer into a plan that only references valid,
/// unique block indices and accounts for every block.
fn validate(raw: RawPlan, placeholders: &[Placeholder], block_count: usize) -> ContentMappingPlan {
    let mut plan = ContentMappingPlan::new(MappingSource::Llm);
    plan.warnings = raw.warnings;

    // The model may answer with either the id or the literal marker.
    let mut known: HashMap<&str, &Placeholder> = HashMap::new();
    for p in placeholders {
        known.entry(p.id.as_str()).or_insert(p);
        known.entry(p.token.as_str()).or_insert(p);
    }

    let mut used = vec![false; block_count];
    let mut body_slot = None;

    for mapping in raw.mappings {
        let Some(placeholder) = known.get(mapping.placeholder_id.trim()) else {
            plan.warnings
                .push(format!("Ignored mapping for unknown placeholder {}", mapping.placeholder_id));
            continue;
        };
        if plan.mapping_for(&placeholder.id).is_some() {
            plan.warnings
                .push(format!("Ignored repeated mapping for placeholder {}", placeholder.id));
            continue;
        }

        let mut indices = Vec::with_capacity(mapping.content_block_indices.len());
        for index in mapping.content_block_indices {
            match usize::try_from(index).ok().filter(|&i| i < block_count) {
                None => plan.warnings.push(format!(
                    "Dropped out-of-range block index {} for {}",
                    index, placeholder.id
                )),
                Some(i) if used[i] => plan.warnings.push(format!(
                    "Dropped block index {} for {}: already mapped",
                    i, placeholder.id
                )),
                Some(i) => {
                    used[i] = true;
                    indices.push(i);
                }
            }
        }

        if placeholder.kind == PlaceholderKind::Body && body_slot.is_none() {
            body_slot = Some(plan.mappings.len());
        }
        plan.mappings.push(ContentMapping {
            placeholder_id: placeholder.id.clone(),
            content_block_indices: indices,
            transformation: mapping
                .transformation
                .as_deref()
                .map(Transformation::from_name)
                .unwrap_or_default(),
        });
    }

    let listed: Vec<usize> = raw
        .unmapped_content
        .into_iter()
        .filter_map(|i| usize::try_from(i).ok())
        .collect();
    let leftover: Vec<usize> = (0..block_count).filter(|&i| !used[i]).collect();
    for &i in &leftover {
        if !listed.contains(&i) {
            plan.warnings
                .push(format!("Block {} was not mentioned in the LLM response", i));
        }
    }

    match body_slot {
        Some(slot) if !leftover.is_empty() => {
            let body = &mut plan.mappings[slot].content_block_indices;
            body.extend(leftover);
            body.sort_unstable();
        }
        _ => plan.unmapped_content = leftover,
    }

    plan.confidence = raw
        .confidence
        .filter(|c| c.is_finite())
        .unwrap_or(DEFAULT_CONFIDENCE)
        .clamp(0.0, 1.0) as f32;
    plan
}
