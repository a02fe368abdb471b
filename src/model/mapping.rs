//! Content mapping plans.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Transformation applied to mapped content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transformation {
    /// Insert as is
    #[default]
    None,
    /// Condense the content
    Summarize,
    /// Keep only the first block
    ExtractFirst,
}

impl Transformation {
    /// Lenient parse; unknown names mean [`Transformation::None`].
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "summarize" => Self::Summarize,
            "extract_first" => Self::ExtractFirst,
            _ => Self::None,
        }
    }
}

/// Blocks assigned to one placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentMapping {
    /// Placeholder identifier
    pub placeholder_id: String,
    /// Indices into `DocumentStructure::raw_blocks`
    pub content_block_indices: Vec<usize>,
    /// Transformation tag
    #[serde(default)]
    pub transformation: Transformation,
}

impl ContentMapping {
    /// Create a mapping without transformation.
    pub fn new(placeholder_id: impl Into<String>, indices: Vec<usize>) -> Self {
        Self {
            placeholder_id: placeholder_id.into(),
            content_block_indices: indices,
            transformation: Transformation::None,
        }
    }
}

/// Which strategy produced a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingSource {
    /// Deterministic rules
    RuleBased,
    /// LLM answer
    Llm,
    /// Deterministic rules after the LLM path failed
    RuleBasedFallback,
}

/// Assignment of content blocks to placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentMappingPlan {
    /// Mappings in placeholder order
    pub mappings: Vec<ContentMapping>,
    /// Indices assigned to no placeholder
    pub unmapped_content: Vec<usize>,
    /// Warnings collected while planning
    pub warnings: Vec<String>,
    /// Confidence in [0, 1]
    pub confidence: f32,
    /// Producing strategy
    pub source: MappingSource,
}

impl ContentMappingPlan {
    /// Create an empty plan.
    pub fn new(source: MappingSource) -> Self {
        Self {
            mappings: Vec::new(),
            unmapped_content: Vec::new(),
            warnings: Vec::new(),
            confidence: 0.0,
            source,
        }
    }

    /// Empty plan carrying a single warning.
    pub fn with_warning(source: MappingSource, warning: impl Into<String>) -> Self {
        let mut plan = Self::new(source);
        plan.warnings.push(warning.into());
        plan
    }

    /// First mapping for a placeholder identifier.
    pub fn mapping_for(&self, placeholder_id: &str) -> Option<&ContentMapping> {
        self.mappings
            .iter()
            .find(|m| m.placeholder_id == placeholder_id)
    }

    /// All indices referenced by mappings.
    pub fn assigned_indices(&self) -> BTreeSet<usize> {
        self.mappings
            .iter()
            .flat_map(|m| m.content_block_indices.iter().copied())
            .collect()
    }

    /// Whether mappings plus unmapped content cover `0..block_count` exactly once each.
    pub fn is_exact_cover(&self, block_count: usize) -> bool {
        let mut seen = vec![false; block_count];
        let all = self
            .mappings
            .iter()
            .flat_map(|m| m.content_block_indices.iter())
            .chain(self.unmapped_content.iter());
        for &i in all {
            match seen.get_mut(i) {
                Some(slot) if !*slot => *slot = true,
                _ => return false,
            }
        }
        seen.into_iter().all(|s| s)
    }
}
