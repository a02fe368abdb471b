//! Content mapping: assigning parsed blocks to template placeholders.
//!
//! A [`MappingStrategy`] turns placeholders plus a parsed document into a
//! [`ContentMappingPlan`]. Two strategies exist:
//!
//! - [`RuleBasedMapper`]: deterministic, always available
//! - [`LlmMapper`]: asks a language model through an [`LlmTransport`] and
//!   falls back to the rules on any failure
//!
//! [`MappingEngine`] wraps a strategy with the checks every plan needs
//! (empty inputs, duplicate placeholder ids).
//!
//! # Example
//!
//! ```no_run
//! use docxfill::mapping::MappingEngine;
//! use docxfill::{MarkdownParser, PlaceholderPattern, Template};
//!
//! let template = Template::open("template.docx")?;
//! let doc = MarkdownParser::new().parse("# Title\n\nBody text");
//! let placeholders = template.placeholders(PlaceholderPattern::Brace);
//!
//! let plan = MappingEngine::rule_based().create_mapping_plan_blocking(&placeholders, &doc)?;
//! println!("confidence: {}", plan.confidence);
//! # Ok::<(), docxfill::Error>(())
//! ```

mod client;
mod llm;
mod prompt;
mod rules;

#[cfg(feature = "llm")]
pub use client::OpenAiCompatTransport;
pub use client::{LlmConfig, ENV_API_KEY, ENV_BASE_URL, ENV_MODEL};
pub use llm::{extract_json, LlmMapper, LlmRequest, LlmTransport, FALLBACK_WARNING};
pub use prompt::{build_mapping_prompt, MAPPING_SYSTEM_PROMPT};
pub use rules::RuleBasedMapper;

use crate::error::Result;
use crate::model::{ContentMappingPlan, DocumentStructure, MappingSource, Placeholder};
use async_trait::async_trait;
use std::collections::HashSet;

/// Warning attached when the template has no placeholders.
pub const NO_PLACEHOLDERS_WARNING: &str = "No placeholders found in template";

/// Warning attached when the markdown produced no blocks.
pub const NO_CONTENT_WARNING: &str = "No content blocks found in markdown";

/// A way of producing a mapping plan.
///
/// Strategies never fail: problems are reported as plan warnings and a
/// lowered confidence.
#[async_trait]
pub trait MappingStrategy: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Assign block indices of `doc.raw_blocks` to placeholders.
    async fn create_mapping_plan(
        &self,
        placeholders: &[Placeholder],
        doc: &DocumentStructure,
    ) -> ContentMappingPlan;
}

/// Mapping front end shared by the pipeline and the CLI.
pub struct MappingEngine {
    strategy: Box<dyn MappingStrategy>,
}

impl MappingEngine {
    /// Engine over any strategy.
    pub fn new<S: MappingStrategy + 'static>(strategy: S) -> Self {
        Self {
            strategy: Box::new(strategy),
        }
    }

    /// Engine over the deterministic rules.
    pub fn rule_based() -> Self {
        Self::new(RuleBasedMapper::new())
    }

    /// Engine over an LLM transport, with the rules as fallback.
    pub fn llm<T: LlmTransport + 'static>(transport: T, config: &LlmConfig) -> Self {
        Self::new(LlmMapper::new(transport).with_timeout(config.timeout))
    }

    /// Engine over the OpenAI-compatible HTTP transport.
    #[cfg(feature = "llm")]
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        Ok(Self::llm(OpenAiCompatTransport::new(config.clone())?, config))
    }

    /// Name of the wrapped strategy.
    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    /// Create a mapping plan.
    ///
    /// Empty inputs short-circuit with a warning and zero confidence.
    /// Placeholders repeating an earlier id are passed to the strategy once.
    pub async fn create_mapping_plan(
        &self,
        placeholders: &[Placeholder],
        doc: &DocumentStructure,
    ) -> ContentMappingPlan {
        if placeholders.is_empty() {
            log::warn!("{}", NO_PLACEHOLDERS_WARNING);
            let mut plan =
                ContentMappingPlan::with_warning(MappingSource::RuleBased, NO_PLACEHOLDERS_WARNING);
            plan.unmapped_content = (0..doc.block_count()).collect();
            return plan;
        }
        if doc.is_empty() {
            log::warn!("{}", NO_CONTENT_WARNING);
            return ContentMappingPlan::with_warning(MappingSource::RuleBased, NO_CONTENT_WARNING);
        }

        let unique = unique_placeholders(placeholders);
        log::debug!(
            "Mapping {} blocks to {} placeholders ({} strategy)",
            doc.block_count(),
            unique.len(),
            self.strategy.name()
        );
        self.strategy.create_mapping_plan(&unique, doc).await
    }

    /// Create a mapping plan on a private current-thread runtime.
    pub fn create_mapping_plan_blocking(
        &self,
        placeholders: &[Placeholder],
        doc: &DocumentStructure,
    ) -> Result<ContentMappingPlan> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(runtime.block_on(self.create_mapping_plan(placeholders, doc)))
    }
}

impl Default for MappingEngine {
    fn default() -> Self {
        Self::rule_based()
    }
}

impl std::fmt::Debug for MappingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappingEngine")
            .field("strategy", &self.strategy.name())
            .finish()
    }
}

/// First occurrence of every placeholder id, in template order.
pub fn unique_placeholders(placeholders: &[Placeholder]) -> Vec<Placeholder> {
    let mut seen = HashSet::new();
    placeholders
        .iter()
        .filter(|p| seen.insert(p.id.as_str()))
        .cloned()
        .collect()
}


#[cfg(test)]
mod tests {
    use super::test_support::placeholders;
    use super::*;
    use crate::model::ContentBlock;

    fn doc(blocks: Vec<ContentBlock>) -> DocumentStructure {
        DocumentStructure {
            raw_blocks: blocks,
            ..Default::default()
        }
    }

    #[test]
    fn test_no_placeholders_warning() {
        let engine = MappingEngine::rule_based();
        let plan = engine
            .create_mapping_plan_blocking(&[], &doc(vec![ContentBlock::paragraph("x")]))
            .unwrap();
        assert_eq!(plan.warnings, vec![NO_PLACEHOLDERS_WARNING.to_string()]);
        assert_eq!(plan.confidence, 0.0);
        assert_eq!(plan.unmapped_content, vec![0]);
    }

    #[test]
    fn test_no_content_warning() {
        let engine = MappingEngine::rule_based();
        let plan = engine
            .create_mapping_plan_blocking(&placeholders(&["BODY"]), &doc(Vec::new()))
            .unwrap();
        assert_eq!(plan.warnings, vec![NO_CONTENT_WARNING.to_string()]);
        assert_eq!(plan.confidence, 0.0);
        assert!(plan.mappings.is_empty());
    }

    #[test]
    fn test_duplicate_ids_mapped_once() {
        let engine = MappingEngine::default();
        let plan = engine
            .create_mapping_plan_blocking(
                &placeholders(&["TITLE", "BODY", "TITLE"]),
                &doc(vec![
                    ContentBlock::heading("T", 1),
                    ContentBlock::paragraph("a"),
                ]),
            )
            .unwrap();
        let titles = plan
            .mappings
            .iter()
            .filter(|m| m.placeholder_id == "TITLE")
            .count();
        assert_eq!(titles, 1);
        assert!(plan.is_exact_cover(2));
    }

    #[test]
    fn test_unique_placeholders_keeps_order() {
        let unique = unique_placeholders(&placeholders(&["BODY", "TITLE", "BODY"]));
        let ids: Vec<_> = unique.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["BODY", "TITLE"]);
        assert_eq!(MappingEngine::rule_based().strategy_name(), "rule-based");
    }
}
