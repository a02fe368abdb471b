//! Deterministic placeholder mapping.

use super::MappingStrategy;
use crate::model::{
    BlockType, ContentBlock, ContentMapping, ContentMappingPlan, DocumentStructure, MappingSource,
    Placeholder, PlaceholderKind,
};
use async_trait::async_trait;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Confidence of any rule-based plan that maps at least one placeholder.
pub const RULE_CONFIDENCE: f32 = 0.7;

static DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{4}\s*[-/.]\s*\d{1,2}\s*[-/.]\s*\d{1,2}|\d{4}년\s*\d{1,2}월\s*\d{1,2}일").unwrap()
});

/// Maps placeholders by kind against the not-yet-used blocks.
///
/// `DATE` placeholders claim their paragraph first, so a date is found even
/// when `BODY` comes earlier in the template. The other placeholders are
/// then visited in template order and each one only sees blocks no earlier
/// placeholder claimed:
///
/// | kind | blocks |
/// |------|--------|
/// | `TITLE` | first level-1 heading |
/// | `SUBTITLE` | first level-2 heading, else first paragraph |
/// | `DATE` | first paragraph containing a date |
/// | `BODY` | everything left, minus the first level 1-2 heading |
/// | `SECTION_n` | the n-th level-2 heading and the blocks up to the next one |
/// | `TOC` | nothing (an empty mapping) |
///
/// Blocks still unused at the end go to `BODY` when it exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedMapper;

impl RuleBasedMapper {
    /// Create a rule-based mapper.
    pub fn new() -> Self {
        Self
    }

    /// Build the plan synchronously.
    pub fn map(&self, placeholders: &[Placeholder], doc: &DocumentStructure) -> ContentMappingPlan {
        let blocks = &doc.raw_blocks;
        let mut used = vec![false; blocks.len()];
        let mut plan = ContentMappingPlan::new(MappingSource::RuleBased);
        let mut seen = HashSet::new();
        let mut body_id = None;

        let mut dates: HashMap<&str, usize> = HashMap::new();
        for placeholder in placeholders.iter().filter(|p| p.kind == PlaceholderKind::Date) {
            if dates.contains_key(placeholder.id.as_str()) {
                continue;
            }
            if let Some(i) = first_unused(blocks, &used, is_date_paragraph) {
                used[i] = true;
                dates.insert(placeholder.id.as_str(), i);
            }
        }

        for placeholder in placeholders {
            if !seen.insert(placeholder.id.as_str()) {
                continue;
            }

            let indices = match placeholder.kind {
                PlaceholderKind::Title => first_unused(blocks, &used, |b| b.is_heading_level(1))
                    .into_iter()
                    .collect(),
                PlaceholderKind::Subtitle => first_unused(blocks, &used, |b| b.is_heading_level(2))
                    .or_else(|| first_unused(blocks, &used, |b| b.block_type == BlockType::Paragraph))
                    .into_iter()
                    .collect(),
                PlaceholderKind::Date => dates.get(placeholder.id.as_str()).copied().into_iter().collect(),
                PlaceholderKind::Body => body_indices(blocks, &used),
                PlaceholderKind::Section(n) => section_indices(blocks, &used, n),
                PlaceholderKind::Toc => {
                    plan.mappings.push(ContentMapping::new(&placeholder.id, Vec::new()));
                    continue;
                }
                PlaceholderKind::Author | PlaceholderKind::Image | PlaceholderKind::Custom => {
                    log::debug!("No mapping rule for placeholder {}", placeholder.id);
                    continue;
                }
            };

            if indices.is_empty() {
                log::debug!("No content left for placeholder {}", placeholder.id);
                continue;
            }
            for &i in &indices {
                used[i] = true;
            }
            if placeholder.kind == PlaceholderKind::Body && body_id.is_none() {
                body_id = Some(plan.mappings.len());
            }
            plan.mappings.push(ContentMapping::new(&placeholder.id, indices));
        }

        let unmapped: Vec<usize> = (0..blocks.len()).filter(|&i| !used[i]).collect();
        match body_id {
            Some(slot) if !unmapped.is_empty() => {
                let body = &mut plan.mappings[slot].content_block_indices;
                body.extend(unmapped);
                body.sort_unstable();
            }
            _ => plan.unmapped_content = unmapped,
        }

        plan.confidence = if plan.mappings.is_empty() {
            0.0
        } else {
            RULE_CONFIDENCE
        };
        plan
    }
}

#[async_trait]
impl MappingStrategy for RuleBasedMapper {
    fn name(&self) -> &str {
        "rule-based"
    }

    async fn create_mapping_plan(
        &self,
        placeholders: &[Placeholder],
        doc: &DocumentStructure,
    ) -> ContentMappingPlan {
        self.map(placeholders, doc)
    }
}

fn first_unused(
    blocks: &[ContentBlock],
    used: &[bool],
    pred: impl Fn(&ContentBlock) -> bool,
) -> Option<usize> {
    blocks
        .iter()
        .enumerate()
        .find(|(i, b)| !used[*i] && pred(b))
        .map(|(i, _)| i)
}

fn is_date_paragraph(block: &ContentBlock) -> bool {
    block.block_type == BlockType::Paragraph && DATE.is_match(&block.content)
}

fn body_indices(blocks: &[ContentBlock], used: &[bool]) -> Vec<usize> {
    let mut skipped = false;
    let mut indices = Vec::new();
    for (i, block) in blocks.iter().enumerate() {
        if used[i] {
            continue;
        }
        if !skipped && block.block_type == BlockType::Heading && block.level <= 2 {
            skipped = true;
            continue;
        }
        indices.push(i);
    }
    indices
}

/// Level-2 headings are counted among unused blocks only.
fn section_indices(blocks: &[ContentBlock], used: &[bool], number: u32) -> Vec<usize> {
    let number = number.max(1);
    let mut current = 0u32;
    let mut inside = false;
    let mut indices = Vec::new();

    for (i, block) in blocks.iter().enumerate() {
        if used[i] {
            continue;
        }
        if block.is_heading_level(2) {
            current += 1;
            inside = current == number;
            if inside {
                indices.push(i);
            } else if current > number {
                break;
            }
        } else if inside {
            indices.push(i);
        }
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::test_support::placeholders;
    use crate::model::ListType;

    fn doc(blocks: Vec<ContentBlock>) -> DocumentStructure {
        DocumentStructure {
            raw_blocks: blocks,
            ..Default::default()
        }
    }

    fn indices<'a>(plan: &'a ContentMappingPlan, id: &str) -> &'a [usize] {
        &plan.mapping_for(id).unwrap().content_block_indices
    }

    #[test]
    fn test_title_subtitle_body() {
        let doc = doc(vec![
            ContentBlock::heading("T", 1),
            ContentBlock::heading("S", 2),
            ContentBlock::paragraph("body text"),
        ]);
        let plan = RuleBasedMapper::new().map(&placeholders(&["TITLE", "SUBTITLE", "BODY"]), &doc);

        assert_eq!(indices(&plan, "TITLE"), &[0]);
        assert_eq!(indices(&plan, "SUBTITLE"), &[1]);
        assert_eq!(indices(&plan, "BODY"), &[2]);
        assert!(plan.unmapped_content.is_empty());
        assert_eq!(plan.confidence, 0.7);
        assert_eq!(plan.source, MappingSource::RuleBased);
    }

    #[test]
    fn test_subtitle_prefers_heading_over_paragraph() {
        let doc = doc(vec![
            ContentBlock::heading("T", 1),
            ContentBlock::paragraph("lead"),
            ContentBlock::heading("S", 2),
        ]);
        let plan = RuleBasedMapper::new().map(&placeholders(&["TITLE", "SUBTITLE"]), &doc);
        assert_eq!(indices(&plan, "SUBTITLE"), &[2]);
        assert_eq!(plan.unmapped_content, vec![1]);
    }

    #[test]
    fn test_subtitle_falls_back_to_paragraph() {
        let doc = doc(vec![ContentBlock::heading("T", 1), ContentBlock::paragraph("lead")]);
        let plan = RuleBasedMapper::new().map(&placeholders(&["TITLE", "SUBTITLE"]), &doc);
        assert_eq!(indices(&plan, "SUBTITLE"), &[1]);
    }

    #[test]
    fn test_body_skips_first_heading_then_collects_it() {
        let doc = doc(vec![
            ContentBlock::heading("Only heading", 1),
            ContentBlock::paragraph("a"),
            ContentBlock::heading("Next", 2),
        ]);
        let plan = RuleBasedMapper::new().map(&placeholders(&["BODY"]), &doc);
        // The skipped heading comes back as leftover content.
        assert_eq!(indices(&plan, "BODY"), &[0, 1, 2]);
        assert!(plan.unmapped_content.is_empty());
    }

    #[test]
    fn test_sections() {
        let doc = doc(vec![
            ContentBlock::heading("Doc", 1),
            ContentBlock::heading("One", 2),
            ContentBlock::paragraph("1a"),
            ContentBlock::paragraph("1b"),
            ContentBlock::heading("Two", 2),
            ContentBlock::list(ListType::Bullet, Vec::new()),
            ContentBlock::heading("Three", 2),
        ]);
        let plan = RuleBasedMapper::new().map(
            &placeholders(&["TITLE", "SECTION_1", "SECTION_2", "SECTION_9"]),
            &doc,
        );

        assert_eq!(indices(&plan, "SECTION_1"), &[1, 2, 3]);
        // Section one's heading is used now, so "Three" is the second remaining one.
        assert_eq!(indices(&plan, "SECTION_2"), &[6]);
        assert!(plan.mapping_for("SECTION_9").is_none());
        assert_eq!(plan.unmapped_content, vec![4, 5]);
    }

    #[test]
    fn test_toc_gets_empty_mapping() {
        let doc = doc(vec![ContentBlock::paragraph("a")]);
        let plan = RuleBasedMapper::new().map(&placeholders(&["TOC"]), &doc);
        assert!(indices(&plan, "TOC").is_empty());
        assert_eq!(plan.unmapped_content, vec![0]);
        assert_eq!(plan.confidence, 0.7);
    }

    #[test]
    fn test_date() {
        let doc = doc(vec![
            ContentBlock::heading("T", 1),
            ContentBlock::paragraph("no date here"),
            ContentBlock::paragraph("작성일: 2024년 3월 5일"),
            ContentBlock::paragraph("2024-01-02"),
        ]);
        let plan = RuleBasedMapper::new().map(&placeholders(&["DATE"]), &doc);
        assert_eq!(indices(&plan, "DATE"), &[2]);
    }

    #[test]
    fn test_date_claimed_before_earlier_body() {
        let doc = doc(vec![
            ContentBlock::paragraph("write it"),
            ContentBlock::paragraph("2024-01-02"),
        ]);
        let plan = RuleBasedMapper::new().map(&placeholders(&["BODY", "DATE"]), &doc);
        assert_eq!(indices(&plan, "BODY"), &[0]);
        assert_eq!(indices(&plan, "DATE"), &[1]);
        let order: Vec<_> = plan.mappings.iter().map(|m| m.placeholder_id.as_str()).collect();
        assert_eq!(order, vec!["BODY", "DATE"]);
        assert!(plan.is_exact_cover(2));
    }

    #[test]
    fn test_unknown_placeholders_unmapped() {
        let doc = doc(vec![ContentBlock::paragraph("a")]);
        let plan = RuleBasedMapper::new().map(&placeholders(&["COMPANY", "AUTHOR"]), &doc);
        assert!(plan.mappings.is_empty());
        assert_eq!(plan.unmapped_content, vec![0]);
        assert_eq!(plan.confidence, 0.0);
    }

    #[test]
    fn test_exact_cover_with_body() {
        let doc = doc(vec![
            ContentBlock::paragraph("intro"),
            ContentBlock::heading("T", 1),
            ContentBlock::heading("A", 2),
            ContentBlock::paragraph("a"),
            ContentBlock::heading("B", 2),
            ContentBlock::paragraph("b"),
            ContentBlock::heading("C", 3),
        ]);
        let sets: &[&[&str]] = &[
            &["BODY"],
            &["TITLE", "BODY"],
            &["SECTION_2", "BODY", "SECTION_1"],
            &["BODY", "SUBTITLE", "DATE", "TOC"],
        ];
        for ids in sets {
            let plan = RuleBasedMapper::new().map(&placeholders(ids), &doc);
            assert!(plan.is_exact_cover(doc.block_count()), "{:?}", ids);
            assert!(plan.unmapped_content.is_empty(), "{:?}", ids);
        }
    }
}
