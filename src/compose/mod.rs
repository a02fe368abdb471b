//! Document composition: filling a template's placeholders with mapped content.
//!
//! The composer works on a copy of the template package. Paragraphs are
//! visited in reverse order so inserted paragraphs never shift the indices
//! still to be visited. Only parts that actually changed are written back;
//! everything else (media, themes, numbering, settings) is carried over
//! byte for byte.

mod blocks;
mod metadata;

pub use blocks::{base_format, block_paragraphs, segments, CODE_FONT_SIZE};
pub use metadata::{document_content_types, update_core_properties};

use crate::error::Result;
use crate::model::{ContentBlock, ContentMappingPlan, DocumentStructure, Transformation};
use crate::package::rels::types;
use crate::package::{Package, Paragraph, RelationshipResolver, WordPart};
use crate::template::{PlaceholderPattern, StyleRoleMapper, Template};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::Path;

/// Conventional location of the core properties part.
const DEFAULT_CORE_PATH: &str = "docProps/core.xml";

/// Separator between block texts in headers and footers.
pub const HEADER_FOOTER_SEPARATOR: &str = " | ";

/// Counters collected while composing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeStats {
    /// Markers replaced by content
    pub replaced: usize,
    /// Markers deleted (empty mapping, or unmapped with removal enabled)
    pub removed: usize,
    /// Unmapped markers left in place
    pub kept: usize,
    /// Paragraphs inserted after placeholder paragraphs
    pub inserted_paragraphs: usize,
    /// Parts written back
    pub modified_parts: Vec<String>,
}

/// A composed document ready to be saved.
#[derive(Debug, Clone)]
pub struct ComposedDocument {
    package: Package,
    stats: ComposeStats,
}

impl ComposedDocument {
    /// The output package.
    pub fn package(&self) -> &Package {
        &self.package
    }

    /// Composition counters.
    pub fn stats(&self) -> &ComposeStats {
        &self.stats
    }

    /// Serialize to DOCX bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.package.to_bytes()
    }

    /// Write the document to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.package.save(path)
    }
}

/// What a marker is replaced with.
enum Substitution<'d> {
    /// No mapping for the placeholder
    Unmapped,
    /// Mapped blocks, in plan order
    Blocks(Vec<&'d ContentBlock>),
}

/// Fills placeholders of one template.
///
/// # Example
///
/// ```no_run
/// use docxfill::compose::Composer;
/// use docxfill::mapping::MappingEngine;
/// use docxfill::{MarkdownParser, PlaceholderPattern, Template};
///
/// let template = Template::open("template.docx")?;
/// let doc = MarkdownParser::new().parse("# Title\n\nBody");
/// let placeholders = template.placeholders(PlaceholderPattern::Brace);
/// let plan = MappingEngine::rule_based().create_mapping_plan_blocking(&placeholders, &doc)?;
///
/// let output = Composer::new(&template).compose(&plan, &doc)?;
/// output.save("output.docx")?;
/// # Ok::<(), docxfill::Error>(())
/// ```
pub struct Composer<'t> {
    template: &'t Template,
    pattern: PlaceholderPattern,
    update_metadata: bool,
    remove_unmapped: bool,
}

impl<'t> Composer<'t> {
    /// Create a composer with default settings.
    pub fn new(template: &'t Template) -> Self {
        Self {
            template,
            pattern: PlaceholderPattern::default(),
            update_metadata: true,
            remove_unmapped: false,
        }
    }

    /// Set the marker form.
    pub fn with_pattern(mut self, pattern: PlaceholderPattern) -> Self {
        self.pattern = pattern;
        self
    }

    /// Enable or disable core properties updates.
    pub fn with_metadata_update(mut self, update: bool) -> Self {
        self.update_metadata = update;
        self
    }

    /// Delete markers that have no mapping instead of leaving them.
    pub fn with_unmapped_removal(mut self, remove: bool) -> Self {
        self.remove_unmapped = remove;
        self
    }

    /// Compose the output document.
    pub fn compose(&self, plan: &ContentMappingPlan, doc: &DocumentStructure) -> Result<ComposedDocument> {
        let mut package = self.template.package().clone();
        let mut stats = ComposeStats::default();
        let mut mapper = self.template.role_mapper();

        let mut body = self.template.document().clone();
        self.fill_body(&mut body, plan, doc, &mut mapper, &mut stats);
        let document_path = self.template.document_path().to_string();
        write_part(&mut package, &document_path, &body, &mut stats);

        for header_footer in self.template.headers_footers() {
            let mut part = header_footer.part.clone();
            self.fill_header_footer(&mut part, plan, doc, &mut stats);
            write_part(&mut package, &header_footer.path, &part, &mut stats);
        }

        if let Some(format) = self.template.format() {
            if let Some(xml) = package
                .read_string("[Content_Types].xml")?
                .and_then(|xml| document_content_types(&xml, format.kind))
            {
                log::debug!("Declaring main part as {}", format.kind.as_document().content_type());
                package.write("[Content_Types].xml", xml.into_bytes());
                stats.modified_parts.push("[Content_Types].xml".to_string());
            }
        }

        if self.update_metadata {
            self.write_core_properties(&mut package, doc, &mut stats)?;
        }

        log::debug!(
            "Composed: {} replaced, {} removed, {} kept, {} paragraphs inserted",
            stats.replaced,
            stats.removed,
            stats.kept,
            stats.inserted_paragraphs
        );
        Ok(ComposedDocument { package, stats })
    }

    fn fill_body(
        &self,
        part: &mut WordPart,
        plan: &ContentMappingPlan,
        doc: &DocumentStructure,
        mapper: &mut StyleRoleMapper<'_>,
        stats: &mut ComposeStats,
    ) {
        let texts: Vec<String> = part.paragraphs().map(Paragraph::text).collect();

        for (index, text) in texts.iter().enumerate().rev() {
            let matches = self.pattern.find_all(text);
            if matches.is_empty() {
                continue;
            }

            let mut inserted = Vec::new();
            let mut edits = Vec::with_capacity(matches.len());
            for m in &matches {
                match substitution(plan, doc, m.id) {
                    Substitution::Unmapped => {
                        if let Some(edit) = self.unmapped(m.token, stats) {
                            edits.push((m.range(), edit));
                        }
                    }
                    Substitution::Blocks(blocks) => {
                        let first = blocks.first().map(|b| b.flattened_text()).unwrap_or_default();
                        count_filled(&blocks, stats);
                        for block in blocks.iter().skip(1) {
                            inserted.extend(block_paragraphs(block, mapper));
                        }
                        edits.push((m.range(), first));
                    }
                }
            }

            let Some(paragraph) = part.paragraph_mut(index) else {
                continue;
            };
            apply_edits(paragraph, edits);

            if !inserted.is_empty() {
                stats.inserted_paragraphs += inserted.len();
                part.insert_after(index, inserted);
            }
        }
    }

    fn fill_header_footer(
        &self,
        part: &mut WordPart,
        plan: &ContentMappingPlan,
        doc: &DocumentStructure,
        stats: &mut ComposeStats,
    ) {
        let texts: Vec<String> = part.paragraphs().map(Paragraph::text).collect();

        for (index, text) in texts.iter().enumerate() {
            let matches = self.pattern.find_all(text);
            if matches.is_empty() {
                continue;
            }

            let mut edits = Vec::with_capacity(matches.len());
            for m in &matches {
                match substitution(plan, doc, m.id) {
                    Substitution::Unmapped => {
                        if let Some(edit) = self.unmapped(m.token, stats) {
                            edits.push((m.range(), edit));
                        }
                    }
                    Substitution::Blocks(blocks) => {
                        let joined = blocks
                            .iter()
                            .map(|b| b.flattened_text())
                            .collect::<Vec<_>>()
                            .join(HEADER_FOOTER_SEPARATOR);
                        count_filled(&blocks, stats);
                        edits.push((m.range(), joined));
                    }
                }
            }

            if let Some(paragraph) = part.paragraph_mut(index) {
                apply_edits(paragraph, edits);
            }
        }
    }

    /// Replacement for a marker with no mapping, if it is to be removed.
    fn unmapped(&self, token: &str, stats: &mut ComposeStats) -> Option<String> {
        if self.remove_unmapped {
            stats.removed += 1;
            Some(String::new())
        } else {
            log::warn!("No content mapped to {}; leaving it in place", token);
            stats.kept += 1;
            None
        }
    }

    fn write_core_properties(
        &self,
        package: &mut Package,
        doc: &DocumentStructure,
        stats: &mut ComposeStats,
    ) -> Result<()> {
        let core_path = RelationshipResolver::new(package)
            .targets_of_type("", types::CORE_PROPERTIES)
            .into_iter()
            .find(|p| package.contains(p))
            .or_else(|| package.contains(DEFAULT_CORE_PATH).then(|| DEFAULT_CORE_PATH.to_string()));
        let Some(core_path) = core_path else {
            log::debug!("Template has no core properties part");
            return Ok(());
        };
        let Some(xml) = package.read_string(&core_path)? else {
            return Ok(());
        };

        let title = (!doc.title.trim().is_empty()).then_some(doc.title.as_str());
        let updated = update_core_properties(&xml, title, Utc::now());
        if updated != xml {
            package.write(&core_path, updated.into_bytes());
            stats.modified_parts.push(core_path);
        }
        Ok(())
    }
}

/// Blocks for a placeholder id, with the mapping's transformation applied.
fn substitution<'d>(plan: &ContentMappingPlan, doc: &'d DocumentStructure, id: &str) -> Substitution<'d> {
    let Some(mapping) = plan.mapping_for(id) else {
        return Substitution::Unmapped;
    };

    let mut blocks: Vec<&ContentBlock> = mapping
        .content_block_indices
        .iter()
        .filter_map(|&i| {
            let block = doc.block(i);
            if block.is_none() {
                log::warn!("Mapping for {} references missing block {}", id, i);
            }
            block
        })
        .collect();

    match mapping.transformation {
        Transformation::ExtractFirst => blocks.truncate(1),
        Transformation::Summarize => {
            log::debug!("Summarize requested for {}; inserting content unchanged", id)
        }
        Transformation::None => {}
    }
    Substitution::Blocks(blocks)
}

fn count_filled(blocks: &[&ContentBlock], stats: &mut ComposeStats) {
    if blocks.is_empty() {
        stats.removed += 1;
    } else {
        stats.replaced += 1;
    }
}

/// Apply marker replacements given as byte ranges of the original paragraph
/// text. Ranges are applied from the end so earlier offsets stay valid and
/// inserted text is never matched again.
fn apply_edits(paragraph: &mut Paragraph, mut edits: Vec<(Range<usize>, String)>) {
    edits.sort_by_key(|(range, _)| std::cmp::Reverse(range.start));
    for (range, replacement) in edits {
        if !paragraph.replace_range(range.clone(), &replacement) {
            log::warn!("Could not replace text at {:?}", range);
        }
    }
}

fn write_part(package: &mut Package, path: &str, part: &WordPart, stats: &mut ComposeStats) {
    if part.is_modified() {
        package.write(path, part.to_xml().into_bytes());
        stats.modified_parts.push(path.to_string());
    }
}
