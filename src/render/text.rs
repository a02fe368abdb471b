//! Plain text summaries.

use crate::model::{BlockType, ContentMappingPlan, DocumentStructure, MappingSource};
use crate::template::TemplateReport;
use std::fmt::Write;

const PREVIEW_CHARS: usize = 60;

/// Multi-line summary of a template analysis.
pub fn template_summary(report: &TemplateReport) -> String {
    let mut out = String::new();
    let format = report.format.as_deref().unwrap_or("unknown");
    let _ = writeln!(out, "Format: {}", format);
    if let Some(document) = &report.document {
        let _ = writeln!(out, "Document part: {} ({})", document.path, document.provenance.as_str());
    }
    match &report.styles {
        Some(styles) => {
            let _ = writeln!(
                out,
                "Style part: {} ({}), {} styles",
                styles.path,
                styles.provenance.as_str(),
                report.style_count
            );
        }
        None => out.push_str("Style part: none\n"),
    }
    let _ = writeln!(out, "Paragraphs: {}", report.paragraph_count);

    if !report.outline_styles.is_empty() {
        out.push_str("\nOutline styles:\n");
        for style in &report.outline_styles {
            let _ = writeln!(out, "  level {}: {} ({})", style.level, style.style_id, style.name);
        }
    }

    out.push_str("\nRoles:\n");
    for role in &report.roles {
        let id = role.style_id.as_deref().unwrap_or("-");
        let _ = writeln!(
            out,
            "  {:<14} {:<20} {}",
            role.role,
            id,
            role.provenance.as_str()
        );
    }

    let _ = writeln!(out, "\nPages: {}", report.pages.pages.len());
    for page in &report.pages.pages {
        let _ = writeln!(
            out,
            "  {} {:<8} {} paragraphs  {}",
            page.page_number,
            page.page_type.as_str(),
            page.paragraph_count,
            preview(&page.content_preview)
        );
    }

    let _ = writeln!(
        out,
        "\nPlaceholders ({}): {}",
        report.pattern,
        report.placeholders.len()
    );
    for placeholder in &report.placeholders {
        let _ = writeln!(
            out,
            "  {:<16} {:<10} {:<8} {}",
            placeholder.token,
            placeholder.kind.as_str(),
            placeholder.section.as_str(),
            placeholder.part
        );
    }

    if let Some(geometry) = &report.geometry {
        let dim = |v: Option<f32>| v.map(|v| format!("{:.1}pt", v)).unwrap_or_else(|| "?".into());
        let _ = writeln!(
            out,
            "\nPage size: {} x {} ({:?})",
            dim(geometry.width_pt),
            dim(geometry.height_pt),
            geometry.orientation
        );
    }
    if !report.assets.is_empty() {
        let _ = writeln!(out, "Decorative images: {}", report.assets.len());
    }
    if !report.theme_colors.is_empty() {
        let _ = writeln!(out, "Theme colors: {}", report.theme_colors.len());
    }
    out
}

/// Indexed block listing with sections.
pub fn document_outline(doc: &DocumentStructure) -> String {
    let mut out = String::new();
    if !doc.title.is_empty() {
        let _ = writeln!(out, "Title: {}", doc.title);
    }
    if !doc.subtitle.is_empty() {
        let _ = writeln!(out, "Subtitle: {}", doc.subtitle);
    }
    if let Some(image) = &doc.first_image_path {
        let _ = writeln!(out, "First image: {}", image);
    }
    let _ = writeln!(
        out,
        "Blocks: {}, sections: {}",
        doc.block_count(),
        doc.sections.len()
    );

    for (i, block) in doc.raw_blocks.iter().enumerate() {
        let kind = match block.block_type {
            BlockType::Heading => format!("h{}", block.level),
            other => other.as_str().to_string(),
        };
        let _ = writeln!(out, "  [{:>3}] {:<16} {}", i, kind, preview(&block.flattened_text()));
    }
    out
}

/// Mapping plan listing with block previews.
pub fn plan_summary(plan: &ContentMappingPlan, doc: &DocumentStructure) -> String {
    let source = match plan.source {
        MappingSource::RuleBased => "rule-based",
        MappingSource::Llm => "llm",
        MappingSource::RuleBasedFallback => "rule-based fallback",
    };
    let mut out = String::new();
    let _ = writeln!(out, "Mapping ({}), confidence {:.2}", source, plan.confidence);
    for mapping in &plan.mappings {
        let _ = writeln!(
            out,
            "  {:<12} <- {:?}",
            mapping.placeholder_id, mapping.content_block_indices
        );
        if let Some(first) = mapping
            .content_block_indices
            .first()
            .and_then(|&i| doc.block(i))
        {
            let _ = writeln!(out, "               {}", preview(&first.flattened_text()));
        }
    }
    if !plan.unmapped_content.is_empty() {
        let _ = writeln!(out, "  unmapped: {:?}", plan.unmapped_content);
    }
    for warning in &plan.warnings {
        let _ = writeln!(out, "  warning: {}", warning);
    }
    out
}

fn preview(text: &str) -> String {
    let line = text.lines().next().unwrap_or("");
    if line.chars().count() > PREVIEW_CHARS {
        let cut: String = line.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", cut)
    } else {
        line.to_string()
    }
}
