//! Building styled paragraphs from content blocks.

use crate::model::{BlockType, ContentBlock, InlineSpan, ListType, SpanKind};
use crate::package::{Paragraph, RunFormat};
use crate::template::{MappedStyle, StyleRole, StyleRoleMapper};

/// Font size of code runs in points.
pub const CODE_FONT_SIZE: f32 = 9.0;

/// Paragraphs for a block inserted after a placeholder paragraph.
///
/// Lists yield one paragraph per item and tables one per row; every other
/// block yields a single paragraph.
pub fn block_paragraphs(block: &ContentBlock, mapper: &mut StyleRoleMapper<'_>) -> Vec<Paragraph> {
    match block.block_type {
        BlockType::List => list_paragraphs(block, mapper),
        BlockType::Table => {
            let style = mapper.resolve(StyleRole::Paragraph).value;
            block
                .rows
                .iter()
                .map(|row| {
                    let mut format = base_format(&style);
                    format.bold |= row.is_header;
                    let mut paragraph = Paragraph::new(style.style_id());
                    paragraph.push_run(&row.cells.join(" | "), &format);
                    paragraph
                })
                .collect()
        }
        BlockType::Code => {
            let style = mapper.resolve(StyleRole::Code).value;
            let mut paragraph = Paragraph::new(style.style_id());
            let mut format = RunFormat::monospace(CODE_FONT_SIZE);
            format.color = style.style.color.clone().filter(|_| style.apply_direct);
            paragraph.push_run(&block.content, &format);
            vec![paragraph]
        }
        BlockType::ListItem => {
            let role = StyleRole::for_block(block);
            let style = mapper.resolve(role).value;
            vec![item_paragraph(block, &style, &list_prefix(block, 0, 1))]
        }
        _ => {
            let style = mapper.resolve(StyleRole::for_block(block)).value;
            let mut paragraph = Paragraph::new(style.style_id());
            push_spans(&mut paragraph, &block.content, &block.spans, &base_format(&style));
            vec![paragraph]
        }
    }
}

fn list_paragraphs(list: &ContentBlock, mapper: &mut StyleRoleMapper<'_>) -> Vec<Paragraph> {
    let start: usize = list
        .attribute("start")
        .and_then(|s| s.parse().ok())
        .unwrap_or(1);

    list.children
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let mut item = item.clone();
            if item.list_type.is_none() {
                item.list_type = list.list_type;
            }
            let style = mapper.resolve(StyleRole::for_block(&item)).value;
            item_paragraph(&item, &style, &list_prefix(&item, i, start))
        })
        .collect()
}

/// Bullet or number prefix of a list item, indented by nesting depth.
fn list_prefix(item: &ContentBlock, position: usize, start: usize) -> String {
    let indent = "  ".repeat(usize::from(item.level.saturating_sub(1)));
    match item.list_type {
        Some(ListType::Ordered) => {
            let number = item
                .attribute("number")
                .map(str::to_string)
                .unwrap_or_else(|| (start + position).to_string());
            format!("{}{}. ", indent, number)
        }
        _ => format!("{}- ", indent),
    }
}

fn item_paragraph(item: &ContentBlock, style: &MappedStyle, prefix: &str) -> Paragraph {
    let base = base_format(style);
    let mut paragraph = Paragraph::new(style.style_id());
    paragraph.push_run(prefix, &base);
    push_spans(&mut paragraph, &item.content, &item.spans, &base);
    paragraph
}

/// Direct formatting carried by a synthetic style; nothing for template styles.
pub fn base_format(style: &MappedStyle) -> RunFormat {
    if !style.apply_direct {
        return RunFormat::plain();
    }
    RunFormat {
        font: style.style.font_name.clone(),
        size_pt: style.style.font_size_pt,
        bold: style.style.bold.unwrap_or(false),
        italic: style.style.italic.unwrap_or(false),
        strike: false,
        color: style.style.color.clone(),
    }
}

/// Append `text` as runs, splitting at span boundaries.
fn push_spans(paragraph: &mut Paragraph, text: &str, spans: &[InlineSpan], base: &RunFormat) {
    for (segment, format) in segments(text, spans, base) {
        paragraph.push_run(&segment, &format);
    }
}

/// Split text into maximal runs of identical formatting.
pub fn segments(text: &str, spans: &[InlineSpan], base: &RunFormat) -> Vec<(String, RunFormat)> {
    if text.is_empty() {
        return Vec::new();
    }
    if spans.is_empty() {
        return vec![(text.to_string(), base.clone())];
    }

    let chars: Vec<char> = text.chars().collect();
    let mut bounds: Vec<usize> = spans
        .iter()
        .flat_map(|s| [s.start, s.end])
        .chain([0, chars.len()])
        .filter(|&b| b <= chars.len())
        .collect();
    bounds.sort_unstable();
    bounds.dedup();

    bounds
        .windows(2)
        .filter(|w| w[0] < w[1])
        .map(|w| {
            let (start, end) = (w[0], w[1]);
            let mut format = base.clone();
            for span in spans.iter().filter(|s| s.start <= start && end <= s.end) {
                match span.kind {
                    SpanKind::Bold => format.bold = true,
                    SpanKind::Italic => format.italic = true,
                    SpanKind::Strike => format.strike = true,
                    SpanKind::Code => {
                        format.font = Some("Consolas".to_string());
                    }
                }
            }
            (chars[start..end].iter().collect(), format)
        })
        .collect()
}
