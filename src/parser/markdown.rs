//! Markdown parser built on comrak.
//!
//! The input is cleaned line by line (page markers dropped, image paths
//! encoded), tokenized by comrak with the table and strikethrough extensions,
//! and every top-level node becomes one [`ContentBlock`]. Title, subtitle and
//! sections are inferred from the resulting block sequence.

use super::options::{ErrorMode, ParseOptions};
use crate::error::{Error, Result};
use crate::model::{
    BlockType, ContentBlock, DocumentStructure, ListType, Section, SpanKind, TableRow,
};
use comrak::arena_tree::Node;
use comrak::nodes::{Ast, ListType as ComrakListType, NodeValue};
use comrak::{parse_document, Arena, Options};
use percent_encoding::percent_decode_str;
use regex::Regex;
use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

type AstNode<'a> = Node<'a, RefCell<Ast>>;

static IMAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)]+)\)").unwrap());

/// Parses Markdown into a [`DocumentStructure`].
#[derive(Debug, Clone)]
pub struct MarkdownParser {
    options: ParseOptions,
    noise: Vec<Regex>,
}

impl Default for MarkdownParser {
    fn default() -> Self {
        let options = ParseOptions::default();
        let noise = compile_noise(&options.noise_patterns, ErrorMode::Lenient).unwrap_or_default();
        Self { options, noise }
    }
}

impl MarkdownParser {
    /// Create a parser with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser with custom options.
    ///
    /// In strict mode an invalid noise pattern is an error; in lenient mode
    /// it is skipped.
    pub fn with_options(options: ParseOptions) -> Result<Self> {
        let noise = compile_noise(&options.noise_patterns, options.error_mode)?;
        Ok(Self { options, noise })
    }

    /// Parsing options in use.
    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Read and parse a Markdown file. The file must be UTF-8.
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<DocumentStructure> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let text = String::from_utf8(bytes)
            .map_err(|e| Error::Encoding(format!("{}: {}", path.display(), e)))?;
        Ok(self.parse(&text))
    }

    /// Parse Markdown text.
    pub fn parse(&self, markdown: &str) -> DocumentStructure {
        let cleaned = self.preprocess(markdown);

        let arena = Arena::new();
        let mut options = Options::default();
        options.extension.table = true;
        options.extension.strikethrough = true;
        let root = parse_document(&arena, &cleaned, &options);

        let raw_blocks: Vec<ContentBlock> = root.children().filter_map(convert_block).collect();

        let mut doc = DocumentStructure {
            raw_blocks,
            ..Default::default()
        };
        infer_title(&mut doc);
        doc.sections = organize_sections(&doc.raw_blocks);

        log::debug!(
            "Parsed {} blocks in {} sections (title: {:?})",
            doc.raw_blocks.len(),
            doc.sections.len(),
            doc.title
        );
        doc
    }

    /// Normalize the input, drop noise lines and encode image path spaces.
    pub fn preprocess(&self, markdown: &str) -> String {
        let text: String = if self.options.normalize_unicode {
            markdown.nfc().collect()
        } else {
            markdown.to_string()
        };

        let mut lines = Vec::new();
        for line in text.split('\n') {
            let trimmed = line.trim();
            if !trimmed.is_empty() && self.noise.iter().any(|re| re.is_match(trimmed)) {
                continue;
            }
            if self.options.encode_image_spaces && line.contains("![") {
                lines.push(encode_image_paths(line));
            } else {
                lines.push(line.to_string());
            }
        }
        lines.join("\n")
    }
}

fn compile_noise(patterns: &[String], mode: ErrorMode) -> Result<Vec<Regex>> {
    let mut compiled = Vec::with_capacity(patterns.len());
    for pattern in patterns {
        match Regex::new(pattern) {
            Ok(re) => compiled.push(re),
            Err(e) if mode == ErrorMode::Lenient => {
                log::warn!("Skipping invalid noise pattern {:?}: {}", pattern, e);
            }
            Err(e) => return Err(Error::InvalidPattern(format!("{}: {}", pattern, e))),
        }
    }
    Ok(compiled)
}

/// Percent-encode spaces in image destinations, leaving any title untouched.
fn encode_image_paths(line: &str) -> String {
    IMAGE_RE
        .replace_all(line, |caps: &regex::Captures<'_>| {
            let alt = &caps[1];
            let target = &caps[2];
            let title_at = target.char_indices().find(|&(i, c)| {
                c.is_whitespace() && target[i..].trim_start().starts_with(['"', '\''])
            });
            let (path, title) = match title_at {
                Some((i, _)) => target.split_at(i),
                None => (target, ""),
            };
            format!("![{}]({}{})", alt, path.replace(' ', "%20"), title)
        })
        .into_owned()
}

fn convert_block<'a>(node: &'a AstNode<'a>) -> Option<ContentBlock> {
    let ast = node.data.borrow();
    match &ast.value {
        NodeValue::Heading(heading) => {
            let mut block = ContentBlock::heading("", heading.level);
            collect_inline(node, &mut block);
            Some(block)
        }
        NodeValue::Paragraph => convert_paragraph(node),
        NodeValue::List(list) => {
            let list_type = map_list_type(list.list_type);
            let mut block = ContentBlock::list(list_type, Vec::new());
            if list_type == ListType::Ordered {
                block = block.with_attribute("start", list.start.to_string());
            }
            collect_list_items(node, list_type, list.start, 1, &mut block.children);
            Some(block)
        }
        NodeValue::BlockQuote => {
            let mut parts = Vec::new();
            collect_paragraph_texts(node, &mut parts);
            Some(ContentBlock::new(BlockType::Blockquote, parts.join("\n")))
        }
        NodeValue::CodeBlock(code) => {
            let language = code.info.split_whitespace().next().unwrap_or("");
            Some(
                ContentBlock::new(BlockType::Code, code.literal.trim_end_matches('\n'))
                    .with_attribute("language", language),
            )
        }
        NodeValue::Table(_) => {
            let mut block = ContentBlock::new(BlockType::Table, "");
            for row in node.children() {
                let is_header = matches!(row.data.borrow().value, NodeValue::TableRow(true));
                let cells = row
                    .children()
                    .map(|cell| {
                        let mut tmp = ContentBlock::paragraph("");
                        collect_inline(cell, &mut tmp);
                        tmp.content
                    })
                    .collect();
                block.rows.push(TableRow { cells, is_header });
            }
            Some(block)
        }
        NodeValue::ThematicBreak => Some(ContentBlock::new(BlockType::HorizontalRule, "")),
        _ => None,
    }
}

fn convert_paragraph<'a>(node: &'a AstNode<'a>) -> Option<ContentBlock> {
    let image = node
        .children()
        .find(|c| matches!(c.data.borrow().value, NodeValue::Image(_)));
    if let Some(image) = image {
        let (src, title) = match &image.data.borrow().value {
            NodeValue::Image(link) => (link.url.to_string(), link.title.to_string()),
            _ => (String::new(), String::new()),
        };
        let mut block = ContentBlock::new(BlockType::Image, "");
        collect_inline(image, &mut block);
        block.spans.clear();
        return Some(block.with_attribute("src", src).with_attribute("title", title));
    }

    let mut block = ContentBlock::paragraph("");
    collect_inline(node, &mut block);
    if block.content.trim().is_empty() {
        return None;
    }
    Some(block)
}

fn map_list_type(value: ComrakListType) -> ListType {
    match value {
        ComrakListType::Bullet => ListType::Bullet,
        ComrakListType::Ordered => ListType::Ordered,
    }
}

/// Flatten list items in document order; nested items get `depth + 1`.
fn collect_list_items<'a>(
    list: &'a AstNode<'a>,
    list_type: ListType,
    start: usize,
    depth: u8,
    out: &mut Vec<ContentBlock>,
) {
    for (position, item) in list.children().enumerate() {
        let mut block = ContentBlock::list_item("", list_type, depth);
        if list_type == ListType::Ordered {
            block = block.with_attribute("number", (start + position).to_string());
        }

        let mut nested = Vec::new();
        for child in item.children() {
            match &child.data.borrow().value {
                NodeValue::Paragraph => {
                    if !block.content.is_empty() {
                        block.content.push('\n');
                    }
                    collect_inline(child, &mut block);
                }
                NodeValue::List(inner) => {
                    nested.push((child, map_list_type(inner.list_type), inner.start));
                }
                _ => {}
            }
        }
        out.push(block);

        for (child, inner_type, inner_start) in nested {
            collect_list_items(child, inner_type, inner_start, depth.saturating_add(1), out);
        }
    }
}

fn collect_paragraph_texts<'a>(node: &'a AstNode<'a>, out: &mut Vec<String>) {
    for child in node.children() {
        let is_paragraph = matches!(child.data.borrow().value, NodeValue::Paragraph);
        if is_paragraph {
            let mut tmp = ContentBlock::paragraph("");
            collect_inline(child, &mut tmp);
            out.push(tmp.content);
        } else {
            collect_paragraph_texts(child, out);
        }
    }
}

/// Append the inline text of `node` to `block.content`, recording spans.
fn collect_inline<'a>(node: &'a AstNode<'a>, block: &mut ContentBlock) {
    for child in node.children() {
        let ast = child.data.borrow();
        match &ast.value {
            NodeValue::Text(text) => block.content.push_str(text),
            NodeValue::SoftBreak => block.content.push(' '),
            NodeValue::LineBreak => block.content.push('\n'),
            NodeValue::Code(code) => {
                let start = block.char_len();
                block.content.push_str(&code.literal);
                let end = block.char_len();
                block.add_span(SpanKind::Code, start, end);
            }
            NodeValue::Emph => wrap_span(child, block, SpanKind::Italic),
            NodeValue::Strong => wrap_span(child, block, SpanKind::Bold),
            NodeValue::Strikethrough => wrap_span(child, block, SpanKind::Strike),
            NodeValue::HtmlInline(_) => {}
            _ => collect_inline(child, block),
        }
    }
}

fn wrap_span<'a>(node: &'a AstNode<'a>, block: &mut ContentBlock, kind: SpanKind) {
    let start = block.char_len();
    collect_inline(node, block);
    let end = block.char_len();
    block.add_span(kind, start, end);
}

/// Title from the first image's folder, else the first level-1 heading,
/// else a fully bold paragraph. Subtitle from the first level-2 heading.
fn infer_title(doc: &mut DocumentStructure) {
    if let Some(src) = doc
        .raw_blocks
        .iter()
        .find(|b| b.block_type == BlockType::Image)
        .and_then(|b| b.attribute("src"))
    {
        let decoded = percent_decode_str(src).decode_utf8_lossy().into_owned();
        if !decoded.is_empty() {
            let parts: Vec<&str> = decoded.split('/').collect();
            if parts.len() > 1 {
                doc.title = parts[0].to_string();
            }
            doc.first_image_path = Some(decoded);
        }
    }

    for block in &doc.raw_blocks {
        if block.block_type != BlockType::Heading {
            continue;
        }
        if block.level == 1 && doc.title.is_empty() {
            doc.title = block.content.clone();
        } else if block.level == 2 && doc.subtitle.is_empty() {
            doc.subtitle = block.content.clone();
            break;
        }
    }

    if doc.title.is_empty() {
        if let Some(block) = doc
            .raw_blocks
            .iter()
            .find(|b| b.block_type == BlockType::Paragraph && b.is_fully(SpanKind::Bold))
        {
            doc.title = block.content.clone();
        }
    }
}

/// Split blocks into sections at level 1-2 headings.
fn organize_sections(blocks: &[ContentBlock]) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current: Option<Section> = None;

    for (index, block) in blocks.iter().enumerate() {
        if block.block_type == BlockType::Heading && block.level <= 2 {
            if let Some(section) = current.take() {
                sections.push(section);
            }
            current = Some(Section {
                title: block.content.clone(),
                level: block.level,
                heading_index: Some(index),
                block_indices: Vec::new(),
            });
        } else {
            current
                .get_or_insert_with(Section::default)
                .block_indices
                .push(index);
        }
    }

    if let Some(section) = current {
        sections.push(section);
    }
    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::InlineSpan;

    fn parse(markdown: &str) -> DocumentStructure {
        MarkdownParser::new().parse(markdown)
    }

    #[test]
    fn test_headings_and_paragraphs() {
        let doc = parse("# T\n## S\nbody text");
        assert_eq!(doc.block_count(), 3);
        assert!(doc.raw_blocks[0].is_heading_level(1));
        assert!(doc.raw_blocks[1].is_heading_level(2));
        assert_eq!(doc.raw_blocks[2].block_type, BlockType::Paragraph);
        assert_eq!(doc.raw_blocks[2].content, "body text");
        assert_eq!(doc.title, "T");
        assert_eq!(doc.subtitle, "S");
    }

    #[test]
    fn test_inline_spans() {
        let doc = parse("A **bold** and *it* with `code` and ~~gone~~.");
        let block = &doc.raw_blocks[0];
        assert_eq!(block.content, "A bold and it with code and gone.");
        assert_eq!(
            block.spans,
            vec![
                InlineSpan { start: 2, end: 6, kind: SpanKind::Bold },
                InlineSpan { start: 11, end: 13, kind: SpanKind::Italic },
                InlineSpan { start: 19, end: 23, kind: SpanKind::Code },
                InlineSpan { start: 28, end: 32, kind: SpanKind::Strike },
            ]
        );
    }

    #[test]
    fn test_soft_and_hard_breaks() {
        let doc = parse("one\ntwo  \nthree");
        assert_eq!(doc.raw_blocks[0].content, "one two\nthree");
    }

    #[test]
    fn test_lists() {
        let doc = parse("- a\n- b\n  - c\n\n3. x\n4. y\n");
        assert_eq!(doc.block_count(), 2);

        let bullet = &doc.raw_blocks[0];
        assert_eq!(bullet.list_type, Some(ListType::Bullet));
        let items: Vec<_> = bullet.children.iter().map(|c| (c.content.as_str(), c.level)).collect();
        assert_eq!(items, vec![("a", 1), ("b", 1), ("c", 2)]);

        assert_eq!(bullet.flattened_text(), "- a\n- b\n  - c");

        let ordered = &doc.raw_blocks[1];
        assert_eq!(ordered.attribute("start"), Some("3"));
        assert_eq!(ordered.flattened_text(), "3. x\n4. y");
    }

    #[test]
    fn test_code_block() {
        let doc = parse("```rust\nfn main() {}\n```\n");
        let block = &doc.raw_blocks[0];
        assert_eq!(block.block_type, BlockType::Code);
        assert_eq!(block.content, "fn main() {}");
        assert_eq!(block.attribute("language"), Some("rust"));
    }

    #[test]
    fn test_table() {
        let doc = parse("| A | B |\n|---|---|\n| 1 | **2** |\n");
        let block = &doc.raw_blocks[0];
        assert_eq!(block.block_type, BlockType::Table);
        assert_eq!(block.rows.len(), 2);
        assert!(block.rows[0].is_header);
        assert_eq!(block.rows[1].cells, vec!["1", "2"]);
        assert_eq!(block.flattened_text(), "A | B\n1 | 2");
    }

    #[test]
    fn test_blockquote_and_rule() {
        let doc = parse("> first\n>\n> second\n\n---\n");
        assert_eq!(doc.raw_blocks[0].block_type, BlockType::Blockquote);
        assert_eq!(doc.raw_blocks[0].content, "first\nsecond");
        assert_eq!(doc.raw_blocks[1].block_type, BlockType::HorizontalRule);
    }

    #[test]
    fn test_noise_lines_removed() {
        let doc = parse("- Page 3 -\n\nText\n\n- 페이지 4 -\n\n- slide 1 -\n");
        assert_eq!(doc.block_count(), 1);
        assert_eq!(doc.raw_blocks[0].content, "Text");
    }

    #[test]
    fn test_image_with_spaces() {
        let doc = parse("![cover](my deck/page 1/img.png)\n\n# Heading");
        let image = &doc.raw_blocks[0];
        assert_eq!(image.block_type, BlockType::Image);
        assert_eq!(image.content, "cover");
        assert_eq!(image.attribute("src"), Some("my%20deck/page%201/img.png"));
        assert_eq!(doc.first_image_path.as_deref(), Some("my deck/page 1/img.png"));
        assert_eq!(doc.title, "my deck");
    }

    #[test]
    fn test_encode_image_paths_keeps_title() {
        assert_eq!(
            encode_image_paths(r#"![a](x y.png "A title")"#),
            r#"![a](x%20y.png "A title")"#
        );
        assert_eq!(encode_image_paths("no image"), "no image");
    }

    #[test]
    fn test_bold_paragraph_title_fallback() {
        let doc = parse("**Quarterly Report**\n\nSome text.");
        assert_eq!(doc.title, "Quarterly Report");
        assert_eq!(doc.subtitle, "");
    }

    #[test]
    fn test_sections() {
        let doc = parse("intro\n\n# A\n\npara\n\n### deep\n\n## B\n\nmore");
        assert_eq!(doc.sections.len(), 3);
        assert_eq!(doc.sections[0].title, "");
        assert_eq!(doc.sections[0].level, 0);
        assert_eq!(doc.sections[0].block_indices, vec![0]);
        assert_eq!(doc.sections[1].title, "A");
        assert_eq!(doc.sections[1].heading_index, Some(1));
        assert_eq!(doc.sections[1].block_indices, vec![2, 3]);
        assert_eq!(doc.sections[2].block_indices, vec![5]);
    }

    #[test]
    fn test_html_and_empty_skipped() {
        let doc = parse("<div>raw</div>\n\nText");
        assert_eq!(doc.block_count(), 1);
    }

    #[test]
    fn test_nfc_normalization() {
        // Decomposed Hangul (U+1112 U+1161 U+11AB) composes to U+D55C.
        let doc = parse("\u{1112}\u{1161}\u{11AB}");
        assert_eq!(doc.raw_blocks[0].content, "\u{D55C}");
    }

    #[test]
    fn test_invalid_noise_pattern() {
        let strict = ParseOptions::new().with_noise_pattern("(unclosed");
        assert!(matches!(
            MarkdownParser::with_options(strict),
            Err(Error::InvalidPattern(_))
        ));

        let lenient = ParseOptions::new().lenient().with_noise_pattern("(unclosed");
        assert!(MarkdownParser::with_options(lenient).is_ok());
    }

    #[test]
    fn test_parse_file_rejects_non_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.md");
        fs::write(&path, [0xFF, 0xFE, 0x00, 0x41]).unwrap();
        assert!(matches!(
            MarkdownParser::new().parse_file(&path),
            Err(Error::Encoding(_))
        ));
    }
}
