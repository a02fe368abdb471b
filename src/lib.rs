//! # docxfill
//!
//! Fill pre-styled DOCX templates with Markdown content.
//!
//! A template carries the look (styles, page geometry, headers, footers,
//! decorative images) and marks where content goes with placeholder tokens
//! such as `{{TITLE}}` or `{{BODY}}`. docxfill parses the Markdown into
//! index-addressable blocks, maps blocks to placeholders and writes a new
//! document with the placeholders filled in the template's own styles.
//!
//! ## Quick Start
//!
//! ```no_run
//! use docxfill::convert_file;
//!
//! fn main() -> docxfill::Result<()> {
//!     let result = convert_file("report.md", "template.docx", "report.docx")?;
//!     println!("confidence: {:.2}", result.plan.confidence);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **No fixed part paths**: main document and styles are found through
//!   the package relationship graph
//! - **Outline-level roles**: headings resolve to styles by declared outline
//!   level before display names
//! - **Page classification**: cover, table of contents, section and body pages
//! - **Rule-based mapping** with an optional LLM strategy that always falls
//!   back to the rules
//! - **Parallel batches**: one pipeline per file on a worker pool

pub mod compose;
pub mod convert;
pub mod detect;
pub mod error;
pub mod mapping;
pub mod model;
pub mod package;
pub mod parser;
pub mod render;
pub mod template;

// Re-export commonly used types
pub use compose::{ComposeStats, ComposedDocument, Composer};
pub use convert::{convert_batch, BatchReport, ConvertOptions, ConvertResult, Pipeline};
pub use detect::{detect_format_from_bytes, detect_format_from_path, is_docx, PackageFormat, PackageKind};
pub use error::{Error, Result};
pub use mapping::{LlmConfig, MappingEngine, MappingStrategy, RuleBasedMapper};
pub use model::{
    BlockType, ContentBlock, ContentMapping, ContentMappingPlan, DocumentStructure, MappingSource,
    Placeholder, PlaceholderKind, Provenance, Resolved, Section, StyleInfo, Transformation,
};
pub use parser::{ErrorMode, MarkdownParser, ParseOptions};
pub use render::JsonFormat;
pub use template::{PlaceholderPattern, StyleRole, Template, TemplateReport};

use std::path::Path;

/// Analyze a template and summarize it.
///
/// # Example
///
/// ```no_run
/// use docxfill::{analyze_template, PlaceholderPattern};
///
/// let report = analyze_template("template.docx", PlaceholderPattern::Brace).unwrap();
/// for placeholder in &report.placeholders {
///     println!("{} ({})", placeholder.token, placeholder.kind.as_str());
/// }
/// ```
pub fn analyze_template<P: AsRef<Path>>(path: P, pattern: PlaceholderPattern) -> Result<TemplateReport> {
    Ok(Template::open(path)?.report(pattern))
}

/// Parse a Markdown file with default options.
///
/// # Example
///
/// ```no_run
/// use docxfill::parse_markdown;
///
/// let doc = parse_markdown("report.md").unwrap();
/// println!("{} blocks, title {:?}", doc.block_count(), doc.title);
/// ```
pub fn parse_markdown<P: AsRef<Path>>(path: P) -> Result<DocumentStructure> {
    MarkdownParser::new().parse_file(path)
}

/// Convert one Markdown file with rule-based mapping and default options.
pub fn convert_file<M, T, O>(markdown_path: M, template_path: T, output_path: O) -> Result<ConvertResult>
where
    M: AsRef<Path>,
    T: AsRef<Path>,
    O: AsRef<Path>,
{
    Pipeline::default().convert(markdown_path, template_path, Some(output_path.as_ref()))
}

/// Builder for configuring and running conversions.
///
/// # Example
///
/// ```no_run
/// use docxfill::{Docxfill, PlaceholderPattern};
///
/// let result = Docxfill::new()
///     .with_pattern(PlaceholderPattern::Bracket)
///     .remove_unmapped()
///     .convert("report.md", "template.docx", Some("out.docx".as_ref()))?;
/// println!("{}", result.output_path.display());
/// # Ok::<(), docxfill::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct Docxfill {
    options: ConvertOptions,
    engine: Option<MappingEngine>,
}

impl Docxfill {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the placeholder marker form.
    pub fn with_pattern(mut self, pattern: PlaceholderPattern) -> Self {
        self.options.pattern = pattern;
        self
    }

    /// Set Markdown parsing options.
    pub fn with_parse_options(mut self, options: ParseOptions) -> Self {
        self.options.parse = options;
        self
    }

    /// Delete placeholders that receive no content.
    pub fn remove_unmapped(mut self) -> Self {
        self.options.remove_unmapped_placeholders = true;
        self
    }

    /// Leave `docProps/core.xml` untouched.
    pub fn without_metadata_update(mut self) -> Self {
        self.options.update_metadata = false;
        self
    }

    /// Use a specific mapping engine.
    pub fn with_engine(mut self, engine: MappingEngine) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Map through an OpenAI-compatible LLM endpoint, falling back to the rules.
    #[cfg(feature = "llm")]
    pub fn with_llm(mut self, config: &LlmConfig) -> Result<Self> {
        self.engine = Some(MappingEngine::from_config(config)?);
        Ok(self)
    }

    /// Build the configured pipeline.
    pub fn pipeline(self) -> Pipeline {
        let pipeline = Pipeline::new(self.options);
        match self.engine {
            Some(engine) => pipeline.with_engine(engine),
            None => pipeline,
        }
    }

    /// Run one conversion.
    pub fn convert<M, T>(self, markdown_path: M, template_path: T, output_path: Option<&Path>) -> Result<ConvertResult>
    where
        M: AsRef<Path>,
        T: AsRef<Path>,
    {
        self.pipeline().convert(markdown_path, template_path, output_path)
    }
}
