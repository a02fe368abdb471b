//! End-to-end conversion: Markdown plus template to a filled document.
//!
//! A [`Pipeline`] runs the stages strictly in order for one file: template
//! analysis, Markdown parsing, placeholder extraction, mapping and
//! composition. Each conversion owns its template and block sequence, so
//! several pipelines (or one shared pipeline) can run in parallel; see
//! [`convert_batch`].
//!
//! # Example
//!
//! ```no_run
//! use docxfill::convert::{ConvertOptions, Pipeline};
//!
//! fn main() -> docxfill::Result<()> {
//!     let pipeline = Pipeline::new(ConvertOptions::default());
//!     let result = pipeline.convert("report.md", "template.docx", None)?;
//!     println!("{} ({} blocks)", result.output_path.display(), result.block_count);
//!     Ok(())
//! }
//! ```

mod batch;

pub use batch::{convert_batch, markdown_files, BatchEvent, BatchFailure, BatchReport, BatchSuccess};

use crate::compose::{ComposeStats, Composer};
use crate::error::Result;
use crate::mapping::MappingEngine;
use crate::model::ContentMappingPlan;
use crate::parser::{MarkdownParser, ParseOptions};
use crate::template::{PlaceholderPattern, Template};
use std::fs;
use std::path::{Path, PathBuf};

/// Options for document conversion.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Placeholder marker form
    pub pattern: PlaceholderPattern,

    /// Markdown parsing options
    pub parse: ParseOptions,

    /// Output path; `None` means `<template_stem>_output.docx` beside the Markdown file
    pub output: Option<PathBuf>,

    /// Update `docProps/core.xml` (modified time, title)
    pub update_metadata: bool,

    /// Delete markers that received no mapping
    pub remove_unmapped_placeholders: bool,
}

impl ConvertOptions {
    /// Create new conversion options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the placeholder marker form.
    pub fn with_pattern(mut self, pattern: PlaceholderPattern) -> Self {
        self.pattern = pattern;
        self
    }

    /// Set parsing options.
    pub fn with_parse_options(mut self, options: ParseOptions) -> Self {
        self.parse = options;
        self
    }

    /// Set the output path.
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    /// Enable or disable metadata updates.
    pub fn with_metadata_update(mut self, update: bool) -> Self {
        self.update_metadata = update;
        self
    }

    /// Enable or disable removal of unmapped markers.
    pub fn with_unmapped_removal(mut self, remove: bool) -> Self {
        self.remove_unmapped_placeholders = remove;
        self
    }
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            pattern: PlaceholderPattern::default(),
            parse: ParseOptions::default(),
            output: None,
            update_metadata: true,
            remove_unmapped_placeholders: false,
        }
    }
}

/// Result of one conversion.
#[derive(Debug, Clone)]
pub struct ConvertResult {
    /// Where the document was written
    pub output_path: PathBuf,

    /// Placeholders found in the template (every occurrence)
    pub placeholder_count: usize,

    /// Top-level blocks parsed from the Markdown
    pub block_count: usize,

    /// The mapping plan used
    pub plan: ContentMappingPlan,

    /// Composition counters
    pub stats: ComposeStats,
}

/// Conversion pipeline.
#[derive(Debug)]
pub struct Pipeline {
    options: ConvertOptions,
    engine: MappingEngine,
}

impl Pipeline {
    /// Create a pipeline with rule-based mapping.
    pub fn new(options: ConvertOptions) -> Self {
        Self {
            options,
            engine: MappingEngine::rule_based(),
        }
    }

    /// Use a different mapping engine.
    pub fn with_engine(mut self, engine: MappingEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Conversion options.
    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Mapping engine.
    pub fn engine(&self) -> &MappingEngine {
        &self.engine
    }

    /// Convert on a private runtime. Do not call from inside an async context;
    /// use [`Pipeline::convert_async`] there.
    pub fn convert<M, T>(&self, markdown_path: M, template_path: T, output_path: Option<&Path>) -> Result<ConvertResult>
    where
        M: AsRef<Path>,
        T: AsRef<Path>,
    {
        block_on(self.convert_async(markdown_path.as_ref(), template_path.as_ref(), output_path))
    }

    /// Convert a Markdown file with a template file.
    pub async fn convert_async(
        &self,
        markdown_path: &Path,
        template_path: &Path,
        output_path: Option<&Path>,
    ) -> Result<ConvertResult> {
        log::debug!("Opening template {}", template_path.display());
        let template = Template::open(template_path)?;
        let output = self.output_path(markdown_path, template_path, output_path);
        self.convert_with_template_async(markdown_path, &template, &output)
            .await
    }

    /// Convert with an already analyzed template (blocking).
    pub fn convert_with_template(&self, markdown_path: &Path, template: &Template, output_path: &Path) -> Result<ConvertResult> {
        block_on(self.convert_with_template_async(markdown_path, template, output_path))
    }

    /// Convert with an already analyzed template.
    pub async fn convert_with_template_async(
        &self,
        markdown_path: &Path,
        template: &Template,
        output_path: &Path,
    ) -> Result<ConvertResult> {
        let parser = MarkdownParser::with_options(self.options.parse.clone())?;
        let doc = parser.parse_file(markdown_path)?;
        log::debug!(
            "Parsed {}: {} blocks, {} sections",
            markdown_path.display(),
            doc.block_count(),
            doc.sections.len()
        );

        let placeholders = template.placeholders(self.options.pattern);
        log::debug!("Found {} placeholders", placeholders.len());

        let plan = self.engine.create_mapping_plan(&placeholders, &doc).await;
        for warning in &plan.warnings {
            log::warn!("{}: {}", markdown_path.display(), warning);
        }

        let composed = Composer::new(template)
            .with_pattern(self.options.pattern)
            .with_metadata_update(self.options.update_metadata)
            .with_unmapped_removal(self.options.remove_unmapped_placeholders)
            .compose(&plan, &doc)?;

        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        composed.save(output_path)?;
        log::debug!("Wrote {}", output_path.display());

        Ok(ConvertResult {
            output_path: output_path.to_path_buf(),
            placeholder_count: placeholders.len(),
            block_count: doc.block_count(),
            plan,
            stats: composed.stats().clone(),
        })
    }

    fn output_path(&self, markdown_path: &Path, template_path: &Path, explicit: Option<&Path>) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| self.options.output.clone())
            .unwrap_or_else(|| default_output_path(markdown_path, template_path))
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(ConvertOptions::default())
    }
}

/// `<template_stem>_output.docx` in the Markdown file's directory.
pub fn default_output_path(markdown_path: &Path, template_path: &Path) -> PathBuf {
    let stem = template_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "template".to_string());
    markdown_path
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(format!("{}_output.docx", stem))
}

fn block_on<T>(future: impl std::future::Future<Output = Result<T>>) -> Result<T> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(future)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_options_builder() {
        let options = ConvertOptions::new()
            .with_pattern(PlaceholderPattern::Bracket)
            .with_output("out/report.docx")
            .with_metadata_update(false)
            .with_unmapped_removal(true);

        assert_eq!(options.pattern, PlaceholderPattern::Bracket);
        assert_eq!(options.output, Some(PathBuf::from("out/report.docx")));
        assert!(!options.update_metadata);
        assert!(options.remove_unmapped_placeholders);
    }

    #[test]
    fn test_default_options() {
        let options = ConvertOptions::default();
        assert_eq!(options.pattern, PlaceholderPattern::Brace);
        assert!(options.update_metadata);
        assert!(!options.remove_unmapped_placeholders);
        assert!(options.output.is_none());
    }

    #[test]
    fn test_default_output_path() {
        let path = default_output_path(Path::new("docs/report.md"), Path::new("/t/brand.dotx"));
        assert_eq!(path, PathBuf::from("docs/brand_output.docx"));

        let path = default_output_path(Path::new("report.md"), Path::new("plain.docx"));
        assert_eq!(path, PathBuf::from("plain_output.docx"));
    }

    #[test]
    fn test_output_path_precedence() {
        let pipeline = Pipeline::new(ConvertOptions::new().with_output("configured.docx"));
        let md = Path::new("a.md");
        let tpl = Path::new("t.docx");
        assert_eq!(
            pipeline.output_path(md, tpl, Some(Path::new("explicit.docx"))),
            PathBuf::from("explicit.docx")
        );
        assert_eq!(pipeline.output_path(md, tpl, None), PathBuf::from("configured.docx"));
        assert_eq!(
            Pipeline::default().output_path(md, tpl, None),
            PathBuf::from("t_output.docx")
        );
    }

    #[test]
    fn test_missing_template_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let md = dir.path().join("a.md");
        fs::write(&md, "# T").unwrap();
        let result = Pipeline::default().convert(&md, dir.path().join("missing.docx"), None);
        assert!(matches!(result, Err(crate::Error::Io(_))));
    }
}
