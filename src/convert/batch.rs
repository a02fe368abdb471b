//! Directory conversion on a worker pool.

use super::Pipeline;
use crate::error::{Error, Result};
use crate::template::Template;
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// One converted file.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSuccess {
    pub input: PathBuf,
    pub output: PathBuf,
    pub placeholder_count: usize,
    pub block_count: usize,
    pub confidence: f32,
    pub warnings: Vec<String>,
}

/// One file that could not be converted.
#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    pub input: PathBuf,
    pub error: String,
}

/// Outcome of a batch run, in input order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub succeeded: Vec<BatchSuccess>,
    pub failed: Vec<BatchFailure>,
}

impl BatchReport {
    /// Number of files attempted.
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// True when every file converted.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Progress notification sent after each file finishes.
#[derive(Debug, Clone)]
pub struct BatchEvent<'a> {
    /// Files finished so far, including this one
    pub completed: usize,
    /// Files in the batch
    pub total: usize,
    pub input: &'a Path,
    pub success: bool,
}

/// Markdown files (`.md`, `.markdown`) directly inside `dir`, sorted by path.
pub fn markdown_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir.as_ref())? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let is_markdown = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("md") || e.eq_ignore_ascii_case("markdown"));
        if is_markdown {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Convert every Markdown file in `input_dir` into `output_dir/<stem>.docx`.
///
/// The template is read and validated once; each file then gets its own
/// [`Template`] built from the shared bytes. A file that fails is recorded
/// in [`BatchReport::failed`] and the rest of the batch continues. Only an
/// unreadable template or input directory aborts the run.
pub fn convert_batch<F>(
    input_dir: &Path,
    output_dir: &Path,
    template_path: &Path,
    pipeline: &Pipeline,
    jobs: usize,
    progress: F,
) -> Result<BatchReport>
where
    F: Fn(&BatchEvent<'_>) + Sync,
{
    let template_bytes = fs::read(template_path)?;
    Template::from_bytes(&template_bytes)?;

    let files = markdown_files(input_dir)?;
    if files.is_empty() {
        log::warn!("No markdown files in {}", input_dir.display());
        return Ok(BatchReport::default());
    }
    fs::create_dir_all(output_dir)?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()
        .map_err(|e| Error::Other(format!("failed to start worker pool: {}", e)))?;

    let total = files.len();
    let completed = AtomicUsize::new(0);
    log::info!("Converting {} files with {} workers", total, jobs.max(1));

    let outcomes: Vec<std::result::Result<BatchSuccess, BatchFailure>> = pool.install(|| {
        files
            .par_iter()
            .map(|input| {
                let outcome = convert_one(input, output_dir, &template_bytes, pipeline);
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                progress(&BatchEvent {
                    completed: done,
                    total,
                    input,
                    success: outcome.is_ok(),
                });
                outcome.map_err(|e| {
                    log::warn!("{}: {}", input.display(), e);
                    BatchFailure {
                        input: input.clone(),
                        error: e.to_string(),
                    }
                })
            })
            .collect()
    });

    let mut report = BatchReport::default();
    for outcome in outcomes {
        match outcome {
            Ok(success) => report.succeeded.push(success),
            Err(failure) => report.failed.push(failure),
        }
    }
    log::info!(
        "Batch finished: {} converted, {} failed",
        report.succeeded.len(),
        report.failed.len()
    );
    Ok(report)
}

fn convert_one(
    input: &Path,
    output_dir: &Path,
    template_bytes: &[u8],
    pipeline: &Pipeline,
) -> Result<BatchSuccess> {
    let template = Template::from_bytes(template_bytes)?;
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let output = output_dir.join(format!("{}.docx", stem));

    let result = pipeline.convert_with_template(input, &template, &output)?;
    Ok(BatchSuccess {
        input: input.to_path_buf(),
        output: result.output_path,
        placeholder_count: result.placeholder_count,
        block_count: result.block_count,
        confidence: result.plan.confidence,
        warnings: result.plan.warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_files_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.md", "a.markdown", "c.txt", "D.MD"] {
            fs::write(dir.path().join(name), "# x").unwrap();
        }
        fs::create_dir(dir.path().join("nested.md")).unwrap();

        let files = markdown_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["D.MD", "a.markdown", "b.md"]);
    }

    #[test]
    fn test_bad_template_aborts_batch() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("t.docx");
        fs::write(&template, b"not a zip").unwrap();
        fs::write(dir.path().join("a.md"), "# A").unwrap();

        let result = convert_batch(
            dir.path(),
            &dir.path().join("out"),
            &template,
            &Pipeline::default(),
            2,
            |_| {},
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_report_counts() {
        let mut report = BatchReport::default();
        assert!(report.is_success());
        report.failed.push(BatchFailure {
            input: PathBuf::from("x.md"),
            error: "boom".into(),
        });
        assert_eq!(report.total(), 1);
        assert!(!report.is_success());
    }
}
