//! docxfill CLI - fill DOCX templates with Markdown content

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use docxfill::mapping::{ENV_API_KEY, ENV_BASE_URL, ENV_MODEL};
use docxfill::render::{self, JsonFormat};
use docxfill::{
    convert_batch, ConvertOptions, LlmConfig, MappingEngine, MarkdownParser, Pipeline,
    PlaceholderPattern, Template,
};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "docxfill")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Fill pre-styled DOCX templates with Markdown content", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one Markdown file with a template
    Convert {
        /// Markdown input
        #[arg(value_name = "MARKDOWN")]
        input: PathBuf,

        /// DOCX/DOTX template
        #[arg(value_name = "TEMPLATE")]
        template: PathBuf,

        /// Output file (default: <template>_output.docx next to the input)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[command(flatten)]
        fill: FillArgs,

        #[command(flatten)]
        llm: LlmArgs,
    },

    /// Convert every Markdown file in a directory
    Batch {
        /// Directory with Markdown files
        #[arg(value_name = "INPUT_DIR")]
        input_dir: PathBuf,

        /// Directory for the generated documents
        #[arg(value_name = "OUTPUT_DIR")]
        output_dir: PathBuf,

        /// DOCX/DOTX template
        #[arg(short, long, value_name = "FILE")]
        template: PathBuf,

        /// Parallel workers
        #[arg(short, long, default_value = "4")]
        jobs: usize,

        #[command(flatten)]
        fill: FillArgs,

        #[command(flatten)]
        llm: LlmArgs,
    },

    /// Show template structure: parts, style roles, pages, placeholders
    Analyze {
        /// DOCX/DOTX template
        #[arg(value_name = "TEMPLATE")]
        template: PathBuf,

        /// Placeholder marker form
        #[arg(short, long, value_enum, default_value = "brace")]
        pattern: PatternArg,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the parsed block structure of a Markdown file
    Parse {
        /// Markdown input
        #[arg(value_name = "MARKDOWN")]
        input: PathBuf,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Show version information
    Version,
}

#[derive(Args)]
struct FillArgs {
    /// Placeholder marker form
    #[arg(short, long, value_enum, default_value = "brace")]
    pattern: PatternArg,

    /// Delete placeholders that receive no content
    #[arg(long)]
    remove_unmapped: bool,

    /// Leave document properties (title, modified time) untouched
    #[arg(long)]
    keep_metadata: bool,
}

#[derive(Args)]
struct LlmArgs {
    /// Map content with an LLM (falls back to rules on failure)
    #[arg(long)]
    llm: bool,

    /// OpenAI-compatible API base URL
    #[arg(long, env = ENV_BASE_URL, value_name = "URL")]
    llm_url: Option<String>,

    /// Model name
    #[arg(long, env = ENV_MODEL)]
    model: Option<String>,

    /// API key
    #[arg(long, env = ENV_API_KEY, hide_env_values = true)]
    api_key: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value = "120")]
    timeout: u64,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum PatternArg {
    /// {{NAME}}
    Brace,
    /// [[NAME]]
    Bracket,
    /// <<NAME>>
    Angle,
    /// ___NAME___
    Underscore,
}

impl From<PatternArg> for PlaceholderPattern {
    fn from(arg: PatternArg) -> Self {
        match arg {
            PatternArg::Brace => PlaceholderPattern::Brace,
            PatternArg::Bracket => PlaceholderPattern::Bracket,
            PatternArg::Angle => PlaceholderPattern::Angle,
            PatternArg::Underscore => PlaceholderPattern::Underscore,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = match cli.command {
        Commands::Convert {
            input,
            template,
            output,
            fill,
            llm,
        } => cmd_convert(&input, &template, output.as_deref(), &fill, &llm),
        Commands::Batch {
            input_dir,
            output_dir,
            template,
            jobs,
            fill,
            llm,
        } => cmd_batch(&input_dir, &output_dir, &template, jobs, &fill, &llm),
        Commands::Analyze {
            template,
            pattern,
            json,
        } => cmd_analyze(&template, pattern.into(), json),
        Commands::Parse { input, json } => cmd_parse(&input, json),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn build_pipeline(fill: &FillArgs, llm: &LlmArgs) -> Result<Pipeline, docxfill::Error> {
    let options = ConvertOptions::new()
        .with_pattern(fill.pattern.into())
        .with_metadata_update(!fill.keep_metadata)
        .with_unmapped_removal(fill.remove_unmapped);
    let pipeline = Pipeline::new(options);
    if !llm.llm {
        return Ok(pipeline);
    }

    let mut config = LlmConfig::new().with_timeout(Duration::from_secs(llm.timeout));
    if let Some(url) = &llm.llm_url {
        config = config.with_base_url(url.clone());
    }
    if let Some(model) = &llm.model {
        config = config.with_model(model.clone());
    }
    if let Some(key) = &llm.api_key {
        config = config.with_api_key(key.clone());
    }
    log::info!("LLM mapping via {} ({})", config.base_url, config.model);
    Ok(pipeline.with_engine(MappingEngine::from_config(&config)?))
}

fn cmd_convert(
    input: &Path,
    template: &Path,
    output: Option<&Path>,
    fill: &FillArgs,
    llm: &LlmArgs,
) -> CliResult {
    let pipeline = build_pipeline(fill, llm)?;

    let pb = ProgressBar::new_spinner();
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(format!("Filling {}...", template.display()));

    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(pipeline.convert_async(input, template, output));
    pb.finish_and_clear();
    let result = result?;

    println!("{} {}", "Saved to".green(), result.output_path.display());
    println!(
        "  {} placeholders, {} blocks, confidence {:.2}",
        result.placeholder_count, result.block_count, result.plan.confidence
    );
    println!(
        "  {} replaced, {} removed, {} left, {} paragraphs inserted",
        result.stats.replaced, result.stats.removed, result.stats.kept, result.stats.inserted_paragraphs
    );
    for warning in &result.plan.warnings {
        println!("  {} {}", "warning:".yellow(), warning);
    }
    Ok(())
}

fn cmd_batch(
    input_dir: &Path,
    output_dir: &Path,
    template: &Path,
    jobs: usize,
    fill: &FillArgs,
    llm: &LlmArgs,
) -> CliResult {
    let pipeline = build_pipeline(fill, llm)?;
    let total = docxfill::convert::markdown_files(input_dir)?.len();
    if total == 0 {
        println!("{} no Markdown files in {}", "Nothing to do:".yellow(), input_dir.display());
        return Ok(());
    }

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let report = convert_batch(input_dir, output_dir, template, &pipeline, jobs, |event| {
        pb.set_position(event.completed as u64);
        if let Some(name) = event.input.file_name() {
            pb.set_message(name.to_string_lossy().into_owned());
        }
    })?;
    pb.finish_with_message("Done!");

    println!(
        "\n{} {} converted, {} failed",
        "Batch:".green().bold(),
        report.succeeded.len(),
        report.failed.len()
    );
    for failure in &report.failed {
        println!("  {} {}: {}", "✗".red(), failure.input.display(), failure.error);
    }

    if report.failed.is_empty() {
        Ok(())
    } else {
        Err(format!("{} of {} files failed", report.failed.len(), report.total()).into())
    }
}

fn cmd_analyze(template: &Path, pattern: PlaceholderPattern, json: bool) -> CliResult {
    let report = Template::open(template)?.report(pattern);

    if json {
        println!("{}", render::to_json(&report, JsonFormat::Pretty)?);
        return Ok(());
    }

    println!("{}", "Template Analysis".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "File".bold(), template.display());
    print!("{}", render::template_summary(&report));
    Ok(())
}

fn cmd_parse(input: &Path, json: bool) -> CliResult {
    let doc = MarkdownParser::new().parse_file(input)?;

    if json {
        println!("{}", render::to_json(&doc, JsonFormat::Pretty)?);
        return Ok(());
    }

    println!("{}", "Document Structure".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    print!("{}", render::document_outline(&doc));
    Ok(())
}

fn cmd_version() {
    println!("{} {}", "docxfill".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("DOCX template filling tool");
    println!();
    println!("Repository: {}", "https://github.com/iyulab/docxfill".dimmed());
    println!("License: MIT");
}
