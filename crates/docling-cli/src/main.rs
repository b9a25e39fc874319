// CLI tool has many numeric conversions for progress display and statistics.
// These are safe because:
// - File sizes, durations, and counts are well within representable ranges
// - Progress percentages use f64 which handles all cases
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::similar_names,
    clippy::too_many_lines,
    clippy::needless_pass_by_value,
    clippy::must_use_candidate,
    clippy::unnecessary_wraps
)]

//! Docling CLI - document conversion and inspection tool.
//!
//! Wires `docling-providers` (format detection + parsing) and
//! `docling-pipeline` (the processor chain) into a command-line tool: parse
//! a file, run it through the pipeline, and render it with one of
//! `docling-core`'s renderer adapters.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use docling_core::{
    DoclingError, Document, GraphSerializer, InputFormat, JsonSerializer, MarkdownSerializer,
    PipelineConfig,
};
use docling_pipeline::CancellationToken;
use docling_providers::{DocxProvider, HtmlProvider, PdfProvider, PptxProvider, Provider, XmlProvider};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Verbosity resolved from `--quiet`/`--verbose`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    const fn from_flags(quiet: bool, verbose: bool) -> Self {
        if quiet {
            Self::Quiet
        } else if verbose {
            Self::Verbose
        } else {
            Self::Normal
        }
    }

    const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose)
    }
}

/// Output artifact format (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
enum OutputFormat {
    /// GFM Markdown.
    Markdown,
    /// Hierarchical JSON.
    Json,
    /// Flat vertex/edge graph JSON.
    Graph,
}

impl OutputFormat {
    const fn extension(self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Json | Self::Graph => "json",
        }
    }
}

/// `.docling.toml` configuration. CLI flags always win over this; project
/// config (`./.docling.toml`) wins over user config (`~/.docling.toml`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    convert: Option<ConvertConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    batch: Option<BatchConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
struct ConvertConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    compact: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
struct BatchConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    continue_on_error: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_file_size: Option<u64>,
}

impl Config {
    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    fn discover_configs() -> (Option<Self>, Option<Self>) {
        let user = dirs::home_dir()
            .map(|h| h.join(".docling.toml"))
            .filter(|p| p.exists())
            .and_then(|p| Self::load_from_file(&p).ok());
        let project = PathBuf::from(".docling.toml");
        let project = project.exists().then(|| Self::load_from_file(&project).ok()).flatten();
        (user, project)
    }

    /// CLI args (applied later by callers) > project config > user config > defaults.
    fn merge(user: Option<Self>, project: Option<Self>) -> Self {
        let mut merged = user.unwrap_or_default();
        if let Some(project) = project {
            if project.convert.is_some() {
                merged.convert = project.convert;
            }
            if project.batch.is_some() {
                merged.batch = project.batch;
            }
        }
        merged
    }

    fn resolve_output_format(cli: Option<OutputFormat>, config: Option<&str>) -> OutputFormat {
        if let Some(format) = cli {
            return format;
        }
        match config.map(str::to_lowercase).as_deref() {
            Some("json") => OutputFormat::Json,
            Some("graph") => OutputFormat::Graph,
            _ => OutputFormat::Markdown,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "docling",
    version,
    about = "Convert HTML/XML/PDF/DOCX/PPTX documents into Markdown, JSON, or graph JSON"
)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert a single file
    Convert {
        /// Input file path, or "-" to read from stdin
        input: PathBuf,
        /// Output path ("-" or omitted for stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output format
        #[arg(short, long)]
        format: Option<OutputFormat>,
        /// Force the input format instead of auto-detecting it (required when
        /// reading from stdin, auto-detected from the file otherwise)
        #[arg(long, value_enum)]
        input_format: Option<InputFormatArg>,
        /// Compact (non-pretty-printed) JSON
        #[arg(long)]
        compact: bool,
        /// Overwrite an existing output file
        #[arg(long)]
        force: bool,
        /// Show what would happen without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Convert multiple files
    Batch {
        /// Input file paths (globs expanded by the shell or this tool)
        inputs: Vec<PathBuf>,
        /// Read newline-separated paths from stdin instead of `inputs`
        #[arg(long)]
        stdin: bool,
        /// Directory to write converted files into (mirrors input names)
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Output format
        #[arg(short, long)]
        format: Option<OutputFormat>,
        /// Keep going after a file fails instead of stopping the batch
        #[arg(long)]
        continue_on_error: bool,
        /// Skip files larger than this many bytes
        #[arg(long)]
        max_size: Option<u64>,
        /// Compact (non-pretty-printed) JSON
        #[arg(long)]
        compact: bool,
    },

    /// Show document structure without converting
    Info {
        /// Input file path
        input: PathBuf,
        /// Emit machine-readable JSON instead of a text summary
        #[arg(long)]
        json: bool,
    },

    /// List supported input formats
    Formats {
        /// Emit machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage `.docling.toml` configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
enum InputFormatArg {
    Pdf,
    Docx,
    Pptx,
    Xml,
    Html,
}

impl From<InputFormatArg> for InputFormat {
    fn from(value: InputFormatArg) -> Self {
        match value {
            InputFormatArg::Pdf => Self::Pdf,
            InputFormatArg::Docx => Self::Docx,
            InputFormatArg::Pptx => Self::Pptx,
            InputFormatArg::Xml => Self::Xml,
            InputFormatArg::Html => Self::Html,
        }
    }
}

impl InputFormatArg {
    /// Extension used for the temp file materialized from stdin, since
    /// format detection by content/path (`InputFormat::detect`) has nothing
    /// to sniff from a pipe.
    const fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Pptx => "pptx",
            Self::Xml => "xml",
            Self::Html => "html",
        }
    }
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Write a default `.docling.toml`
    Init {
        /// Write to `~/.docling.toml` instead of `./.docling.toml`
        #[arg(long)]
        global: bool,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the merged effective configuration
    Show {
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_fatal(&err);
            ExitCode::FAILURE
        }
    }
}

/// Per §7: on fatal error, a single-line diagnostic plus a structured JSON
/// error record go to stderr.
fn report_fatal(err: &anyhow::Error) {
    eprintln!("{} {err}", "error:".red().bold());
    let (code, message) = err.downcast_ref::<DoclingError>().map_or_else(
        || ("Other".to_string(), err.to_string()),
        |docling_err| (docling_err.code().to_string(), docling_err.to_string()),
    );
    let record = serde_json::json!({ "error_code": code, "message": message });
    eprintln!("{}", serde_json::to_string(&record).unwrap_or_default());
}

fn run() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let (user_config, project_config) = Config::discover_configs();
    let config = Config::merge(user_config, project_config);
    let args = Args::parse();
    let verbosity = Verbosity::from_flags(args.quiet, args.verbose);

    match args.command {
        Commands::Convert {
            input,
            output,
            format,
            input_format,
            compact,
            force,
            dry_run,
        } => {
            let (resolved_input, _stdin_temp) = resolve_stdin_input(&input, input_format)?;
            convert_command(&resolved_input, output.as_deref(), format, input_format, compact, force, dry_run, &config, verbosity)
        }
        Commands::Batch {
            inputs,
            stdin,
            output_dir,
            format,
            continue_on_error,
            max_size,
            compact,
        } => batch_command(inputs, stdin, output_dir, format, continue_on_error, max_size, compact, &config, verbosity),
        Commands::Info { input, json } => info_command(&input, json),
        Commands::Formats { json } => formats_command(json),
        Commands::Config { action } => config_command(action, verbosity),
    }
}

/// The table of format adapters this binary ships. PDF/DOCX/PPTX are wired
/// with their default `Null*` extractor (§4.2's out-of-scope boundary), so
/// they parse to a structurally valid but empty `Document` unless a real
/// extractor is injected by an embedding application.
fn providers() -> Vec<Box<dyn Provider>> {
    vec![
        Box::new(HtmlProvider::new()),
        Box::new(XmlProvider::new()),
        Box::new(PdfProvider::default()),
        Box::new(DocxProvider::default()),
        Box::new(PptxProvider::default()),
    ]
}

/// Resolves `input` to a real on-disk path, materializing stdin into a
/// named temp file (with an extension matching `--input-format`) when
/// `input` is exactly `"-"`. The returned `NamedTempFile` must outlive the
/// conversion — it deletes itself on drop.
fn resolve_stdin_input(input: &Path, input_format: Option<InputFormatArg>) -> Result<(PathBuf, Option<tempfile::NamedTempFile>)> {
    if input.as_os_str() != "-" {
        return Ok((input.to_path_buf(), None));
    }
    let Some(format) = input_format else {
        anyhow::bail!("--input-format is required when reading from stdin");
    };

    let mut buf = Vec::new();
    io::stdin().read_to_end(&mut buf).context("failed to read from stdin")?;

    let mut temp = tempfile::Builder::new()
        .suffix(&format!(".{}", format.extension()))
        .tempfile()
        .context("failed to create a temporary file for stdin input")?;
    temp.write_all(&buf).context("failed to write stdin content to temporary file")?;
    let path = temp.path().to_path_buf();
    Ok((path, Some(temp)))
}

/// Detects `path`'s format (honoring an explicit override), parses it with
/// the matching provider, and runs it through the default processor
/// pipeline. Fatal errors (§7) propagate as-is; this is the one function
/// every command that touches a real document goes through.
fn convert_document(path: &Path, forced_format: Option<InputFormat>) -> Result<Document, DoclingError> {
    let bytes = fs::read(path).map_err(DoclingError::Io)?;
    let format = forced_format
        .or_else(|| InputFormat::detect(&bytes, Some(path)))
        .ok_or_else(|| DoclingError::UnsupportedFormat(format!("could not detect format of {}", path.display())))?;

    let table = providers();
    let provider = docling_providers::select(&table, format)
        .ok_or_else(|| DoclingError::UnsupportedFormat(format!("no provider registered for {format}")))?;

    let mut doc = provider.parse_bytes(&bytes)?;
    doc.metadata.source_format = Some(format);

    let pipeline_config = PipelineConfig::default();
    let pipeline = docling_pipeline::default_pipeline(&pipeline_config)?;
    let start = std::time::Instant::now();
    pipeline.run(&mut doc, &pipeline_config, &CancellationToken::new())?;
    doc.metadata.processing_time_ms = Some(start.elapsed().as_millis() as u64);
    Ok(doc)
}

fn render(doc: &Document, format: OutputFormat, compact: bool) -> Result<String> {
    match format {
        OutputFormat::Markdown => Ok(MarkdownSerializer::new().serialize(doc)),
        OutputFormat::Json => {
            let serializer = JsonSerializer::new();
            if compact {
                Ok(serde_json::to_string(&serializer.to_value(doc))?)
            } else {
                Ok(serializer.serialize(doc)?)
            }
        }
        OutputFormat::Graph => {
            let serializer = GraphSerializer::new();
            if compact {
                Ok(serde_json::to_string(&serializer.to_value(doc))?)
            } else {
                Ok(serializer.serialize(doc)?)
            }
        }
    }
}

fn smart_output_path(input: &Path, format: OutputFormat) -> PathBuf {
    input.with_extension(format.extension())
}

#[allow(clippy::fn_params_excessive_bools)]
fn convert_command(
    input: &Path,
    output: Option<&Path>,
    format: Option<OutputFormat>,
    input_format: Option<InputFormatArg>,
    compact: bool,
    force: bool,
    dry_run: bool,
    config: &Config,
    verbosity: Verbosity,
) -> Result<()> {
    let format = Config::resolve_output_format(format, config.convert.as_ref().and_then(|c| c.format.as_deref()));
    let compact = compact || config.convert.as_ref().and_then(|c| c.compact).unwrap_or(false);

    if verbosity.is_verbose() {
        eprintln!("{} {}", "Converting:".cyan().bold(), input.display());
    }

    let doc = convert_document(input, input_format.map(InputFormat::from))?;
    if !doc.metadata.validation_issues.is_empty() && !verbosity.is_quiet() {
        for issue in &doc.metadata.validation_issues {
            eprintln!("{} {} ({:?})", "warning:".yellow().bold(), issue.message, issue.error_code);
        }
    }

    let rendered = render(&doc, format, compact)?;

    let output_path = output.map(PathBuf::from).filter(|p| p.as_os_str() != "-");
    match output_path {
        None => {
            print!("{rendered}");
            Ok(())
        }
        Some(path) => {
            if dry_run {
                println!("{} would write {} ({} bytes)", "dry-run:".cyan().bold(), path.display(), rendered.len());
                return Ok(());
            }
            if path.exists() && !force {
                anyhow::bail!("output file already exists: {} (use --force to overwrite)", path.display());
            }
            fs::write(&path, &rendered).with_context(|| format!("failed to write {}", path.display()))?;
            if !verbosity.is_quiet() {
                println!("{} {}", "Wrote:".green().bold(), path.display());
            }
            Ok(())
        }
    }
}

#[allow(clippy::too_many_arguments, clippy::fn_params_excessive_bools)]
fn batch_command(
    inputs: Vec<PathBuf>,
    read_stdin: bool,
    output_dir: Option<PathBuf>,
    format: Option<OutputFormat>,
    continue_on_error: bool,
    max_size: Option<u64>,
    compact: bool,
    config: &Config,
    verbosity: Verbosity,
) -> Result<()> {
    let format = Config::resolve_output_format(format, config.batch.as_ref().and_then(|c| c.format.as_deref()));
    let compact = compact || config.convert.as_ref().and_then(|c| c.compact).unwrap_or(false);
    let continue_on_error = continue_on_error || config.batch.as_ref().and_then(|c| c.continue_on_error).unwrap_or(false);
    let max_size = max_size.or_else(|| config.batch.as_ref().and_then(|c| c.max_file_size));

    let mut files = inputs;
    if read_stdin {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).context("failed to read stdin")?;
        files.extend(buf.lines().filter(|l| !l.trim().is_empty()).map(PathBuf::from));
    }
    if files.is_empty() {
        anyhow::bail!("no input files given (pass paths, or --stdin)");
    }

    if let Some(dir) = &output_dir {
        fs::create_dir_all(dir).with_context(|| format!("failed to create output directory {}", dir.display()))?;
    }

    let progress = if verbosity.is_quiet() {
        None
    } else {
        let bar = ProgressBar::new(files.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Some(bar)
    };

    // One file's worth of work: convert, render, write. Pure aside from the
    // filesystem write, so safe to call from any worker-pool thread.
    let process_one = |input: &PathBuf| -> Result<()> {
        if let Some(limit) = max_size {
            if let Ok(meta) = fs::metadata(input) {
                if meta.len() > limit {
                    if !verbosity.is_quiet() {
                        eprintln!("{} skipping {} ({} bytes > max-size)", "skip:".yellow().bold(), input.display(), meta.len());
                    }
                    return Ok(());
                }
            }
        }
        let doc = convert_document(input, None)?;
        let rendered = render(&doc, format, compact)?;
        let out_path = output_dir
            .as_ref()
            .map(|dir| dir.join(input.file_name().unwrap_or_default()).with_extension(format.extension()))
            .unwrap_or_else(|| smart_output_path(input, format));
        fs::write(&out_path, rendered).with_context(|| format!("failed to write {}", out_path.display()))?;
        Ok(())
    };

    // Sequential by default for fail-fast behavior; once `--continue-on-error`
    // is set there's no early abort to preserve, so per-file work runs across
    // a bounded worker pool instead (§5's per-item data-parallel model).
    let (succeeded, failed) = if continue_on_error {
        use rayon::prelude::*;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(docling_core::PipelineConfig::default().parallelism.max(1))
            .build()
            .context("failed to build batch worker pool")?;
        let results: Vec<Result<()>> = pool.install(|| {
            files
                .par_iter()
                .map(|input| {
                    let result = process_one(input);
                    if let Some(bar) = &progress {
                        bar.inc(1);
                    }
                    result
                })
                .collect()
        });
        let mut succeeded = 0usize;
        let mut failed = 0usize;
        for (input, result) in files.iter().zip(results) {
            match result {
                Ok(()) => succeeded += 1,
                Err(err) => {
                    failed += 1;
                    eprintln!("{} {}: {err}", "error:".red().bold(), input.display());
                }
            }
        }
        (succeeded, failed)
    } else {
        let mut succeeded = 0usize;
        let mut failed = 0usize;
        for input in &files {
            match process_one(input) {
                Ok(()) => succeeded += 1,
                Err(err) => {
                    failed += 1;
                    eprintln!("{} {}: {err}", "error:".red().bold(), input.display());
                    anyhow::bail!("batch stopped after failure on {} ({succeeded} succeeded first)", input.display());
                }
            }
            if let Some(bar) = &progress {
                bar.inc(1);
            }
        }
        (succeeded, failed)
    };
    if let Some(bar) = progress {
        bar.finish_and_clear();
    }
    if !verbosity.is_quiet() {
        println!("{} {succeeded} converted, {failed} failed", "Batch complete:".green().bold());
    }
    if failed > 0 && !continue_on_error {
        anyhow::bail!("{failed} file(s) failed");
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
struct DocumentInfo {
    path: PathBuf,
    format: String,
    pages: usize,
    blocks: usize,
    tables: usize,
    code_blocks: usize,
    section_headers: usize,
    validation_issues: usize,
    processing_time_ms: Option<u64>,
    modified: Option<String>,
}

/// Formats a file's last-modified time as `YYYY-MM-DD HH:MM:SS` UTC, or
/// `None` when the filesystem doesn't report one.
fn file_modified_time(input: &Path) -> Option<String> {
    let modified = std::fs::metadata(input).ok()?.modified().ok()?;
    let secs = modified.duration_since(std::time::UNIX_EPOCH).ok()?.as_secs();
    let datetime = chrono::DateTime::from_timestamp(secs as i64, 0)?;
    Some(datetime.format("%Y-%m-%d %H:%M:%S").to_string())
}

fn info_command(input: &Path, json_output: bool) -> Result<()> {
    let doc = convert_document(input, None)?;
    let info = DocumentInfo {
        path: input.to_path_buf(),
        format: doc.metadata.source_format.map_or_else(|| "unknown".to_string(), |f| f.to_string()),
        pages: doc.pages.len(),
        blocks: doc.block_count(),
        tables: doc.iter(docling_core::Kind::Table, false).len(),
        code_blocks: doc.iter(docling_core::Kind::Code, false).len(),
        section_headers: doc.iter(docling_core::Kind::SectionHeader, false).len(),
        validation_issues: doc.metadata.validation_issues.len(),
        processing_time_ms: doc.metadata.processing_time_ms,
        modified: file_modified_time(input),
    };

    if json_output {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("{}", "Document Info".bold());
        println!("  Path:      {}", info.path.display());
        println!("  Format:    {}", info.format);
        println!("  Pages:     {}", info.pages);
        println!("  Blocks:    {}", info.blocks);
        println!("  Tables:    {}", info.tables);
        println!("  Code:      {}", info.code_blocks);
        println!("  Sections:  {}", info.section_headers);
        println!("  Issues:    {}", info.validation_issues);
        if let Some(ref modified) = info.modified {
            println!("  Modified:  {modified}");
        }
        if let Some(ms) = info.processing_time_ms {
            println!("  Time:      {ms}ms");
        }
    }
    Ok(())
}

fn formats_command(json_output: bool) -> Result<()> {
    let rows = [
        ("html", "full", "scraper DOM walk"),
        ("xml", "full", "roxmltree element walk"),
        ("pdf", "external extractor required", "out of scope per spec §1"),
        ("docx", "external extractor required", "out of scope per spec §1"),
        ("pptx", "external extractor required", "out of scope per spec §1"),
    ];
    if json_output {
        let value: Vec<_> = rows
            .iter()
            .map(|(fmt, support, note)| serde_json::json!({ "format": fmt, "support": support, "note": note }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{}", "Supported Formats".bold());
        for (fmt, support, note) in rows {
            println!("  {:<6} {:<28} {}", fmt, support, note.dimmed());
        }
    }
    Ok(())
}

fn config_command(action: ConfigAction, verbosity: Verbosity) -> Result<()> {
    match action {
        ConfigAction::Init { global, force } => config_init(global, force, verbosity),
        ConfigAction::Show { json } => config_show(json),
    }
}

fn config_init(global: bool, force: bool, verbosity: Verbosity) -> Result<()> {
    let path = if global {
        dirs::home_dir().context("could not determine home directory")?.join(".docling.toml")
    } else {
        PathBuf::from(".docling.toml")
    };
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let default_toml = "[convert]\nformat = \"markdown\"\ncompact = false\n\n[batch]\nformat = \"markdown\"\ncontinue_on_error = false\n";
    fs::write(&path, default_toml).with_context(|| format!("failed to write {}", path.display()))?;
    if !verbosity.is_quiet() {
        println!("{} {}", "Wrote:".green().bold(), path.display());
    }
    Ok(())
}

fn config_show(json_output: bool) -> Result<()> {
    let (user, project) = Config::discover_configs();
    let merged = Config::merge(user, project);
    if json_output {
        println!("{}", serde_json::to_string_pretty(&merged)?);
    } else {
        println!("{}", toml::to_string_pretty(&merged)?);
    }
    Ok(())
}
