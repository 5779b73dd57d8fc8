#![forbid(unsafe_code)]

//! alps2dot - validate ALPS profiles and render them as DOT state diagrams.
//!
//! # Commands
//!
//! - `render`: Convert a profile to Graphviz DOT source
//! - `validate`: Check a profile and report issues
//! - `parse`: Output the normalized profile or its graph as JSON
//! - `detect`: Show the detected input format
//! - `merge`: Merge one profile into another and report conflicts

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use alps_cli::config::load_config;
use alps_cli::{ConvertOptions, convert};
use alps_core::{
    MergeConflict, MergeStats, SourceFormat, ValidationIssue, ValidationResult, merge_documents,
};
use alps_graph::build_model;
use alps_parser::{detect_format, parse, parse_evidence_json};
use alps_render_dot::LabelMode;
use alps_resolver::resolve_local;
use alps_validate::validate_source;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{debug, info, warn};

/// alps2dot - validate ALPS profiles and render them as DOT state diagrams.
#[derive(Debug, Parser)]
#[command(
    name = "alps2dot",
    version,
    about = "alps2dot - validate ALPS profiles and render them as DOT state diagrams",
    long_about = "Reads ALPS profiles in JSON or XML, resolves local and external references,\n\
        and emits Graphviz DOT source describing the application-state diagram."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging (can be repeated for more detail: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render a profile to DOT source.
    Render {
        /// Input file path or "-" for stdin. If omitted, reads from stdin.
        #[arg(default_value = "-")]
        input: String,

        /// Input format
        #[arg(short, long, value_enum, default_value = "auto")]
        format: InputFormat,

        /// Label nodes and transitions by id or by title
        #[arg(short, long, value_enum)]
        label: Option<LabelArg>,

        /// Output file path. If omitted, writes to stdout.
        #[arg(short, long)]
        output: Option<String>,

        /// Configuration file (defaults to ./alps.toml when present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Leave external references unresolved instead of loading them
        #[arg(long)]
        no_external: bool,

        /// Timeout for each external load, in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Directory relative references are resolved against
        #[arg(long)]
        base_dir: Option<PathBuf>,

        /// Print conversion metadata as JSON to stderr
        #[arg(long)]
        json: bool,
    },

    /// Parse a profile and output it as JSON.
    Parse {
        /// Input file path or "-" for stdin.
        #[arg(default_value = "-")]
        input: String,

        /// Input format
        #[arg(short, long, value_enum, default_value = "auto")]
        format: InputFormat,

        /// Output the full normalized document (default is summary)
        #[arg(long, conflicts_with = "graph")]
        full: bool,

        /// Output the node/link graph instead of the document
        #[arg(long)]
        graph: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Detect the input format.
    Detect {
        /// Input file path or "-" for stdin.
        #[arg(default_value = "-")]
        input: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a profile and report issues.
    Validate {
        /// Input file path or "-" for stdin.
        #[arg(default_value = "-")]
        input: String,

        /// Input format
        #[arg(short, long, value_enum, default_value = "auto")]
        format: InputFormat,

        /// Output as JSON (structured issues)
        #[arg(long)]
        json: bool,

        /// Exit with non-zero status on warnings (not just errors)
        #[arg(long)]
        strict: bool,
    },

    /// Merge the top-level descriptors of SOURCE into BASE.
    Merge {
        /// Base profile file path
        base: String,

        /// Profile whose descriptors are merged in
        source: String,

        /// Output file path for the merged profile. If omitted, writes to stdout.
        #[arg(short, long)]
        output: Option<String>,

        /// Print stats and conflicts as JSON to stderr
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum InputFormat {
    Auto,
    Json,
    Xml,
}

impl InputFormat {
    const fn hint(self) -> Option<SourceFormat> {
        match self {
            Self::Auto => None,
            Self::Json => Some(SourceFormat::Json),
            Self::Xml => Some(SourceFormat::Xml),
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum LabelArg {
    Id,
    Title,
}

impl From<LabelArg> for LabelMode {
    fn from(label: LabelArg) -> Self {
        match label {
            LabelArg::Id => Self::Id,
            LabelArg::Title => Self::Title,
        }
    }
}

/// Metadata printed by `render --json`.
#[derive(Debug, Serialize)]
struct RenderResult {
    format: String,
    title: Option<String>,
    node_count: usize,
    link_count: usize,
    declared_nodes: usize,
    hidden_nodes: usize,
    edges: usize,
    grouped_edges: usize,
    externals_loaded: usize,
    externals_failed: usize,
    unresolved: usize,
    error_count: usize,
    warning_count: usize,
    suggestion_count: usize,
    output_bytes: usize,
    total_time_ms: f64,
    warnings: Vec<String>,
}

/// Result of detecting the input format.
#[derive(Debug, Serialize)]
struct DetectResult {
    format: String,
    detection_method: String,
    first_line: String,
}

/// Result of validating a profile.
#[derive(Debug, Serialize)]
struct ValidateResult<'a> {
    valid: bool,
    strict: bool,
    #[serde(flatten)]
    issues: &'a ValidationResult,
}

#[derive(Debug, Serialize)]
struct MergeReport<'a> {
    stats: MergeStats,
    conflicts: &'a [MergeConflict],
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Command::Render {
            input,
            format,
            label,
            output,
            config,
            no_external,
            timeout_ms,
            base_dir,
            json,
        } => cmd_render(&RenderArgs {
            input,
            format,
            label,
            output,
            config,
            no_external,
            timeout_ms,
            base_dir,
            json,
        }),

        Command::Parse {
            input,
            format,
            full,
            graph,
            pretty,
        } => cmd_parse(&input, format, full, graph, pretty),

        Command::Detect { input, json } => cmd_detect(&input, json),

        Command::Validate {
            input,
            format,
            json,
            strict,
        } => cmd_validate(&input, format, json, strict),

        Command::Merge {
            base,
            source,
            output,
            json,
        } => cmd_merge(&base, &source, output.as_deref(), json),
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .without_time()
        .try_init();
}

fn load_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        Ok(buffer)
    } else if Path::new(input).exists() {
        std::fs::read_to_string(input).context(format!("Failed to read file: {input}"))
    } else {
        // Treat as inline profile text
        Ok(input.to_string())
    }
}

/// Directory of a file input, used to anchor relative references.
fn input_dir(input: &str) -> Option<PathBuf> {
    let path = Path::new(input);
    if input == "-" || !path.is_file() {
        return None;
    }
    path.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

fn write_output(output: Option<&str>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content).context(format!("Failed to write to: {path}"))?;
            info!("Wrote output to: {path}");
        }
        None => {
            io::stdout()
                .write_all(content.as_bytes())
                .context("Failed to write to stdout")?;
        }
    }
    Ok(())
}

fn print_issue(issue: &ValidationIssue) {
    let id = issue
        .id
        .as_deref()
        .map(|id| format!(" [{id}]"))
        .unwrap_or_default();
    println!(
        "  [{}] {} at {}{}",
        issue.code.as_str(),
        issue.message,
        issue.path,
        id
    );
    println!("       → {}", issue.code.summary());
}

// =============================================================================
// Command: render
// =============================================================================

struct RenderArgs {
    input: String,
    format: InputFormat,
    label: Option<LabelArg>,
    output: Option<String>,
    config: Option<PathBuf>,
    no_external: bool,
    timeout_ms: Option<u64>,
    base_dir: Option<PathBuf>,
    json: bool,
}

fn cmd_render(args: &RenderArgs) -> Result<()> {
    let total_start = Instant::now();

    let config = load_config(args.config.as_deref()).context("Failed to load configuration")?;
    let mut render = config
        .render_config()
        .context("Invalid render configuration")?;
    if let Some(label) = args.label {
        render.label_mode = label.into();
    }

    let mut resolver = config.resolver_config(input_dir(&args.input).as_deref());
    if let Some(timeout_ms) = args.timeout_ms {
        resolver.fetch_timeout = Duration::from_millis(timeout_ms);
    }
    if let Some(base_dir) = &args.base_dir {
        resolver.base_dir = Some(base_dir.clone());
    }

    let options = ConvertOptions {
        render,
        resolver,
        resolve_external: !args.no_external,
    };

    let source = load_input(&args.input)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let conversion = runtime
        .block_on(convert(&source, args.format.hint(), &options))
        .context("Failed to convert profile")?;

    debug!(
        "Converted: format={}, nodes={}, links={}, unresolved={}",
        conversion.format,
        conversion.model.nodes.len(),
        conversion.model.links.len(),
        conversion.report.unresolved
    );

    for warning in &conversion.warnings {
        warn!("Parse warning: {warning}");
    }
    for issue in &conversion.validation.errors {
        warn!(
            "Validation error {}: {} at {}",
            issue.code.as_str(),
            issue.message,
            issue.path
        );
    }

    let total_time = total_start.elapsed();

    if args.json {
        let counts = conversion.validation.counts();
        let result = RenderResult {
            format: conversion.format.as_str().to_string(),
            title: conversion.model.title.clone(),
            node_count: conversion.model.nodes.len(),
            link_count: conversion.model.links.len(),
            declared_nodes: conversion.stats.declared_nodes,
            hidden_nodes: conversion.stats.hidden_nodes,
            edges: conversion.stats.edges,
            grouped_edges: conversion.stats.grouped_edges,
            externals_loaded: conversion.report.loaded,
            externals_failed: conversion.report.failed,
            unresolved: conversion.report.unresolved,
            error_count: counts.errors,
            warning_count: counts.warnings,
            suggestion_count: counts.suggestions,
            output_bytes: conversion.dot.len(),
            total_time_ms: total_time.as_secs_f64() * 1000.0,
            warnings: conversion.warnings.clone(),
        };

        let json_str = serde_json::to_string_pretty(&result)?;
        eprintln!("{json_str}");
    }

    write_output(args.output.as_deref(), &conversion.dot)?;

    info!(
        "Rendered {} nodes, {} edges in {:.2}ms",
        conversion.stats.declared_nodes,
        conversion.stats.edges,
        total_time.as_secs_f64() * 1000.0
    );

    Ok(())
}

// =============================================================================
// Command: parse
// =============================================================================

fn cmd_parse(
    input: &str,
    format: InputFormat,
    full: bool,
    graph: bool,
    pretty: bool,
) -> Result<()> {
    let source = load_input(input)?;
    let parsed = parse(&source, format.hint()).context("Failed to parse profile")?;

    let output = if graph {
        let model = build_model(&resolve_local(&parsed.document));
        if pretty {
            serde_json::to_string_pretty(&model)?
        } else {
            serde_json::to_string(&model)?
        }
    } else if full {
        parsed.document.to_json_string(pretty)?
    } else if pretty {
        let value: serde_json::Value = serde_json::from_str(&parse_evidence_json(&parsed))?;
        serde_json::to_string_pretty(&value)?
    } else {
        parse_evidence_json(&parsed)
    };

    println!("{output}");

    for warning in &parsed.warnings {
        warn!("Parse warning: {warning}");
    }

    Ok(())
}

// =============================================================================
// Command: detect
// =============================================================================

fn cmd_detect(input: &str, json_output: bool) -> Result<()> {
    let source = load_input(input)?;
    let detected = detect_format(&source, None).context("Failed to detect format")?;

    let first_line = source
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
        .chars()
        .take(80)
        .collect::<String>();

    let result = DetectResult {
        format: detected.format.as_str().to_string(),
        detection_method: detected.method.as_str().to_string(),
        first_line,
    };

    if json_output {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Format: {}", result.format);
        println!("Method: {}", result.detection_method);
        println!("First line: {}", result.first_line);
    }

    Ok(())
}

// =============================================================================
// Command: validate
// =============================================================================

fn cmd_validate(input: &str, format: InputFormat, json_output: bool, strict: bool) -> Result<()> {
    let source = load_input(input)?;
    let issues = validate_source(&source, format.hint()).context("Failed to parse profile")?;

    let counts = issues.counts();
    let valid = issues.is_valid && (!strict || counts.warnings == 0);

    if json_output {
        let result = ValidateResult {
            valid,
            strict,
            issues: &issues,
        };
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        if valid {
            println!("✓ Valid ALPS profile");
        } else {
            println!("✗ Invalid ALPS profile");
        }

        println!("  Errors: {}", counts.errors);
        println!("  Warnings: {}", counts.warnings);
        println!("  Suggestions: {}", counts.suggestions);

        for (heading, list) in [
            ("Errors", &issues.errors),
            ("Warnings", &issues.warnings),
            ("Suggestions", &issues.suggestions),
        ] {
            if list.is_empty() {
                continue;
            }
            println!("\n{heading}:");
            for issue in list {
                print_issue(issue);
            }
        }
    }

    if !valid {
        std::process::exit(1);
    }

    Ok(())
}

// =============================================================================
// Command: merge
// =============================================================================

fn cmd_merge(base: &str, source: &str, output: Option<&str>, json_output: bool) -> Result<()> {
    let base_text = load_input(base)?;
    let source_text = load_input(source)?;
    let base_doc = parse(&base_text, None)
        .context(format!("Failed to parse base profile: {base}"))?
        .document;
    let source_doc = parse(&source_text, None)
        .context(format!("Failed to parse source profile: {source}"))?
        .document;

    let result = merge_documents(&base_doc, &source_doc);
    let mut merged = result.merged.to_json_string(true)?;
    merged.push('\n');
    write_output(output, &merged)?;

    if json_output {
        let report = MergeReport {
            stats: result.stats,
            conflicts: &result.conflicts,
        };
        eprintln!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        eprintln!(
            "Merged: {} added, {} skipped, {} conflicts",
            result.stats.added, result.stats.skipped, result.stats.conflicts
        );
        for conflict in &result.conflicts {
            eprintln!("  ✗ conflict on id '{}' (base entry kept)", conflict.id);
        }
    }

    if result.has_conflicts() {
        std::process::exit(2);
    }

    Ok(())
}
