//! Framelabel: fold per-image LabelMe files into one frame-indexed document.
//!
//! A labeling tool writes one JSON file per image. Once those images are
//! packed into a single media bundle (a video or an archive), the bundler's
//! frame manifest says which frame each image became. Framelabel reads the
//! label files, normalizes every polygon and rectangle to one polygon
//! geometry, and writes a single COCO-compatible document whose images are
//! keyed by frame index.
//!
//! # Modules
//!
//! - [`label`]: LabelMe parsing and shape normalization
//! - [`manifest`]: frame manifests and label-to-frame alignment
//! - [`build`]: the document assembler, category registry and build report
//! - [`ir`]: the unified document model and its JSON I/O
//! - [`validation`]: structural checks over a unified document
//! - [`restore`]: the inverse transform back to per-image LabelMe files
//! - [`error`]: error types for framelabel operations

pub mod build;
pub mod error;
pub mod ir;
pub mod label;
pub mod manifest;
pub mod restore;
pub mod validation;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use log::info;

pub use error::FramelabelError;

/// The framelabel CLI application.
#[derive(Parser)]
#[command(name = "framelabel")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Log filter (e.g. 'debug', 'framelabel=trace'); overrides RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Build a unified annotation document from a directory of label files.
    Build(BuildArgs),
    /// Validate a unified annotation document for errors and warnings.
    Validate(ValidateArgs),
    /// Write one LabelMe file per image from a unified annotation document.
    Restore(RestoreArgs),
}

/// Report output format.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// Arguments for the build subcommand.
#[derive(clap::Args)]
struct BuildArgs {
    /// Directory searched recursively for LabelMe `.json` files.
    #[arg(env = "FRAMELABEL_LABELS")]
    labels: PathBuf,

    /// Output path for the unified annotation document.
    #[arg(short, long)]
    output: PathBuf,

    /// Directory holding the labeled images.
    #[arg(long, env = "FRAMELABEL_IMAGES")]
    images: Option<PathBuf>,

    /// Frame manifest written by the bundler ('-' reads stdin).
    #[arg(long, env = "FRAMELABEL_MANIFEST")]
    manifest: Option<PathBuf>,

    /// Fail if no manifest can be loaded.
    #[arg(long)]
    require_manifest: bool,

    /// Ignore any manifest and order frames by label file path.
    #[arg(long)]
    skip_manifest: bool,

    /// Skip labels whose image is missing under --images instead of failing.
    #[arg(long)]
    skip_missing_images: bool,

    /// Skip malformed label files instead of failing.
    #[arg(long)]
    isolate_label_failures: bool,

    /// Bundle path to record in the document (defaults to the manifest's).
    #[arg(long)]
    bundle_path: Option<String>,

    /// Free-text description to record in the document.
    #[arg(long)]
    description: Option<String>,

    /// Output format for the build report.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    report: ReportFormat,
}

/// Arguments for the validate subcommand.
#[derive(clap::Args)]
struct ValidateArgs {
    /// Unified annotation document to validate.
    input: PathBuf,

    /// Treat warnings as errors (exit non-zero if any warnings).
    #[arg(long)]
    strict: bool,

    /// Output format for the report.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    output: ReportFormat,
}

/// Arguments for the restore subcommand.
#[derive(clap::Args)]
struct RestoreArgs {
    /// Unified annotation document to restore from.
    input: PathBuf,

    /// Directory the LabelMe files are written into.
    #[arg(short, long)]
    output: PathBuf,

    /// Also write shape-less files for frames that had no label file.
    #[arg(long)]
    include_unlabeled: bool,
}

/// Run the framelabel CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), FramelabelError> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    match cli.command {
        Some(Commands::Build(args)) => run_build(args),
        Some(Commands::Validate(args)) => run_validate(args),
        Some(Commands::Restore(args)) => run_restore(args),
        None => {
            println!("framelabel {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Fold per-image LabelMe files into one frame-indexed annotation document.");
            println!();
            println!("Run 'framelabel --help' for usage information.");
            Ok(())
        }
    }
}

fn init_logging(filter: Option<&str>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(filter) = filter {
        builder.parse_filters(filter);
    }
    // Keep an already-installed logger.
    let _ = builder.try_init();
}

/// Execute the build subcommand.
fn run_build(args: BuildArgs) -> Result<(), FramelabelError> {
    let options = build::BuildOptions {
        skip_missing_images: args.skip_missing_images,
        require_manifest: args.require_manifest,
        skip_manifest: args.skip_manifest,
        image_root: args.images,
        isolate_label_failures: args.isolate_label_failures,
        bundle_path: args.bundle_path,
        description: args.description,
    };

    let manifest = manifest::resolve_manifest(args.manifest.as_deref(), options.manifest_policy())?;
    let outcome = build::build_document(&args.labels, &manifest, &options)?;

    ir::io_json::write_document(&args.output, &outcome.document)?;
    info!("wrote {}", args.output.display());

    match args.report {
        ReportFormat::Json => println!("{}", to_pretty_json(&outcome.report)?),
        ReportFormat::Text => {
            println!("Built {}:", args.output.display());
            print!("{}", outcome.report);
        }
    }
    Ok(())
}

/// Execute the validate subcommand.
fn run_validate(args: ValidateArgs) -> Result<(), FramelabelError> {
    let document = ir::io_json::read_document(&args.input)?;

    let opts = validation::ValidateOptions {
        strict: args.strict,
    };
    let report = validation::validate_document(&document, &opts);

    match args.output {
        ReportFormat::Json => {
            let summary = serde_json::json!({
                "error_count": report.error_count(),
                "warning_count": report.warning_count(),
                "issues": report.issues,
            });
            println!("{}", to_pretty_json(&summary)?);
        }
        ReportFormat::Text => print!("{}", report),
    }

    let has_errors = report.error_count() > 0;
    let has_warnings = report.warning_count() > 0;

    if has_errors || (args.strict && has_warnings) {
        Err(FramelabelError::ValidationFailed {
            error_count: report.error_count(),
            warning_count: report.warning_count(),
            report,
        })
    } else {
        Ok(())
    }
}

/// Execute the restore subcommand.
fn run_restore(args: RestoreArgs) -> Result<(), FramelabelError> {
    let document = ir::io_json::read_document(&args.input)?;
    let options = restore::RestoreOptions {
        include_unlabeled: args.include_unlabeled,
    };
    let written = restore::write_restored_labels(&args.output, &document, &options)?;
    println!(
        "Restored {} label file(s) into {}",
        written,
        args.output.display()
    );
    Ok(())
}

fn to_pretty_json<T: serde::Serialize>(value: &T) -> Result<String, FramelabelError> {
    serde_json::to_string_pretty(value).map_err(|err| FramelabelError::Io(err.into()))
}
