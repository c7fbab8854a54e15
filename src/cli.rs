// Command-line interface.
//
// Subcommands mirror the classic tool pair plus index precomputation:
// `diff` produces a patch, `patch` applies one, `index` serialises a
// suffix array for reuse. Omitted outputs land in a temporary file whose
// path is printed to stdout.

use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum, ValueHint};

use crate::compress::Config;
use crate::engine::DiffOptions;
use crate::error::Result;
use crate::format::Format;
use crate::io::{self, OutputSink};

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// Binary diff/patch tool for the BSDIFF40 and ENDSLEY/BSDIFF43 formats.
#[derive(Parser, Debug)]
#[command(
    name = "bsdelta",
    version,
    about = "Binary diff/patch for the bsdiff patch formats",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Force overwrite existing output files.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Produce a patch transforming OLD into NEW.
    Diff(DiffArgs),
    /// Apply a patch to OLD, reconstructing NEW.
    Patch(PatchArgs),
    /// Precompute and serialise the suffix array of OLD.
    Index(IndexArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Classic,
    Endsley,
}

impl From<FormatArg> for Format {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Classic => Format::Classic,
            FormatArg::Endsley => Format::Endsley,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatOrAuto {
    Auto,
    Classic,
    Endsley,
}

impl FormatOrAuto {
    fn requested(self) -> Option<Format> {
        match self {
            Self::Auto => None,
            Self::Classic => Some(Format::Classic),
            Self::Endsley => Some(Format::Endsley),
        }
    }
}

#[derive(Args, Debug)]
struct DiffArgs {
    /// Patch format to produce.
    #[arg(long, value_enum, default_value_t = FormatArg::Classic)]
    format: FormatArg,

    /// Precomputed suffix-array file for OLD (from `bsdelta index`).
    #[arg(long, value_hint = ValueHint::FilePath)]
    index: Option<PathBuf>,

    /// Old file.
    #[arg(value_hint = ValueHint::FilePath)]
    old: PathBuf,

    /// New file.
    #[arg(value_hint = ValueHint::FilePath)]
    new: PathBuf,

    /// Patch output (default: a fresh temporary file).
    #[arg(value_hint = ValueHint::FilePath)]
    patch: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct PatchArgs {
    /// Expected patch format (auto-detected by default).
    #[arg(long, value_enum, default_value_t = FormatOrAuto::Auto)]
    format: FormatOrAuto,

    /// Old file.
    #[arg(value_hint = ValueHint::FilePath)]
    old: PathBuf,

    /// Patch file.
    #[arg(value_hint = ValueHint::FilePath)]
    patch: PathBuf,

    /// Reconstructed output (default: a fresh temporary file).
    #[arg(value_hint = ValueHint::FilePath)]
    new: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct IndexArgs {
    /// Old file.
    #[arg(value_hint = ValueHint::FilePath)]
    old: PathBuf,

    /// Index output (default: a fresh temporary file).
    #[arg(value_hint = ValueHint::FilePath)]
    index: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Output resolution
// ---------------------------------------------------------------------------

/// Refuse to clobber an existing output unless --force was given.
fn resolve_sink(path: Option<&PathBuf>, force: bool) -> Result<OutputSink> {
    if let Some(path) = path
        && path.exists()
        && !force
    {
        return Err(crate::error::Error::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!(
                "output file exists, use -f to overwrite: {}",
                path.display()
            ),
        )));
    }
    Ok(OutputSink::from_opt(path.map(|p| p.as_path())))
}

/// Print the output path when it was freshly chosen for the caller.
fn report_path(path: &std::path::Path, explicit: bool, quiet: bool) {
    if !explicit && !quiet {
        println!("{}", path.display());
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_diff(cli: &Cli, args: &DiffArgs, config: Config) -> Result<()> {
    let opts = DiffOptions {
        format: args.format.into(),
        config,
    };
    let sink = resolve_sink(args.patch.as_ref(), cli.force)?;

    let (path, stats) = match &args.index {
        Some(index) => io::diff_file_with_index(&args.old, index, &args.new, &sink, &opts)?,
        None => io::diff_file(&args.old, &args.new, &sink, &opts)?,
    };

    report_path(&path, args.patch.is_some(), cli.quiet);
    if cli.verbose > 0 && !cli.quiet {
        eprintln!(
            "bsdelta: diff: old {} B, new {} B, patch {} B, {} records",
            stats.old_size, stats.new_size, stats.patch_size, stats.records
        );
    }
    if cli.json_output {
        let json = serde_json::json!({
            "command": "diff",
            "format": opts.format.name(),
            "patch": path.display().to_string(),
            "old_size": stats.old_size,
            "new_size": stats.new_size,
            "patch_size": stats.patch_size,
            "records": stats.records,
        });
        eprintln!("{}", serde_json::to_string_pretty(&json).unwrap());
    }
    Ok(())
}

fn cmd_patch(cli: &Cli, args: &PatchArgs, config: Config) -> Result<()> {
    let sink = resolve_sink(args.new.as_ref(), cli.force)?;

    let (path, stats) = io::apply_file(
        &args.old,
        &args.patch,
        &sink,
        args.format.requested(),
        &config,
    )?;

    report_path(&path, args.new.is_some(), cli.quiet);
    if cli.verbose > 0 && !cli.quiet {
        eprintln!(
            "bsdelta: patch: old {} B, patch {} B, new {} B",
            stats.old_size, stats.patch_size, stats.new_size
        );
    }
    if cli.json_output {
        let json = serde_json::json!({
            "command": "patch",
            "new": path.display().to_string(),
            "old_size": stats.old_size,
            "patch_size": stats.patch_size,
            "new_size": stats.new_size,
        });
        eprintln!("{}", serde_json::to_string_pretty(&json).unwrap());
    }
    Ok(())
}

fn cmd_index(cli: &Cli, args: &IndexArgs) -> Result<()> {
    let sink = resolve_sink(args.index.as_ref(), cli.force)?;
    let path = io::index_file(&args.old, &sink)?;
    report_path(&path, args.index.is_some(), cli.quiet);
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let cli = Cli::parse();

    // Configuration is read once, before any work starts; a bad value is
    // fatal regardless of the subcommand.
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("bsdelta: {e}");
            process::exit(1);
        }
    };

    let result = match &cli.command {
        Cmd::Diff(args) => cmd_diff(&cli, args, config),
        Cmd::Patch(args) => cmd_patch(&cli, args, config),
        Cmd::Index(args) => cmd_index(&cli, args),
    };

    match result {
        Ok(()) => process::exit(0),
        Err(e) => {
            eprintln!("bsdelta: {e}");
            process::exit(1);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
