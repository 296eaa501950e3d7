//! CLI argument definitions for `entify`.

use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "entify",
    version,
    about = "Run rule specifications over JSON records",
    long_about = "Normalize, default-fill, validate, filter and hide record fields \
                  according to a JSON rule specification.\n\n\
                  Rendered records go to stdout (or --output); recorded errors are \
                  summarized on stderr."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format.
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a rule specification over a JSON data file.
    Run(RunArgs),

    /// List the recognised directive names.
    Directives,
}

#[derive(Parser)]
#[command(group(
    ArgGroup::new("rules_input")
        .required(true)
        .args(["rules", "rules_dir"])
))]
pub struct RunArgs {
    /// JSON data file: one record object or an array of records.
    #[arg(value_name = "DATA")]
    pub data: PathBuf,

    /// JSON rules file used as an inline specification.
    #[arg(long = "rules", value_name = "RULES")]
    pub rules: Option<PathBuf>,

    /// Directory of `<model>.json` rule files.
    #[arg(long = "rules-dir", value_name = "DIR", requires = "model")]
    pub rules_dir: Option<PathBuf>,

    /// Model to load from --rules-dir.
    #[arg(long = "model", value_name = "NAME", requires = "rules_dir")]
    pub model: Option<String>,

    /// JSON options file (camelCase option names).
    #[arg(long = "options", value_name = "OPTIONS")]
    pub options: Option<PathBuf>,

    /// Do not run validation rules.
    #[arg(long = "skip-validation")]
    pub skip_validation: bool,

    /// Do not apply any filter directive.
    #[arg(long = "skip-filters")]
    pub skip_filters: bool,

    /// Keep record fields that the rules do not declare.
    #[arg(long = "keep-redundant")]
    pub keep_redundant: bool,

    /// Keep processing after "not found" errors.
    #[arg(long = "continue-on-missing")]
    pub continue_on_missing: bool,

    /// Stop before filters when validation fails.
    #[arg(long = "stop-on-invalid")]
    pub stop_on_invalid: bool,

    /// Filter names never to apply (comma-separated, repeatable).
    #[arg(long = "skip-filter", value_name = "LIST")]
    pub skip_filter: Vec<String>,

    /// Page to export (requires --per-page).
    #[arg(long = "page", value_name = "N", requires = "per_page")]
    pub page: Option<usize>,

    /// Records per page.
    #[arg(long = "per-page", value_name = "M")]
    pub per_page: Option<usize>,

    /// Output format.
    #[arg(long = "format", value_enum, default_value = "json")]
    pub format: OutputFormatArg,

    /// Pretty-print JSON output.
    #[arg(long = "pretty")]
    pub pretty: bool,

    /// Write rendered records to a file instead of stdout.
    #[arg(long = "output", value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// JSON translation catalog for messages.
    #[arg(long = "messages", value_name = "CATALOG")]
    pub messages: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormatArg {
    Json,
    Csv,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
