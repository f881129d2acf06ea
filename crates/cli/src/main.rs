//! `rowaudit`: source/target completeness checks from the command line.

mod exit_codes;
mod recon;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use exit_codes::{EXIT_RUNTIME, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "rowaudit")]
#[command(version)]
#[command(about = "Check that every active source row arrived in the target")]
#[command(after_help = "\
Exit codes:
  0  passed (missing % below tolerance)
  1  failed (missing % at or above tolerance)
  2  usage error
  3  invalid config
  4  schema error (unknown relation or column)
  5  runtime error (file IO)

Logging goes to stderr. RUST_LOG overrides the level set by -v.")]
struct Cli {
    /// Show debug logging from the engine
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a reconciliation from a TOML config file
    #[command(after_help = "\
Examples:
  rowaudit run orders.recon.toml
  rowaudit run orders.recon.toml --json
  rowaudit run orders.recon.toml --output missing.csv
  rowaudit run orders.recon.toml --tolerance 0.5 --output missing.json --format json")]
    Run {
        /// Path to the .recon.toml config file
        config: PathBuf,

        /// Print the result and diagnostic rows as JSON to stdout
        #[arg(long)]
        json: bool,

        /// Write diagnostic rows to a file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Format of --output (inferred from its extension when omitted)
        #[arg(long, value_enum, requires = "output")]
        format: Option<OutputFormat>,

        /// Override tolerance_percentage from the config
        #[arg(long, env = "ROWAUDIT_TOLERANCE")]
        tolerance: Option<f64>,
    },

    /// Parse and validate a config without scanning any data
    #[command(after_help = "\
Examples:
  rowaudit validate orders.recon.toml")]
    Validate {
        /// Path to the .recon.toml config file
        config: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Json,
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        None => {
            // No subcommand = show usage
            eprintln!("Usage: rowaudit <command> [options]");
            eprintln!("       rowaudit --help for more information");
            Err(CliError::args(""))
        }
        Some(Commands::Run {
            config,
            json,
            output,
            format,
            tolerance,
        }) => recon::cmd_run(config, json, output, format, tolerance),
        Some(Commands::Validate { config }) => recon::cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_RUNTIME, message: msg.into(), hint: None }
    }

    /// Create error from an engine error with the matching exit code.
    pub fn recon(err: rowaudit_recon::ReconError) -> Self {
        use rowaudit_recon::ReconError;

        let code = exit_codes::recon_exit_code(err.kind());
        let hint = match &err {
            ReconError::ConfigParse(_) => {
                Some("check TOML syntax; source_table, target_table and columns_mapping are required".to_string())
            }
            ReconError::MissingColumn { .. } => {
                Some("column names are case-sensitive; check columns_mapping and the *_col settings".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
