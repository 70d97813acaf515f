// wledger - merge monthly electricity billing extracts into the ledger

mod exit_codes;
mod ledger;
mod merge;
mod report;
mod settings;
mod util;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use wattledger_io::IoError;
use wattledger_recon::{LedgerMode, PeriodTag, ReconError, TensionClass};

use exit_codes::{io_exit_code, recon_exit_code, EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};
use settings::Settings;

#[derive(Parser)]
#[command(name = "wledger")]
#[command(about = "Merge monthly electricity billing extracts into the ledger")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Config file (default: ./wattledger.toml, then the user config dir)
    #[arg(long, short = 'c', global = true, env = "WLEDGER_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    ledger: LedgerArgs,

    /// More output on stderr (-v info, -vv debug)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Ledger location overrides for the `[store]` config section.
#[derive(Args, Default)]
pub struct LedgerArgs {
    /// Ledger snapshot (.ledger)
    #[arg(long, global = true)]
    pub ledger: Option<PathBuf>,

    /// Spreadsheet used when the snapshot does not exist yet
    #[arg(long, global = true)]
    pub seed: Option<PathBuf>,

    /// Sheet of the seed spreadsheet (default: first)
    #[arg(long, global = true)]
    pub sheet: Option<String>,

    /// Ledger storage mode (default: from config)
    #[arg(long, global = true, value_enum)]
    pub mode: Option<ModeArg>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Wide,
    History,
}

impl From<ModeArg> for LedgerMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Wide => LedgerMode::Wide,
            ModeArg::History => LedgerMode::History,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Merge a monthly extract into the ledger and save it
    #[command(after_help = "\
Examples:
  wledger merge 'BT juin.xlsx' --tension low
  wledger merge extract_ht.csv -t high --json
  wledger merge extract.xlsx -t low --dry-run -v
  wledger merge extract.csv -t low --seed 'BASE BT.xlsx' --mode wide")]
    Merge {
        /// Extract file (xlsx, xls, ods, csv)
        extract: PathBuf,

        /// Tension class of the extract (low/BT or high/HT)
        #[arg(long, short = 't')]
        tension: TensionClass,

        /// Sheet of the extract workbook (default: first)
        #[arg(long)]
        extract_sheet: Option<String>,

        /// Run the merge without saving the ledger
        #[arg(long)]
        dry_run: bool,

        /// Print the merge report as JSON on stdout
        #[arg(long)]
        json: bool,

        /// Also write the JSON report to a file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Exit with an error when no ledger row matches
        #[arg(long)]
        fail_on_no_match: bool,
    },

    /// Check an extract's columns and period without touching the ledger
    #[command(after_help = "\
Examples:
  wledger validate 'BT juin.xlsx' --tension low
  wledger validate extract_ht.csv -t high --rows 10
  wledger validate extract.csv -t low --json")]
    Validate {
        extract: PathBuf,

        #[arg(long, short = 't')]
        tension: TensionClass,

        #[arg(long)]
        extract_sheet: Option<String>,

        /// Number of sample rows to show
        #[arg(long, default_value_t = 5)]
        rows: usize,

        #[arg(long)]
        json: bool,
    },

    /// Compare amounts and consumption between two periods
    #[command(after_help = "\
Examples:
  wledger evolution 05/2024 06/2024
  wledger evolution 202405 202406 --group-by UC
  wledger evolution 05/2024 06/2024 --group-by SITES --where TENSION=BASSE --json")]
    Evolution {
        /// Reference period
        period_a: PeriodTag,

        /// Compared period
        period_b: PeriodTag,

        /// Dimension column to group by
        #[arg(long)]
        group_by: Option<String>,

        /// Equality filter on a ledger column. Repeatable.
        #[arg(long, value_name = "COL=VALUE")]
        r#where: Vec<String>,

        #[arg(long)]
        json: bool,
    },

    /// Totals per period, in chronological order
    #[command(after_help = "\
Examples:
  wledger timeline
  wledger timeline --tension high
  wledger timeline --where UC=ABJ --json")]
    Timeline {
        /// Only rows of this tension class
        #[arg(long, short = 't')]
        tension: Option<TensionClass>,

        #[arg(long, value_name = "COL=VALUE")]
        r#where: Vec<String>,

        #[arg(long)]
        json: bool,
    },

    /// Accounting export of one period and tension class
    #[command(after_help = "\
Examples:
  wledger export --period 06/2024 --tension low -o 'CIE BT 06-2024.xlsx'
  wledger export -p 202406 -t high -o export_ht.csv")]
    Export {
        #[arg(long, short = 'p')]
        period: PeriodTag,

        #[arg(long, short = 't')]
        tension: TensionClass,

        /// Output file (xlsx, csv, tsv or json)
        #[arg(long, short = 'o')]
        output: PathBuf,
    },

    /// Summary figures of the ledger
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Print or export ledger rows
    #[command(after_help = "\
Examples:
  wledger show --where UC=ABJ
  wledger show --where IDENTIFIANT=1001 --select DATE,MONTANT,CONSO
  wledger show --where TENSION=HAUTE -o haute.xlsx
  wledger show --json | jq length")]
    Show {
        #[arg(long, value_name = "COL=VALUE")]
        r#where: Vec<String>,

        /// Columns to output. Repeatable; comma-separated accepted.
        #[arg(long, value_name = "COLS")]
        select: Vec<String>,

        /// Output file (xlsx, csv, tsv or json)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Maximum rows printed to the terminal
        #[arg(long)]
        limit: Option<usize>,

        #[arg(long)]
        json: bool,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  wattledger-recon ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
        "\nsnapshot format: 1",
    )
}

/// `WLEDGER_LOG` wins over `RUST_LOG`; `-v` raises the default level.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    };
    let var = if std::env::var_os("WLEDGER_LOG").is_some() {
        "WLEDGER_LOG"
    } else {
        EnvFilter::DEFAULT_ENV
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default.into())
        .with_env_var(var)
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = run(cli);

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

fn run(cli: Cli) -> Result<(), CliError> {
    let mut settings = Settings::resolve(cli.config.as_deref())?;
    if let Some(mode) = cli.ledger.mode {
        settings.config.mode = mode.into();
    }

    match cli.command {
        Commands::Merge {
            extract,
            tension,
            extract_sheet,
            dry_run,
            json,
            output,
            fail_on_no_match,
        } => merge::cmd_merge(
            &settings,
            &cli.ledger,
            merge::MergeArgs {
                extract,
                tension,
                extract_sheet,
                dry_run,
                json,
                output,
                fail_on_no_match,
            },
        ),
        Commands::Validate { extract, tension, extract_sheet, rows, json } => {
            merge::cmd_validate(&settings, extract, tension, extract_sheet, rows, json)
        }
        Commands::Evolution { period_a, period_b, group_by, r#where, json } => {
            report::cmd_evolution(&settings, &cli.ledger, period_a, period_b, group_by, r#where, json)
        }
        Commands::Timeline { tension, r#where, json } => {
            report::cmd_timeline(&settings, &cli.ledger, tension, r#where, json)
        }
        Commands::Stats { json } => report::cmd_stats(&settings, &cli.ledger, json),
        Commands::Export { period, tension, output } => {
            ledger::cmd_export(&settings, &cli.ledger, period, tension, output)
        }
        Commands::Show { r#where, select, output, limit, json } => {
            ledger::cmd_show(&settings, &cli.ledger, r#where, select, output, limit, json)
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

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
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        let hint = match &err {
            ReconError::Schema { .. } => {
                Some("check the extract column names in the [low.extract] / [high.extract] config".to_string())
            }
            ReconError::AmbiguousPeriod { .. } => {
                Some("split the extract by period, or set period.on_ambiguous = \"first\"".to_string())
            }
            ReconError::UnknownPeriod(_) => Some("`wledger timeline` lists the ledger periods".to_string()),
            _ => None,
        };
        Self { code: recon_exit_code(&err), message: err.to_string(), hint }
    }
}

impl From<IoError> for CliError {
    fn from(err: IoError) -> Self {
        match err {
            IoError::Recon(inner) => inner.into(),
            other => {
                let hint = match &other {
                    IoError::NoLedger { .. } => {
                        Some("pass --seed <spreadsheet> or set store.seed in the config".to_string())
                    }
                    IoError::ModeMismatch { stored, .. } => Some(format!("run with --mode {stored}")),
                    IoError::UnknownSheet { available, .. } => {
                        Some(format!("available sheets: {}", available.join(", ")))
                    }
                    _ => None,
                };
                Self { code: io_exit_code(&other), message: other.to_string(), hint }
            }
        }
    }
}
