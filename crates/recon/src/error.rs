use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconError {
    /// Extract is missing one or more required role columns.
    #[error(
        "extract is missing column(s): {}; columns present: {}",
        quote_list(missing),
        quote_list(present)
    )]
    Schema {
        missing: Vec<String>,
        present: Vec<String>,
    },

    /// Period-tag column holds more than one distinct value.
    #[error("column '{column}' holds {} distinct periods: {}", values.len(), quote_list(values))]
    AmbiguousPeriod { column: String, values: Vec<String> },

    /// Ledger lacks a column the operation depends on.
    #[error("ledger has no column '{column}'")]
    MissingLedgerColumn { column: String },

    /// Requested period has no figures in the ledger.
    #[error("period '{0}' not found in ledger")]
    UnknownPeriod(String),

    /// Label tag shape is not a valid regular expression.
    #[error("invalid tag shape '{pattern}': {source}")]
    InvalidTagShape {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// Config validation error (empty column name, duplicate role, ...).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
}

pub type Result<T, E = ReconError> = std::result::Result<T, E>;

/// Non-fatal conditions reported alongside a successful operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReconWarning {
    /// Period column was empty; a default period was substituted.
    MissingPeriod { column: String, default: String },
    /// Several periods were present and the first one was kept.
    AmbiguousPeriodResolved { column: String, kept: String, values: Vec<String> },
    /// Some extract keys appeared more than once; the last row won.
    DuplicateKeys { count: usize },
    /// Nothing matched between ledger and extract.
    NoMatch { ledger_rows: usize, extract_keys: usize },
}

impl std::fmt::Display for ReconWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingPeriod { column, default } => {
                write!(f, "column '{column}' has no period value, using default '{default}'")
            }
            Self::AmbiguousPeriodResolved { column, kept, values } => write!(
                f,
                "column '{column}' holds {} periods ({}), kept '{kept}'",
                values.len(),
                quote_list(values)
            ),
            Self::DuplicateKeys { count } => {
                write!(f, "{count} duplicate extract key(s), last row kept")
            }
            Self::NoMatch { ledger_rows, extract_keys } => write!(
                f,
                "no match between {ledger_rows} ledger row(s) and {extract_keys} extract key(s)"
            ),
        }
    }
}

fn quote_list(items: &[String]) -> String {
    if items.is_empty() {
        return "(none)".into();
    }
    items
        .iter()
        .map(|s| format!("'{s}'"))
        .collect::<Vec<_>>()
        .join(", ")
}
