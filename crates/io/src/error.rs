use std::path::PathBuf;

use thiserror::Error;
use wattledger_recon::{LedgerMode, ReconError};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("{}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read spreadsheet {}: {source}", path.display())]
    Spreadsheet {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("{} has no sheet named '{sheet}' (sheets: {})", path.display(), available.join(", "))]
    UnknownSheet {
        path: PathBuf,
        sheet: String,
        available: Vec<String>,
    },

    #[error("{} contains no data", path.display())]
    Empty { path: PathBuf },

    #[error("failed to write XLSX: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("snapshot error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot format version {found} is newer than supported version {supported}")]
    SnapshotVersion { found: u32, supported: u32 },

    #[error("ledger snapshot is stored in {stored} mode but {requested} mode was requested")]
    ModeMismatch {
        stored: LedgerMode,
        requested: LedgerMode,
    },

    #[error("unsupported file type '{0}'")]
    UnsupportedFormat(String),

    #[error("no ledger found: neither {} nor a seed file exists", snapshot.display())]
    NoLedger { snapshot: PathBuf },

    #[error(transparent)]
    Recon(#[from] ReconError),
}

pub type Result<T, E = IoError> = std::result::Result<T, E>;

/// Attach the path to a `std::io::Error`.
pub(crate) fn file_err(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> IoError {
    let path = path.into();
    move |source| IoError::File { path, source }
}
