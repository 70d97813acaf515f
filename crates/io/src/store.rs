// Ledger persistence: snapshot first, seed spreadsheet as fallback

use std::path::{Path, PathBuf};

use wattledger_recon::config::LedgerColumns;
use wattledger_recon::{Ledger, LedgerMode, Table};

use crate::error::{IoError, Result};
use crate::{csv, json, native, xlsx};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Snapshot,
    Spreadsheet,
    Csv,
    Tsv,
    Json,
}

impl FileKind {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "ledger" => Ok(Self::Snapshot),
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Ok(Self::Spreadsheet),
            "csv" | "txt" => Ok(Self::Csv),
            "tsv" => Ok(Self::Tsv),
            "json" => Ok(Self::Json),
            other => Err(IoError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Load any supported tabular file. `sheet` selects a worksheet in
/// spreadsheets and is ignored otherwise.
pub fn load_table(path: &Path, sheet: Option<&str>) -> Result<Table> {
    match FileKind::from_path(path)? {
        FileKind::Snapshot => native::load(path).map(|(table, _)| table),
        FileKind::Spreadsheet => xlsx::import(path, sheet),
        FileKind::Csv => csv::import(path),
        FileKind::Tsv => csv::import_with_delimiter(path, b'\t'),
        FileKind::Json => Err(IoError::UnsupportedFormat("json (export only)".into())),
    }
}

/// Write a table as xlsx, csv, tsv or json, chosen by extension.
pub fn save_table(table: &Table, path: &Path, sheet_name: &str) -> Result<()> {
    match FileKind::from_path(path)? {
        FileKind::Spreadsheet => xlsx::export(table, path, sheet_name),
        FileKind::Csv => csv::export(table, path),
        FileKind::Tsv => csv::export_tsv(table, path),
        FileKind::Json => json::export(table, path),
        FileKind::Snapshot => Err(IoError::UnsupportedFormat(
            "ledger (snapshots are written by the ledger store)".into(),
        )),
    }
}

/// Where a ledger lives: its snapshot and the spreadsheet used to seed it.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    snapshot: PathBuf,
    seed: Option<PathBuf>,
    sheet: Option<String>,
}

impl LedgerStore {
    pub fn new(snapshot: impl Into<PathBuf>) -> Self {
        Self {
            snapshot: snapshot.into(),
            seed: None,
            sheet: None,
        }
    }

    pub fn with_seed(mut self, seed: Option<PathBuf>, sheet: Option<String>) -> Self {
        self.seed = seed;
        self.sheet = sheet;
        self
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot
    }

    pub fn has_snapshot(&self) -> bool {
        self.snapshot.exists()
    }

    /// Load the snapshot, or the seed file when no snapshot exists yet.
    pub fn open(&self, mode: LedgerMode, columns: &LedgerColumns) -> Result<Ledger> {
        let table = if self.snapshot.exists() {
            let (table, meta) = native::load(&self.snapshot)?;
            if let Some(stored) = meta.mode {
                if stored != mode {
                    return Err(IoError::ModeMismatch {
                        stored,
                        requested: mode,
                    });
                }
            }
            log::debug!(
                "loaded snapshot {} ({} row(s), saved {})",
                self.snapshot.display(),
                table.len(),
                meta.saved_at.as_deref().unwrap_or("at an unknown time")
            );
            table
        } else if let Some(seed) = self.seed.as_deref().filter(|p| p.exists()) {
            log::info!("no snapshot yet, seeding ledger from {}", seed.display());
            load_table(seed, self.sheet.as_deref())?
        } else {
            return Err(IoError::NoLedger {
                snapshot: self.snapshot.clone(),
            });
        };

        Ok(Ledger::from_table(mode, table, columns.clone())?)
    }

    pub fn save(&self, ledger: &Ledger) -> Result<()> {
        native::save(&ledger.to_table(), ledger.mode(), &self.snapshot)
    }
}
