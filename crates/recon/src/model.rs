use serde::Serialize;

use crate::config::{LedgerColumns, LedgerMode, TensionClass};
use crate::error::{ReconWarning, Result};
use crate::history::HistoryLedger;
use crate::period::PeriodTag;
use crate::table::Table;
use crate::wide::WideLedger;

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// A ledger in one of the two storage strategies.
#[derive(Debug, Clone)]
pub enum Ledger {
    Wide(WideLedger),
    History(HistoryLedger),
}

impl Ledger {
    pub fn from_table(mode: LedgerMode, table: Table, columns: LedgerColumns) -> Result<Self> {
        Ok(match mode {
            LedgerMode::Wide => Ledger::Wide(WideLedger::from_table(&table, columns)),
            LedgerMode::History => Ledger::History(HistoryLedger::from_table(table, columns)?),
        })
    }

    /// Flat form, ready to persist.
    pub fn to_table(&self) -> Table {
        match self {
            Ledger::Wide(w) => w.to_table(),
            Ledger::History(h) => h.table().clone(),
        }
    }

    pub fn mode(&self) -> LedgerMode {
        match self {
            Ledger::Wide(_) => LedgerMode::Wide,
            Ledger::History(_) => LedgerMode::History,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Ledger::Wide(w) => w.len(),
            Ledger::History(h) => h.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn columns(&self) -> &LedgerColumns {
        match self {
            Ledger::Wide(w) => w.columns(),
            Ledger::History(h) => h.columns(),
        }
    }

    pub fn periods(&self) -> Vec<PeriodTag> {
        match self {
            Ledger::Wide(w) => w.periods(),
            Ledger::History(h) => h.periods(),
        }
    }
}

// ---------------------------------------------------------------------------
// Merge outcome
// ---------------------------------------------------------------------------

/// What one merge did to the ledger.
#[derive(Debug, Clone, Serialize)]
pub struct MergeOutcome {
    pub mode: LedgerMode,
    pub tension: TensionClass,
    pub period: PeriodTag,
    pub rows_before: usize,
    pub rows_after: usize,
    /// Distinct identifiers in the extract.
    pub extract_keys: usize,
    /// Wide: ledger rows updated. History: extract keys appended.
    pub matched: usize,
    /// Wide only: ledger rows without a figure in the extract.
    pub unmatched_rows: usize,
    /// History only: extract identifiers unknown to the ledger.
    pub unmatched_keys: Vec<String>,
    pub appended: usize,
    pub replaced: usize,
    pub labels_updated: usize,
    /// Percentage, 0 when there is nothing to match against.
    pub match_rate: f64,
    pub warnings: Vec<ReconWarning>,
}

impl MergeOutcome {
    pub(crate) fn new(mode: LedgerMode, tension: TensionClass, period: &PeriodTag) -> Self {
        Self {
            mode,
            tension,
            period: period.clone(),
            rows_before: 0,
            rows_after: 0,
            extract_keys: 0,
            matched: 0,
            unmatched_rows: 0,
            unmatched_keys: Vec::new(),
            appended: 0,
            replaced: 0,
            labels_updated: 0,
            match_rate: 0.0,
            warnings: Vec::new(),
        }
    }

    pub(crate) fn finish(&mut self, base: usize) {
        self.match_rate = percent(self.matched, base);
        if self.matched == 0 {
            self.warnings.push(ReconWarning::NoMatch {
                ledger_rows: self.rows_before,
                extract_keys: self.extract_keys,
            });
        }
    }
}

pub(crate) fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
