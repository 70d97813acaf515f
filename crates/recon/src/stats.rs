use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::config::{LedgerColumns, ReconConfig, TensionClass};
use crate::evolution::FactSource;
use crate::model::Ledger;
use crate::table::Table;

/// Summary figures of a ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerStats {
    pub rows: usize,
    /// Period entries counted in the totals.
    pub entries: usize,
    pub total_amount: f64,
    pub mean_amount: f64,
    pub distinct_identifiers: usize,
    pub distinct_periods: usize,
    /// Row count per tension column value (empty values under `""`).
    pub by_tension: BTreeMap<String, usize>,
}

impl LedgerStats {
    /// Stats over a flat table. Non-numeric amounts count as 0.
    pub fn compute(table: &Table, columns: &LedgerColumns) -> Self {
        let amounts: Vec<f64> = match table.column_index(&columns.amount) {
            Some(idx) => table.rows().iter().map(|r| r.cell(idx).number_or_zero()).collect(),
            None => vec![0.0; table.len()],
        };
        let mut stats = Self::base(table, columns, &[columns.identifier.as_str()]);
        stats.entries = amounts.len();
        stats.total_amount = amounts.iter().sum();
        stats.mean_amount = mean(stats.total_amount, stats.entries);
        stats.distinct_periods = table.distinct(&columns.period).len();
        stats
    }

    /// Stats over either ledger. Wide ledgers total their period entries.
    /// Identifiers are counted over the columns the tension classes match
    /// against, so a `COMPTE DE CHARGES` ledger counts its accounts.
    pub fn for_ledger(ledger: &Ledger, config: &ReconConfig) -> Self {
        let mut identifiers = vec![
            config.ledger_identifier(TensionClass::Low),
            config.ledger_identifier(TensionClass::High),
        ];
        identifiers.dedup();
        match ledger {
            Ledger::History(h) => {
                let mut stats = Self::compute(h.table(), h.columns());
                stats.distinct_identifiers = distinct_identifiers(h.table(), &identifiers);
                stats
            }
            Ledger::Wide(w) => {
                let facts = w.facts();
                let mut stats = Self::base(w.sites(), w.columns(), &identifiers);
                stats.entries = facts.len();
                stats.total_amount = facts.iter().map(|f| f.amount).sum();
                stats.mean_amount = mean(stats.total_amount, stats.entries);
                stats.distinct_periods = w.periods().len();
                stats
            }
        }
    }

    fn base(table: &Table, columns: &LedgerColumns, identifiers: &[&str]) -> Self {
        let by_tension = table
            .group_by(&columns.tension)
            .into_iter()
            .map(|(k, ids)| (k, ids.len()))
            .collect();
        Self {
            rows: table.len(),
            entries: 0,
            total_amount: 0.0,
            mean_amount: 0.0,
            distinct_identifiers: distinct_identifiers(table, identifiers),
            distinct_periods: 0,
            by_tension,
        }
    }
}

fn distinct_identifiers(table: &Table, columns: &[&str]) -> usize {
    let values: HashSet<String> = columns
        .iter()
        .flat_map(|c| table.distinct(c))
        .collect();
    values.len()
}

fn mean(total: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}
