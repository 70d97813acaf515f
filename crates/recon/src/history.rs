//! Long ledger: one row per (site, period).

use std::collections::HashMap;

use crate::config::LedgerColumns;
use crate::error::{ReconError, Result};
use crate::period::PeriodTag;
use crate::table::{Row, RowId, Table};

#[derive(Debug, Clone)]
pub struct HistoryLedger {
    table: Table,
    columns: LedgerColumns,
}

impl HistoryLedger {
    /// Wrap `table`, adding the period/amount/consumption columns if absent.
    /// Fails when the identifier column is missing.
    pub fn from_table(mut table: Table, columns: LedgerColumns) -> Result<Self> {
        if !table.has_column(&columns.identifier) {
            return Err(ReconError::MissingLedgerColumn {
                column: columns.identifier.clone(),
            });
        }
        for column in [&columns.period, &columns.amount, &columns.consumption] {
            table.ensure_column(column);
        }
        Ok(Self { table, columns })
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut Table {
        &mut self.table
    }

    pub fn columns(&self) -> &LedgerColumns {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn period_of(&self, row: &Row) -> PeriodTag {
        PeriodTag::new(self.table.get(row, &self.columns.period).key_text())
    }

    /// Latest row per identifier key in `column`: greatest period, ties
    /// resolved by first occurrence. Empty identifiers are ignored.
    pub fn latest_by(&self, column: &str) -> Result<HashMap<String, RowId>> {
        let idx = self
            .table
            .column_index(column)
            .ok_or_else(|| ReconError::MissingLedgerColumn { column: column.to_string() })?;

        let mut latest: HashMap<String, (PeriodTag, RowId)> = HashMap::new();
        for row in self.table.rows() {
            let key = row.cell(idx).key_text();
            if key.is_empty() {
                continue;
            }
            let period = self.period_of(row);
            let newer = latest.get(&key).map_or(true, |(best, _)| period > *best);
            if newer {
                latest.insert(key, (period, row.id()));
            }
        }
        Ok(latest.into_iter().map(|(k, (_, id))| (k, id)).collect())
    }

    /// Site dimension: the latest row of every identifier, in table order.
    pub fn sites(&self) -> Vec<&Row> {
        let Ok(latest) = self.latest_by(&self.columns.identifier) else {
            return Vec::new();
        };
        let mut ids: Vec<RowId> = latest.into_values().collect();
        ids.sort();
        ids.into_iter().filter_map(|id| self.table.row(id)).collect()
    }

    /// Fact view: rows that carry a period.
    pub fn facts(&self) -> Vec<&Row> {
        let Some(idx) = self.table.column_index(&self.columns.period) else {
            return Vec::new();
        };
        self.table.filter(|r| !r.cell(idx).key_text().is_empty())
    }

    /// Distinct periods, chronologically.
    pub fn periods(&self) -> Vec<PeriodTag> {
        let mut periods: Vec<PeriodTag> = self
            .table
            .distinct(&self.columns.period)
            .into_iter()
            .map(PeriodTag::new)
            .collect();
        periods.sort();
        periods
    }
}
