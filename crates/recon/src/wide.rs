//! Wide ledger: one row per site, per-period figures kept in a map and only
//! flattened to `MONTANT_<suffix>` / `CONSO_<suffix>` / `DATE_<suffix>`
//! columns when converting to and from a [`Table`].
//!
//! Figures are keyed by row identity, so two ledger rows sharing an
//! identifier each keep their own entries. A site holds at most one entry
//! per month (or per column suffix for non-month tags), whatever shape the
//! tag was written in.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::LedgerColumns;
use crate::error::{ReconError, Result};
use crate::period::PeriodTag;
use crate::table::{Cell, Row, RowId, Table};

/// Figures of one site for one period.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeriodFigures {
    pub amount: Cell,
    pub consumption: Cell,
}

#[derive(Debug, Clone)]
pub struct WideLedger {
    sites: Table,
    columns: LedgerColumns,
    figures: BTreeMap<RowId, BTreeMap<PeriodTag, PeriodFigures>>,
}

impl WideLedger {
    pub fn new(sites: Table, columns: LedgerColumns) -> Self {
        Self {
            sites,
            columns,
            figures: BTreeMap::new(),
        }
    }

    /// Split a flat table into static site columns and the period map.
    ///
    /// The period of a column group is read from its `DATE_` cell when
    /// present, otherwise from the suffix itself.
    pub fn from_table(table: &Table, columns: LedgerColumns) -> Self {
        let amount_prefix = format!("{}_", columns.amount);
        let conso_prefix = format!("{}_", columns.consumption);
        let date_prefix = format!("{}_", columns.period);

        #[derive(Default)]
        struct Group {
            amount: Option<usize>,
            consumption: Option<usize>,
            date: Option<usize>,
        }

        let mut groups: BTreeMap<String, Group> = BTreeMap::new();
        let mut static_idx = Vec::new();
        for (idx, name) in table.columns().iter().enumerate() {
            if let Some(suffix) = name.strip_prefix(&amount_prefix) {
                groups.entry(suffix.to_string()).or_default().amount = Some(idx);
            } else if let Some(suffix) = name.strip_prefix(&conso_prefix) {
                groups.entry(suffix.to_string()).or_default().consumption = Some(idx);
            } else if let Some(suffix) = name.strip_prefix(&date_prefix) {
                groups.entry(suffix.to_string()).or_default().date = Some(idx);
            } else {
                static_idx.push(idx);
            }
        }

        let mut sites = Table::new(static_idx.iter().map(|&i| table.columns()[i].clone()));
        let mut figures: BTreeMap<RowId, BTreeMap<PeriodTag, PeriodFigures>> = BTreeMap::new();

        for row in table.rows() {
            let id = sites.push_row(static_idx.iter().map(|&i| row.cell(i).clone()).collect());
            for (suffix, group) in &groups {
                let pick = |idx: Option<usize>| idx.map(|i| row.cell(i).clone()).unwrap_or_default();
                let amount = pick(group.amount);
                let consumption = pick(group.consumption);
                let date = pick(group.date);
                if amount.is_empty() && consumption.is_empty() && date.is_empty() {
                    continue;
                }
                let period = if date.is_empty() {
                    PeriodTag::new(suffix.as_str())
                } else {
                    PeriodTag::new(date.key_text())
                };
                put(figures.entry(id).or_default(), period, PeriodFigures { amount, consumption });
            }
        }

        log::debug!(
            "wide ledger: {} site(s), {} period column group(s)",
            sites.len(),
            groups.len()
        );
        Self { sites, columns, figures }
    }

    /// Flatten back to one table. Periods are laid out chronologically; tags
    /// sharing a column suffix share the same columns.
    pub fn to_table(&self) -> Table {
        let mut out = Table::new(self.sites.columns().iter().cloned());
        let tags: BTreeSet<&PeriodTag> = self.figures.values().flat_map(|m| m.keys()).collect();
        let mut suffixes: Vec<String> = Vec::new();
        for period in tags {
            let suffix = period.column_suffix();
            if !suffixes.contains(&suffix) {
                suffixes.push(suffix);
            }
        }
        for suffix in &suffixes {
            out.ensure_column(&self.amount_column(suffix));
            out.ensure_column(&self.consumption_column(suffix));
            out.ensure_column(&self.date_column(suffix));
        }

        for row in self.sites.rows() {
            let mut record: Vec<(String, Cell)> = self
                .sites
                .columns()
                .iter()
                .cloned()
                .zip(row.cells().iter().cloned())
                .collect();
            if let Some(periods) = self.figures.get(&row.id()) {
                for (period, f) in periods {
                    let suffix = period.column_suffix();
                    record.push((self.amount_column(&suffix), f.amount.clone()));
                    record.push((self.consumption_column(&suffix), f.consumption.clone()));
                    record.push((self.date_column(&suffix), Cell::from(period.as_str())));
                }
            }
            out.push_record(record.iter().map(|(c, v)| (c.as_str(), v.clone())));
        }
        out
    }

    pub fn amount_column(&self, suffix: &str) -> String {
        format!("{}_{suffix}", self.columns.amount)
    }

    pub fn consumption_column(&self, suffix: &str) -> String {
        format!("{}_{suffix}", self.columns.consumption)
    }

    pub fn date_column(&self, suffix: &str) -> String {
        format!("{}_{suffix}", self.columns.period)
    }

    pub fn columns(&self) -> &LedgerColumns {
        &self.columns
    }

    /// Static site columns.
    pub fn sites(&self) -> &Table {
        &self.sites
    }

    pub fn sites_mut(&mut self) -> &mut Table {
        &mut self.sites
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Every period with at least one entry, in chronological order. Tags
    /// naming the same month are listed once.
    pub fn periods(&self) -> Vec<PeriodTag> {
        let set: BTreeSet<&PeriodTag> = self.figures.values().flat_map(|m| m.keys()).collect();
        let mut periods: Vec<PeriodTag> = set.into_iter().cloned().collect();
        periods.dedup_by(|a, b| a.same_period(b));
        periods
    }

    /// Entry of `row` for `period`, in whichever shape either tag was written.
    pub fn figures(&self, row: RowId, period: &PeriodTag) -> Option<&PeriodFigures> {
        self.figures
            .get(&row)?
            .iter()
            .find(|(p, _)| p.same_period(period))
            .map(|(_, f)| f)
    }

    /// All period entries of one site.
    pub fn site_figures(&self, row: RowId) -> impl Iterator<Item = (&PeriodTag, &PeriodFigures)> {
        self.figures.get(&row).into_iter().flat_map(|m| m.iter())
    }

    /// Insert or overwrite one period entry. Returns false for an unknown row.
    pub fn set_figures(&mut self, row: RowId, period: PeriodTag, figures: PeriodFigures) -> bool {
        if self.sites.row(row).is_none() {
            return false;
        }
        put(self.figures.entry(row).or_default(), period, figures);
        true
    }

    /// `(row, identifier key)` for every site, failing if the column is absent.
    pub fn identifiers(&self, column: &str) -> Result<Vec<(RowId, String)>> {
        let idx = self
            .sites
            .column_index(column)
            .ok_or_else(|| ReconError::MissingLedgerColumn { column: column.to_string() })?;
        Ok(self
            .sites
            .rows()
            .iter()
            .map(|r| (r.id(), r.cell(idx).key_text()))
            .collect())
    }

    /// Sites that have figures for `period`, with the flat amount,
    /// consumption and period columns filled from that entry.
    pub fn period_view(&self, period: &PeriodTag) -> Result<Table> {
        let rows: Vec<&Row> = self
            .sites
            .filter(|r| self.figures(r.id(), period).is_some());
        if rows.is_empty() {
            return Err(ReconError::UnknownPeriod(period.to_string()));
        }

        let mut view = self.sites.project(self.sites.columns(), &rows);
        for column in [&self.columns.amount, &self.columns.consumption, &self.columns.period] {
            view.ensure_column(column);
        }
        let ids: Vec<RowId> = view.rows().iter().map(Row::id).collect();
        for (view_id, site) in ids.into_iter().zip(rows) {
            if let Some(f) = self.figures(site.id(), period) {
                view.set(view_id, &self.columns.amount, f.amount.clone());
                view.set(view_id, &self.columns.consumption, f.consumption.clone());
                view.set(view_id, &self.columns.period, Cell::from(period.as_str()));
            }
        }
        Ok(view)
    }
}

/// Insert `figures` under `period`, dropping any entry for the same month or
/// the same column suffix first.
fn put(entries: &mut BTreeMap<PeriodTag, PeriodFigures>, period: PeriodTag, figures: PeriodFigures) {
    let suffix = period.column_suffix();
    entries.retain(|p, _| !p.same_period(&period) && p.column_suffix() != suffix);
    entries.insert(period, figures);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat() -> Table {
        let mut t = Table::new(["IDENTIFIANT", "SITES", "MONTANT_05_2024", "DATE_05_2024", "CONSO_P1"]);
        t.push_row(vec!["X".into(), "ABJ".into(), Cell::Number(10.0), "05/2024".into(), Cell::Number(3.0)]);
        t.push_row(vec!["Y".into(), "BKE".into(), Cell::Empty, Cell::Empty, Cell::Empty]);
        t
    }

    #[test]
    fn from_table_splits_static_and_periods() {
        let ledger = WideLedger::from_table(&flat(), LedgerColumns::default());
        assert_eq!(ledger.sites().columns(), &["IDENTIFIANT", "SITES"]);
        let x = ledger.sites().rows()[0].id();
        let may = ledger.figures(x, &PeriodTag::new("05/2024")).unwrap();
        assert_eq!(may.amount, Cell::Number(10.0));
        // group without a DATE_ cell falls back to its suffix
        let p1 = ledger.figures(x, &PeriodTag::new("P1")).unwrap();
        assert_eq!(p1.consumption, Cell::Number(3.0));
        let y = ledger.sites().rows()[1].id();
        assert_eq!(ledger.site_figures(y).count(), 0);
    }

    #[test]
    fn round_trip_keeps_period_columns() {
        let ledger = WideLedger::from_table(&flat(), LedgerColumns::default());
        let table = ledger.to_table();
        assert!(table.has_column("MONTANT_05_2024"));
        assert!(table.has_column("CONSO_P1"));
        assert!(table.has_column("DATE_P1"));
        let again = WideLedger::from_table(&table, LedgerColumns::default());
        assert_eq!(again.periods(), ledger.periods());
    }

    #[test]
    fn setting_same_period_twice_overwrites() {
        let mut ledger = WideLedger::new(Table::new(["IDENTIFIANT"]), LedgerColumns::default());
        let id = ledger.sites_mut().push_row(vec!["X".into()]);
        let period = PeriodTag::new("P1");
        for amount in [100.0, 150.0] {
            ledger.set_figures(
                id,
                period.clone(),
                PeriodFigures { amount: Cell::Number(amount), consumption: Cell::Empty },
            );
        }
        let table = ledger.to_table();
        assert_eq!(table.columns(), &["IDENTIFIANT", "MONTANT_P1", "CONSO_P1", "DATE_P1"]);
        assert_eq!(table.get(&table.rows()[0], "MONTANT_P1"), &Cell::Number(150.0));
    }

    fn amount_only(value: f64) -> PeriodFigures {
        PeriodFigures { amount: Cell::Number(value), consumption: Cell::Empty }
    }

    #[test]
    fn seed_column_without_date_is_overwritten() {
        let mut seed = Table::new(["IDENTIFIANT", "MONTANT_05_2024"]);
        seed.push_row(vec!["X".into(), Cell::Number(100.0)]);
        let mut ledger = WideLedger::from_table(&seed, LedgerColumns::default());
        let id = ledger.sites().rows()[0].id();

        ledger.set_figures(id, PeriodTag::new("05/2024"), amount_only(200.0));

        let table = ledger.to_table();
        let row = &table.rows()[0];
        assert_eq!(table.get(row, "MONTANT_05_2024"), &Cell::Number(200.0));
        assert_eq!(table.get(row, "DATE_05_2024"), &Cell::from("05/2024"));
        assert_eq!(ledger.site_figures(id).count(), 1);
    }

    #[test]
    fn same_month_in_another_shape_replaces_entry() {
        let mut ledger = WideLedger::new(Table::new(["IDENTIFIANT"]), LedgerColumns::default());
        let id = ledger.sites_mut().push_row(vec!["X".into()]);
        ledger.set_figures(id, PeriodTag::new("05/2024"), amount_only(100.0));
        ledger.set_figures(id, PeriodTag::new("05-2024"), amount_only(200.0));

        let table = ledger.to_table();
        assert_eq!(table.get(&table.rows()[0], "MONTANT_05_2024"), &Cell::Number(200.0));
        assert_eq!(table.get(&table.rows()[0], "DATE_05_2024"), &Cell::from("05-2024"));
        assert_eq!(ledger.periods().len(), 1);
        let again = WideLedger::from_table(&table, LedgerColumns::default());
        let reread = again.figures(again.sites().rows()[0].id(), &PeriodTag::new("202405"));
        assert_eq!(reread.unwrap().amount, Cell::Number(200.0));
    }

    #[test]
    fn period_view_accepts_any_month_shape() {
        let ledger = WideLedger::from_table(&flat(), LedgerColumns::default());
        let view = ledger.period_view(&PeriodTag::new("202405")).unwrap();
        assert_eq!(view.get(&view.rows()[0], "MONTANT"), &Cell::Number(10.0));
    }

    #[test]
    fn period_view_fills_flat_columns() {
        let ledger = WideLedger::from_table(&flat(), LedgerColumns::default());
        let view = ledger.period_view(&PeriodTag::new("05/2024")).unwrap();
        assert_eq!(view.len(), 1);
        assert_eq!(view.get(&view.rows()[0], "MONTANT"), &Cell::Number(10.0));
        assert_eq!(view.get(&view.rows()[0], "DATE"), &Cell::from("05/2024"));
        assert!(matches!(
            ledger.period_view(&PeriodTag::new("01/2020")),
            Err(ReconError::UnknownPeriod(_))
        ));
    }

    #[test]
    fn missing_identifier_column() {
        let ledger = WideLedger::from_table(&flat(), LedgerColumns::default());
        assert!(matches!(
            ledger.identifiers("COMPTE DE CHARGES"),
            Err(ReconError::MissingLedgerColumn { .. })
        ));
    }
}
