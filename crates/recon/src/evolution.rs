//! Period-over-period comparison of ledger figures.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::history::HistoryLedger;
use crate::model::Ledger;
use crate::period::PeriodTag;
use crate::table::{Row, Table};
use crate::wide::WideLedger;

// ---------------------------------------------------------------------------
// Facts
// ---------------------------------------------------------------------------

/// One (site, period) observation, with access to the site's attributes.
#[derive(Debug, Clone)]
pub struct Fact<'a> {
    pub period: PeriodTag,
    pub amount: f64,
    pub consumption: f64,
    table: &'a Table,
    row: &'a Row,
}

impl<'a> Fact<'a> {
    /// Key text of a site attribute; empty when the column is absent.
    pub fn attribute(&self, column: &str) -> String {
        self.table.get(self.row, column).key_text()
    }
}

/// Anything that can list its (site, period) observations.
pub trait FactSource {
    fn facts(&self) -> Vec<Fact<'_>>;
}

impl FactSource for WideLedger {
    fn facts(&self) -> Vec<Fact<'_>> {
        let mut out = Vec::new();
        for row in self.sites().rows() {
            for (period, figures) in self.site_figures(row.id()) {
                out.push(Fact {
                    period: period.clone(),
                    amount: figures.amount.number_or_zero(),
                    consumption: figures.consumption.number_or_zero(),
                    table: self.sites(),
                    row,
                });
            }
        }
        out
    }
}

impl FactSource for HistoryLedger {
    fn facts(&self) -> Vec<Fact<'_>> {
        let columns = self.columns();
        let table = self.table();
        HistoryLedger::facts(self)
            .into_iter()
            .map(|row| Fact {
                period: self.period_of(row),
                amount: table.get(row, &columns.amount).number_or_zero(),
                consumption: table.get(row, &columns.consumption).number_or_zero(),
                table,
                row,
            })
            .collect()
    }
}

impl FactSource for Ledger {
    fn facts(&self) -> Vec<Fact<'_>> {
        match self {
            Ledger::Wide(w) => FactSource::facts(w),
            Ledger::History(h) => FactSource::facts(h),
        }
    }
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct EvolutionQuery {
    /// Dimension column to group by (`UC`, `SITES`, ...).
    pub group_by: Option<String>,
    /// `(column, value)` equality filters on site attributes.
    pub filters: Vec<(String, String)>,
}

impl EvolutionQuery {
    pub fn group_by(mut self, column: impl Into<String>) -> Self {
        self.group_by = Some(column.into());
        self
    }

    pub fn filter(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((column.into(), value.into()));
        self
    }

    fn accepts(&self, fact: &Fact<'_>) -> bool {
        self.filters
            .iter()
            .all(|(column, value)| fact.attribute(column) == value.trim())
    }

    fn key(&self, fact: &Fact<'_>) -> Option<String> {
        self.group_by.as_ref().map(|c| fact.attribute(c))
    }
}

// ---------------------------------------------------------------------------
// Compare
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvolutionRow {
    pub group_key: Option<String>,
    pub amount_a: f64,
    pub amount_b: f64,
    pub delta: f64,
    pub delta_pct: f64,
    pub conso_a: f64,
    pub conso_b: f64,
    pub delta_conso: f64,
    pub delta_conso_pct: f64,
}

/// `(b - a) / a * 100`, or 0 when `a` is 0.
pub fn pct_change(a: f64, b: f64) -> f64 {
    if a == 0.0 {
        0.0
    } else {
        (b - a) / a * 100.0
    }
}

#[derive(Default, Clone, Copy)]
struct Sums {
    amount_a: f64,
    amount_b: f64,
    conso_a: f64,
    conso_b: f64,
}

/// Sum amounts and consumption for two periods, per group.
pub fn compare<S: FactSource + ?Sized>(
    source: &S,
    period_a: &PeriodTag,
    period_b: &PeriodTag,
    query: &EvolutionQuery,
) -> Vec<EvolutionRow> {
    let mut groups: BTreeMap<Option<String>, Sums> = BTreeMap::new();
    if query.group_by.is_none() {
        groups.insert(None, Sums::default());
    }

    for fact in source.facts() {
        let in_a = fact.period.same_period(period_a);
        let in_b = fact.period.same_period(period_b);
        if !(in_a || in_b) || !query.accepts(&fact) {
            continue;
        }
        let sums = groups.entry(query.key(&fact)).or_default();
        if in_a {
            sums.amount_a += fact.amount;
            sums.conso_a += fact.consumption;
        }
        if in_b {
            sums.amount_b += fact.amount;
            sums.conso_b += fact.consumption;
        }
    }

    groups
        .into_iter()
        .map(|(group_key, s)| EvolutionRow {
            group_key,
            amount_a: s.amount_a,
            amount_b: s.amount_b,
            delta: s.amount_b - s.amount_a,
            delta_pct: pct_change(s.amount_a, s.amount_b),
            conso_a: s.conso_a,
            conso_b: s.conso_b,
            delta_conso: s.conso_b - s.conso_a,
            delta_conso_pct: pct_change(s.conso_a, s.conso_b),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Timeline
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelinePoint {
    pub period: PeriodTag,
    /// `MM/YYYY` for month tags.
    pub label: String,
    pub amount: f64,
    pub consumption: f64,
    pub delta: f64,
    pub delta_pct: f64,
    pub delta_conso: f64,
    pub delta_conso_pct: f64,
}

/// Totals per period in chronological order, each compared to the previous
/// point. The first point has zero deltas.
pub fn timeline<S: FactSource + ?Sized>(source: &S, query: &EvolutionQuery) -> Vec<TimelinePoint> {
    let mut totals: BTreeMap<PeriodTag, (f64, f64)> = BTreeMap::new();
    for fact in source.facts() {
        if !query.accepts(&fact) {
            continue;
        }
        let entry = totals.entry(fact.period.clone()).or_default();
        entry.0 += fact.amount;
        entry.1 += fact.consumption;
    }

    let mut out: Vec<TimelinePoint> = Vec::with_capacity(totals.len());
    for (period, (amount, consumption)) in totals {
        let (prev_amount, prev_conso) = out
            .last()
            .map(|p| (p.amount, p.consumption))
            .unwrap_or((amount, consumption));
        out.push(TimelinePoint {
            label: period.display_with("/"),
            period,
            amount,
            consumption,
            delta: amount - prev_amount,
            delta_pct: pct_change(prev_amount, amount),
            delta_conso: consumption - prev_conso,
            delta_conso_pct: pct_change(prev_conso, consumption),
        });
    }
    out
}
