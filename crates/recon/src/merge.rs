//! Applying an indexed extract to a ledger.

use std::collections::HashSet;

use crate::config::{LedgerMode, ReconConfig, TensionClass};
use crate::error::Result;
use crate::history::HistoryLedger;
use crate::index::KeyIndex;
use crate::label::LabelRule;
use crate::model::MergeOutcome;
use crate::period::PeriodTag;
use crate::table::{Cell, Table};
use crate::wide::{PeriodFigures, WideLedger};

/// Per-merge settings derived from the config for one tension class.
#[derive(Debug, Clone)]
pub struct MergeRules {
    /// Ledger column holding the identifier the extract is matched against.
    pub identifier: String,
    pub label: Option<LabelTarget>,
    /// Wide mode: flat amount column overwritten alongside the period entry.
    pub mirror_amount: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LabelTarget {
    pub column: String,
    pub rule: LabelRule,
}

impl MergeRules {
    /// Label tags use the class separator (`06/2024` low, `06-2024` high)
    /// when the period reads as a month. `known` are the periods the ledger
    /// already holds; their tags are stripped even when off-shape.
    pub fn for_tension(
        config: &ReconConfig,
        tension: TensionClass,
        period: &PeriodTag,
        known: &[PeriodTag],
    ) -> Result<Self> {
        let t = config.tension(tension);
        let label = match &config.ledger.label {
            Some(column) => {
                let known_tags = known
                    .iter()
                    .flat_map(|p| [p.display_with(&t.export_separator), p.as_str().to_string()]);
                Some(LabelTarget {
                    column: column.clone(),
                    rule: LabelRule::with_known_tags(
                        &t.anchor,
                        &t.tag_shape,
                        &period.display_with(&t.export_separator),
                        known_tags,
                    )?,
                })
            }
            None => None,
        };
        Ok(Self {
            identifier: config.ledger_identifier(tension).to_string(),
            label,
            mirror_amount: t.mirror_amount_column.clone(),
        })
    }

    pub fn plain(identifier: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            label: None,
            mirror_amount: None,
        }
    }

    fn label_in<'a>(&'a self, table: &Table) -> Option<&'a LabelTarget> {
        let target = self.label.as_ref()?;
        if table.has_column(&target.column) {
            Some(target)
        } else {
            log::debug!("ledger has no '{}' column, labels left as is", target.column);
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Wide
// ---------------------------------------------------------------------------

/// Overwrite the `period` entry of every ledger row whose identifier is in
/// `index`. Unmatched rows are untouched.
pub fn merge_in_place(
    ledger: &mut WideLedger,
    index: &KeyIndex,
    tension: TensionClass,
    period: &PeriodTag,
    rules: &MergeRules,
) -> Result<MergeOutcome> {
    let identifiers = ledger.identifiers(&rules.identifier)?;

    let mut outcome = MergeOutcome::new(LedgerMode::Wide, tension, period);
    outcome.rows_before = ledger.len();
    outcome.extract_keys = index.len();

    if let Some(column) = &rules.mirror_amount {
        ledger.sites_mut().ensure_column(column);
    }
    let label = rules.label_in(ledger.sites()).cloned();

    for (row, key) in identifiers {
        let Some(entry) = index.get(&key) else {
            outcome.unmatched_rows += 1;
            continue;
        };
        outcome.matched += 1;

        let consumption = match &entry.consumption {
            Some(c) => c.clone(),
            None => ledger
                .figures(row, period)
                .map(|f| f.consumption.clone())
                .unwrap_or_default(),
        };
        ledger.set_figures(
            row,
            period.clone(),
            PeriodFigures {
                amount: entry.amount.clone(),
                consumption,
            },
        );

        let sites = ledger.sites_mut();
        if let Some(column) = &rules.mirror_amount {
            sites.set(row, column, entry.amount.clone());
        }
        if let Some(target) = &label {
            if relabel(sites, row, target) {
                outcome.labels_updated += 1;
            }
        }
    }

    outcome.rows_after = ledger.len();
    outcome.finish(outcome.rows_before);
    log::debug!(
        "wide merge {period}: {} of {} row(s) matched",
        outcome.matched,
        outcome.rows_before
    );
    Ok(outcome)
}

fn relabel(table: &mut Table, row: crate::table::RowId, target: &LabelTarget) -> bool {
    let current = table
        .cell(row, &target.column)
        .map(|c| c.to_string())
        .unwrap_or_default();
    let next = target.rule.apply(&current);
    if next == current {
        return false;
    }
    table.set(row, &target.column, Cell::Text(next))
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// Append one row per matched extract key, cloned from the identifier's
/// latest row. Rows already holding `period` for a matched identifier are
/// replaced. Unknown keys are reported, never added.
pub fn merge_append(
    ledger: &mut HistoryLedger,
    index: &KeyIndex,
    tension: TensionClass,
    period: &PeriodTag,
    rules: &MergeRules,
) -> Result<MergeOutcome> {
    let latest = ledger.latest_by(&rules.identifier)?;

    let mut outcome = MergeOutcome::new(LedgerMode::History, tension, period);
    outcome.rows_before = ledger.len();
    outcome.extract_keys = index.len();

    let columns = ledger.columns().clone();
    let table = ledger.table();
    let id_idx = table.column_index(&rules.identifier);
    let period_idx = table.column_index(&columns.period);
    let amount_idx = table.column_index(&columns.amount);
    let conso_idx = table.column_index(&columns.consumption);
    let label = rules.label_in(table);
    let label_idx = label.and_then(|t| table.column_index(&t.column));

    let mut matched_keys: HashSet<&str> = HashSet::new();
    let mut new_rows: Vec<Vec<Cell>> = Vec::new();

    for (key, entry) in index.iter() {
        let Some(template) = latest.get(key).and_then(|&id| table.row(id)) else {
            outcome.unmatched_keys.push(key.to_string());
            continue;
        };
        let mut cells = template.cells().to_vec();
        let mut put = |idx: Option<usize>, value: Cell| {
            if let Some(i) = idx {
                cells[i] = value;
            }
        };
        put(amount_idx, entry.amount.clone());
        put(conso_idx, entry.consumption.clone().unwrap_or_default());
        put(period_idx, Cell::from(period.as_str()));

        if let (Some(target), Some(i)) = (label, label_idx) {
            let current = cells[i].to_string();
            let next = target.rule.apply(&current);
            if next != current {
                cells[i] = Cell::Text(next);
                outcome.labels_updated += 1;
            }
        }

        matched_keys.insert(key);
        new_rows.push(cells);
    }

    let matched_keys: HashSet<String> = matched_keys.into_iter().map(String::from).collect();
    outcome.matched = new_rows.len();

    let table = ledger.table_mut();
    if let (Some(id_idx), Some(period_idx)) = (id_idx, period_idx) {
        outcome.replaced = table.remove_where(|r| {
            matched_keys.contains(&r.cell(id_idx).key_text())
                && PeriodTag::new(r.cell(period_idx).key_text()).same_period(period)
        });
    }
    for cells in new_rows {
        table.push_row(cells);
    }
    outcome.appended = outcome.matched;

    outcome.rows_after = ledger.len();
    outcome.finish(outcome.extract_keys);
    log::debug!(
        "history merge {period}: {} appended, {} replaced, {} unknown key(s)",
        outcome.appended,
        outcome.replaced,
        outcome.unmatched_keys.len()
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExtractColumns, LedgerColumns};

    fn extract_columns() -> ExtractColumns {
        ExtractColumns {
            identifier: "refraccord".into(),
            amount: "montfact".into(),
            consumption: Some("conso".into()),
            period: "caract".into(),
        }
    }

    fn extract(rows: &[(&str, f64)]) -> KeyIndex {
        let mut t = Table::new(["refraccord", "montfact", "conso", "caract"]);
        for (id, amount) in rows {
            t.push_row(vec![(*id).into(), Cell::Number(*amount), Cell::Number(1.0), "P1".into()]);
        }
        KeyIndex::build(&t, &extract_columns())
    }

    #[test]
    fn wide_counts_matched_ledger_rows() {
        let mut sites = Table::new(["IDENTIFIANT", "LIBELLE COMPLEMENTAIRE"]);
        sites.push_row(vec![Cell::Number(42.0), "FACT CIE HT 05-2024".into()]);
        sites.push_row(vec!["43".into(), "FACT".into()]);
        sites.push_row(vec!["42".into(), Cell::Empty]);
        let mut ledger = WideLedger::new(sites, LedgerColumns::default());

        let config = ReconConfig::default();
        let period = PeriodTag::new("06/2024");
        let rules = MergeRules::for_tension(&config, TensionClass::High, &period, &[]).unwrap();
        let index = extract(&[("42", 150.0), ("99", 1.0)]);

        let outcome = merge_in_place(&mut ledger, &index, TensionClass::High, &period, &rules).unwrap();
        assert_eq!(outcome.matched, 2);
        assert_eq!(outcome.unmatched_rows, 1);
        assert_eq!(outcome.labels_updated, 1);
        assert!((outcome.match_rate - 200.0 / 3.0).abs() < 1e-9);

        let first = ledger.sites().rows()[0].id();
        assert_eq!(ledger.figures(first, &period).unwrap().amount, Cell::Number(150.0));
        assert_eq!(
            ledger.sites().cell(first, "LIBELLE COMPLEMENTAIRE"),
            Some(&Cell::from("FACT CIE HT 06-2024"))
        );
    }

    #[test]
    fn wide_mirror_column() {
        let mut sites = Table::new(["COMPTE DE CHARGES", "MONTANT"]);
        sites.push_row(vec!["6051".into(), Cell::Number(1.0)]);
        let mut ledger = WideLedger::new(sites, LedgerColumns::default());
        let mut rules = MergeRules::plain("COMPTE DE CHARGES");
        rules.mirror_amount = Some("MONTANT".into());
        let period = PeriodTag::new("P1");
        merge_in_place(&mut ledger, &extract(&[("6051", 9.0)]), TensionClass::Low, &period, &rules)
            .unwrap();
        let table = ledger.to_table();
        assert_eq!(table.get(&table.rows()[0], "MONTANT"), &Cell::Number(9.0));
        assert_eq!(table.get(&table.rows()[0], "MONTANT_P1"), &Cell::Number(9.0));
    }

    #[test]
    fn history_reimport_replaces() {
        let mut t = Table::new(["IDENTIFIANT", "SITES", "DATE", "MONTANT", "CONSO"]);
        t.push_row(vec!["X".into(), "ABJ".into(), Cell::Empty, Cell::Empty, Cell::Empty]);
        let mut ledger = HistoryLedger::from_table(t, LedgerColumns::default()).unwrap();
        let rules = MergeRules::plain("IDENTIFIANT");
        let period = PeriodTag::new("P1");

        let first = merge_append(&mut ledger, &extract(&[("X", 5.0), ("Z", 1.0)]), TensionClass::Low, &period, &rules)
            .unwrap();
        assert_eq!(first.matched, 1);
        assert_eq!(first.unmatched_keys, vec!["Z"]);
        assert_eq!(first.rows_after, 2);
        assert!((first.match_rate - 50.0).abs() < 1e-9);

        let second = merge_append(&mut ledger, &extract(&[("X", 7.0)]), TensionClass::Low, &period, &rules)
            .unwrap();
        assert_eq!(second.replaced, 1);
        assert_eq!(second.rows_after, second.rows_before + second.appended - second.replaced);
        let p1_rows = ledger
            .table()
            .filter_eq(&[("IDENTIFIANT".into(), "X".into()), ("DATE".into(), "P1".into())]);
        assert_eq!(p1_rows.len(), 1);
        assert_eq!(ledger.table().get(p1_rows[0], "MONTANT"), &Cell::Number(7.0));
        assert_eq!(ledger.table().get(p1_rows[0], "SITES"), &Cell::from("ABJ"));
    }

    #[test]
    fn no_match_is_a_warning() {
        let mut t = Table::new(["IDENTIFIANT"]);
        t.push_row(vec!["X".into()]);
        let mut ledger = HistoryLedger::from_table(t, LedgerColumns::default()).unwrap();
        let outcome = merge_append(
            &mut ledger,
            &extract(&[("Q", 1.0)]),
            TensionClass::High,
            &PeriodTag::new("P1"),
            &MergeRules::plain("IDENTIFIANT"),
        )
        .unwrap();
        assert_eq!(outcome.matched, 0);
        assert_eq!(outcome.match_rate, 0.0);
        assert!(matches!(
            outcome.warnings.as_slice(),
            [crate::error::ReconWarning::NoMatch { .. }]
        ));
    }
}
