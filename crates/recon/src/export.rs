//! Accounting export: one period and tension class, projected onto the
//! accounting columns with the label re-tagged.

use crate::config::{LedgerColumns, ReconConfig, TensionClass};
use crate::error::{ReconError, Result};
use crate::label::LabelRule;
use crate::model::Ledger;
use crate::period::PeriodTag;
use crate::table::{Cell, Row, RowId, Table};

/// Rows of `period` whose tension column holds the class value (`BASSE` /
/// `HAUTE`). Without a tension column every row of the period is kept.
///
/// The configured export columns are applied only when all required ones
/// exist; otherwise every column is kept.
pub fn accounting_export(
    table: &Table,
    columns: &LedgerColumns,
    period: &PeriodTag,
    tension: TensionClass,
    config: &ReconConfig,
) -> Result<Table> {
    let t = config.tension(tension);
    let period_idx = table
        .column_index(&columns.period)
        .ok_or_else(|| ReconError::MissingLedgerColumn { column: columns.period.clone() })?;

    let in_period: Vec<&Row> = table.filter(|r| {
        PeriodTag::new(r.cell(period_idx).key_text()).same_period(period)
    });
    if in_period.is_empty() {
        return Err(ReconError::UnknownPeriod(period.to_string()));
    }

    let rows: Vec<&Row> = match table.column_index(&columns.tension) {
        Some(idx) => in_period
            .into_iter()
            .filter(|r| r.cell(idx).key_text().eq_ignore_ascii_case(&t.ledger_value))
            .collect(),
        None => {
            log::debug!("no '{}' column, exporting every {period} row", columns.tension);
            in_period
        }
    };

    let has_required = t.export_required.iter().all(|c| table.has_column(c));
    let selected: Vec<String> = if has_required && !t.export_columns.is_empty() {
        t.export_columns
            .iter()
            .filter(|c| table.has_column(c))
            .cloned()
            .collect()
    } else {
        if !t.export_columns.is_empty() {
            log::warn!("ledger lacks required export columns for {tension}, exporting all columns");
        }
        table.columns().to_vec()
    };

    let mut out = table.project(&selected, &rows);

    if let Some(label) = columns.label.as_deref().filter(|c| out.has_column(c)) {
        let known: Vec<String> = table
            .distinct(&columns.period)
            .into_iter()
            .flat_map(|p| {
                let tag = PeriodTag::new(p);
                [tag.display_with(&t.export_separator), tag.as_str().to_string()]
            })
            .collect();
        let rule = LabelRule::with_known_tags(
            &t.anchor,
            &t.tag_shape,
            &period.display_with(&t.export_separator),
            &known,
        )?;
        let ids: Vec<RowId> = out.rows().iter().map(Row::id).collect();
        for id in ids {
            let current = out.cell(id, label).map(|c| c.to_string()).unwrap_or_default();
            let next = rule.apply(&current);
            if next != current {
                out.set(id, label, Cell::Text(next));
            }
        }
    }

    log::info!("{tension} export for {period}: {} row(s), {} column(s)", out.len(), selected.len());
    Ok(out)
}

/// [`accounting_export`] over either ledger; wide ledgers go through their
/// period view.
pub fn export_ledger(
    ledger: &Ledger,
    period: &PeriodTag,
    tension: TensionClass,
    config: &ReconConfig,
) -> Result<Table> {
    match ledger {
        Ledger::Wide(w) => {
            let view = w.period_view(period)?;
            accounting_export(&view, w.columns(), period, tension, config)
        }
        Ledger::History(h) => accounting_export(h.table(), h.columns(), period, tension, config),
    }
}
