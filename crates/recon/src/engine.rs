use serde::Serialize;

use crate::config::{ExtractColumns, LedgerMode, ReconConfig, TensionClass};
use crate::error::{ReconWarning, Result};
use crate::extract::{extract_period_tag, validate};
use crate::index::KeyIndex;
use crate::merge::{merge_append, merge_in_place, MergeRules};
use crate::model::{Ledger, MergeOutcome};
use crate::period::PeriodTag;
use crate::table::Table;

/// Validate `extract`, detect its period and merge it into `ledger`.
///
/// Every check runs before the ledger is touched, so an error leaves it
/// exactly as it was.
pub fn reconcile(
    ledger: &mut Ledger,
    extract: &Table,
    tension: TensionClass,
    config: &ReconConfig,
) -> Result<MergeOutcome> {
    let prepared = prepare(extract, tension, config)?;
    let rules = MergeRules::for_tension(config, tension, &prepared.period, &ledger.periods())?;

    let mut outcome = match ledger {
        Ledger::Wide(wide) => {
            merge_in_place(wide, &prepared.index, tension, &prepared.period, &rules)?
        }
        Ledger::History(history) => {
            merge_append(history, &prepared.index, tension, &prepared.period, &rules)?
        }
    };
    outcome.warnings.splice(0..0, prepared.warnings);

    log::info!(
        "{} {} merge for {}: {}/{} matched ({:.1}%), {} label(s) updated",
        outcome.mode,
        tension,
        outcome.period,
        outcome.matched,
        match outcome.mode {
            LedgerMode::Wide => outcome.rows_before,
            LedgerMode::History => outcome.extract_keys,
        },
        outcome.match_rate,
        outcome.labels_updated
    );
    for w in &outcome.warnings {
        log::warn!("{w}");
    }
    Ok(outcome)
}

/// Validation result for an extract, without any ledger involved.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractPreview {
    pub tension: TensionClass,
    pub period: PeriodTag,
    pub rows: usize,
    pub keys: usize,
    pub duplicate_keys: usize,
    pub identifier_column: String,
    pub amount_column: String,
    pub consumption_column: Option<String>,
    pub period_column: String,
    pub warnings: Vec<ReconWarning>,
}

/// Schema check and period detection only.
pub fn preview(extract: &Table, tension: TensionClass, config: &ReconConfig) -> Result<ExtractPreview> {
    let prepared = prepare(extract, tension, config)?;
    let ExtractColumns {
        identifier,
        amount,
        consumption,
        period,
    } = prepared.columns;
    Ok(ExtractPreview {
        tension,
        period: prepared.period,
        rows: extract.len(),
        keys: prepared.index.len(),
        duplicate_keys: prepared.index.duplicate_keys(),
        identifier_column: identifier,
        amount_column: amount,
        consumption_column: consumption,
        period_column: period,
        warnings: prepared.warnings,
    })
}

struct Prepared {
    columns: ExtractColumns,
    period: PeriodTag,
    index: KeyIndex,
    warnings: Vec<ReconWarning>,
}

fn prepare(extract: &Table, tension: TensionClass, config: &ReconConfig) -> Result<Prepared> {
    let columns = validate(extract, tension, config)?;
    let detection = extract_period_tag(extract, &columns, &config.period)?;
    let index = KeyIndex::build(extract, &columns);

    let mut warnings: Vec<ReconWarning> = detection.warning.into_iter().collect();
    if index.duplicate_keys() > 0 {
        warnings.push(ReconWarning::DuplicateKeys {
            count: index.duplicate_keys(),
        });
    }
    Ok(Prepared {
        columns,
        period: detection.tag,
        index,
        warnings,
    })
}
