//! `wledger show` and `wledger export`.

use std::path::PathBuf;

use wattledger_io::{json, save_table};
use wattledger_recon::table::Row;
use wattledger_recon::{export_ledger, PeriodTag, TensionClass};

use crate::report::{open_ledger, print_json};
use crate::settings::Settings;
use crate::util::{check_columns, parse_where, render_table};
use crate::{CliError, LedgerArgs};

/// Terminal output stops here unless `--limit` says otherwise.
const DEFAULT_LIMIT: usize = 50;

pub fn cmd_show(
    settings: &Settings,
    args: &LedgerArgs,
    where_clauses: Vec<String>,
    select: Vec<String>,
    output: Option<PathBuf>,
    limit: Option<usize>,
    json_out: bool,
) -> Result<(), CliError> {
    let ledger = open_ledger(settings, args)?;
    let table = ledger.to_table();

    let filters = parse_where(&where_clauses)?;
    check_columns(&table, filters.iter().map(|(c, _)| c))?;

    let selected: Vec<String> = select
        .iter()
        .flat_map(|s| s.split(','))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    check_columns(&table, &selected)?;
    let columns = if selected.is_empty() {
        table.columns().to_vec()
    } else {
        selected
    };

    let rows = table.filter_eq(&filters);
    let view = table.project(&columns, &rows);
    log::info!("{} of {} row(s) selected", view.len(), table.len());

    if let Some(path) = output {
        save_table(&view, &path, "Ledger")?;
        eprintln!("wrote {} row(s) to {}", view.len(), path.display());
        return Ok(());
    }
    if json_out {
        return print_json(&json::to_records(&view));
    }

    let all: Vec<&Row> = view.rows().iter().collect();
    print!("{}", render_table(&view, &all, Some(limit.unwrap_or(DEFAULT_LIMIT))));
    Ok(())
}

pub fn cmd_export(
    settings: &Settings,
    args: &LedgerArgs,
    period: PeriodTag,
    tension: TensionClass,
    output: PathBuf,
) -> Result<(), CliError> {
    let config = &settings.config;
    let ledger = open_ledger(settings, args)?;
    let table = export_ledger(&ledger, &period, tension, config)?;

    if table.is_empty() {
        log::warn!(
            "no {} row in {} for {}",
            config.tension(tension).ledger_value,
            period,
            tension
        );
    }

    let sheet = format!("{} {}", tension.code(), period.display_with("-"));
    save_table(&table, &output, &sheet)?;
    eprintln!("wrote {} row(s) to {}", table.len(), output.display());
    Ok(())
}
