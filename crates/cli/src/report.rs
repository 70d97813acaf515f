//! Read-only reports over the ledger: `evolution`, `timeline`, `stats`.

use serde::Serialize;
use wattledger_recon::{
    compare, timeline, EvolutionQuery, Ledger, LedgerMode, LedgerStats, PeriodTag, TensionClass,
};

use crate::exit_codes::EXIT_ERROR;
use crate::settings::Settings;
use crate::util::{fmt_amount, fmt_pct, pad_left, parse_where, render_grid};
use crate::{CliError, LedgerArgs};

pub(crate) fn open_ledger(settings: &Settings, args: &LedgerArgs) -> Result<Ledger, CliError> {
    let config = &settings.config;
    Ok(settings.store(args).open(config.mode, &config.ledger)?)
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let json_str = serde_json::to_string_pretty(value).map_err(|e| CliError {
        code: EXIT_ERROR,
        message: format!("JSON serialization error: {e}"),
        hint: None,
    })?;
    println!("{json_str}");
    Ok(())
}

fn query_from(where_clauses: &[String]) -> Result<EvolutionQuery, CliError> {
    Ok(parse_where(where_clauses)?
        .into_iter()
        .fold(EvolutionQuery::default(), |q, (col, val)| q.filter(col, val)))
}

// ============================================================================
// evolution
// ============================================================================

pub fn cmd_evolution(
    settings: &Settings,
    args: &LedgerArgs,
    period_a: PeriodTag,
    period_b: PeriodTag,
    group_by: Option<String>,
    where_clauses: Vec<String>,
    json: bool,
) -> Result<(), CliError> {
    let ledger = open_ledger(settings, args)?;
    let mut query = query_from(&where_clauses)?;
    if let Some(column) = group_by {
        query = query.group_by(column);
    }

    let known = ledger.periods();
    for p in [&period_a, &period_b] {
        if !known.iter().any(|k| k.same_period(p)) {
            log::warn!("period {p} has no figures in the ledger");
        }
    }

    let rows = compare(&ledger, &period_a, &period_b, &query);
    if json {
        return print_json(&rows);
    }

    let headers: Vec<String> = [
        query.group_by.as_deref().unwrap_or("GROUP"),
        period_a.as_str(),
        period_b.as_str(),
        "DELTA",
        "DELTA %",
        "CONSO A",
        "CONSO B",
        "CONSO %",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    let grid: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            vec![
                r.group_key.clone().unwrap_or_else(|| "(all)".to_string()),
                pad_left(&fmt_amount(r.amount_a), 14),
                pad_left(&fmt_amount(r.amount_b), 14),
                pad_left(&fmt_amount(r.delta), 14),
                pad_left(&fmt_pct(r.delta_pct), 8),
                pad_left(&fmt_amount(r.conso_a), 12),
                pad_left(&fmt_amount(r.conso_b), 12),
                pad_left(&fmt_pct(r.delta_conso_pct), 8),
            ]
        })
        .collect();
    print!("{}", render_grid(&headers, &grid));
    Ok(())
}

// ============================================================================
// timeline
// ============================================================================

pub fn cmd_timeline(
    settings: &Settings,
    args: &LedgerArgs,
    tension: Option<TensionClass>,
    where_clauses: Vec<String>,
    json: bool,
) -> Result<(), CliError> {
    let config = &settings.config;
    let ledger = open_ledger(settings, args)?;
    let mut query = query_from(&where_clauses)?;
    if let Some(t) = tension {
        query = query.filter(config.ledger.tension.clone(), config.tension(t).ledger_value.clone());
    }

    let points = timeline(&ledger, &query);
    if json {
        return print_json(&points);
    }
    if points.is_empty() {
        eprintln!("no period figures in the ledger");
        return Ok(());
    }

    let headers: Vec<String> = ["PERIOD", "AMOUNT", "DELTA", "DELTA %", "CONSO", "CONSO %"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let grid: Vec<Vec<String>> = points
        .iter()
        .map(|p| {
            vec![
                p.label.clone(),
                pad_left(&fmt_amount(p.amount), 14),
                pad_left(&fmt_amount(p.delta), 14),
                pad_left(&fmt_pct(p.delta_pct), 8),
                pad_left(&fmt_amount(p.consumption), 12),
                pad_left(&fmt_pct(p.delta_conso_pct), 8),
            ]
        })
        .collect();
    print!("{}", render_grid(&headers, &grid));
    Ok(())
}

// ============================================================================
// stats
// ============================================================================

#[derive(Serialize)]
struct StatsOutput {
    mode: LedgerMode,
    periods: Vec<PeriodTag>,
    #[serde(flatten)]
    stats: LedgerStats,
}

pub fn cmd_stats(settings: &Settings, args: &LedgerArgs, json: bool) -> Result<(), CliError> {
    let ledger = open_ledger(settings, args)?;
    let output = StatsOutput {
        mode: ledger.mode(),
        periods: ledger.periods(),
        stats: LedgerStats::for_ledger(&ledger, &settings.config),
    };
    if json {
        return print_json(&output);
    }

    let s = &output.stats;
    let source = settings
        .source
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(defaults)".to_string());
    println!("config:       {source}");
    println!("mode:         {}", output.mode);
    println!("rows:         {}", s.rows);
    println!("entries:      {}", s.entries);
    println!("identifiers:  {}", s.distinct_identifiers);
    println!(
        "periods:      {} ({})",
        s.distinct_periods,
        output
            .periods
            .iter()
            .map(|p| p.display_with("/"))
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("total amount: {}", fmt_amount(s.total_amount));
    println!("mean amount:  {}", fmt_amount(s.mean_amount));
    for (value, count) in &s.by_tension {
        let label = if value.is_empty() { "(none)" } else { value.as_str() };
        println!("  {label}: {count} row(s)");
    }
    Ok(())
}
