//! `wledger merge` and `wledger validate`.

use std::path::PathBuf;

use wattledger_io::load_table;
use wattledger_recon::table::Row;
use wattledger_recon::{preview, reconcile, MergeOutcome, TensionClass};

use crate::exit_codes::{EXIT_ERROR, EXIT_MERGE_NO_MATCH};
use crate::settings::Settings;
use crate::util::{fmt_pct, render_table};
use crate::{CliError, LedgerArgs};

pub struct MergeArgs {
    pub extract: PathBuf,
    pub tension: TensionClass,
    pub extract_sheet: Option<String>,
    pub dry_run: bool,
    pub json: bool,
    pub output: Option<PathBuf>,
    pub fail_on_no_match: bool,
}

pub fn cmd_merge(settings: &Settings, ledger_args: &LedgerArgs, args: MergeArgs) -> Result<(), CliError> {
    let config = &settings.config;
    let store = settings.store(ledger_args);

    // Extract first: a bad file must not cost a ledger load
    let extract = load_table(&args.extract, args.extract_sheet.as_deref())?;
    let mut ledger = store.open(config.mode, &config.ledger)?;

    let outcome = reconcile(&mut ledger, &extract, args.tension, config)?;

    if args.dry_run {
        eprintln!("dry run: ledger not saved");
    } else {
        store.save(&ledger)?;
        log::info!("saved {}", store.snapshot_path().display());
    }

    if args.json || args.output.is_some() {
        let json_str = serde_json::to_string_pretty(&outcome).map_err(|e| CliError {
            code: EXIT_ERROR,
            message: format!("JSON serialization error: {e}"),
            hint: None,
        })?;
        if let Some(ref path) = args.output {
            std::fs::write(path, &json_str)
                .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))?;
            eprintln!("wrote {}", path.display());
        }
        if args.json {
            println!("{json_str}");
        }
    }

    print_summary(&outcome);

    if args.fail_on_no_match && outcome.matched == 0 {
        return Err(CliError {
            code: EXIT_MERGE_NO_MATCH,
            message: "no ledger row matched the extract".into(),
            hint: Some(format!(
                "check that the extract identifiers match the ledger column '{}'",
                config.ledger_identifier(args.tension)
            )),
        });
    }
    Ok(())
}

/// Human summary on stderr; stdout stays free for `--json`.
fn print_summary(o: &MergeOutcome) {
    eprintln!(
        "{} merge, {} {}: {} matched of {} key(s) ({}), {} label(s) updated",
        o.mode,
        o.tension,
        o.period,
        o.matched,
        o.extract_keys,
        fmt_pct(o.match_rate).trim_start_matches('+'),
        o.labels_updated,
    );
    if o.appended > 0 || o.replaced > 0 {
        eprintln!(
            "rows: {} -> {} ({} appended, {} replaced)",
            o.rows_before, o.rows_after, o.appended, o.replaced
        );
    }
    if !o.unmatched_keys.is_empty() {
        let shown: Vec<&str> = o.unmatched_keys.iter().take(10).map(String::as_str).collect();
        let more = o.unmatched_keys.len().saturating_sub(shown.len());
        eprintln!(
            "unmatched extract keys: {}{}",
            shown.join(", "),
            if more > 0 { format!(" (+{more} more)") } else { String::new() }
        );
    }
    for w in &o.warnings {
        eprintln!("warning: {w}");
    }
}

pub fn cmd_validate(
    settings: &Settings,
    extract_path: PathBuf,
    tension: TensionClass,
    extract_sheet: Option<String>,
    rows: usize,
    json: bool,
) -> Result<(), CliError> {
    let extract = load_table(&extract_path, extract_sheet.as_deref())?;
    let report = preview(&extract, tension, &settings.config)?;

    if json {
        let json_str = serde_json::to_string_pretty(&report).map_err(|e| CliError {
            code: EXIT_ERROR,
            message: format!("JSON serialization error: {e}"),
            hint: None,
        })?;
        println!("{json_str}");
        return Ok(());
    }

    println!("extract:  {}", extract_path.display());
    println!("tension:  {} ({})", report.tension, report.tension.code());
    println!("period:   {}", report.period);
    println!(
        "rows:     {} ({} key(s), {} duplicate(s))",
        report.rows, report.keys, report.duplicate_keys
    );
    for w in &report.warnings {
        println!("warning:  {w}");
    }

    let mut columns = vec![report.identifier_column.clone(), report.amount_column.clone()];
    columns.extend(report.consumption_column.clone());
    columns.push(report.period_column.clone());
    let sample: Vec<&Row> = extract.rows().iter().take(rows).collect();
    let view = extract.project(&columns, &sample);
    let all: Vec<&Row> = view.rows().iter().collect();
    println!();
    print!("{}", render_table(&view, &all, None));
    Ok(())
}
