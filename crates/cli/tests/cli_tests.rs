// End-to-end tests for the `wledger` binary.
// Run with: cargo test -p wattledger-cli --test cli_tests -- --nocapture

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn fixture(name: &str) -> String {
    fixtures_dir().join(name).to_string_lossy().into_owned()
}

/// Scratch directory with a config pointing the store at `seed`.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new(seed: Option<&str>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = String::from("[store]\nsnapshot = \"ledger.ledger\"\n");
        if let Some(seed) = seed {
            let target = dir.path().join(seed);
            std::fs::copy(fixtures_dir().join(seed), &target).unwrap();
            config.push_str(&format!("seed = \"{seed}\"\n"));
        }
        std::fs::write(dir.path().join("wattledger.toml"), config).unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_wledger"))
            .current_dir(self.dir.path())
            .env_remove("WLEDGER_CONFIG")
            .env_remove("WLEDGER_LOG")
            .env_remove("RUST_LOG")
            .arg("--config")
            .arg(self.path("wattledger.toml"))
            .args(args)
            .output()
            .expect("run wledger")
    }

    fn run_ok(&self, args: &[&str]) -> Output {
        let output = self.run(args);
        assert!(
            output.status.success(),
            "wledger {args:?} failed: {:?}\nstderr: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr)
        );
        output
    }

    fn json(&self, args: &[&str]) -> serde_json::Value {
        let output = self.run_ok(args);
        let stdout = String::from_utf8_lossy(&output.stdout);
        serde_json::from_str(stdout.trim())
            .unwrap_or_else(|e| panic!("stdout must be one JSON value: {e}\n{stdout}"))
    }
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// CSV-sourced cells are text, computed ones are numbers.
fn num(value: &serde_json::Value) -> f64 {
    match value {
        serde_json::Value::Number(n) => n.as_f64().unwrap(),
        serde_json::Value::String(s) => s.parse().unwrap(),
        other => panic!("not a number: {other}"),
    }
}

// ===========================================================================
// merge (history)
// ===========================================================================

#[test]
fn merge_history_appends_and_saves_snapshot() {
    let ws = Workspace::new(Some("base_history.csv"));
    let extract = fixture("extract_bt_202406.csv");

    let report = ws.json(&["merge", &extract, "--tension", "low", "--json"]);
    assert_eq!(report["mode"], "history");
    assert_eq!(report["matched"], 2);
    assert_eq!(report["appended"], 2);
    assert_eq!(report["rows_before"], 3);
    assert_eq!(report["rows_after"], 5);
    assert_eq!(report["unmatched_keys"], serde_json::json!(["9999"]));
    assert!(ws.path("ledger.ledger").exists());

    let rows = ws.json(&["show", "--where", "IDENTIFIANT=1001", "--json"]);
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(num(&rows[1]["MONTANT"]), 150.0);
    assert_eq!(rows[1]["SITES"], "ABJ PLATEAU");
    assert_eq!(rows[1]["LIBELLE COMPLEMENTAIRE"], "FACT CIE BT 06/2024");
}

#[test]
fn merge_same_period_twice_replaces() {
    let ws = Workspace::new(Some("base_history.csv"));
    let extract = fixture("extract_bt_202406.csv");

    ws.run_ok(&["merge", &extract, "-t", "low"]);
    let second = ws.json(&["merge", &extract, "-t", "low", "--json"]);
    assert_eq!(second["replaced"], 2);
    assert_eq!(second["rows_after"], 5);

    let stats = ws.json(&["stats", "--json"]);
    assert_eq!(stats["rows"], 5);
    assert_eq!(stats["distinct_periods"], 2);
}

#[test]
fn dry_run_leaves_no_snapshot() {
    let ws = Workspace::new(Some("base_history.csv"));
    let output = ws.run_ok(&["merge", &fixture("extract_bt_202406.csv"), "-t", "low", "--dry-run"]);
    assert!(stderr(&output).contains("dry run"));
    assert!(!ws.path("ledger.ledger").exists());
}

#[test]
fn merge_report_written_to_file() {
    let ws = Workspace::new(Some("base_history.csv"));
    let report = ws.path("report.json");
    let output = ws.run_ok(&[
        "merge",
        &fixture("extract_ht_202406.csv"),
        "-t",
        "high",
        "-o",
        report.to_str().unwrap(),
    ]);
    assert!(output.stdout.is_empty(), "stdout must stay empty without --json");

    let parsed: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(parsed["tension"], "high");
    assert_eq!(parsed["matched"], 1);
}

// ===========================================================================
// merge (wide)
// ===========================================================================

#[test]
fn merge_wide_adds_period_columns() {
    let ws = Workspace::new(Some("base_wide.csv"));
    let report = ws.json(&[
        "merge",
        &fixture("extract_bt_202406.csv"),
        "-t",
        "low",
        "--mode",
        "wide",
        "--json",
    ]);
    assert_eq!(report["mode"], "wide");
    assert_eq!(report["matched"], 2);
    assert_eq!(report["rows_after"], 3);

    let rows = ws.json(&["show", "--mode", "wide", "--where", "IDENTIFIANT=1002", "--json"]);
    let row = &rows.as_array().unwrap()[0];
    assert_eq!(num(&row["MONTANT_202406"]), 210.0);
    assert_eq!(num(&row["CONSO_202406"]), 21.0);
    assert_eq!(row["LIBELLE COMPLEMENTAIRE"], "FACT CIE BT 06/2024");
}

#[test]
fn snapshot_mode_mismatch_is_reported() {
    let ws = Workspace::new(Some("base_wide.csv"));
    ws.run_ok(&["merge", &fixture("extract_bt_202406.csv"), "-t", "low", "--mode", "wide"]);

    let output = ws.run(&["stats"]);
    assert_eq!(output.status.code(), Some(5));
    assert!(stderr(&output).contains("--mode wide"));
}

// ===========================================================================
// failures
// ===========================================================================

#[test]
fn schema_failure_lists_columns_and_keeps_ledger() {
    let ws = Workspace::new(Some("base_history.csv"));
    let output = ws.run(&["merge", &fixture("extract_bad_schema.csv"), "-t", "low"]);

    assert_eq!(output.status.code(), Some(20));
    let err = stderr(&output);
    assert!(err.contains("'Montant facture TTC'"), "stderr: {err}");
    assert!(err.contains("'montant'"), "present columns listed: {err}");
    assert!(err.contains("hint:"));
    assert!(!ws.path("ledger.ledger").exists());
}

#[test]
fn ambiguous_period_fails_by_default() {
    let ws = Workspace::new(Some("base_history.csv"));
    let output = ws.run(&["merge", &fixture("extract_two_periods.csv"), "-t", "low"]);
    assert_eq!(output.status.code(), Some(21));
    assert!(stderr(&output).contains("2 distinct periods"));
}

#[test]
fn missing_ledger_exit_code() {
    let ws = Workspace::new(None);
    let output = ws.run(&["stats"]);
    assert_eq!(output.status.code(), Some(4));
    assert!(stderr(&output).contains("--seed"));
}

#[test]
fn fail_on_no_match() {
    let ws = Workspace::new(Some("base_history.csv"));
    let unknown = fixture("extract_bt_unknown.csv");

    // counted, not fatal, by default
    let output = ws.run_ok(&["merge", &unknown, "-t", "low"]);
    assert!(stderr(&output).contains("warning: no match"));

    let output = ws.run(&["merge", &unknown, "-t", "low", "--fail-on-no-match"]);
    assert_eq!(output.status.code(), Some(30));
    assert!(stderr(&output).contains("'IDENTIFIANT'"));
}

#[test]
fn bad_where_is_usage_error() {
    let ws = Workspace::new(Some("base_history.csv"));
    let output = ws.run(&["show", "--where", "UC"]);
    assert_eq!(output.status.code(), Some(2));

    let output = ws.run(&["show", "--where", "NOPE=1"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("no column 'NOPE'"));
}

// ===========================================================================
// validate
// ===========================================================================

#[test]
fn validate_reports_period_without_touching_ledger() {
    let ws = Workspace::new(Some("base_history.csv"));
    let preview = ws.json(&["validate", &fixture("extract_bt_202406.csv"), "-t", "low", "--json"]);
    assert_eq!(preview["period"], "202406");
    assert_eq!(preview["keys"], 3);
    assert_eq!(preview["consumption_column"], "conso");
    assert!(!ws.path("ledger.ledger").exists());

    let output = ws.run_ok(&["validate", &fixture("extract_bt_202406.csv"), "-t", "bt", "--rows", "1"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("period:   202406"));
    assert!(stdout.contains("reference contrat"));
    assert!(stdout.contains("1001"));
    assert!(!stdout.contains("1002"));
}

// ===========================================================================
// reports
// ===========================================================================

#[test]
fn timeline_and_evolution_after_merge() {
    let ws = Workspace::new(Some("base_history.csv"));
    ws.run_ok(&["merge", &fixture("extract_bt_202406.csv"), "-t", "low"]);

    let points = ws.json(&["timeline", "--tension", "low", "--json"]);
    let points = points.as_array().unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(points[0]["label"], "05/2024");
    assert_eq!(points[0]["amount"], 300.0);
    assert_eq!(points[0]["delta"], 0.0);
    assert_eq!(points[1]["amount"], 360.0);
    assert!((points[1]["delta_pct"].as_f64().unwrap() - 20.0).abs() < 1e-9);

    let rows = ws.json(&["evolution", "05/2024", "202406", "--group-by", "UC", "--json"]);
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["group_key"], "ABJ");
    assert_eq!(rows[0]["amount_a"], 5100.0);
    assert_eq!(rows[0]["amount_b"], 150.0);
    assert_eq!(rows[1]["group_key"], "BKE");
    assert_eq!(rows[1]["delta"], 10.0);
}

#[test]
fn export_writes_period_rows_of_one_tension() {
    let ws = Workspace::new(Some("base_history.csv"));
    ws.run_ok(&["merge", &fixture("extract_bt_202406.csv"), "-t", "low"]);

    let out = ws.path("export_bt.csv");
    ws.run_ok(&["export", "--period", "06/2024", "--tension", "low", "-o", out.to_str().unwrap()]);
    let content = std::fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3, "header and two BT rows: {content}");
    assert!(lines[0].contains("IDENTIFIANT"));
    assert!(content.contains("FACT CIE BT 06/2024"));

    let output = ws.run(&["export", "-p", "01/2020", "-t", "low", "-o", out.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(23));
}

#[test]
fn show_exports_selected_columns() {
    let ws = Workspace::new(Some("base_history.csv"));
    let out = ws.path("abj.xlsx");
    ws.run_ok(&[
        "show",
        "--where",
        "UC=ABJ",
        "--select",
        "IDENTIFIANT,MONTANT",
        "-o",
        out.to_str().unwrap(),
    ]);
    assert!(out.exists());

    let output = ws.run_ok(&["show", "--select", "IDENTIFIANT", "--select", "UC", "--limit", "1"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("IDENTIFIANT  UC"));
    assert!(stdout.contains("2 more row(s)"));
}
