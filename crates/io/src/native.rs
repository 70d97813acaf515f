// Native .ledger snapshot using SQLite

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use wattledger_recon::{Cell, LedgerMode, Table};

use crate::error::{file_err, IoError, Result};
use crate::NATIVE_FORMAT_VERSION;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS columns (
    idx INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS cells (
    row INTEGER NOT NULL,
    col INTEGER NOT NULL,
    value_type INTEGER NOT NULL,  -- 1=number, 2=text
    value_num REAL,
    value_text TEXT,
    PRIMARY KEY (row, col)
);

CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

// Value type constants
const TYPE_NUMBER: i32 = 1;
const TYPE_TEXT: i32 = 2;

/// Metadata stored alongside the table.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SnapshotMeta {
    pub version: u32,
    pub mode: Option<LedgerMode>,
    pub saved_at: Option<String>,
}

/// Sibling temporary file the snapshot is written to before the rename.
fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "ledger".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}

/// Write `table` to `path`. The file is replaced atomically: readers see
/// either the previous snapshot or the new one.
pub fn save(table: &Table, mode: LedgerMode, path: &Path) -> Result<()> {
    let tmp = temp_path(path);
    if tmp.exists() {
        std::fs::remove_file(&tmp).map_err(file_err(&tmp))?;
    }

    {
        let conn = Connection::open(&tmp)?;
        write_snapshot(&conn, table, mode)?;
    }

    std::fs::rename(&tmp, path).map_err(file_err(path))?;
    log::debug!("saved {} row(s) to {}", table.len(), path.display());
    Ok(())
}

fn write_snapshot(conn: &Connection, table: &Table, mode: LedgerMode) -> Result<()> {
    conn.execute_batch(SCHEMA)?;

    conn.execute("BEGIN TRANSACTION", [])?;

    for (key, value) in [
        ("format_version", NATIVE_FORMAT_VERSION.to_string()),
        ("mode", mode.to_string()),
        ("rows", table.len().to_string()),
        ("saved_at", chrono::Utc::now().to_rfc3339()),
        ("engine_version", env!("CARGO_PKG_VERSION").to_string()),
    ] {
        conn.execute("INSERT INTO meta (key, value) VALUES (?1, ?2)", params![key, value])?;
    }

    {
        let mut stmt = conn.prepare("INSERT INTO columns (idx, name) VALUES (?1, ?2)")?;
        for (idx, name) in table.columns().iter().enumerate() {
            stmt.execute(params![idx as i64, name])?;
        }
    }

    {
        let mut stmt = conn.prepare(
            "INSERT INTO cells (row, col, value_type, value_num, value_text) VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;

        for (row_idx, row) in table.rows().iter().enumerate() {
            for (col_idx, cell) in row.cells().iter().enumerate() {
                let (value_type, value_num, value_text): (i32, Option<f64>, Option<&str>) = match cell {
                    Cell::Empty => continue,
                    Cell::Number(n) => (TYPE_NUMBER, Some(*n), None),
                    Cell::Text(s) => (TYPE_TEXT, None, Some(s.as_str())),
                };
                stmt.execute(params![row_idx as i64, col_idx as i64, value_type, value_num, value_text])?;
            }
        }
    }

    conn.execute("COMMIT", [])?;
    Ok(())
}

fn meta_value(conn: &Connection, key: &str) -> Result<Option<String>> {
    Ok(conn
        .query_row("SELECT value FROM meta WHERE key = ?1", params![key], |row| row.get(0))
        .optional()?)
}

pub fn load(path: &Path) -> Result<(Table, SnapshotMeta)> {
    if !path.exists() {
        return Err(IoError::File {
            path: path.to_path_buf(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        });
    }
    let conn = Connection::open(path)?;

    let version: u32 = meta_value(&conn, "format_version")?
        .and_then(|s| s.parse().ok())
        .unwrap_or(NATIVE_FORMAT_VERSION);
    if version > NATIVE_FORMAT_VERSION {
        return Err(IoError::SnapshotVersion {
            found: version,
            supported: NATIVE_FORMAT_VERSION,
        });
    }
    let mode = match meta_value(&conn, "mode")?.as_deref() {
        Some("wide") => Some(LedgerMode::Wide),
        Some("history") => Some(LedgerMode::History),
        _ => None,
    };
    let saved_at = meta_value(&conn, "saved_at")?;
    let row_count: usize = meta_value(&conn, "rows")?
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);

    let columns: Vec<String> = {
        let mut stmt = conn.prepare("SELECT name FROM columns ORDER BY idx")?;
        let names = stmt.query_map([], |row| row.get(0))?;
        names.collect::<std::result::Result<_, _>>()?
    };
    let width = columns.len();

    let mut grid: Vec<Vec<Cell>> = vec![vec![Cell::Empty; width]; row_count];
    {
        let mut stmt = conn.prepare("SELECT row, col, value_type, value_num, value_text FROM cells")?;
        let cell_iter = stmt.query_map([], |row| {
            let r: i64 = row.get(0)?;
            let c: i64 = row.get(1)?;
            let value_type: i32 = row.get(2)?;
            let value_num: Option<f64> = row.get(3)?;
            let value_text: Option<String> = row.get(4)?;
            Ok((r as usize, c as usize, value_type, value_num, value_text))
        })?;

        for cell_result in cell_iter {
            let (r, c, value_type, value_num, value_text) = cell_result?;
            if c >= width {
                continue;
            }
            if r >= grid.len() {
                grid.resize(r + 1, vec![Cell::Empty; width]);
            }
            grid[r][c] = match value_type {
                TYPE_NUMBER => value_num.map(Cell::Number).unwrap_or_default(),
                TYPE_TEXT => value_text.map(Cell::Text).unwrap_or_default(),
                _ => Cell::Empty,
            };
        }
    }

    let mut table = Table::new(columns);
    for cells in grid {
        table.push_row(cells);
    }

    Ok((table, SnapshotMeta { version, mode, saved_at }))
}
