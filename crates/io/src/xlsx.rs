// Excel import (xlsx, xlsm, xls, xlsb, ods) and xlsx export

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use chrono::{Datelike, Days, NaiveDate};
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook};
use wattledger_recon::{Cell, Table};

use crate::error::{IoError, Result};
use crate::header_names;

/// Import one sheet (the first when `sheet` is `None`) as a table.
///
/// The first non-empty row is the header. Fully empty rows are skipped.
pub fn import(path: &Path, sheet: Option<&str>) -> Result<Table> {
    let mut workbook: Sheets<_> = open_workbook_auto(path).map_err(|source| IoError::Spreadsheet {
        path: path.to_path_buf(),
        source,
    })?;

    let names: Vec<String> = workbook.sheet_names().to_vec();
    let name = match sheet {
        Some(wanted) => names
            .iter()
            .find(|n| n.as_str() == wanted)
            .cloned()
            .ok_or_else(|| IoError::UnknownSheet {
                path: path.to_path_buf(),
                sheet: wanted.to_string(),
                available: names.clone(),
            })?,
        None => names
            .first()
            .cloned()
            .ok_or_else(|| IoError::Empty { path: path.to_path_buf() })?,
    };

    let range = workbook
        .worksheet_range(&name)
        .map_err(|source| IoError::Spreadsheet {
            path: path.to_path_buf(),
            source,
        })?;

    let mut rows = range
        .rows()
        .map(|r| r.iter().map(to_cell).collect::<Vec<Cell>>())
        .filter(|cells| cells.iter().any(|c| !c.is_empty()));

    let Some(header) = rows.next() else {
        return Err(IoError::Empty { path: path.to_path_buf() });
    };
    let mut table = Table::new(header_names(header.iter().map(|c| c.key_text())));
    for cells in rows {
        table.push_row(cells);
    }

    log::debug!(
        "{} [{name}]: {} row(s), {} column(s)",
        path.display(),
        table.len(),
        table.columns().len()
    );
    Ok(table)
}

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) if s.trim().is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(n) => Cell::Number(*n),
        Data::Int(n) => Cell::Number(*n as f64),
        Data::Bool(b) => Cell::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::Error(e) => Cell::Text(format!("#{e:?}")),
        // Period columns formatted as dates read back as MM/YYYY
        Data::DateTime(dt) => serial_month(dt.as_f64())
            .map(Cell::Text)
            .unwrap_or_else(|| Cell::Number(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}

/// `MM/YYYY` of an Excel serial date (1900 system). Pure times have no
/// month and return `None`.
fn serial_month(serial: f64) -> Option<String> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    let date = epoch.checked_add_days(Days::new(serial.floor() as u64))?;
    Some(format!("{:02}/{:04}", date.month(), date.year()))
}

/// Excel limits sheet names to 31 characters without `[]:*?/\`.
fn sheet_title(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if "[]:*?/\\".contains(c) { '_' } else { c })
        .take(31)
        .collect();
    if cleaned.trim().is_empty() {
        "Sheet1".to_string()
    } else {
        cleaned
    }
}

/// Write `table` to a single-sheet xlsx file with a bold header row.
pub fn export(table: &Table, path: &Path, sheet_name: &str) -> Result<()> {
    let mut workbook = XlsxWorkbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_title(sheet_name))?;

    let header = Format::new().set_bold();
    for (col, name) in table.columns().iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, name, &header)?;
    }

    for (row_idx, row) in table.rows().iter().enumerate() {
        let row32 = (row_idx + 1) as u32;
        for (col, cell) in row.cells().iter().enumerate() {
            let col16 = col as u16;
            match cell {
                Cell::Empty => {}
                Cell::Number(n) if n.is_finite() => {
                    worksheet.write_number(row32, col16, *n)?;
                }
                Cell::Number(_) => {}
                Cell::Text(s) => {
                    worksheet.write_string(row32, col16, s)?;
                }
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}
