// JSON export

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde_json::{Map, Value};
use wattledger_recon::Table;

use crate::error::{file_err, Result};

/// Table as an array of `{column: value}` objects. Empty cells are `null`.
pub fn to_records(table: &Table) -> Value {
    let rows = table
        .rows()
        .iter()
        .map(|row| {
            let mut object = Map::new();
            for (name, cell) in table.columns().iter().zip(row.cells()) {
                object.insert(name.clone(), serde_json::to_value(cell).unwrap_or(Value::Null));
            }
            Value::Object(object)
        })
        .collect();
    Value::Array(rows)
}

pub fn export(table: &Table, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(file_err(path))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, &to_records(table))?;
    Ok(())
}
