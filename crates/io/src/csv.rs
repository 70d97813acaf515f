// CSV/TSV import/export

use std::io::Read;
use std::path::Path;

use wattledger_recon::{Cell, Table};

use crate::error::{file_err, IoError, Result};
use crate::header_names;

pub fn import(path: &Path) -> Result<Table> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    log::debug!("{}: delimiter {:?}", path.display(), delimiter as char);
    let table = import_from_string(&content, delimiter)?;
    if table.columns().is_empty() {
        return Err(IoError::Empty { path: path.to_path_buf() });
    }
    Ok(table)
}

pub fn import_with_delimiter(path: &Path, delimiter: u8) -> Result<Table> {
    let content = read_file_as_utf8(path)?;
    import_from_string(&content, delimiter)
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // Lines agreeing with the header's field count, weighted by that count
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (Windows-1252 exports from Excel).
pub fn read_file_as_utf8(path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(path).map_err(file_err(path))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(file_err(path))?;

    let bytes = match String::from_utf8(bytes) {
        Ok(s) if s.starts_with('\u{feff}') => return Ok(s['\u{feff}'.len_utf8()..].to_string()),
        Ok(s) => return Ok(s),
        Err(e) => e.into_bytes(),
    };
    log::debug!("{} is not UTF-8, decoding as Windows-1252", path.display());
    let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
    Ok(decoded.into_owned())
}

/// First record is the header. Blank lines are skipped; empty fields become `Empty`.
fn import_from_string(content: &str, delimiter: u8) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records();
    let Some(header) = records.next().transpose()? else {
        return Ok(Table::default());
    };
    let mut table = Table::new(header_names(header.iter().map(str::to_string)));

    for result in records {
        let record = result?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let cells = record
            .iter()
            .map(|field| {
                if field.trim().is_empty() {
                    Cell::Empty
                } else {
                    Cell::from(field)
                }
            })
            .collect();
        table.push_row(cells);
    }

    Ok(table)
}

pub fn export(table: &Table, path: &Path) -> Result<()> {
    export_with_delimiter(table, path, b',')
}

pub fn export_tsv(table: &Table, path: &Path) -> Result<()> {
    export_with_delimiter(table, path, b'\t')
}

pub fn export_with_delimiter(table: &Table, path: &Path, delimiter: u8) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(path)?;

    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row.cells().iter().map(|c| c.to_string()))?;
    }

    writer.flush().map_err(file_err(path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_sniff_semicolon_delimiter() {
        let content = "refraccord;montfact;caract\n1001;250,5;05/2024\n1002;10;05/2024\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_sniff_comma_delimiter() {
        let content = "Name,Age,City\nAlice,30,Paris\nBob,25,London\n";
        assert_eq!(sniff_delimiter(content), b',');
    }

    #[test]
    fn test_sniff_tab_delimiter() {
        let content = "Name\tAge\tCity\nAlice\t30\tParis\nBob\t25\tLondon\n";
        assert_eq!(sniff_delimiter(content), b'\t');
    }

    #[test]
    fn test_sniff_semicolon_with_commas_in_values() {
        let content = "Name;Address;City\n\"Doe, Jane\";\"123 Main St, Apt 4\";Paris\nBob;\"456 Elm\";London\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_semicolon_csv_import() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("extract.csv");
        fs::write(&path, "refraccord;montfact;caract\n1001;250,5;05/2024\n;;\n1002;;05/2024\n").unwrap();

        let table = import(&path).unwrap();
        assert_eq!(table.columns(), &["refraccord", "montfact", "caract"]);
        assert_eq!(table.len(), 2);
        let first = &table.rows()[0];
        assert_eq!(table.get(first, "montfact").as_number(), Some(250.5));
        assert_eq!(table.get(&table.rows()[1], "montfact"), &Cell::Empty);
    }

    #[test]
    fn test_windows_1252_fallback() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin.csv");
        // "Vérification" with é as 0xE9
        let mut bytes = b"COMPTE;V".to_vec();
        bytes.push(0xE9);
        bytes.extend_from_slice(b"rification\n6051;ok\n");
        fs::write(&path, bytes).unwrap();

        let table = import(&path).unwrap();
        assert_eq!(table.columns()[1], "Vérification");
    }

    #[test]
    fn test_tsv_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.tsv");

        let mut table = Table::new(["IDENTIFIANT", "MONTANT"]);
        table.push_row(vec!["X".into(), Cell::Number(42.0)]);
        table.push_row(vec!["Y".into(), Cell::Number(17.5)]);
        export_tsv(&table, &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains('\t'), "TSV should contain tab characters");

        let imported = import_with_delimiter(&path, b'\t').unwrap();
        assert_eq!(imported.columns(), table.columns());
        assert_eq!(imported.get(&imported.rows()[0], "MONTANT").key_text(), "42");
        assert_eq!(imported.get(&imported.rows()[1], "MONTANT").as_number(), Some(17.5));
    }

    #[test]
    fn test_empty_file_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        fs::write(&path, "").unwrap();
        assert!(matches!(import(&path), Err(IoError::Empty { .. })));
    }
}
