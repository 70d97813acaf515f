//! Identifier -> extract entry lookup.

use std::collections::HashMap;

use crate::config::ExtractColumns;
use crate::table::{Cell, Table};

/// Figures carried by one extract row.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractEntry {
    pub amount: Cell,
    /// `None` when the extract has no consumption column.
    pub consumption: Option<Cell>,
}

#[derive(Debug, Clone, Default)]
pub struct KeyIndex {
    entries: HashMap<String, ExtractEntry>,
    order: Vec<String>,
    duplicate_keys: usize,
}

impl KeyIndex {
    /// Index `extract` by the key text of its identifier column.
    ///
    /// Rows with an empty identifier are skipped. A repeated key replaces the
    /// earlier entry but keeps its first-appearance position.
    pub fn build(extract: &Table, columns: &ExtractColumns) -> Self {
        let id_idx = extract.column_index(&columns.identifier);
        let amount_idx = extract.column_index(&columns.amount);
        let conso_idx = columns
            .consumption
            .as_deref()
            .and_then(|c| extract.column_index(c));

        let mut index = KeyIndex::default();
        let Some(id_idx) = id_idx else {
            return index;
        };

        for row in extract.rows() {
            let key = row.cell(id_idx).key_text();
            if key.is_empty() {
                continue;
            }
            let entry = ExtractEntry {
                amount: amount_idx.map(|i| row.cell(i).clone()).unwrap_or_default(),
                consumption: conso_idx.map(|i| row.cell(i).clone()),
            };
            if index.entries.insert(key.clone(), entry).is_some() {
                index.duplicate_keys += 1;
            } else {
                index.order.push(key);
            }
        }

        if index.duplicate_keys > 0 {
            log::debug!("{} duplicate key(s) in '{}'", index.duplicate_keys, columns.identifier);
        }
        index
    }

    pub fn get(&self, key: &str) -> Option<&ExtractEntry> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Rows that were shadowed by a later row with the same key.
    pub fn duplicate_keys(&self) -> usize {
        self.duplicate_keys
    }

    /// Keys with their entries, in first-appearance order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ExtractEntry)> {
        self.order
            .iter()
            .filter_map(|k| self.entries.get(k).map(|e| (k.as_str(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> ExtractColumns {
        ExtractColumns {
            identifier: "refraccord".into(),
            amount: "montfact".into(),
            consumption: Some("conso".into()),
            period: "caract".into(),
        }
    }

    #[test]
    fn numeric_and_text_keys_collide() {
        let mut extract = Table::new(["refraccord", "montfact", "conso", "caract"]);
        extract.push_row(vec![Cell::Number(42.0), Cell::Number(100.0), Cell::Number(7.0), "P1".into()]);
        let index = KeyIndex::build(&extract, &columns());
        assert!(index.contains("42"));
        assert_eq!(index.get("42").unwrap().amount, Cell::Number(100.0));
        assert_eq!(index.get("42").unwrap().consumption, Some(Cell::Number(7.0)));
    }

    #[test]
    fn last_duplicate_wins_first_position_kept() {
        let mut extract = Table::new(["refraccord", "montfact", "caract"]);
        extract.push_row(vec!["A".into(), Cell::Number(1.0), "P1".into()]);
        extract.push_row(vec!["B".into(), Cell::Number(2.0), "P1".into()]);
        extract.push_row(vec!["A".into(), Cell::Number(3.0), "P1".into()]);
        extract.push_row(vec![Cell::Empty, Cell::Number(4.0), "P1".into()]);

        let index = KeyIndex::build(&extract, &columns());
        assert_eq!(index.len(), 2);
        assert_eq!(index.duplicate_keys(), 1);
        let keys: Vec<&str> = index.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["A", "B"]);
        assert_eq!(index.get("A").unwrap().amount, Cell::Number(3.0));
        // no conso column in this extract
        assert_eq!(index.get("A").unwrap().consumption, None);
    }
}
