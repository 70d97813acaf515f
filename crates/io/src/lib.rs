// Ledger file I/O

pub mod csv;
pub mod error;
pub mod json;
pub mod native;
pub mod store;
pub mod xlsx;

pub use error::{IoError, Result};
pub use store::{load_table, save_table, FileKind, LedgerStore};

/// Native .ledger snapshot format version
/// Increment when schema changes in a way that old versions can't read
pub const NATIVE_FORMAT_VERSION: u32 = 1;

/// Header row to column names: blanks become `column_<n>`, repeats get a
/// `.1`, `.2`... suffix so every column stays addressable.
pub(crate) fn header_names<I>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut names: Vec<String> = Vec::new();
    for (i, name) in raw.into_iter().enumerate() {
        let base = match name.trim() {
            "" => format!("column_{}", i + 1),
            trimmed => trimmed.to_string(),
        };
        let mut candidate = base.clone();
        let mut n = 1;
        while names.contains(&candidate) {
            candidate = format!("{base}.{n}");
            n += 1;
        }
        names.push(candidate);
    }
    names
}
