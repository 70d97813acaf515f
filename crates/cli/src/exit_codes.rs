//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args, missing file) |
//! | 3-9     | files            | Reading and writing ledger files         |
//! | 10-19   | config           | Config file resolution and validation    |
//! | 20-29   | extract          | Extract schema and period detection      |
//! | 30-39   | merge            | Merge outcome                            |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `exit_code_for` or the relevant command

use wattledger_io::IoError;
use wattledger_recon::ReconError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Files (3-9)
// =============================================================================

/// Cannot read or write a file (missing, permissions, corrupt workbook).
pub const EXIT_IO: u8 = 3;

/// No snapshot and no seed spreadsheet to start the ledger from.
pub const EXIT_NO_LEDGER: u8 = 4;

/// Snapshot written by a newer version, or stored in the other mode.
pub const EXIT_SNAPSHOT: u8 = 5;

/// File extension not supported for the requested operation.
pub const EXIT_FORMAT: u8 = 6;

// =============================================================================
// Config (10-19)
// =============================================================================

/// Config file is not valid TOML or has unknown keys.
pub const EXIT_CONFIG_PARSE: u8 = 10;

/// Config parsed but failed validation (empty column, bad tag shape).
pub const EXIT_CONFIG_INVALID: u8 = 11;

// =============================================================================
// Extract (20-29)
// =============================================================================

/// Extract lacks one or more mandatory columns.
pub const EXIT_EXTRACT_SCHEMA: u8 = 20;

/// Extract period column holds several distinct values.
pub const EXIT_EXTRACT_AMBIGUOUS_PERIOD: u8 = 21;

/// Ledger lacks a column the operation needs.
pub const EXIT_LEDGER_COLUMN: u8 = 22;

/// Requested period is not present in the ledger.
pub const EXIT_UNKNOWN_PERIOD: u8 = 23;

// =============================================================================
// Merge (30-39)
// =============================================================================

/// Merge completed but nothing matched (with --fail-on-no-match).
pub const EXIT_MERGE_NO_MATCH: u8 = 30;

// =============================================================================
// Error mapping
// =============================================================================

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::Schema { .. } => EXIT_EXTRACT_SCHEMA,
        ReconError::AmbiguousPeriod { .. } => EXIT_EXTRACT_AMBIGUOUS_PERIOD,
        ReconError::MissingLedgerColumn { .. } => EXIT_LEDGER_COLUMN,
        ReconError::UnknownPeriod(_) => EXIT_UNKNOWN_PERIOD,
        ReconError::ConfigParse(_) => EXIT_CONFIG_PARSE,
        ReconError::InvalidTagShape { .. } | ReconError::ConfigValidation(_) => EXIT_CONFIG_INVALID,
    }
}

/// Map a file I/O error to its exit code.
pub fn io_exit_code(err: &IoError) -> u8 {
    match err {
        IoError::Recon(inner) => recon_exit_code(inner),
        IoError::NoLedger { .. } => EXIT_NO_LEDGER,
        IoError::SnapshotVersion { .. } | IoError::ModeMismatch { .. } => EXIT_SNAPSHOT,
        IoError::UnsupportedFormat(_) => EXIT_FORMAT,
        _ => EXIT_IO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_IO,
            EXIT_NO_LEDGER,
            EXIT_SNAPSHOT,
            EXIT_FORMAT,
            EXIT_CONFIG_PARSE,
            EXIT_CONFIG_INVALID,
            EXIT_EXTRACT_SCHEMA,
            EXIT_EXTRACT_AMBIGUOUS_PERIOD,
            EXIT_LEDGER_COLUMN,
            EXIT_UNKNOWN_PERIOD,
            EXIT_MERGE_NO_MATCH,
        ];
        for (i, a) in codes.iter().enumerate() {
            assert!(!codes[i + 1..].contains(a), "duplicate exit code {a}");
        }
    }

    #[test]
    fn wrapped_engine_errors_keep_their_code() {
        let err = IoError::Recon(ReconError::UnknownPeriod("13/2024".into()));
        assert_eq!(io_exit_code(&err), EXIT_UNKNOWN_PERIOD);
    }
}
