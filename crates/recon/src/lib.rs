//! `wattledger-recon`: billing ledger reconciliation engine.
//!
//! Pure engine crate: receives loaded tables, validates monthly extracts and
//! merges them into a wide or historical ledger. No CLI or IO dependencies.

pub mod config;
pub mod engine;
pub mod error;
pub mod evolution;
pub mod export;
pub mod extract;
pub mod history;
pub mod index;
pub mod label;
pub mod merge;
pub mod model;
pub mod period;
pub mod stats;
pub mod table;
pub mod wide;

pub use config::{LedgerMode, ReconConfig, TensionClass};
pub use engine::{preview, reconcile, ExtractPreview};
pub use error::{ReconError, ReconWarning};
pub use evolution::{compare, timeline, EvolutionQuery, EvolutionRow, FactSource, TimelinePoint};
pub use export::{accounting_export, export_ledger};
pub use model::{Ledger, MergeOutcome};
pub use period::PeriodTag;
pub use stats::LedgerStats;
pub use table::{Cell, RowId, Table};
