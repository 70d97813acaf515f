use serde::{Deserialize, Serialize};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Reconciliation settings. Every field has a default, so an empty TOML
/// document yields the standard CIE extract layout.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconConfig {
    pub name: String,
    pub mode: LedgerMode,
    pub ledger: LedgerColumns,
    pub period: PeriodPolicy,
    pub store: StoreConfig,
    pub low: TensionConfig,
    pub high: TensionConfig,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            name: "wattledger".into(),
            mode: LedgerMode::History,
            ledger: LedgerColumns::default(),
            period: PeriodPolicy::default(),
            store: StoreConfig::default(),
            low: TensionConfig::low(),
            high: TensionConfig::high(),
        }
    }
}

/// Storage strategy of the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerMode {
    /// One row per site, period figures flattened into suffixed columns.
    Wide,
    /// One row per (site, period).
    History,
}

impl std::fmt::Display for LedgerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Wide => write!(f, "wide"),
            Self::History => write!(f, "history"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tension class
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TensionClass {
    Low,
    High,
}

impl TensionClass {
    pub const ALL: [TensionClass; 2] = [TensionClass::Low, TensionClass::High];

    /// Short code used in file names and labels.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Low => "BT",
            Self::High => "HT",
        }
    }
}

impl std::fmt::Display for TensionClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::High => write!(f, "high"),
        }
    }
}

impl std::str::FromStr for TensionClass {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" | "bt" | "basse" => Ok(Self::Low),
            "high" | "ht" | "haute" => Ok(Self::High),
            other => Err(ReconError::ConfigValidation(format!(
                "unknown tension class '{other}' (expected low or high)"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Ledger columns
// ---------------------------------------------------------------------------

/// Column roles of the ledger.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerColumns {
    pub identifier: String,
    pub period: String,
    pub amount: String,
    pub consumption: String,
    pub tension: String,
    pub label: Option<String>,
}

impl Default for LedgerColumns {
    fn default() -> Self {
        Self {
            identifier: "IDENTIFIANT".into(),
            period: "DATE".into(),
            amount: "MONTANT".into(),
            consumption: "CONSO".into(),
            tension: "TENSION".into(),
            label: Some("LIBELLE COMPLEMENTAIRE".into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Period policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguousPeriod {
    /// Reject extracts whose period column holds several values.
    #[default]
    Fail,
    /// Keep the first distinct value and warn.
    First,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PeriodPolicy {
    pub on_ambiguous: AmbiguousPeriod,
    /// chrono format used to render the current month when the extract has no period.
    pub default_format: String,
}

impl Default for PeriodPolicy {
    fn default() -> Self {
        Self {
            on_ambiguous: AmbiguousPeriod::Fail,
            default_format: "%m/%Y".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// Where the ledger is persisted. Relative paths are resolved by the caller
/// against the directory of the config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// SQLite snapshot, written after every merge.
    pub snapshot: String,
    /// Spreadsheet loaded when no snapshot exists yet.
    pub seed: Option<String>,
    pub sheet: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            snapshot: "wattledger.ledger".into(),
            seed: None,
            sheet: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Per-tension settings
// ---------------------------------------------------------------------------

/// Extract layout, label rule and export projection for one tension class.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TensionConfig {
    pub extract: ExtractColumns,
    /// Overrides the ledger identifier column for this class
    /// (legacy ledgers keyed by `COMPTE DE CHARGES`).
    #[serde(default)]
    pub ledger_identifier: Option<String>,
    /// Value of the ledger tension column for rows of this class.
    pub ledger_value: String,
    pub anchor: String,
    pub tag_shape: String,
    /// Separator between month and year in export tags.
    pub export_separator: String,
    #[serde(default)]
    pub export_columns: Vec<String>,
    /// Columns that must all exist for the projection to apply; otherwise
    /// every ledger column is exported.
    #[serde(default)]
    pub export_required: Vec<String>,
    /// Wide mode: also overwrite this flat amount column.
    #[serde(default)]
    pub mirror_amount_column: Option<String>,
}

/// Extract column names for one tension class.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractColumns {
    pub identifier: String,
    pub amount: String,
    #[serde(default)]
    pub consumption: Option<String>,
    pub period: String,
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl TensionConfig {
    pub fn low() -> Self {
        let export_columns = names(&[
            "COMPTE DE CHARGES",
            "MONTANT",
            "CODE PART LIB",
            "CODE_CHARGE",
            "CENTRE",
            "INTER.2",
            "HV",
            "LIBELLE COMPLEMENTAIRE",
            "JIB Calc",
            "Vérification compte",
        ]);
        Self {
            extract: ExtractColumns {
                identifier: "reference contrat".into(),
                amount: "Montant facture TTC".into(),
                consumption: Some("conso".into()),
                period: "caract".into(),
            },
            ledger_identifier: None,
            ledger_value: "BASSE".into(),
            anchor: "CIE BT".into(),
            tag_shape: r"\d{2}/\d{4}".into(),
            export_separator: "/".into(),
            export_required: export_columns[..8].to_vec(),
            export_columns,
            mirror_amount_column: None,
        }
    }

    pub fn high() -> Self {
        let export_columns = names(&[
            "CODE",
            "COMPTE DE CHARGES",
            "SENS",
            "MONTANT",
            "CODE PAYT",
            "TYPE DEP",
            "MATR OBJ",
            "LIBELLE COMPLEMENTAIRE",
        ]);
        Self {
            extract: ExtractColumns {
                identifier: "refraccord".into(),
                amount: "montfact".into(),
                consumption: Some("conso".into()),
                period: "caract".into(),
            },
            ledger_identifier: None,
            ledger_value: "HAUTE".into(),
            anchor: "CIE HT".into(),
            tag_shape: r"\d{2}-\d{4}".into(),
            export_separator: "-".into(),
            export_required: export_columns[..4].to_vec(),
            export_columns,
            mirror_amount_column: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn tension(&self, class: TensionClass) -> &TensionConfig {
        match class {
            TensionClass::Low => &self.low,
            TensionClass::High => &self.high,
        }
    }

    /// Ledger identifier column for `class`, honoring the per-class override.
    pub fn ledger_identifier(&self, class: TensionClass) -> &str {
        self.tension(class)
            .ledger_identifier
            .as_deref()
            .unwrap_or(&self.ledger.identifier)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let l = &self.ledger;
        for (role, name) in [
            ("ledger.identifier", &l.identifier),
            ("ledger.period", &l.period),
            ("ledger.amount", &l.amount),
            ("ledger.consumption", &l.consumption),
            ("ledger.tension", &l.tension),
        ] {
            if name.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!("{role} must not be empty")));
            }
        }

        let ledger_roles = [&l.period, &l.amount, &l.consumption];
        for (i, a) in ledger_roles.iter().enumerate() {
            if ledger_roles[i + 1..].contains(a) {
                return Err(ReconError::ConfigValidation(format!(
                    "ledger column '{a}' is assigned to more than one role"
                )));
            }
        }

        if self.store.snapshot.trim().is_empty() {
            return Err(ReconError::ConfigValidation("store.snapshot must not be empty".into()));
        }

        if self.period.default_format.trim().is_empty() {
            return Err(ReconError::ConfigValidation(
                "period.default_format must not be empty".into(),
            ));
        }

        for class in TensionClass::ALL {
            let t = self.tension(class);
            let e = &t.extract;
            for (role, name) in [
                ("identifier", &e.identifier),
                ("amount", &e.amount),
                ("period", &e.period),
            ] {
                if name.trim().is_empty() {
                    return Err(ReconError::ConfigValidation(format!(
                        "{class}.extract.{role} must not be empty"
                    )));
                }
            }
            if t.anchor.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "{class}.anchor must not be empty"
                )));
            }
            regex::Regex::new(&t.tag_shape).map_err(|source| ReconError::InvalidTagShape {
                pattern: t.tag_shape.clone(),
                source,
            })?;
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
