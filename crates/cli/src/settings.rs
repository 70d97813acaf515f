//! Config file discovery.
//!
//! Search order: `--config` (or `WLEDGER_CONFIG`), `./wattledger.toml`,
//! `<config_dir>/wattledger/config.toml`, then built-in defaults.

use std::path::{Path, PathBuf};

use wattledger_io::LedgerStore;
use wattledger_recon::ReconConfig;

use crate::{CliError, LedgerArgs};

const LOCAL_CONFIG: &str = "wattledger.toml";

pub struct Settings {
    pub config: ReconConfig,
    /// File the config came from, `None` for built-in defaults.
    pub source: Option<PathBuf>,
    base_dir: PathBuf,
}

impl Settings {
    /// Per-user config file location.
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("wattledger").join("config.toml"))
    }

    pub fn resolve(explicit: Option<&Path>) -> Result<Self, CliError> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(CliError::args(format!("config file not found: {}", path.display())));
            }
            return Self::load(path);
        }

        let local = PathBuf::from(LOCAL_CONFIG);
        if local.exists() {
            return Self::load(&local);
        }
        if let Some(user) = Self::user_config_path().filter(|p| p.exists()) {
            return Self::load(&user);
        }

        log::debug!("no config file found, using defaults");
        Ok(Self {
            config: ReconConfig::default(),
            source: None,
            base_dir: PathBuf::from("."),
        })
    }

    fn load(path: &Path) -> Result<Self, CliError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CliError::io(format!("cannot read config {}: {e}", path.display())))?;
        let config = ReconConfig::from_toml(&text).map_err(|e| {
            CliError::from(e).with_hint(format!("while reading {}", path.display()))
        })?;
        log::info!("using config {} ({})", path.display(), config.name);

        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(Self {
            config,
            source: Some(path.to_path_buf()),
            base_dir,
        })
    }

    /// Paths in the config are relative to the config file's directory.
    pub fn resolve_path(&self, raw: &str) -> PathBuf {
        let path = Path::new(raw);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Ledger store from the `[store]` section, with command-line overrides.
    pub fn store(&self, args: &LedgerArgs) -> LedgerStore {
        let store = &self.config.store;
        let snapshot = args
            .ledger
            .clone()
            .unwrap_or_else(|| self.resolve_path(&store.snapshot));
        let seed = args
            .seed
            .clone()
            .or_else(|| store.seed.as_deref().map(|s| self.resolve_path(s)));
        let sheet = args.sheet.clone().or_else(|| store.sheet.clone());
        LedgerStore::new(snapshot).with_seed(seed, sheet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes::{EXIT_CONFIG_PARSE, EXIT_USAGE};

    #[test]
    fn explicit_missing_config_is_a_usage_error() {
        let err = Settings::resolve(Some(Path::new("/nonexistent/wattledger.toml")))
            .err()
            .unwrap();
        assert_eq!(err.code, EXIT_USAGE);
    }

    #[test]
    fn relative_paths_follow_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bt.toml");
        std::fs::write(&path, "[store]\nsnapshot = \"bt.ledger\"\nseed = \"BASE BT.xlsx\"\n").unwrap();

        let settings = Settings::resolve(Some(&path)).unwrap();
        let store = settings.store(&LedgerArgs::default());
        assert_eq!(store.snapshot_path(), dir.path().join("bt.ledger"));
        assert_eq!(settings.resolve_path("/abs/base.xlsx"), PathBuf::from("/abs/base.xlsx"));
    }

    #[test]
    fn parse_errors_map_to_config_code() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "mode = [").unwrap();
        let err = Settings::resolve(Some(&path)).err().unwrap();
        assert_eq!(err.code, EXIT_CONFIG_PARSE);
        assert!(err.hint.unwrap().contains("bad.toml"));
    }
}
