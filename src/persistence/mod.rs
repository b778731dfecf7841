//! # Persistence Module
//!
//! Stores the calibration record and the optional bridge settings as TOML files in the
//! user's config directory (`~/.config/gcbridge/` on Linux).
//!
//! Loading never fails the application: a missing file, an unreadable file or a document
//! that does not parse leaves the defaults in effect and is only logged. Saving is an
//! explicit user action and reports its errors back to the caller.

use crate::calibration::CalibrationProfile;
use crate::config::BridgeSettings;
use color_eyre::eyre::{eyre, Result};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const CONFIG_DIR: &str = "gcbridge";
const CALIBRATION_FILE: &str = "calibration.toml";
const SETTINGS_FILE: &str = "settings.toml";

/// File locations for everything the bridge persists.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    base_path: PathBuf,
}

impl ConfigStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// `<config dir>/gcbridge`, falling back to `~/.config/gcbridge` and finally `./gcbridge`.
    pub fn default_location() -> Self {
        let mut base_path = dirs::config_dir().unwrap_or_else(|| {
            let mut home = get_home_dir();
            home.push(".config");
            home
        });
        base_path.push(CONFIG_DIR);
        Self::new(base_path)
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn calibration_path(&self) -> PathBuf {
        self.base_path.join(CALIBRATION_FILE)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.base_path.join(SETTINGS_FILE)
    }

    /// Loads the calibration record, falling back to defaults on any problem.
    pub fn load_calibration(&self) -> CalibrationProfile {
        let path = self.calibration_path();
        match read_toml::<CalibrationProfile>(&path) {
            Ok(Some(profile)) => {
                info!("Loaded calibration from {}", path.display());
                debug!("Calibration: {:?}", profile);
                profile
            }
            Ok(None) => {
                info!(
                    "No calibration record at {}, using defaults",
                    path.display()
                );
                CalibrationProfile::default()
            }
            Err(e) => {
                warn!("Ignoring calibration record: {}", e);
                CalibrationProfile::default()
            }
        }
    }

    pub fn save_calibration(&self, profile: &CalibrationProfile) -> Result<()> {
        let path = self.calibration_path();
        write_toml(&path, profile)?;
        info!("Calibration saved to {}", path.display());
        Ok(())
    }

    /// Loads bridge settings, falling back to defaults on any problem.
    pub fn load_settings(&self) -> BridgeSettings {
        let path = self.settings_path();
        match read_toml::<BridgeSettings>(&path) {
            Ok(Some(settings)) => {
                info!("Loaded settings from {}", path.display());
                settings
            }
            Ok(None) => {
                debug!("No settings file at {}, using defaults", path.display());
                BridgeSettings::default()
            }
            Err(e) => {
                warn!("Ignoring settings file: {}", e);
                BridgeSettings::default()
            }
        }
    }
}

/// `Ok(None)` when the file does not exist.
fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| eyre!("Failed to read {}: {}", path.display(), e))?;

    let value = toml::from_str(&content)
        .map_err(|e| eyre!("Failed to parse {}: {}", path.display(), e))?;

    Ok(Some(value))
}

fn write_toml<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| eyre!("Failed to create config directory: {}", e))?;
    }

    let content =
        toml::to_string_pretty(value).map_err(|e| eyre!("Failed to serialize config: {}", e))?;

    fs::write(path, content).map_err(|e| eyre!("Failed to write {}: {}", path.display(), e))
}

fn get_home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| {
        warn!("Could not determine home directory, using current directory");
        PathBuf::from(".")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::EmulationMode;

    fn store() -> (tempfile::TempDir, ConfigStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("gcbridge"));
        (dir, store)
    }

    #[test]
    fn missing_record_yields_defaults() {
        let (_dir, store) = store();
        assert_eq!(store.load_calibration(), CalibrationProfile::default());
        assert_eq!(store.load_settings(), BridgeSettings::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let (_dir, store) = store();
        let profile = CalibrationProfile {
            left_base: 12.5,
            left_bump: 170.125,
            left_max: 241.0,
            right_base: 0.1,
            right_bump: 188.3,
            right_max: 229.99,
            bump_100_percent: false,
            emulation_mode: EmulationMode::DualShock,
        };

        store.save_calibration(&profile).unwrap();
        assert_eq!(store.load_calibration(), profile);
    }

    #[test]
    fn partial_record_fills_missing_fields() {
        let (_dir, store) = store();
        fs::create_dir_all(store.base_path()).unwrap();
        fs::write(
            store.calibration_path(),
            "left_base = 40.0\nbump_100_percent = false\nunknown_field = \"ignored\"\n",
        )
        .unwrap();

        let profile = store.load_calibration();
        assert_eq!(profile.left_base, 40.0);
        assert!(!profile.bump_100_percent);
        assert_eq!(profile.left_bump, 190.0);
        assert_eq!(profile.right_max, 230.0);
        assert_eq!(profile.emulation_mode, EmulationMode::Xbox360);
    }

    #[test]
    fn malformed_record_is_ignored() {
        let (_dir, store) = store();
        fs::create_dir_all(store.base_path()).unwrap();
        fs::write(store.calibration_path(), "left_base = [not toml").unwrap();
        assert_eq!(store.load_calibration(), CalibrationProfile::default());

        fs::write(store.calibration_path(), "emulation_mode = \"gamecube\"").unwrap();
        assert_eq!(store.load_calibration(), CalibrationProfile::default());
    }

    #[test]
    fn settings_file_overrides_selected_fields() {
        let (_dir, store) = store();
        fs::create_dir_all(store.base_path()).unwrap();
        fs::write(
            store.settings_path(),
            "read_timeout_ms = 4\npresentation_divisor = 5\n",
        )
        .unwrap();

        let settings = store.load_settings();
        assert_eq!(settings.read_timeout_ms, 4);
        assert_eq!(settings.presentation_divisor, 5);
        assert_eq!(settings.stop_timeout_ms, 1000);
        assert_eq!(settings.device.product_id, crate::config::PRODUCT_ID);
    }
}
