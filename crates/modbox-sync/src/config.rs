//! # Box Configuration
//!
//! Configuration management for the workshop sync engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     MODBOX_STEAM_DIR=/games/steam                                      │
//! │     MODBOX_MODS_DIR=/games/dd/mods                                     │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/modbox-lite/box.toml (Linux)                             │
//! │     ~/Library/Application Support/com.modbox.lite/box.toml (macOS)     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     game = <steam>/steamapps/common/DarkestDungeon                     │
//! │     mods = <cwd>/mods, unbounded per-item sync                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # box.toml
//! [paths]
//! steam = "/home/me/.steam/steam"
//! game = "/home/me/.steam/steam/steamapps/common/DarkestDungeon"
//! mods = "/home/me/modbox/mods"
//! # workshop = "/custom/workshop/content/262060"  # derived from steam if unset
//!
//! [sync]
//! item_timeout_secs = 300  # 0 = no per-item limit
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use modbox_core::WORKSHOP_APP_ID;

use crate::error::{BoxError, BoxResult};

/// Game install folder name under `steamapps/common`.
pub const GAME_FOLDER: &str = "DarkestDungeon";

/// Upper bound accepted for `item_timeout_secs` (one day).
const MAX_ITEM_TIMEOUT_SECS: u64 = 86_400;

// =============================================================================
// Path Settings
// =============================================================================

/// Locations of the game, Steam and the local mods installation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSettings {
    /// Steam installation root.
    #[serde(default)]
    pub steam: Option<PathBuf>,

    /// Game installation directory.
    #[serde(default)]
    pub game: Option<PathBuf>,

    /// Directory modules are synced into.
    #[serde(default)]
    pub mods: Option<PathBuf>,

    /// Explicit workshop content directory; overrides the Steam-derived one.
    #[serde(default)]
    pub workshop: Option<PathBuf>,
}

impl PathSettings {
    /// Returns the workshop content directory for the game.
    ///
    /// `<steam>/steamapps/workshop/content/262060` unless overridden.
    pub fn workshop_dir(&self) -> Option<PathBuf> {
        if let Some(ref dir) = self.workshop {
            return Some(dir.clone());
        }
        self.steam.as_ref().map(|steam| {
            steam
                .join("steamapps")
                .join("workshop")
                .join("content")
                .join(WORKSHOP_APP_ID)
        })
    }

    /// Returns the game directory.
    ///
    /// `<steam>/steamapps/common/DarkestDungeon` unless set explicitly.
    pub fn game_dir(&self) -> Option<PathBuf> {
        if let Some(ref dir) = self.game {
            return Some(dir.clone());
        }
        self.steam
            .as_ref()
            .map(|steam| steam.join("steamapps").join("common").join(GAME_FOLDER))
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

/// Sync behavior settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Per-item time limit in seconds. 0 disables the limit.
    #[serde(default)]
    pub item_timeout_secs: u64,
}

impl SyncSettings {
    /// Per-item limit as a duration, if any.
    pub fn item_timeout(&self) -> Option<Duration> {
        (self.item_timeout_secs > 0).then(|| Duration::from_secs(self.item_timeout_secs))
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete box configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxConfig {
    #[serde(default)]
    pub paths: PathSettings,

    #[serde(default)]
    pub sync: SyncSettings,
}

impl BoxConfig {
    /// Creates a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (box.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> BoxResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading box config from file");
                let contents = std::fs::read_to_string(&path)
                    .map_err(|e| BoxError::ConfigLoadFailed(e.to_string()))?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        match std::env::current_dir() {
            Ok(cwd) => config.apply_defaults(&cwd),
            Err(e) => warn!(error = %e, "No working directory, mods dir stays unset"),
        }
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load box config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Parses a TOML document.
    pub fn from_toml(contents: &str) -> BoxResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> BoxResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| BoxError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| BoxError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| BoxError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Box config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> BoxResult<()> {
        let paths = [
            ("steam", &self.paths.steam),
            ("game", &self.paths.game),
            ("mods", &self.paths.mods),
            ("workshop", &self.paths.workshop),
        ];
        for (name, path) in paths {
            if matches!(path, Some(p) if p.as_os_str().is_empty()) {
                return Err(BoxError::InvalidConfig(format!(
                    "paths.{} must not be empty when set",
                    name
                )));
            }
        }

        if self.sync.item_timeout_secs > MAX_ITEM_TIMEOUT_SECS {
            return Err(BoxError::InvalidConfig(format!(
                "item_timeout_secs must be at most {}",
                MAX_ITEM_TIMEOUT_SECS
            )));
        }

        Ok(())
    }

    /// Fills unset paths: the game dir from Steam, the mods dir under `cwd`.
    pub fn apply_defaults(&mut self, cwd: &Path) {
        if self.paths.game.is_none() {
            self.paths.game = self.paths.game_dir();
        }
        if self.paths.mods.is_none() {
            let mods = cwd.join("mods");
            debug!(mods = %mods.display(), "Defaulting mods dir to working directory");
            self.paths.mods = Some(mods);
        }
    }

    /// Applies overrides from a variable lookup (the environment in `load`).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("MODBOX_STEAM_DIR") {
            debug!(steam = %dir, "Overriding steam dir from environment");
            self.paths.steam = Some(PathBuf::from(dir));
        }

        if let Some(dir) = lookup("MODBOX_GAME_DIR") {
            self.paths.game = Some(PathBuf::from(dir));
        }

        if let Some(dir) = lookup("MODBOX_MODS_DIR") {
            debug!(mods = %dir, "Overriding mods dir from environment");
            self.paths.mods = Some(PathBuf::from(dir));
        }

        if let Some(dir) = lookup("MODBOX_WORKSHOP_DIR") {
            self.paths.workshop = Some(PathBuf::from(dir));
        }

        if let Some(secs) = lookup("MODBOX_ITEM_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(s) => self.sync.item_timeout_secs = s,
                Err(_) => warn!(value = %secs, "Ignoring invalid MODBOX_ITEM_TIMEOUT_SECS"),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "modbox", "lite")
            .map(|dirs| dirs.config_dir().join("box.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Returns the mods directory or a configuration error.
    pub fn require_mods_dir(&self) -> BoxResult<&Path> {
        self.paths
            .mods
            .as_deref()
            .ok_or_else(|| BoxError::InvalidConfig("paths.mods is not configured".into()))
    }

    /// Returns the workshop directory or a configuration error.
    pub fn require_workshop_dir(&self) -> BoxResult<PathBuf> {
        self.paths.workshop_dir().ok_or_else(|| {
            BoxError::InvalidConfig("neither paths.workshop nor paths.steam is configured".into())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = BoxConfig::default();
        assert!(config.paths.mods.is_none());
        assert_eq!(config.sync.item_timeout_secs, 0);
        assert!(config.sync.item_timeout().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_workshop_dir_derivation() {
        let mut paths = PathSettings {
            steam: Some(PathBuf::from("/steam")),
            ..Default::default()
        };
        assert_eq!(
            paths.workshop_dir().unwrap(),
            PathBuf::from("/steam/steamapps/workshop/content/262060")
        );

        paths.workshop = Some(PathBuf::from("/custom"));
        assert_eq!(paths.workshop_dir().unwrap(), PathBuf::from("/custom"));

        assert!(PathSettings::default().workshop_dir().is_none());
    }

    #[test]
    fn test_defaults_fill_game_and_mods() {
        let mut config = BoxConfig::default();
        config.paths.steam = Some(PathBuf::from("/steam"));
        config.apply_defaults(Path::new("/work"));

        assert_eq!(
            config.paths.game,
            Some(PathBuf::from("/steam/steamapps/common/DarkestDungeon"))
        );
        assert_eq!(config.require_mods_dir().unwrap(), Path::new("/work/mods"));
    }

    #[test]
    fn test_defaults_keep_explicit_paths() {
        let mut config = BoxConfig::default();
        config.paths.game = Some(PathBuf::from("/games/dd"));
        config.paths.mods = Some(PathBuf::from("/mods"));
        config.apply_defaults(Path::new("/work"));

        assert_eq!(config.paths.game_dir().unwrap(), PathBuf::from("/games/dd"));
        assert_eq!(config.require_mods_dir().unwrap(), Path::new("/mods"));

        let mut bare = BoxConfig::default();
        bare.apply_defaults(Path::new("/work"));
        assert!(bare.paths.game.is_none());
    }

    #[test]
    fn test_config_validation() {
        let mut config = BoxConfig::default();
        config.paths.mods = Some(PathBuf::new());
        assert!(config.validate().is_err());

        config.paths.mods = Some(PathBuf::from("/mods"));
        assert!(config.validate().is_ok());

        config.sync.item_timeout_secs = MAX_ITEM_TIMEOUT_SECS + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let toml_str = r#"
            [paths]
            steam = "/steam"
            mods = "/mods"

            [sync]
            item_timeout_secs = 30
        "#;
        let config = BoxConfig::from_toml(toml_str).unwrap();
        assert_eq!(config.paths.steam, Some(PathBuf::from("/steam")));
        assert_eq!(config.sync.item_timeout(), Some(Duration::from_secs(30)));

        let rendered = toml::to_string_pretty(&config).unwrap();
        assert!(rendered.contains("[paths]"));
        assert!(rendered.contains("[sync]"));
    }

    #[test]
    fn test_invalid_toml_is_load_error() {
        let err = BoxConfig::from_toml("[paths\nsteam = 1").unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("MODBOX_MODS_DIR", "/env/mods"),
            ("MODBOX_WORKSHOP_DIR", "/env/workshop"),
            ("MODBOX_ITEM_TIMEOUT_SECS", "not-a-number"),
        ]);
        let mut config = BoxConfig::default();
        config.sync.item_timeout_secs = 9;
        config.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.require_mods_dir().unwrap(), Path::new("/env/mods"));
        assert_eq!(config.require_workshop_dir().unwrap(), PathBuf::from("/env/workshop"));
        assert_eq!(config.sync.item_timeout_secs, 9);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("box.toml");

        let mut config = BoxConfig::default();
        config.paths.mods = Some(PathBuf::from("/mods"));
        config.save(Some(path.clone())).unwrap();

        let loaded = BoxConfig::from_toml(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_paths_are_config_errors() {
        let config = BoxConfig::default();
        assert!(config.require_mods_dir().unwrap_err().is_config_error());
        assert!(config.require_workshop_dir().unwrap_err().is_config_error());
    }
}
