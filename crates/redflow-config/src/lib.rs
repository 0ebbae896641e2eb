pub mod error;

pub use error::*;

use redflow_handler::{BackoffPolicy, ChainConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable pointing at a settings file
pub const CONFIG_PATH_ENV: &str = "REDFLOW_CONFIG_PATH";

const SETTINGS_FILE: &str = "handlers.yaml";

/// Tunables shared by every handler chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerSettings {
    /// Delay between stabilization checks and the overall stabilization timeout
    pub stabilization: BackoffPolicy,

    /// Retry schedule for throttled or transiently failing mutating calls
    pub throttling: BackoffPolicy,

    /// Stabilization schedule for cluster modifications and feature toggles,
    /// which the remote API tends to throttle when polled at a fixed rate
    pub modification: BackoffPolicy,

    /// Extra re-invocation delay after create/restore stabilizes
    pub cool_down_seconds: u64,

    /// In-process wait before deleting a cluster whose policy was just removed
    pub settle_seconds: u64,

    /// Favorable observations required for feature-acceleration changes
    pub aqua_min_observations: u32,

    /// Favorable observations required for version/maintenance-track changes
    pub patch_min_observations: u32,
}

impl Default for HandlerSettings {
    fn default() -> Self {
        Self {
            stabilization: BackoffPolicy::constant(30, 3 * 60 * 60),
            throttling: BackoffPolicy::exponential(5, 60, 15 * 60),
            modification: BackoffPolicy::exponential(30, 5 * 60, 3 * 60 * 60),
            cool_down_seconds: 60,
            settle_seconds: 10,
            aqua_min_observations: 3,
            patch_min_observations: 2,
        }
    }
}

impl HandlerSettings {
    pub fn chain_config(&self) -> ChainConfig {
        ChainConfig::new(self.stabilization, self.throttling)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_seconds)
    }

    fn validate(self) -> Result<Self> {
        if self.stabilization.timeout_seconds() == 0 || self.modification.timeout_seconds() == 0 {
            return Err(ConfigError::Invalid(
                "stabilization timeouts must be positive".to_string(),
            ));
        }
        if self.aqua_min_observations == 0 || self.patch_min_observations == 0 {
            return Err(ConfigError::Invalid(
                "min observation counts must be at least 1".to_string(),
            ));
        }
        Ok(self)
    }
}

/// redflow's config directory (`~/.config/redflow`)
pub fn get_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("redflow"))
        .ok_or(ConfigError::ConfigDirNotFound)
}

/// Locate the settings file
///
/// Lookup order:
/// 1. `REDFLOW_CONFIG_PATH` (must exist when set)
/// 2. `~/.config/redflow/handlers.yaml`
///
/// Returns `Ok(None)` when neither is present.
pub fn find_settings_file() -> Result<Option<PathBuf>> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(Some(path));
        }
        return Err(ConfigError::SettingsFileNotFound(path));
    }

    if let Ok(config_dir) = get_config_dir() {
        let global = config_dir.join(SETTINGS_FILE);
        if global.exists() {
            return Ok(Some(global));
        }
    }

    Ok(None)
}

/// Load settings from the first file found, or the defaults
pub fn load_settings() -> Result<HandlerSettings> {
    match find_settings_file()? {
        Some(path) => load_from(&path),
        None => {
            tracing::debug!("No settings file found, using defaults");
            Ok(HandlerSettings::default())
        }
    }
}

/// Load settings from a YAML file; missing keys keep their defaults
pub fn load_from(path: &Path) -> Result<HandlerSettings> {
    let content = std::fs::read_to_string(path)?;
    let settings: HandlerSettings =
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::debug!("Loaded handler settings from {}", path.display());
    settings.validate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    #[test]
    fn test_defaults() {
        let settings = HandlerSettings::default();
        assert_eq!(settings.stabilization, BackoffPolicy::constant(30, 10_800));
        assert_eq!(settings.modification, BackoffPolicy::exponential(30, 300, 10_800));
        assert_eq!(settings.aqua_min_observations, 3);
        assert_eq!(settings.settle(), Duration::from_secs(10));
        assert_eq!(settings.chain_config().throttling, settings.throttling);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("handlers.yaml");
        fs::write(
            &path,
            "stabilization:\n  kind: constant\n  delay_seconds: 5\n  timeout_seconds: 60\ncool_down_seconds: 0\n",
        )
        .unwrap();

        let settings = load_from(&path).unwrap();

        assert_eq!(settings.stabilization, BackoffPolicy::constant(5, 60));
        assert_eq!(settings.cool_down_seconds, 0);
        assert_eq!(settings.patch_min_observations, 2);
    }

    #[test]
    fn test_zero_observations_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("handlers.yaml");
        fs::write(&path, "aqua_min_observations: 0\n").unwrap();

        assert!(matches!(load_from(&path), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_modification_timeout_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("handlers.yaml");
        fs::write(
            &path,
            "modification:\n  kind: constant\n  delay_seconds: 30\n  timeout_seconds: 0\n",
        )
        .unwrap();

        assert!(matches!(load_from(&path), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_malformed_yaml_reports_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("handlers.yaml");
        fs::write(&path, "stabilization: [not, a, policy]\n").unwrap();

        match load_from(&path) {
            Err(ConfigError::Parse { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("Expected parse error, got {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn test_env_var_takes_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("custom.yaml");
        fs::write(&path, "settle_seconds: 3\n").unwrap();

        temp_env::with_var(CONFIG_PATH_ENV, Some(path.to_str().unwrap()), || {
            assert_eq!(find_settings_file().unwrap(), Some(path.clone()));
            assert_eq!(load_settings().unwrap().settle_seconds, 3);
        });
    }

    #[test]
    #[serial]
    fn test_env_var_pointing_nowhere_is_an_error() {
        temp_env::with_var(CONFIG_PATH_ENV, Some("/nonexistent/redflow.yaml"), || {
            assert!(matches!(
                find_settings_file(),
                Err(ConfigError::SettingsFileNotFound(_))
            ));
        });
    }

    #[cfg(target_os = "linux")]
    #[test]
    #[serial]
    fn test_global_settings_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let redflow_dir = temp_dir.path().join("redflow");
        fs::create_dir(&redflow_dir).unwrap();
        fs::write(redflow_dir.join(SETTINGS_FILE), "cool_down_seconds: 90\n").unwrap();

        temp_env::with_vars(
            [
                (CONFIG_PATH_ENV, None),
                ("XDG_CONFIG_HOME", Some(temp_dir.path().to_str().unwrap())),
            ],
            || {
                assert_eq!(load_settings().unwrap().cool_down_seconds, 90);
            },
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    #[serial]
    fn test_defaults_when_nothing_found() {
        let temp_dir = tempfile::tempdir().unwrap();

        temp_env::with_vars(
            [
                (CONFIG_PATH_ENV, None),
                ("XDG_CONFIG_HOME", Some(temp_dir.path().to_str().unwrap())),
            ],
            || {
                assert_eq!(load_settings().unwrap(), HandlerSettings::default());
            },
        );
    }
}
