use crate::settings::SimulationSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write config file {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Complete application configuration for export/import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Version field for future compatibility
    pub version: u32,
    /// All simulation settings
    pub settings: SimulationSettings,
    /// Frame rate the surface paces itself to
    pub target_fps: u32,
    /// Edge length of a drawn particle, in simulation units
    pub point_size: f32,
    /// Surface title
    pub title: String,
}

impl AppConfig {
    /// Export config to a JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, json).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Import config from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Conventional location under the user's config directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("dla-walkers").join("config.json"))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: 1,
            settings: SimulationSettings::default(),
            target_fps: 100,
            point_size: 2.0,
            title: "DLA".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::Vec2;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn test_config_file_save_and_load() {
        let config = AppConfig {
            settings: SimulationSettings {
                width: 800.0,
                height: 600.0,
                worker_count: 3,
                step_size: 2.5,
                free_spawn: Vec2::new(10.0, 20.0),
                cluster_spawn: Some(Vec2::new(400.0, 300.0)),
                rng_seed: Some(77),
                ..Default::default()
            },
            target_fps: 30,
            ..Default::default()
        };

        let temp_file = NamedTempFile::new().unwrap();
        config.save_to_file(temp_file.path()).unwrap();
        let loaded = AppConfig::load_from_file(temp_file.path()).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        AppConfig::default().save_to_file(&path).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), r#"{ "settings": { "step_size": 4.0 } }"#).unwrap();

        let loaded = AppConfig::load_from_file(temp_file.path()).unwrap();

        assert_eq!(loaded.settings.step_size, 4.0);
        assert_eq!(loaded.settings.worker_count, 20);
        assert_eq!(loaded.target_fps, 100);
        assert_eq!(loaded.title, "DLA");
    }

    #[test]
    fn test_invalid_config_file() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), "not valid json").unwrap();

        let result = AppConfig::load_from_file(temp_file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_config_file() {
        let result = AppConfig::load_from_file(Path::new("/nonexistent/path/config.json"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
