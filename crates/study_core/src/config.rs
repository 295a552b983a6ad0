use crate::geo::{Coordinate, DEFAULT_CENTER};
use crate::seed::CommentTimestamps;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "studyon.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub seed: SeedConfig,
    pub map: MapConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("studyon.db"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    pub comment_timestamps: CommentTimestamps,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub center_latitude: f64,
    pub center_longitude: f64,
    pub notify_radius_m: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center_latitude: DEFAULT_CENTER.latitude,
            center_longitude: DEFAULT_CENTER.longitude,
            notify_radius_m: 500.0,
        }
    }
}

impl MapConfig {
    pub fn center(&self) -> Coordinate {
        Coordinate::new(self.center_latitude, self.center_longitude)
    }
}

impl AppConfig {
    /// Load `path`, which must exist, or `studyon.toml` in the working
    /// directory when present. Falls back to defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load_from_file(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let config_str = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: AppConfig = toml::from_str(&config_str)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.database.path, PathBuf::from("studyon.db"));
        assert_eq!(config.seed.comment_timestamps, CommentTimestamps::Preserve);
        assert_eq!(config.map.center(), DEFAULT_CENTER);
        assert_eq!(config.map.notify_radius_m, 500.0);
    }

    #[test]
    fn sections_override_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [database]
            path = "/tmp/locations.db"

            [seed]
            comment_timestamps = "seed-time"

            [map]
            notify_radius_m = 250.0
            "#,
        )
        .unwrap();
        assert_eq!(config.database.path, PathBuf::from("/tmp/locations.db"));
        assert_eq!(config.seed.comment_timestamps, CommentTimestamps::SeedTime);
        assert_eq!(config.map.notify_radius_m, 250.0);
        assert_eq!(config.map.center_latitude, DEFAULT_CENTER.latitude);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::load(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("studyon.toml");
        fs::write(&path, "[map]\ncenter_latitude = 51.5\n").unwrap();
        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.map.center_latitude, 51.5);
    }
}
