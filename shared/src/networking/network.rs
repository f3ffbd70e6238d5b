use std::{collections::HashSet, path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::worker::WorkerSpec;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read network config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid network config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid network config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid network config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

fn default_max_attempts() -> u32 {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TilingConfig {
    pub size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Seconds a worker may spend on one tile before the tile is requeued.
    #[serde(default)]
    pub tile_timeout_secs: Option<f64>,
    /// How many connections may attempt a tile before it is given up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Seed for tile order and display colours; random when unset.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Score every worker before dispatching.
    #[serde(default)]
    pub benchmark: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            tile_timeout_secs: None,
            max_attempts: default_max_attempts(),
            seed: None,
            benchmark: false,
        }
    }
}

impl DispatchConfig {
    pub fn tile_timeout(&self) -> Option<Duration> {
        self.tile_timeout_secs
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub workers: Vec<WorkerSpec>,
    pub tiling: TilingConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

impl NetworkConfig {
    /// Reads a `.yaml`/`.yml` file as YAML and anything else as JSON.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml(&contents),
            _ => Self::from_json(&contents),
        }
    }

    pub fn from_yaml(contents: &str) -> ConfigResult<Self> {
        let config: NetworkConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(contents: &str) -> ConfigResult<Self> {
        let config: NetworkConfig = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.workers.is_empty() {
            return Err(ConfigError::Invalid("no workers configured".to_owned()));
        }
        if self.tiling.size == 0 {
            return Err(ConfigError::Invalid("tiling.size must be positive".to_owned()));
        }
        if self.dispatch.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "dispatch.max_attempts must be at least 1".to_owned(),
            ));
        }
        if let Some(timeout) = self.dispatch.tile_timeout_secs {
            if !(timeout > 0.0 && Duration::try_from_secs_f64(timeout).is_ok()) {
                return Err(ConfigError::Invalid(format!(
                    "dispatch.tile_timeout_secs must be a positive duration, got {timeout}"
                )));
            }
        }

        let mut names = HashSet::new();
        for worker in &self.workers {
            if !names.insert(worker.display_name()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate worker name {:?}",
                    worker.display_name()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_with_defaults() {
        let config = NetworkConfig::from_json(
            r#"{
                "workers": [
                    {"address": "10.0.0.1:11811", "name": "alpha"},
                    {"address": "10.0.0.2:11811"}
                ],
                "tiling": {"size": 32}
            }"#,
        )
        .unwrap();

        assert_eq!(config.workers[1].display_name(), "10.0.0.2:11811");
        assert_eq!(config.tiling.size, 32);
        assert_eq!(config.dispatch.max_attempts, 3);
        assert_eq!(config.dispatch.tile_timeout(), None);
    }

    fn config_with(workers: &str, tiling: &str, dispatch: &str) -> String {
        format!(r#"{{"workers": {workers}, "tiling": {tiling}, "dispatch": {dispatch}}}"#)
    }

    #[test]
    fn rejects_invalid_configs() {
        let one = r#"[{"address": "a"}]"#;
        let twins = r#"[{"address": "a", "name": "w"}, {"address": "b", "name": "w"}]"#;
        let size = r#"{"size": 8}"#;
        for contents in [
            config_with("[]", size, "{}"),
            config_with(one, r#"{"size": 0}"#, "{}"),
            config_with(twins, size, "{}"),
            config_with(one, size, r#"{"max_attempts": 0}"#),
            config_with(one, size, r#"{"tile_timeout_secs": -1}"#),
        ] {
            assert!(
                matches!(NetworkConfig::from_json(&contents), Err(ConfigError::Invalid(_))),
                "accepted {contents}"
            );
        }
    }

    #[test]
    fn reads_yaml_network_files() {
        let config = NetworkConfig::from_yaml(
            "\
workers:
  - address: 10.0.0.1:11811
    name: alpha
  - address: 10.0.0.2:11811
tiling:
  size: 16
dispatch:
  tile_timeout_secs: 30
",
        )
        .unwrap();

        assert_eq!(config.workers.len(), 2);
        assert_eq!(config.workers[0].display_name(), "alpha");
        assert_eq!(config.tiling.size, 16);
        assert_eq!(config.dispatch.tile_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn rejects_timeouts_beyond_duration_range() {
        let contents = config_with(
            r#"[{"address": "a"}]"#,
            r#"{"size": 8}"#,
            r#"{"tile_timeout_secs": 1e30}"#,
        );
        assert!(matches!(
            NetworkConfig::from_json(&contents),
            Err(ConfigError::Invalid(_))
        ));

        let unchecked = DispatchConfig {
            tile_timeout_secs: Some(1e30),
            ..DispatchConfig::default()
        };
        assert_eq!(unchecked.tile_timeout(), None);
    }
}
