use serde::Deserialize;
use std::fs;

use crate::error::ConfigError;
use crate::history::{DEFAULT_HISTORY_CAPACITY, DEFAULT_LOG_CAPACITY};
use crate::view::CHART_WINDOW;

pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8080/stream?role=dashboard";
/// Producer role; generators push packets to every dashboard on the stream.
pub const GENERATOR_ENDPOINT: &str = "ws://localhost:8080/stream?role=generator";

pub const ENV_CONFIG_PATH: &str = "DASHBOARD_CONFIG";
pub const ENV_ENDPOINT: &str = "DASHBOARD_URL";

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    pub endpoint: String,
    pub history_capacity: usize,
    pub log_capacity: usize,
    pub chart_window: usize,
    pub auto_connect: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            log_capacity: DEFAULT_LOG_CAPACITY,
            chart_window: CHART_WINDOW,
            auto_connect: true,
        }
    }
}

impl DashboardConfig {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(data)?;
        Ok(cfg.normalized())
    }

    /// Defaults, then the file named by `DASHBOARD_CONFIG`, then `DASHBOARD_URL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var(ENV_CONFIG_PATH).ok();
        let endpoint = std::env::var(ENV_ENDPOINT).ok();
        Self::resolve(path.as_deref(), endpoint)
    }

    pub fn resolve(path: Option<&str>, endpoint: Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = match path {
            Some(p) => Self::load(p)?,
            None => Self::default(),
        };
        if let Some(url) = endpoint.filter(|u| !u.trim().is_empty()) {
            cfg.endpoint = url;
        }
        Ok(cfg)
    }

    fn normalized(mut self) -> Self {
        self.history_capacity = self.history_capacity.max(1);
        self.log_capacity = self.log_capacity.max(1);
        self.chart_window = self.chart_window.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = DashboardConfig::default();
        assert_eq!(cfg.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(cfg.history_capacity, 200);
        assert_eq!(cfg.log_capacity, 200);
        assert_eq!(cfg.chart_window, 40);
        assert!(cfg.auto_connect);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let cfg = DashboardConfig::from_json(r#"{"chart_window": 0, "auto_connect": false}"#).unwrap();
        assert_eq!(cfg.chart_window, 1);
        assert!(!cfg.auto_connect);
        assert_eq!(cfg.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_load_from_file_and_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"endpoint": "ws://10.0.0.5:9000/stream?role=dashboard"}}"#).unwrap();
        let path = file.path().to_str().unwrap();

        let cfg = DashboardConfig::resolve(Some(path), None).unwrap();
        assert_eq!(cfg.endpoint, "ws://10.0.0.5:9000/stream?role=dashboard");

        let cfg = DashboardConfig::resolve(Some(path), Some("ws://other/stream".into())).unwrap();
        assert_eq!(cfg.endpoint, "ws://other/stream");
    }

    #[test]
    fn test_missing_file_and_bad_json() {
        assert!(matches!(
            DashboardConfig::load("/definitely/not/here.json"),
            Err(ConfigError::Io { .. })
        ));
        assert!(matches!(DashboardConfig::from_json("{"), Err(ConfigError::Json(_))));
    }
}
