//! Configuration module

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::validation::ExtraFieldPolicy;

/// Startup configuration errors. All of them are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid model file: {}", .0.display())]
    InvalidModel(PathBuf),

    #[error("Invalid stats CSV: {}", .0.display())]
    InvalidStats(PathBuf),

    #[error("Invalid EXTRA_FIELDS value '{0}' (expected 'ignore' or 'reject')")]
    InvalidExtraFields(String),
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Serialized ONNX model
    pub model_path: PathBuf,

    /// Statistics table (name, Min, Max, Mean, Std)
    pub stats_path: PathBuf,

    /// Bind address
    pub host: IpAddr,

    /// Server port
    pub port: u16,

    /// Raw EXTRA_FIELDS value, checked by `validate`
    pub extra_fields: String,

    /// Emit JSON log lines instead of the pretty format
    pub log_json: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            model_path: lookup("MODEL")
                .unwrap_or_else(|| "model.onnx".to_string())
                .into(),

            stats_path: lookup("STATS")
                .unwrap_or_else(|| "stats.csv".to_string())
                .into(),

            host: lookup("HOST")
                .and_then(|h| h.parse().ok())
                .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),

            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(10000),

            extra_fields: lookup("EXTRA_FIELDS")
                .unwrap_or_else(|| "ignore".to_string()),

            log_json: lookup("LOG_FORMAT")
                .map(|f| f.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        }
    }

    /// Refuse to start unless both input files exist and every option parses.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_file(&self.model_path) {
            return Err(ConfigError::InvalidModel(self.model_path.clone()));
        }
        if !is_file(&self.stats_path) {
            return Err(ConfigError::InvalidStats(self.stats_path.clone()));
        }
        self.extra_field_policy()?;
        Ok(())
    }

    pub fn extra_field_policy(&self) -> Result<ExtraFieldPolicy, ConfigError> {
        self.extra_fields
            .parse()
            .map_err(|_| ConfigError::InvalidExtraFields(self.extra_fields.clone()))
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn is_file(path: &Path) -> bool {
    path.metadata().map(|m| m.is_file()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.model_path, PathBuf::from("model.onnx"));
        assert_eq!(config.stats_path, PathBuf::from("stats.csv"));
        assert_eq!(config.port, 10000);
        assert_eq!(config.bind_addr().to_string(), "0.0.0.0:10000");
        assert_eq!(config.extra_field_policy().unwrap(), ExtraFieldPolicy::Ignore);
        assert!(!config.log_json);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "8081"),
            ("HOST", "127.0.0.1"),
            ("EXTRA_FIELDS", "Reject"),
            ("LOG_FORMAT", "JSON"),
        ]));
        assert_eq!(config.bind_addr().to_string(), "127.0.0.1:8081");
        assert_eq!(config.extra_field_policy().unwrap(), ExtraFieldPolicy::Reject);
        assert!(config.log_json);
    }

    #[test]
    fn test_invalid_port_falls_back() {
        let config = Config::from_lookup(lookup(&[("PORT", "not-a-port")]));
        assert_eq!(config.port, 10000);
    }

    #[test]
    fn test_validate_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let stats = dir.path().join("stats.csv");
        std::fs::write(&stats, "name,Min,Max,Mean,Std\n").unwrap();

        let config = Config::from_lookup(lookup(&[
            ("MODEL", dir.path().join("missing.onnx").to_str().unwrap()),
            ("STATS", stats.to_str().unwrap()),
        ]));
        assert!(matches!(config.validate(), Err(ConfigError::InvalidModel(_))));

        // A directory is not a model file either
        let config = Config::from_lookup(lookup(&[
            ("MODEL", dir.path().to_str().unwrap()),
            ("STATS", stats.to_str().unwrap()),
        ]));
        assert!(matches!(config.validate(), Err(ConfigError::InvalidModel(_))));

        let model = dir.path().join("model.onnx");
        std::fs::write(&model, b"onnx").unwrap();
        let config = Config::from_lookup(lookup(&[
            ("MODEL", model.to_str().unwrap()),
            ("STATS", dir.path().join("nope.csv").to_str().unwrap()),
        ]));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().starts_with("Invalid stats CSV"));
    }

    #[test]
    fn test_validate_ok_and_bad_policy() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("model.onnx");
        let stats = dir.path().join("stats.csv");
        std::fs::write(&model, b"onnx").unwrap();
        std::fs::write(&stats, "name,Min,Max,Mean,Std\n").unwrap();

        let config = Config::from_lookup(lookup(&[
            ("MODEL", model.to_str().unwrap()),
            ("STATS", stats.to_str().unwrap()),
        ]));
        assert!(config.validate().is_ok());

        let config = Config::from_lookup(lookup(&[
            ("MODEL", model.to_str().unwrap()),
            ("STATS", stats.to_str().unwrap()),
            ("EXTRA_FIELDS", "drop"),
        ]));
        assert!(matches!(config.validate(), Err(ConfigError::InvalidExtraFields(_))));
    }
}
