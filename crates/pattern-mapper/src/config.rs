//! Client configuration.
//!
//! The only setting that matters to a client is where the pattern backend
//! lives (`apiUrl`). It can come from a `pattern-mapper.yaml` file, the
//! `PATTERN_MAPPER_API_URL` environment variable, or the command line; later
//! sources win.
//!
//! ```yaml
//! apiUrl: http://localhost:9980
//! settings: patterns/flower.yaml
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::ApiBase;

pub const DEFAULT_API_URL: &str = "http://localhost:9980";
pub const API_URL_ENV: &str = "PATTERN_MAPPER_API_URL";
pub const CONFIG_FILE_NAME: &str = "pattern-mapper.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid apiUrl '{0}': expected an http:// or https:// URL")]
    InvalidApiUrl(String),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the pattern backend.
    #[serde(rename = "apiUrl", default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    /// Default settings file for `load`. Relative paths in a config file
    /// are relative to that file's directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<PathBuf>,
}

impl Config {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        // an empty file is an empty config, not an error
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Self::from_yaml_str(&text)?;
        if let (Some(settings), Some(dir)) = (config.settings.as_mut(), path.parent()) {
            if settings.is_relative() {
                *settings = dir.join(&*settings);
            }
        }
        Ok(config)
    }

    /// Like [`Config::load`], but a missing file gives the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Pick the backend URL: command line, then environment, then file,
    /// then [`DEFAULT_API_URL`]. Blank values count as unset.
    pub fn resolve_api_url(
        &self,
        env_value: Option<&str>,
        cli_value: Option<&str>,
    ) -> Result<ApiBase, ConfigError> {
        let chosen = [cli_value, env_value, self.api_url.as_deref()]
            .into_iter()
            .flatten()
            .find(|v| !v.trim().is_empty())
            .unwrap_or(DEFAULT_API_URL);
        ApiBase::parse(chosen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_camel_case_key() {
        let config = Config::from_yaml_str("apiUrl: http://example.com:8000\nsettings: s.yaml\n").unwrap();
        assert_eq!(config.api_url.as_deref(), Some("http://example.com:8000"));
        assert_eq!(config.settings, Some(PathBuf::from("s.yaml")));
        assert_eq!(Config::from_yaml_str("").unwrap(), Config::default());
    }

    #[test]
    fn precedence() {
        let config = Config {
            api_url: Some("http://file:1".into()),
            ..Default::default()
        };
        let url = |env, cli| config.resolve_api_url(env, cli).unwrap().to_string();
        assert_eq!(url(None, None), "http://file:1");
        assert_eq!(url(Some("http://env:2"), None), "http://env:2");
        assert_eq!(url(Some("http://env:2"), Some("http://cli:3/")), "http://cli:3");
        assert_eq!(url(Some("  "), None), "http://file:1");

        let empty = Config::default();
        assert_eq!(
            empty.resolve_api_url(None, None).unwrap().as_str(),
            DEFAULT_API_URL
        );
    }

    #[test]
    fn bad_url_is_reported() {
        let err = Config::default()
            .resolve_api_url(None, Some("localhost"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidApiUrl(ref u) if u == "localhost"));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "apiUrl: https://patterns.example").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.api_url.as_deref(), Some("https://patterns.example"));

        let missing = Config::load_or_default("/no/such/pattern-mapper.yaml").unwrap();
        assert_eq!(missing, Config::default());
        assert!(Config::load("/no/such/pattern-mapper.yaml").is_err());
    }

    #[test]
    fn settings_path_is_relative_to_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("conf");
        fs::create_dir(&nested).unwrap();
        let file = nested.join(CONFIG_FILE_NAME);
        fs::write(&file, "settings: flower.yaml\n").unwrap();
        let config = Config::load(&file).unwrap();
        assert_eq!(config.settings, Some(nested.join("flower.yaml")));

        fs::write(&file, "settings: /abs/flower.yaml\n").unwrap();
        let config = Config::load(&file).unwrap();
        assert_eq!(config.settings, Some(PathBuf::from("/abs/flower.yaml")));
    }
}
