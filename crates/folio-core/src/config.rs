//! Persisted defaults (served root, host, port) in the app data directory.
//! Command-line flags override them; missing values fall back to built-in defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::app_data;

pub const DEFAULT_ROOT: &str = "./";
pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 4040;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory served when none is given on the command line.
    pub root: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Fully resolved serving settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeSettings {
    pub root: PathBuf,
    pub host: String,
    pub port: u16,
}

impl Config {
    /// Merge command-line values over this config and the built-in defaults.
    pub fn settings(&self, root: Option<PathBuf>, host: Option<String>, port: Option<u16>) -> ServeSettings {
        ServeSettings {
            root: root
                .or_else(|| self.root.clone().filter(|s| !s.is_empty()).map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT)),
            host: host
                .or_else(|| self.host.clone())
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: port.or(self.port).unwrap_or(DEFAULT_PORT),
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    app_data::config_file()
}

/// Load config from the app data directory. Returns default config if missing or invalid.
pub fn load_config() -> Config {
    config_path().map(|p| load_config_from(&p)).unwrap_or_default()
}

/// Load config from `path`. Returns default config if missing or invalid.
pub fn load_config_from(path: &Path) -> Config {
    let Ok(s) = std::fs::read_to_string(path) else {
        return Config::default();
    };
    match toml::from_str(&s) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring invalid config");
            Config::default()
        }
    }
}

/// Save config to the app data directory.
pub fn save_config(config: &Config) -> Result<(), ConfigError> {
    let path = config_path().ok_or(ConfigError::NoDataDir)?;
    save_config_to(config, &path)
}

pub fn save_config_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    let s = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;
    std::fs::write(path, s).map_err(ConfigError::Write)
}

/// Set and persist the default served root.
pub fn set_default_root(path: &Path) -> Result<PathBuf, ConfigError> {
    let path = path.canonicalize().map_err(ConfigError::Canonicalize)?;
    if !path.is_dir() {
        return Err(ConfigError::NotADirectory(path));
    }
    let mut config = load_config();
    config.root = Some(path.to_string_lossy().into_owned());
    save_config(&config)?;
    Ok(path)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine app data directory")]
    NoDataDir,
    #[error("failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("failed to write config: {0}")]
    Write(std::io::Error),
    #[error("failed to resolve path: {0}")]
    Canonicalize(std::io::Error),
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::app_data::CONFIG_FILENAME;

    #[test]
    fn defaults_when_nothing_is_set() {
        let s = Config::default().settings(None, None, None);
        assert_eq!(s.root, PathBuf::from(DEFAULT_ROOT));
        assert_eq!(s.host, DEFAULT_HOST);
        assert_eq!(s.port, DEFAULT_PORT);
    }

    #[test]
    fn flags_override_file() {
        let c = Config {
            root: Some("/srv/docs".into()),
            host: Some("0.0.0.0".into()),
            port: Some(8080),
        };
        let s = c.settings(None, None, Some(9000));
        assert_eq!(s.root, PathBuf::from("/srv/docs"));
        assert_eq!(s.host, "0.0.0.0");
        assert_eq!(s.port, 9000);
        let s = c.settings(Some(PathBuf::from("other")), Some("::1".into()), None);
        assert_eq!(s.root, PathBuf::from("other"));
        assert_eq!(s.host, "::1");
        assert_eq!(s.port, 8080);
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        let c = Config {
            root: Some("/tmp/notes".into()),
            host: None,
            port: Some(4141),
        };
        save_config_to(&c, &path).unwrap();
        assert_eq!(load_config_from(&path), c);
    }

    #[test]
    fn invalid_or_missing_file_is_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        assert_eq!(load_config_from(&path), Config::default());
        std::fs::write(&path, "port = \"not a number\"").unwrap();
        assert_eq!(load_config_from(&path), Config::default());
    }
}
