//! Configuration file handling for itest

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use itest_client::HarnessConfig;

/// Command-line values that take precedence over the config file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config_url: Option<String>,
    pub devices_url: Option<String>,
    pub telemetry_url: Option<String>,
    pub workers: Option<usize>,
}

/// Load the harness configuration
///
/// An explicit path must exist. Without one, the default path is read when
/// present and built-in defaults are used otherwise.
pub fn load(path: Option<&Path>) -> Result<HarnessConfig> {
    match path {
        Some(path) => load_from(path),
        None => {
            let default_path = config_path()?;
            if default_path.exists() {
                load_from(&default_path)
            } else {
                Ok(HarnessConfig::default())
            }
        }
    }
}

/// Load configuration from a specific path
pub fn load_from(path: &Path) -> Result<HarnessConfig> {
    HarnessConfig::from_toml_file(path)
        .with_context(|| format!("Failed to load config file: {}", path.display()))
}

/// Get the default config file path
pub fn config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Could not determine config directory")?
        .join("itest");

    Ok(config_dir.join("config.toml"))
}

/// Merge CLI arguments over config file values
pub fn merge(mut config: HarnessConfig, overrides: &Overrides) -> Result<HarnessConfig> {
    if let Some(url) = &overrides.config_url {
        config.services.config = url.clone();
    }
    if let Some(url) = &overrides.devices_url {
        config.services.device_management = url.clone();
    }
    if let Some(url) = &overrides.telemetry_url {
        config.services.telemetry = url.clone();
    }
    if let Some(workers) = overrides.workers {
        config.suite.workers = workers;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[services]
telemetry = "http://telemetry.test:9004/v1"

[suite]
workers = 2
"#
        )
        .unwrap();

        let config = load(Some(file.path())).unwrap();
        assert_eq!(config.services.telemetry, "http://telemetry.test:9004/v1");
        assert_eq!(config.services.config, "http://127.0.0.1:9005/v1");
        assert_eq!(config.suite.workers, 2);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn test_overrides_win() {
        let overrides = Overrides {
            devices_url: Some("http://dm.test/v1".into()),
            workers: Some(1),
            ..Overrides::default()
        };

        let config = merge(HarnessConfig::default(), &overrides).unwrap();
        assert_eq!(config.services.device_management, "http://dm.test/v1");
        assert_eq!(config.services.config, "http://127.0.0.1:9005/v1");
        assert_eq!(config.suite.workers, 1);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let overrides = Overrides {
            workers: Some(0),
            ..Overrides::default()
        };
        assert!(merge(HarnessConfig::default(), &overrides).is_err());
    }

    #[test]
    fn test_config_path_under_itest() {
        if let Ok(path) = config_path() {
            assert!(path.ends_with("itest/config.toml"));
        }
    }
}
