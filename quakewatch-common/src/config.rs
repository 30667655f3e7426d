//! Configuration loading and data folder resolution

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Optional TOML configuration file schema (`config.toml`)
///
/// Every field is optional; missing fields fall back to command-line
/// arguments, environment variables, or compiled defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Port the HTTP server binds to
    pub port: Option<u16>,
    /// Folder containing the model and catalog files
    pub data_folder: Option<String>,
    /// Forecast profile name
    pub profile: Option<String>,
    /// Model artifact file name, relative to the data folder
    pub model_file: Option<String>,
    /// Catalog CSV file name, relative to the data folder
    pub catalog_file: Option<String>,
    /// Decision threshold override
    pub threshold: Option<f64>,
    /// Spatial neighborhood radius override (degrees per axis)
    pub radius: Option<f64>,
    /// Upper bound on the per-axis grid resolution
    pub max_grid_size: Option<usize>,
}

impl TomlConfig {
    /// Load from an explicit path, failing if the file is unreadable or
    /// malformed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("cannot parse {}: {}", path.display(), e)))
    }

    /// Load from the default platform locations, returning defaults when no
    /// config file exists. A missing file is not an error.
    pub fn load_default_locations() -> Self {
        for path in default_config_paths() {
            if path.exists() {
                match Self::load(&path) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Ignoring config file {}: {}", path.display(), e);
                    }
                }
            }
        }
        Self::default()
    }
}

/// Data folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_data_folder(
    cli_arg: Option<&str>,
    env_var_name: &str,
    config: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    if let Ok(path) = std::env::var(env_var_name) {
        return PathBuf::from(path);
    }

    if let Some(path) = &config.data_folder {
        return PathBuf::from(path);
    }

    default_data_folder()
}

/// Candidate config file paths for the platform, highest priority first
fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("quakewatch").join("config.toml"));
    }
    if cfg!(target_os = "linux") {
        paths.push(PathBuf::from("/etc/quakewatch/config.toml"));
    }
    paths
}

/// OS-dependent default data folder path
pub fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("quakewatch"))
        .unwrap_or_else(|| PathBuf::from("./quakewatch_data"))
}
