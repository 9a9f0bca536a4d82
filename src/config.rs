//! Global configuration shared by every build step.
//!
//! The only required setting is the location of the zipped Toad Edge CLI
//! distribution. The config is loaded once and passed to the invoker
//! explicitly.
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_SCHEMA_VERSION: u32 = 1;
pub const LIBS_ENV_VAR: &str = "EDGE_CI_LIBS";
const CONFIG_DIR_NAME: &str = "edge-ci";
const CONFIG_FILE_NAME: &str = "config.json";

/// Persisted global settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub schema_version: u32,
    /// Zip archive holding the CLI jar and its `lib/` folder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub libs: Option<PathBuf>,
    /// Fallback Java home when the build environment has no `JAVA_HOME`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub java_home: Option<PathBuf>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            schema_version: CONFIG_SCHEMA_VERSION,
            libs: None,
            java_home: None,
        }
    }
}

impl GlobalConfig {
    /// Library archive path, or the error that aborts a step before it
    /// touches the filesystem.
    pub fn require_libs(&self) -> Result<&Path> {
        self.libs.as_deref().ok_or_else(|| {
            anyhow!("Path to libraries archive is undefined (run `edge-ci config set-libs <zip>`)")
        })
    }

    /// Let `EDGE_CI_LIBS` override the stored library archive.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(value) = std::env::var_os(LIBS_ENV_VAR).filter(|value| !value.is_empty()) {
            self.libs = Some(PathBuf::from(value));
        }
        self
    }
}

/// Default location: `<user config dir>/edge-ci/config.json`.
pub fn default_config_path() -> Result<PathBuf> {
    let base = dirs::config_dir().ok_or_else(|| anyhow!("no user config directory available"))?;
    Ok(base.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load the config at `path`; a missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<GlobalConfig> {
    if !path.exists() {
        return Ok(GlobalConfig::default());
    }
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: GlobalConfig =
        serde_json::from_slice(&bytes).context("parse edge-ci config JSON")?;
    validate_config(&config)?;
    Ok(config)
}

/// Persist a config in a stable JSON format.
pub fn write_config(path: &Path, config: &GlobalConfig) -> Result<()> {
    validate_config(config)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let text = serde_json::to_string_pretty(config).context("serialize edge-ci config")?;
    fs::write(path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn validate_config(config: &GlobalConfig) -> Result<()> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported edge-ci config schema_version {}",
            config.schema_version
        ));
    }
    Ok(())
}

/// Check a candidate library archive path before it is stored.
pub fn validate_libs(value: &str) -> Result<PathBuf> {
    if value.trim().is_empty() {
        return Err(anyhow!("Libraries archive must not be empty"));
    }
    let path = PathBuf::from(value);
    if !path.exists() {
        return Err(anyhow!("File {value} does not exist"));
    }
    if !value.ends_with(".zip") {
        return Err(anyhow!(
            "Expecting zipped libraries (a .zip archive), got {value}"
        ));
    }
    Ok(path)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
