use std::path::Path;

use anyhow::{anyhow, Context, Result};
use kaptain::LogLevel;
use serde::Deserialize;
use tracing::debug;

/// Optional settings read from a YAML config file. Flags and environment
/// variables take precedence over file values
#[derive(Debug, Default, Deserialize)]
pub struct SailorConfig {
  #[serde(default)]
  pub store: Option<String>,

  #[serde(default)]
  pub log: Option<String>,
}

impl SailorConfig {
  /// Load the explicit config file, or `$HOME/.sailor.yaml` when present.
  /// No file at the default location is not an error
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    match explicit_path {
      Some(path) => SailorConfig::parse_file(path),
      None => {
        let Some(home) = dirs::home_dir() else {
          return Ok(SailorConfig::default());
        };
        let path = home.join(".sailor.yaml");
        if path.exists() {
          SailorConfig::parse_file(&path)
        } else {
          Ok(SailorConfig::default())
        }
      }
    }
  }

  fn parse_file(path: &Path) -> Result<Self> {
    debug!("using config file: {}", path.display());

    let data = std::fs::read(path).with_context(|| format!("failed to read config file {}", path.display()))?;
    serde_yaml::from_slice(&data).with_context(|| format!("failed to parse config file {}", path.display()))
  }

  pub fn log_level(&self) -> Result<Option<LogLevel>> {
    self
      .log
      .as_deref()
      .map(|level| level.parse::<LogLevel>().map_err(|err| anyhow!(err)))
      .transpose()
  }
}
