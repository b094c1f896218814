//! Service configuration from an optional TOML file.
//!
//! `WORKSHEET_CONFIG_PATH` names the file; every field has a default so the
//! file may be partial or absent. Example:
//!
//! ```toml
//! databases_dir = "databases"
//! output_dir = "outputs"
//! save_copies = true
//! unicode_font = "fonts/NanumGothic.ttf"
//! target_count = 5
//! ```

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  /// Directory holding the `.xlsx` question banks.
  pub databases_dir: PathBuf,
  /// Where a copy of each generated worksheet is written.
  pub output_dir: PathBuf,
  /// Write that copy at all.
  pub save_copies: bool,
  /// TTF used for lines the builtin fonts cannot show. Helvetica if missing.
  pub unicode_font: Option<PathBuf>,
  /// Directory with the selection form (index.html).
  pub static_dir: PathBuf,
  /// Items drawn per section.
  pub target_count: usize,
  /// Items printed per section.
  pub display_limit: usize,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      databases_dir: PathBuf::from("databases"),
      output_dir: PathBuf::from("outputs"),
      save_copies: true,
      unicode_font: Some(PathBuf::from("fonts/NanumGothic.ttf")),
      static_dir: PathBuf::from("static"),
      target_count: crate::sampler::DEFAULT_TARGET_COUNT,
      display_limit: crate::worksheet::DEFAULT_DISPLAY_LIMIT,
    }
  }
}

pub fn parse_config(text: &str) -> Result<AppConfig, toml::de::Error> {
  toml::from_str::<AppConfig>(text)
}

/// Load `AppConfig` from WORKSHEET_CONFIG_PATH. Any IO/parse error falls back to defaults.
pub fn load_config_from_env() -> AppConfig {
  let Ok(path) = std::env::var("WORKSHEET_CONFIG_PATH") else {
    return AppConfig::default();
  };
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_config(&s) {
      Ok(cfg) => {
        info!(target: "pattern_worksheets", %path, "Loaded config (TOML)");
        cfg
      }
      Err(e) => {
        error!(target: "pattern_worksheets", %path, error = %e, "Failed to parse TOML config; using defaults");
        AppConfig::default()
      }
    },
    Err(e) => {
      error!(target: "pattern_worksheets", %path, error = %e, "Failed to read TOML config file; using defaults");
      AppConfig::default()
    }
  }
}
