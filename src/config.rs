//! Driver configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Extra MPlayer arguments: either one command line split on whitespace, or
/// a pre-split list passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtraArgs {
  Line(String),
  List(Vec<String>),
}

impl ExtraArgs {
  /// Normalize to one argument vector.
  pub fn to_vec(&self) -> Vec<String> {
    match self {
      ExtraArgs::Line(line) => line.split_whitespace().map(str::to_string).collect(),
      ExtraArgs::List(args) => args.clone(),
    }
  }
}

impl Default for ExtraArgs {
  fn default() -> Self {
    ExtraArgs::List(Vec::new())
  }
}

impl From<&str> for ExtraArgs {
  fn from(line: &str) -> Self {
    ExtraArgs::Line(line.to_string())
  }
}

impl From<String> for ExtraArgs {
  fn from(line: String) -> Self {
    ExtraArgs::Line(line)
  }
}

impl From<Vec<String>> for ExtraArgs {
  fn from(args: Vec<String>) -> Self {
    ExtraArgs::List(args)
  }
}

/// Player configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerConfig {
  /// Custom MPlayer executable path (None = PATH lookup).
  #[serde(default)]
  pub mplayer_path: Option<PathBuf>,

  /// Additional MPlayer command-line arguments.
  #[serde(default)]
  pub args: ExtraArgs,
}

impl PlayerConfig {
  /// Validate configuration values.
  pub fn validate(&self) -> Result<(), String> {
    if let Some(path) = &self.mplayer_path {
      if path.as_os_str().is_empty() {
        return Err("MPlayer path cannot be empty".to_string());
      }
    }
    Ok(())
  }
}
