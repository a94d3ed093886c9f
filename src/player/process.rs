//! MPlayer binary lookup and slave-mode process spawning.

use std::path::PathBuf;
use std::process::Stdio;

use thiserror::Error;
use tokio::process::{Child, Command};

#[derive(Error, Debug)]
pub enum ProcessError {
  #[error("MPlayer executable not found")]
  NotFound,
  #[error("Failed to spawn MPlayer: {0}")]
  SpawnFailed(#[from] std::io::Error),
}

/// Fixed slave-mode argument list, prepended to any caller arguments.
///
/// `global=6`/`cplayer=4` raise message verbosity to the level the output
/// parser depends on; `-idle -slave` keeps the process alive between files
/// and command-driven over stdin; `-noborder` opens the video window without
/// decorations.
pub const BASE_ARGS: [&str; 7] = [
  "-msglevel",
  "global=6",
  "-msglevel",
  "cplayer=4",
  "-idle",
  "-slave",
  "-noborder",
];

/// Find the MPlayer executable on PATH.
pub fn find_mplayer() -> Option<PathBuf> {
  which::which("mplayer").ok()
}

/// Spawn MPlayer in slave mode with all three stdio streams piped.
pub fn spawn_mplayer(path: Option<&PathBuf>, extra_args: &[String]) -> Result<Child, ProcessError> {
  let exe = path.cloned().or_else(find_mplayer).ok_or(ProcessError::NotFound)?;

  log::info!("Spawning MPlayer: {:?}", exe);
  if !extra_args.is_empty() {
    log::info!("Extra MPlayer args: {:?}", extra_args);
  }

  let mut cmd = Command::new(&exe);
  cmd.args(BASE_ARGS);
  cmd.args(extra_args);

  let child = cmd
    .stdin(Stdio::piped())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true)
    .spawn()?;

  Ok(child)
}
