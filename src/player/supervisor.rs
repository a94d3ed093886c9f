//! Child process supervision: stdin writing, restart loop, crash-loop
//! detection.
//!
//! One task owns the child handle for its whole life. It drains the command
//! queue into the child's stdin, waits for exit, and classifies the exit by
//! lifetime: a child that dies inside the grace window could not initialize
//! and the host terminates; anything later is a transient failure answered
//! with a respawn. Restarts are unbounded once each grace window clears.

use std::path::PathBuf;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

use async_channel::Receiver;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::command::{Command, CommandSender};
use super::events::{EventBus, PlayerEvent};
use super::parser::OutputParser;
use super::process::{spawn_mplayer, ProcessError};
use super::status::StatusAggregator;

/// A child exiting sooner than this after spawn is a crash loop: the player
/// cannot even initialize, and respawning would spin forever.
pub const CRASH_LOOP_WINDOW: Duration = Duration::from_millis(3000);

/// Classify a child exit by how long the process lived.
pub fn is_crash_loop(lifetime: Duration) -> bool {
  lifetime < CRASH_LOOP_WINDOW
}

/// Why the inner supervision loop stopped watching a child.
enum ExitReason {
  /// The child exited on its own.
  Exited(std::io::Result<ExitStatus>),
  /// The driver is shutting down.
  Shutdown,
  /// Every command sender was dropped; nothing can reach the child.
  Closed,
}

/// Owns the child process and replaces it on every restart.
pub struct Supervisor {
  mplayer_path: Option<PathBuf>,
  extra_args: Vec<String>,
  commands: Receiver<Command>,
  command_sender: CommandSender,
  status: Arc<StatusAggregator>,
  bus: EventBus,
  shutdown: CancellationToken,
}

impl Supervisor {
  pub fn new(
    mplayer_path: Option<PathBuf>,
    extra_args: Vec<String>,
    commands: Receiver<Command>,
    command_sender: CommandSender,
    status: Arc<StatusAggregator>,
    bus: EventBus,
    shutdown: CancellationToken,
  ) -> Self {
    Self {
      mplayer_path,
      extra_args,
      commands,
      command_sender,
      status,
      bus,
      shutdown,
    }
  }

  /// Spawn the first child and hand it to the supervision task. Spawn
  /// failures here surface to the caller; later respawn failures are fatal.
  pub fn start(self) -> Result<tokio::task::JoinHandle<()>, ProcessError> {
    let child = spawn_mplayer(self.mplayer_path.as_ref(), &self.extra_args)?;
    Ok(tokio::spawn(self.run(child)))
  }

  /// Iterative restart loop.
  async fn run(self, mut child: Child) {
    loop {
      let started = Instant::now();
      let mut stdin = child.stdin.take();
      self.attach_readers(&mut child);

      let reason = loop {
        tokio::select! {
          command = self.commands.recv() => match command {
            Ok(command) => write_command(&mut stdin, command).await,
            Err(_) => break ExitReason::Closed,
          },
          exit = child.wait() => break ExitReason::Exited(exit),
          _ = self.shutdown.cancelled() => break ExitReason::Shutdown,
        }
      };

      let exit = match reason {
        ExitReason::Shutdown | ExitReason::Closed => {
          log::info!("Stopping MPlayer");
          if let Err(e) = child.kill().await {
            log::warn!("kill failed: {}", e);
          }
          return;
        }
        ExitReason::Exited(exit) => exit,
      };

      match exit {
        Ok(status) => log::info!("MPlayer exited with {}", status),
        Err(e) => log::warn!("wait on MPlayer failed: {}", e),
      }

      let lifetime = started.elapsed();
      if is_crash_loop(lifetime) {
        // The player cannot initialize; no restart policy fixes that
        log::error!(
          "MPlayer exited {}ms after spawn, aborting",
          lifetime.as_millis()
        );
        std::process::exit(1);
      }

      self.bus.emit(PlayerEvent::PlayStop(None));
      log::info!("MPlayer process exited, restarting...");

      child = match spawn_mplayer(self.mplayer_path.as_ref(), &self.extra_args) {
        Ok(child) => child,
        Err(e) => {
          log::error!("Respawn failed: {}", e);
          std::process::exit(1);
        }
      };
    }
  }

  /// Wire the child's stdout into a fresh parser and its stderr into the
  /// log. Both tasks end on their own when the stream hits EOF.
  fn attach_readers(&self, child: &mut Child) {
    if let Some(mut stdout) = child.stdout.take() {
      let mut parser = OutputParser::new(
        self.status.clone(),
        self.bus.clone(),
        self.command_sender.clone(),
      );
      tokio::spawn(async move {
        let mut buf = [0u8; 4096];
        loop {
          match stdout.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => parser.handle_chunk(&buf[..n]),
            Err(e) => {
              log::warn!("stdout read error: {}", e);
              break;
            }
          }
        }
        log::debug!("stdout reader finished");
      });
    }

    if let Some(mut stderr) = child.stderr.take() {
      tokio::spawn(async move {
        let mut buf = [0u8; 4096];
        loop {
          match stderr.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
              log::debug!("stderr: {}", String::from_utf8_lossy(&buf[..n]).trim_end())
            }
            Err(e) => {
              log::warn!("stderr read error: {}", e);
              break;
            }
          }
        }
      });
    }
  }
}

/// Write one command line to the current child's stdin. Failed writes are
/// logged and dropped: a command racing a process exit is silently lost and
/// the caller re-issues anything that matters.
async fn write_command(stdin: &mut Option<ChildStdin>, command: Command) {
  let line = command.to_line();
  log::debug!(">>>> COMMAND: {}", line.trim_end());

  let Some(stdin) = stdin.as_mut() else {
    log::warn!("no stdin, command dropped: {}", line.trim_end());
    return;
  };

  if let Err(e) = stdin.write_all(line.as_bytes()).await {
    log::warn!("command write failed: {}", e);
  } else if let Err(e) = stdin.flush().await {
    log::warn!("command flush failed: {}", e);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_exit_inside_grace_window_is_a_crash_loop() {
    assert!(is_crash_loop(Duration::from_millis(500)));
    assert!(is_crash_loop(Duration::from_millis(2999)));
  }

  #[test]
  fn test_exit_after_grace_window_is_transient() {
    assert!(!is_crash_loop(Duration::from_millis(3000)));
    assert!(!is_crash_loop(Duration::from_millis(5000)));
  }
}
