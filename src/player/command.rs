//! Slave-mode command lines and the fire-and-forget send queue.

use async_channel::{Receiver, Sender};

/// Seek interpretation for the `seek` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekMode {
  /// Position as a percentage of the file.
  Percent = 1,
  /// Absolute position in seconds.
  Absolute = 2,
}

/// One slave-mode command: a name plus ordered arguments.
///
/// Serializes to exactly one line of text, space-joined and
/// newline-terminated. No acknowledgement is awaited.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
  pub name: String,
  pub args: Vec<String>,
}

impl Command {
  /// Create a command with an arbitrary argument list.
  pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
    Self {
      name: name.into(),
      args,
    }
  }

  /// Serialize to the wire form.
  pub fn to_line(&self) -> String {
    let mut line = self.name.clone();
    for arg in &self.args {
      line.push(' ');
      line.push_str(arg);
    }
    line.push('\n');
    line
  }

  /// Stop playback.
  pub fn stop() -> Self {
    Self::new("stop", Vec::new())
  }

  /// Load a media file, quoted for paths with spaces.
  pub fn loadfile(path: &str) -> Self {
    Self::new("loadfile", vec![format!("\"{}\"", path)])
  }

  /// Load a playlist file, quoted for paths with spaces.
  pub fn loadlist(path: &str) -> Self {
    Self::new("loadlist", vec![format!("\"{}\"", path)])
  }

  /// Toggle pause.
  pub fn pause() -> Self {
    Self::new("pause", Vec::new())
  }

  /// Step through the playlist (`1` forward, `-1` back).
  pub fn pt_step(step: i32) -> Self {
    Self::new("pt_step", vec![step.to_string()])
  }

  /// Seek by percentage or to an absolute position.
  pub fn seek(amount: f64, mode: SeekMode) -> Self {
    Self::new("seek", vec![amount.to_string(), (mode as i32).to_string()])
  }

  /// Set volume as an absolute percentage.
  pub fn volume(percent: f64) -> Self {
    Self::new("volume", vec![percent.to_string(), "1".to_string()])
  }

  /// Toggle mute.
  pub fn mute() -> Self {
    Self::new("mute", Vec::new())
  }

  /// Toggle fullscreen.
  pub fn vo_fullscreen() -> Self {
    Self::new("vo_fullscreen", Vec::new())
  }

  /// Show (`true`) or hide (`false`) subtitles.
  pub fn sub_visibility(visible: bool) -> Self {
    let flag = if visible { "1" } else { "-1" };
    Self::new("sub_visibility", vec![flag.to_string()])
  }

  /// Cycle through available subtitle tracks.
  pub fn sub_select() -> Self {
    Self::new("sub_select", Vec::new())
  }

  /// Step subtitle timing forward or back.
  pub fn sub_step(step: i32) -> Self {
    Self::new("sub_step", vec![step.to_string()])
  }

  /// Shift subtitle delay by seconds.
  pub fn sub_delay(seconds: f64) -> Self {
    Self::new("sub_delay", vec![seconds.to_string()])
  }

  /// Shift audio delay by seconds.
  pub fn audio_delay(seconds: f64) -> Self {
    Self::new("audio_delay", vec![seconds.to_string()])
  }

  /// Multiply playback speed.
  pub fn speed_mult(factor: f64) -> Self {
    Self::new("speed_mult", vec![factor.to_string()])
  }

  /// Query media duration; answered with `ANS_LENGTH=`.
  pub fn get_time_length() -> Self {
    Self::new("get_time_length", Vec::new())
  }

  /// Query fullscreen state; answered with `ANS_VO_FULLSCREEN=`.
  pub fn get_vo_fullscreen() -> Self {
    Self::new("get_vo_fullscreen", Vec::new())
  }

  /// Query subtitle visibility; answered with `ANS_SUB_VISIBILITY=`.
  pub fn get_sub_visibility() -> Self {
    Self::new("get_sub_visibility", Vec::new())
  }

  /// Set an arbitrary property.
  pub fn set_property(key: &str, value: &str) -> Self {
    Self::new("set_property", vec![key.to_string(), value.to_string()])
  }
}

/// Sender half of the command queue feeding the supervisor's stdin writer.
/// Fire-and-forget: callers never wait and never see write failures.
#[derive(Clone)]
pub struct CommandSender {
  tx: Sender<Command>,
}

impl CommandSender {
  /// Queue a command for the current child process.
  pub fn send(&self, command: Command) {
    // The queue is unbounded, the only failure is a closed channel
    if self.tx.try_send(command).is_err() {
      log::warn!("command dropped, driver is shut down");
    }
  }
}

/// Create the command queue pair.
pub fn command_queue() -> (CommandSender, Receiver<Command>) {
  let (tx, rx) = async_channel::unbounded();
  (CommandSender { tx }, rx)
}
