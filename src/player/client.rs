//! High-level driver facade with friendly playback methods.

use std::sync::Arc;

use async_channel::Receiver;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::command::{command_queue, Command, CommandSender, SeekMode};
use super::events::{EventBus, PlayerEvent};
use super::pause;
use super::process::ProcessError;
use super::status::{PlaybackStatus, StatusAggregator};
use super::supervisor::Supervisor;

#[derive(Error, Debug)]
pub enum PlayerError {
  #[error("Process error: {0}")]
  Process(#[from] ProcessError),
  #[error("Driver already started")]
  AlreadyStarted,
}

/// High-level slave-mode MPlayer driver.
///
/// Every playback method maps onto one or two protocol commands and returns
/// immediately; the protocol is fire-and-forget. Playback state flows back
/// through [`MPlayer::subscribe`] and [`MPlayer::status`].
pub struct MPlayer {
  config: crate::config::PlayerConfig,
  commands: CommandSender,
  command_rx: Mutex<Option<Receiver<Command>>>,
  status: Arc<StatusAggregator>,
  bus: EventBus,
  shutdown: CancellationToken,
}

impl MPlayer {
  /// Create a driver. No process is spawned until [`MPlayer::start`].
  pub fn new(config: crate::config::PlayerConfig) -> Self {
    let (commands, command_rx) = command_queue();
    let bus = EventBus::new();
    let status = Arc::new(StatusAggregator::new(bus.clone()));
    Self {
      config,
      commands,
      command_rx: Mutex::new(Some(command_rx)),
      status,
      bus,
      shutdown: CancellationToken::new(),
    }
  }

  /// Spawn MPlayer and the supervision tasks. Must be called from within a
  /// Tokio runtime; only the first spawn can fail here, restarts are handled
  /// internally.
  pub fn start(&self) -> Result<(), PlayerError> {
    let command_rx = self
      .command_rx
      .lock()
      .take()
      .ok_or(PlayerError::AlreadyStarted)?;

    let supervisor = Supervisor::new(
      self.config.mplayer_path.clone(),
      self.config.args.to_vec(),
      command_rx,
      self.commands.clone(),
      self.status.clone(),
      self.bus.clone(),
      self.shutdown.clone(),
    );
    supervisor.start()?;

    tokio::spawn(pause::run(
      self.status.clone(),
      self.bus.clone(),
      self.shutdown.clone(),
    ));

    log::info!("MPlayer driver started");
    Ok(())
  }

  /// Current playback status snapshot.
  pub fn status(&self) -> PlaybackStatus {
    self.status.snapshot()
  }

  /// Subscribe to driver events.
  pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
    self.bus.subscribe()
  }

  /// Send a raw slave-mode command.
  pub fn send(&self, command: Command) {
    self.commands.send(command);
  }

  /// Apply property overrides, typically right before a load.
  pub fn set_options(&self, options: &[(String, String)]) {
    for (key, value) in options {
      self.commands.send(Command::set_property(key, value));
    }
  }

  /// Stop current playback and load a media file.
  pub fn open_file(&self, file: &str, options: &[(String, String)]) {
    self.commands.send(Command::stop());
    self.set_options(options);
    self.commands.send(Command::loadfile(file));
    self.status.set_playing(true);
  }

  /// Stop current playback and load a playlist file.
  pub fn open_playlist(&self, file: &str, options: &[(String, String)]) {
    self.commands.send(Command::stop());
    self.set_options(options);
    self.commands.send(Command::loadlist(file));
    self.status.set_playing(true);
  }

  /// Resume playback if paused.
  pub fn play(&self) {
    if !self.status.snapshot().playing {
      self.commands.send(Command::pause());
      self.status.set_playing(true);
    }
  }

  /// Pause playback if playing.
  pub fn pause(&self) {
    if self.status.snapshot().playing {
      self.commands.send(Command::pause());
      self.status.set_playing(false);
    }
  }

  /// Stop playback.
  pub fn stop(&self) {
    self.commands.send(Command::stop());
    self.status.set_playing(false);
  }

  /// Skip to the next playlist entry.
  pub fn next(&self) {
    self.commands.send(Command::pt_step(1));
  }

  /// Skip to the previous playlist entry.
  pub fn previous(&self) {
    self.commands.send(Command::pt_step(-1));
  }

  /// Seek to an absolute position in seconds.
  pub fn seek(&self, seconds: f64) {
    self.commands.send(Command::seek(seconds, SeekMode::Absolute));
  }

  /// Seek to a percentage of the file.
  pub fn seek_percent(&self, percent: f64) {
    self.commands.send(Command::seek(percent, SeekMode::Percent));
  }

  /// Set volume (0-100).
  pub fn volume(&self, percent: f64) {
    self.commands.send(Command::volume(percent));
  }

  /// Toggle mute.
  pub fn mute(&self) {
    self.commands.send(Command::mute());
  }

  /// Toggle fullscreen.
  pub fn fullscreen(&self) {
    self.commands.send(Command::vo_fullscreen());
  }

  pub fn show_subtitles(&self) {
    self.commands.send(Command::sub_visibility(true));
  }

  pub fn hide_subtitles(&self) {
    self.commands.send(Command::sub_visibility(false));
  }

  /// Cycle through available subtitle tracks.
  pub fn cycle_subtitles(&self) {
    self.commands.send(Command::sub_select());
  }

  pub fn speed_up_subtitles(&self) {
    self.commands.send(Command::sub_step(1));
  }

  pub fn slow_down_subtitles(&self) {
    self.commands.send(Command::sub_step(-1));
  }

  /// Shift subtitle timing by seconds.
  pub fn adjust_subtitles(&self, seconds: f64) {
    self.commands.send(Command::sub_delay(seconds));
  }

  /// Shift audio timing by seconds.
  pub fn adjust_audio(&self, seconds: f64) {
    self.commands.send(Command::audio_delay(seconds));
  }

  /// Multiply playback speed.
  pub fn playback_speed(&self, factor: f64) {
    self.commands.send(Command::speed_mult(factor));
  }

  /// Kill the child process and stop every driver task.
  pub fn quit(&self) {
    self.shutdown.cancel();
  }
}
