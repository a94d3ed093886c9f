//! Canonical playback status and partial-update merging.

use parking_lot::Mutex;
use serde::Serialize;

use super::events::{EventBus, PlayerEvent};

/// Snapshot of everything known about current playback.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackStatus {
  /// Media duration in seconds.
  pub duration: f64,
  pub fullscreen: bool,
  pub subtitles_visible: bool,
  /// Name of the loaded file, once MPlayer announces it.
  pub filename: Option<String>,
  /// ICY stream title, for radio streams that send one.
  pub title: Option<String>,
  /// Raw elapsed-time text from the most recent time report.
  pub position: String,
  pub playing: bool,
}

/// Partial status update. Absent fields keep their previous value; a present
/// field overwrites unconditionally, falsy values included.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusUpdate {
  pub duration: Option<f64>,
  pub fullscreen: Option<bool>,
  pub subtitles_visible: Option<bool>,
  pub filename: Option<String>,
  pub title: Option<String>,
}

/// Single-writer owner of the canonical status record. All mutation goes
/// through here; readers get snapshots.
pub struct StatusAggregator {
  status: Mutex<PlaybackStatus>,
  bus: EventBus,
}

impl StatusAggregator {
  pub fn new(bus: EventBus) -> Self {
    Self {
      status: Mutex::new(PlaybackStatus::default()),
      bus,
    }
  }

  /// Current status snapshot.
  pub fn snapshot(&self) -> PlaybackStatus {
    self.status.lock().clone()
  }

  /// Overwrite the fields present in `update`, keep the rest, and publish
  /// the resulting snapshot.
  pub fn merge(&self, update: StatusUpdate) {
    let snapshot = {
      let mut status = self.status.lock();
      if let Some(duration) = update.duration {
        status.duration = duration;
      }
      if let Some(fullscreen) = update.fullscreen {
        status.fullscreen = fullscreen;
      }
      if let Some(subtitles_visible) = update.subtitles_visible {
        status.subtitles_visible = subtitles_visible;
      }
      if let Some(filename) = update.filename {
        status.filename = Some(filename);
      }
      if let Some(title) = update.title {
        status.title = Some(title);
      }
      status.clone()
    };
    self.bus.emit(PlayerEvent::StatusChange(snapshot));
  }

  /// Restore every field to its default and publish the resulting snapshot.
  pub fn reset(&self) {
    let snapshot = {
      let mut status = self.status.lock();
      *status = PlaybackStatus::default();
      status.clone()
    };
    self.bus.emit(PlayerEvent::StatusChange(snapshot));
  }

  /// Set the playing flag on behalf of the pause inference machine.
  /// Deliberately publishes no status event.
  pub fn set_playing(&self, playing: bool) {
    self.status.lock().playing = playing;
  }

  /// Record the latest time report. Deliberately publishes no status event.
  pub fn set_position(&self, position: &str) {
    self.status.lock().position = position.to_string();
  }
}
