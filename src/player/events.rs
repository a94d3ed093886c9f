//! Driver events and the broadcast bus they travel on.

use tokio::sync::broadcast;

use super::status::PlaybackStatus;

/// Capacity of the event broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Event published by the driver (playback transitions, status snapshots).
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
  /// MPlayer printed its startup banner and accepts commands.
  Ready,
  /// The canonical status record changed; carries the new snapshot.
  StatusChange(PlaybackStatus),
  /// Playback of the loaded file started.
  PlayStart,
  /// Playback ended. Carries the EOF code when one was reported; `None`
  /// when the child exited and was restarted.
  PlayStop(Option<i32>),
  /// A periodic time report arrived; carries the raw elapsed-time text.
  TimeChange(String),
  /// Time reports resumed after a pause.
  Play,
  /// Time reports stopped for longer than the debounce window.
  Pause,
}

/// Broadcast bus every component publishes through. Cloning shares the
/// underlying channel; every subscriber sees every event.
#[derive(Clone)]
pub struct EventBus {
  tx: broadcast::Sender<PlayerEvent>,
}

impl EventBus {
  /// Create a new bus with no subscribers.
  pub fn new() -> Self {
    let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    Self { tx }
  }

  /// Subscribe to all events published after this call.
  pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
    self.tx.subscribe()
  }

  /// Publish an event. Having no subscribers is not an error.
  pub fn emit(&self, event: PlayerEvent) {
    log::debug!("event: {:?}", event);
    let _ = self.tx.send(event);
  }
}

impl Default for EventBus {
  fn default() -> Self {
    Self::new()
  }
}
