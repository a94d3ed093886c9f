//! Cadence-based play/pause inference.
//!
//! MPlayer reports elapsed time continuously while playing and goes quiet
//! the moment playback pauses or stalls. A single debounce deadline,
//! re-armed on every time report, is therefore the sole pause signal: the
//! deadline firing means the reports stopped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use super::events::{EventBus, PlayerEvent};
use super::status::StatusAggregator;

/// How long time reports must be absent before playback counts as paused.
/// A playing stream reports several times per debounce window.
pub const PAUSE_DEBOUNCE: Duration = Duration::from_millis(100);

/// Run the inference loop until the driver shuts down.
///
/// Consumes `TimeChange` events from the bus, tracks position on the status
/// record, and publishes `Play`/`Pause` transitions.
pub async fn run(status: Arc<StatusAggregator>, bus: EventBus, shutdown: CancellationToken) {
  let mut events = bus.subscribe();
  let deadline = tokio::time::sleep(PAUSE_DEBOUNCE);
  tokio::pin!(deadline);
  let mut armed = false;
  let mut paused = false;

  loop {
    tokio::select! {
      event = events.recv() => match event {
        Ok(PlayerEvent::TimeChange(position)) => {
          deadline
            .as_mut()
            .reset(tokio::time::Instant::now() + PAUSE_DEBOUNCE);
          armed = true;

          if paused {
            paused = false;
            status.set_playing(true);
            bus.emit(PlayerEvent::Play);
          }

          status.set_position(&position);
        }
        Ok(_) => {}
        Err(RecvError::Lagged(missed)) => {
          log::warn!("pause inference lagged, {} events missed", missed);
        }
        Err(RecvError::Closed) => break,
      },
      _ = deadline.as_mut(), if armed => {
        armed = false;
        paused = true;
        status.set_playing(false);
        bus.emit(PlayerEvent::Pause);
      }
      _ = shutdown.cancelled() => break,
    }
  }

  log::debug!("pause inference stopped");
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Fixture {
    status: Arc<StatusAggregator>,
    bus: EventBus,
    events: tokio::sync::broadcast::Receiver<PlayerEvent>,
    shutdown: CancellationToken,
  }

  async fn fixture() -> Fixture {
    let bus = EventBus::new();
    let events = bus.subscribe();
    let status = Arc::new(StatusAggregator::new(bus.clone()));
    let shutdown = CancellationToken::new();
    tokio::spawn(run(status.clone(), bus.clone(), shutdown.clone()));
    // Let the inference task subscribe before events start flowing
    tokio::time::sleep(Duration::from_millis(1)).await;
    Fixture {
      status,
      bus,
      events,
      shutdown,
    }
  }

  fn drain(events: &mut tokio::sync::broadcast::Receiver<PlayerEvent>) -> Vec<PlayerEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
      out.push(event);
    }
    out
  }

  #[tokio::test(start_paused = true)]
  async fn test_gap_longer_than_debounce_pauses_exactly_once() {
    let mut f = fixture().await;

    f.bus.emit(PlayerEvent::TimeChange("1.0".to_string()));
    tokio::time::sleep(Duration::from_millis(150)).await;

    let pauses = drain(&mut f.events)
      .into_iter()
      .filter(|e| *e == PlayerEvent::Pause)
      .count();
    assert_eq!(pauses, 1);
    assert!(!f.status.snapshot().playing);

    // The timer is disarmed; more silence must not pause again
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(!drain(&mut f.events).contains(&PlayerEvent::Pause));

    f.shutdown.cancel();
  }

  #[tokio::test(start_paused = true)]
  async fn test_fast_cadence_never_pauses() {
    let mut f = fixture().await;

    for i in 0..10 {
      f.bus.emit(PlayerEvent::TimeChange(format!("{}.0", i)));
      tokio::time::sleep(Duration::from_millis(50)).await;
    }

    assert!(!drain(&mut f.events).contains(&PlayerEvent::Pause));
    assert_eq!(f.status.snapshot().position, "9.0");

    f.shutdown.cancel();
  }

  #[tokio::test(start_paused = true)]
  async fn test_report_after_pause_plays_exactly_once() {
    let mut f = fixture().await;

    f.bus.emit(PlayerEvent::TimeChange("1.0".to_string()));
    tokio::time::sleep(Duration::from_millis(150)).await;
    drain(&mut f.events);

    // Reports resume with a fast cadence
    for i in 0..3 {
      f.bus.emit(PlayerEvent::TimeChange(format!("2.{}", i)));
      tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let plays = drain(&mut f.events)
      .into_iter()
      .filter(|e| *e == PlayerEvent::Play)
      .count();
    assert_eq!(plays, 1);
    assert!(f.status.snapshot().playing);

    f.shutdown.cancel();
  }

  #[tokio::test(start_paused = true)]
  async fn test_position_tracks_every_report() {
    let f = fixture().await;

    f.bus.emit(PlayerEvent::TimeChange("12.3".to_string()));
    tokio::time::sleep(Duration::from_millis(1)).await;

    assert_eq!(f.status.snapshot().position, "12.3");

    f.shutdown.cancel();
  }
}
