//! Slave-mode MPlayer process driver.
//!
//! Spawns a long-lived MPlayer child in slave mode, writes line-oriented
//! commands to its stdin, and turns its freeform diagnostic stdout into
//! structured playback status and discrete events. Pause and resume are
//! inferred from the cadence of MPlayer's periodic time reports: a playing
//! stream reports faster than the debounce window, a paused one goes quiet.
//!
//! ```no_run
//! use mplayer_driver::{MPlayer, PlayerConfig, PlayerEvent};
//!
//! # async fn demo() -> Result<(), mplayer_driver::PlayerError> {
//! let player = MPlayer::new(PlayerConfig::default());
//! player.start()?;
//!
//! let mut events = player.subscribe();
//! player.open_file("/media/movie.mkv", &[]);
//!
//! while let Ok(event) = events.recv().await {
//!   if let PlayerEvent::TimeChange(position) = event {
//!     println!("at {}", position);
//!   }
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod player;

pub use config::{ExtraArgs, PlayerConfig};
pub use player::{
  find_mplayer, Command, EventBus, MPlayer, PlaybackStatus, PlayerError, PlayerEvent,
  ProcessError, SeekMode, StatusUpdate, CRASH_LOOP_WINDOW, PAUSE_DEBOUNCE,
};
