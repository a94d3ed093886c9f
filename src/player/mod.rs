//! Slave-mode MPlayer driver - spawns and controls an external MPlayer
//! process over its stdin/stdout streams.
//!
//! Architecture:
//! - `process.rs` - binary lookup and slave-mode spawning
//! - `supervisor.rs` - restart loop and crash-loop detection
//! - `command.rs` - outbound command lines and the send queue
//! - `parser.rs` - incremental scanner for the diagnostic output
//! - `status.rs` - canonical playback status and partial-update merging
//! - `pause.rs` - cadence-based play/pause inference
//! - `events.rs` - event types and the broadcast bus
//! - `client.rs` - high-level driver facade

mod client;
mod command;
mod events;
mod parser;
mod pause;
mod process;
mod status;
mod supervisor;

pub use client::{MPlayer, PlayerError};
pub use command::{Command, SeekMode};
pub use events::{EventBus, PlayerEvent};
pub use pause::PAUSE_DEBOUNCE;
pub use process::{find_mplayer, ProcessError};
pub use status::{PlaybackStatus, StatusUpdate};
pub use supervisor::CRASH_LOOP_WINDOW;
