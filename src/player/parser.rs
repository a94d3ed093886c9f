//! Incremental scanner for MPlayer's slave-mode diagnostic output.
//!
//! The output is freeform text with no framing beyond line breaks, and the
//! child's buffering may split a message across read chunks. Chunks are
//! therefore accumulated into complete lines first, and each line is checked
//! against the fixed pattern set in order. Patterns are independent: every
//! match on a line fires its effect.

use std::sync::Arc;

use super::command::{Command, CommandSender};
use super::events::{EventBus, PlayerEvent};
use super::status::{StatusAggregator, StatusUpdate};

/// Splits raw output chunks into complete lines.
///
/// MPlayer ends ordinary messages with `\n` but rewrites its status line in
/// place with a bare `\r`, so both count as terminators. A partial tail is
/// buffered until the next chunk completes it.
#[derive(Debug, Default)]
pub struct LineScanner {
  buffer: String,
}

impl LineScanner {
  /// Append a chunk and drain every line it completed.
  pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
    // The diagnostic stream is ASCII in practice; lossy decoding only
    // matters for filenames, where a replacement char beats a stall.
    self.buffer.push_str(&String::from_utf8_lossy(chunk));

    let mut lines = Vec::new();
    while let Some(pos) = self.buffer.find(['\n', '\r']) {
      let line: String = self.buffer.drain(..=pos).collect();
      let line = line.trim_end_matches(['\n', '\r']);
      if !line.is_empty() {
        lines.push(line.to_string());
      }
    }
    lines
  }
}

/// Answers to the three-command status query burst, collected across lines.
///
/// MPlayer replies to `get_time_length`, `get_vo_fullscreen` and
/// `get_sub_visibility` on separate lines in no guaranteed order, so the
/// answers are held here until all three have arrived. The buffer is cleared
/// on every status reset, which bounds how long a half-answered burst lives.
#[derive(Debug, Default)]
struct PendingAnswers {
  duration: Option<f64>,
  fullscreen: Option<bool>,
  subtitles_visible: Option<bool>,
}

impl PendingAnswers {
  fn complete(&self) -> bool {
    self.duration.is_some() && self.fullscreen.is_some() && self.subtitles_visible.is_some()
  }

  fn clear(&mut self) {
    *self = Self::default();
  }
}

/// Classifies diagnostic output and drives the status aggregator, the event
/// bus and the status-query burst.
pub struct OutputParser {
  scanner: LineScanner,
  answers: PendingAnswers,
  status: Arc<StatusAggregator>,
  bus: EventBus,
  commands: CommandSender,
}

impl OutputParser {
  pub fn new(status: Arc<StatusAggregator>, bus: EventBus, commands: CommandSender) -> Self {
    Self {
      scanner: LineScanner::default(),
      answers: PendingAnswers::default(),
      status,
      bus,
      commands,
    }
  }

  /// Feed one raw stdout chunk.
  pub fn handle_chunk(&mut self, chunk: &[u8]) {
    for line in self.scanner.push(chunk) {
      self.handle_line(&line);
    }
  }

  fn handle_line(&mut self, line: &str) {
    log::trace!("stdout: {}", line);

    if line.starts_with("MPlayer") {
      self.bus.emit(PlayerEvent::Ready);
      self.reset_status();
    }

    if line.contains("StreamTitle") {
      if let Some(title) = capture_between(line, "StreamTitle='", "'") {
        self.status.merge(StatusUpdate {
          title: Some(title.to_string()),
          ..Default::default()
        });
      }
    }

    if let Some(idx) = line.find("Playing ") {
      if let Some(filename) = playing_filename(&line[idx + "Playing ".len()..]) {
        let filename = filename.to_string();
        self.reset_status();
        self.status.merge(StatusUpdate {
          filename: Some(filename),
          ..Default::default()
        });
        self.query_status();
      }
    }

    if line.contains("Starting playback...") {
      self.bus.emit(PlayerEvent::PlayStart);
    }

    if line.contains("EOF code:") {
      self.bus.emit(PlayerEvent::PlayStop(eof_code(line)));
      self.reset_status();
    }

    if line.starts_with("A:") {
      if let Some(time) = elapsed_time(line) {
        self.bus.emit(PlayerEvent::TimeChange(time.to_string()));
      }
    }

    self.collect_answer(line);
  }

  fn reset_status(&mut self) {
    self.answers.clear();
    self.status.reset();
  }

  /// Ask for duration, fullscreen and subtitle visibility after a file opens.
  fn query_status(&self) {
    self.commands.send(Command::get_time_length());
    self.commands.send(Command::get_vo_fullscreen());
    self.commands.send(Command::get_sub_visibility());
  }

  fn collect_answer(&mut self, line: &str) {
    if let Some(value) = capture_value(line, "ANS_LENGTH=") {
      if let Ok(duration) = value.parse::<f64>() {
        self.answers.duration = Some(duration);
      }
    }
    if let Some(value) = capture_value(line, "ANS_VO_FULLSCREEN=") {
      if let Some(flag) = parse_flag(value) {
        self.answers.fullscreen = Some(flag);
      }
    }
    if let Some(value) = capture_value(line, "ANS_SUB_VISIBILITY=") {
      if let Some(flag) = parse_flag(value) {
        self.answers.subtitles_visible = Some(flag);
      }
    }

    if self.answers.complete() {
      self.status.merge(StatusUpdate {
        duration: self.answers.duration,
        fullscreen: self.answers.fullscreen,
        subtitles_visible: self.answers.subtitles_visible,
        ..Default::default()
      });
      self.answers.clear();
    }
  }
}

/// Text between `start` and the next occurrence of `end` after it.
fn capture_between<'a>(line: &'a str, start: &str, end: &str) -> Option<&'a str> {
  let from = line.find(start)? + start.len();
  let len = line[from..].find(end)?;
  Some(&line[from..from + len])
}

/// Value token following `tag`, up to the next whitespace.
fn capture_value<'a>(line: &'a str, tag: &str) -> Option<&'a str> {
  let from = line.find(tag)? + tag.len();
  let rest = &line[from..];
  let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
  let value = &rest[..end];
  (!value.is_empty()).then_some(value)
}

fn parse_flag(value: &str) -> Option<bool> {
  match value {
    "1" => Some(true),
    "0" => Some(false),
    _ => None,
  }
}

/// Filename from the text after `"Playing "`: everything up to the `". "`
/// separator, or up to a trailing `.` when the message ends the line.
fn playing_filename(rest: &str) -> Option<&str> {
  if let Some(end) = rest.find(". ") {
    return Some(&rest[..end]);
  }
  rest.strip_suffix('.')
}

/// Exit code from an `EOF code:` message: the two characters after the tag,
/// trimmed. An unparseable code degrades to `None`, not an error.
fn eof_code(line: &str) -> Option<i32> {
  let from = line.find("code:")? + "code:".len();
  let code = line.get(from..from + 2).or_else(|| line.get(from..))?;
  code.trim().parse().ok()
}

/// Elapsed time from an `A:` status line. Audio+video lines carry it after
/// the ` V:` marker, audio-only lines directly after `A:`.
fn elapsed_time(line: &str) -> Option<&str> {
  let (from, end_marker) = match line.find(" V:") {
    Some(idx) => (idx + " V:".len(), " A-V:"),
    None => ("A:".len(), " ("),
  };
  let rest = line.get(from..)?;
  let end = rest.find(end_marker)?;
  Some(rest[..end].trim())
}

#[cfg(test)]
mod tests {
  use super::*;
  use tokio::sync::broadcast::Receiver;

  use crate::player::command::command_queue;
  use crate::player::status::PlaybackStatus;

  struct Fixture {
    parser: OutputParser,
    events: Receiver<PlayerEvent>,
    commands: async_channel::Receiver<Command>,
    status: Arc<StatusAggregator>,
  }

  fn fixture() -> Fixture {
    let bus = EventBus::new();
    let events = bus.subscribe();
    let status = Arc::new(StatusAggregator::new(bus.clone()));
    let (tx, commands) = command_queue();
    Fixture {
      parser: OutputParser::new(status.clone(), bus, tx),
      events,
      commands,
      status,
    }
  }

  fn drain(events: &mut Receiver<PlayerEvent>) -> Vec<PlayerEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
      out.push(event);
    }
    out
  }

  #[test]
  fn test_scanner_buffers_partial_lines() {
    let mut scanner = LineScanner::default();
    assert!(scanner.push(b"Starting ").is_empty());
    assert_eq!(scanner.push(b"playback...\n"), vec!["Starting playback..."]);
  }

  #[test]
  fn test_scanner_splits_on_carriage_return() {
    let mut scanner = LineScanner::default();
    let lines = scanner.push(b"A:   4.1 (04.0) of 180.0 (03:00.0)  0.3%\rA:   4.2 (");
    assert_eq!(lines, vec!["A:   4.1 (04.0) of 180.0 (03:00.0)  0.3%"]);
  }

  #[test]
  fn test_banner_emits_ready_and_resets() {
    let mut f = fixture();
    f.parser.handle_chunk(b"MPlayer 1.5 (Debian), built with gcc\n");

    let events = drain(&mut f.events);
    assert_eq!(events[0], PlayerEvent::Ready);
    assert_eq!(events[1], PlayerEvent::StatusChange(PlaybackStatus::default()));
  }

  #[test]
  fn test_stream_title_merges_into_status() {
    let mut f = fixture();
    f.parser.handle_chunk(b"ICY Info: StreamTitle='Artist - Song';StreamUrl='';\n");

    assert_eq!(f.status.snapshot().title.as_deref(), Some("Artist - Song"));
  }

  #[test]
  fn test_stream_title_without_capture_is_skipped() {
    let mut f = fixture();
    f.parser.handle_chunk(b"ICY Info: StreamTitle=broken\n");

    assert_eq!(f.status.snapshot().title, None);
    assert!(drain(&mut f.events).is_empty());
  }

  #[test]
  fn test_playing_resets_merges_filename_and_queries_status() {
    let mut f = fixture();
    f.parser.handle_chunk(b"Playing movie.mkv. \n");

    let events = drain(&mut f.events);
    assert_eq!(events[0], PlayerEvent::StatusChange(PlaybackStatus::default()));
    match &events[1] {
      PlayerEvent::StatusChange(s) => assert_eq!(s.filename.as_deref(), Some("movie.mkv")),
      other => panic!("expected StatusChange, got {:?}", other),
    }

    assert_eq!(f.commands.try_recv().unwrap(), Command::get_time_length());
    assert_eq!(f.commands.try_recv().unwrap(), Command::get_vo_fullscreen());
    assert_eq!(f.commands.try_recv().unwrap(), Command::get_sub_visibility());
    assert!(f.commands.try_recv().is_err());
  }

  #[test]
  fn test_playing_at_end_of_line_without_trailing_space() {
    let mut f = fixture();
    f.parser.handle_chunk(b"Playing /music/song.flac.\n");

    assert_eq!(f.status.snapshot().filename.as_deref(), Some("/music/song.flac"));
  }

  #[test]
  fn test_playing_split_across_chunks() {
    let mut f = fixture();
    f.parser.handle_chunk(b"Play");
    f.parser.handle_chunk(b"ing movie.mkv.\nStarting playback...\n");

    assert_eq!(f.status.snapshot().filename.as_deref(), Some("movie.mkv"));
    assert!(drain(&mut f.events).contains(&PlayerEvent::PlayStart));
  }

  #[test]
  fn test_starting_playback_emits_playstart() {
    let mut f = fixture();
    f.parser.handle_chunk(b"Starting playback...\n");

    assert_eq!(drain(&mut f.events), vec![PlayerEvent::PlayStart]);
  }

  #[test]
  fn test_eof_emits_playstop_with_code_and_resets() {
    let mut f = fixture();
    f.parser.handle_chunk(b"Playing movie.mkv.\n");
    drain(&mut f.events);

    f.parser.handle_chunk(b"EOF code: 0 \n");

    let events = drain(&mut f.events);
    assert_eq!(events[0], PlayerEvent::PlayStop(Some(0)));
    assert_eq!(events[1], PlayerEvent::StatusChange(PlaybackStatus::default()));
    assert_eq!(f.status.snapshot(), PlaybackStatus::default());
  }

  #[test]
  fn test_eof_with_unparseable_code_degrades_to_none() {
    let mut f = fixture();
    f.parser.handle_chunk(b"EOF code: ??\n");

    assert_eq!(drain(&mut f.events)[0], PlayerEvent::PlayStop(None));
  }

  #[test]
  fn test_audio_video_time_line() {
    let mut f = fixture();
    f.parser.handle_chunk(b"A:  12.3 V:  12.3 A-V:  0.000 ct:  0.040\r");

    assert_eq!(
      drain(&mut f.events),
      vec![PlayerEvent::TimeChange("12.3".to_string())]
    );
  }

  #[test]
  fn test_audio_only_time_line() {
    let mut f = fixture();
    f.parser.handle_chunk(b"A:   4.1 (04.0) of 180.0 (03:00.0)  0.3%\r");

    assert_eq!(
      drain(&mut f.events),
      vec![PlayerEvent::TimeChange("4.1".to_string())]
    );
  }

  #[test]
  fn test_time_line_missing_end_marker_is_skipped() {
    let mut f = fixture();
    f.parser.handle_chunk(b"A:   4.1\n");

    assert!(drain(&mut f.events).is_empty());
  }

  #[test]
  fn test_answer_burst_in_one_line() {
    let mut f = fixture();
    f.parser
      .handle_chunk(b"ANS_LENGTH=120.5 ANS_VO_FULLSCREEN=1 ANS_SUB_VISIBILITY=0\n");

    let status = f.status.snapshot();
    assert_eq!(status.duration, 120.5);
    assert!(status.fullscreen);
    assert!(!status.subtitles_visible);
  }

  #[test]
  fn test_answer_burst_across_lines() {
    let mut f = fixture();
    f.parser.handle_chunk(b"ANS_LENGTH=120.5\n");
    f.parser.handle_chunk(b"ANS_VO_FULLSCREEN=1\n");
    assert!(drain(&mut f.events).is_empty());

    f.parser.handle_chunk(b"ANS_SUB_VISIBILITY=0\n");

    let status = f.status.snapshot();
    assert_eq!(status.duration, 120.5);
    assert!(status.fullscreen);
    assert!(!status.subtitles_visible);
  }

  #[test]
  fn test_half_answered_burst_cleared_on_reset() {
    let mut f = fixture();
    f.parser.handle_chunk(b"ANS_LENGTH=120.5\n");
    f.parser.handle_chunk(b"Playing next.mkv.\n");
    drain(&mut f.events);

    f.parser.handle_chunk(b"ANS_VO_FULLSCREEN=0\n");
    f.parser.handle_chunk(b"ANS_SUB_VISIBILITY=0\n");

    // The stale duration from before the reset must not complete the burst
    assert_eq!(f.status.snapshot().duration, 0.0);

    f.parser.handle_chunk(b"ANS_LENGTH=60.0\n");
    assert_eq!(f.status.snapshot().duration, 60.0);
  }

  #[test]
  fn test_multiple_patterns_in_one_chunk_fire_in_order() {
    let mut f = fixture();
    f.parser.handle_chunk(b"Playing movie.mkv.\nStarting playback...\n");

    let events = drain(&mut f.events);
    let start_pos = events.iter().position(|e| *e == PlayerEvent::PlayStart);
    let status_pos = events
      .iter()
      .position(|e| matches!(e, PlayerEvent::StatusChange(_)));
    assert!(status_pos.unwrap() < start_pos.unwrap());
  }
}
