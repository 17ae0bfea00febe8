use array_macro::array;
use serde::{Deserialize, Serialize};

use loopseq_midi::MidiMessage;

use crate::commands::PendingOp;
use crate::error::{KernelError, Result};
use crate::held_notes::NUM_PITCHES;

pub const TRACK_CAPACITY: usize = 128;
pub const TRACKS_PER_SEQUENCE: usize = 8;
pub const SEQUENCE_COUNT: usize = 4;
pub const MIN_SEQUENCE_LENGTH_BEATS: f64 = 0.25;

/// A raw MIDI message placed at a position, in beats, inside the loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Event {
  pub timestamp_beats: f64,
  pub status: u8,
  pub data1: u8,
  pub data2: u8,
  /// Tells apart events sharing the same timestamp.
  #[serde(default)]
  pub tag: u32,
}

impl Event {
  pub fn new(timestamp_beats: f64, status: u8, data1: u8, data2: u8, tag: u32) -> Self {
    Self {
      timestamp_beats,
      status,
      data1,
      data2,
      tag,
    }
  }

  pub fn from_message(timestamp_beats: f64, message: MidiMessage) -> Self {
    Self::new(
      timestamp_beats,
      message.status,
      message.data1,
      message.data2,
      0,
    )
  }

  #[must_use]
  pub fn with_tag(mut self, tag: u32) -> Self {
    self.tag = tag;
    self
  }

  pub fn message(&self) -> MidiMessage {
    MidiMessage::new(self.status, self.data1, self.data2)
  }
}

#[derive(Debug, Clone, Default)]
pub struct Track {
  events: heapless::Vec<Event, TRACK_CAPACITY>,
  gated: bool,
}

impl Track {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, event: Event) -> Result<()> {
    self
      .events
      .push(event)
      .map_err(|_| KernelError::CapacityExceeded(TRACK_CAPACITY))
  }

  /// Removes the first event stamped at `timestamp_beats`, keeping the order of the rest.
  pub fn remove(&mut self, timestamp_beats: f64) -> Option<Event> {
    let index = self
      .events
      .iter()
      .position(|event| event.timestamp_beats == timestamp_beats)?;
    Some(self.events.remove(index))
  }

  pub fn clear(&mut self) {
    self.events.clear();
  }

  pub fn len(&self) -> usize {
    self.events.len()
  }

  pub fn is_empty(&self) -> bool {
    self.events.is_empty()
  }

  pub fn is_full(&self) -> bool {
    self.events.is_full()
  }

  pub fn events(&self) -> &[Event] {
    &self.events
  }

  pub fn iter(&self) -> impl Iterator<Item = &Event> {
    self.events.iter()
  }

  /// Gated tracks only fire their note-ons while some note is held.
  pub fn is_gated(&self) -> bool {
    self.gated
  }

  pub fn set_gated(&mut self, gated: bool) {
    self.gated = gated;
  }
}

#[derive(Debug, Clone)]
pub struct Sequence {
  tracks: [Track; TRACKS_PER_SEQUENCE],
  length_beats: f64,
}

impl Sequence {
  pub fn new(length_beats: f64) -> Self {
    Self {
      tracks: array![_ => Track::new(); TRACKS_PER_SEQUENCE],
      length_beats,
    }
  }

  pub fn length_beats(&self) -> f64 {
    self.length_beats
  }

  pub fn tracks(&self) -> &[Track] {
    &self.tracks
  }

  pub fn track(&self, index: usize) -> Option<&Track> {
    self.tracks.get(index)
  }
}

/// All the sequences the kernel can play, and the one currently playing.
#[derive(Debug, Clone)]
pub struct SequenceBank {
  sequences: [Sequence; SEQUENCE_COUNT],
  current: usize,
}

impl SequenceBank {
  pub fn new(length_beats: f64) -> Self {
    Self {
      sequences: array![_ => Sequence::new(length_beats); SEQUENCE_COUNT],
      current: 0,
    }
  }

  pub fn current_index(&self) -> usize {
    self.current
  }

  pub fn current(&self) -> &Sequence {
    &self.sequences[self.current]
  }

  /// Out of range indices are ignored, the current sequence is left untouched.
  pub fn set_current(&mut self, index: usize) {
    if index < SEQUENCE_COUNT {
      self.current = index;
    }
  }

  pub fn sequence(&self, index: usize) -> Option<&Sequence> {
    self.sequences.get(index)
  }

  pub fn track(&self, sequence: usize, track: usize) -> Option<&Track> {
    self.sequence(sequence).and_then(|s| s.track(track))
  }

  /// Checks that `op` would apply cleanly, without applying it.
  pub fn check(&self, op: &PendingOp) -> Result<()> {
    match *op {
      PendingOp::Add {
        sequence,
        track,
        event,
      } => {
        let track = self.checked_track(sequence, track)?;
        if !event.timestamp_beats.is_finite() || event.timestamp_beats < 0.0 {
          Err(KernelError::InvalidTimestamp(event.timestamp_beats))
        } else if track.is_full() {
          Err(KernelError::CapacityExceeded(TRACK_CAPACITY))
        } else {
          Ok(())
        }
      }
      PendingOp::Delete {
        sequence, track, ..
      }
      | PendingOp::Clear { sequence, track }
      | PendingOp::SetGated {
        sequence, track, ..
      } => self.checked_track(sequence, track).map(|_| ()),
      PendingOp::SetLength { sequence, beats } => {
        self.checked_sequence(sequence)?;
        if beats.is_finite() && beats >= MIN_SEQUENCE_LENGTH_BEATS {
          Ok(())
        } else {
          Err(KernelError::InvalidLength(beats))
        }
      }
      PendingOp::Press { pitch, .. } | PendingOp::Release { pitch } => {
        if (pitch as usize) < NUM_PITCHES {
          Ok(())
        } else {
          Err(KernelError::PitchOutOfRange(pitch))
        }
      }
    }
  }

  /// Applies the sequence edits. Key presses and releases are accepted and ignored here.
  pub fn apply(&mut self, op: &PendingOp) -> Result<()> {
    self.check(op)?;
    match *op {
      PendingOp::Add {
        sequence,
        track,
        event,
      } => self.sequences[sequence].tracks[track].push(event),
      PendingOp::Delete {
        sequence,
        track,
        timestamp_beats,
      } => {
        self.sequences[sequence].tracks[track].remove(timestamp_beats);
        Ok(())
      }
      PendingOp::Clear { sequence, track } => {
        self.sequences[sequence].tracks[track].clear();
        Ok(())
      }
      PendingOp::SetLength { sequence, beats } => {
        self.sequences[sequence].length_beats = beats;
        Ok(())
      }
      PendingOp::SetGated {
        sequence,
        track,
        gated,
      } => {
        self.sequences[sequence].tracks[track].set_gated(gated);
        Ok(())
      }
      PendingOp::Press { .. } | PendingOp::Release { .. } => Ok(()),
    }
  }

  fn checked_sequence(&self, sequence: usize) -> Result<&Sequence> {
    self
      .sequences
      .get(sequence)
      .ok_or(KernelError::SequenceOutOfRange(sequence))
  }

  fn checked_track(&self, sequence: usize, track: usize) -> Result<&Track> {
    self
      .checked_sequence(sequence)?
      .tracks
      .get(track)
      .ok_or(KernelError::TrackOutOfRange(track))
  }
}

impl Default for SequenceBank {
  fn default() -> Self {
    Self::new(crate::config::KernelConfig::DEFAULT_SEQUENCE_LENGTH_BEATS)
  }
}
