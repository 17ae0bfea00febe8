//! Plain structures for moving tracks and chord patterns in and out of the kernel.

use serde::{Deserialize, Serialize};

use loopseq_midi::MidiMessage;

use crate::error::{KernelError, Result};
use crate::pattern::{ActionKind, ChordPattern, NoteAction, NOTES_PER_STEP, PATTERN_STEPS};
use crate::track::{Event, Track};

/// Contents of one track of one sequence.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrackData {
  pub sequence: usize,
  pub track: usize,
  #[serde(default)]
  pub gated: bool,
  #[serde(default)]
  pub events: Vec<Event>,
}

impl TrackData {
  pub fn new(sequence: usize, track: usize) -> Self {
    Self {
      sequence,
      track,
      ..Self::default()
    }
  }

  pub fn from_track(sequence: usize, index: usize, track: &Track) -> Self {
    Self {
      sequence,
      track: index,
      gated: track.is_gated(),
      events: track.events().to_vec(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteData {
  /// Scale degree, counted over the held keys.
  pub note: i32,
  #[serde(rename = "type")]
  pub kind: i32,
}

impl From<NoteAction> for NoteData {
  fn from(action: NoteAction) -> Self {
    Self {
      note: action.degree,
      kind: action.kind.code(),
    }
  }
}

impl From<NoteData> for NoteAction {
  fn from(data: NoteData) -> Self {
    NoteAction::new(data.note, ActionKind::from_code(data.kind))
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StepData {
  #[serde(default)]
  pub notes: Vec<NoteData>,
}

/// A whole chord pattern. Cells missing at the end of a step, or steps missing at the end
/// of the pattern, are empty.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChordPatternData {
  #[serde(default)]
  pub steps: Vec<StepData>,
}

impl ChordPatternData {
  /// Every cell of the pattern, empty ones included.
  pub fn from_pattern(pattern: &ChordPattern) -> Self {
    let steps = (0..PATTERN_STEPS)
      .map(|step| StepData {
        notes: pattern
          .step(step)
          .iter()
          .map(|action| NoteData::from(*action))
          .collect(),
      })
      .collect();
    Self { steps }
  }

  /// Checks the shape, then overwrites every cell of `pattern`.
  pub fn write_to(&self, pattern: &ChordPattern) -> Result<()> {
    if self.steps.len() > PATTERN_STEPS {
      return Err(KernelError::StepOutOfRange(self.steps.len() - 1));
    }
    if let Some(step) = self.steps.iter().find(|step| step.notes.len() > NOTES_PER_STEP) {
      return Err(KernelError::SlotOutOfRange(step.notes.len() - 1));
    }

    for step in 0..PATTERN_STEPS {
      let notes = self.steps.get(step).map(|s| s.notes.as_slice()).unwrap_or(&[]);
      for slot in 0..NOTES_PER_STEP {
        let action = notes
          .get(slot)
          .map(|note| NoteAction::from(*note))
          .unwrap_or(NoteAction::EMPTY);
        pattern.set(step, slot, action)?;
      }
    }
    Ok(())
  }
}

/// A note lasting `duration_beats`, stored as a note-on and a note-off event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RhythmNote {
  pub timestamp_beats: f64,
  pub duration_beats: f64,
  pub pitch: u8,
  pub velocity: u8,
  #[serde(default)]
  pub channel: u8,
}

impl RhythmNote {
  pub fn new(timestamp_beats: f64, duration_beats: f64, pitch: u8, velocity: u8) -> Self {
    Self {
      timestamp_beats,
      duration_beats,
      pitch,
      velocity,
      channel: 0,
    }
  }

  #[must_use]
  pub fn with_channel(mut self, channel: u8) -> Self {
    self.channel = channel;
    self
  }

  /// The note-on and note-off events, the note-off wrapped into a loop of `length_beats`.
  pub fn events(&self, length_beats: f64) -> [Event; 2] {
    let off_beats = (self.timestamp_beats + self.duration_beats).rem_euclid(length_beats);
    [
      Event::from_message(
        self.timestamp_beats,
        MidiMessage::note_on(self.channel, self.pitch, self.velocity),
      ),
      Event::from_message(off_beats, MidiMessage::note_off(self.channel, self.pitch)),
    ]
  }
}
