use std::sync::Arc;

use log::{debug, info, warn};

use loopseq_time::Tempo;

use crate::commands::{CommandSender, PendingOp};
use crate::config::{EditFailurePolicy, KernelConfig};
use crate::data::{ChordPatternData, RhythmNote, TrackData};
use crate::error::{KernelError, Result};
use crate::held_notes::NUM_PITCHES;
use crate::pattern::{ActionKind, NoteAction};
use crate::shared::{SharedState, Stats};
use crate::track::{Event, SequenceBank, SEQUENCE_COUNT, TRACK_CAPACITY};

/// The control side of the kernel.
///
/// Scalar settings are published right away, sequence edits travel to the renderer
/// through the command queue. A copy of the sequences is kept here, updated with every
/// edit that made it into the queue, so reading them back never reaches into the
/// renderer.
pub struct Controller {
  commands: CommandSender,
  shared: Arc<SharedState>,
  mirror: Box<SequenceBank>,
  config: KernelConfig,
  dropped_edits: u64,
}

impl Controller {
  pub(crate) fn new(
    commands: CommandSender,
    shared: Arc<SharedState>,
    config: KernelConfig,
  ) -> Self {
    Self {
      commands,
      shared,
      mirror: Box::new(SequenceBank::new(config.initial_sequence_length())),
      config,
      dropped_edits: 0,
    }
  }

  pub fn config(&self) -> &KernelConfig {
    &self.config
  }

  pub fn set_tempo(&mut self, bpm: f64) -> Result<()> {
    let tempo = Tempo::new(bpm).ok_or(KernelError::InvalidTempo(bpm))?;
    debug!("Tempo set to {} bpm", bpm);
    self.shared.set_tempo(tempo);
    Ok(())
  }

  pub fn tempo(&self) -> f64 {
    self.shared.tempo().bpm()
  }

  /// Starting always restarts the loop from its beginning.
  pub fn set_playing(&mut self, playing: bool) {
    info!("Transport {}", if playing { "started" } else { "stopped" });
    self.shared.set_playing(playing);
  }

  pub fn is_playing(&self) -> bool {
    self.shared.is_playing()
  }

  /// When not repeating, keys go straight to the output instead of feeding the pattern.
  pub fn set_repeating(&mut self, repeating: bool) {
    debug!("Repeating {}", if repeating { "on" } else { "off" });
    self.shared.set_repeating(repeating);
  }

  pub fn is_repeating(&self) -> bool {
    self.shared.is_repeating()
  }

  /// The sequence starts playing at the next loop boundary.
  pub fn queue_sequence(&mut self, index: usize) -> Result<()> {
    check_sequence(index)?;
    debug!("Sequence {} queued", index);
    self.shared.queue_sequence(index, None);
    Ok(())
  }

  /// Queues `index`, and `follow` to be queued once `index` starts playing.
  pub fn queue_sequence_then(&mut self, index: usize, follow: usize) -> Result<()> {
    check_sequence(index)?;
    check_sequence(follow)?;
    debug!("Sequence {} queued, followed by {}", index, follow);
    self.shared.queue_sequence(index, Some(follow));
    Ok(())
  }

  pub fn current_sequence(&self) -> usize {
    self.shared.current_sequence()
  }

  pub fn queued_sequence(&self) -> usize {
    self.shared.queued_sequence()
  }

  /// Sequence to be queued once the queued one starts playing.
  pub fn follow_sequence(&self) -> Option<usize> {
    self.shared.follow_sequence()
  }

  /// Position inside the current loop, in beats, as of the last rendered block.
  pub fn playhead_position(&self) -> f64 {
    self.shared.playhead()
  }

  pub fn set_chord_pattern_note(
    &mut self,
    step: usize,
    slot: usize,
    degree: i32,
    kind: ActionKind,
  ) -> Result<()> {
    self
      .shared
      .chord_pattern
      .set(step, slot, NoteAction::new(degree, kind))
  }

  pub fn chord_pattern_note(&self, step: usize, slot: usize) -> Result<NoteAction> {
    self.shared.chord_pattern.get(step, slot)
  }

  /// Replaces the whole chord pattern.
  pub fn set_chord_pattern(&mut self, data: &ChordPatternData) -> Result<()> {
    data.write_to(&self.shared.chord_pattern)
  }

  pub fn chord_pattern(&self) -> ChordPatternData {
    ChordPatternData::from_pattern(&self.shared.chord_pattern)
  }

  pub fn add_event(&mut self, sequence: usize, track: usize, event: Event) -> Result<()> {
    self.send(PendingOp::Add {
      sequence,
      track,
      event,
    })
  }

  /// Removes the first event of the track stamped at `timestamp_beats`, if any.
  pub fn delete_event(&mut self, sequence: usize, track: usize, timestamp_beats: f64) -> Result<()> {
    self.send(PendingOp::Delete {
      sequence,
      track,
      timestamp_beats,
    })
  }

  /// Adds the note-on and note-off pair of a note. Either both are added or none.
  pub fn add_note(&mut self, sequence: usize, track: usize, note: &RhythmNote) -> Result<()> {
    let length_beats = self.sequence_length(sequence)?;
    let events = note.events(length_beats);
    let ops = [
      PendingOp::Add {
        sequence,
        track,
        event: events[0],
      },
      PendingOp::Add {
        sequence,
        track,
        event: events[1],
      },
    ];
    self.send_all(&ops, 2)
  }

  pub fn remove_note(&mut self, sequence: usize, track: usize, note: &RhythmNote) -> Result<()> {
    let length_beats = self.sequence_length(sequence)?;
    let events = note.events(length_beats);
    let ops = [
      PendingOp::Delete {
        sequence,
        track,
        timestamp_beats: events[0].timestamp_beats,
      },
      PendingOp::Delete {
        sequence,
        track,
        timestamp_beats: events[1].timestamp_beats,
      },
    ];
    self.send_all(&ops, 0)
  }

  pub fn clear_track(&mut self, sequence: usize, track: usize) -> Result<()> {
    self.send(PendingOp::Clear { sequence, track })
  }

  /// Sets how many beats a pass through the sequence lasts. A playing sequence picks it up
  /// right away.
  pub fn set_sequence_length(&mut self, sequence: usize, beats: f64) -> Result<()> {
    self.send(PendingOp::SetLength { sequence, beats })
  }

  pub fn sequence_length(&self, sequence: usize) -> Result<f64> {
    self
      .mirror
      .sequence(sequence)
      .map(|s| s.length_beats())
      .ok_or(KernelError::SequenceOutOfRange(sequence))
  }

  pub fn set_track_gated(&mut self, sequence: usize, track: usize, gated: bool) -> Result<()> {
    self.send(PendingOp::SetGated {
      sequence,
      track,
      gated,
    })
  }

  /// Replaces a whole track. Nothing is sent unless the queue has room for all of it.
  pub fn set_track(&mut self, data: &TrackData) -> Result<()> {
    let (sequence, track) = (data.sequence, data.track);
    if data.events.len() > TRACK_CAPACITY {
      return self.edit_failed(KernelError::CapacityExceeded(TRACK_CAPACITY));
    }
    self.mirror.check(&PendingOp::Clear { sequence, track })?;
    for event in data.events.iter() {
      if !event.timestamp_beats.is_finite() || event.timestamp_beats < 0.0 {
        return Err(KernelError::InvalidTimestamp(event.timestamp_beats));
      }
    }
    if self.commands.remaining() < data.events.len() + 2 {
      return self.edit_failed(KernelError::QueueFull);
    }

    self.send(PendingOp::Clear { sequence, track })?;
    self.send(PendingOp::SetGated {
      sequence,
      track,
      gated: data.gated,
    })?;
    for event in data.events.iter() {
      self.send(PendingOp::Add {
        sequence,
        track,
        event: *event,
      })?;
    }
    Ok(())
  }

  pub fn track(&self, sequence: usize, track: usize) -> Result<TrackData> {
    let sequence_data = self
      .mirror
      .sequence(sequence)
      .ok_or(KernelError::SequenceOutOfRange(sequence))?;
    let track_data = sequence_data
      .track(track)
      .ok_or(KernelError::TrackOutOfRange(track))?;
    Ok(TrackData::from_track(sequence, track, track_data))
  }

  pub fn press_note(&mut self, pitch: u8, velocity: u8) -> Result<()> {
    check_pitch(pitch)?;
    self.send(PendingOp::Press { pitch, velocity })
  }

  pub fn release_note(&mut self, pitch: u8) -> Result<()> {
    check_pitch(pitch)?;
    self.send(PendingOp::Release { pitch })
  }

  pub fn stats(&self) -> Stats {
    self.shared.stats(self.dropped_edits)
  }

  fn send(&mut self, op: PendingOp) -> Result<()> {
    match self.mirror.check(&op) {
      Ok(()) => {}
      Err(err @ KernelError::CapacityExceeded(_)) => return self.edit_failed(err),
      Err(err) => return Err(err),
    }
    if !self.commands.push(op) {
      return self.edit_failed(KernelError::QueueFull);
    }
    self.mirror.apply(&op)
  }

  /// Sends a group of edits that must not be split, `added` of them adding events.
  fn send_all(&mut self, ops: &[PendingOp], added: usize) -> Result<()> {
    for op in ops.iter() {
      match self.mirror.check(op) {
        Ok(()) | Err(KernelError::CapacityExceeded(_)) => {}
        Err(err) => return Err(err),
      }
    }
    if let Some(PendingOp::Add {
      sequence, track, ..
    }) = ops.first()
    {
      let len = self.mirror.track(*sequence, *track).map_or(0, |t| t.len());
      if len + added > TRACK_CAPACITY {
        return self.edit_failed(KernelError::CapacityExceeded(TRACK_CAPACITY));
      }
    }
    if self.commands.remaining() < ops.len() {
      return self.edit_failed(KernelError::QueueFull);
    }
    for op in ops.iter() {
      self.send(*op)?;
    }
    Ok(())
  }

  fn edit_failed(&mut self, err: KernelError) -> Result<()> {
    self.dropped_edits += 1;
    match self.config.edit_failure_policy {
      EditFailurePolicy::Silent => {
        warn!("Edit dropped: {}", err);
        Ok(())
      }
      EditFailurePolicy::Report => Err(err),
    }
  }
}

fn check_sequence(index: usize) -> Result<()> {
  if index < SEQUENCE_COUNT {
    Ok(())
  } else {
    Err(KernelError::SequenceOutOfRange(index))
  }
}

fn check_pitch(pitch: u8) -> Result<()> {
  if (pitch as usize) < NUM_PITCHES {
    Ok(())
  } else {
    Err(KernelError::PitchOutOfRange(pitch))
  }
}
