use loopseq_midi::MidiMessage;
use loopseq_time::{LoopSegment, LoopTiming, SampleTime};

use crate::active_notes::ActiveNoteTable;
use crate::held_notes::HeldNotes;
use crate::output::BlockOutput;
use crate::pattern::{ActionKind, ChordPattern, NoteAction, PATTERN_STEPS};

/// Plays the chord pattern against the keys being held.
///
/// Every note-on takes a slot in the active note table and every slot is freed by
/// emitting its note-off, so notes are never left hanging.
#[derive(Debug, Clone)]
pub(crate) struct ChordPlayer {
  channel: u8,
  velocity: u8,
  sustain_window: SampleTime,
}

impl ChordPlayer {
  pub fn new(channel: u8, velocity: u8, sustain_window_samples: u32) -> Self {
    Self {
      channel,
      velocity,
      sustain_window: sustain_window_samples as SampleTime,
    }
  }

  /// Fires the pattern steps starting inside `segment`. Returns the notes skipped for
  /// lack of a free slot.
  pub fn play_segment(
    &self,
    pattern: &ChordPattern,
    timing: &LoopTiming,
    segment: &LoopSegment,
    held: &HeldNotes,
    notes: &mut ActiveNoteTable,
    output: &mut BlockOutput,
  ) -> u64 {
    let mut skipped = 0;
    for step in 0..PATTERN_STEPS {
      let position = timing.step_position(step, PATTERN_STEPS);
      if segment.contains(position) {
        let offset = segment.block_offset(position);
        skipped += self.fire_step(&pattern.step(step), offset, held, notes, output);
      }
    }
    skipped
  }

  /// Ends the notes whose sustain window runs out before `before`.
  pub fn expire(&self, notes: &mut ActiveNoteTable, output: &mut BlockOutput, before: SampleTime) {
    let channel = self.channel;
    notes.release_matching(
      |slot| slot.release_at.map_or(false, |at| at < before),
      |slot| {
        let at = slot.release_at.unwrap_or(before);
        output.emit_at_time(at, MidiMessage::note_off(channel, slot.output_pitch));
      },
    );
  }

  /// Ends the notes whose key was let go.
  pub fn release_unheld(
    &self,
    held: &HeldNotes,
    notes: &mut ActiveNoteTable,
    output: &mut BlockOutput,
  ) {
    let channel = self.channel;
    notes.release_matching(
      |slot| !held.is_held(slot.source_pitch),
      |slot| output.emit_now(MidiMessage::note_off(channel, slot.output_pitch)),
    );
  }

  /// Called when the host sample time went backwards, so no note outlives a sustain
  /// window measured from the new block start.
  pub fn rebase(&self, notes: &mut ActiveNoteTable, block_start: SampleTime) {
    notes.limit_releases(block_start + self.sustain_window);
  }

  pub fn release_all(&self, notes: &mut ActiveNoteTable, output: &mut BlockOutput) {
    let channel = self.channel;
    notes.release_matching(
      |_| true,
      |slot| output.emit_now(MidiMessage::note_off(channel, slot.output_pitch)),
    );
  }

  fn fire_step(
    &self,
    actions: &[NoteAction],
    offset: f64,
    held: &HeldNotes,
    notes: &mut ActiveNoteTable,
    output: &mut BlockOutput,
  ) -> u64 {
    let sample_time = output.sample_time_at(offset);
    self.expire(notes, output, sample_time + 1);

    let mut skipped = 0;
    for action in actions.iter() {
      match action.kind {
        ActionKind::Play => {
          if let Some(pitch) = resolve(held, action.degree) {
            if let Some(index) = notes.find_output(pitch) {
              notes.release(index);
              output.emit_at(offset, MidiMessage::note_off(self.channel, pitch));
            }
            let release_at = Some(sample_time + self.sustain_window);
            if notes.allocate(pitch, pitch, release_at).is_some() {
              output.emit_at(offset, MidiMessage::note_on(self.channel, pitch, self.velocity));
            } else {
              skipped += 1;
            }
          }
        }
        ActionKind::Kill => {
          if let Some(index) = resolve(held, action.degree).and_then(|p| notes.find_source(p)) {
            if let Some(slot) = notes.release(index) {
              output.emit_at(offset, MidiMessage::note_off(self.channel, slot.output_pitch));
            }
          }
        }
        ActionKind::Sustain | ActionKind::Reserved(_) => {}
      }
    }
    skipped
  }
}

/// Held key for a scale degree, counting the held keys from the lowest one.
fn resolve(held: &HeldNotes, degree: i32) -> Option<u8> {
  usize::try_from(degree)
    .ok()
    .and_then(|degree| held.nth_held(degree))
}

#[cfg(test)]
mod tests {
  use loopseq_midi::MidiEvent;
  use loopseq_time::{BlockCursor, Tempo};

  use super::*;
  use crate::active_notes::ACTIVE_NOTE_SLOTS;
  use crate::pattern::NOTES_PER_STEP;

  const SUSTAIN: u32 = 1000;

  struct Fixture {
    player: ChordPlayer,
    pattern: ChordPattern,
    timing: LoopTiming,
    held: HeldNotes,
    notes: ActiveNoteTable,
    output: BlockOutput,
    skipped: u64,
  }

  impl Fixture {
    fn new(held: &[u8]) -> Self {
      let mut notes = HeldNotes::new();
      for pitch in held.iter().cloned() {
        notes.press(pitch);
      }
      Self {
        player: ChordPlayer::new(0, 100, SUSTAIN),
        pattern: ChordPattern::new(),
        // 16 steps of 5512.5 samples
        timing: LoopTiming::new(4.0, Tempo::default(), 44_100),
        held: notes,
        notes: ActiveNoteTable::new(),
        output: BlockOutput::new(),
        skipped: 0,
      }
    }

    fn render(&mut self, position: f64, num_frames: usize) -> Vec<(SampleTime, MidiMessage)> {
      let block_start = position as SampleTime;
      self.output.begin(block_start, num_frames);
      self
        .player
        .release_unheld(&self.held, &mut self.notes, &mut self.output);
      let mut cursor = BlockCursor::new(position, num_frames);
      while let Some(segment) = cursor.next_segment(self.timing.length_samples()) {
        self.skipped += self.player.play_segment(
          &self.pattern,
          &self.timing,
          &segment,
          &self.held,
          &mut self.notes,
          &mut self.output,
        );
      }
      let block_end = block_start + num_frames as SampleTime;
      self
        .player
        .expire(&mut self.notes, &mut self.output, block_end);
      let mut sink = heapless::Vec::<MidiEvent, 64>::new();
      self.output.flush(&mut sink);
      sink.iter().map(|e| (e.sample_time, e.message)).collect()
    }
  }

  #[test]
  fn play_resolves_the_nth_held_key() {
    let mut fixture = Fixture::new(&[67, 60, 64]);
    fixture.pattern.set(0, 0, NoteAction::play(1)).unwrap();
    let events = fixture.render(0.0, 256);
    assert_eq!(events, vec![(0, MidiMessage::note_on(0, 64, 100))]);
    assert_eq!(fixture.notes.len(), 1);
  }

  #[test]
  fn unresolved_degrees_emit_nothing() {
    let mut fixture = Fixture::new(&[60, 64]);
    fixture.pattern.set(0, 0, NoteAction::play(2)).unwrap();
    fixture.pattern.set(0, 1, NoteAction::play(-1)).unwrap();
    fixture.pattern.set(0, 2, NoteAction::kill(5)).unwrap();
    assert!(fixture.render(0.0, 256).is_empty());
    assert!(fixture.notes.is_empty());
  }

  #[test]
  fn sustain_window_ends_the_note() {
    let mut fixture = Fixture::new(&[60]);
    fixture.pattern.set(1, 0, NoteAction::play(0)).unwrap();
    // step 1 starts at 5512.5
    let events = fixture.render(5_000.0, 1024);
    assert_eq!(events, vec![(5_512, MidiMessage::note_on(0, 60, 100))]);
    let events = fixture.render(6_024.0, 1024);
    assert_eq!(events, vec![(6_512, MidiMessage::note_off(0, 60))]);
    assert!(fixture.notes.is_empty());
  }

  #[test]
  fn kill_ends_the_note_of_the_same_key() {
    let mut fixture = Fixture::new(&[60, 64]);
    fixture.player = ChordPlayer::new(0, 100, 100_000);
    fixture.pattern.set(0, 0, NoteAction::play(1)).unwrap();
    fixture.pattern.set(1, 0, NoteAction::sustain(1)).unwrap();
    fixture.pattern.set(2, 0, NoteAction::kill(1)).unwrap();
    let events = fixture.render(0.0, 12_000);
    assert_eq!(
      events,
      vec![
        (0, MidiMessage::note_on(0, 64, 100)),
        (11_025, MidiMessage::note_off(0, 64)),
      ]
    );
  }

  #[test]
  fn releasing_the_key_ends_the_note() {
    let mut fixture = Fixture::new(&[60]);
    fixture.player = ChordPlayer::new(0, 100, 100_000);
    fixture.pattern.set(0, 0, NoteAction::play(0)).unwrap();
    fixture.render(0.0, 128);
    fixture.held.release(60);
    let events = fixture.render(128.0, 128);
    assert_eq!(events, vec![(128, MidiMessage::note_off(0, 60))]);
    assert!(fixture.notes.is_empty());
  }

  #[test]
  fn retrigger_ends_the_sounding_note_first() {
    let mut fixture = Fixture::new(&[60]);
    fixture.player = ChordPlayer::new(0, 100, 100_000);
    fixture.pattern.set(0, 0, NoteAction::play(0)).unwrap();
    fixture.pattern.set(1, 0, NoteAction::play(0)).unwrap();
    let events = fixture.render(0.0, 6_000);
    assert_eq!(
      events,
      vec![
        (0, MidiMessage::note_on(0, 60, 100)),
        (5_512, MidiMessage::note_off(0, 60)),
        (5_512, MidiMessage::note_on(0, 60, 100)),
      ]
    );
    assert_eq!(fixture.notes.len(), 1);
  }

  #[test]
  fn full_table_skips_notes() {
    let held: Vec<u8> = (40..40 + ACTIVE_NOTE_SLOTS as u8 + 2).collect();
    let mut fixture = Fixture::new(&held);
    fixture.player = ChordPlayer::new(0, 100, 100_000);
    for slot in 0..NOTES_PER_STEP {
      fixture.pattern.set(0, slot, NoteAction::play(slot as i32)).unwrap();
      fixture
        .pattern
        .set(1, slot, NoteAction::play((NOTES_PER_STEP + slot) as i32))
        .unwrap();
      fixture
        .pattern
        .set(2, slot, NoteAction::play((2 * NOTES_PER_STEP + slot) as i32))
        .unwrap();
    }
    let events = fixture.render(0.0, 12_000);
    assert_eq!(events.len(), ACTIVE_NOTE_SLOTS);
    assert_eq!(fixture.skipped, 2);
  }

  #[test]
  fn release_all_empties_the_table() {
    let mut fixture = Fixture::new(&[60, 64]);
    fixture.player = ChordPlayer::new(2, 100, 100_000);
    fixture.pattern.set(0, 0, NoteAction::play(0)).unwrap();
    fixture.pattern.set(0, 1, NoteAction::play(1)).unwrap();
    fixture.render(0.0, 64);

    fixture.output.begin(64, 64);
    fixture
      .player
      .release_all(&mut fixture.notes, &mut fixture.output);
    let mut sink = heapless::Vec::<MidiEvent, 4>::new();
    fixture.output.flush(&mut sink);
    assert_eq!(
      sink.iter().map(|e| e.message).collect::<Vec<_>>(),
      vec![MidiMessage::note_off(2, 60), MidiMessage::note_off(2, 64)]
    );
    assert!(fixture.notes.is_empty());
  }
}
