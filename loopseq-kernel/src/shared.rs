use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use loopseq_time::Tempo;

use crate::pattern::ChordPattern;
use crate::track::SEQUENCE_COUNT;

const NO_SEQUENCE: u32 = u32::MAX;

/// Queued sequence in the low half, follow sequence in the high half.
fn pack_queue(queued: usize, follow: Option<usize>) -> u64 {
  let follow = follow
    .and_then(|index| u32::try_from(index).ok())
    .unwrap_or(NO_SEQUENCE);
  let queued = u32::try_from(queued).unwrap_or(NO_SEQUENCE);
  (u64::from(follow) << 32) | u64::from(queued)
}

fn unpack_queue(word: u64) -> (usize, Option<usize>) {
  let queued = (word & u64::from(u32::MAX)) as usize;
  let follow = (word >> 32) as usize;
  (queued, (follow < SEQUENCE_COUNT).then(|| follow))
}

/// Scalar state shared by the controller and the renderer.
///
/// Each value is a single atomic word accessed with relaxed ordering. The renderer may
/// see a change one block late, which is fine for all of them.
#[derive(Debug)]
pub(crate) struct SharedState {
  tempo: AtomicU64,
  playing: AtomicBool,
  repeating: AtomicBool,
  transport_generation: AtomicU64,
  sequence_queue: AtomicU64,
  current_sequence: AtomicUsize,
  playhead: AtomicU64,
  rejected_edits: AtomicU64,
  skipped_notes: AtomicU64,
  dropped_output: AtomicU64,
  pub chord_pattern: ChordPattern,
}

impl SharedState {
  pub fn new(tempo: Tempo, repeating: bool) -> Self {
    Self {
      tempo: AtomicU64::new(tempo.bpm().to_bits()),
      playing: AtomicBool::new(false),
      repeating: AtomicBool::new(repeating),
      transport_generation: AtomicU64::new(0),
      sequence_queue: AtomicU64::new(pack_queue(0, None)),
      current_sequence: AtomicUsize::new(0),
      playhead: AtomicU64::new(0f64.to_bits()),
      rejected_edits: AtomicU64::new(0),
      skipped_notes: AtomicU64::new(0),
      dropped_output: AtomicU64::new(0),
      chord_pattern: ChordPattern::new(),
    }
  }

  pub fn tempo(&self) -> Tempo {
    Tempo::clamped(f64::from_bits(self.tempo.load(Ordering::Relaxed)))
  }

  pub fn set_tempo(&self, tempo: Tempo) {
    self.tempo.store(tempo.bpm().to_bits(), Ordering::Relaxed);
  }

  pub fn is_playing(&self) -> bool {
    self.playing.load(Ordering::Relaxed)
  }

  /// Starting the transport bumps the generation so the renderer restarts its clock.
  pub fn set_playing(&self, playing: bool) {
    if playing {
      self.transport_generation.fetch_add(1, Ordering::Relaxed);
    }
    self.playing.store(playing, Ordering::Relaxed);
  }

  pub fn transport_generation(&self) -> u64 {
    self.transport_generation.load(Ordering::Relaxed)
  }

  pub fn is_repeating(&self) -> bool {
    self.repeating.load(Ordering::Relaxed)
  }

  pub fn set_repeating(&self, repeating: bool) {
    self.repeating.store(repeating, Ordering::Relaxed);
  }

  /// Queued and follow sequences are written as one word, so the renderer never sees
  /// one without the other.
  pub fn queue_sequence(&self, index: usize, follow: Option<usize>) {
    self
      .sequence_queue
      .store(pack_queue(index, follow), Ordering::Relaxed);
  }

  pub fn sequence_queue(&self) -> (usize, Option<usize>) {
    unpack_queue(self.sequence_queue.load(Ordering::Relaxed))
  }

  pub fn queued_sequence(&self) -> usize {
    self.sequence_queue().0
  }

  pub fn follow_sequence(&self) -> Option<usize> {
    self.sequence_queue().1
  }

  /// Called by the renderer at a loop boundary, returns the sequence to play next.
  ///
  /// When a follow sequence is set it becomes the queued one, unless the controller
  /// queued something else in the meantime, in which case that wins.
  pub fn take_queued_sequence(&self) -> usize {
    let word = self.sequence_queue.load(Ordering::Relaxed);
    let (queued, follow) = unpack_queue(word);
    if let Some(follow) = follow {
      let _ = self.sequence_queue.compare_exchange(
        word,
        pack_queue(follow, None),
        Ordering::Relaxed,
        Ordering::Relaxed,
      );
    }
    queued
  }

  pub fn current_sequence(&self) -> usize {
    self.current_sequence.load(Ordering::Relaxed)
  }

  pub fn set_current_sequence(&self, index: usize) {
    self.current_sequence.store(index, Ordering::Relaxed);
  }

  pub fn playhead(&self) -> f64 {
    f64::from_bits(self.playhead.load(Ordering::Relaxed))
  }

  pub fn set_playhead(&self, beats: f64) {
    self.playhead.store(beats.to_bits(), Ordering::Relaxed);
  }

  pub fn count_rejected_edit(&self) {
    self.rejected_edits.fetch_add(1, Ordering::Relaxed);
  }

  pub fn count_skipped_notes(&self, count: u64) {
    if count > 0 {
      self.skipped_notes.fetch_add(count, Ordering::Relaxed);
    }
  }

  pub fn count_dropped_output(&self, count: u64) {
    if count > 0 {
      self.dropped_output.fetch_add(count, Ordering::Relaxed);
    }
  }

  pub fn stats(&self, dropped_edits: u64) -> Stats {
    Stats {
      dropped_edits,
      rejected_edits: self.rejected_edits.load(Ordering::Relaxed),
      skipped_notes: self.skipped_notes.load(Ordering::Relaxed),
      dropped_output: self.dropped_output.load(Ordering::Relaxed),
    }
  }
}

/// Counters of the work the kernel had to give up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stats {
  /// Edits dropped by the controller because the command queue was full or the track
  /// had no room left.
  pub dropped_edits: u64,
  /// Edits that reached the renderer but could not be applied.
  pub rejected_edits: u64,
  /// Chord notes not played because every active note slot was in use.
  pub skipped_notes: u64,
  /// Events the MIDI sink did not accept.
  pub dropped_output: u64,
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;
  use std::thread;

  use super::*;

  #[test]
  fn tempo_round_trips_through_the_atomic() {
    let state = SharedState::new(Tempo::default(), true);
    state.set_tempo(Tempo::new(97.5).unwrap());
    assert_eq!(state.tempo().bpm(), 97.5);
  }

  #[test]
  fn starting_bumps_the_generation() {
    let state = SharedState::new(Tempo::default(), true);
    let generation = state.transport_generation();
    state.set_playing(false);
    assert_eq!(state.transport_generation(), generation);
    state.set_playing(true);
    assert!(state.is_playing());
    assert_eq!(state.transport_generation(), generation + 1);
  }

  #[test]
  fn follow_sequence_replaces_the_queued_one() {
    let state = SharedState::new(Tempo::default(), true);
    state.queue_sequence(2, Some(1));
    assert_eq!(state.follow_sequence(), Some(1));
    assert_eq!(state.take_queued_sequence(), 2);
    assert_eq!(state.queued_sequence(), 1);
    assert_eq!(state.follow_sequence(), None);
    assert_eq!(state.take_queued_sequence(), 1);
    assert_eq!(state.take_queued_sequence(), 1);
  }

  #[test]
  fn queue_word_halves() {
    assert_eq!(unpack_queue(pack_queue(3, Some(2))), (3, Some(2)));
    assert_eq!(unpack_queue(pack_queue(1, None)), (1, None));
    assert_eq!(unpack_queue(pack_queue(0, Some(SEQUENCE_COUNT))), (0, None));
  }

  #[test]
  fn queued_and_follow_change_together() {
    let state = Arc::new(SharedState::new(Tempo::default(), true));
    let writer = {
      let state = Arc::clone(&state);
      thread::spawn(move || {
        for i in 0..20_000 {
          if i % 2 == 0 {
            state.queue_sequence(2, Some(1));
          } else {
            state.queue_sequence(3, Some(0));
          }
        }
      })
    };

    for _ in 0..20_000 {
      let taken = state.take_queued_sequence();
      assert!(taken < SEQUENCE_COUNT);
      let pair = state.sequence_queue();
      assert!(
        matches!(pair, (2, Some(1)) | (3, Some(0)) | (1, None) | (0, None)),
        "{:?}",
        pair
      );
    }
    writer.join().unwrap();
  }

  #[test]
  fn stats_snapshot() {
    let state = SharedState::new(Tempo::default(), true);
    state.count_rejected_edit();
    state.count_skipped_notes(2);
    state.count_dropped_output(3);
    assert_eq!(
      state.stats(4),
      Stats {
        dropped_edits: 4,
        rejected_edits: 1,
        skipped_notes: 2,
        dropped_output: 3,
      }
    );
  }
}
