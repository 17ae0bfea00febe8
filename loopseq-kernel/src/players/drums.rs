use loopseq_time::{LoopSegment, LoopTiming};

use crate::output::BlockOutput;
use crate::track::Sequence;

/// Fires the events of every track of `sequence` that fall inside `segment`.
///
/// `gate_open` tells whether some key is held, gated tracks drop their note-ons otherwise.
pub(crate) fn play_drums(
  sequence: &Sequence,
  timing: &LoopTiming,
  segment: &LoopSegment,
  gate_open: bool,
  output: &mut BlockOutput,
) {
  for track in sequence.tracks() {
    if track.is_empty() {
      continue;
    }
    let gate_closed = track.is_gated() && !gate_open;
    for event in track.iter() {
      let position = timing.event_position(event.timestamp_beats);
      if !segment.contains(position) {
        continue;
      }
      let message = event.message();
      if gate_closed && message.is_note_on() {
        continue;
      }
      output.emit_at(segment.block_offset(position), message);
    }
  }
}
