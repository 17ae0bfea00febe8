use loopseq_midi::{MidiEvent, MidiMessage, MidiSink};
use loopseq_time::{frame_offset, SampleTime};

/// Most events a single block can produce before the rest are dropped.
pub const BLOCK_OUTPUT_CAPACITY: usize = 512;

/// Collects the events of a block so they reach the sink sorted by time.
///
/// Events sharing a sample time keep the order they were emitted in.
pub(crate) struct BlockOutput {
  events: heapless::Vec<(MidiEvent, u32), BLOCK_OUTPUT_CAPACITY>,
  block_start: SampleTime,
  num_frames: usize,
  next_order: u32,
  overflow: u64,
}

impl BlockOutput {
  pub fn new() -> Self {
    Self {
      events: heapless::Vec::new(),
      block_start: 0,
      num_frames: 0,
      next_order: 0,
      overflow: 0,
    }
  }

  pub fn begin(&mut self, block_start: SampleTime, num_frames: usize) {
    self.events.clear();
    self.block_start = block_start;
    self.num_frames = num_frames;
    self.next_order = 0;
    self.overflow = 0;
  }

  /// Absolute sample time of a fractional offset from the start of the block.
  pub fn sample_time_at(&self, offset: f64) -> SampleTime {
    self.block_start + frame_offset(offset, self.num_frames) as SampleTime
  }

  /// Emits at a fractional offset from the start of the block.
  pub fn emit_at(&mut self, offset: f64, message: MidiMessage) -> SampleTime {
    let sample_time = self.sample_time_at(offset);
    self.push(sample_time, message);
    sample_time
  }

  /// Emits at an absolute sample time, clamped to the block.
  pub fn emit_at_time(&mut self, sample_time: SampleTime, message: MidiMessage) {
    self.emit_at((sample_time - self.block_start) as f64, message);
  }

  /// Emits at the first frame of the block.
  pub fn emit_now(&mut self, message: MidiMessage) {
    self.push(self.block_start, message);
  }

  pub fn len(&self) -> usize {
    self.events.len()
  }

  /// Hands the events over to the sink, returns how many were lost on the way.
  pub fn flush<S: MidiSink + ?Sized>(&mut self, sink: &mut S) -> u64 {
    self
      .events
      .sort_unstable_by_key(|(event, order)| (event.sample_time, *order));
    let mut dropped = self.overflow;
    for (event, _) in self.events.iter() {
      if !sink.send(*event) {
        dropped += 1;
      }
    }
    self.events.clear();
    self.overflow = 0;
    dropped
  }

  fn push(&mut self, sample_time: SampleTime, message: MidiMessage) {
    let order = self.next_order;
    self.next_order = self.next_order.wrapping_add(1);
    if self
      .events
      .push((MidiEvent::new(sample_time, message), order))
      .is_err()
    {
      self.overflow += 1;
    }
  }
}
