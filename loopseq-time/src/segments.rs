/// Part of a render block that maps onto a single pass through the loop.
///
/// Positions are loop positions in samples, `frame_offset` is the distance in frames
/// between the start of the block and the start of the segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopSegment {
  pub start: f64,
  pub end: f64,
  pub frame_offset: f64,
  /// The segment runs up to the loop end, so the next one starts a new pass.
  pub wraps: bool,
}

impl LoopSegment {
  pub fn len(&self) -> f64 {
    self.end - self.start
  }

  pub fn is_empty(&self) -> bool {
    self.end <= self.start
  }

  #[inline]
  pub fn contains(&self, position: f64) -> bool {
    position >= self.start && position < self.end
  }

  /// Offset from the start of the block for a loop position inside this segment.
  #[inline]
  pub fn block_offset(&self, position: f64) -> f64 {
    position - self.start + self.frame_offset
  }
}

/// Splits a render block into loop segments.
///
/// The loop length is given on every call because the sequence, and with it the loop
/// length, may change right after a wrapping segment.
#[derive(Debug, Clone)]
pub struct BlockCursor {
  position: f64,
  consumed: f64,
  num_frames: f64,
}

impl BlockCursor {
  pub fn new(position: f64, num_frames: usize) -> Self {
    Self {
      position: position.max(0.0),
      consumed: 0.0,
      num_frames: num_frames as f64,
    }
  }

  pub fn remaining(&self) -> f64 {
    self.num_frames - self.consumed
  }

  pub fn is_done(&self) -> bool {
    self.remaining() <= 0.0
  }

  pub fn next_segment(&mut self, loop_length: f64) -> Option<LoopSegment> {
    if self.is_done() || !(loop_length > 0.0) {
      return None;
    }

    if self.position >= loop_length {
      self.position = 0.0;
    }

    let remaining = self.remaining();
    let available = loop_length - self.position;
    let wraps = remaining >= available;
    let len = if wraps { available } else { remaining };

    let segment = LoopSegment {
      start: self.position,
      end: self.position + len,
      frame_offset: self.consumed,
      wraps,
    };

    if wraps {
      self.position = 0.0;
      self.consumed += available;
    } else {
      self.position += len;
      self.consumed = self.num_frames;
    }

    Some(segment)
  }
}
