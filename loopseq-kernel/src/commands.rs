use ringbuf::{Consumer, Producer, RingBuffer};

use crate::track::Event;

/// Mutation sent from the control context to the render context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PendingOp {
  Add {
    sequence: usize,
    track: usize,
    event: Event,
  },
  Delete {
    sequence: usize,
    track: usize,
    timestamp_beats: f64,
  },
  Clear {
    sequence: usize,
    track: usize,
  },
  SetLength {
    sequence: usize,
    beats: f64,
  },
  SetGated {
    sequence: usize,
    track: usize,
    gated: bool,
  },
  Press {
    pitch: u8,
    velocity: u8,
  },
  Release {
    pitch: u8,
  },
}

/// Creates the single producer single consumer queue carrying the edits.
///
/// The buffer is allocated here, pushing and draining never allocate.
pub fn command_queue(capacity: usize) -> (CommandSender, CommandReceiver) {
  let (tx, rx) = RingBuffer::new(capacity.max(1)).split();
  (CommandSender { tx }, CommandReceiver { rx })
}

pub struct CommandSender {
  tx: Producer<PendingOp>,
}

impl CommandSender {
  /// Returns `false` when the queue is full. The operation is then dropped.
  pub fn push(&mut self, op: PendingOp) -> bool {
    self.tx.push(op).is_ok()
  }

  pub fn capacity(&self) -> usize {
    self.tx.capacity()
  }

  pub fn len(&self) -> usize {
    self.tx.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tx.is_empty()
  }

  pub fn remaining(&self) -> usize {
    self.capacity().saturating_sub(self.len())
  }
}

pub struct CommandReceiver {
  rx: Consumer<PendingOp>,
}

impl CommandReceiver {
  /// Yields the operations queued when the drain started, in the order they were pushed.
  ///
  /// Operations pushed while draining are left for the next drain, which bounds the work
  /// done in a single render call.
  pub fn drain(&mut self) -> Drain<'_> {
    let remaining = self.rx.len();
    Drain {
      rx: &mut self.rx,
      remaining,
    }
  }

  pub fn len(&self) -> usize {
    self.rx.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rx.is_empty()
  }
}

pub struct Drain<'a> {
  rx: &'a mut Consumer<PendingOp>,
  remaining: usize,
}

impl<'a> Iterator for Drain<'a> {
  type Item = PendingOp;

  fn next(&mut self) -> Option<Self::Item> {
    if self.remaining == 0 {
      return None;
    }
    self.remaining -= 1;
    self.rx.pop()
  }
}
