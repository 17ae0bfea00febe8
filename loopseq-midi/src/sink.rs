use ringbuf::Producer;
use std::fmt::{Debug, Formatter};

use crate::event::MidiEvent;

/// Destination of the MIDI events produced while rendering a block.
///
/// Implementations are called from the render context, so they must not block.
pub trait MidiSink {
  /// Returns `false` when the event could not be delivered.
  fn send(&mut self, event: MidiEvent) -> bool;
}

impl<S: MidiSink + ?Sized> MidiSink for &mut S {
  fn send(&mut self, event: MidiEvent) -> bool {
    (**self).send(event)
  }
}

impl<const N: usize> MidiSink for heapless::Vec<MidiEvent, N> {
  fn send(&mut self, event: MidiEvent) -> bool {
    self.push(event).is_ok()
  }
}

pub enum OutputHandler {
  Callback(Box<dyn FnMut(MidiEvent) + Send + 'static>),
  RingBuffer(Producer<MidiEvent>),
}

impl MidiSink for OutputHandler {
  fn send(&mut self, event: MidiEvent) -> bool {
    match self {
      OutputHandler::Callback(ref mut callback) => {
        (callback)(event);
        true
      }
      OutputHandler::RingBuffer(ref mut producer) => producer.push(event).is_ok(),
    }
  }
}

impl<F> From<F> for OutputHandler
where
  F: FnMut(MidiEvent) + Send + 'static,
{
  fn from(callback: F) -> Self {
    OutputHandler::Callback(Box::new(callback))
  }
}

impl From<Producer<MidiEvent>> for OutputHandler {
  fn from(producer: Producer<MidiEvent>) -> Self {
    OutputHandler::RingBuffer(producer)
  }
}

impl Debug for OutputHandler {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Callback(_) => write!(f, "Callback"),
      Self::RingBuffer(_) => write!(f, "RingBuffer"),
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicU8, Ordering};
  use std::sync::Arc;

  use super::*;
  use crate::MidiMessage;

  #[test]
  fn from_callback() {
    let state = Arc::new(AtomicU8::new(0));
    let state_clone = state.clone();

    let mut handler = OutputHandler::from(move |event: MidiEvent| {
      state_clone.store(event.message.data1, Ordering::Relaxed)
    });

    assert!(handler.send(MidiEvent::new(10, MidiMessage::note_on(0, 64, 100))));
    assert_eq!(state.load(Ordering::Relaxed), 64);
  }

  #[test]
  fn from_ring_buffer() {
    let (producer, mut consumer) = ringbuf::RingBuffer::new(1).split();
    let event = MidiEvent::new(42, MidiMessage::note_off(0, 60));

    let mut handler = OutputHandler::from(producer);

    assert!(handler.send(event));
    assert!(!handler.send(event));
    assert_eq!(consumer.pop(), Some(event));
  }

  #[test]
  fn fixed_capacity_vec() {
    let mut events = heapless::Vec::<MidiEvent, 2>::new();
    let event = MidiEvent::new(0, MidiMessage::note_on(0, 60, 100));
    assert!(events.send(event));
    assert!((&mut events).send(event));
    assert!(!events.send(event));
    assert_eq!(events.len(), 2);
  }
}
