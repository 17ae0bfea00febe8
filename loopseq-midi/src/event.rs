use std::fmt::Formatter;

use loopseq_time::SampleTime;

use crate::MidiMessage;

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct MidiEvent {
  pub sample_time: SampleTime,
  pub message: MidiMessage,
}

impl MidiEvent {
  pub fn new(sample_time: SampleTime, message: MidiMessage) -> Self {
    Self {
      sample_time,
      message,
    }
  }
}

impl std::fmt::Debug for MidiEvent {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{:012} {:?}", self.sample_time, self.message)
  }
}
