use loopseq_midi::MidiEvent;
use loopseq_time::SampleTime;

use crate::clock::HostTransport;

/// What the audio host hands over for one render call.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
  block_start: SampleTime,
  num_frames: usize,
  transport: Option<HostTransport>,
  midi_input: &'a [MidiEvent],
}

impl<'a> RenderContext<'a> {
  pub fn new(block_start: SampleTime, num_frames: usize) -> Self {
    Self {
      block_start,
      num_frames,
      transport: None,
      midi_input: &[],
    }
  }

  #[must_use]
  pub fn with_transport(mut self, transport: HostTransport) -> Self {
    self.transport = Some(transport);
    self
  }

  #[must_use]
  pub fn with_midi_input(mut self, midi_input: &'a [MidiEvent]) -> Self {
    self.midi_input = midi_input;
    self
  }

  pub fn block_start(&self) -> SampleTime {
    self.block_start
  }

  pub fn num_frames(&self) -> usize {
    self.num_frames
  }

  pub fn block_end(&self) -> SampleTime {
    self.block_start + self.num_frames as SampleTime
  }

  pub fn transport(&self) -> Option<&HostTransport> {
    self.transport.as_ref()
  }

  pub fn midi_input(&self) -> &'a [MidiEvent] {
    self.midi_input
  }
}
