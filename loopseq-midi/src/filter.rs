use std::fmt::{Debug, Formatter};

use crate::MidiMessage;

/// Selects the MIDI channels a message is accepted from. Channels are numbered from 1 to 16.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Filter {
  channels: u16,
}

impl Filter {
  pub fn new() -> Self {
    Self { channels: 0xffff }
  }

  #[must_use]
  pub fn with_channels(mut self, channels: &[u8]) -> Self {
    self.channels = 0;
    for channel in channels.iter().cloned() {
      if channel > 0 && channel <= 16 {
        self.channels |= 1 << (channel - 1);
      }
    }
    self
  }

  #[inline]
  pub fn channel(&self, channel: u8) -> bool {
    let channel = channel & 0x0f;
    let mask = 1 << channel;
    (self.channels & mask) != 0
  }

  /// Well formed channel voice messages on one of the selected channels.
  #[inline]
  pub fn accepts(&self, message: &MidiMessage) -> bool {
    message.is_channel_voice() && self.channel(message.channel())
  }

  /// Channels accepted by the filter, numbered from 1.
  pub fn channels(&self) -> impl Iterator<Item = u8> + '_ {
    (1..=16u8).filter(move |channel| self.channel(channel - 1))
  }
}

impl Default for Filter {
  fn default() -> Self {
    Self::new()
  }
}

impl Debug for Filter {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "MidiFilter: {:016b}", self.channels)
  }
}
