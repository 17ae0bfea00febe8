use std::fmt::Formatter;

pub const NOTE_OFF: u8 = 0x80;
pub const NOTE_ON: u8 = 0x90;

const STATUS_MASK: u8 = 0xf0;
const CHANNEL_MASK: u8 = 0x0f;
const DATA_MASK: u8 = 0x7f;

/// A MIDI 1.0 channel voice message in its 3 bytes wire form.
///
/// Two bytes messages (program change, channel pressure) keep `data2` at zero.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MidiMessage {
  pub status: u8,
  pub data1: u8,
  pub data2: u8,
}

impl MidiMessage {
  pub const fn new(status: u8, data1: u8, data2: u8) -> Self {
    Self {
      status,
      data1,
      data2,
    }
  }

  pub fn note_on(channel: u8, note: u8, velocity: u8) -> Self {
    Self::new(
      NOTE_ON | (channel & CHANNEL_MASK),
      note & DATA_MASK,
      velocity & DATA_MASK,
    )
  }

  pub fn note_off(channel: u8, note: u8) -> Self {
    Self::new(NOTE_OFF | (channel & CHANNEL_MASK), note & DATA_MASK, 0)
  }

  pub fn bytes(&self) -> [u8; 3] {
    [self.status, self.data1, self.data2]
  }

  #[inline]
  pub fn kind(&self) -> u8 {
    self.status & STATUS_MASK
  }

  /// A status byte of a channel voice message and data bytes under 0x80.
  pub fn is_channel_voice(&self) -> bool {
    (NOTE_OFF..0xf0).contains(&self.status) && self.data1 <= DATA_MASK && self.data2 <= DATA_MASK
  }

  /// Zero based channel.
  #[inline]
  pub fn channel(&self) -> u8 {
    self.status & CHANNEL_MASK
  }

  #[inline]
  pub fn is_note_on(&self) -> bool {
    self.kind() == NOTE_ON && self.data2 > 0
  }

  /// Note-off, or a note-on with zero velocity.
  #[inline]
  pub fn is_note_off(&self) -> bool {
    self.kind() == NOTE_OFF || (self.kind() == NOTE_ON && self.data2 == 0)
  }

  #[inline]
  pub fn note(&self) -> u8 {
    self.data1
  }
}

impl std::fmt::Debug for MidiMessage {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(
      f,
      "{:02x} {:02x} {:02x}",
      self.status, self.data1, self.data2
    )
  }
}
