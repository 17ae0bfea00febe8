use thiserror::Error;

pub type Result<T> = core::result::Result<T, KernelError>;

#[derive(Debug, Error, PartialEq)]
pub enum KernelError {
  #[error("Track capacity exceeded: a track holds at most {0} events")]
  CapacityExceeded(usize),

  #[error("Command queue is full, the edit was dropped")]
  QueueFull,

  #[error("Sequence not found: {0}")]
  SequenceOutOfRange(usize),

  #[error("Track not found: {0}")]
  TrackOutOfRange(usize),

  #[error("Pattern step not found: {0}")]
  StepOutOfRange(usize),

  #[error("Pattern note slot not found: {0}")]
  SlotOutOfRange(usize),

  #[error("Not a MIDI pitch: {0}")]
  PitchOutOfRange(u8),

  #[error("Invalid tempo: {0} bpm")]
  InvalidTempo(f64),

  #[error("Invalid sequence length: {0} beats")]
  InvalidLength(f64),

  #[error("Invalid event timestamp: {0} beats")]
  InvalidTimestamp(f64),
}
