mod segments;
mod tempo;

pub use segments::{BlockCursor, LoopSegment};
pub use tempo::{frame_offset, LoopTiming, SampleRate, SampleTime, Tempo};
