pub type SampleRate = u32;

/// Absolute sample time as handed over by the audio host for the start of a block.
pub type SampleTime = i64;

/// Sub-sample tolerance applied when converting a fractional offset into a frame index.
const FRAME_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Tempo(f64);

impl Tempo {
  pub const MIN_BPM: f64 = 1.0;
  pub const MAX_BPM: f64 = 999.0;
  pub const DEFAULT_BPM: f64 = 120.0;

  /// Returns `None` when the value is not a usable tempo.
  pub fn new(bpm: f64) -> Option<Self> {
    (bpm.is_finite() && (Self::MIN_BPM..=Self::MAX_BPM).contains(&bpm)).then(|| Self(bpm))
  }

  pub fn clamped(bpm: f64) -> Self {
    if bpm.is_finite() {
      Self(bpm.clamp(Self::MIN_BPM, Self::MAX_BPM))
    } else {
      Self::default()
    }
  }

  pub fn bpm(&self) -> f64 {
    self.0
  }

  pub fn samples_per_beat(&self, sample_rate: SampleRate) -> f64 {
    sample_rate as f64 * 60.0 / self.0
  }

  pub fn beats_to_samples(&self, beats: f64, sample_rate: SampleRate) -> f64 {
    beats / self.0 * 60.0 * sample_rate as f64
  }

  pub fn samples_to_beats(&self, samples: f64, sample_rate: SampleRate) -> f64 {
    samples / self.samples_per_beat(sample_rate)
  }
}

impl Default for Tempo {
  fn default() -> Self {
    Self(Self::DEFAULT_BPM)
  }
}

/// Length of one pass through a sequence, both in beats and in samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopTiming {
  length_beats: f64,
  length_samples: f64,
}

impl LoopTiming {
  pub fn new(length_beats: f64, tempo: Tempo, sample_rate: SampleRate) -> Self {
    Self {
      length_beats,
      length_samples: tempo.beats_to_samples(length_beats, sample_rate),
    }
  }

  pub fn length_beats(&self) -> f64 {
    self.length_beats
  }

  pub fn length_samples(&self) -> f64 {
    self.length_samples
  }

  /// Position inside the loop, in samples, of an event stamped in beats.
  #[inline]
  pub fn event_position(&self, timestamp_beats: f64) -> f64 {
    (timestamp_beats / self.length_beats) * self.length_samples
  }

  /// Start of step `step` when the loop is divided into `num_steps` equal steps.
  #[inline]
  pub fn step_position(&self, step: usize, num_steps: usize) -> f64 {
    self.length_samples / num_steps as f64 * step as f64
  }

  /// Loop position, in samples, of an absolute position given in samples.
  pub fn wrap_samples(&self, samples: f64) -> f64 {
    let position = samples.rem_euclid(self.length_samples);
    // rem_euclid may round up to the divisor itself
    if position >= self.length_samples {
      0.0
    } else {
      position
    }
  }

  pub fn wrap_beats(&self, beats: f64) -> f64 {
    let position = beats.rem_euclid(self.length_beats);
    if position >= self.length_beats {
      0.0
    } else {
      position
    }
  }
}

/// Converts a fractional offset from the start of a block into a frame index inside the block.
pub fn frame_offset(offset: f64, num_frames: usize) -> usize {
  if num_frames == 0 || !offset.is_finite() || offset <= 0.0 {
    return 0;
  }
  let frame = (offset + FRAME_EPSILON).floor() as usize;
  frame.min(num_frames - 1)
}
