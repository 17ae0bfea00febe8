use serde::{Deserialize, Serialize};

use loopseq_midi::Filter;
use loopseq_time::{SampleRate, Tempo};

/// Where the beat position comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockMode {
  /// Free running from the kernel's own frame counter.
  #[default]
  Internal,
  /// Following the transport handed over by the host on every block.
  Host,
}

/// What to do with an edit that cannot be delivered, either because the command queue
/// is full or because the target track is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditFailurePolicy {
  /// The edit is dropped, counted and logged.
  #[default]
  Silent,
  /// The edit is dropped and the error is returned to the caller.
  Report,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
  pub sample_rate: SampleRate,
  pub tempo: f64,
  pub command_queue_capacity: usize,
  pub sequence_length_beats: f64,
  pub sustain_window_samples: u32,
  pub chord_velocity: u8,
  pub output_channel: u8,
  /// Channels, from 1 to 16, accepted as MIDI input. Empty accepts all of them.
  pub input_channels: Vec<u8>,
  pub repeating: bool,
  pub clock: ClockMode,
  pub edit_failure_policy: EditFailurePolicy,
}

impl KernelConfig {
  pub const DEFAULT_SAMPLE_RATE: SampleRate = 44_100;
  pub const DEFAULT_TEMPO: f64 = Tempo::DEFAULT_BPM;
  pub const DEFAULT_COMMAND_QUEUE_CAPACITY: usize = 512;
  pub const DEFAULT_SEQUENCE_LENGTH_BEATS: f64 = 4.0;
  pub const DEFAULT_SUSTAIN_WINDOW_SAMPLES: u32 = 4_410;
  pub const DEFAULT_CHORD_VELOCITY: u8 = 100;
  pub const DEFAULT_OUTPUT_CHANNEL: u8 = 0;

  #[must_use]
  pub fn with_sample_rate(mut self, sample_rate: SampleRate) -> Self {
    self.sample_rate = sample_rate;
    self
  }

  #[must_use]
  pub fn with_tempo(mut self, tempo: f64) -> Self {
    self.tempo = tempo;
    self
  }

  #[must_use]
  pub fn with_command_queue_capacity(mut self, capacity: usize) -> Self {
    self.command_queue_capacity = capacity;
    self
  }

  #[must_use]
  pub fn with_sequence_length(mut self, beats: f64) -> Self {
    self.sequence_length_beats = beats;
    self
  }

  #[must_use]
  pub fn with_sustain_window(mut self, samples: u32) -> Self {
    self.sustain_window_samples = samples;
    self
  }

  #[must_use]
  pub fn with_chord_velocity(mut self, velocity: u8) -> Self {
    self.chord_velocity = velocity;
    self
  }

  #[must_use]
  pub fn with_output_channel(mut self, channel: u8) -> Self {
    self.output_channel = channel;
    self
  }

  #[must_use]
  pub fn with_input_channels(mut self, channels: &[u8]) -> Self {
    self.input_channels = channels.to_vec();
    self
  }

  #[must_use]
  pub fn with_repeating(mut self, repeating: bool) -> Self {
    self.repeating = repeating;
    self
  }

  #[must_use]
  pub fn with_clock(mut self, clock: ClockMode) -> Self {
    self.clock = clock;
    self
  }

  #[must_use]
  pub fn with_edit_failure_policy(mut self, policy: EditFailurePolicy) -> Self {
    self.edit_failure_policy = policy;
    self
  }

  pub fn input_filter(&self) -> Filter {
    if self.input_channels.is_empty() {
      Filter::default()
    } else {
      Filter::default().with_channels(&self.input_channels)
    }
  }

  pub fn initial_tempo(&self) -> Tempo {
    Tempo::clamped(self.tempo)
  }

  /// Loop length used for every sequence until it is changed, never below the minimum.
  pub fn initial_sequence_length(&self) -> f64 {
    if self.sequence_length_beats.is_finite()
      && self.sequence_length_beats >= crate::track::MIN_SEQUENCE_LENGTH_BEATS
    {
      self.sequence_length_beats
    } else {
      Self::DEFAULT_SEQUENCE_LENGTH_BEATS
    }
  }
}

impl Default for KernelConfig {
  fn default() -> Self {
    Self {
      sample_rate: Self::DEFAULT_SAMPLE_RATE,
      tempo: Self::DEFAULT_TEMPO,
      command_queue_capacity: Self::DEFAULT_COMMAND_QUEUE_CAPACITY,
      sequence_length_beats: Self::DEFAULT_SEQUENCE_LENGTH_BEATS,
      sustain_window_samples: Self::DEFAULT_SUSTAIN_WINDOW_SAMPLES,
      chord_velocity: Self::DEFAULT_CHORD_VELOCITY,
      output_channel: Self::DEFAULT_OUTPUT_CHANNEL,
      input_channels: Vec::new(),
      repeating: true,
      clock: ClockMode::Internal,
      edit_failure_policy: EditFailurePolicy::Silent,
    }
  }
}
