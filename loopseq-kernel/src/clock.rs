use loopseq_time::{SampleRate, Tempo};

use crate::config::ClockMode;

/// Musical position handed over by the host at the start of a block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostTransport {
  pub tempo_bpm: f64,
  pub beat_position: f64,
  pub is_moving: bool,
}

impl HostTransport {
  pub fn new(tempo_bpm: f64, beat_position: f64, is_moving: bool) -> Self {
    Self {
      tempo_bpm,
      beat_position,
      is_moving,
    }
  }
}

/// Beat position and tempo in effect for the first frame of a block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockTick {
  pub beat_position: f64,
  pub tempo: Tempo,
}

/// Tracks the beat position from block to block.
///
/// With the internal clock the position is derived from the frames rendered since the
/// transport started. A tempo change re-anchors the count, so the position stays
/// continuous across it.
#[derive(Debug, Clone)]
pub struct LoopClock {
  mode: ClockMode,
  sample_rate: SampleRate,
  tempo: Tempo,
  anchor_beats: f64,
  frames_since_anchor: u64,
  total_frame_count: u64,
}

impl LoopClock {
  pub fn new(mode: ClockMode, sample_rate: SampleRate, tempo: Tempo) -> Self {
    Self {
      mode,
      sample_rate,
      tempo,
      anchor_beats: 0.0,
      frames_since_anchor: 0,
      total_frame_count: 0,
    }
  }

  pub fn mode(&self) -> ClockMode {
    self.mode
  }

  pub fn sample_rate(&self) -> SampleRate {
    self.sample_rate
  }

  pub fn tempo(&self) -> Tempo {
    self.tempo
  }

  pub fn total_frame_count(&self) -> u64 {
    self.total_frame_count
  }

  /// Back to beat zero.
  pub fn reset(&mut self) {
    self.anchor_beats = 0.0;
    self.frames_since_anchor = 0;
    self.total_frame_count = 0;
  }

  /// Position of the internal clock right now.
  pub fn beat_position(&self) -> f64 {
    self.anchor_beats
      + self
        .tempo
        .samples_to_beats(self.frames_since_anchor as f64, self.sample_rate)
  }

  /// Returns the position for the block about to be rendered and moves past it.
  ///
  /// Returns `None` when the host clock is followed and the host is not moving, or
  /// did not provide its transport.
  pub fn advance(
    &mut self,
    tempo: Tempo,
    num_frames: usize,
    host: Option<&HostTransport>,
  ) -> Option<ClockTick> {
    match self.mode {
      ClockMode::Internal => {
        if tempo != self.tempo {
          self.anchor_beats = self.beat_position();
          self.frames_since_anchor = 0;
          self.tempo = tempo;
        }
        let beat_position = self.beat_position();
        self.frames_since_anchor += num_frames as u64;
        self.total_frame_count += num_frames as u64;
        Some(ClockTick {
          beat_position,
          tempo,
        })
      }
      ClockMode::Host => {
        let host = host.filter(|host| host.is_moving && host.beat_position.is_finite())?;
        self.tempo = Tempo::clamped(host.tempo_bpm);
        self.total_frame_count += num_frames as u64;
        Some(ClockTick {
          beat_position: host.beat_position,
          tempo: self.tempo,
        })
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use assert_approx_eq::assert_approx_eq;

  use super::*;

  #[test]
  fn internal_clock_advances_by_blocks() {
    let mut clock = LoopClock::new(ClockMode::Internal, 44_100, Tempo::default());
    let first = clock.advance(Tempo::default(), 22_050, None).unwrap();
    assert_approx_eq!(first.beat_position, 0.0);
    let second = clock.advance(Tempo::default(), 22_050, None).unwrap();
    assert_approx_eq!(second.beat_position, 1.0);
    assert_approx_eq!(clock.beat_position(), 2.0);
    assert_eq!(clock.total_frame_count(), 44_100);
  }

  #[test]
  fn tempo_change_keeps_the_position() {
    let mut clock = LoopClock::new(ClockMode::Internal, 44_100, Tempo::default());
    clock.advance(Tempo::default(), 44_100, None);
    let fast = Tempo::new(240.0).unwrap();
    let tick = clock.advance(fast, 11_025, None).unwrap();
    assert_approx_eq!(tick.beat_position, 2.0);
    assert_eq!(tick.tempo, fast);
    assert_approx_eq!(clock.beat_position(), 3.0);
  }

  #[test]
  fn reset_goes_back_to_zero() {
    let mut clock = LoopClock::new(ClockMode::Internal, 48_000, Tempo::default());
    clock.advance(Tempo::default(), 1024, None);
    clock.reset();
    assert_eq!(clock.beat_position(), 0.0);
    assert_eq!(clock.total_frame_count(), 0);
  }

  #[test]
  fn host_clock_follows_the_transport() {
    let mut clock = LoopClock::new(ClockMode::Host, 44_100, Tempo::default());
    assert_eq!(clock.advance(Tempo::default(), 256, None), None);

    let stopped = HostTransport::new(90.0, 3.0, false);
    assert_eq!(clock.advance(Tempo::default(), 256, Some(&stopped)), None);

    let moving = HostTransport::new(90.0, 3.5, true);
    let tick = clock.advance(Tempo::default(), 256, Some(&moving)).unwrap();
    assert_eq!(tick.beat_position, 3.5);
    assert_eq!(tick.tempo.bpm(), 90.0);
    assert_eq!(clock.total_frame_count(), 256);
  }

  #[test]
  fn internal_clock_ignores_the_host() {
    let mut clock = LoopClock::new(ClockMode::Internal, 44_100, Tempo::default());
    let host = HostTransport::new(90.0, 8.0, true);
    let tick = clock.advance(Tempo::default(), 64, Some(&host)).unwrap();
    assert_eq!(tick.beat_position, 0.0);
    assert_eq!(tick.tempo, Tempo::default());
  }
}
