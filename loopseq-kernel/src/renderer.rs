use std::sync::Arc;

use loopseq_midi::{Filter, MidiMessage, MidiSink};
use loopseq_time::{BlockCursor, LoopTiming, SampleRate, SampleTime, Tempo};

use crate::active_notes::ActiveNoteTable;
use crate::clock::LoopClock;
use crate::commands::{CommandReceiver, PendingOp};
use crate::config::KernelConfig;
use crate::context::RenderContext;
use crate::held_notes::HeldNotes;
use crate::output::BlockOutput;
use crate::players::{play_drums, ChordPlayer};
use crate::shared::SharedState;
use crate::track::SequenceBank;

/// Loop positions closer than this to a loop boundary, in beats, are taken as on it
/// when the position has to be worked out again from the clock.
const BEAT_TOLERANCE: f64 = 1e-9;

/// Clock readings closer than this, in samples, to where the previous block ended are
/// taken as the transport running on without a jump.
const CONTINUITY_TOLERANCE: f64 = 0.5;

const SAMPLE_TOLERANCE: f64 = 1e-6;

/// Where the previous block left the loop.
#[derive(Debug, Clone, Copy)]
struct Resume {
  beat_position: f64,
  loop_position: f64,
  tempo: Tempo,
}

/// The render side of the kernel, to be called once per audio block.
///
/// Never allocates, locks nor blocks once created.
pub struct Renderer {
  commands: CommandReceiver,
  shared: Arc<SharedState>,
  bank: Box<SequenceBank>,
  held: HeldNotes,
  notes: ActiveNoteTable,
  clock: LoopClock,
  chords: ChordPlayer,
  output: Box<BlockOutput>,
  filter: Filter,
  sample_rate: SampleRate,
  output_channel: u8,
  transport_generation: u64,
  was_repeating: bool,
  pass_through: HeldNotes,
  pass_start_beats: f64,
  resume: Option<Resume>,
  next_block_start: Option<SampleTime>,
}

impl Renderer {
  pub(crate) fn new(
    commands: CommandReceiver,
    shared: Arc<SharedState>,
    config: &KernelConfig,
  ) -> Self {
    let transport_generation = shared.transport_generation();
    let was_repeating = shared.is_repeating();
    Self {
      commands,
      shared,
      bank: Box::new(SequenceBank::new(config.initial_sequence_length())),
      held: HeldNotes::new(),
      notes: ActiveNoteTable::new(),
      clock: LoopClock::new(config.clock, config.sample_rate, config.initial_tempo()),
      chords: ChordPlayer::new(
        config.output_channel,
        config.chord_velocity,
        config.sustain_window_samples,
      ),
      output: Box::new(BlockOutput::new()),
      filter: config.input_filter(),
      sample_rate: config.sample_rate,
      output_channel: config.output_channel,
      transport_generation,
      was_repeating,
      pass_through: HeldNotes::new(),
      pass_start_beats: 0.0,
      resume: None,
      next_block_start: None,
    }
  }

  pub fn held_notes(&self) -> &HeldNotes {
    &self.held
  }

  pub fn active_notes(&self) -> &ActiveNoteTable {
    &self.notes
  }

  pub fn sequences(&self) -> &SequenceBank {
    &self.bank
  }

  pub fn clock(&self) -> &LoopClock {
    &self.clock
  }

  /// Renders one block, sending the events it produces to `sink` sorted by time.
  pub fn render<S: MidiSink + ?Sized>(&mut self, context: &RenderContext<'_>, sink: &mut S) {
    let num_frames = context.num_frames();
    let block_start = context.block_start();
    self.output.begin(block_start, num_frames);

    if self
      .next_block_start
      .map_or(false, |expected| block_start < expected)
    {
      self.chords.rebase(&mut self.notes, block_start);
    }
    self.next_block_start = Some(context.block_end());

    let repeating = self.shared.is_repeating();
    if self.was_repeating && !repeating {
      self.held.clear();
    }
    self.was_repeating = repeating;

    self.process_commands(repeating);
    self.process_midi_input(context, repeating);

    let generation = self.shared.transport_generation();
    if generation != self.transport_generation {
      self.transport_generation = generation;
      self.clock.reset();
      self.pass_start_beats = 0.0;
      self.resume = None;
    }

    if num_frames > 0 {
      let tick = if self.shared.is_playing() {
        self
          .clock
          .advance(self.shared.tempo(), num_frames, context.transport())
      } else {
        None
      };

      match tick {
        Some(tick) => {
          self
            .chords
            .release_unheld(&self.held, &mut self.notes, &mut self.output);
          self.play(tick.beat_position, tick.tempo, num_frames);
          self
            .chords
            .expire(&mut self.notes, &mut self.output, context.block_end());
        }
        None => {
          self.chords.release_all(&mut self.notes, &mut self.output);
          self.resume = None;
        }
      }
    }

    let dropped = self.output.flush(sink);
    self.shared.count_dropped_output(dropped);
  }

  fn process_commands(&mut self, repeating: bool) {
    let queued = self.commands.len();
    for _ in 0..queued {
      let Some(op) = self.commands.drain().next() else {
        break;
      };
      match op {
        PendingOp::Press { pitch, velocity } => {
          let message = MidiMessage::note_on(self.output_channel, pitch, velocity);
          self.key_input(repeating, message, None);
        }
        PendingOp::Release { pitch } => {
          let message = MidiMessage::note_off(self.output_channel, pitch);
          self.key_input(repeating, message, None);
        }
        op => {
          let result = self.bank.apply(&op);
          debug_assert!(result.is_ok(), "rejected edit {:?}: {:?}", op, result);
          if result.is_err() {
            self.shared.count_rejected_edit();
          }
        }
      }
    }
  }

  fn process_midi_input(&mut self, context: &RenderContext<'_>, repeating: bool) {
    let block_start = context.block_start();
    for event in context.midi_input() {
      if self.filter.accepts(&event.message) {
        let offset = (event.sample_time - block_start) as f64;
        self.key_input(repeating, event.message, Some(offset));
      }
    }
  }

  fn play(&mut self, beat_position: f64, tempo: Tempo, num_frames: usize) {
    let sample_rate = self.sample_rate;
    let mut timing = LoopTiming::new(self.bank.current().length_beats(), tempo, sample_rate);
    let position = self.loop_position(beat_position, tempo, &mut timing);
    self.pass_start_beats = beat_position - tempo.samples_to_beats(position, sample_rate);
    self
      .shared
      .set_playhead(timing.wrap_beats(tempo.samples_to_beats(position, sample_rate)));

    let gate_open = !self.held.is_empty();
    let mut cursor = BlockCursor::new(position, num_frames);
    let mut end_position = position;
    while let Some(segment) = cursor.next_segment(timing.length_samples()) {
      play_drums(
        self.bank.current(),
        &timing,
        &segment,
        gate_open,
        &mut self.output,
      );
      let skipped = self.chords.play_segment(
        &self.shared.chord_pattern,
        &timing,
        &segment,
        &self.held,
        &mut self.notes,
        &mut self.output,
      );
      self.shared.count_skipped_notes(skipped);

      end_position = segment.end;
      if segment.wraps {
        end_position = 0.0;
        let elapsed = segment.frame_offset + segment.len();
        self.pass_start_beats = beat_position + tempo.samples_to_beats(elapsed, sample_rate);
        self.switch_sequence();
        timing = LoopTiming::new(self.bank.current().length_beats(), tempo, sample_rate);
      }
    }

    self.resume = Some(Resume {
      beat_position: beat_position + tempo.samples_to_beats(num_frames as f64, sample_rate),
      loop_position: end_position,
      tempo,
    });
  }

  /// Loop position, in samples, for the first frame of the block.
  ///
  /// While the clock runs on from where the previous block ended, the position carries
  /// over from it, scaled when the tempo changed. Otherwise it is worked out on the beat
  /// axis from the start of the current pass, and a block landing in a later pass
  /// crosses the boundary here, switching sequence once.
  fn loop_position(&mut self, beat_position: f64, tempo: Tempo, timing: &mut LoopTiming) -> f64 {
    let sample_rate = self.sample_rate;
    let samples_per_beat = tempo.samples_per_beat(sample_rate);
    let resume = self.resume.take();

    if let Some(resume) = resume {
      if (resume.beat_position - beat_position).abs() * samples_per_beat < CONTINUITY_TOLERANCE {
        let position = if resume.tempo == tempo {
          resume.loop_position
        } else {
          resume.loop_position / resume.tempo.samples_per_beat(sample_rate) * samples_per_beat
        };
        // rescaling may land on the loop end, which is the boundary itself
        if timing.length_samples() - position < SAMPLE_TOLERANCE {
          self.switch_sequence();
          *timing = LoopTiming::new(self.bank.current().length_beats(), tempo, sample_rate);
          return 0.0;
        }
        return timing.wrap_samples(position);
      }
    }

    let length_beats = timing.length_beats();
    let elapsed = beat_position - self.pass_start_beats;
    let mut passes = (elapsed / length_beats).floor();
    let mut position_beats = elapsed - passes * length_beats;
    if length_beats - position_beats < BEAT_TOLERANCE {
      passes += 1.0;
      position_beats = 0.0;
    } else if position_beats < BEAT_TOLERANCE {
      position_beats = 0.0;
    }

    if passes >= 1.0 && resume.is_some() {
      self.switch_sequence();
      *timing = LoopTiming::new(self.bank.current().length_beats(), tempo, sample_rate);
    }
    timing.wrap_samples(tempo.beats_to_samples(position_beats, sample_rate))
  }

  fn switch_sequence(&mut self) {
    let next = self.shared.take_queued_sequence();
    self.bank.set_current(next);
    self.shared.set_current_sequence(self.bank.current_index());
  }

  /// Keys feed the held notes while repeating, otherwise they go straight to the output.
  ///
  /// A key that went straight out is released straight out too, whatever the mode
  /// is by then.
  fn key_input(&mut self, repeating: bool, message: MidiMessage, offset: Option<f64>) {
    let pitch = message.note();
    let pass_through = if message.is_note_off() && self.pass_through.is_held(pitch) {
      self.pass_through.release(pitch);
      true
    } else if repeating {
      false
    } else {
      if message.is_note_on() {
        self.pass_through.press(pitch);
      }
      true
    };

    if pass_through {
      match offset {
        Some(offset) => {
          self.output.emit_at(offset, message);
        }
        None => self.output.emit_now(message),
      }
    }

    if repeating {
      if message.is_note_on() {
        self.held.press(pitch);
      } else if message.is_note_off() {
        self.held.release(pitch);
      }
    }
  }
}
