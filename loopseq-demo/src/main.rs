use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::info;
use ringbuf::RingBuffer;
use serde::Serialize;

use loopseq_kernel::data::{ChordPatternData, RhythmNote, TrackData};
use loopseq_kernel::midi::note::note_name;
use loopseq_kernel::midi::{MidiEvent, OutputHandler};
use loopseq_kernel::{
  ActionKind, Controller, EditFailurePolicy, Kernel, KernelConfig, RenderContext, Renderer,
};

/// Renders a few loops of the kernel offline and prints the MIDI it produces.
#[derive(Parser)]
#[command(name = "loopseq-demo", version, about)]
struct Cli {
  /// Kernel configuration file, in TOML
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// JSON file with a list of tracks replacing the built-in drum patterns
  #[arg(long)]
  tracks: Option<PathBuf>,

  /// JSON file with the chord pattern replacing the built-in one
  #[arg(long)]
  pattern: Option<PathBuf>,

  #[arg(long)]
  tempo: Option<f64>,

  /// Frames per render call
  #[arg(long, default_value = "512")]
  block_size: usize,

  /// Number of loops to render
  #[arg(long, default_value = "4")]
  loops: usize,

  /// Keys held while rendering
  #[arg(long, value_delimiter = ',', default_value = "60,64,67")]
  hold: Vec<u8>,

  /// Sequence to switch to after the first loop
  #[arg(long)]
  queue: Option<usize>,

  /// Sequence to switch to after the queued one played once
  #[arg(long, requires = "queue")]
  then: Option<usize>,

  /// Print one JSON object per event
  #[arg(long)]
  json: bool,
}

#[derive(Serialize)]
struct PrintedEvent {
  sample_time: i64,
  status: u8,
  data1: u8,
  data2: u8,
  note: String,
}

impl From<&MidiEvent> for PrintedEvent {
  fn from(event: &MidiEvent) -> Self {
    Self {
      sample_time: event.sample_time,
      status: event.message.status,
      data1: event.message.data1,
      data2: event.message.data2,
      note: note_name(event.message.note()),
    }
  }
}

fn main() -> anyhow::Result<()> {
  env_logger::init();

  let cli = Cli::parse();
  anyhow::ensure!(cli.block_size > 0, "the block size must be at least one frame");

  let mut config = match cli.config.as_ref() {
    Some(path) => {
      let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
      toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?
    }
    None => KernelConfig::default(),
  };
  if let Some(tempo) = cli.tempo {
    config = config.with_tempo(tempo);
  }
  let sample_rate = config.sample_rate;
  let config = config.with_edit_failure_policy(EditFailurePolicy::Report);

  let (mut controller, mut renderer) = Kernel::with_config(config).split();
  let (producer, mut consumer) = RingBuffer::<MidiEvent>::new(4096).split();
  let mut output = OutputHandler::from(producer);

  match cli.tracks.as_ref() {
    Some(path) => {
      let tracks: Vec<TrackData> = serde_json::from_str(&std::fs::read_to_string(path)?)
        .with_context(|| format!("parsing {}", path.display()))?;
      load_tracks(&mut controller, &mut renderer, &mut output, &tracks)?;
    }
    None => load_drum_patterns(&mut controller)?,
  }
  apply_edits(&mut renderer, &mut output);

  match cli.pattern.as_ref() {
    Some(path) => {
      let pattern: ChordPatternData = serde_json::from_str(&std::fs::read_to_string(path)?)
        .with_context(|| format!("parsing {}", path.display()))?;
      controller.set_chord_pattern(&pattern)?;
    }
    None => load_chord_pattern(&mut controller)?,
  }

  for pitch in cli.hold.iter().cloned() {
    controller.press_note(pitch, 100)?;
  }
  controller.set_playing(true);

  let mut block_start = 0i64;
  let mut loops_done = 0;
  let mut last_sequence = controller.current_sequence();
  let mut last_playhead = 0.0;
  while loops_done < cli.loops {
    renderer.render(&RenderContext::new(block_start, cli.block_size), &mut output);
    block_start += cli.block_size as i64;

    while let Some(event) = consumer.pop() {
      print_event(&event, cli.json)?;
    }

    let playhead = controller.playhead_position();
    let sequence = controller.current_sequence();
    if playhead < last_playhead || sequence != last_sequence {
      loops_done += 1;
      info!(
        "Loop {} done at {:.3}s, playing sequence {}",
        loops_done,
        block_start as f64 / sample_rate as f64,
        sequence
      );
      if loops_done == 1 {
        match (cli.queue, cli.then) {
          (Some(queue), Some(then)) => controller.queue_sequence_then(queue, then)?,
          (Some(queue), None) => controller.queue_sequence(queue)?,
          _ => {}
        }
      }
    }
    last_playhead = playhead;
    last_sequence = sequence;
  }

  controller.set_playing(false);
  renderer.render(&RenderContext::new(block_start, cli.block_size), &mut output);
  while let Some(event) = consumer.pop() {
    print_event(&event, cli.json)?;
  }

  let stats = controller.stats();
  info!("{:?}", stats);
  if cli.json {
    println!("{}", serde_json::to_string(&controller.chord_pattern())?);
  }
  Ok(())
}

fn print_event(event: &MidiEvent, json: bool) -> anyhow::Result<()> {
  if json {
    println!("{}", serde_json::to_string(&PrintedEvent::from(event))?);
  } else {
    println!("{:?} {}", event, note_name(event.message.note()));
  }
  Ok(())
}

/// Renders an empty block so the renderer takes the edits queued so far.
fn apply_edits(renderer: &mut Renderer, output: &mut OutputHandler) {
  renderer.render(&RenderContext::new(0, 0), output);
}

/// Loads the tracks one at a time, so the command queue only has to hold the largest.
fn load_tracks(
  controller: &mut Controller,
  renderer: &mut Renderer,
  output: &mut OutputHandler,
  tracks: &[TrackData],
) -> anyhow::Result<()> {
  for data in tracks.iter() {
    controller.set_track(data).with_context(|| {
      format!("loading track {} of sequence {}", data.track, data.sequence)
    })?;
    apply_edits(renderer, output);
  }
  Ok(())
}

/// Three drum sequences: a kick pattern, the same with a side stick, and running hats.
fn load_drum_patterns(controller: &mut Controller) -> anyhow::Result<()> {
  let kick = [0.0, 0.75, 2.0, 2.75];
  for (sequence, pitch) in [(0, 36), (1, 37)].iter().cloned() {
    for beat in kick.iter().cloned() {
      let note = RhythmNote::new(beat, 0.3, pitch, 100).with_channel(9);
      controller.add_note(sequence, 0, &note)?;
    }
  }
  for step in 0..8 {
    let note = RhythmNote::new(step as f64 * 0.5, 0.3, 39, 80).with_channel(9);
    controller.add_note(2, 0, &note)?;
  }
  Ok(())
}

/// Arpeggio over the held keys, letting the top note ring for half the loop.
fn load_chord_pattern(controller: &mut Controller) -> anyhow::Result<()> {
  controller.set_chord_pattern_note(0, 0, 0, ActionKind::Play)?;
  controller.set_chord_pattern_note(0, 1, 2, ActionKind::Play)?;
  controller.set_chord_pattern_note(4, 0, 1, ActionKind::Play)?;
  controller.set_chord_pattern_note(6, 0, 2, ActionKind::Sustain)?;
  controller.set_chord_pattern_note(8, 0, 2, ActionKind::Kill)?;
  controller.set_chord_pattern_note(10, 0, 0, ActionKind::Play)?;
  controller.set_chord_pattern_note(12, 0, 1, ActionKind::Play)?;
  controller.set_chord_pattern_note(14, 0, 2, ActionKind::Play)?;
  Ok(())
}
