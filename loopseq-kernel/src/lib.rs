mod active_notes;
mod clock;
mod commands;
mod config;
mod context;
mod controller;
pub mod data;
mod error;
mod held_notes;
mod kernel;
mod output;
pub mod pattern;
mod players;
mod renderer;
mod shared;
pub mod track;

pub use crate::active_notes::{ActiveNoteSlot, ActiveNoteTable, ACTIVE_NOTE_SLOTS};
pub use crate::clock::{ClockTick, HostTransport, LoopClock};
pub use crate::commands::{command_queue, CommandReceiver, CommandSender, Drain, PendingOp};
pub use crate::config::{ClockMode, EditFailurePolicy, KernelConfig};
pub use crate::context::RenderContext;
pub use crate::controller::Controller;
pub use crate::error::{KernelError, Result};
pub use crate::held_notes::HeldNotes;
pub use crate::kernel::Kernel;
pub use crate::pattern::{ActionKind, ChordPattern, NoteAction};
pub use crate::renderer::Renderer;
pub use crate::shared::Stats;
pub use crate::track::{Event, Sequence, SequenceBank, Track};

pub use loopseq_midi as midi;
pub use loopseq_time as time;
