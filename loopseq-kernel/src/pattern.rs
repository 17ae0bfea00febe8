//! Chord patterns: sixteen steps of scale degree actions resolved against the held keys.

use std::sync::atomic::{AtomicU64, Ordering};

use array_macro::array;

use crate::error::{KernelError, Result};

pub const PATTERN_STEPS: usize = 16;
pub const NOTES_PER_STEP: usize = 8;

/// Code marking a cell with no action.
pub const EMPTY_CODE: i32 = 127;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
  Play,
  Sustain,
  Kill,
  Reserved(i32),
}

impl ActionKind {
  pub const PLAY_CODE: i32 = 0;
  pub const SUSTAIN_CODE: i32 = 1;
  pub const KILL_CODE: i32 = 2;

  pub fn from_code(code: i32) -> Self {
    match code {
      Self::PLAY_CODE => ActionKind::Play,
      Self::SUSTAIN_CODE => ActionKind::Sustain,
      Self::KILL_CODE => ActionKind::Kill,
      other => ActionKind::Reserved(other),
    }
  }

  pub fn code(&self) -> i32 {
    match self {
      ActionKind::Play => Self::PLAY_CODE,
      ActionKind::Sustain => Self::SUSTAIN_CODE,
      ActionKind::Kill => Self::KILL_CODE,
      ActionKind::Reserved(code) => *code,
    }
  }
}

/// One cell of a chord pattern: what to do with the held key at `degree`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteAction {
  pub degree: i32,
  pub kind: ActionKind,
}

impl NoteAction {
  pub const EMPTY: NoteAction = NoteAction {
    degree: 0,
    kind: ActionKind::Reserved(EMPTY_CODE),
  };

  pub fn new(degree: i32, kind: ActionKind) -> Self {
    Self { degree, kind }
  }

  pub fn play(degree: i32) -> Self {
    Self::new(degree, ActionKind::Play)
  }

  pub fn sustain(degree: i32) -> Self {
    Self::new(degree, ActionKind::Sustain)
  }

  pub fn kill(degree: i32) -> Self {
    Self::new(degree, ActionKind::Kill)
  }

  pub fn is_empty(&self) -> bool {
    self.kind == ActionKind::Reserved(EMPTY_CODE)
  }

  // degree in the low word, kind code in the high word
  fn pack(&self) -> u64 {
    (self.degree as u32 as u64) | ((self.kind.code() as u32 as u64) << 32)
  }

  fn unpack(bits: u64) -> Self {
    Self {
      degree: bits as u32 as i32,
      kind: ActionKind::from_code((bits >> 32) as u32 as i32),
    }
  }
}

impl Default for NoteAction {
  fn default() -> Self {
    Self::EMPTY
  }
}

/// Chord pattern shared between the control and the render contexts.
///
/// Every cell is a single atomic word, so a cell is never seen half written. A step
/// being edited while it fires may mix old and new cells, which is accepted.
pub struct ChordPattern {
  cells: [[AtomicU64; NOTES_PER_STEP]; PATTERN_STEPS],
}

impl ChordPattern {
  pub fn new() -> Self {
    let empty = NoteAction::EMPTY.pack();
    Self {
      cells: array![_ => array![_ => AtomicU64::new(empty); NOTES_PER_STEP]; PATTERN_STEPS],
    }
  }

  pub fn set(&self, step: usize, slot: usize, action: NoteAction) -> Result<()> {
    self.cell(step, slot)?.store(action.pack(), Ordering::Relaxed);
    Ok(())
  }

  pub fn get(&self, step: usize, slot: usize) -> Result<NoteAction> {
    Ok(NoteAction::unpack(self.cell(step, slot)?.load(Ordering::Relaxed)))
  }

  /// Actions of a step, empty cells included. Out of range steps read as empty.
  pub fn step(&self, step: usize) -> [NoteAction; NOTES_PER_STEP] {
    let mut actions = [NoteAction::EMPTY; NOTES_PER_STEP];
    if let Some(cells) = self.cells.get(step) {
      for (action, cell) in actions.iter_mut().zip(cells.iter()) {
        *action = NoteAction::unpack(cell.load(Ordering::Relaxed));
      }
    }
    actions
  }

  pub fn clear(&self) {
    let empty = NoteAction::EMPTY.pack();
    for cell in self.cells.iter().flat_map(|step| step.iter()) {
      cell.store(empty, Ordering::Relaxed);
    }
  }

  fn cell(&self, step: usize, slot: usize) -> Result<&AtomicU64> {
    self
      .cells
      .get(step)
      .ok_or(KernelError::StepOutOfRange(step))?
      .get(slot)
      .ok_or(KernelError::SlotOutOfRange(slot))
  }
}

impl Default for ChordPattern {
  fn default() -> Self {
    Self::new()
  }
}

impl std::fmt::Debug for ChordPattern {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let steps: Vec<Vec<NoteAction>> = (0..PATTERN_STEPS)
      .map(|step| {
        self
          .step(step)
          .iter()
          .copied()
          .filter(|action| !action.is_empty())
          .collect()
      })
      .collect();
    f.debug_struct("ChordPattern").field("steps", &steps).finish()
  }
}
