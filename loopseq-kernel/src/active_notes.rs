use loopseq_time::SampleTime;

pub const ACTIVE_NOTE_SLOTS: usize = 16;

/// A note triggered by the kernel that has not been released yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActiveNoteSlot {
  /// Held key the note was resolved from.
  pub source_pitch: u8,
  /// Pitch sent to the output.
  pub output_pitch: u8,
  /// Absolute sample time at which the note ends on its own.
  pub release_at: Option<SampleTime>,
  pub active: bool,
}

/// Fixed set of slots for the notes currently sounding.
///
/// Every note-on emitted by the chord player takes a slot, and the slot is freed
/// only by emitting the matching note-off.
#[derive(Debug, Clone)]
pub struct ActiveNoteTable {
  slots: [ActiveNoteSlot; ACTIVE_NOTE_SLOTS],
}

impl ActiveNoteTable {
  pub fn new() -> Self {
    Self {
      slots: [ActiveNoteSlot::default(); ACTIVE_NOTE_SLOTS],
    }
  }

  /// Takes the first free slot. Returns `None` when all of them are sounding.
  pub fn allocate(
    &mut self,
    source_pitch: u8,
    output_pitch: u8,
    release_at: Option<SampleTime>,
  ) -> Option<usize> {
    let index = self.slots.iter().position(|slot| !slot.active)?;
    self.slots[index] = ActiveNoteSlot {
      source_pitch,
      output_pitch,
      release_at,
      active: true,
    };
    Some(index)
  }

  pub fn find_source(&self, source_pitch: u8) -> Option<usize> {
    self
      .slots
      .iter()
      .position(|slot| slot.active && slot.source_pitch == source_pitch)
  }

  pub fn find_output(&self, output_pitch: u8) -> Option<usize> {
    self
      .slots
      .iter()
      .position(|slot| slot.active && slot.output_pitch == output_pitch)
  }

  pub fn get(&self, index: usize) -> Option<&ActiveNoteSlot> {
    self.slots.get(index).filter(|slot| slot.active)
  }

  /// Frees a slot, returning it when it was sounding.
  pub fn release(&mut self, index: usize) -> Option<ActiveNoteSlot> {
    let slot = self.slots.get_mut(index)?;
    if slot.active {
      slot.active = false;
      Some(*slot)
    } else {
      None
    }
  }

  /// Frees every sounding slot accepted by `predicate`, calling `on_release` for each one.
  pub fn release_matching<P, F>(&mut self, mut predicate: P, mut on_release: F) -> usize
  where
    P: FnMut(&ActiveNoteSlot) -> bool,
    F: FnMut(&ActiveNoteSlot),
  {
    let mut count = 0;
    for slot in self.slots.iter_mut() {
      if slot.active && predicate(slot) {
        slot.active = false;
        on_release(slot);
        count += 1;
      }
    }
    count
  }

  /// Pulls every pending release forward to `latest` at most.
  pub fn limit_releases(&mut self, latest: SampleTime) {
    for slot in self.slots.iter_mut().filter(|slot| slot.active) {
      if let Some(at) = slot.release_at.as_mut() {
        *at = (*at).min(latest);
      }
    }
  }

  pub fn len(&self) -> usize {
    self.slots.iter().filter(|slot| slot.active).count()
  }

  pub fn is_empty(&self) -> bool {
    self.slots.iter().all(|slot| !slot.active)
  }

  pub fn iter(&self) -> impl Iterator<Item = &ActiveNoteSlot> {
    self.slots.iter().filter(|slot| slot.active)
  }
}

impl Default for ActiveNoteTable {
  fn default() -> Self {
    Self::new()
  }
}
