pub const NUM_PITCHES: usize = 128;

/// Keys currently held down, one flag per MIDI pitch.
///
/// Owned by the render context. Presses coming from the control context arrive
/// through the command queue.
#[derive(Clone)]
pub struct HeldNotes {
  held: [bool; NUM_PITCHES],
  count: usize,
}

impl HeldNotes {
  pub fn new() -> Self {
    Self {
      held: [false; NUM_PITCHES],
      count: 0,
    }
  }

  pub fn press(&mut self, pitch: u8) {
    if let Some(held) = self.held.get_mut(pitch as usize) {
      if !*held {
        *held = true;
        self.count += 1;
      }
    }
  }

  pub fn release(&mut self, pitch: u8) {
    if let Some(held) = self.held.get_mut(pitch as usize) {
      if *held {
        *held = false;
        self.count -= 1;
      }
    }
  }

  #[inline]
  pub fn is_held(&self, pitch: u8) -> bool {
    self.held.get(pitch as usize).copied().unwrap_or(false)
  }

  pub fn len(&self) -> usize {
    self.count
  }

  pub fn is_empty(&self) -> bool {
    self.count == 0
  }

  pub fn clear(&mut self) {
    self.held = [false; NUM_PITCHES];
    self.count = 0;
  }

  pub fn first_held(&self) -> Option<u8> {
    self.nth_held(0)
  }

  /// The `n`-th held pitch in ascending order, counting from zero.
  pub fn nth_held(&self, n: usize) -> Option<u8> {
    if n >= self.count {
      return None;
    }
    self.iter().nth(n)
  }

  /// Held pitches in ascending order.
  pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
    self
      .held
      .iter()
      .enumerate()
      .filter_map(|(pitch, held)| held.then(|| pitch as u8))
  }
}

impl Default for HeldNotes {
  fn default() -> Self {
    Self::new()
  }
}

impl std::fmt::Debug for HeldNotes {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_list().entries(self.iter()).finish()
  }
}
