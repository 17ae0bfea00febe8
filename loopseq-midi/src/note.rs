const NOTE_NAMES: [&str; 12] = [
  "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Name of a MIDI note using the convention where note 60 is C4.
pub fn note_name(note: u8) -> String {
  let octave = (note / 12) as i32 - 1;
  format!("{}{}", NOTE_NAMES[(note % 12) as usize], octave)
}
