mod chords;
mod drums;

pub(crate) use chords::ChordPlayer;
pub(crate) use drums::play_drums;
