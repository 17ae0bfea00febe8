pub(crate) mod event;
pub(crate) mod filter;
pub mod messages;
pub mod note;
pub(crate) mod sink;

pub use event::MidiEvent;
pub use filter::Filter;
pub use messages::MidiMessage;
pub use sink::{MidiSink, OutputHandler};
