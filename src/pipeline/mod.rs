//! Notation rendering pipeline
//!
//! - Note: durations, tempo-adjusted lengths, per-note state
//! - Parser: line interpreter producing rendered lines
//! - Sink: where finished lines go (WAV stream, playback callback, memory)
//! - Scheduler: line reading, rendering and the playback hand-off

pub mod note;
pub mod parser;
pub mod scheduler;
pub mod sink;

pub use note::{measure, rest_note, Duration, Note};
pub use parser::{Interpreter, Line, ParserContext};
pub use scheduler::{Music, Player};
pub use sink::{CallbackSink, Sink, WavSink};
