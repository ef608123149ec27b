//! Error types
//!
//! `Error` covers everything that stops a source from rendering. Problems with
//! a single note are reported through `NoteError` and never abort a line.

use crate::generator::keyboard::{KeyboardError, OctaveBand};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("line exceeds {limit} byte limit")]
    LineTooLong { limit: usize },

    #[error("line wave buffer exceeds {limit} byte limit")]
    LineBufferOverflow { limit: usize },

    #[error(transparent)]
    Keyboard(#[from] KeyboardError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("output sink failed: {0}")]
    Sink(String),

    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid MIDI file: {0}")]
    Midi(#[from] midly::Error),

    #[error("sheet not found: {0}")]
    SheetNotFound(String),
}

/// Recoverable failure to produce a note buffer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NoteError {
    #[error("invalid note: '{key}' in {band:?}")]
    UnknownKey { key: char, band: OctaveBand },
}
