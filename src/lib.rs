//! Beep notation music engine
//!
//! Interprets the line-oriented beep notation and renders it to 16-bit PCM:
//! - `generator`: keyboard table, harmonic synthesis, envelopes, mixing
//! - `voice`: computer, piano and violin voices with optional natural samples
//! - `pipeline`: notation interpreter, line scheduling and playback hand-off
//! - `wav`: canonical WAV header and stereo export
//! - `midi`, `sheet`: MIDI import and sheet storage
//! - `config`: engine settings, loadable from TOML

pub mod config;
pub mod error;
pub mod generator;
pub mod midi;
pub mod pipeline;
pub mod sheet;
pub mod voice;
pub mod wav;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use pipeline::{Line, Music};
