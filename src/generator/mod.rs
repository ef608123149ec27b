//! Sample-level building blocks
//!
//! Everything here works on whole buffers of 16-bit mono samples at
//! [`SAMPLE_RATE`]. Note lengths are fixed sample counts derived from
//! [`WHOLE_NOTE`].

pub mod envelope;
pub mod harmonic;
pub mod keyboard;
pub mod mixer;

pub use envelope::Sustain;
pub use harmonic::{generate, trim_len, trim_wave};
pub use keyboard::{Keyboard, OctaveBand};
pub use mixer::mix_into;

/// Samples per second
pub const SAMPLE_RATE: u32 = 44100;
pub const SAMPLE_RATE_F64: f64 = SAMPLE_RATE as f64;

/// Full scale of a 16-bit sample
pub const SAMPLE_AMP_16BIT: f64 = 32767.0;

/// Samples in a whole note at the default tempo (1024 x 88)
pub const WHOLE_NOTE: usize = 1024 * 88;
pub const HALF_NOTE: usize = WHOLE_NOTE / 2;
pub const QUARTER_NOTE: usize = WHOLE_NOTE / 4;

/// Granularity of tempo extension loops and of the edge-trim search
pub const CHUNK: usize = 1024;
