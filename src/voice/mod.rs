//! Voices: per-pitch sample buffers and their envelopes
//!
//! Every voice keeps a table of pre-rendered buffers built once at start-up.
//! The computer voice synthesizes quarter notes. Piano and violin synthesize
//! whole notes and may replace them with natural recordings.

pub mod computer;
pub mod piano;
pub mod samples;
pub mod violin;

pub use computer::ComputerVoice;
pub use piano::Piano;
pub use samples::{SampleArchive, SampleDir, SampleMap, SampleSource, VoiceSamples};
pub use violin::Violin;

use crate::config::EngineConfig;
use crate::error::{NoteError, Result};
use crate::generator::envelope::{apply_gain, Sustain};
use crate::generator::{generate, trim_wave, Keyboard, OctaveBand, CHUNK};
use crate::pipeline::note::Note;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Voice selected with the `V` control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoiceKind {
    Computer,
    Piano,
    Violin,
}

impl VoiceKind {
    /// Parse the argument of a `V` control (`VN` is not a voice)
    pub fn from_control(c: char) -> Option<Self> {
        match c {
            'D' => Some(VoiceKind::Computer),
            'P' => Some(VoiceKind::Piano),
            'V' => Some(VoiceKind::Violin),
            _ => None,
        }
    }

    /// Name of the voice's sample directory
    pub fn name(&self) -> &'static str {
        match self {
            VoiceKind::Computer => "computer",
            VoiceKind::Piano => "piano",
            VoiceKind::Violin => "violin",
        }
    }
}

/// A timbre that turns notes into sample buffers
///
/// Tables are read-only after construction; only the computer-voice toggle
/// changes, so voices can be shared across threads behind an `Arc`.
pub trait Voice: Send + Sync {
    fn kind(&self) -> VoiceKind;

    fn keyboard(&self) -> &Keyboard;

    /// Fill `note.buffer` for `note.sample_count` samples
    ///
    /// Applies the note's gain and, for voices that carry one, mixes in and
    /// replaces the sustain tail. Fails for keys the voice does not map in
    /// the note's band.
    fn get_note(&self, note: &mut Note, sustain: &mut Sustain) -> std::result::Result<(), NoteError>;

    /// Shape `note.buffer` with this voice's envelope
    fn sustain_note(&self, note: &mut Note, sustain: &Sustain);

    fn is_natural_voice_active(&self) -> bool;

    /// Force synthesized output even when recordings are loaded
    fn set_computer_voice(&self, enabled: bool);

    /// Whether natural notes leave a tail for the next note
    fn carries_tail(&self) -> bool {
        false
    }
}

/// Synthesized and recorded whole-note buffers for one instrument
pub(crate) struct NoteTable {
    keyboard: Keyboard,
    synthesized: HashMap<(char, OctaveBand), Vec<i16>>,
    natural: SampleMap,
    natural_enabled: AtomicBool,
}

impl NoteTable {
    /// Synthesize `length` samples for every key, then load recordings
    pub(crate) fn build(
        keyboard: Keyboard,
        length: usize,
        source: Option<&dyn SampleSource>,
    ) -> Self {
        let synthesized = keyboard
            .entries()
            .iter()
            .map(|entry| ((entry.key, entry.band), generate(entry.frequency_hz, length)))
            .collect();
        let natural = source.map(|s| s.load(&keyboard)).unwrap_or_default();
        let natural_enabled = AtomicBool::new(!natural.is_empty());

        Self {
            keyboard,
            synthesized,
            natural,
            natural_enabled,
        }
    }

    pub(crate) fn keyboard(&self) -> &Keyboard {
        &self.keyboard
    }

    /// Buffer for a key, preferring the recording when natural voice is on
    ///
    /// The flag tells whether the buffer is a recording.
    pub(crate) fn source(&self, key: char, band: OctaveBand) -> Option<(&[i16], bool)> {
        if self.is_natural_active() {
            if let Some(buf) = self.natural.get(&(key, band)) {
                return Some((buf.as_slice(), true));
            }
        }
        self.synthesized
            .get(&(key, band))
            .map(|buf| (buf.as_slice(), false))
    }

    pub(crate) fn is_natural_active(&self) -> bool {
        self.natural_enabled.load(Ordering::Relaxed)
    }

    pub(crate) fn set_computer_voice(&self, enabled: bool) {
        let natural = !enabled && !self.natural.is_empty();
        self.natural_enabled.store(natural, Ordering::Relaxed);
    }

    pub(crate) fn natural_count(&self) -> usize {
        self.natural.len()
    }
}

/// Cut or extend `source` to `target` samples and trim the edge
///
/// Extensions repeat the trimmed first [`CHUNK`] samples of a synthesized
/// source. Recordings are extended with silence instead.
pub(crate) fn fit_length(source: &[i16], target: usize, natural: bool) -> Vec<i16> {
    let mut buf = if source.len() >= target {
        source[..target].to_vec()
    } else {
        let mut loop_chunk = source[..source.len().min(CHUNK)].to_vec();
        trim_wave(&mut loop_chunk);

        let mut buf = Vec::with_capacity(target + CHUNK);
        buf.extend_from_slice(source);
        if natural || loop_chunk.is_empty() {
            buf.resize(target, 0);
        }
        while buf.len() < target {
            buf.extend_from_slice(&loop_chunk);
        }
        buf.truncate(target);
        buf
    };
    trim_wave(&mut buf);
    buf
}

/// Fit a note to its length and apply its gain
pub(crate) fn render(source: &[i16], note: &Note, natural: bool) -> Vec<i16> {
    let mut buf = fit_length(source, note.sample_count, natural);
    apply_gain(&mut buf, note.gain());
    buf
}

pub(crate) fn unknown_key(note: &Note) -> NoteError {
    NoteError::UnknownKey {
        key: note.key,
        band: note.band,
    }
}

/// The three voices of an engine
pub struct VoiceSet {
    computer: ComputerVoice,
    piano: Piano,
    violin: Violin,
}

impl VoiceSet {
    /// Build all voice tables, loading recordings when the config allows
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let piano_samples = config.sample_source(VoiceKind::Piano);
        let violin_samples = config.sample_source(VoiceKind::Violin);

        let set = Self {
            computer: ComputerVoice::new()?,
            piano: Piano::new(piano_samples.as_ref().map(|s| s as &dyn SampleSource))?,
            violin: Violin::new(violin_samples.as_ref().map(|s| s as &dyn SampleSource))?,
        };
        set.set_computer_voice(config.computer_voice);

        log::debug!(
            "voices ready: piano {} natural samples, violin {}",
            set.piano.natural_count(),
            set.violin.natural_count()
        );
        Ok(set)
    }

    /// Voices without any natural recordings
    pub fn synthesized() -> Result<Self> {
        Ok(Self {
            computer: ComputerVoice::new()?,
            piano: Piano::new(None)?,
            violin: Violin::new(None)?,
        })
    }

    pub fn get(&self, kind: VoiceKind) -> &dyn Voice {
        match kind {
            VoiceKind::Computer => &self.computer,
            VoiceKind::Piano => &self.piano,
            VoiceKind::Violin => &self.violin,
        }
    }

    pub fn set_computer_voice(&self, enabled: bool) {
        self.piano.set_computer_voice(enabled);
        self.violin.set_computer_voice(enabled);
    }
}
