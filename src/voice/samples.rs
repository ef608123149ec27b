//! Natural voice recordings
//!
//! A voice is packaged as `<voices>/<voice>.zip` holding one WAV file per
//! note, named after the note (`C4.wav`, `Bb3.wav`, ...). An unpacked
//! `<voices>/<voice>/` directory works the same way. Recordings must be
//! 44.1 kHz 16-bit integer PCM. Anything else is skipped with a warning and
//! that pitch stays synthesized.

use crate::generator::{trim_wave, Keyboard, OctaveBand, SAMPLE_RATE, WHOLE_NOTE};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// Recorded whole-note buffers keyed by notation key and band
pub type SampleMap = HashMap<(char, OctaveBand), Vec<i16>>;

/// Where a voice finds its recordings
pub trait SampleSource: Send + Sync {
    /// Load every recording that matches a key of `keyboard`
    ///
    /// An unavailable source returns an empty map.
    fn load(&self, keyboard: &Keyboard) -> SampleMap;
}

/// Reads `<root>/<NoteName>.wav` files
#[derive(Debug, Clone)]
pub struct SampleDir {
    root: PathBuf,
}

impl SampleDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl SampleSource for SampleDir {
    fn load(&self, keyboard: &Keyboard) -> SampleMap {
        let mut samples = SampleMap::new();

        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(_) => {
                log::debug!("no natural samples at {}", self.root.display());
                return samples;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("wav") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Some(slot) = keyboard.key_for_name(name) else {
                log::warn!("unknown note name in voice file: {}", path.display());
                continue;
            };
            match read_sample(&path) {
                Ok(buf) => {
                    samples.insert(slot, buf);
                }
                Err(e) => log::warn!("skipping voice file {}: {}", path.display(), e),
            }
        }

        log::debug!(
            "loaded {} natural samples from {}",
            samples.len(),
            self.root.display()
        );
        samples
    }
}

/// Reads the `<NoteName>.wav` entries of a voice archive
#[derive(Debug, Clone)]
pub struct SampleArchive {
    path: PathBuf,
}

impl SampleArchive {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Note name of an archive entry such as `piano/C4.wav`
fn entry_note_name(entry: &str) -> Option<&str> {
    entry.rsplit('/').next()?.strip_suffix(".wav")
}

impl SampleSource for SampleArchive {
    fn load(&self, keyboard: &Keyboard) -> SampleMap {
        let mut samples = SampleMap::new();

        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(_) => {
                log::debug!("no voice archive at {}", self.path.display());
                return samples;
            }
        };
        let mut archive = match zip::ZipArchive::new(BufReader::new(file)) {
            Ok(archive) => archive,
            Err(e) => {
                log::warn!("unreadable voice archive {}: {}", self.path.display(), e);
                return samples;
            }
        };

        for i in 0..archive.len() {
            let entry = match archive.by_index(i) {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("unable to open entry {} of {}: {}", i, self.path.display(), e);
                    continue;
                }
            };
            if entry.is_dir() {
                continue;
            }
            let entry_name = entry.name().to_string();
            let Some(name) = entry_note_name(&entry_name) else {
                continue;
            };
            let Some(slot) = keyboard.key_for_name(name) else {
                log::warn!("unknown note name in voice file: {}", entry_name);
                continue;
            };
            match read_sample_from(BufReader::new(entry)) {
                Ok(buf) => {
                    samples.insert(slot, buf);
                }
                Err(e) => log::warn!("skipping voice file {}: {}", entry_name, e),
            }
        }

        log::debug!(
            "loaded {} natural samples from {}",
            samples.len(),
            self.path.display()
        );
        samples
    }
}

/// Recordings of one voice, packaged or unpacked
#[derive(Debug, Clone)]
pub enum VoiceSamples {
    Archive(SampleArchive),
    Dir(SampleDir),
}

impl VoiceSamples {
    /// `<root>/<voice>.zip` when it exists, otherwise `<root>/<voice>/`
    pub fn locate(root: &Path, voice: &str) -> Self {
        let archive = root.join(format!("{}.zip", voice));
        if archive.is_file() {
            VoiceSamples::Archive(SampleArchive::new(archive))
        } else {
            VoiceSamples::Dir(SampleDir::new(root.join(voice)))
        }
    }
}

impl SampleSource for VoiceSamples {
    fn load(&self, keyboard: &Keyboard) -> SampleMap {
        match self {
            VoiceSamples::Archive(archive) => archive.load(keyboard),
            VoiceSamples::Dir(dir) => dir.load(keyboard),
        }
    }
}

/// Error reading a single recording
#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error("{0}")]
    Wav(#[from] hound::Error),

    #[error("expected 44100 Hz 16-bit integer PCM, found {rate} Hz {bits}-bit {format:?}")]
    Format {
        rate: u32,
        bits: u16,
        format: hound::SampleFormat,
    },
}

/// Read one recording file as mono, padded with silence to a whole note
pub fn read_sample(path: &Path) -> Result<Vec<i16>, SampleError> {
    to_mono(hound::WavReader::open(path)?)
}

/// Read one recording from a stream, e.g. an archive entry
pub fn read_sample_from<R: Read>(reader: R) -> Result<Vec<i16>, SampleError> {
    to_mono(hound::WavReader::new(reader)?)
}

fn to_mono<R: Read>(mut reader: hound::WavReader<R>) -> Result<Vec<i16>, SampleError> {
    let spec = reader.spec();
    if spec.sample_rate != SAMPLE_RATE
        || spec.bits_per_sample != 16
        || spec.sample_format != hound::SampleFormat::Int
    {
        return Err(SampleError::Format {
            rate: spec.sample_rate,
            bits: spec.bits_per_sample,
            format: spec.sample_format,
        });
    }

    let channels = spec.channels.max(1) as usize;
    let mut buf = reader
        .samples::<i16>()
        .step_by(channels)
        .collect::<Result<Vec<i16>, _>>()?;

    trim_wave(&mut buf);
    if buf.len() < WHOLE_NOTE {
        buf.resize(WHOLE_NOTE, 0);
    }
    Ok(buf)
}
