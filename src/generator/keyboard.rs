//! Keyboard table: notation keys to frequencies and note names
//!
//! The same 36 key characters are reused in every octave band:
//!
//! ```text
//!   |2|3| |5|6|7| |9|0| |=|a|s| |f|g| |j|k|l|
//!  |q|w|e|r|t|y|u|i|o|p|[|]|z|x|c|v|b|n|m|,|.|
//! ```
//!
//! `q` in the right hand band is middle C. Frequencies follow 12-tone equal
//! temperament with A4 = 440 Hz.

use std::collections::HashMap;
use thiserror::Error;

/// Key characters in ascending semitone order
pub const KEYS: &str = "q2w3er5t6y7ui9o0p[=]azsxcfvgbnjmk,l.";

/// Keyboard region selected with the `H` control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OctaveBand {
    /// A0..B0, keys `,l.`
    Octave0,
    /// Octaves 1-3, left hand
    Left123,
    /// Octaves 4-6, right hand
    Right456,
    /// Octave 7 and C8
    Far78,
}

impl OctaveBand {
    pub const ALL: [OctaveBand; 4] = [
        OctaveBand::Octave0,
        OctaveBand::Left123,
        OctaveBand::Right456,
        OctaveBand::Far78,
    ];

    /// Parse the argument of an `H` control
    pub fn from_control(c: char) -> Option<Self> {
        match c {
            '0' => Some(OctaveBand::Octave0),
            'L' => Some(OctaveBand::Left123),
            'R' => Some(OctaveBand::Right456),
            '7' | 'F' => Some(OctaveBand::Far78),
            _ => None,
        }
    }

    /// Notation that selects this band
    pub fn prefix(&self) -> &'static str {
        match self {
            OctaveBand::Octave0 => "H0",
            OctaveBand::Left123 => "HL",
            OctaveBand::Right456 => "HR",
            OctaveBand::Far78 => "H7",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyboardError {
    #[error("{band:?} has {keys} keys, {frequencies} frequencies and {names} names")]
    LengthMismatch {
        band: OctaveBand,
        keys: usize,
        frequencies: usize,
        names: usize,
    },
    #[error("duplicate key '{key}' in {band:?}")]
    DuplicateKey { key: char, band: OctaveBand },
    #[error("duplicate note name {0}")]
    DuplicateName(String),
}

/// Key characters, frequencies and names for one band
///
/// All three must have the same length.
#[derive(Debug, Clone, Copy)]
pub struct BandLayout<'a> {
    pub band: OctaveBand,
    pub keys: &'a str,
    pub frequencies: &'a [f64],
    pub names: &'a [&'a str],
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyEntry {
    pub key: char,
    pub band: OctaveBand,
    pub frequency_hz: f64,
    pub name: String,
}

/// Bidirectional key/name lookup for one instrument range
#[derive(Debug, Clone)]
pub struct Keyboard {
    entries: Vec<KeyEntry>,
    by_key: HashMap<(OctaveBand, char), usize>,
    by_name: HashMap<String, usize>,
}

impl Keyboard {
    /// Build a keyboard from band layouts, lowest band first
    ///
    /// Fails if any layout's keys, frequencies and names disagree in length,
    /// since the key mapping would silently shift otherwise.
    pub fn new(layouts: &[BandLayout<'_>]) -> Result<Self, KeyboardError> {
        let mut keyboard = Keyboard {
            entries: Vec::new(),
            by_key: HashMap::new(),
            by_name: HashMap::new(),
        };

        for layout in layouts {
            let keys: Vec<char> = layout.keys.chars().collect();
            if keys.len() != layout.frequencies.len() || keys.len() != layout.names.len() {
                return Err(KeyboardError::LengthMismatch {
                    band: layout.band,
                    keys: keys.len(),
                    frequencies: layout.frequencies.len(),
                    names: layout.names.len(),
                });
            }

            for ((&key, &frequency_hz), &name) in keys
                .iter()
                .zip(layout.frequencies.iter())
                .zip(layout.names.iter())
            {
                let index = keyboard.entries.len();
                if keyboard.by_key.insert((layout.band, key), index).is_some() {
                    return Err(KeyboardError::DuplicateKey {
                        key,
                        band: layout.band,
                    });
                }
                if keyboard.by_name.insert(name.to_string(), index).is_some() {
                    return Err(KeyboardError::DuplicateName(name.to_string()));
                }
                keyboard.entries.push(KeyEntry {
                    key,
                    band: layout.band,
                    frequency_hz,
                    name: name.to_string(),
                });
            }
        }

        Ok(keyboard)
    }

    /// Full 88-key piano range, A0 to C8
    pub fn piano() -> Result<Self, KeyboardError> {
        Keyboard::new(&[
            BandLayout {
                band: OctaveBand::Octave0,
                keys: &KEYS[33..],
                frequencies: &FREQ_OCTAVE_0,
                names: &NAMES_OCTAVE_0,
            },
            BandLayout {
                band: OctaveBand::Left123,
                keys: KEYS,
                frequencies: &FREQ_LEFT_123,
                names: &NAMES_LEFT_123,
            },
            BandLayout {
                band: OctaveBand::Right456,
                keys: KEYS,
                frequencies: &FREQ_RIGHT_456,
                names: &NAMES_RIGHT_456,
            },
            BandLayout {
                band: OctaveBand::Far78,
                keys: &KEYS[..13],
                frequencies: &FREQ_FAR_78,
                names: &NAMES_FAR_78,
            },
        ])
    }

    /// Violin range, G3 to E7
    pub fn violin() -> Result<Self, KeyboardError> {
        Keyboard::new(&[
            BandLayout {
                band: OctaveBand::Left123,
                keys: &KEYS[31..],
                frequencies: &FREQ_LEFT_123[31..],
                names: &NAMES_LEFT_123[31..],
            },
            BandLayout {
                band: OctaveBand::Right456,
                keys: KEYS,
                frequencies: &FREQ_RIGHT_456,
                names: &NAMES_RIGHT_456,
            },
            BandLayout {
                band: OctaveBand::Far78,
                keys: &KEYS[..5],
                frequencies: &FREQ_FAR_78[..5],
                names: &NAMES_FAR_78[..5],
            },
        ])
    }

    /// Frequency and note name of a key, if the band maps it
    pub fn lookup(&self, key: char, band: OctaveBand) -> Option<(f64, &str)> {
        self.entry(key, band)
            .map(|entry| (entry.frequency_hz, entry.name.as_str()))
    }

    pub fn entry(&self, key: char, band: OctaveBand) -> Option<&KeyEntry> {
        self.by_key.get(&(band, key)).map(|&i| &self.entries[i])
    }

    /// Reverse lookup from a note name such as `Bb3`
    pub fn key_for_name(&self, name: &str) -> Option<(char, OctaveBand)> {
        self.by_name.get(name).map(|&i| {
            let entry = &self.entries[i];
            (entry.key, entry.band)
        })
    }

    /// All keys in ascending pitch order
    pub fn entries(&self) -> &[KeyEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

const FREQ_OCTAVE_0: [f64; 3] = [27.50, 29.13, 30.86];

const FREQ_LEFT_123: [f64; 36] = [
    32.70, 34.64, 36.70, 38.89, 41.20, 43.65, 46.24, 48.99, 51.91, 55.00, 58.27, 61.73, // 1
    65.40, 69.29, 73.41, 77.78, 82.40, 87.30, 92.49, 97.99, 103.8, 110.0, 116.5, 123.4, // 2
    130.8, 138.5, 146.8, 155.5, 164.8, 174.6, 185.0, 196.0, 207.6, 220.0, 233.0, 246.9, // 3
];

const FREQ_RIGHT_456: [f64; 36] = [
    261.6, 277.1, 293.6, 311.1, 329.6, 349.2, 369.9, 392.0, 415.3, 440.0, 466.1, 493.8, // 4
    523.2, 554.3, 587.3, 622.2, 659.2, 698.4, 739.9, 783.9, 830.6, 880.0, 932.3, 987.7, // 5
    1046.5, 1108.7, 1174.6, 1244.5, 1318.5, 1396.9, 1479.9, 1567.0, 1661.0, 1760.0, 1864.0,
    1975.0, // 6
];

const FREQ_FAR_78: [f64; 13] = [
    2093.0, 2217.5, 2349.3, 2489.0, 2637.0, 2793.0, 2960.0, 3136.0, 3322.4, 3520.0, 3729.3,
    3951.1, // 7
    4186.0, // 8
];

const NAMES_OCTAVE_0: [&str; 3] = ["A0", "Bb0", "B0"];

const NAMES_LEFT_123: [&str; 36] = [
    "C1", "Db1", "D1", "Eb1", "E1", "F1", "Gb1", "G1", "Ab1", "A1", "Bb1", "B1", //
    "C2", "Db2", "D2", "Eb2", "E2", "F2", "Gb2", "G2", "Ab2", "A2", "Bb2", "B2", //
    "C3", "Db3", "D3", "Eb3", "E3", "F3", "Gb3", "G3", "Ab3", "A3", "Bb3", "B3",
];

const NAMES_RIGHT_456: [&str; 36] = [
    "C4", "Db4", "D4", "Eb4", "E4", "F4", "Gb4", "G4", "Ab4", "A4", "Bb4", "B4", //
    "C5", "Db5", "D5", "Eb5", "E5", "F5", "Gb5", "G5", "Ab5", "A5", "Bb5", "B5", //
    "C6", "Db6", "D6", "Eb6", "E6", "F6", "Gb6", "G6", "Ab6", "A6", "Bb6", "B6",
];

const NAMES_FAR_78: [&str; 13] = [
    "C7", "Db7", "D7", "Eb7", "E7", "F7", "Gb7", "G7", "Ab7", "A7", "Bb7", "B7", "C8",
];
