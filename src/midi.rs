//! Standard MIDI File to beep notation
//!
//! Every note-on with a non-zero velocity becomes one key character, preceded
//! by a band control whenever the band changes. MIDI notes 21 to 108 cover
//! the piano keyboard; anything else is skipped. Timing is not carried over:
//! the text plays with the interpreter's current duration and tempo.

use crate::error::Result;
use crate::generator::keyboard::KEYS;
use crate::generator::OctaveBand;
use midly::{MidiMessage, Smf, TrackEventKind};
use std::path::Path;

/// Lowest MIDI note on the keyboard (A0)
pub const FIRST_NOTE: u8 = 21;
/// Highest MIDI note on the keyboard (C8)
pub const LAST_NOTE: u8 = 108;
/// Notes written before a line break
pub const NOTES_PER_LINE: usize = 50;

/// Band and key character of a MIDI note number
pub fn key_for_midi_note(note: u8) -> Option<(OctaveBand, char)> {
    let (band, index) = match note {
        21..=23 => (OctaveBand::Octave0, 33 + (note - 21) as usize),
        24..=59 => (OctaveBand::Left123, (note - 24) as usize),
        60..=95 => (OctaveBand::Right456, (note - 60) as usize),
        96..=108 => (OctaveBand::Far78, (note - 96) as usize),
        _ => return None,
    };
    KEYS.chars().nth(index).map(|key| (band, key))
}

/// Accumulates notation text note by note
#[derive(Debug, Default)]
pub struct NotationWriter {
    band: Option<OctaveBand>,
    count: usize,
    text: String,
}

impl NotationWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one MIDI note; returns false if it is off the keyboard
    pub fn push(&mut self, note: u8) -> bool {
        let Some((band, key)) = key_for_midi_note(note) else {
            log::warn!("invalid MIDI note code: {}", note);
            return false;
        };
        if self.band != Some(band) {
            self.text.push_str(band.prefix());
            self.band = Some(band);
        }
        self.text.push(key);

        self.count += 1;
        if self.count == NOTES_PER_LINE {
            self.text.push('\n');
            self.count = 0;
        }
        true
    }

    pub fn finish(mut self) -> String {
        if self.count > 0 {
            self.text.push('\n');
        }
        self.text
    }
}

/// Notation for every sounding note-on, track by track
pub fn smf_to_notation(smf: &Smf) -> String {
    let mut writer = NotationWriter::new();
    for track in &smf.tracks {
        for event in track {
            if let TrackEventKind::Midi {
                message: MidiMessage::NoteOn { key, vel },
                ..
            } = event.kind
            {
                if vel.as_int() > 0 {
                    writer.push(key.as_int());
                }
            }
        }
    }
    writer.finish()
}

pub fn midi_to_notation(bytes: &[u8]) -> Result<String> {
    let smf = Smf::parse(bytes)?;
    log::debug!("MIDI file: {:?}, {} tracks", smf.header.format, smf.tracks.len());
    Ok(smf_to_notation(&smf))
}

pub fn load_midi(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    midi_to_notation(&bytes)
}
