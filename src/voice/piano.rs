//! Piano voice: 88 keys, optional natural recordings
//!
//! Natural piano notes ring on: the part of the recording a short note does
//! not play becomes the sustain tail, and the next note starts mixed over it.

use super::{render, unknown_key, NoteTable, SampleSource, Voice, VoiceKind};
use crate::error::{NoteError, Result};
use crate::generator::envelope::{apply_adsr, apply_gain, raise, release, Sustain, MAX_LEVEL};
use crate::generator::mixer::mix_overlay;
use crate::generator::{Keyboard, WHOLE_NOTE};
use crate::pipeline::note::{Duration, Note};

pub struct Piano {
    table: NoteTable,
}

impl Piano {
    pub fn new(samples: Option<&dyn SampleSource>) -> Result<Self> {
        Ok(Self {
            table: NoteTable::build(Keyboard::piano()?, WHOLE_NOTE, samples),
        })
    }

    pub(crate) fn natural_count(&self) -> usize {
        self.table.natural_count()
    }
}

/// Replace the sustain tail with what this note leaves unplayed
fn carry_tail(source: &[i16], note: &Note, sustain: &mut Sustain) {
    let cut = match note.duration {
        Duration::Whole => source.len() / 3,
        _ => note.buffer.len(),
    };
    sustain.capture_tail(source.get(cut..).unwrap_or_default());
    apply_gain(&mut sustain.tail, note.gain());

    let hold = cut / 10 * sustain.release as usize;
    let ratio = sustain.sustain as f64 / 10.0;
    release(&mut sustain.tail, hold, ratio);
}

impl Voice for Piano {
    fn kind(&self) -> VoiceKind {
        VoiceKind::Piano
    }

    fn keyboard(&self) -> &Keyboard {
        self.table.keyboard()
    }

    fn get_note(&self, note: &mut Note, sustain: &mut Sustain) -> std::result::Result<(), NoteError> {
        let (source, natural) = self
            .table
            .source(note.key, note.band)
            .ok_or_else(|| unknown_key(note))?;

        note.buffer = render(source, note, natural);
        if natural {
            mix_overlay(&mut note.buffer, &sustain.tail);
            carry_tail(source, note, sustain);
        }
        Ok(())
    }

    fn sustain_note(&self, note: &mut Note, sustain: &Sustain) {
        if self.is_natural_voice_active() {
            raise(&mut note.buffer, (MAX_LEVEL - sustain.attack.min(MAX_LEVEL)) as f64 / 100.0 * 2.0);
            release(&mut note.buffer, 0, (1 + sustain.release) as f64 / 10.0);
            return;
        }

        // Synthesized piano always strikes with the longest attack
        let struck = Sustain {
            attack: MAX_LEVEL,
            tail: Vec::new(),
            ..*sustain
        };
        apply_adsr(&mut note.buffer, &struck);
    }

    fn is_natural_voice_active(&self) -> bool {
        self.table.is_natural_active()
    }

    fn set_computer_voice(&self, enabled: bool) {
        self.table.set_computer_voice(enabled);
    }

    fn carries_tail(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{OctaveBand, CHUNK};
    use crate::voice::samples::SampleMap;
    use crate::voice::tests::shared_voices;

    /// In-memory recordings: a constant tone for middle C only
    struct FixedSamples;

    impl SampleSource for FixedSamples {
        fn load(&self, keyboard: &Keyboard) -> SampleMap {
            let mut map = SampleMap::new();
            if let Some((key, band)) = keyboard.key_for_name("C4") {
                let tone = (0..WHOLE_NOTE)
                    .map(|i| if (i / 50) % 2 == 0 { 8000 } else { -8000 })
                    .collect();
                map.insert((key, band), tone);
            }
            map
        }
    }

    fn natural_piano() -> Piano {
        Piano::new(Some(&FixedSamples)).unwrap()
    }

    fn quarter(key: char) -> Note {
        let mut note = Note::new(key, OctaveBand::Right456, Duration::Quarter);
        note.measure();
        note
    }

    #[test]
    fn test_natural_note_leaves_tail() {
        let piano = natural_piano();
        assert!(piano.is_natural_voice_active());

        let mut sustain = Sustain::default();
        let mut note = quarter('q');
        piano.get_note(&mut note, &mut sustain).unwrap();
        assert!(!sustain.tail.is_empty());
        assert!(sustain.tail.len() <= crate::generator::QUARTER_NOTE);

        // The next note starts mixed over the tail
        let plain = render(&FixedSamples.load(piano.keyboard())[&('q', OctaveBand::Right456)], &note, true);
        let mut next = quarter('q');
        piano.get_note(&mut next, &mut sustain).unwrap();
        assert_ne!(next.buffer[..100], plain[..100]);
    }

    #[test]
    fn test_missing_recording_falls_back_to_synthesis() {
        let piano = natural_piano();
        let mut sustain = Sustain::default();
        let mut note = quarter('w');
        piano.get_note(&mut note, &mut sustain).unwrap();
        assert!(sustain.tail.is_empty());
        assert!(note.buffer.len() > note.sample_count - CHUNK);
    }

    #[test]
    fn test_computer_voice_toggle() {
        let piano = natural_piano();
        piano.set_computer_voice(true);
        assert!(!piano.is_natural_voice_active());

        let mut sustain = Sustain::default();
        let mut note = quarter('q');
        piano.get_note(&mut note, &mut sustain).unwrap();
        assert!(sustain.tail.is_empty());

        piano.set_computer_voice(false);
        assert!(piano.is_natural_voice_active());
    }

    #[test]
    fn test_natural_envelope() {
        let piano = natural_piano();
        let mut sustain = Sustain::default();
        let mut note = quarter('q');
        piano.get_note(&mut note, &mut sustain).unwrap();
        piano.sustain_note(&mut note, &sustain);
        assert_eq!(note.buffer[0], 0);
        assert!(note.buffer.last().map_or(true, |s| s.abs() < 100));
    }

    #[test]
    fn test_range_is_88_keys() {
        let piano = shared_voices().get(VoiceKind::Piano);
        assert_eq!(piano.keyboard().len(), 88);

        let mut sustain = Sustain::default();
        let mut low = Note::new('.', OctaveBand::Octave0, Duration::Sixteenth);
        low.measure();
        assert!(piano.get_note(&mut low, &mut sustain).is_ok());

        let mut c8 = Note::new('i', OctaveBand::Far78, Duration::Sixteenth);
        c8.measure();
        assert!(piano.get_note(&mut c8, &mut sustain).is_ok());
        let mut past_c8 = Note::new('9', OctaveBand::Far78, Duration::Sixteenth);
        past_c8.measure();
        assert!(piano.get_note(&mut past_c8, &mut sustain).is_err());
    }
}
