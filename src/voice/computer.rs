//! Default synthesized voice
//!
//! Caches one quarter note per key. Halves and wholes are built by repeating
//! the quarter, shorter notes cut it.

use super::{render, unknown_key, NoteTable, Voice, VoiceKind};
use crate::error::{NoteError, Result};
use crate::generator::envelope::{apply_adsr, Sustain};
use crate::generator::{Keyboard, QUARTER_NOTE};
use crate::pipeline::note::{Duration, Note};

pub struct ComputerVoice {
    table: NoteTable,
}

impl ComputerVoice {
    pub fn new() -> Result<Self> {
        Ok(Self {
            table: NoteTable::build(Keyboard::piano()?, QUARTER_NOTE, None),
        })
    }
}

/// Copies of the cached quarter note needed for a duration
fn repeat_count(duration: Duration) -> usize {
    match duration {
        Duration::Whole => 4,
        Duration::Half => 2,
        _ => 1,
    }
}

impl Voice for ComputerVoice {
    fn kind(&self) -> VoiceKind {
        VoiceKind::Computer
    }

    fn keyboard(&self) -> &Keyboard {
        self.table.keyboard()
    }

    fn get_note(&self, note: &mut Note, _sustain: &mut Sustain) -> std::result::Result<(), NoteError> {
        let (quarter, _) = self
            .table
            .source(note.key, note.band)
            .ok_or_else(|| unknown_key(note))?;

        note.buffer = match repeat_count(note.duration) {
            1 => render(quarter, note, false),
            repeat => render(&quarter.repeat(repeat), note, false),
        };
        Ok(())
    }

    fn sustain_note(&self, note: &mut Note, sustain: &Sustain) {
        apply_adsr(&mut note.buffer, sustain);
    }

    fn is_natural_voice_active(&self) -> bool {
        false
    }

    fn set_computer_voice(&self, _enabled: bool) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{OctaveBand, CHUNK, HALF_NOTE, WHOLE_NOTE};
    use crate::voice::tests::shared_voices;

    fn render_note(duration: Duration, tempo: u8) -> Note {
        let voice = shared_voices().get(VoiceKind::Computer);
        let mut note = Note::new('t', OctaveBand::Right456, duration);
        note.tempo = tempo;
        note.measure();
        voice.get_note(&mut note, &mut Sustain::default()).unwrap();
        note
    }

    #[test]
    fn test_repeated_durations() {
        let whole = render_note(Duration::Whole, 4);
        assert!(whole.buffer.len() <= WHOLE_NOTE && whole.buffer.len() > WHOLE_NOTE - CHUNK);

        let half = render_note(Duration::Half, 4);
        assert!(half.buffer.len() <= HALF_NOTE && half.buffer.len() > HALF_NOTE - CHUNK);
    }

    #[test]
    fn test_divided_durations() {
        let eighth = render_note(Duration::Eighth, 4);
        assert!(eighth.buffer.len() <= QUARTER_NOTE / 2);
        let sixty_fourth = render_note(Duration::SixtyFourth, 4);
        assert!(sixty_fourth.buffer.len() <= QUARTER_NOTE / 16);
        assert!(!sixty_fourth.buffer.is_empty());
    }

    #[test]
    fn test_tempo_changes_length() {
        let slow = render_note(Duration::Quarter, 0);
        let fast = render_note(Duration::Quarter, 9);
        assert!(slow.buffer.len() > 26_132 - CHUNK);
        assert!(fast.buffer.len() <= 18_023);
    }

    #[test]
    fn test_unknown_key() {
        let voice = shared_voices().get(VoiceKind::Computer);
        let mut note = Note::new('q', OctaveBand::Octave0, Duration::Quarter);
        note.measure();
        let err = voice.get_note(&mut note, &mut Sustain::default()).unwrap_err();
        assert_eq!(
            err,
            NoteError::UnknownKey {
                key: 'q',
                band: OctaveBand::Octave0
            }
        );
    }

    #[test]
    fn test_envelope_silences_end() {
        let mut note = render_note(Duration::Quarter, 4);
        let voice = shared_voices().get(VoiceKind::Computer);
        voice.sustain_note(&mut note, &Sustain::default());
        let n = note.buffer.len();
        assert!(note.buffer[n - 10..].iter().all(|s| s.abs() < 200));
        assert_eq!(note.buffer[0], 0);
    }
}
