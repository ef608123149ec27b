//! Violin voice: G3 to E7, optional natural recordings, no tail carry-over

use super::{render, unknown_key, NoteTable, SampleSource, Voice, VoiceKind};
use crate::error::{NoteError, Result};
use crate::generator::envelope::{apply_adsr, raise, release, Sustain, MAX_LEVEL};
use crate::generator::{Keyboard, WHOLE_NOTE};
use crate::pipeline::note::Note;

pub struct Violin {
    table: NoteTable,
}

impl Violin {
    pub fn new(samples: Option<&dyn SampleSource>) -> Result<Self> {
        Ok(Self {
            table: NoteTable::build(Keyboard::violin()?, WHOLE_NOTE, samples),
        })
    }

    pub(crate) fn natural_count(&self) -> usize {
        self.table.natural_count()
    }
}

impl Voice for Violin {
    fn kind(&self) -> VoiceKind {
        VoiceKind::Violin
    }

    fn keyboard(&self) -> &Keyboard {
        self.table.keyboard()
    }

    fn get_note(&self, note: &mut Note, _sustain: &mut Sustain) -> std::result::Result<(), NoteError> {
        let (source, natural) = self
            .table
            .source(note.key, note.band)
            .ok_or_else(|| unknown_key(note))?;
        note.buffer = render(source, note, natural);
        Ok(())
    }

    fn sustain_note(&self, note: &mut Note, sustain: &Sustain) {
        if self.is_natural_voice_active() {
            // Bowed attack: a much slower raise than the piano's
            raise(&mut note.buffer, (MAX_LEVEL - sustain.attack.min(MAX_LEVEL)) as f64 / 10.0);
            release(&mut note.buffer, 0, (1 + sustain.release) as f64 / 10.0);
            return;
        }
        apply_adsr(&mut note.buffer, sustain);
    }

    fn is_natural_voice_active(&self) -> bool {
        self.table.is_natural_active()
    }

    fn set_computer_voice(&self, enabled: bool) {
        self.table.set_computer_voice(enabled);
    }
}
