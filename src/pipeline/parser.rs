//! Interpreter for beep notation
//!
//! Format, one staff per line:
//! `VP SA8 SR9` `A9HRDE cc DScszs|DEc DQzDEobn|...VN`
//!
//! - Keys: `q2w3er5t6y7ui9o0p[=]azsxcfvgbnjmk,l.` in ascending semitones
//! - Controls: an uppercase prefix (`R D H T S A V C`) and an argument
//! - Ignored: `|`, space, tab
//! - `#` starts a comment line, a `##` line opens or closes a comment block
//! - A line ending in `VN` is mixed with the next line instead of following it
//!
//! Modal state (duration, band, tempo, voice, ...) carries over from line to
//! line until a control changes it.

use super::note::{measure, Duration, Note};
use crate::error::{Error, Result};
use crate::generator::envelope::Sustain;
use crate::generator::mixer::{mix_into, mix_overlay};
use crate::generator::OctaveBand;
use crate::voice::{VoiceKind, VoiceSet};
use std::sync::Arc;

/// Letters that start a control directive
pub const CONTROL_PREFIXES: &str = "RDHTSAVC";

/// Trailing marker that mixes a line with the next one
pub const HARMONY_MARKER: &str = "VN";

/// Bytes of 16-bit samples one line may render to
pub const LINE_BUFFER_LIMIT: usize = 100 * 1024 * 1024;

fn is_ignored(c: char) -> bool {
    matches!(c, '|' | ' ' | '\t')
}

fn digit(c: char) -> Option<u8> {
    c.to_digit(10).map(|d| d as u8)
}

fn append(line: &mut Line, samples: &[i16]) -> Result<()> {
    line.samples.extend_from_slice(samples);
    if line.samples.len() * 2 > LINE_BUFFER_LIMIT {
        return Err(Error::LineBufferOverflow {
            limit: LINE_BUFFER_LIMIT,
        });
    }
    Ok(())
}

/// A rendered line (or group of harmony-linked lines)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Line {
    /// Source text, linked lines joined with newlines
    pub text: String,
    /// Names of the notes played, in order
    pub notes: Vec<String>,
    /// Mono samples
    pub samples: Vec<i16>,
}

impl Line {
    pub fn left(&self) -> &[i16] {
        &self.samples
    }

    /// Both channels carry the same mix
    pub fn right(&self) -> &[i16] {
        &self.samples
    }

    pub fn is_silent(&self) -> bool {
        self.samples.is_empty()
    }

    fn text_only(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Default::default()
        }
    }

    fn link(&mut self, next: Line) {
        mix_into(&mut self.samples, &next.samples);
        self.text.push('\n');
        self.text.push_str(&next.text);
        self.notes.extend(next.notes);
    }
}

/// Pitch characters collected into one simultaneous chord
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chord {
    /// Notes per chord; below 2 chords are off
    pub target: usize,
    pub count: usize,
    pub buffer: Vec<i16>,
}

impl Chord {
    pub fn is_active(&self) -> bool {
        self.target >= 2
    }

    /// Add a note; returns the mixed chord once `target` notes are in
    fn push(&mut self, samples: Vec<i16>) -> Option<Vec<i16>> {
        if self.count == 0 {
            self.buffer = samples;
        } else {
            mix_into(&mut self.buffer, &samples);
        }
        self.count += 1;

        if self.count < self.target {
            return None;
        }
        self.count = 0;
        Some(std::mem::take(&mut self.buffer))
    }

    /// Forget a partly collected chord, returning how many notes it had
    fn drop_pending(&mut self) -> usize {
        let dropped = self.count;
        self.count = 0;
        self.buffer.clear();
        dropped
    }
}

/// Mutable state threaded through every character of a sheet
#[derive(Debug, Clone, PartialEq)]
pub struct ParserContext {
    /// Control prefix waiting for its argument
    pub pending: Option<char>,
    /// Sustain parameter (`A D S R`) waiting for its level
    pub sustain_param: Option<char>,
    pub duration: Duration,
    /// Dot the next note or rest
    pub dotted: bool,
    pub band: OctaveBand,
    pub tempo: u8,
    pub amplitude: u8,
    pub voice: VoiceKind,
    pub sustain: Sustain,
    pub chord: Chord,
    pub block_comment: bool,
    /// The previous line ended with the harmony marker
    pub linked: bool,
    /// 1-based number of the line being read
    pub line_no: usize,
}

impl Default for ParserContext {
    fn default() -> Self {
        Self {
            pending: None,
            sustain_param: None,
            duration: Duration::Quarter,
            dotted: false,
            band: OctaveBand::Right456,
            tempo: 4,
            amplitude: 9,
            voice: VoiceKind::Computer,
            sustain: Sustain::default(),
            chord: Chord::default(),
            block_comment: false,
            linked: false,
            line_no: 0,
        }
    }
}

/// Turns notation lines into rendered [`Line`]s
pub struct Interpreter {
    voices: Arc<VoiceSet>,
    volume: i32,
    ctx: ParserContext,
    /// Lines linked with the harmony marker, waiting for the last of them
    harmony: Option<Line>,
}

impl Interpreter {
    /// `volume` is the engine volume on the 16-bit scale
    pub fn new(voices: Arc<VoiceSet>, volume: i32) -> Self {
        Self {
            voices,
            volume,
            ctx: ParserContext::default(),
            harmony: None,
        }
    }

    pub fn context(&self) -> &ParserContext {
        &self.ctx
    }

    /// Interpret one line
    ///
    /// Returns a finished line when there is something to hand to a sink.
    /// Comments and blank lines come back as text without samples so the
    /// sheet can be echoed as written; a line linked to the next one returns
    /// `None`. Only a line buffer over [`LINE_BUFFER_LIMIT`] is an error.
    pub fn feed_line(&mut self, raw: &str) -> Result<Option<Line>> {
        self.ctx.line_no += 1;
        let line = raw.trim_end_matches(|c| c == '\r' || c == '\n');

        if line.starts_with("##") {
            self.ctx.block_comment = !self.ctx.block_comment;
            return Ok(Some(Line::text_only(line)));
        }
        if self.ctx.block_comment || line.starts_with('#') || line.trim().is_empty() {
            return Ok(Some(Line::text_only(line)));
        }

        let linked = line.trim_end().ends_with(HARMONY_MARKER);
        if self.ctx.linked {
            // A linked staff starts without the previous staff's tail
            self.ctx.sustain.clear_tail();
        }

        let mut rendered = Line {
            text: line.to_string(),
            ..Default::default()
        };
        for c in line.chars() {
            self.scan(c, &mut rendered)?;
        }
        self.end_line(linked);

        if let Some(mut group) = self.harmony.take() {
            group.link(rendered);
            rendered = group;
        }
        if linked {
            self.harmony = Some(rendered);
            return Ok(None);
        }
        Ok(Some(rendered))
    }

    /// Flush a harmony group left open by the last line of a sheet
    pub fn finish(&mut self) -> Option<Line> {
        self.ctx.linked = false;
        self.harmony.take()
    }

    fn scan(&mut self, c: char, line: &mut Line) -> Result<()> {
        if is_ignored(c) {
            return Ok(());
        }
        if let Some(prefix) = self.ctx.pending.take() {
            return self.control(prefix, c, line);
        }
        if CONTROL_PREFIXES.contains(c) {
            self.ctx.pending = Some(c);
            return Ok(());
        }
        self.play(c, line)
    }

    fn control(&mut self, prefix: char, arg: char, line: &mut Line) -> Result<()> {
        let ctx = &mut self.ctx;
        let accepted = match prefix {
            'D' if arg == 'D' => {
                ctx.dotted = true;
                true
            }
            'D' => Duration::from_control(arg)
                .map(|d| ctx.duration = d)
                .is_some(),
            'R' => match Duration::from_control(arg) {
                Some(d) => {
                    self.rest(d, line)?;
                    true
                }
                None => false,
            },
            'H' => OctaveBand::from_control(arg)
                .map(|b| ctx.band = b)
                .is_some(),
            'T' => digit(arg).map(|t| ctx.tempo = t).is_some(),
            'A' => digit(arg).map(|a| ctx.amplitude = a).is_some(),
            'V' if arg == 'N' => true,
            'V' => match VoiceKind::from_control(arg) {
                Some(kind) => {
                    if kind != ctx.voice {
                        ctx.sustain.clear_tail();
                        ctx.voice = kind;
                    }
                    true
                }
                None => false,
            },
            'S' => match (ctx.sustain_param.take(), digit(arg)) {
                (Some(param), Some(level)) => ctx.sustain.set_level(param, level),
                (None, _) if "ADSR".contains(arg) => {
                    ctx.sustain_param = Some(arg);
                    ctx.pending = Some('S');
                    true
                }
                _ => false,
            },
            'C' => match digit(arg) {
                Some(n) => {
                    let dropped = ctx.chord.drop_pending();
                    if dropped > 0 {
                        log::warn!("line {}: incomplete chord of {} notes dropped", ctx.line_no, dropped);
                    }
                    ctx.chord.target = n as usize;
                    true
                }
                None => false,
            },
            _ => false,
        };

        if !accepted {
            log::warn!(
                "line {}: invalid control {}{}",
                self.ctx.line_no,
                prefix,
                arg
            );
        }
        Ok(())
    }

    fn rest(&mut self, duration: Duration, line: &mut Line) -> Result<()> {
        let ctx = &mut self.ctx;
        let mut samples = vec![0; measure(duration, ctx.dotted, ctx.tempo)];
        ctx.dotted = false;

        // A rest lets the previous natural note ring out
        if self.voices.get(ctx.voice).carries_tail() && !ctx.sustain.tail.is_empty() {
            mix_overlay(&mut samples, &ctx.sustain.tail);
            ctx.sustain.clear_tail();
        }
        append(line, &samples)
    }

    fn play(&mut self, key: char, line: &mut Line) -> Result<()> {
        let ctx = &mut self.ctx;
        let mut note = Note::new(key, ctx.band, ctx.duration);
        note.dotted = std::mem::take(&mut ctx.dotted);
        note.volume = self.volume;
        note.amplitude = ctx.amplitude;
        note.tempo = ctx.tempo;
        note.measure();

        let voice = self.voices.get(ctx.voice);
        if let Err(e) = voice.get_note(&mut note, &mut ctx.sustain) {
            log::warn!("line {}: {}", ctx.line_no, e);
            return Ok(());
        }
        voice.sustain_note(&mut note, &ctx.sustain);

        if let Some((_, name)) = voice.keyboard().lookup(note.key, note.band) {
            line.notes.push(name.to_string());
        }

        if !ctx.chord.is_active() {
            return append(line, &note.buffer);
        }
        match ctx.chord.push(note.buffer) {
            Some(chord) => append(line, &chord),
            None => Ok(()),
        }
    }

    fn end_line(&mut self, linked: bool) {
        let ctx = &mut self.ctx;
        if let Some(prefix) = ctx.pending.take() {
            log::warn!("line {}: control {} has no argument", ctx.line_no, prefix);
        }
        ctx.sustain_param = None;

        let dropped = ctx.chord.drop_pending();
        if dropped > 0 {
            log::warn!(
                "line {}: incomplete chord of {} notes dropped",
                ctx.line_no,
                dropped
            );
        }
        if !linked {
            ctx.sustain.clear_tail();
        }
        ctx.linked = linked;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{CHUNK, QUARTER_NOTE, WHOLE_NOTE};
    use crate::config::EngineConfig;
    use crate::voice::tests::shared_voices;
    use std::sync::OnceLock;

    fn interpreter() -> Interpreter {
        Interpreter::new(shared_voices().clone(), 32767)
    }

    /// Voices whose piano has a recorded middle C
    fn natural_voices() -> Arc<VoiceSet> {
        static VOICES: OnceLock<Arc<VoiceSet>> = OnceLock::new();
        VOICES
            .get_or_init(|| {
                let dir = tempfile::tempdir().unwrap();
                let piano = dir.path().join("piano");
                std::fs::create_dir(&piano).unwrap();

                let spec = hound::WavSpec {
                    channels: 1,
                    sample_rate: 44100,
                    bits_per_sample: 16,
                    sample_format: hound::SampleFormat::Int,
                };
                let mut writer = hound::WavWriter::create(piano.join("C4.wav"), spec).unwrap();
                let tick = 2.0 * std::f64::consts::PI * 261.6 / 44100.0;
                for i in 0..WHOLE_NOTE {
                    writer.write_sample(((i as f64 * tick).sin() * 12_000.0) as i16).unwrap();
                }
                writer.finalize().unwrap();

                let config = EngineConfig {
                    voice_dir: Some(dir.path().to_path_buf()),
                    ..Default::default()
                };
                Arc::new(VoiceSet::new(&config).unwrap())
            })
            .clone()
    }

    fn render_natural(text: &str) -> Vec<Line> {
        render_with(Interpreter::new(natural_voices(), 32767), text)
    }

    fn render(text: &str) -> Vec<Line> {
        render_with(interpreter(), text)
    }

    fn render_with(mut interp: Interpreter, text: &str) -> Vec<Line> {
        let mut lines: Vec<Line> = text
            .lines()
            .filter_map(|l| interp.feed_line(l).unwrap())
            .collect();
        lines.extend(interp.finish());
        lines
    }

    fn audible(text: &str) -> Vec<Line> {
        render(text).into_iter().filter(|l| !l.is_silent()).collect()
    }

    #[test]
    fn test_single_note() {
        let lines = render("q");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].notes, vec!["C4"]);
        let len = lines[0].samples.len();
        assert!(len <= QUARTER_NOTE && len > QUARTER_NOTE - CHUNK);
    }

    #[test]
    fn test_ignored_characters() {
        let a = render("q w e");
        let b = render("q|w\te");
        assert_eq!(a[0].samples, b[0].samples);
        assert_eq!(a[0].notes, vec!["C4", "D4", "E4"]);
    }

    #[test]
    fn test_rest_lengths() {
        assert_eq!(render("RW")[0].samples.len(), WHOLE_NOTE);
        assert_eq!(render("T6RW")[0].samples.len(), 82_904);
        assert_eq!(render("T0 RQ")[0].samples.len(), 26_132);
        assert_eq!(render("DDRQ")[0].samples.len(), QUARTER_NOTE + QUARTER_NOTE / 2);
    }

    #[test]
    fn test_dot_is_one_shot() {
        assert_eq!(render("DDRQRQ")[0].samples.len(), QUARTER_NOTE * 5 / 2);
    }

    #[test]
    fn test_modal_state_carries_across_lines() {
        let mut interp = interpreter();
        interp.feed_line("HLDET7A3VP").unwrap();
        let ctx = interp.context();
        assert_eq!(ctx.band, OctaveBand::Left123);
        assert_eq!(ctx.duration, Duration::Eighth);
        assert_eq!(ctx.tempo, 7);
        assert_eq!(ctx.amplitude, 3);
        assert_eq!(ctx.voice, VoiceKind::Piano);

        let line = interp.feed_line("q").unwrap().unwrap();
        assert_eq!(line.notes, vec!["C1"]);
    }

    #[test]
    fn test_sustain_levels() {
        let mut interp = interpreter();
        interp.feed_line("SA3 SD0 SS7 SR1").unwrap();
        let sustain = &interp.context().sustain;
        assert_eq!(
            (sustain.attack, sustain.decay, sustain.sustain, sustain.release),
            (3, 0, 7, 1)
        );
    }

    #[test]
    fn test_invalid_input_is_skipped() {
        // Unknown key, unknown control argument, out of range band key
        let lines = render("qXDZH0qw");
        assert_eq!(lines[0].notes, vec!["C4"]);
        let ctx_lines = render("H0 , q");
        assert_eq!(ctx_lines[0].notes, vec!["A0"]);
    }

    #[test]
    fn test_comments() {
        let lines = render("# q w e");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "# q w e");
        assert!(lines[0].is_silent());
        assert!(lines[0].notes.is_empty());

        assert_eq!(audible("q\n#w\ne").len(), 2);
    }

    #[test]
    fn test_comments_and_blanks_are_echoed() {
        let lines = render("q\n\n# melody\n##\nw\n##\ne");
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["q", "", "# melody", "##", "w", "##", "e"]);

        let silent: Vec<bool> = lines.iter().map(|l| l.is_silent()).collect();
        assert_eq!(silent, vec![false, true, true, true, true, true, false]);
    }

    #[test]
    fn test_block_comment() {
        let lines = audible("##\nq\n##\nw");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].notes, vec!["D4"]);

        // A single # inside a block is still skipped
        let lines = audible("##\n# q\ne\n##\nw");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].notes, vec!["D4"]);
    }

    #[test]
    fn test_chord_commits_after_target() {
        let single = render("q")[0].samples.len();

        let lines = render("C3 qet");
        assert_eq!(lines[0].notes.len(), 3);
        // Three notes, one chord's worth of samples
        assert!(lines[0].samples.len() <= single + CHUNK);
        assert!(lines[0].samples.len() > 0);
    }

    #[test]
    fn test_incomplete_chord_is_pending() {
        let mut interp = interpreter();
        interp.feed_line("C3VN").unwrap();
        assert_eq!(interp.context().chord.target, 3);

        // Four pitches: one chord commits, the fourth starts a new one that
        // is dropped at the end of the line
        let mut interp = interpreter();
        let line = interp.feed_line("C3 qetu").unwrap().unwrap();
        assert_eq!(line.notes.len(), 4);
        let chord_only = render("C3 qet")[0].samples.len();
        assert_eq!(line.samples.len(), chord_only);
        assert_eq!(interp.context().chord.count, 0);

        // Chord mode off again
        let lines = render("C3 qet C0 qe");
        let plain = render("qe")[0].samples.len();
        assert_eq!(lines[0].samples.len(), chord_only + plain);
    }

    #[test]
    fn test_harmony_lines_are_mixed() {
        let lines = render("qwVN\nRH");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "qwVN\nRH");
        assert_eq!(lines[0].notes, vec!["C4", "D4"]);

        let melody = render("qw")[0].samples.clone();
        // Mixed against silence: (a - 0) / 2 * 1.6
        let expected = (melody[1000] as f64 / 2.0 * 1.6) as i16;
        assert_eq!(lines[0].samples[1000], expected);
        assert_eq!(lines[0].samples.len(), melody.len().max(WHOLE_NOTE / 2));
    }

    #[test]
    fn test_harmony_at_end_of_sheet_is_flushed() {
        let lines = render("qVN");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].notes, vec!["C4"]);
    }

    #[test]
    fn test_voice_switch() {
        let lines = render("VV m VD m");
        // Right hand band by default
        assert_eq!(lines[0].notes, vec!["G6", "G6"]);
        let lines = render("HL VV j");
        assert!(lines[0].notes.is_empty());
    }

    /// Samples of a line holding two notes of equal length
    fn halves(line: &Line) -> (&[i16], &[i16]) {
        assert_eq!(line.samples.len() % 2, 0);
        line.samples.split_at(line.samples.len() / 2)
    }

    #[test]
    fn test_natural_tail_rings_into_next_note() {
        let voices = natural_voices();
        assert!(voices.get(VoiceKind::Piano).is_natural_voice_active());

        let lines = render_natural("VP qq");
        let (first, second) = halves(&lines[0]);
        assert_ne!(first, second);
    }

    #[test]
    fn test_tail_is_cleared_at_line_end() {
        let lines = render_natural("VP q\nq");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].samples, lines[1].samples);
    }

    #[test]
    fn test_tail_is_cleared_on_voice_change() {
        let lines = render_natural("VP q VD VP q");
        let (first, second) = halves(&lines[0]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_rest_lets_tail_ring_out() {
        let lines = render_natural("VP q RQ");
        let samples = &lines[0].samples;
        let rest = &samples[samples.len() - QUARTER_NOTE..];
        let energy: i64 = rest.iter().map(|&s| (s as i64).abs()).sum();
        assert!(energy > 0);

        // Nothing rings on after a synthesized note
        let lines = render_natural("VD q RQ");
        let samples = &lines[0].samples;
        assert!(samples[samples.len() - QUARTER_NOTE..].iter().all(|&s| s == 0));
    }

    #[test]
    fn test_linked_line_starts_without_tail() {
        let plain = render_natural("VP q")[0].samples.clone();
        let lines = render_natural("VP q VN\nq");
        assert_eq!(lines.len(), 1);

        // Two identical notes mix to silence unless a tail leaked in
        assert_eq!(lines[0].samples.len(), plain.len());
        assert!(lines[0].samples.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_line_limit_constant() {
        assert_eq!(LINE_BUFFER_LIMIT, 104_857_600);
    }
}
