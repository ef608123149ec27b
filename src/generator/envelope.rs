//! Amplitude envelopes applied to whole note buffers
//!
//! Synthesized notes get a four phase ADSR shape computed as fractions of the
//! buffer length:
//!
//! ```text
//! |  /|\            A - attack
//! | / | \ _____     D - decay
//! |/  |  |    | \   S - sustain
//! |--------------   R - release
//!   A  D  S    R
//! ```
//!
//! Natural recordings already decay on their own, so they only get a raise
//! ramp at the start and a release fade at the end.

use super::QUARTER_NOTE;

/// Highest level accepted by the `S` controls
pub const MAX_LEVEL: u8 = 9;

/// Envelope levels and the carried-over tail of the previous note
#[derive(Debug, Clone, PartialEq)]
pub struct Sustain {
    pub attack: u8,
    pub decay: u8,
    pub sustain: u8,
    pub release: u8,
    /// Unplayed remainder of the previous natural-voice note
    pub tail: Vec<i16>,
}

impl Default for Sustain {
    fn default() -> Self {
        Self {
            attack: 8,
            decay: 4,
            sustain: 4,
            release: 9,
            tail: Vec::new(),
        }
    }
}

impl Sustain {
    /// Replace the carried tail with `samples`, capped at a quarter note
    pub fn capture_tail(&mut self, samples: &[i16]) {
        let len = samples.len().min(QUARTER_NOTE);
        self.tail.clear();
        self.tail.extend_from_slice(&samples[..len]);
    }

    pub fn clear_tail(&mut self) {
        self.tail.clear();
    }

    /// Set one level by its control letter (`A`, `D`, `S` or `R`)
    ///
    /// Returns false for an unknown letter or a level above 9.
    pub fn set_level(&mut self, param: char, level: u8) -> bool {
        if level > MAX_LEVEL {
            return false;
        }
        match param {
            'A' => self.attack = level,
            'D' => self.decay = level,
            'S' => self.sustain = level,
            'R' => self.release = level,
            _ => return false,
        }
        true
    }
}

/// Phase boundaries of the synthesized envelope, in samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdsrSpans {
    pub attack: usize,
    pub decay: usize,
    pub sustain: usize,
    pub release: usize,
}

impl AdsrSpans {
    pub fn new(len: usize, sustain: &Sustain) -> Self {
        let attack = (len / 200) * sustain.attack as usize;
        let rest = len - attack.min(len);
        let decay = rest / 10 + (rest / 20) * sustain.decay as usize;
        let hold = (rest - decay.min(rest)) / 2;
        let release = rest - decay.min(rest) - hold;
        Self {
            attack: attack.min(len),
            decay: decay.min(rest),
            sustain: hold,
            release,
        }
    }
}

/// Sustain plateau as a fraction of the peak, one of ten steps
pub fn sustain_ratio(level: u8) -> f64 {
    (level.min(MAX_LEVEL) as f64 + 1.0) / 10.0
}

/// Gain of every sample of a synthesized envelope
///
/// Attack ramps 0 to 1, decay ramps 1 to the sustain ratio, sustain holds,
/// release ramps the sustain ratio down to 0.
pub fn adsr_gains(len: usize, sustain: &Sustain) -> Vec<f64> {
    let spans = AdsrSpans::new(len, sustain);
    let level = sustain_ratio(sustain.sustain);
    let decay_end = spans.attack + spans.decay;
    let release_start = decay_end + spans.sustain;

    (0..len)
        .map(|i| {
            if i >= release_start {
                let count = (i - release_start) as f64;
                let release = spans.release as f64;
                level * (release - count) / release
            } else if i >= decay_end {
                level
            } else if i >= spans.attack {
                let count = (i - spans.attack) as f64;
                let decay = spans.decay as f64;
                level + (1.0 - level) * (decay - count) / decay
            } else {
                i as f64 / spans.attack as f64
            }
        })
        .collect()
}

/// Apply the synthesized ADSR envelope in place
pub fn apply_adsr(buf: &mut [i16], sustain: &Sustain) {
    let gains = adsr_gains(buf.len(), sustain);
    for (sample, gain) in buf.iter_mut().zip(gains) {
        *sample = (*sample as f64 * gain) as i16;
    }
}

/// Ramp the first `ratio` of the buffer up from silence
pub fn raise(buf: &mut [i16], ratio: f64) {
    let span = (buf.len() as f64 * ratio.clamp(0.0, 1.0)) as usize;
    if span == 0 {
        return;
    }
    for (i, sample) in buf[..span].iter_mut().enumerate() {
        *sample = (*sample as f64 * (i as f64 / span as f64)) as i16;
    }
}

/// Fade the end of a buffer to silence
///
/// The first `hold` samples are untouched. The fade covers `ratio` of the
/// remaining samples and ends exactly at the last sample.
pub fn release(buf: &mut [i16], hold: usize, ratio: f64) {
    let hold = hold.min(buf.len());
    let remaining = buf.len() - hold;
    let span = (remaining as f64 * ratio.clamp(0.0, 1.0)) as usize;
    let start = buf.len() - span;

    for (i, sample) in buf[start..].iter_mut().enumerate() {
        *sample = (*sample as f64 * ((span - i) as f64 / span as f64)) as i16;
    }
    if span == 0 {
        for sample in buf[hold..].iter_mut() {
            *sample = 0;
        }
    }
}

/// Scale every sample by `gain`
pub fn apply_gain(buf: &mut [i16], gain: f64) {
    if (gain - 1.0).abs() < f64::EPSILON {
        return;
    }
    for sample in buf.iter_mut() {
        *sample = (*sample as f64 * gain) as i16;
    }
}
