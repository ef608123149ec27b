//! Notes, durations and tempo-adjusted sample counts

use crate::generator::{OctaveBand, SAMPLE_AMP_16BIT, WHOLE_NOTE};

/// Tempo used when no `T` control has been seen
pub const DEFAULT_TEMPO: u8 = 4;

/// Length change per tempo unit, in percent
pub const TEMPO_STEP_PERCENT: usize = 4;

/// Note length selected with the `D` and `R` controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Duration {
    Whole,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
    ThirtySecond,
    SixtyFourth,
}

impl Duration {
    /// Parse the argument of a `D` or `R` control
    pub fn from_control(c: char) -> Option<Self> {
        match c {
            'W' => Some(Duration::Whole),
            'H' => Some(Duration::Half),
            'Q' => Some(Duration::Quarter),
            'E' => Some(Duration::Eighth),
            'S' => Some(Duration::Sixteenth),
            'T' => Some(Duration::ThirtySecond),
            'I' => Some(Duration::SixtyFourth),
            _ => None,
        }
    }

    /// Fraction of a whole note, as a divisor
    pub fn divisor(&self) -> usize {
        match self {
            Duration::Whole => 1,
            Duration::Half => 2,
            Duration::Quarter => 4,
            Duration::Eighth => 8,
            Duration::Sixteenth => 16,
            Duration::ThirtySecond => 32,
            Duration::SixtyFourth => 64,
        }
    }
}

/// Sample count of a note or rest after dotting and tempo
///
/// A dotted length adds half of itself. Every tempo unit away from 4 changes
/// the length by 4% (integer arithmetic): faster above 4, slower below.
pub fn measure(duration: Duration, dotted: bool, tempo: u8) -> usize {
    let mut base = WHOLE_NOTE / duration.divisor();
    if dotted {
        base += base / 2;
    }

    let tempo = tempo as usize;
    if tempo > DEFAULT_TEMPO as usize {
        base - base * (tempo - DEFAULT_TEMPO as usize) * TEMPO_STEP_PERCENT / 100
    } else {
        base + base * (DEFAULT_TEMPO as usize - tempo) * TEMPO_STEP_PERCENT / 100
    }
}

/// Silence of the given length
pub fn rest_note(duration: Duration, dotted: bool, tempo: u8) -> Vec<i16> {
    vec![0; measure(duration, dotted, tempo)]
}

/// A pitch resolved from one notation character with the current modal state
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub key: char,
    pub band: OctaveBand,
    pub duration: Duration,
    pub dotted: bool,
    /// Engine volume, 0..=32767
    pub volume: i32,
    /// `A` control level, 0..=9
    pub amplitude: u8,
    /// `T` control level, 0..=9
    pub tempo: u8,
    /// Key velocity, 0..=127
    pub velocity: u8,
    /// Target length, set by [`Note::measure`]
    pub sample_count: usize,
    pub buffer: Vec<i16>,
}

impl Note {
    pub fn new(key: char, band: OctaveBand, duration: Duration) -> Self {
        Self {
            key,
            band,
            duration,
            dotted: false,
            volume: SAMPLE_AMP_16BIT as i32,
            amplitude: 9,
            tempo: DEFAULT_TEMPO,
            velocity: 127,
            sample_count: 0,
            buffer: Vec::new(),
        }
    }

    pub fn measure(&mut self) {
        self.sample_count = measure(self.duration, self.dotted, self.tempo);
    }

    /// Linear gain from volume, amplitude and velocity
    pub fn gain(&self) -> f64 {
        let volume = self.volume.clamp(0, SAMPLE_AMP_16BIT as i32) as f64 / SAMPLE_AMP_16BIT;
        let amplitude = self.amplitude.min(9) as f64 / 9.0;
        let velocity = self.velocity.min(127) as f64 / 127.0;
        volume * amplitude * velocity
    }
}
