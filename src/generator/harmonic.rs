//! Additive harmonic synthesis and edge trimming

use super::{CHUNK, SAMPLE_AMP_16BIT, SAMPLE_RATE_F64};
use std::f64::consts::PI;

/// Synthesize `samples` samples of a struck-string tone at `frequency_hz`
///
/// Sums the fundamental and three partials whose phases advance at 2x, 6x and
/// 24x the fundamental rate, each partial modulated by the ones below it.
/// Peak amplitude is about half of 16-bit full scale. The result is
/// edge-trimmed, so it may be slightly shorter than `samples`.
///
/// Identical inputs always produce identical buffers.
pub fn generate(frequency_hz: f64, samples: usize) -> Vec<i16> {
    let tick0 = 2.0 * PI / SAMPLE_RATE_F64 * frequency_hz;
    let tick1 = tick0 * 2.0;
    let tick2 = tick1 * 3.0;
    let tick3 = tick2 * 4.0;
    let amp = SAMPLE_AMP_16BIT * 0.5;

    let mut buf = Vec::with_capacity(samples);
    let (mut timer0, mut timer1, mut timer2, mut timer3) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);

    for _ in 0..samples {
        let sin0 = timer0.sin();
        let sin1 = sin0 * timer1.sin();
        let sin2 = sin1 * timer2.sin();
        let sin3 = sin2 * timer3.sin();

        let bar0 = amp * sin0;
        let bar1 = bar0 * sin1 / 2.0 * sin0;
        let bar2 = bar0 * sin2 / 3.0 * sin0;
        let bar3 = bar0 * sin3 / 4.0 * sin0;
        buf.push((bar0 + bar1 + bar2 + bar3) as i16);

        timer0 += tick0;
        timer1 += tick1;
        timer2 += tick2;
        timer3 += tick3;
    }

    trim_wave(&mut buf);
    buf
}

/// Length a buffer should be cut to so it ends on a falling zero crossing
///
/// Walks backward from the end through at most [`CHUNK`] samples looking for
/// a sample `i` with `buf[i - 1] > 0 && buf[i] <= 0`, and keeps `buf[..=i]`.
/// Returns the full length when no crossing is found within the window.
///
/// A trimmed buffer already ends on such a crossing, so trimming twice gives
/// the same length as trimming once.
pub fn trim_len(buf: &[i16]) -> usize {
    let len = buf.len();
    if len < 2 {
        return len;
    }

    let floor = len.saturating_sub(CHUNK).max(1);
    for i in (floor..len).rev() {
        if buf[i - 1] > 0 && buf[i] <= 0 {
            return i + 1;
        }
    }
    len
}

/// Truncate a buffer to [`trim_len`]
pub fn trim_wave(buf: &mut Vec<i16>) {
    let len = trim_len(buf);
    buf.truncate(len);
}
