//! Mixing of simultaneous buffers (chords, sustain tails, chained lines)

/// Scale applied to the halved difference of two samples
pub const MIX_GAIN: f64 = 1.6;

/// Mixed samples are clamped to +/- this value
pub const MIX_CEILING: f64 = 32_000.0;

/// Mix `source` into `target` sample by sample
///
/// Each output sample is `clamp((a - b) / 2 * MIX_GAIN)`. The difference
/// keeps two voices from clipping or cancelling without scanning the
/// buffers for their dynamic range. The shorter buffer counts as silence
/// past its end, so `target` grows to the longer of the two lengths.
pub fn mix_into(target: &mut Vec<i16>, source: &[i16]) {
    if target.len() < source.len() {
        target.resize(source.len(), 0);
    }
    for (i, sample) in target.iter_mut().enumerate() {
        let a = *sample as f64;
        let b = source.get(i).copied().unwrap_or(0) as f64;
        *sample = mix_sample(a, b);
    }
}

/// Mix `source` into the overlapping part of `target` without growing it
pub fn mix_overlay(target: &mut [i16], source: &[i16]) {
    for (sample, &b) in target.iter_mut().zip(source) {
        *sample = mix_sample(*sample as f64, b as f64);
    }
}

fn mix_sample(a: f64, b: f64) -> i16 {
    ((a - b) / 2.0 * MIX_GAIN).clamp(-MIX_CEILING, MIX_CEILING) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mix_formula() {
        let mut target = vec![1000, -1000, 0];
        mix_into(&mut target, &[200, 500, -300]);
        assert_eq!(target, vec![640, -1200, 240]);
    }

    #[test]
    fn test_mix_never_exceeds_ceiling() {
        let extremes = [i16::MIN, -32_000, -1, 0, 1, 32_000, i16::MAX];
        for &a in &extremes {
            for &b in &extremes {
                let mut target = vec![a];
                mix_into(&mut target, &[b]);
                let out = target[0] as f64;
                assert!(out >= -MIX_CEILING && out <= MIX_CEILING, "{} {} -> {}", a, b, out);
            }
        }
    }

    #[test]
    fn test_shorter_buffer_is_silence() {
        let mut target = vec![100, 100];
        mix_into(&mut target, &[100, 100, 100, 100]);
        assert_eq!(target, vec![0, 0, -80, -80]);

        let mut target = vec![100, 100, 100];
        mix_into(&mut target, &[100]);
        assert_eq!(target, vec![0, 80, 80]);
    }

    #[test]
    fn test_overlay_keeps_length() {
        let mut target = vec![0i16; 2];
        mix_overlay(&mut target, &[100, 100, 100]);
        assert_eq!(target, vec![-80, -80]);
    }
}
