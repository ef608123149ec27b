//! WAV writer for the engine's output
//!
//! Writes the canonical 44-byte header (`RIFF`, `WAVE`, `fmt `, `data`)
//! followed by interleaved little-endian 16-bit samples.

use crate::generator::SAMPLE_RATE;
use std::io::{self, Write};

/// Size of the canonical header in bytes
pub const HEADER_LEN: usize = 44;

/// Canonical PCM header fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveHeader {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    /// Bytes of sample data following the header
    pub data_size: u32,
}

impl WaveHeader {
    pub fn new(channels: u16, sample_rate: u32, bits_per_sample: u16, data_size: u32) -> Self {
        Self {
            channels,
            sample_rate,
            bits_per_sample,
            data_size,
        }
    }

    /// Header for `samples` interleaved 16-bit stereo samples at 44.1 kHz
    ///
    /// Returns `None` if the data would not fit the 32-bit size field.
    pub fn stereo_16bit(samples: usize) -> Option<Self> {
        let data_size = u32::try_from(samples.checked_mul(2)?).ok()?;
        data_size.checked_add(36)?;
        Some(Self::new(2, SAMPLE_RATE, 16, data_size))
    }

    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * self.channels as u32 * (self.bits_per_sample / 8) as u32
    }

    pub fn block_align(&self) -> u16 {
        self.channels * (self.bits_per_sample / 8)
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        // RIFF chunk, size excludes the first 8 bytes
        writer.write_all(b"RIFF")?;
        writer.write_all(&(36 + self.data_size).to_le_bytes())?;
        writer.write_all(b"WAVE")?;

        // fmt subchunk
        writer.write_all(b"fmt ")?;
        writer.write_all(&16u32.to_le_bytes())?;
        writer.write_all(&1u16.to_le_bytes())?; // PCM
        writer.write_all(&self.channels.to_le_bytes())?;
        writer.write_all(&self.sample_rate.to_le_bytes())?;
        writer.write_all(&self.byte_rate().to_le_bytes())?;
        writer.write_all(&self.block_align().to_le_bytes())?;
        writer.write_all(&self.bits_per_sample.to_le_bytes())?;

        // data subchunk
        writer.write_all(b"data")?;
        writer.write_all(&self.data_size.to_le_bytes())?;
        Ok(())
    }
}

/// Append `left`/`right` as interleaved frames to `out`
///
/// The shorter channel is padded with silence.
pub fn interleave(left: &[i16], right: &[i16], out: &mut Vec<i16>) {
    let frames = left.len().max(right.len());
    out.reserve(frames * 2);
    for i in 0..frames {
        out.push(left.get(i).copied().unwrap_or(0));
        out.push(right.get(i).copied().unwrap_or(0));
    }
}

/// Write a complete 44.1 kHz 16-bit stereo WAV stream
pub fn write_wav_stereo<W: Write>(writer: &mut W, interleaved: &[i16]) -> io::Result<()> {
    let header = WaveHeader::stereo_16bit(interleaved.len()).ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "sample data too large for WAV")
    })?;
    header.write_to(writer)?;

    let mut bytes = Vec::with_capacity(interleaved.len() * 2);
    for sample in interleaved {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    writer.write_all(&bytes)?;
    writer.flush()
}
