//! Output sinks for rendered lines

use super::parser::Line;
use crate::error::{Error, Result};
use crate::wav::{interleave, write_wav_stereo};
use std::io::Write;

/// Receives finished lines in playback order
///
/// `flush` is called once after the last line; output is only guaranteed
/// complete after it returns.
pub trait Sink: Send {
    fn play(&mut self, line: &Line) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Collects rendered lines in memory
impl Sink for Vec<Line> {
    fn play(&mut self, line: &Line) -> Result<()> {
        self.push(line.clone());
        Ok(())
    }
}

/// Hands each line's channels to a playback callback
pub struct CallbackSink<F> {
    callback: F,
}

impl<F> CallbackSink<F>
where
    F: FnMut(&[i16], &[i16]) -> Result<()> + Send,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> Sink for CallbackSink<F>
where
    F: FnMut(&[i16], &[i16]) -> Result<()> + Send,
{
    fn play(&mut self, line: &Line) -> Result<()> {
        if line.is_silent() {
            return Ok(());
        }
        (self.callback)(line.left(), line.right())
    }
}

/// Accumulates interleaved stereo samples and writes one WAV stream on flush
pub struct WavSink<W: Write + Send> {
    writer: Option<W>,
    interleaved: Vec<i16>,
}

impl<W: Write + Send> WavSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Some(writer),
            interleaved: Vec::new(),
        }
    }

    /// Samples per channel collected so far
    pub fn frames(&self) -> usize {
        self.interleaved.len() / 2
    }
}

impl<W: Write + Send> Sink for WavSink<W> {
    fn play(&mut self, line: &Line) -> Result<()> {
        interleave(line.left(), line.right(), &mut self.interleaved);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };
        write_wav_stereo(&mut writer, &self.interleaved)
            .map_err(|e| Error::Sink(format!("writing WAV: {}", e)))?;
        log::debug!("wrote {} stereo frames", self.frames());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wav::HEADER_LEN;

    fn line(samples: Vec<i16>) -> Line {
        Line {
            samples,
            ..Default::default()
        }
    }

    #[test]
    fn test_wav_sink_writes_once() {
        let mut out = Vec::new();
        {
            let mut sink = WavSink::new(&mut out);
            sink.play(&line(vec![1, 2])).unwrap();
            sink.play(&line(vec![3])).unwrap();
            assert_eq!(sink.frames(), 3);
            sink.flush().unwrap();
            sink.flush().unwrap();
        }
        assert_eq!(out.len(), HEADER_LEN + 3 * 4);
        assert_eq!(i16::from_le_bytes([out[44], out[45]]), 1);
        assert_eq!(i16::from_le_bytes([out[46], out[47]]), 1);
        assert_eq!(i16::from_le_bytes([out[52], out[53]]), 3);
    }

    #[test]
    fn test_callback_skips_silent_lines() {
        let mut calls = Vec::new();
        {
            let mut sink = CallbackSink::new(|left: &[i16], right: &[i16]| {
                calls.push((left.len(), right.len()));
                Ok(())
            });
            sink.play(&line(vec![])).unwrap();
            sink.play(&line(vec![5; 10])).unwrap();
        }
        assert_eq!(calls, vec![(10, 10)]);
    }

    #[test]
    fn test_callback_error_propagates() {
        let mut sink = CallbackSink::new(|_: &[i16], _: &[i16]| Err(Error::Sink("device gone".into())));
        assert!(matches!(sink.play(&line(vec![1])), Err(Error::Sink(_))));
    }
}
