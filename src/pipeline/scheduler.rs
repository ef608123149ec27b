//! Music engine: reads a sheet line by line and overlaps rendering with playback
//!
//! Rendering runs on the caller's thread and playback on a dedicated thread.
//! They meet at a zero-capacity channel, so line N+1 is rendered while line N
//! plays, and no more than one finished line ever waits for the sink.

use super::parser::{Interpreter, Line};
use super::sink::Sink;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::generator::SAMPLE_RATE;
use crate::voice::VoiceSet;
use crossbeam_channel::{bounded, Sender};
use std::io::{BufRead, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Bytes one notation line may hold
pub const LINE_LIMIT: usize = 100 * 1024;

/// Read one line into `buf`, without its line ending
///
/// Returns `false` at end of input.
pub fn read_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> Result<bool> {
    buf.clear();
    let read = reader
        .by_ref()
        .take(LINE_LIMIT as u64 + 2)
        .read_until(b'\n', buf)?;
    if read == 0 {
        return Ok(false);
    }

    let ended = buf.last() == Some(&b'\n');
    if ended {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    if buf.len() > LINE_LIMIT {
        return Err(Error::LineTooLong { limit: LINE_LIMIT });
    }
    Ok(true)
}

/// Playback thread fed through a rendezvous channel
pub struct Player<S: Sink + 'static> {
    sender: Option<Sender<Line>>,
    handle: Option<JoinHandle<Result<S>>>,
}

impl<S: Sink + 'static> Player<S> {
    pub fn spawn(sink: S) -> Self {
        let (sender, receiver) = bounded::<Line>(0);
        let handle = thread::spawn(move || {
            let mut sink = sink;
            for line in receiver.iter() {
                sink.play(&line)?;
            }
            sink.flush()?;
            Ok(sink)
        });

        Self {
            sender: Some(sender),
            handle: Some(handle),
        }
    }

    /// Block until the sink takes `line`
    pub fn send(&self, line: Line) -> Result<()> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| Error::Sink("player already finished".into()))?;
        sender
            .send(line)
            .map_err(|_| Error::Sink("playback stopped".into()))
    }

    /// Let the last line play out, flush the sink and return it
    pub fn finish(mut self) -> Result<S> {
        self.sender.take();
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| Error::Sink("playback thread panicked".into()))?,
            None => Err(Error::Sink("player already finished".into())),
        }
    }
}

/// Renders notation sources through shared voice tables
pub struct Music {
    config: EngineConfig,
    voices: Arc<VoiceSet>,
    stop: Arc<AtomicBool>,
}

impl Music {
    /// Build the voice tables for `config`
    pub fn new(config: EngineConfig) -> Result<Self> {
        let voices = Arc::new(VoiceSet::new(&config)?);
        Ok(Self::with_voices(config, voices))
    }

    /// Share already built voice tables
    pub fn with_voices(config: EngineConfig, voices: Arc<VoiceSet>) -> Self {
        Self {
            config,
            voices,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn voices(&self) -> &Arc<VoiceSet> {
        &self.voices
    }

    /// Flag that stops playback at the next line boundary when set
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Play a whole source into `sink` and return the flushed sink
    ///
    /// Lines the sink has not taken when an error occurs are discarded, but
    /// the sink is still flushed.
    pub fn play<R: BufRead, S: Sink + 'static>(&self, mut reader: R, sink: S) -> Result<S> {
        let player = Player::spawn(sink);
        let rendered = self.render_into(&mut reader, &player);
        let finished = player.finish();

        match (rendered, finished) {
            // A failed send means the sink failed; report the sink's error
            (Err(Error::Sink(_)), Err(e)) => Err(e),
            (Err(e), _) => Err(e),
            (Ok(_), finished) => finished,
        }
    }

    /// Render a whole source into memory
    pub fn render<R: BufRead>(&self, reader: R) -> Result<Vec<Line>> {
        self.play(reader, Vec::new())
    }

    fn render_into<R: BufRead, S: Sink + 'static>(&self, reader: &mut R, player: &Player<S>) -> Result<()> {
        let mut interp = Interpreter::new(self.voices.clone(), self.config.volume_level());
        let mut buf = Vec::new();
        let mut lines = 0usize;
        let mut samples = 0usize;

        while read_line(reader, &mut buf)? {
            if self.stopped() {
                log::info!("playback stopped after {} lines", lines);
                return Ok(());
            }
            let text = String::from_utf8_lossy(&buf);
            if let Some(line) = interp.feed_line(&text)? {
                lines += 1;
                samples += line.samples.len();
                log::debug!("line {} ready, {} samples", interp.context().line_no, line.samples.len());
                player.send(line)?;
            }
        }
        if let Some(line) = interp.finish() {
            lines += 1;
            samples += line.samples.len();
            player.send(line)?;
        }

        log::info!(
            "rendered {} lines, {:.1}s",
            lines,
            samples as f64 / SAMPLE_RATE as f64
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::sink::WavSink;
    use crate::voice::tests::shared_voices;
    use std::io::Cursor;

    fn music() -> Music {
        let config = EngineConfig {
            natural_voices: false,
            ..Default::default()
        };
        Music::with_voices(config, shared_voices().clone())
    }

    #[derive(Debug)]
    struct FailingSink;

    impl Sink for FailingSink {
        fn play(&mut self, _line: &Line) -> Result<()> {
            Err(Error::Sink("device unplugged".into()))
        }
    }

    /// Takes a line, then waits for the gate before taking the next one
    struct GatedSink {
        gate: crossbeam_channel::Receiver<()>,
        lines: Vec<Line>,
    }

    impl Sink for GatedSink {
        fn play(&mut self, line: &Line) -> Result<()> {
            self.lines.push(line.clone());
            self.gate
                .recv()
                .map_err(|_| Error::Sink("gate closed".into()))
        }
    }

    #[test]
    fn test_player_holds_at_most_one_line() {
        let (gate, gate_rx) = bounded::<()>(0);
        let player = Player::spawn(GatedSink {
            gate: gate_rx,
            lines: Vec::new(),
        });

        let sent = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let renderer = {
            let sent = sent.clone();
            thread::spawn(move || {
                for n in 0..3 {
                    let line = Line {
                        text: n.to_string(),
                        ..Default::default()
                    };
                    player.send(line).unwrap();
                    sent.fetch_add(1, Ordering::SeqCst);
                }
                player
            })
        };

        // The sink holds line 0; line 1 must wait for it to be taken
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while sent.load(Ordering::SeqCst) == 0 && std::time::Instant::now() < deadline {
            thread::sleep(std::time::Duration::from_millis(5));
        }
        thread::sleep(std::time::Duration::from_millis(200));
        assert_eq!(sent.load(Ordering::SeqCst), 1);

        for _ in 0..3 {
            gate.send(()).unwrap();
        }
        let player = renderer.join().unwrap();
        let sink = player.finish().unwrap();
        let texts: Vec<_> = sink.lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["0", "1", "2"]);
    }

    #[test]
    fn test_read_line_endings() {
        let mut reader = Cursor::new("ab\r\ncd\n\nef");
        let mut buf = Vec::new();
        let mut lines = Vec::new();
        while read_line(&mut reader, &mut buf).unwrap() {
            lines.push(String::from_utf8(buf.clone()).unwrap());
        }
        assert_eq!(lines, vec!["ab", "cd", "", "ef"]);
    }

    #[test]
    fn test_line_limit() {
        let mut reader = Cursor::new(vec![b'q'; LINE_LIMIT]);
        let mut buf = Vec::new();
        assert!(read_line(&mut reader, &mut buf).unwrap());

        let mut reader = Cursor::new(vec![b'q'; LINE_LIMIT + 1]);
        assert!(matches!(
            read_line(&mut reader, &mut buf),
            Err(Error::LineTooLong { .. })
        ));

        let too_long = format!("{}\nq\n", "|".repeat(LINE_LIMIT + 10));
        let err = music().render(Cursor::new(too_long)).unwrap_err();
        assert!(matches!(err, Error::LineTooLong { .. }));
    }

    #[test]
    fn test_lines_arrive_in_order() {
        let lines = music().render(Cursor::new("q\n# skip\nw\ne\n")).unwrap();
        let names: Vec<_> = lines.iter().map(|l| l.notes.join(" ")).collect();
        assert_eq!(names, vec!["C4", "", "D4", "E4"]);
        assert_eq!(lines[1].text, "# skip");
    }

    #[test]
    fn test_stop_flag() {
        let music = music();
        music.stop();
        let lines = music.render(Cursor::new("q\nw\n")).unwrap();
        assert!(lines.is_empty());
    }

    #[test]
    fn test_sink_failure_is_reported() {
        let err = music().play(Cursor::new("q\nw\ne\n"), FailingSink).unwrap_err();
        match err {
            Error::Sink(msg) => assert_eq!(msg, "device unplugged"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_wav_output_length() {
        let sink = music()
            .play(Cursor::new("RQ\nRH\n"), WavSink::new(Vec::new()))
            .unwrap();
        assert_eq!(sink.frames(), 22_528 + 45_056);
    }
}
